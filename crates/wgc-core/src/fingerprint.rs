//! Content fingerprints for change detection

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of `text`
pub fn digest(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digest() {
        assert_eq!(
            digest("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_whitespace_matters() {
        assert_ne!(digest("Address = 10.0.0.1/24\n"), digest("Address = 10.0.0.1/24"));
    }
}

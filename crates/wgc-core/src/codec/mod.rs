//! Configuration Text Codec
//!
//! Converts tunnel configs to the canonical `wg-quick` style text and
//! parses that text back. Rendering is strict, parsing is lenient.

pub mod parse;
pub mod render;

pub use parse::{parse, parse_lines, ConfigParser};
pub use render::{render, render_client, render_peer, ClientDocument};

/// Marker line opening the interface section
pub const INTERFACE_MARKER: &str = "[Interface]";

/// Marker line opening a peer block
pub const PEER_MARKER: &str = "[Peer]";

/// Split a comma-joined value into trimmed, non-empty entries
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(String::from)
        .collect()
}

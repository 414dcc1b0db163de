//! CIDR Blocks
//!
//! Parses CIDR notation and enumerates the usable host addresses of an
//! IPv4 block without materialising the range.

use std::iter::FusedIterator;
use std::net::Ipv4Addr;

use ipnet::{IpNet, Ipv4Net};

use crate::error::{Result, WgError};

/// Parse a CIDR block of either address family
pub fn parse_block(cidr: &str) -> Result<IpNet> {
    cidr.trim()
        .parse::<IpNet>()
        .map_err(|_| WgError::MalformedAddress(cidr.to_string()))
}

/// Parse an IPv4 CIDR block
pub fn parse_ipv4_block(cidr: &str) -> Result<Ipv4Net> {
    cidr.trim()
        .parse::<Ipv4Net>()
        .map_err(|_| WgError::MalformedAddress(cidr.to_string()))
}

/// Strip the prefix length from an address entry (`10.0.0.2/32` -> `10.0.0.2`)
pub fn bare_address(entry: &str) -> &str {
    entry
        .split_once('/')
        .map_or(entry, |(addr, _)| addr)
        .trim()
}

/// Enumerate the host addresses of `cidr` in ascending order
///
/// The network and broadcast addresses are excluded, so a `/n` block
/// yields `2^(32-n) - 2` addresses and `/31` or `/32` yield nothing.
/// Each call returns a fresh, independent iterator.
pub fn enumerate_hosts(cidr: &str) -> Result<Hosts> {
    parse_ipv4_block(cidr).map(Hosts::new)
}

/// Lazy iterator over the host addresses of an IPv4 block
#[derive(Debug, Clone)]
pub struct Hosts {
    front: u32,
    back: u32,
    remaining: u64,
}

impl Hosts {
    /// Create the host range for `net`; host bits of the base address are masked off
    pub fn new(net: Ipv4Net) -> Self {
        let network = u32::from(net.network());
        let broadcast = u32::from(net.broadcast());

        if net.prefix_len() >= 31 {
            return Self {
                front: 0,
                back: 0,
                remaining: 0,
            };
        }

        Self {
            front: network + 1,
            back: broadcast - 1,
            remaining: u64::from(broadcast - network - 1),
        }
    }

    /// Number of addresses not yet yielded
    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl Iterator for Hosts {
    type Item = Ipv4Addr;

    fn next(&mut self) -> Option<Ipv4Addr> {
        if self.remaining == 0 {
            return None;
        }

        let current = self.front;
        self.remaining -= 1;
        if self.remaining > 0 {
            self.front += 1;
        }
        Some(Ipv4Addr::from(current))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let exact = usize::try_from(self.remaining).ok();
        (exact.unwrap_or(usize::MAX), exact)
    }
}

impl DoubleEndedIterator for Hosts {
    fn next_back(&mut self) -> Option<Ipv4Addr> {
        if self.remaining == 0 {
            return None;
        }

        let current = self.back;
        self.remaining -= 1;
        if self.remaining > 0 {
            self.back -= 1;
        }
        Some(Ipv4Addr::from(current))
    }
}

impl FusedIterator for Hosts {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slash_24_hosts() {
        let hosts: Vec<Ipv4Addr> = enumerate_hosts("192.168.1.0/24").unwrap().collect();

        assert_eq!(hosts.len(), 254);
        assert_eq!(hosts[0], Ipv4Addr::new(192, 168, 1, 1));
        assert_eq!(hosts[253], Ipv4Addr::new(192, 168, 1, 254));
    }

    #[test]
    fn test_host_counts_match_prefix() {
        for prefix in 16..=30u32 {
            let cidr = format!("10.0.0.0/{}", prefix);
            let hosts: Vec<Ipv4Addr> = enumerate_hosts(&cidr).unwrap().collect();
            let expected = (1usize << (32 - prefix)) - 2;

            assert_eq!(hosts.len(), expected, "prefix /{}", prefix);
            assert!(hosts.windows(2).all(|w| w[0] < w[1]), "prefix /{} not ascending", prefix);
            assert_ne!(hosts[0], Ipv4Addr::new(10, 0, 0, 0));
        }
    }

    #[test]
    fn test_point_to_point_and_single_host_are_empty() {
        assert_eq!(enumerate_hosts("10.0.0.0/31").unwrap().count(), 0);
        assert_eq!(enumerate_hosts("10.0.0.7/32").unwrap().count(), 0);
    }

    #[test]
    fn test_slash_30() {
        let hosts: Vec<String> = enumerate_hosts("10.9.0.4/30")
            .unwrap()
            .map(|a| a.to_string())
            .collect();
        assert_eq!(hosts, vec!["10.9.0.5", "10.9.0.6"]);
    }

    #[test]
    fn test_host_bits_are_masked() {
        let mut hosts = enumerate_hosts("10.10.1.77/24").unwrap();
        assert_eq!(hosts.next(), Some(Ipv4Addr::new(10, 10, 1, 1)));
        assert_eq!(hosts.next_back(), Some(Ipv4Addr::new(10, 10, 1, 254)));
    }

    #[test]
    fn test_restartable() {
        let mut first = enumerate_hosts("172.16.0.0/29").unwrap();
        first.next();
        first.next();

        let second = enumerate_hosts("172.16.0.0/29").unwrap();
        assert_eq!(second.remaining(), 6);
        assert_eq!(first.remaining(), 4);

        let cloned = first.clone();
        assert_eq!(cloned.count(), first.count());
    }

    #[test]
    fn test_large_block_is_lazy() {
        let hosts = enumerate_hosts("10.0.0.0/8").unwrap();
        assert_eq!(hosts.size_hint(), (16_777_214, Some(16_777_214)));

        let head: Vec<Ipv4Addr> = hosts.take(2).collect();
        assert_eq!(head, vec![Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2)]);
    }

    #[test]
    fn test_double_ended_meets_in_middle() {
        let mut hosts = enumerate_hosts("10.0.0.0/30").unwrap();
        assert_eq!(hosts.next_back(), Some(Ipv4Addr::new(10, 0, 0, 2)));
        assert_eq!(hosts.next(), Some(Ipv4Addr::new(10, 0, 0, 1)));
        assert_eq!(hosts.next(), None);
        assert_eq!(hosts.next_back(), None);
    }

    #[test]
    fn test_malformed_blocks() {
        let inputs = [
            "10.0.0.0/33",
            "10.0.0/24",
            "10.0.0.256/24",
            "10.0.0.0",
            "abc/24",
            "10.0.0.0/x",
        ];
        for bad in inputs {
            match enumerate_hosts(bad) {
                Err(WgError::MalformedAddress(input)) => assert_eq!(input, bad),
                other => panic!(
                    "expected MalformedAddress for {}, got {:?}",
                    bad,
                    other.map(|h| h.count())
                ),
            }
        }
    }

    #[test]
    fn test_bare_address() {
        assert_eq!(bare_address("10.0.0.2/32"), "10.0.0.2");
        assert_eq!(bare_address("::/0"), "::");
        assert_eq!(bare_address("10.0.0.9"), "10.0.0.9");
    }
}

//! Free Address Allocation
//!
//! Picks the first host address that is not yet in use, walking the
//! configured pools in order.

use std::collections::HashSet;
use std::net::Ipv4Addr;

use ipnet::IpNet;
use tracing::debug;

use super::cidr::{bare_address, parse_block, Hosts};
use crate::error::{Result, WgError};

/// Find the first free host address across `pools`
///
/// Pools are visited in the order given and each pool in ascending address
/// order. `used` holds bare addresses (no prefix); entries that are not IPv4
/// addresses never match. IPv6 pools are skipped since only IPv4 hosts are
/// allocated.
pub fn next_free<S: AsRef<str>>(pools: &[S], used: &HashSet<String>) -> Result<Ipv4Addr> {
    let taken: HashSet<Ipv4Addr> = used
        .iter()
        .filter_map(|addr| bare_address(addr).parse().ok())
        .collect();

    for pool in pools {
        let pool = pool.as_ref();
        let net = match parse_block(pool)? {
            IpNet::V4(net) => net,
            IpNet::V6(_) => {
                debug!("Skipping IPv6 pool {} for allocation", pool);
                continue;
            }
        };

        if let Some(addr) = Hosts::new(net).find(|addr| !taken.contains(addr)) {
            debug!("Allocated {} from pool {}", addr, pool);
            return Ok(addr);
        }

        debug!("Pool {} exhausted", pool);
    }

    Err(WgError::AddressPoolExhausted {
        pools: pools.iter().map(|p| p.as_ref().to_string()).collect(),
    })
}

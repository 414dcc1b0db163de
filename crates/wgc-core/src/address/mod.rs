//! Address Management
//!
//! CIDR parsing, lazy host enumeration and free-address allocation
//! for handing out single-host peer addresses.

pub mod allocator;
pub mod cidr;

pub use allocator::next_free;
pub use cidr::{bare_address, enumerate_hosts, parse_block, parse_ipv4_block, Hosts};

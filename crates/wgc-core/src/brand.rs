//! Branding Constants
//!
//! Single source of truth for product naming and branding.

/// Product display name
pub const PRODUCT_NAME: &str = "WgConf";

/// Binary executable name
pub const BIN_NAME: &str = "wgconf";

/// Directory name under the platform config dir
pub const CONFIG_DIR_NAME: &str = "wgconf";

/// Default interface name, used for the tunnel file name
pub const DEFAULT_INTERFACE: &str = "wg0";

/// Short description
pub const DESCRIPTION: &str = "WireGuard tunnel configuration manager";

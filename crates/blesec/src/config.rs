//! Build-time style configuration for the security and privacy layers

use std::time::Duration;

/// Default number of simultaneous connections tracked per connection handle
pub const DEFAULT_MAX_CONNECTIONS: usize = 3;
/// Default number of bonds kept in the security database
pub const DEFAULT_MAX_BONDS: usize = 5;
/// Default private address rotation period (15 minutes)
pub const DEFAULT_ROTATION_TIMEOUT: Duration = Duration::from_secs(900);
/// Default number of cached host resolution results
pub const DEFAULT_RESOLUTION_CACHE_SIZE: usize = 16;
/// Default number of queued privacy control blocks
pub const DEFAULT_MAX_PENDING_PRIVACY_OPERATIONS: usize = 16;

/// Optional stack features, mirroring what the firmware was built with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureSupport {
    /// Central role commands are available
    pub central: bool,
    /// Peripheral role commands are available
    pub peripheral: bool,
    /// Identity distribution and private addresses
    pub privacy: bool,
    /// CSRK distribution and signed writes
    pub signing: bool,
    /// LE Secure Connections pairing
    pub secure_connections: bool,
    /// Resolve private addresses on the host when the controller cannot
    pub host_based_resolution: bool,
}

impl Default for FeatureSupport {
    fn default() -> Self {
        Self {
            central: true,
            peripheral: true,
            privacy: true,
            signing: true,
            secure_connections: true,
            host_based_resolution: true,
        }
    }
}

/// Security configuration shared by every component of a [`SecurityContext`](crate::SecurityContext)
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// Highest valid connection handle for per-connection tables
    pub max_connections: usize,
    /// Capacity of the bond table and of the resolving list
    pub max_bonds: usize,
    /// Enabled features
    pub features: FeatureSupport,
    /// Private address rotation period
    pub rotation_timeout: Duration,
    /// Size of the host resolution caches
    pub resolution_cache_size: usize,
    /// Maximum number of queued privacy control blocks
    pub max_pending_privacy_operations: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            max_bonds: DEFAULT_MAX_BONDS,
            features: FeatureSupport::default(),
            rotation_timeout: DEFAULT_ROTATION_TIMEOUT,
            resolution_cache_size: DEFAULT_RESOLUTION_CACHE_SIZE,
            max_pending_privacy_operations: DEFAULT_MAX_PENDING_PRIVACY_OPERATIONS,
        }
    }
}

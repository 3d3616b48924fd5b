//! blesec - Security and privacy core of a Bluetooth LE host stack
//!
//! This library sits between an application and the lower layers that run
//! the pairing cryptography and the link layer. It provides:
//! - [`SmpManager`]: pairing, encryption and signing commands, and the
//!   translation of lower-layer security events into application callbacks
//! - [`PrivateAddressController`]: private address rotation and resolution
//!   of peer private addresses against bonded identities
//! - [`SecurityDb`]: the bond table, kept in memory, in a flat file or in a
//!   key-value store
//!
//! [`SecurityContext`] wires the three together from one [`SecurityConfig`].

pub mod config;
pub mod context;
pub mod error;
pub mod gap;
pub mod privacy;
pub mod security_db;
pub mod smp;

// Re-export common types for convenience
pub use config::{FeatureSupport, SecurityConfig};
pub use context::SecurityContext;
pub use error::{BleError, BleResult};
pub use gap::{AddressType, BdAddr, ConnectionHandle, Whitelist};
pub use privacy::{PrivacyDriver, PrivateAddressController, PrivateAddressEventHandler, RotationTimer};
pub use security_db::{FileSecurityDb, KvSecurityDb, MemorySecurityDb, SecurityDb, SecurityDbBackend};
pub use smp::{IoCapability, LinkEncryption, SecurityLevel, SmpDriver, SmpEventHandler, SmpManager};

//! LE privacy
//!
//! Generation and rotation of the local private addresses, and the
//! resolving list used to map peer private addresses back to bonded
//! identities.

mod cache;
mod control_block;
mod controller;
mod driver;
mod handler;
mod types;

pub use self::cache::ResolutionCache;
pub use self::controller::PrivateAddressController;
pub use self::driver::{PrivacyDriver, PrivacyDriverEvent, RotationTimer};
pub use self::handler::{PrivateAddressEventHandler, PrivateAddressEventHandlerHandle};
pub use self::types::*;

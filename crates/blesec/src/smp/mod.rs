//! Security Manager Protocol (SMP) implementation
//!
//! This module implements the host side of the Bluetooth Security Manager, which is responsible for:
//! - Issuing pairing requests and responses
//! - Answering passkey, numeric comparison and OOB prompts
//! - Surfacing key distribution to the application
//! - Answering LTK requests and managing signing keys
//!
//! The pairing cryptography itself runs in the lower layer, reached through [`SmpDriver`].

mod constants;
mod crypto;
mod driver;
mod events;
mod handler;
mod keys;
mod manager;
mod types;
#[cfg(test)]
mod tests;

// Re-export public API
pub use self::constants::*;
pub use self::crypto::generate_passkey;
pub use self::driver::SmpDriver;
pub use self::events::{DistributedKey, SmpDriverEvent};
pub use self::handler::{SmpEventHandler, SmpEventHandlerHandle};
pub use self::keys::*;
pub use self::manager::SmpManager;
pub use self::types::*;

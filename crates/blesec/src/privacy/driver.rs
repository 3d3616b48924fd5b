//! Lower layer interfaces used by the private address controller

use crate::error::BleResult;
use crate::gap::{AddressType, BdAddr};
use crate::smp::Irk;
use std::time::Duration;

/// Privacy commands of the controller / platform layer
///
/// Commands are asynchronous: generation, resolution and resolving list
/// results come back as [`PrivacyDriverEvent`]s.
pub trait PrivacyDriver {
    /// Start computing an RPA from `local_irk`
    fn generate_resolvable_private_address(&mut self, local_irk: &Irk) -> BleResult<()>;

    /// Check whether `address` was generated from `irk`
    fn resolve_private_address(&mut self, address: &BdAddr, irk: &Irk) -> BleResult<()>;

    /// Whether the link layer implements address resolution
    fn is_ll_privacy_supported(&self) -> bool;

    fn set_ll_address_resolution(&mut self, enable: bool) -> BleResult<()>;

    fn set_ll_resolvable_private_address_timeout(&mut self, timeout: Duration) -> BleResult<()>;

    fn read_resolving_list_capacity(&self) -> usize;

    fn add_device_to_resolving_list(
        &mut self,
        peer_address_type: AddressType,
        peer_identity_address: &BdAddr,
        peer_irk: &Irk,
        local_irk: &Irk,
    ) -> BleResult<()>;

    fn remove_device_from_resolving_list(
        &mut self,
        peer_address_type: AddressType,
        peer_identity_address: &BdAddr,
    ) -> BleResult<()>;

    fn clear_resolving_list(&mut self) -> BleResult<()>;
}

/// Periodic timer driving address rotation
///
/// Each expiry is fed back as [`PrivacyDriverEvent::RotationTimeout`].
pub trait RotationTimer {
    /// Arm the timer, replacing any previous period
    fn attach(&mut self, period: Duration);

    fn detach(&mut self);
}

/// Indications from the privacy lower layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivacyDriverEvent {
    /// A requested RPA is ready
    ResolvablePrivateAddressGenerated(BdAddr),
    /// Result of the last `resolve_private_address` command
    PrivateAddressResolved(bool),
    /// The last resolving list command completed
    ResolvingListActionComplete,
    /// The rotation timer expired
    RotationTimeout,
}

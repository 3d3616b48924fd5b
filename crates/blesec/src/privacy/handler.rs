//! Application notifications of the private address controller

use crate::gap::{AddressType, BdAddr};

/// Receives generated addresses and resolution results
#[allow(unused_variables)]
pub trait PrivateAddressEventHandler {
    fn on_resolvable_private_addresses_generated(&mut self, address: BdAddr) {}

    fn on_non_resolvable_private_addresses_generated(&mut self, address: BdAddr) {}

    /// `identity` is set when `resolved` is true
    fn on_address_resolution_completed(
        &mut self,
        peer_resolvable_address: BdAddr,
        resolved: bool,
        identity: Option<(AddressType, BdAddr)>,
    ) {
    }
}

pub type PrivateAddressEventHandlerHandle = Box<dyn PrivateAddressEventHandler>;

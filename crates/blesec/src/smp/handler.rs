//! Application-facing callbacks of the security manager

use super::keys::*;
use super::types::*;
use crate::gap::{AddressType, BdAddr, ConnectionHandle};

/// Receives the high level outcomes of pairing and key distribution.
///
/// Every method has an empty default so applications only override what
/// they care about.
#[allow(unused_variables)]
pub trait SmpEventHandler {
    /// A central requested pairing (peripheral role)
    fn on_pairing_request(
        &mut self,
        connection: ConnectionHandle,
        oob_data_present: bool,
        auth: AuthRequirements,
        initiator_dist: KeyDistribution,
        responder_dist: KeyDistribution,
    ) {
    }

    fn on_pairing_error(&mut self, connection: ConnectionHandle, error: PairingFailure) {}

    fn on_pairing_timed_out(&mut self, connection: ConnectionHandle) {}

    fn on_pairing_completed(&mut self, connection: ConnectionHandle) {}

    fn on_link_encryption_result(&mut self, connection: ConnectionHandle, result: LinkEncryption) {}

    /// Passkey to display to the user
    fn on_passkey_display(&mut self, connection: ConnectionHandle, passkey: u32) {}

    fn on_keypress_notification(
        &mut self,
        connection: ConnectionHandle,
        notification: KeypressNotificationType,
    ) {
    }

    /// The user must enter the passkey shown on the peer
    fn on_passkey_request(&mut self, connection: ConnectionHandle) {}

    /// The user must confirm the numeric comparison value
    fn on_confirmation_request(&mut self, connection: ConnectionHandle, value: u32) {}

    fn on_legacy_pairing_oob_request(&mut self, connection: ConnectionHandle) {}

    fn on_secure_connections_oob_generated(&mut self, random: OobRandom, confirm: OobConfirm) {}

    fn on_keys_distributed_local_ltk(&mut self, connection: ConnectionHandle, ltk: Ltk) {}

    fn on_keys_distributed_local_ediv_rand(
        &mut self,
        connection: ConnectionHandle,
        ediv: Ediv,
        rand: Rand,
    ) {
    }

    fn on_keys_distributed_ltk(&mut self, connection: ConnectionHandle, ltk: Ltk) {}

    fn on_keys_distributed_ediv_rand(&mut self, connection: ConnectionHandle, ediv: Ediv, rand: Rand) {}

    fn on_keys_distributed_irk(&mut self, connection: ConnectionHandle, irk: Irk) {}

    fn on_keys_distributed_bdaddr(
        &mut self,
        connection: ConnectionHandle,
        address_type: AddressType,
        address: BdAddr,
    ) {
    }

    fn on_keys_distributed_csrk(&mut self, connection: ConnectionHandle, csrk: Csrk) {}

    /// LTK request for a key derived by Secure Connections
    fn on_ltk_request(&mut self, connection: ConnectionHandle) {}

    /// LTK request for a legacy key identified by EDIV/RAND
    fn on_ltk_request_with_ediv_rand(&mut self, connection: ConnectionHandle, ediv: Ediv, rand: Rand) {}

    /// A peripheral asked for security (central role)
    fn on_slave_security_request(&mut self, connection: ConnectionHandle, auth: AuthRequirements) {}
}

/// Boxed handler registered with the security manager
pub type SmpEventHandlerHandle = Box<dyn SmpEventHandler>;

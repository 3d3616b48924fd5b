//! Commands the security manager issues to the lower layer
//!
//! Every call returns as soon as the command is queued; the outcome comes
//! back later as an [`SmpDriverEvent`](super::SmpDriverEvent).

use super::keys::*;
use super::types::*;
use crate::error::BleResult;
use crate::gap::{BdAddr, ConnectionHandle};

/// Link layer / host stack interface consumed by [`SmpManager`](super::SmpManager)
pub trait SmpDriver {
    /// Request a fresh P-256 key pair
    fn generate_ecc_key(&mut self) -> BleResult<()>;

    fn set_io_capability(&mut self, io_capability: IoCapability) -> BleResult<()>;

    fn set_encryption_key_requirements(&mut self, min_size: u8, max_size: u8) -> BleResult<()>;

    fn set_secure_connections_support(&mut self, enabled: bool) -> BleResult<()>;

    fn send_pairing_request(
        &mut self,
        connection: ConnectionHandle,
        oob_data_present: bool,
        auth: AuthRequirements,
        initiator_dist: KeyDistribution,
        responder_dist: KeyDistribution,
    ) -> BleResult<()>;

    fn send_pairing_response(
        &mut self,
        connection: ConnectionHandle,
        oob_data_present: bool,
        auth: AuthRequirements,
        initiator_dist: KeyDistribution,
        responder_dist: KeyDistribution,
    ) -> BleResult<()>;

    fn cancel_pairing(&mut self, connection: ConnectionHandle, reason: PairingFailure) -> BleResult<()>;

    /// Start encryption with a stored key; `ediv_rand` is `None` for Secure Connections keys
    fn enable_encryption(
        &mut self,
        connection: ConnectionHandle,
        ltk: Ltk,
        ediv_rand: Option<(Ediv, Rand)>,
        level: SecurityLevel,
    ) -> BleResult<()>;

    /// Answer an LTK request; `None` means the key was not found
    fn ltk_reply(&mut self, connection: ConnectionHandle, reply: Option<(Ltk, SecurityLevel)>) -> BleResult<()>;

    fn set_local_csrk(&mut self, csrk: Csrk, sign_counter: u32) -> BleResult<()>;

    /// Install or remove (`None`) the CSRK used to verify signed writes
    fn set_peer_csrk(&mut self, connection: ConnectionHandle, csrk: Option<PeerCsrk>) -> BleResult<()>;

    fn set_irk(&mut self, irk: Irk) -> BleResult<()>;

    fn set_identity_address(&mut self, address: BdAddr, public_address: bool) -> BleResult<()>;

    /// Answer a passkey request; `None` rejects it
    fn passkey_reply(&mut self, connection: ConnectionHandle, passkey: Option<u32>) -> BleResult<()>;

    /// Answer a legacy OOB request; `None` rejects it
    fn oob_reply(&mut self, connection: ConnectionHandle, tk: Option<OobTk>) -> BleResult<()>;

    fn confirmation_reply(&mut self, connection: ConnectionHandle, confirmed: bool) -> BleResult<()>;

    fn send_keypress_notification(
        &mut self,
        connection: ConnectionHandle,
        notification: KeypressNotificationType,
    ) -> BleResult<()>;

    /// Compute the local Secure Connections OOB confirm value
    fn calculate_oob(&mut self, random: OobRandom, public_key_x: PublicKeyCoord) -> BleResult<()>;

    fn set_secure_connections_oob(
        &mut self,
        connection: ConnectionHandle,
        local_random: OobRandom,
        peer_random: OobRandom,
        peer_confirm: OobConfirm,
    ) -> BleResult<()>;

    /// Random bytes from the controller
    fn random_data(&mut self) -> BleResult<Rand>;
}

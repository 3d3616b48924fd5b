//! Indications delivered by the lower layer to the security manager

use super::keys::*;
use super::types::*;
use crate::gap::{AddressType, BdAddr, ConnectionHandle};

/// Key material received or generated during the key distribution phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributedKey {
    /// LTK generated locally and sent to the peer
    LocalLtk { ltk: Ltk, ediv: Ediv, rand: Rand },
    /// LTK distributed by the peer
    PeerLtk { ltk: Ltk, ediv: Ediv, rand: Rand },
    /// Peer identity address and IRK
    PeerIdentity {
        address_type: AddressType,
        address: BdAddr,
        irk: Irk,
    },
    /// Peer signing key
    PeerCsrk(Csrk),
}

/// Every message the lower layer can dispatch to the security manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmpDriverEvent {
    /// Pairing procedure finished successfully
    PairingCompleted { connection: ConnectionHandle },
    /// Pairing procedure failed; `status` is an SMP reason or a stack status
    PairingFailed {
        connection: ConnectionHandle,
        status: u8,
    },
    /// Link encryption established at the given level
    EncryptionChanged {
        connection: ConnectionHandle,
        level: SecurityLevel,
    },
    /// Link encryption could not be established
    EncryptionFailed {
        connection: ConnectionHandle,
        status: u8,
    },
    /// The stack needs a passkey or an OOB temporary key
    AuthenticationRequest {
        connection: ConnectionHandle,
        oob: bool,
        display: bool,
    },
    /// A key was exchanged during key distribution
    KeyDistributed {
        connection: ConnectionHandle,
        key: DistributedKey,
    },
    /// The controller asks for the LTK matching EDIV/RAND
    LtkRequest {
        connection: ConnectionHandle,
        ediv: Ediv,
        rand: Rand,
    },
    /// Peripheral role: the central sent a pairing request
    PairingIndication {
        connection: ConnectionHandle,
        oob_data_present: bool,
        auth: AuthRequirements,
        initiator_dist: KeyDistribution,
        responder_dist: KeyDistribution,
    },
    /// Central role: the peripheral asked for security
    SlaveSecurityRequest {
        connection: ConnectionHandle,
        auth: AuthRequirements,
    },
    /// Secure Connections OOB confirm value computed
    ScOobCalculated {
        random: OobRandom,
        confirm: OobConfirm,
    },
    /// A new ECC key pair was generated
    EccKeyGenerated { public_key: PublicKey },
    /// Numeric comparison value to show the user
    NumericComparison {
        connection: ConnectionHandle,
        value: u32,
    },
    /// Keypress notification received from the peer
    KeypressNotification {
        connection: ConnectionHandle,
        notification: KeypressNotificationType,
    },
}

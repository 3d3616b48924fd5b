//! Bond table records

use crate::gap::{AddressType, BdAddr};
use crate::smp::{Csrk, Ediv, Irk, Ltk, Rand};
use bitflags::bitflags;

/// Connection and key distribution state of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DistributionFlags(u16);

bitflags! {
    impl DistributionFlags: u16 {
        /// The peer is currently connected
        const CONNECTED = 1 << 0;
        /// A local LTK was distributed to the peer
        const LTK_SENT = 1 << 1;
        /// The peer distributed its LTK
        const LTK_STORED = 1 << 2;
        /// The peer LTK was obtained with MITM protection
        const LTK_MITM_PROTECTED = 1 << 3;
        const IRK_STORED = 1 << 4;
        const CSRK_STORED = 1 << 5;
        const CSRK_MITM_PROTECTED = 1 << 6;
        /// Keys were derived by LE Secure Connections
        const SECURE_CONNECTIONS_PAIRED = 1 << 7;
    }
}

impl DistributionFlags {
    /// Any bonding material
    pub const KEYS: Self = Self::LTK_SENT
        .union(Self::LTK_STORED)
        .union(Self::IRK_STORED)
        .union(Self::CSRK_STORED);
}

/// Per peer distribution state and connection address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SecurityDistributionFlags {
    /// Address the peer connected with
    pub peer_address: BdAddr,
    pub peer_address_is_public: bool,
    pub encryption_key_size: u8,
    pub flags: DistributionFlags,
}

impl SecurityDistributionFlags {
    pub fn is_connected(&self) -> bool {
        self.flags.contains(DistributionFlags::CONNECTED)
    }

    /// Whether the entry holds keys worth keeping
    pub fn has_keys(&self) -> bool {
        self.flags.intersects(DistributionFlags::KEYS)
    }

    pub fn matches_address(&self, address_type: AddressType, address: &BdAddr) -> bool {
        self.peer_address == *address && self.peer_address_is_public == address_type.is_public()
    }
}

/// LTK with the EDIV/RAND identifying it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SecurityEntryKeys {
    pub ltk: Ltk,
    pub ediv: Ediv,
    pub rand: Rand,
}

impl SecurityEntryKeys {
    pub fn matches(&self, ediv: Ediv, rand: &Rand) -> bool {
        self.ediv == ediv && self.rand == *rand
    }
}

/// Identity address and IRK, of a peer or of the local device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SecurityEntryIdentity {
    pub irk: Irk,
    pub identity_address: BdAddr,
    pub identity_address_is_public: bool,
}

impl SecurityEntryIdentity {
    pub fn address_type(&self) -> AddressType {
        if self.identity_address_is_public {
            AddressType::PublicIdentity
        } else {
            AddressType::RandomStaticIdentity
        }
    }
}

/// Peer CSRK and the last sign counter seen with it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SecurityEntrySigning {
    pub csrk: Csrk,
    pub counter: u32,
}

/// Everything stored for one bonded peer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SecurityEntry {
    pub flags: SecurityDistributionFlags,
    pub local_keys: SecurityEntryKeys,
    pub peer_keys: SecurityEntryKeys,
    pub peer_identity: SecurityEntryIdentity,
    pub peer_signing: SecurityEntrySigning,
}

/// Local identity and signing state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LocalSecurity {
    pub identity: SecurityEntryIdentity,
    pub csrk: Csrk,
    pub sign_counter: u32,
}

/// State read back from a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedDb {
    pub restore: bool,
    pub local: LocalSecurity,
    pub entries: Vec<SecurityEntry>,
}

/// Index of an entry in the bond table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryHandle(pub(crate) usize);

impl EntryHandle {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// One independently persisted part of an entry
#[derive(Debug, Clone, Copy)]
pub enum EntryRecord<'a> {
    Flags(&'a SecurityDistributionFlags),
    LocalKeys(&'a SecurityEntryKeys),
    PeerKeys(&'a SecurityEntryKeys),
    PeerIdentity(&'a SecurityEntryIdentity),
    PeerSigning(&'a SecurityEntrySigning),
}

impl<'a> EntryRecord<'a> {
    /// Every record of `entry`, in storage order
    pub fn all(entry: &'a SecurityEntry) -> [EntryRecord<'a>; 5] {
        [
            EntryRecord::Flags(&entry.flags),
            EntryRecord::LocalKeys(&entry.local_keys),
            EntryRecord::PeerKeys(&entry.peer_keys),
            EntryRecord::PeerIdentity(&entry.peer_identity),
            EntryRecord::PeerSigning(&entry.peer_signing),
        ]
    }
}

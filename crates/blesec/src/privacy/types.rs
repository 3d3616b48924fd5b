//! Privacy types

use crate::gap::{AddressType, BdAddr};
use crate::smp::Irk;

/// Where private addresses of peers get resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionMode {
    /// The link layer resolves addresses against its own resolving list
    Controller,
    /// The host walks the resolving list and asks the driver to check each IRK
    Host,
}

/// State of the private address rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RotationState {
    #[default]
    Stopped,
    Running,
}

/// One bonded peer known to the resolving list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvingListEntry {
    pub peer_address_type: AddressType,
    pub peer_identity_address: BdAddr,
    pub peer_irk: Irk,
}

impl ResolvingListEntry {
    pub fn new(peer_address_type: AddressType, peer_identity_address: BdAddr, peer_irk: Irk) -> Self {
        Self {
            peer_address_type,
            peer_identity_address,
            peer_irk,
        }
    }

    /// Same identity, regardless of the IRK
    pub fn matches(&self, address_type: AddressType, address: &BdAddr) -> bool {
        self.peer_address_type == address_type && self.peer_identity_address == *address
    }
}

/// Identity a private address resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub address_type: AddressType,
    pub address: BdAddr,
}

impl From<&ResolvingListEntry> for ResolvedIdentity {
    fn from(entry: &ResolvingListEntry) -> Self {
        Self {
            address_type: entry.peer_address_type,
            address: entry.peer_identity_address,
        }
    }
}

/// Immediate outcome of a resolution request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressResolution {
    /// Answered from cache
    Resolved(ResolvedIdentity),
    /// Known not to belong to any bonded peer
    Unresolved,
    /// Resolution queued; the result is delivered to the event handler
    Pending,
}

use crate::error::{BleError, BleResult};
use crate::gap::constants::*;
use std::fmt;
use std::str::FromStr;

/// Peer address type as reported by the controller or resolved by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressType {
    Public,
    Random,
    PublicIdentity,
    RandomStaticIdentity,
}

impl AddressType {
    /// Whether the address is a public device address, resolved or not
    pub fn is_public(&self) -> bool {
        matches!(self, AddressType::Public | AddressType::PublicIdentity)
    }

    /// Whether the type refers to an identity already resolved by the host
    pub fn is_identity(&self) -> bool {
        matches!(
            self,
            AddressType::PublicIdentity | AddressType::RandomStaticIdentity
        )
    }

    /// Address type used on air for an identity address
    pub fn from_public_flag(is_public: bool) -> Self {
        if is_public {
            AddressType::Public
        } else {
            AddressType::Random
        }
    }
}

impl From<u8> for AddressType {
    fn from(value: u8) -> Self {
        match value {
            PUBLIC_DEVICE_ADDRESS => AddressType::Public,
            RANDOM_DEVICE_ADDRESS => AddressType::Random,
            PUBLIC_IDENTITY_ADDRESS => AddressType::PublicIdentity,
            RANDOM_STATIC_IDENTITY_ADDRESS => AddressType::RandomStaticIdentity,
            _ => AddressType::Public,
        }
    }
}

impl From<AddressType> for u8 {
    fn from(value: AddressType) -> Self {
        match value {
            AddressType::Public => PUBLIC_DEVICE_ADDRESS,
            AddressType::Random => RANDOM_DEVICE_ADDRESS,
            AddressType::PublicIdentity => PUBLIC_IDENTITY_ADDRESS,
            AddressType::RandomStaticIdentity => RANDOM_STATIC_IDENTITY_ADDRESS,
        }
    }
}

/// Bluetooth device address, stored little endian as on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BdAddr {
    pub bytes: [u8; 6],
}

impl BdAddr {
    pub fn new(bytes: [u8; 6]) -> Self {
        Self { bytes }
    }

    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        if slice.len() >= 6 {
            let mut bytes = [0u8; 6];
            bytes.copy_from_slice(&slice[0..6]);
            Some(Self { bytes })
        } else {
            None
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn is_zero(&self) -> bool {
        self.bytes == [0u8; 6]
    }

    /// Random address sub-type bits (most significant byte)
    fn random_bits(&self) -> u8 {
        self.bytes[5] & RANDOM_ADDRESS_TYPE_MASK
    }

    pub fn is_resolvable_private(&self) -> bool {
        self.random_bits() == RESOLVABLE_PRIVATE_ADDRESS_BITS
    }

    pub fn is_non_resolvable_private(&self) -> bool {
        self.random_bits() == NON_RESOLVABLE_PRIVATE_ADDRESS_BITS
    }

    pub fn is_static_random(&self) -> bool {
        self.random_bits() == STATIC_RANDOM_ADDRESS_BITS
    }
}

impl fmt::Display for BdAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.bytes[5],
            self.bytes[4],
            self.bytes[3],
            self.bytes[2],
            self.bytes[1],
            self.bytes[0]
        )
    }
}

impl FromStr for BdAddr {
    type Err = BleError;

    /// Parse the usual `AA:BB:CC:DD:EE:FF` notation (most significant byte first)
    fn from_str(s: &str) -> BleResult<Self> {
        let cleaned: String = s.chars().filter(|c| *c != ':').collect();
        let mut bytes_be = [0u8; 6];
        hex::decode_to_slice(&cleaned, &mut bytes_be)
            .map_err(|e| BleError::InvalidParameter(format!("bad address {}: {}", s, e)))?;
        bytes_be.reverse();
        Ok(Self { bytes: bytes_be })
    }
}

/// A single row of the controller filter accept list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WhitelistEntry {
    pub address_type: AddressType,
    pub address: BdAddr,
}

/// Capacity-bounded whitelist filled by the security database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Whitelist {
    capacity: usize,
    entries: Vec<WhitelistEntry>,
}

impl Whitelist {
    /// Create an empty whitelist able to hold `capacity` addresses
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// Append an address; fails with `NoMemory` once capacity is exhausted
    pub fn push(&mut self, address_type: AddressType, address: BdAddr) -> BleResult<()> {
        if self.is_full() {
            return Err(BleError::NoMemory);
        }
        self.entries.push(WhitelistEntry {
            address_type,
            address,
        });
        Ok(())
    }

    pub fn entries(&self) -> &[WhitelistEntry] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Controller-assigned handle of an LE connection
pub type ConnectionHandle = u16;

//! Key material for the Security Manager Protocol
//!
//! This module defines the keys exchanged and stored during bonding:
//! Long Term Keys (LTK) with their EDIV/RAND identifiers, Identity Resolving
//! Keys (IRK) and Connection Signature Resolving Keys (CSRK), plus the
//! out-of-band and ECC values used by the pairing flows.

use crate::error::{BleError, BleResult};
use std::fmt;
use std::str::FromStr;

macro_rules! octet_key {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            /// Size of the key in bytes
            pub const LEN: usize = $len;

            pub fn new(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// An all-zero value is never a valid key
            pub fn is_zero(&self) -> bool {
                self.0.iter().all(|b| *b == 0)
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), hex::encode(self.0))
            }
        }

        impl FromStr for $name {
            type Err = BleError;

            fn from_str(s: &str) -> BleResult<Self> {
                let mut bytes = [0u8; $len];
                hex::decode_to_slice(s, &mut bytes).map_err(|e| {
                    BleError::InvalidParameter(format!("{}: {}", stringify!($name), e))
                })?;
                Ok(Self(bytes))
            }
        }
    };
}

octet_key!(
    /// Long Term Key
    Ltk,
    16
);
octet_key!(
    /// Identity Resolving Key
    Irk,
    16
);
octet_key!(
    /// Connection Signature Resolving Key
    Csrk,
    16
);
octet_key!(
    /// Random number identifying a legacy LTK
    Rand,
    8
);
octet_key!(
    /// Temporary key supplied out of band for legacy pairing
    OobTk,
    16
);
octet_key!(
    /// Random value used by Secure Connections OOB pairing
    OobRandom,
    16
);
octet_key!(
    /// Confirm value used by Secure Connections OOB pairing
    OobConfirm,
    16
);
octet_key!(
    /// One coordinate of a P-256 public key
    PublicKeyCoord,
    32
);

/// Encrypted diversifier identifying a legacy LTK
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Ediv(pub u16);

impl Ediv {
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl From<u16> for Ediv {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

/// Local ECC public key generated for Secure Connections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PublicKey {
    pub x: PublicKeyCoord,
    pub y: PublicKeyCoord,
}

/// Peer CSRK cached per connection for signed write verification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerCsrk {
    /// Key value
    pub csrk: Csrk,
    /// Whether the key was distributed over an authenticated link
    pub authenticated: bool,
    /// Last sign counter seen from the peer
    pub sign_counter: u32,
}

impl PeerCsrk {
    pub fn new(csrk: Csrk, authenticated: bool, sign_counter: u32) -> Self {
        Self {
            csrk,
            authenticated,
            sign_counter,
        }
    }
}

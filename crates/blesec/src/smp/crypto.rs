//! Random values produced on the host side of the security manager
//!
//! The heavy cryptography (AES, P-256, f4/f5/f6) runs in the lower layer;
//! the host only needs random passkeys and nonces.

use super::constants::SMP_PASSKEY_MODULUS;
use super::keys::OobRandom;
use rand::Rng;

/// Generate a random passkey bounded to six decimal digits (0-999999)
pub fn generate_passkey() -> u32 {
    rand::thread_rng().gen::<u32>() % SMP_PASSKEY_MODULUS
}

/// Generate the local random value of a Secure Connections OOB exchange
pub fn generate_oob_random() -> OobRandom {
    OobRandom(rand::thread_rng().gen())
}

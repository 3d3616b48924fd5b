//! Constants for the Security Manager Protocol

// Authentication Requirements bit masks
pub const SMP_AUTH_REQ_BONDING: u8 = 0x01;
pub const SMP_AUTH_REQ_MITM: u8 = 0x04;
pub const SMP_AUTH_REQ_SC: u8 = 0x08;
pub const SMP_AUTH_REQ_KEYPRESS: u8 = 0x10;
pub const SMP_AUTH_REQ_CT2: u8 = 0x20;

// Pairing Failed reason codes
pub const SMP_REASON_PASSKEY_ENTRY_FAILED: u8 = 0x01;
pub const SMP_REASON_OOB_NOT_AVAILABLE: u8 = 0x02;
pub const SMP_REASON_AUTHENTICATION_REQUIREMENTS: u8 = 0x03;
pub const SMP_REASON_CONFIRM_VALUE_FAILED: u8 = 0x04;
pub const SMP_REASON_PAIRING_NOT_SUPPORTED: u8 = 0x05;
pub const SMP_REASON_ENCRYPTION_KEY_SIZE: u8 = 0x06;
pub const SMP_REASON_COMMAND_NOT_SUPPORTED: u8 = 0x07;
pub const SMP_REASON_UNSPECIFIED_REASON: u8 = 0x08;
pub const SMP_REASON_REPEATED_ATTEMPTS: u8 = 0x09;
pub const SMP_REASON_INVALID_PARAMETERS: u8 = 0x0A;
pub const SMP_REASON_DHKEY_CHECK_FAILED: u8 = 0x0B;
pub const SMP_REASON_NUMERIC_COMPARISON_FAILED: u8 = 0x0C;
pub const SMP_REASON_BR_EDR_PAIRING_IN_PROGRESS: u8 = 0x0D;
pub const SMP_REASON_CROSS_TRANSPORT_KEY_NOT_ALLOWED: u8 = 0x0E;

// Host stack status codes carried by pairing failure indications
pub const SMP_STATUS_MEMORY: u8 = 0xE0;
pub const SMP_STATUS_TIMEOUT: u8 = 0xE1;
pub const SMP_STATUS_ATTEMPTS: u8 = 0xE2;

// SMP key distribution bit masks
pub const SMP_KEY_DIST_ENC_KEY: u8 = 0x01;
pub const SMP_KEY_DIST_ID_KEY: u8 = 0x02;
pub const SMP_KEY_DIST_SIGN_KEY: u8 = 0x04;
pub const SMP_KEY_DIST_LINK_KEY: u8 = 0x08;

// SMP encryption key size limits
pub const SMP_MIN_ENCRYPTION_KEY_SIZE: u8 = 7;
pub const SMP_MAX_ENCRYPTION_KEY_SIZE: u8 = 16;

// Passkeys are six decimal digits
pub const SMP_PASSKEY_MODULUS: u32 = 1_000_000;
pub const SMP_PASSKEY_MAX: u32 = SMP_PASSKEY_MODULUS - 1;

// Default SMP procedure timeout, in seconds
pub const SMP_DEFAULT_AUTHENTICATION_TIMEOUT_SECS: u64 = 30;

//! Type definitions for the Security Manager Protocol
use super::constants::*;
use std::fmt;
use std::time::Duration;

/// IO Capability types for pairing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoCapability {
    /// Display only capability
    DisplayOnly,
    /// Display with yes/no capability
    DisplayYesNo,
    /// Keyboard only
    KeyboardOnly,
    /// No input, no output
    NoInputNoOutput,
    /// Both keyboard and display
    KeyboardDisplay,
}

/// Authentication requirements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthRequirements {
    /// Whether bonding is required
    pub bonding: bool,
    /// Whether MITM protection is required
    pub mitm: bool,
    /// Whether Secure Connections is required
    pub secure_connections: bool,
    /// Whether keypress notifications are required
    pub keypress_notifications: bool,
    /// Whether CT2 feature is supported
    pub ct2: bool,
}

impl AuthRequirements {
    /// Create new authentication requirements
    pub fn new(bonding: bool, mitm: bool, secure_connections: bool) -> Self {
        Self {
            bonding,
            mitm,
            secure_connections,
            keypress_notifications: false,
            ct2: false,
        }
    }

    /// Convert to u8 value for protocol
    pub fn to_u8(&self) -> u8 {
        let mut value = 0;

        if self.bonding {
            value |= SMP_AUTH_REQ_BONDING;
        }

        if self.mitm {
            value |= SMP_AUTH_REQ_MITM;
        }

        if self.secure_connections {
            value |= SMP_AUTH_REQ_SC;
        }

        if self.keypress_notifications {
            value |= SMP_AUTH_REQ_KEYPRESS;
        }

        if self.ct2 {
            value |= SMP_AUTH_REQ_CT2;
        }

        value
    }
}

impl Default for AuthRequirements {
    /// Bonding enabled, everything else disabled
    fn default() -> Self {
        Self::new(true, false, false)
    }
}

/// Key distribution preferences
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyDistribution {
    /// Encryption key (LTK, EDIV, RAND)
    pub encryption_key: bool,
    /// Identity key (IRK, public address)
    pub identity_key: bool,
    /// Signing key (CSRK)
    pub signing_key: bool,
    /// Link key derivation
    pub link_key: bool,
}

impl KeyDistribution {
    /// Create new key distribution preferences
    pub fn new(encryption_key: bool, identity_key: bool, signing_key: bool, link_key: bool) -> Self {
        Self {
            encryption_key,
            identity_key,
            signing_key,
            link_key,
        }
    }

    /// Every LE key, no link key derivation
    pub fn all() -> Self {
        Self::new(true, true, true, false)
    }

    /// Create with all keys disabled
    pub fn none() -> Self {
        Self::new(false, false, false, false)
    }

    /// Convert to u8 value for protocol
    pub fn to_u8(&self) -> u8 {
        let mut value = 0;

        if self.encryption_key {
            value |= SMP_KEY_DIST_ENC_KEY;
        }

        if self.identity_key {
            value |= SMP_KEY_DIST_ID_KEY;
        }

        if self.signing_key {
            value |= SMP_KEY_DIST_SIGN_KEY;
        }

        if self.link_key {
            value |= SMP_KEY_DIST_LINK_KEY;
        }

        value
    }
}

/// Security level for a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SecurityLevel {
    /// No security (unencrypted)
    None = 0,
    /// Encryption without authentication (Just Works)
    EncryptionOnly = 1,
    /// Encryption with authentication (MITM protection)
    EncryptionWithAuthentication = 2,
    /// Secure Connections with encryption and authentication
    SecureConnections = 3,
}

impl SecurityLevel {
    /// Level provided by an LTK; Secure Connections wins over MITM
    pub fn for_ltk(mitm: bool, secure_connections: bool) -> Self {
        if secure_connections {
            SecurityLevel::SecureConnections
        } else if mitm {
            SecurityLevel::EncryptionWithAuthentication
        } else {
            SecurityLevel::EncryptionOnly
        }
    }
}

/// Outcome of a link encryption attempt as surfaced to the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEncryption {
    NotEncrypted,
    Encrypted,
    EncryptedWithMitm,
    EncryptedWithScAndMitm,
}

impl From<SecurityLevel> for LinkEncryption {
    fn from(level: SecurityLevel) -> Self {
        match level {
            SecurityLevel::None => LinkEncryption::NotEncrypted,
            SecurityLevel::EncryptionOnly => LinkEncryption::Encrypted,
            SecurityLevel::EncryptionWithAuthentication => LinkEncryption::EncryptedWithMitm,
            SecurityLevel::SecureConnections => LinkEncryption::EncryptedWithScAndMitm,
        }
    }
}

/// Reasons a pairing procedure can fail, as reported by the peer or the stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingFailure {
    PasskeyEntryFailed,
    OobNotAvailable,
    AuthenticationRequirements,
    ConfirmValueFailed,
    PairingNotSupported,
    EncryptionKeySize,
    CommandNotSupported,
    Unspecified,
    RepeatedAttempts,
    InvalidParameters,
    DhKeyCheckFailed,
    NumericComparisonFailed,
    BrEdrPairingInProgress,
    CrossTransportKeyNotAllowed,
}

impl PairingFailure {
    /// Convert an SMP reason code; returns `None` outside the defined range
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            SMP_REASON_PASSKEY_ENTRY_FAILED => Some(PairingFailure::PasskeyEntryFailed),
            SMP_REASON_OOB_NOT_AVAILABLE => Some(PairingFailure::OobNotAvailable),
            SMP_REASON_AUTHENTICATION_REQUIREMENTS => {
                Some(PairingFailure::AuthenticationRequirements)
            }
            SMP_REASON_CONFIRM_VALUE_FAILED => Some(PairingFailure::ConfirmValueFailed),
            SMP_REASON_PAIRING_NOT_SUPPORTED => Some(PairingFailure::PairingNotSupported),
            SMP_REASON_ENCRYPTION_KEY_SIZE => Some(PairingFailure::EncryptionKeySize),
            SMP_REASON_COMMAND_NOT_SUPPORTED => Some(PairingFailure::CommandNotSupported),
            SMP_REASON_UNSPECIFIED_REASON => Some(PairingFailure::Unspecified),
            SMP_REASON_REPEATED_ATTEMPTS => Some(PairingFailure::RepeatedAttempts),
            SMP_REASON_INVALID_PARAMETERS => Some(PairingFailure::InvalidParameters),
            SMP_REASON_DHKEY_CHECK_FAILED => Some(PairingFailure::DhKeyCheckFailed),
            SMP_REASON_NUMERIC_COMPARISON_FAILED => Some(PairingFailure::NumericComparisonFailed),
            SMP_REASON_BR_EDR_PAIRING_IN_PROGRESS => Some(PairingFailure::BrEdrPairingInProgress),
            SMP_REASON_CROSS_TRANSPORT_KEY_NOT_ALLOWED => {
                Some(PairingFailure::CrossTransportKeyNotAllowed)
            }
            _ => None,
        }
    }
}

impl fmt::Display for PairingFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PairingFailure::PasskeyEntryFailed => write!(f, "Passkey entry failed"),
            PairingFailure::OobNotAvailable => write!(f, "OOB data not available"),
            PairingFailure::AuthenticationRequirements => {
                write!(f, "Authentication requirements not met")
            }
            PairingFailure::ConfirmValueFailed => write!(f, "Confirm value failed"),
            PairingFailure::PairingNotSupported => write!(f, "Pairing not supported"),
            PairingFailure::EncryptionKeySize => write!(f, "Encryption key size issue"),
            PairingFailure::CommandNotSupported => write!(f, "Command not supported"),
            PairingFailure::Unspecified => write!(f, "Unspecified reason"),
            PairingFailure::RepeatedAttempts => write!(f, "Too many pairing attempts"),
            PairingFailure::InvalidParameters => write!(f, "Invalid parameters"),
            PairingFailure::DhKeyCheckFailed => write!(f, "DHKey check failed"),
            PairingFailure::NumericComparisonFailed => write!(f, "Numeric comparison failed"),
            PairingFailure::BrEdrPairingInProgress => write!(f, "BR/EDR pairing in progress"),
            PairingFailure::CrossTransportKeyNotAllowed => {
                write!(f, "Cross-transport key not allowed")
            }
        }
    }
}

/// Keypress notification type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeypressNotificationType {
    /// Entry started
    EntryStarted,
    /// Digit entered
    DigitEntered,
    /// Digit erased
    DigitErased,
    /// Cleared
    Cleared,
    /// Entry completed
    EntryCompleted,
}

/// Local pairing configuration held by the security manager
#[derive(Debug, Clone)]
pub struct PairingConfig {
    /// IO Capability
    pub io_capability: IoCapability,
    /// Minimum accepted encryption key size (7-16)
    pub min_key_size: u8,
    /// Maximum encryption key size (7-16)
    pub max_key_size: u8,
    /// Whether LE Secure Connections pairing is offered
    pub secure_connections: bool,
    /// SMP procedure timeout
    pub authentication_timeout: Duration,
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            io_capability: IoCapability::NoInputNoOutput,
            min_key_size: SMP_MIN_ENCRYPTION_KEY_SIZE,
            max_key_size: SMP_MAX_ENCRYPTION_KEY_SIZE,
            secure_connections: true,
            authentication_timeout: Duration::from_secs(SMP_DEFAULT_AUTHENTICATION_TIMEOUT_SECS),
        }
    }
}

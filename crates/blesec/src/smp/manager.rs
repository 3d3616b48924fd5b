//! Security Manager Protocol manager implementation
//!
//! This module provides the main interface of the SMP module. The manager
//! does not run the pairing cryptography itself: it turns application
//! intents into commands for the lower layer ([`SmpDriver`]) and turns the
//! lower layer indications ([`SmpDriverEvent`]) into calls on the
//! registered [`SmpEventHandler`].

use super::constants::*;
use super::crypto::{generate_oob_random, generate_passkey};
use super::driver::SmpDriver;
use super::events::{DistributedKey, SmpDriverEvent};
use super::handler::SmpEventHandlerHandle;
use super::keys::*;
use super::types::*;
use crate::config::FeatureSupport;
use crate::error::{BleError, BleResult};
use crate::gap::{BdAddr, ConnectionHandle};
use log::{debug, trace};
use std::time::Duration;

/// Security Manager Protocol manager
pub struct SmpManager<D: SmpDriver> {
    /// Lower layer receiving the commands
    driver: D,

    /// Features enabled in this build
    features: FeatureSupport,

    /// Local pairing configuration
    pairing_config: PairingConfig,

    /// Application event handler
    event_handler: Option<SmpEventHandlerHandle>,

    /// Passkey displayed instead of a random one, if configured
    default_passkey: Option<u32>,

    /// Local ECC public key, valid once `ecc_keys_generated` is set
    public_key: PublicKey,
    ecc_keys_generated: bool,

    /// OOB generation waiting for the ECC key pair
    oob_generation_pending: bool,

    /// Local signing key and counter
    local_csrk: Option<Csrk>,
    local_sign_counter: u32,

    /// Peer signing keys, indexed by connection handle - 1
    peer_csrks: Vec<Option<PeerCsrk>>,
}

impl<D: SmpDriver> SmpManager<D> {
    /// Create a new SMP manager
    pub fn new(driver: D, features: FeatureSupport, max_connections: usize) -> Self {
        Self {
            driver,
            features,
            pairing_config: PairingConfig {
                secure_connections: features.secure_connections,
                ..PairingConfig::default()
            },
            event_handler: None,
            default_passkey: None,
            public_key: PublicKey::default(),
            ecc_keys_generated: false,
            oob_generation_pending: false,
            local_csrk: None,
            local_sign_counter: 0,
            peer_csrks: vec![None; max_connections],
        }
    }

    /// Set the event handler; `None` drops every subsequent indication
    pub fn set_event_handler(&mut self, handler: Option<SmpEventHandlerHandle>) {
        self.event_handler = handler;
    }

    /// Lower layer driver
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Mutable access to the lower layer driver
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    //
    // Lifecycle
    //

    /// Reset transient state and request a fresh ECC key pair
    pub fn initialize(&mut self) -> BleResult<()> {
        self.default_passkey = None;
        self.ecc_keys_generated = false;
        self.oob_generation_pending = false;
        self.public_key = PublicKey::default();
        self.clear_peer_csrks();

        if self.features.secure_connections {
            self.driver.generate_ecc_key()?;
        }
        Ok(())
    }

    pub fn terminate(&mut self) -> BleResult<()> {
        self.clear_peer_csrks();
        Ok(())
    }

    pub fn reset(&mut self) -> BleResult<()> {
        self.terminate()?;
        self.initialize()
    }

    fn clear_peer_csrks(&mut self) {
        for slot in self.peer_csrks.iter_mut() {
            *slot = None;
        }
    }

    //
    // Configuration
    //

    /// Current pairing configuration
    pub fn pairing_config(&self) -> &PairingConfig {
        &self.pairing_config
    }

    pub fn set_io_capability(&mut self, io_capability: IoCapability) -> BleResult<()> {
        self.driver.set_io_capability(io_capability)?;
        self.pairing_config.io_capability = io_capability;
        Ok(())
    }

    /// Use a fixed passkey when the local device displays one; `None` restores random passkeys
    pub fn set_display_passkey(&mut self, passkey: Option<u32>) -> BleResult<()> {
        if let Some(passkey) = passkey {
            if passkey > SMP_PASSKEY_MAX {
                return Err(BleError::InvalidParameter(format!(
                    "passkey {} has more than six digits",
                    passkey
                )));
            }
        }
        self.default_passkey = passkey;
        Ok(())
    }

    /// Configured display passkey, if any
    pub fn display_passkey(&self) -> Option<u32> {
        self.default_passkey
    }

    /// Set the accepted encryption key size range; requires 7 <= min <= max <= 16
    pub fn set_encryption_key_requirements(&mut self, min_size: u8, max_size: u8) -> BleResult<()> {
        if min_size < SMP_MIN_ENCRYPTION_KEY_SIZE
            || min_size > SMP_MAX_ENCRYPTION_KEY_SIZE
            || max_size > SMP_MAX_ENCRYPTION_KEY_SIZE
            || min_size > max_size
        {
            return Err(BleError::InvalidParameter(format!(
                "encryption key size range {}..={} outside {}..={}",
                min_size, max_size, SMP_MIN_ENCRYPTION_KEY_SIZE, SMP_MAX_ENCRYPTION_KEY_SIZE
            )));
        }

        self.driver.set_encryption_key_requirements(min_size, max_size)?;
        self.pairing_config.min_key_size = min_size;
        self.pairing_config.max_key_size = max_size;
        Ok(())
    }

    pub fn set_secure_connections_support(&mut self, enabled: bool) -> BleResult<()> {
        if enabled && !self.features.secure_connections {
            return Err(BleError::NotImplemented);
        }
        self.driver.set_secure_connections_support(enabled)?;
        self.pairing_config.secure_connections = enabled;
        Ok(())
    }

    pub fn set_authentication_timeout(&mut self, timeout: Duration) -> BleResult<()> {
        if timeout.is_zero() {
            return Err(BleError::InvalidParameter(
                "authentication timeout must be non-zero".into(),
            ));
        }
        self.pairing_config.authentication_timeout = timeout;
        Ok(())
    }

    pub fn authentication_timeout(&self) -> Duration {
        self.pairing_config.authentication_timeout
    }

    pub fn set_irk(&mut self, irk: Irk) -> BleResult<()> {
        if !self.features.privacy {
            return Err(BleError::NotImplemented);
        }
        self.driver.set_irk(irk)
    }

    pub fn set_identity_address(&mut self, address: BdAddr, public_address: bool) -> BleResult<()> {
        if !self.features.privacy {
            return Err(BleError::NotImplemented);
        }
        self.driver.set_identity_address(address, public_address)
    }

    /// Random bytes from the controller
    pub fn get_random_data(&mut self) -> BleResult<Rand> {
        self.driver.random_data()
    }

    //
    // Pairing
    //

    /// Start pairing as central
    pub fn send_pairing_request(
        &mut self,
        connection: ConnectionHandle,
        oob_data_present: bool,
        auth: AuthRequirements,
        initiator_dist: KeyDistribution,
        responder_dist: KeyDistribution,
    ) -> BleResult<()> {
        if !self.features.central {
            return Err(BleError::NotImplemented);
        }
        debug!("pairing request on connection {}", connection);
        self.driver
            .send_pairing_request(connection, oob_data_present, auth, initiator_dist, responder_dist)
    }

    /// Accept a pairing request as peripheral
    pub fn send_pairing_response(
        &mut self,
        connection: ConnectionHandle,
        oob_data_present: bool,
        auth: AuthRequirements,
        initiator_dist: KeyDistribution,
        responder_dist: KeyDistribution,
    ) -> BleResult<()> {
        if !self.features.peripheral {
            return Err(BleError::NotImplemented);
        }
        debug!("pairing response on connection {}", connection);
        self.driver
            .send_pairing_response(connection, oob_data_present, auth, initiator_dist, responder_dist)
    }

    /// Abort pairing; the outcome still arrives as a pairing event
    pub fn cancel_pairing(&mut self, connection: ConnectionHandle, reason: PairingFailure) -> BleResult<()> {
        debug!("cancel pairing on connection {}: {}", connection, reason);
        self.driver.cancel_pairing(connection, reason)
    }

    //
    // Encryption
    //

    /// Encrypt the link with a legacy LTK
    pub fn enable_encryption(
        &mut self,
        connection: ConnectionHandle,
        ltk: Ltk,
        rand: Rand,
        ediv: Ediv,
        mitm: bool,
    ) -> BleResult<()> {
        let level = SecurityLevel::for_ltk(mitm, false);
        self.driver
            .enable_encryption(connection, ltk, Some((ediv, rand)), level)
    }

    /// Encrypt the link with an LTK derived by Secure Connections
    pub fn enable_secure_connections_encryption(
        &mut self,
        connection: ConnectionHandle,
        ltk: Ltk,
        mitm: bool,
    ) -> BleResult<()> {
        if !self.features.secure_connections {
            return Err(BleError::NotImplemented);
        }
        let level = if mitm {
            SecurityLevel::SecureConnections
        } else {
            SecurityLevel::EncryptionOnly
        };
        self.driver.enable_encryption(connection, ltk, None, level)
    }

    /// Answer an LTK request with a stored key
    pub fn set_ltk(
        &mut self,
        connection: ConnectionHandle,
        ltk: Ltk,
        mitm: bool,
        secure_connections: bool,
    ) -> BleResult<()> {
        let level = SecurityLevel::for_ltk(mitm, secure_connections);
        self.driver.ltk_reply(connection, Some((ltk, level)))
    }

    pub fn set_ltk_not_found(&mut self, connection: ConnectionHandle) -> BleResult<()> {
        self.driver.ltk_reply(connection, None)
    }

    //
    // Signing
    //

    /// Set the local CSRK used to sign outgoing writes
    pub fn set_csrk(&mut self, csrk: Csrk, sign_counter: u32) -> BleResult<()> {
        if !self.features.signing {
            return Err(BleError::NotImplemented);
        }
        self.driver.set_local_csrk(csrk, sign_counter)?;
        self.local_csrk = Some(csrk);
        self.local_sign_counter = sign_counter;
        Ok(())
    }

    pub fn local_csrk(&self) -> Option<(Csrk, u32)> {
        self.local_csrk.map(|csrk| (csrk, self.local_sign_counter))
    }

    /// Store the CSRK of the peer on `connection`, replacing any previous one
    pub fn set_peer_csrk(
        &mut self,
        connection: ConnectionHandle,
        csrk: Csrk,
        authenticated: bool,
        sign_counter: u32,
    ) -> BleResult<()> {
        if !self.features.signing {
            return Err(BleError::NotImplemented);
        }
        let index = self.peer_csrk_index(connection)?;
        let entry = PeerCsrk::new(csrk, authenticated, sign_counter);
        self.driver.set_peer_csrk(connection, Some(entry))?;
        self.peer_csrks[index] = Some(entry);
        Ok(())
    }

    pub fn remove_peer_csrk(&mut self, connection: ConnectionHandle) -> BleResult<()> {
        if !self.features.signing {
            return Err(BleError::NotImplemented);
        }
        let index = self.peer_csrk_index(connection)?;
        self.peer_csrks[index] = None;
        self.driver.set_peer_csrk(connection, None)
    }

    pub fn peer_csrk(&self, connection: ConnectionHandle) -> Option<&PeerCsrk> {
        let index = self.peer_csrk_index(connection).ok()?;
        self.peer_csrks[index].as_ref()
    }

    fn peer_csrk_index(&self, connection: ConnectionHandle) -> BleResult<usize> {
        let connection = usize::from(connection);
        if connection == 0 || connection > self.peer_csrks.len() {
            return Err(BleError::InvalidParameter(format!(
                "connection handle {} outside 1..={}",
                connection,
                self.peer_csrks.len()
            )));
        }
        Ok(connection - 1)
    }

    //
    // MITM and OOB replies
    //

    pub fn passkey_request_reply(&mut self, connection: ConnectionHandle, passkey: u32) -> BleResult<()> {
        if passkey > SMP_PASSKEY_MAX {
            return Err(BleError::InvalidParameter(format!(
                "passkey {} has more than six digits",
                passkey
            )));
        }
        self.driver.passkey_reply(connection, Some(passkey))
    }

    pub fn legacy_pairing_oob_request_reply(&mut self, connection: ConnectionHandle, tk: OobTk) -> BleResult<()> {
        self.driver.oob_reply(connection, Some(tk))
    }

    pub fn confirmation_entered(&mut self, connection: ConnectionHandle, confirmed: bool) -> BleResult<()> {
        self.driver.confirmation_reply(connection, confirmed)
    }

    pub fn send_keypress_notification(
        &mut self,
        connection: ConnectionHandle,
        notification: KeypressNotificationType,
    ) -> BleResult<()> {
        self.driver.send_keypress_notification(connection, notification)
    }

    /// Compute local Secure Connections OOB data; the result arrives through
    /// `on_secure_connections_oob_generated`.
    pub fn generate_secure_connections_oob(&mut self) -> BleResult<()> {
        if !self.features.secure_connections {
            return Err(BleError::NotImplemented);
        }

        if self.ecc_keys_generated {
            return self.driver.calculate_oob(generate_oob_random(), self.public_key.x);
        }

        // resumed once the key pair is ready
        if !self.oob_generation_pending {
            self.oob_generation_pending = true;
            self.driver.generate_ecc_key()?;
        }
        Ok(())
    }

    pub fn secure_connections_oob_request_reply(
        &mut self,
        connection: ConnectionHandle,
        local_random: OobRandom,
        peer_random: OobRandom,
        peer_confirm: OobConfirm,
    ) -> BleResult<()> {
        if !self.features.secure_connections {
            return Err(BleError::NotImplemented);
        }
        self.driver
            .set_secure_connections_oob(connection, local_random, peer_random, peer_confirm)
    }

    /// Whether a local ECC key pair is available
    pub fn ecc_keys_generated(&self) -> bool {
        self.ecc_keys_generated
    }

    pub fn public_key(&self) -> Option<&PublicKey> {
        self.ecc_keys_generated.then_some(&self.public_key)
    }

    //
    // Event dispatch
    //

    /// Handle one indication from the lower layer
    pub fn on_driver_event(&mut self, event: SmpDriverEvent) -> BleResult<()> {
        // key generation answers our own request and updates state even without a handler
        if let SmpDriverEvent::EccKeyGenerated { public_key } = event {
            return self.on_ecc_key_generated(public_key);
        }

        let Some(handler) = self.event_handler.as_mut() else {
            trace!("no security event handler, dropping {:?}", event);
            return Ok(());
        };

        match event {
            SmpDriverEvent::PairingCompleted { connection } => {
                handler.on_pairing_completed(connection);
            }
            SmpDriverEvent::PairingFailed { connection, status } => match status {
                SMP_STATUS_TIMEOUT => handler.on_pairing_timed_out(connection),
                SMP_STATUS_MEMORY => handler.on_pairing_error(connection, PairingFailure::Unspecified),
                SMP_STATUS_ATTEMPTS => {
                    handler.on_pairing_error(connection, PairingFailure::RepeatedAttempts)
                }
                status => handler.on_pairing_error(
                    connection,
                    PairingFailure::from_u8(status).unwrap_or(PairingFailure::Unspecified),
                ),
            },
            SmpDriverEvent::EncryptionChanged { connection, level } => {
                handler.on_link_encryption_result(connection, LinkEncryption::from(level));
            }
            SmpDriverEvent::EncryptionFailed { connection, status } => {
                debug!("encryption failed on connection {}: {:#04x}", connection, status);
                handler.on_link_encryption_result(connection, LinkEncryption::NotEncrypted);
            }
            SmpDriverEvent::AuthenticationRequest {
                connection,
                oob,
                display,
            } => {
                if oob {
                    handler.on_legacy_pairing_oob_request(connection);
                } else if display {
                    let passkey = self.default_passkey.unwrap_or_else(generate_passkey);
                    self.driver.passkey_reply(connection, Some(passkey))?;
                    handler.on_passkey_display(connection, passkey);
                } else {
                    handler.on_passkey_request(connection);
                }
            }
            SmpDriverEvent::KeyDistributed { connection, key } => match key {
                DistributedKey::LocalLtk { ltk, ediv, rand } => {
                    handler.on_keys_distributed_local_ltk(connection, ltk);
                    handler.on_keys_distributed_local_ediv_rand(connection, ediv, rand);
                }
                DistributedKey::PeerLtk { ltk, ediv, rand } => {
                    handler.on_keys_distributed_ltk(connection, ltk);
                    handler.on_keys_distributed_ediv_rand(connection, ediv, rand);
                }
                DistributedKey::PeerIdentity {
                    address_type,
                    address,
                    irk,
                } => {
                    if self.features.privacy {
                        handler.on_keys_distributed_bdaddr(connection, address_type, address);
                        handler.on_keys_distributed_irk(connection, irk);
                    } else {
                        debug!("privacy disabled, ignoring identity of connection {}", connection);
                    }
                }
                DistributedKey::PeerCsrk(csrk) => {
                    if self.features.signing {
                        handler.on_keys_distributed_csrk(connection, csrk);
                    } else {
                        debug!("signing disabled, ignoring CSRK of connection {}", connection);
                    }
                }
            },
            SmpDriverEvent::LtkRequest {
                connection,
                ediv,
                rand,
            } => {
                if ediv.is_zero() && !rand.is_zero() {
                    handler.on_ltk_request(connection);
                } else {
                    handler.on_ltk_request_with_ediv_rand(connection, ediv, rand);
                }
            }
            SmpDriverEvent::PairingIndication {
                connection,
                oob_data_present,
                auth,
                initiator_dist,
                responder_dist,
            } => {
                handler.on_pairing_request(
                    connection,
                    oob_data_present,
                    auth,
                    initiator_dist,
                    responder_dist,
                );
            }
            SmpDriverEvent::SlaveSecurityRequest { connection, auth } => {
                handler.on_slave_security_request(connection, auth);
            }
            SmpDriverEvent::ScOobCalculated { random, confirm } => {
                handler.on_secure_connections_oob_generated(random, confirm);
            }
            SmpDriverEvent::NumericComparison { connection, value } => {
                handler.on_confirmation_request(connection, value);
            }
            SmpDriverEvent::KeypressNotification {
                connection,
                notification,
            } => {
                handler.on_keypress_notification(connection, notification);
            }
            // handled before the handler lookup
            SmpDriverEvent::EccKeyGenerated { .. } => {}
        }

        Ok(())
    }

    fn on_ecc_key_generated(&mut self, public_key: PublicKey) -> BleResult<()> {
        self.public_key = public_key;
        self.ecc_keys_generated = true;

        if self.oob_generation_pending {
            self.oob_generation_pending = false;
            self.driver.calculate_oob(generate_oob_random(), public_key.x)?;
        }
        Ok(())
    }
}

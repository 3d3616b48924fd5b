//! Unit tests for the security manager

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::config::FeatureSupport;
    use crate::error::{BleError, BleResult};
    use crate::gap::{AddressType, BdAddr, ConnectionHandle};
    use std::sync::{Arc, Mutex};

    /// Commands recorded by the mock driver
    #[derive(Debug, Clone, PartialEq)]
    enum DriverCall {
        GenerateEccKey,
        IoCapability(IoCapability),
        KeyRequirements(u8, u8),
        PairingRequest(ConnectionHandle, bool, u8, u8, u8),
        PairingResponse(ConnectionHandle, bool, u8, u8, u8),
        Cancel(ConnectionHandle, PairingFailure),
        EnableEncryption(ConnectionHandle, Option<(Ediv, Rand)>, SecurityLevel),
        LtkReply(ConnectionHandle, Option<(Ltk, SecurityLevel)>),
        LocalCsrk(Csrk, u32),
        PeerCsrk(ConnectionHandle, Option<PeerCsrk>),
        PasskeyReply(ConnectionHandle, Option<u32>),
        OobReply(ConnectionHandle, Option<OobTk>),
        Confirmation(ConnectionHandle, bool),
        Keypress(ConnectionHandle, KeypressNotificationType),
        CalculateOob(PublicKeyCoord),
        ScOob(ConnectionHandle),
        Other,
    }

    #[derive(Default)]
    struct MockDriver {
        calls: Vec<DriverCall>,
        rejects_passkey: bool,
    }

    impl MockDriver {
        fn last(&self) -> Option<&DriverCall> {
            self.calls.last()
        }

        fn count(&self, f: impl Fn(&DriverCall) -> bool) -> usize {
            self.calls.iter().filter(|c| f(c)).count()
        }
    }

    impl SmpDriver for MockDriver {
        fn generate_ecc_key(&mut self) -> BleResult<()> {
            self.calls.push(DriverCall::GenerateEccKey);
            Ok(())
        }

        fn set_io_capability(&mut self, io_capability: IoCapability) -> BleResult<()> {
            self.calls.push(DriverCall::IoCapability(io_capability));
            Ok(())
        }

        fn set_encryption_key_requirements(&mut self, min_size: u8, max_size: u8) -> BleResult<()> {
            self.calls.push(DriverCall::KeyRequirements(min_size, max_size));
            Ok(())
        }

        fn set_secure_connections_support(&mut self, _enabled: bool) -> BleResult<()> {
            self.calls.push(DriverCall::Other);
            Ok(())
        }

        fn send_pairing_request(
            &mut self,
            connection: ConnectionHandle,
            oob_data_present: bool,
            auth: AuthRequirements,
            initiator_dist: KeyDistribution,
            responder_dist: KeyDistribution,
        ) -> BleResult<()> {
            self.calls.push(DriverCall::PairingRequest(
                connection,
                oob_data_present,
                auth.to_u8(),
                initiator_dist.to_u8(),
                responder_dist.to_u8(),
            ));
            Ok(())
        }

        fn send_pairing_response(
            &mut self,
            connection: ConnectionHandle,
            oob_data_present: bool,
            auth: AuthRequirements,
            initiator_dist: KeyDistribution,
            responder_dist: KeyDistribution,
        ) -> BleResult<()> {
            self.calls.push(DriverCall::PairingResponse(
                connection,
                oob_data_present,
                auth.to_u8(),
                initiator_dist.to_u8(),
                responder_dist.to_u8(),
            ));
            Ok(())
        }

        fn cancel_pairing(&mut self, connection: ConnectionHandle, reason: PairingFailure) -> BleResult<()> {
            self.calls.push(DriverCall::Cancel(connection, reason));
            Ok(())
        }

        fn enable_encryption(
            &mut self,
            connection: ConnectionHandle,
            _ltk: Ltk,
            ediv_rand: Option<(Ediv, Rand)>,
            level: SecurityLevel,
        ) -> BleResult<()> {
            self.calls
                .push(DriverCall::EnableEncryption(connection, ediv_rand, level));
            Ok(())
        }

        fn ltk_reply(&mut self, connection: ConnectionHandle, reply: Option<(Ltk, SecurityLevel)>) -> BleResult<()> {
            self.calls.push(DriverCall::LtkReply(connection, reply));
            Ok(())
        }

        fn set_local_csrk(&mut self, csrk: Csrk, sign_counter: u32) -> BleResult<()> {
            self.calls.push(DriverCall::LocalCsrk(csrk, sign_counter));
            Ok(())
        }

        fn set_peer_csrk(&mut self, connection: ConnectionHandle, csrk: Option<PeerCsrk>) -> BleResult<()> {
            self.calls.push(DriverCall::PeerCsrk(connection, csrk));
            Ok(())
        }

        fn set_irk(&mut self, _irk: Irk) -> BleResult<()> {
            self.calls.push(DriverCall::Other);
            Ok(())
        }

        fn set_identity_address(&mut self, _address: BdAddr, _public_address: bool) -> BleResult<()> {
            self.calls.push(DriverCall::Other);
            Ok(())
        }

        fn passkey_reply(&mut self, connection: ConnectionHandle, passkey: Option<u32>) -> BleResult<()> {
            if self.rejects_passkey {
                return Err(BleError::InvalidState);
            }
            self.calls.push(DriverCall::PasskeyReply(connection, passkey));
            Ok(())
        }

        fn oob_reply(&mut self, connection: ConnectionHandle, tk: Option<OobTk>) -> BleResult<()> {
            self.calls.push(DriverCall::OobReply(connection, tk));
            Ok(())
        }

        fn confirmation_reply(&mut self, connection: ConnectionHandle, confirmed: bool) -> BleResult<()> {
            self.calls.push(DriverCall::Confirmation(connection, confirmed));
            Ok(())
        }

        fn send_keypress_notification(
            &mut self,
            connection: ConnectionHandle,
            notification: KeypressNotificationType,
        ) -> BleResult<()> {
            self.calls.push(DriverCall::Keypress(connection, notification));
            Ok(())
        }

        fn calculate_oob(&mut self, _random: OobRandom, public_key_x: PublicKeyCoord) -> BleResult<()> {
            self.calls.push(DriverCall::CalculateOob(public_key_x));
            Ok(())
        }

        fn set_secure_connections_oob(
            &mut self,
            connection: ConnectionHandle,
            _local_random: OobRandom,
            _peer_random: OobRandom,
            _peer_confirm: OobConfirm,
        ) -> BleResult<()> {
            self.calls.push(DriverCall::ScOob(connection));
            Ok(())
        }

        fn random_data(&mut self) -> BleResult<Rand> {
            Ok(Rand([7; 8]))
        }
    }

    /// Notifications recorded by the test handler
    #[derive(Debug, Clone, PartialEq)]
    enum Notification {
        PairingRequest(ConnectionHandle),
        PairingError(ConnectionHandle, PairingFailure),
        PairingTimedOut(ConnectionHandle),
        PairingCompleted(ConnectionHandle),
        Encryption(ConnectionHandle, LinkEncryption),
        PasskeyDisplay(ConnectionHandle, u32),
        PasskeyRequest(ConnectionHandle),
        Confirmation(ConnectionHandle, u32),
        Keypress(ConnectionHandle, KeypressNotificationType),
        LegacyOobRequest(ConnectionHandle),
        ScOobGenerated,
        LocalLtk(ConnectionHandle, Ltk),
        LocalEdivRand(ConnectionHandle, Ediv, Rand),
        PeerLtk(ConnectionHandle, Ltk),
        PeerEdivRand(ConnectionHandle, Ediv, Rand),
        Irk(ConnectionHandle, Irk),
        BdAddr(ConnectionHandle, AddressType, BdAddr),
        Csrk(ConnectionHandle, Csrk),
        LtkRequestSc(ConnectionHandle),
        LtkRequest(ConnectionHandle, Ediv, Rand),
        SlaveSecurityRequest(ConnectionHandle),
    }

    #[derive(Clone, Default)]
    struct Recorder {
        events: Arc<Mutex<Vec<Notification>>>,
    }

    impl Recorder {
        fn push(&self, n: Notification) {
            self.events.lock().unwrap().push(n);
        }

        fn take(&self) -> Vec<Notification> {
            std::mem::take(&mut *self.events.lock().unwrap())
        }
    }

    impl SmpEventHandler for Recorder {
        fn on_pairing_request(
            &mut self,
            connection: ConnectionHandle,
            _oob_data_present: bool,
            _auth: AuthRequirements,
            _initiator_dist: KeyDistribution,
            _responder_dist: KeyDistribution,
        ) {
            self.push(Notification::PairingRequest(connection));
        }

        fn on_pairing_error(&mut self, connection: ConnectionHandle, error: PairingFailure) {
            self.push(Notification::PairingError(connection, error));
        }

        fn on_pairing_timed_out(&mut self, connection: ConnectionHandle) {
            self.push(Notification::PairingTimedOut(connection));
        }

        fn on_pairing_completed(&mut self, connection: ConnectionHandle) {
            self.push(Notification::PairingCompleted(connection));
        }

        fn on_link_encryption_result(&mut self, connection: ConnectionHandle, result: LinkEncryption) {
            self.push(Notification::Encryption(connection, result));
        }

        fn on_passkey_display(&mut self, connection: ConnectionHandle, passkey: u32) {
            self.push(Notification::PasskeyDisplay(connection, passkey));
        }

        fn on_keypress_notification(
            &mut self,
            connection: ConnectionHandle,
            notification: KeypressNotificationType,
        ) {
            self.push(Notification::Keypress(connection, notification));
        }

        fn on_passkey_request(&mut self, connection: ConnectionHandle) {
            self.push(Notification::PasskeyRequest(connection));
        }

        fn on_confirmation_request(&mut self, connection: ConnectionHandle, value: u32) {
            self.push(Notification::Confirmation(connection, value));
        }

        fn on_legacy_pairing_oob_request(&mut self, connection: ConnectionHandle) {
            self.push(Notification::LegacyOobRequest(connection));
        }

        fn on_secure_connections_oob_generated(&mut self, _random: OobRandom, _confirm: OobConfirm) {
            self.push(Notification::ScOobGenerated);
        }

        fn on_keys_distributed_local_ltk(&mut self, connection: ConnectionHandle, ltk: Ltk) {
            self.push(Notification::LocalLtk(connection, ltk));
        }

        fn on_keys_distributed_local_ediv_rand(&mut self, connection: ConnectionHandle, ediv: Ediv, rand: Rand) {
            self.push(Notification::LocalEdivRand(connection, ediv, rand));
        }

        fn on_keys_distributed_ltk(&mut self, connection: ConnectionHandle, ltk: Ltk) {
            self.push(Notification::PeerLtk(connection, ltk));
        }

        fn on_keys_distributed_ediv_rand(&mut self, connection: ConnectionHandle, ediv: Ediv, rand: Rand) {
            self.push(Notification::PeerEdivRand(connection, ediv, rand));
        }

        fn on_keys_distributed_irk(&mut self, connection: ConnectionHandle, irk: Irk) {
            self.push(Notification::Irk(connection, irk));
        }

        fn on_keys_distributed_bdaddr(&mut self, connection: ConnectionHandle, address_type: AddressType, address: BdAddr) {
            self.push(Notification::BdAddr(connection, address_type, address));
        }

        fn on_keys_distributed_csrk(&mut self, connection: ConnectionHandle, csrk: Csrk) {
            self.push(Notification::Csrk(connection, csrk));
        }

        fn on_ltk_request(&mut self, connection: ConnectionHandle) {
            self.push(Notification::LtkRequestSc(connection));
        }

        fn on_ltk_request_with_ediv_rand(&mut self, connection: ConnectionHandle, ediv: Ediv, rand: Rand) {
            self.push(Notification::LtkRequest(connection, ediv, rand));
        }

        fn on_slave_security_request(&mut self, connection: ConnectionHandle, _auth: AuthRequirements) {
            self.push(Notification::SlaveSecurityRequest(connection));
        }
    }

    fn manager_with(features: FeatureSupport) -> (SmpManager<MockDriver>, Recorder) {
        let mut manager = SmpManager::new(MockDriver::default(), features, 4);
        let recorder = Recorder::default();
        manager.set_event_handler(Some(Box::new(recorder.clone())));
        (manager, recorder)
    }

    fn manager() -> (SmpManager<MockDriver>, Recorder) {
        manager_with(FeatureSupport::default())
    }

    #[test]
    fn test_encryption_key_requirements_validation() {
        let (mut sm, _) = manager();

        for min in 0u8..=20 {
            for max in 0u8..=20 {
                let valid = (7..=16).contains(&min) && min <= max && max <= 16;
                let result = sm.set_encryption_key_requirements(min, max);
                if valid {
                    assert!(result.is_ok(), "({}, {}) should be accepted", min, max);
                    assert_eq!(sm.pairing_config().min_key_size, min);
                    assert_eq!(sm.pairing_config().max_key_size, max);
                    assert_eq!(sm.driver().last(), Some(&DriverCall::KeyRequirements(min, max)));
                } else {
                    assert!(
                        matches!(result, Err(BleError::InvalidParameter(_))),
                        "({}, {}) should be rejected",
                        min,
                        max
                    );
                }
            }
        }
    }

    #[test]
    fn test_set_ltk_security_level_precedence() {
        let (mut sm, _) = manager();
        let ltk = Ltk([0x11; 16]);

        sm.set_ltk(5, ltk, true, false).unwrap();
        assert_eq!(
            sm.driver().last(),
            Some(&DriverCall::LtkReply(
                5,
                Some((ltk, SecurityLevel::EncryptionWithAuthentication))
            ))
        );

        sm.set_ltk(5, ltk, true, true).unwrap();
        assert_eq!(
            sm.driver().last(),
            Some(&DriverCall::LtkReply(5, Some((ltk, SecurityLevel::SecureConnections))))
        );

        sm.set_ltk(5, ltk, false, false).unwrap();
        assert_eq!(
            sm.driver().last(),
            Some(&DriverCall::LtkReply(5, Some((ltk, SecurityLevel::EncryptionOnly))))
        );

        sm.set_ltk_not_found(5).unwrap();
        assert_eq!(sm.driver().last(), Some(&DriverCall::LtkReply(5, None)));
    }

    #[test]
    fn test_pairing_timeout_is_not_an_error() {
        let (mut sm, recorder) = manager();

        sm.on_driver_event(SmpDriverEvent::PairingFailed {
            connection: 2,
            status: SMP_STATUS_TIMEOUT,
        })
        .unwrap();

        assert_eq!(recorder.take(), vec![Notification::PairingTimedOut(2)]);
    }

    #[test]
    fn test_pairing_failure_mapping() {
        let (mut sm, recorder) = manager();

        let cases = [
            (SMP_REASON_PASSKEY_ENTRY_FAILED, PairingFailure::PasskeyEntryFailed),
            (SMP_REASON_CONFIRM_VALUE_FAILED, PairingFailure::ConfirmValueFailed),
            (SMP_REASON_DHKEY_CHECK_FAILED, PairingFailure::DhKeyCheckFailed),
            (
                SMP_REASON_CROSS_TRANSPORT_KEY_NOT_ALLOWED,
                PairingFailure::CrossTransportKeyNotAllowed,
            ),
            (SMP_STATUS_MEMORY, PairingFailure::Unspecified),
            (SMP_STATUS_ATTEMPTS, PairingFailure::RepeatedAttempts),
            (0x42, PairingFailure::Unspecified),
        ];

        for (status, expected) in cases {
            sm.on_driver_event(SmpDriverEvent::PairingFailed { connection: 1, status })
                .unwrap();
            assert_eq!(recorder.take(), vec![Notification::PairingError(1, expected)]);
        }
    }

    #[test]
    fn test_events_dropped_without_handler() {
        let mut sm = SmpManager::new(MockDriver::default(), FeatureSupport::default(), 4);

        sm.on_driver_event(SmpDriverEvent::PairingCompleted { connection: 1 })
            .unwrap();
        sm.on_driver_event(SmpDriverEvent::AuthenticationRequest {
            connection: 1,
            oob: false,
            display: true,
        })
        .unwrap();

        // no passkey reply is sent when nobody can display it
        assert!(sm.driver().calls.is_empty());
    }

    #[test]
    fn test_generated_passkeys_have_six_digits() {
        for _ in 0..10_000 {
            assert!(generate_passkey() <= SMP_PASSKEY_MAX);
        }

        let (mut sm, recorder) = manager();
        for _ in 0..10_000 {
            sm.on_driver_event(SmpDriverEvent::AuthenticationRequest {
                connection: 3,
                oob: false,
                display: true,
            })
            .unwrap();
        }

        let events = recorder.take();
        assert_eq!(events.len(), 10_000);
        for event in events {
            match event {
                Notification::PasskeyDisplay(3, passkey) => assert!(passkey <= 999_999),
                other => panic!("unexpected notification {:?}", other),
            }
        }
    }

    #[test]
    fn test_authentication_request_branches() {
        let (mut sm, recorder) = manager();

        sm.on_driver_event(SmpDriverEvent::AuthenticationRequest {
            connection: 1,
            oob: true,
            display: true,
        })
        .unwrap();
        sm.on_driver_event(SmpDriverEvent::AuthenticationRequest {
            connection: 1,
            oob: false,
            display: false,
        })
        .unwrap();

        sm.set_display_passkey(Some(123_456)).unwrap();
        sm.on_driver_event(SmpDriverEvent::AuthenticationRequest {
            connection: 1,
            oob: false,
            display: true,
        })
        .unwrap();

        assert_eq!(
            recorder.take(),
            vec![
                Notification::LegacyOobRequest(1),
                Notification::PasskeyRequest(1),
                Notification::PasskeyDisplay(1, 123_456),
            ]
        );
        assert_eq!(
            sm.driver().last(),
            Some(&DriverCall::PasskeyReply(1, Some(123_456)))
        );

        assert!(matches!(
            sm.set_display_passkey(Some(1_000_000)),
            Err(BleError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_rejected_passkey_is_not_displayed() {
        let (mut sm, recorder) = manager();
        sm.set_display_passkey(Some(654_321)).unwrap();
        sm.driver_mut().rejects_passkey = true;

        assert!(matches!(
            sm.on_driver_event(SmpDriverEvent::AuthenticationRequest {
                connection: 2,
                oob: false,
                display: true,
            }),
            Err(BleError::InvalidState)
        ));
        assert!(recorder.take().is_empty());
        assert_eq!(
            sm.driver()
                .count(|c| matches!(c, DriverCall::PasskeyReply(..))),
            0
        );
    }

    #[test]
    fn test_key_distribution_routing() {
        let (mut sm, recorder) = manager();
        let ltk = Ltk([1; 16]);
        let rand = Rand([2; 8]);
        let irk = Irk([3; 16]);
        let csrk = Csrk([4; 16]);
        let address = BdAddr::new([1, 2, 3, 4, 5, 6]);

        let keys = [
            DistributedKey::LocalLtk {
                ltk,
                ediv: Ediv(9),
                rand,
            },
            DistributedKey::PeerLtk {
                ltk,
                ediv: Ediv(10),
                rand,
            },
            DistributedKey::PeerIdentity {
                address_type: AddressType::Public,
                address,
                irk,
            },
            DistributedKey::PeerCsrk(csrk),
        ];
        for key in keys {
            sm.on_driver_event(SmpDriverEvent::KeyDistributed { connection: 2, key })
                .unwrap();
        }

        assert_eq!(
            recorder.take(),
            vec![
                Notification::LocalLtk(2, ltk),
                Notification::LocalEdivRand(2, Ediv(9), rand),
                Notification::PeerLtk(2, ltk),
                Notification::PeerEdivRand(2, Ediv(10), rand),
                Notification::BdAddr(2, AddressType::Public, address),
                Notification::Irk(2, irk),
                Notification::Csrk(2, csrk),
            ]
        );
    }

    #[test]
    fn test_key_distribution_feature_gating() {
        let features = FeatureSupport {
            privacy: false,
            signing: false,
            ..FeatureSupport::default()
        };
        let (mut sm, recorder) = manager_with(features);

        sm.on_driver_event(SmpDriverEvent::KeyDistributed {
            connection: 1,
            key: DistributedKey::PeerIdentity {
                address_type: AddressType::Random,
                address: BdAddr::default(),
                irk: Irk([1; 16]),
            },
        })
        .unwrap();
        sm.on_driver_event(SmpDriverEvent::KeyDistributed {
            connection: 1,
            key: DistributedKey::PeerCsrk(Csrk([1; 16])),
        })
        .unwrap();

        assert!(recorder.take().is_empty());
        assert!(matches!(
            sm.set_peer_csrk(1, Csrk([1; 16]), false, 0),
            Err(BleError::NotImplemented)
        ));
    }

    #[test]
    fn test_ltk_request_secure_connections_detection() {
        let (mut sm, recorder) = manager();
        let nonzero = Rand([0, 0, 0, 0, 0, 0, 0, 1]);

        sm.on_driver_event(SmpDriverEvent::LtkRequest {
            connection: 1,
            ediv: Ediv(0),
            rand: nonzero,
        })
        .unwrap();
        sm.on_driver_event(SmpDriverEvent::LtkRequest {
            connection: 1,
            ediv: Ediv(0),
            rand: Rand::default(),
        })
        .unwrap();
        sm.on_driver_event(SmpDriverEvent::LtkRequest {
            connection: 1,
            ediv: Ediv(0x1234),
            rand: nonzero,
        })
        .unwrap();

        assert_eq!(
            recorder.take(),
            vec![
                Notification::LtkRequestSc(1),
                Notification::LtkRequest(1, Ediv(0), Rand::default()),
                Notification::LtkRequest(1, Ediv(0x1234), nonzero),
            ]
        );
    }

    #[test]
    fn test_peer_csrk_table() {
        let (mut sm, _) = manager();
        let first = Csrk([1; 16]);
        let second = Csrk([2; 16]);

        assert!(matches!(
            sm.set_peer_csrk(0, first, false, 0),
            Err(BleError::InvalidParameter(_))
        ));
        assert!(matches!(
            sm.set_peer_csrk(5, first, false, 0),
            Err(BleError::InvalidParameter(_))
        ));

        sm.set_peer_csrk(4, first, false, 1).unwrap();
        sm.set_peer_csrk(4, second, true, 9).unwrap();
        assert_eq!(sm.peer_csrk(4), Some(&PeerCsrk::new(second, true, 9)));
        assert_eq!(sm.peer_csrk(3), None);

        sm.remove_peer_csrk(4).unwrap();
        assert_eq!(sm.peer_csrk(4), None);
        assert_eq!(sm.driver().last(), Some(&DriverCall::PeerCsrk(4, None)));
        assert!(matches!(
            sm.remove_peer_csrk(0),
            Err(BleError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_reset_clears_transient_state() {
        let (mut sm, _) = manager();
        sm.set_display_passkey(Some(42)).unwrap();
        sm.set_peer_csrk(1, Csrk([1; 16]), false, 0).unwrap();
        sm.on_driver_event(SmpDriverEvent::EccKeyGenerated {
            public_key: PublicKey::default(),
        })
        .unwrap();
        assert!(sm.ecc_keys_generated());

        sm.reset().unwrap();
        sm.reset().unwrap();

        assert_eq!(sm.display_passkey(), None);
        assert_eq!(sm.peer_csrk(1), None);
        assert!(!sm.ecc_keys_generated());
        assert_eq!(sm.driver().count(|c| *c == DriverCall::GenerateEccKey), 2);
    }

    #[test]
    fn test_role_gated_pairing_commands() {
        let features = FeatureSupport {
            peripheral: false,
            ..FeatureSupport::default()
        };
        let (mut sm, _) = manager_with(features);
        let auth = AuthRequirements::new(true, true, true);

        sm.send_pairing_request(1, false, auth, KeyDistribution::all(), KeyDistribution::all())
            .unwrap();
        assert_eq!(
            sm.driver().last(),
            Some(&DriverCall::PairingRequest(1, false, 0x0D, 0x07, 0x07))
        );

        assert!(matches!(
            sm.send_pairing_response(1, false, auth, KeyDistribution::all(), KeyDistribution::none()),
            Err(BleError::NotImplemented)
        ));
    }

    #[test]
    fn test_secure_connections_oob_waits_for_ecc_key() {
        let (mut sm, recorder) = manager();
        let x = PublicKeyCoord([0xAB; 32]);

        sm.generate_secure_connections_oob().unwrap();
        sm.generate_secure_connections_oob().unwrap();
        assert_eq!(sm.driver().count(|c| *c == DriverCall::GenerateEccKey), 1);
        assert_eq!(sm.driver().count(|c| matches!(c, DriverCall::CalculateOob(_))), 0);

        sm.on_driver_event(SmpDriverEvent::EccKeyGenerated {
            public_key: PublicKey {
                x,
                y: PublicKeyCoord::default(),
            },
        })
        .unwrap();
        assert_eq!(sm.driver().last(), Some(&DriverCall::CalculateOob(x)));

        sm.on_driver_event(SmpDriverEvent::ScOobCalculated {
            random: OobRandom([1; 16]),
            confirm: OobConfirm([2; 16]),
        })
        .unwrap();
        assert_eq!(recorder.take(), vec![Notification::ScOobGenerated]);
    }

    #[test]
    fn test_forwarded_indications() {
        let (mut sm, recorder) = manager();

        sm.on_driver_event(SmpDriverEvent::PairingIndication {
            connection: 1,
            oob_data_present: false,
            auth: AuthRequirements::default(),
            initiator_dist: KeyDistribution::all(),
            responder_dist: KeyDistribution::all(),
        })
        .unwrap();
        sm.on_driver_event(SmpDriverEvent::SlaveSecurityRequest {
            connection: 2,
            auth: AuthRequirements::default(),
        })
        .unwrap();
        sm.on_driver_event(SmpDriverEvent::NumericComparison {
            connection: 1,
            value: 654_321,
        })
        .unwrap();
        sm.on_driver_event(SmpDriverEvent::KeypressNotification {
            connection: 1,
            notification: KeypressNotificationType::DigitEntered,
        })
        .unwrap();
        sm.on_driver_event(SmpDriverEvent::EncryptionChanged {
            connection: 1,
            level: SecurityLevel::EncryptionWithAuthentication,
        })
        .unwrap();
        sm.on_driver_event(SmpDriverEvent::EncryptionFailed {
            connection: 1,
            status: 0x06,
        })
        .unwrap();
        sm.on_driver_event(SmpDriverEvent::PairingCompleted { connection: 1 })
            .unwrap();

        assert_eq!(
            recorder.take(),
            vec![
                Notification::PairingRequest(1),
                Notification::SlaveSecurityRequest(2),
                Notification::Confirmation(1, 654_321),
                Notification::Keypress(1, KeypressNotificationType::DigitEntered),
                Notification::Encryption(1, LinkEncryption::EncryptedWithMitm),
                Notification::Encryption(1, LinkEncryption::NotEncrypted),
                Notification::PairingCompleted(1),
            ]
        );
    }

    #[test]
    fn test_reply_commands_reach_driver() {
        let (mut sm, _) = manager();

        sm.passkey_request_reply(1, 999_999).unwrap();
        assert!(sm.passkey_request_reply(1, 1_000_000).is_err());
        sm.legacy_pairing_oob_request_reply(1, OobTk([5; 16])).unwrap();
        sm.confirmation_entered(1, false).unwrap();
        sm.send_keypress_notification(1, KeypressNotificationType::EntryCompleted)
            .unwrap();
        sm.cancel_pairing(1, PairingFailure::PasskeyEntryFailed).unwrap();
        sm.enable_encryption(1, Ltk([1; 16]), Rand([2; 8]), Ediv(3), true)
            .unwrap();

        let calls = &sm.driver().calls;
        assert_eq!(
            &calls[..],
            &[
                DriverCall::PasskeyReply(1, Some(999_999)),
                DriverCall::OobReply(1, Some(OobTk([5; 16]))),
                DriverCall::Confirmation(1, false),
                DriverCall::Keypress(1, KeypressNotificationType::EntryCompleted),
                DriverCall::Cancel(1, PairingFailure::PasskeyEntryFailed),
                DriverCall::EnableEncryption(
                    1,
                    Some((Ediv(3), Rand([2; 8]))),
                    SecurityLevel::EncryptionWithAuthentication
                ),
            ]
        );
    }

    #[test]
    fn test_key_text_round_trip() {
        let irk: Irk = "00112233445566778899aabbccddeeff".parse().unwrap();
        assert_eq!(irk.to_string(), "00112233445566778899aabbccddeeff");
        assert!("0011".parse::<Irk>().is_err());
        assert!(Irk::default().is_zero());
    }
}

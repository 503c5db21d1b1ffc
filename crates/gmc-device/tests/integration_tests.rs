//! Integration tests for the device layer
//!
//! These tests drive the full stack (device -> connection -> transport)
//! against the simulated counter:
//! - Identification across the model range, including failure paths
//! - Capability gating before any bytes touch the wire
//! - Every reading type, config snapshots, and history pages
//! - Heartbeat streaming in both sample widths
//! - Short and silent replies

use gmc_connect::Connection;
use gmc_device::{identify, Device, DeviceError};
use gmc_protocol::{CommandKind, ConfigValue, DecodeError, DeviceModel, ProtocolRevision};
use gmc_sim::{VirtualCounter, VirtualCounterConfig};

// ============================================================================
// Helper Functions
// ============================================================================

mod helpers {
    use super::*;

    /// Route library logs into the test harness output (`RUST_LOG` honored)
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(
                |_| "gmc_protocol=debug,gmc_connect=debug,gmc_device=debug,gmc_sim=debug".into(),
            ))
            .with_test_writer()
            .try_init();
    }

    /// Identify a device over a sim built from the given configuration
    pub fn device_with_config(config: VirtualCounterConfig) -> Device<VirtualCounter> {
        init_tracing();
        let sim = VirtualCounter::from_config(config);
        identify(Connection::new(sim)).expect("sim device should identify")
    }

    /// Identify a device over a sim reporting the given version string
    pub fn device_with_version(version: &str) -> Device<VirtualCounter> {
        device_with_config(VirtualCounterConfig {
            version: version.to_string(),
            ..Default::default()
        })
    }

    /// Identify a device over a default sim (a GMC-500+)
    pub fn default_device() -> Device<VirtualCounter> {
        device_with_config(VirtualCounterConfig::default())
    }
}

// ============================================================================
// Identification
// ============================================================================

mod identify_tests {
    use super::*;

    #[test]
    fn identify_each_model_family() {
        let cases = [
            ("GMC-300Re 4.54", DeviceModel::Gmc300, ProtocolRevision::Rfc1201),
            ("GMC-320Re 4.19", DeviceModel::Gmc320, ProtocolRevision::Rfc1201),
            ("GMC-320+Re 5.52", DeviceModel::Gmc320Plus, ProtocolRevision::Rfc1201),
            ("GMC-500Re 1.08", DeviceModel::Gmc500, ProtocolRevision::Rfc1801),
            ("GMC-500+Re 2.40", DeviceModel::Gmc500Plus, ProtocolRevision::Rfc1801),
            ("GMC-600Re 2.22", DeviceModel::Gmc600, ProtocolRevision::Rfc1801),
            ("GMC-600+Re 2.41", DeviceModel::Gmc600Plus, ProtocolRevision::Rfc1801),
        ];

        for (version, model, revision) in cases {
            let device = helpers::device_with_version(version);
            assert_eq!(device.model(), model, "version {version:?}");
            assert_eq!(device.info().revision, revision, "version {version:?}");
            assert_eq!(device.version_string(), version);
        }
    }

    #[test]
    fn identify_unknown_version_fails_with_full_string() {
        helpers::init_tracing();
        let sim = VirtualCounter::from_config(VirtualCounterConfig {
            version: "ACME-9000 v1.0".to_string(),
            ..Default::default()
        });

        let err = identify(Connection::new(sim)).unwrap_err();
        match err {
            DeviceError::UnsupportedDevice(unsupported) => {
                assert_eq!(unsupported.version, "ACME-9000 v1.0");
            }
            other => panic!("expected UnsupportedDevice, got {other:?}"),
        }
    }

    #[test]
    fn identify_silent_device() {
        helpers::init_tracing();
        let mut sim = VirtualCounter::new();
        sim.silence_next_reply();

        let err = identify(Connection::new(sim)).unwrap_err();
        assert!(matches!(
            err,
            DeviceError::Decode(DecodeError::EmptyReply)
        ));
    }

    #[test]
    fn into_connection_gives_the_transport_back() {
        let device = helpers::default_device();
        let mut conn = device.into_connection();
        assert!(conn.is_open());
        conn.close();
        assert!(!conn.is_open());
    }
}

// ============================================================================
// Readings
// ============================================================================

mod reading_tests {
    use super::*;

    #[test]
    fn read_every_value_type() {
        let mut device = helpers::default_device();

        assert_eq!(device.cpm().unwrap(), 28);
        assert_eq!(device.cps().unwrap(), 1);
        assert_eq!(device.cpm_high().unwrap(), 25);
        assert_eq!(device.cpm_low().unwrap(), 3);
        assert_eq!(device.voltage().unwrap(), 4.8);
        assert_eq!(device.serial_number().unwrap(), "f4880001234567");

        let gyro = device.gyro().unwrap();
        assert_eq!((gyro.x, gyro.y, gyro.z), (10, -10, 0));

        let datetime = device.datetime().unwrap();
        assert_eq!(datetime.to_string(), "2023-06-15 12:30:45");
    }

    #[test]
    fn version_reread_matches_cached_string() {
        let mut device = helpers::default_device();
        let reread = device.version().unwrap();
        assert_eq!(reread, device.version_string());
    }

    #[test]
    fn voltage_reflects_sim_state() {
        let mut device = helpers::device_with_config(VirtualCounterConfig {
            voltage_tenths: 32,
            ..Default::default()
        });
        assert_eq!(device.voltage().unwrap(), 3.2);
    }

    #[test]
    fn truncated_count_reply_is_length_mismatch() {
        let mut device = helpers::default_device();
        device.connection_mut().transport_mut().truncate_next_reply(2);

        let err = device.cpm().unwrap_err();
        match err {
            DeviceError::Decode(DecodeError::LengthMismatch { expected, got, .. }) => {
                assert_eq!(expected, 4);
                assert_eq!(got, 2);
            }
            other => panic!("expected LengthMismatch, got {other:?}"),
        }
    }
}

// ============================================================================
// Capability Gating
// ============================================================================

mod capability_tests {
    use super::*;

    #[test]
    fn dual_tube_reads_gated_on_single_tube_model() {
        let mut device = helpers::device_with_version("GMC-300Re 4.54");
        let frames_before = device.connection_mut().transport_mut().frames_seen().len();

        let err = device.cpm_high().unwrap_err();
        match err {
            DeviceError::Unsupported { model, command } => {
                assert_eq!(model, DeviceModel::Gmc300);
                assert_eq!(command, CommandKind::CpmHigh);
            }
            other => panic!("expected Unsupported, got {other:?}"),
        }

        // the gate must fire before the wire is touched
        let frames_after = device.connection_mut().transport_mut().frames_seen().len();
        assert_eq!(frames_before, frames_after);
    }

    #[test]
    fn gyro_gated_on_models_without_the_sensor() {
        let mut device = helpers::device_with_version("GMC-600+Re 2.41");
        assert!(matches!(
            device.gyro().unwrap_err(),
            DeviceError::Unsupported {
                model: DeviceModel::Gmc600Plus,
                command: CommandKind::Gyro,
            }
        ));
    }

    #[test]
    fn gyro_present_on_the_320_plus() {
        let mut device = helpers::device_with_version("GMC-320+Re 5.52");
        assert!(device.gyro().is_ok());
    }

    #[test]
    fn history_parameter_validation() {
        let mut device = helpers::default_device();

        assert!(matches!(
            device.read_history_page(0x0100_0000, 64).unwrap_err(),
            DeviceError::InvalidParameter(_)
        ));
        assert!(matches!(
            device.read_history_page(0, 0).unwrap_err(),
            DeviceError::InvalidParameter(_)
        ));
        assert!(matches!(
            device.read_history_page(0, 4097).unwrap_err(),
            DeviceError::InvalidParameter(_)
        ));
    }
}

// ============================================================================
// Configuration
// ============================================================================

mod config_tests {
    use super::*;

    #[test]
    fn config_snapshot_from_sim_blob() {
        let mut blob = vec![0u8; 512];
        blob[0] = 0; // power on
        blob[2] = 1; // speaker on
        blob[6..8].copy_from_slice(&[0x00, 0x64]); // alarm_cpm = 100
        blob[10..14].copy_from_slice(&[0x3E, 0xCC, 0xCC, 0xCD]); // calibration_usv_1
        blob[38..41].copy_from_slice(&[0x00, 0x10, 0x00]); // data_save_address = 4096

        let mut device = helpers::device_with_config(VirtualCounterConfig {
            config_blob: blob,
            ..Default::default()
        });

        let snapshot = device.config().unwrap();
        assert_eq!(snapshot.get("power"), Some(&ConfigValue::Byte(0)));
        assert_eq!(snapshot.get("speaker"), Some(&ConfigValue::Byte(1)));
        assert_eq!(snapshot.get("alarm_cpm"), Some(&ConfigValue::Uint(100)));
        assert_eq!(
            snapshot.get("data_save_address"),
            Some(&ConfigValue::Uint(4096))
        );
        // no float decoder; the raw bytes come through untouched
        assert_eq!(
            snapshot.get("calibration_usv_1"),
            Some(&ConfigValue::Raw(vec![0x3E, 0xCC, 0xCC, 0xCD]))
        );
    }

    #[test]
    fn config_snapshot_covers_every_field() {
        let mut device = helpers::default_device();
        let snapshot = device.config().unwrap();
        for field in device.info().config_layout.fields {
            assert!(
                snapshot.contains_key(field.name),
                "missing field {}",
                field.name
            );
        }
    }

    #[test]
    fn config_layout_follows_the_revision() {
        let mut rfc1201 = helpers::device_with_version("GMC-320Re 4.19");
        let snapshot = rfc1201.config().unwrap();
        assert!(snapshot.contains_key("max_cpm"));
        assert!(!snapshot.contains_key("fast_estimate_time"));

        let mut rfc1801 = helpers::default_device();
        let snapshot = rfc1801.config().unwrap();
        assert!(snapshot.contains_key("fast_estimate_time"));
        assert!(!snapshot.contains_key("max_cpm"));
    }

    #[test]
    fn config_short_blob_is_length_mismatch() {
        let mut device = helpers::device_with_config(VirtualCounterConfig {
            config_blob: vec![0u8; 100],
            ..Default::default()
        });

        let err = device.config().unwrap_err();
        match err {
            DeviceError::Decode(DecodeError::LengthMismatch { expected, got, .. }) => {
                assert_eq!(expected, 512);
                assert_eq!(got, 100);
            }
            other => panic!("expected LengthMismatch, got {other:?}"),
        }
    }

    #[test]
    fn config_silent_device_is_empty_reply() {
        let mut device = helpers::default_device();
        device.connection_mut().transport_mut().silence_next_reply();
        assert!(matches!(
            device.config().unwrap_err(),
            DeviceError::Decode(DecodeError::EmptyReply)
        ));
    }
}

// ============================================================================
// Heartbeat Streaming
// ============================================================================

mod heartbeat_tests {
    use super::*;

    #[test]
    fn heartbeat_live_yields_exactly_the_requested_count() {
        let mut device = helpers::default_device();
        device.heartbeat_on().unwrap();
        assert!(device.connection_mut().transport_mut().heartbeat_enabled());

        let mut stream = device.heartbeat_live(5).unwrap();
        let samples: Vec<u32> = stream.by_ref().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![1, 2, 3, 2, 1]);

        // exhausted means exhausted
        assert!(stream.next().is_none());
        assert!(stream.next().is_none());

        device.heartbeat_off().unwrap();
        assert!(!device.connection_mut().transport_mut().heartbeat_enabled());
    }

    #[test]
    fn heartbeat_samples_are_two_bytes_on_rfc1201() {
        let mut device = helpers::device_with_config(VirtualCounterConfig {
            version: "GMC-300Re 4.54".to_string(),
            heartbeat_series: vec![70, 5],
            ..Default::default()
        });
        device.heartbeat_on().unwrap();

        let samples: Vec<u32> = device
            .heartbeat_live(2)
            .unwrap()
            .map(|s| s.unwrap())
            .collect();
        assert_eq!(samples, vec![70, 5]);
    }

    #[test]
    fn heartbeat_error_ends_the_stream() {
        let mut device = helpers::default_device();
        device.heartbeat_on().unwrap();
        device.connection_mut().transport_mut().truncate_next_reply(1);

        let mut stream = device.heartbeat_live(5).unwrap();
        assert!(matches!(
            stream.next(),
            Some(Err(DeviceError::Decode(DecodeError::LengthMismatch { .. })))
        ));
        assert!(stream.next().is_none());
    }

    #[test]
    fn heartbeat_gated_like_any_other_command() {
        // every supported model has the heartbeat, so gate coverage comes
        // from the resolver rejecting unknown versions before this point;
        // here we only check the call sequence on a supported model
        let mut device = helpers::device_with_version("GMC-320Re 4.19");
        device.heartbeat_on().unwrap();
        let stream = device.heartbeat_live(1).unwrap();
        assert_eq!(stream.remaining(), 1);
    }
}

// ============================================================================
// History Pages
// ============================================================================

mod history_tests {
    use super::*;

    #[test]
    fn read_history_page_round_trip() {
        let mut history = vec![0u8; 64];
        for (i, byte) in history.iter_mut().enumerate() {
            *byte = i as u8;
        }
        let mut device = helpers::device_with_config(VirtualCounterConfig {
            history,
            ..Default::default()
        });

        let page = device.read_history_page(16, 8).unwrap();
        assert_eq!(page, vec![16, 17, 18, 19, 20, 21, 22, 23]);
    }

    #[test]
    fn read_history_past_image_reads_erased_flash() {
        let mut device = helpers::device_with_config(VirtualCounterConfig {
            history: vec![0x42; 4],
            ..Default::default()
        });

        let page = device.read_history_page(0, 8).unwrap();
        assert_eq!(page, vec![0x42, 0x42, 0x42, 0x42, 0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn read_history_silent_device_is_empty_page() {
        let mut device = helpers::default_device();
        device.connection_mut().transport_mut().silence_next_reply();

        // silence is a legitimate "no data" outcome for history reads
        let page = device.read_history_page(0, 64).unwrap();
        assert!(page.is_empty());
    }
}

// ============================================================================
// Connection Self-Test
// ============================================================================

mod connection_tests {
    use super::*;

    #[test]
    fn verify_against_the_sim() {
        helpers::init_tracing();
        let mut conn = Connection::new(VirtualCounter::new());
        assert!(conn.verify().unwrap());
    }

    #[test]
    fn verify_fails_on_silent_firmware() {
        helpers::init_tracing();
        let mut sim = VirtualCounter::new();
        sim.silence_next_reply();
        let mut conn = Connection::new(sim);
        assert!(!conn.verify().unwrap());
    }
}

// ============================================================================
// Property Tests
// ============================================================================

mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn counts_survive_the_full_stack(cpm in any::<u32>(), cps in any::<u32>()) {
            let mut device = helpers::device_with_config(VirtualCounterConfig {
                cpm,
                cps,
                ..Default::default()
            });
            prop_assert_eq!(device.cpm().unwrap(), cpm);
            prop_assert_eq!(device.cps().unwrap(), cps);
        }

        #[test]
        fn truncated_replies_error_instead_of_panicking(keep in 0usize..4) {
            let mut device = helpers::default_device();
            device.connection_mut().transport_mut().truncate_next_reply(keep);
            let err = device.cpm().unwrap_err();
            prop_assert!(
                matches!(err, DeviceError::Decode(DecodeError::LengthMismatch { .. })),
                "expected LengthMismatch, got {:?}",
                err
            );
        }
    }
}

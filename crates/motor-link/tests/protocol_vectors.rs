use motor_core::{MotorCommand, PidParameters, TelemetrySample};
use motor_link::protocol::{decode_line, encode_motor, encode_pid, DecodeError};
use proptest::prelude::*;

#[test]
fn decodes_reference_frames() {
    let vectors = [
        ("DATA:0.1,0,1500", TelemetrySample::new(0.1, 0.0, 1500.0)),
        ("DATA:1.006,1498.25,1500\n", TelemetrySample::new(1.01, 1498.25, 1500.0)),
        ("DATA: 2.499 , -3.5 , 0 \r\n", TelemetrySample::new(2.5, -3.5, 0.0)),
        ("  DATA:7,8,9", TelemetrySample::new(7.0, 8.0, 9.0)),
        ("DATA:0.125,10,20", TelemetrySample::new(0.12, 10.0, 20.0)),
        ("DATA:2.675,10,20", TelemetrySample::new(2.67, 10.0, 20.0)),
    ];
    for (line, expected) in vectors {
        let sample = decode_line(line)
            .unwrap_or_else(|e| panic!("{line:?} failed: {e}"))
            .unwrap_or_else(|| panic!("{line:?} was ignored"));
        assert_eq!(sample.rpm(), expected.rpm(), "{line:?}");
        assert_eq!(sample.setpoint(), expected.setpoint(), "{line:?}");
        assert!((sample.timestamp_s() - expected.timestamp_s()).abs() < 1e-9, "{line:?}");
    }
}

#[test]
fn firmware_chatter_is_ignored() {
    let chatter = [
        "Sistem siap.",
        "Motor stopped.",
        "RPM:1480.00,SETPOINT:1500.00,OUTPUT:120.00,KP:1.00,KI:0.50,KD:0.10",
        "Unknown command.",
    ];
    for line in chatter {
        assert_eq!(decode_line(line), Ok(None), "{line:?}");
    }
}

#[test]
fn malformed_frames_name_the_line() {
    for line in ["DATA:1,2", "DATA:a,b,c", "DATA:1,,3", "DATA:1;2;3"] {
        let err = decode_line(line).expect_err(line);
        assert_eq!(err.line(), line);
        assert!(err.to_string().contains(line));
    }
}

#[test]
fn wire_commands_match_firmware_dialect() {
    assert_eq!(encode_motor(MotorCommand::Forward(1500)), "F1500");
    assert_eq!(encode_motor(MotorCommand::Reverse(250)), "R250");
    assert_eq!(encode_motor(MotorCommand::Stop), "STOP");
    assert_eq!(encode_pid(&PidParameters::default()), "PID,1.0,0.5,0.1");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2000))]

    // Rendered gains parse back to the exact same values
    #[test]
    fn pid_rendering_reparses(kp in -1e6f64..1e6, ki in -1e6f64..1e6, kd in -1e6f64..1e6) {
        let gains = PidParameters::new(kp, ki, kd).unwrap();
        let wire = encode_pid(&gains);
        let fields: Vec<f64> = wire
            .strip_prefix("PID,")
            .unwrap()
            .split(',')
            .map(|f| f.parse().unwrap())
            .collect();
        prop_assert_eq!(fields, vec![kp, ki, kd]);
        prop_assert!(!wire.contains('e'));
    }

    // Every well-formed frame decodes with a 10 ms timestamp
    #[test]
    fn frames_decode_with_rounded_time(t in 0.0f64..1e5, rpm in -5000.0f64..5000.0, sp in 0.0f64..5000.0) {
        let line = format!("DATA:{t},{rpm},{sp}");
        let sample = decode_line(&line).unwrap().unwrap();
        let ts = sample.timestamp_s();
        prop_assert!((ts - t).abs() <= 0.005 + 1e-9, "{} -> {}", t, ts);
        prop_assert!(((ts * 100.0).round() - ts * 100.0).abs() < 1e-6, "{} -> {}", t, ts);
        prop_assert_eq!(sample.rpm(), rpm);
        prop_assert_eq!(sample.setpoint(), sp);
    }

    // Lines without the frame prefix never produce a sample or an error
    #[test]
    fn unprefixed_lines_are_ignored(line in "[^D].*") {
        prop_assume!(!line.trim().starts_with("DATA:"));
        prop_assert_eq!(decode_line(&line), Ok(None));
    }

    // Wrong field counts are always errors
    #[test]
    fn wrong_field_count_rejected(values in prop::collection::vec(0.0f64..100.0, 0..8)) {
        prop_assume!(values.len() != 3);
        let joined: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        let line = format!("DATA:{}", joined.join(","));
        let is_count_err = matches!(decode_line(&line), Err(DecodeError::FieldCount { .. }));
        prop_assert!(is_count_err, "{}", line);
    }
}

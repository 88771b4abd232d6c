//! Wire format spoken with the motor controller.
//!
//! Outbound, one command per line: `F<rpm>`, `R<rpm>`, `STOP`,
//! `PID,<kp>,<ki>,<kd>`. Inbound telemetry: `DATA:<t>,<rpm>,<setpoint>`.
//! Every other inbound line is device chatter and is ignored.

use motor_core::tags;
use motor_core::{MotorCommand, PidParameters, TelemetrySample};
use thiserror::Error;

pub const FRAME_PREFIX: &str = "DATA:";

const FRAME_FIELDS: [&str; 3] = [
    tags::DEVICE_TIME_S.key,
    tags::MOTOR_RPM.key,
    tags::SETPOINT_RPM.key,
];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("expected 3 fields, found {found}: {line:?}")]
    FieldCount { line: String, found: usize },
    #[error("{field} is not a finite number: {line:?}")]
    InvalidNumber { line: String, field: &'static str },
}

impl DecodeError {
    pub fn line(&self) -> &str {
        match self {
            Self::FieldCount { line, .. } | Self::InvalidNumber { line, .. } => line,
        }
    }
}

pub fn encode_motor(command: MotorCommand) -> String {
    match command {
        MotorCommand::Forward(rpm) => format!("F{rpm}"),
        MotorCommand::Reverse(rpm) => format!("R{rpm}"),
        MotorCommand::Stop => "STOP".to_string(),
    }
}

pub fn encode_pid(gains: &PidParameters) -> String {
    format!(
        "PID,{},{},{}",
        format_gain(gains.kp()),
        format_gain(gains.ki()),
        format_gain(gains.kd())
    )
}

/// Shortest round-trip decimal, keeping one fractional digit on whole
/// values so the firmware always sees a decimal literal.
fn format_gain(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Decodes one inbound line.
///
/// `Ok(None)` means the line is not a telemetry frame.
pub fn decode_line(raw: &str) -> Result<Option<TelemetrySample>, DecodeError> {
    let line = raw.trim();
    let Some(payload) = line.strip_prefix(FRAME_PREFIX) else {
        return Ok(None);
    };

    let fields: Vec<&str> = payload.split(',').collect();
    if fields.len() != FRAME_FIELDS.len() {
        return Err(DecodeError::FieldCount {
            line: line.to_string(),
            found: fields.len(),
        });
    }

    let mut values = [0.0f64; 3];
    for ((slot, text), field) in values.iter_mut().zip(&fields).zip(FRAME_FIELDS) {
        *slot = match text.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => v,
            _ => {
                return Err(DecodeError::InvalidNumber {
                    line: line.to_string(),
                    field,
                })
            }
        };
    }

    let [timestamp_s, rpm, setpoint] = values;
    Ok(Some(TelemetrySample::new(
        round_centis(timestamp_s),
        rpm,
        setpoint,
    )))
}

/// Device sampling granularity is 10 ms.
///
/// Rounds the exact binary value to the nearest hundredth, so `0.125`
/// (stored slightly below) becomes `0.12`. Scaling by 100 first would
/// round the inexact product instead.
fn round_centis(value: f64) -> f64 {
    format!("{value:.2}").parse().unwrap_or(value)
}

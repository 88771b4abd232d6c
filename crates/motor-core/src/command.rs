use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward,
    Reverse,
}

/// Motor instruction for the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "rpm", rename_all = "snake_case")]
pub enum MotorCommand {
    Forward(u32),
    Reverse(u32),
    Stop,
}

impl MotorCommand {
    /// Builds a run command from raw operator text.
    pub fn drive(direction: Direction, rpm_input: &str) -> Result<Self, ValidationError> {
        let rpm = parse_rpm(rpm_input)?;
        Ok(match direction {
            Direction::Forward => Self::Forward(rpm),
            Direction::Reverse => Self::Reverse(rpm),
        })
    }
}

/// Which PID gain a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GainField {
    Kp,
    Ki,
    Kd,
}

impl GainField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kp => "kp",
            Self::Ki => "ki",
            Self::Kd => "kd",
        }
    }
}

impl fmt::Display for GainField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// PID gains for the controller. All three are finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PidParameters {
    kp: f64,
    ki: f64,
    kd: f64,
}

impl PidParameters {
    pub fn new(kp: f64, ki: f64, kd: f64) -> Result<Self, ValidationError> {
        for (field, value) in [(GainField::Kp, kp), (GainField::Ki, ki), (GainField::Kd, kd)] {
            if !value.is_finite() {
                return Err(ValidationError::NonFiniteGain { field, value });
            }
        }
        Ok(Self { kp, ki, kd })
    }

    /// Parses all three fields; the first bad field rejects the whole set.
    pub fn from_inputs(kp: &str, ki: &str, kd: &str) -> Result<Self, ValidationError> {
        let kp = parse_gain(GainField::Kp, kp)?;
        let ki = parse_gain(GainField::Ki, ki)?;
        let kd = parse_gain(GainField::Kd, kd)?;
        Self::new(kp, ki, kd)
    }

    pub fn kp(&self) -> f64 {
        self.kp
    }

    pub fn ki(&self) -> f64 {
        self.ki
    }

    pub fn kd(&self) -> f64 {
        self.kd
    }
}

impl Default for PidParameters {
    /// Gains the controller firmware boots with.
    fn default() -> Self {
        Self {
            kp: 1.0,
            ki: 0.5,
            kd: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("invalid RPM {input:?}: enter a whole number of 0 or more")]
    InvalidRpm { input: String },
    #[error("RPM {input} is too large (maximum {max})")]
    RpmOutOfRange { input: String, max: u32 },
    #[error("invalid {field} {input:?}: enter a decimal number")]
    InvalidGain { field: GainField, input: String },
    #[error("{field} must be finite, got {value}")]
    NonFiniteGain { field: GainField, value: f64 },
}

impl ValidationError {
    /// Name of the input field the error refers to.
    pub fn field(&self) -> &'static str {
        match self {
            Self::InvalidRpm { .. } | Self::RpmOutOfRange { .. } => "rpm",
            Self::InvalidGain { field, .. } | Self::NonFiniteGain { field, .. } => field.as_str(),
        }
    }
}

/// Accepts ASCII digits only; signs, decimals and empty input are rejected.
pub fn parse_rpm(input: &str) -> Result<u32, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::InvalidRpm {
            input: input.to_string(),
        });
    }
    trimmed
        .parse::<u32>()
        .map_err(|_| ValidationError::RpmOutOfRange {
            input: trimmed.to_string(),
            max: u32::MAX,
        })
}

pub fn parse_gain(field: GainField, input: &str) -> Result<f64, ValidationError> {
    let value = input
        .trim()
        .parse::<f64>()
        .map_err(|_| ValidationError::InvalidGain {
            field,
            input: input.to_string(),
        })?;
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteGain { field, value });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drive_accepts_digits() {
        assert_eq!(
            MotorCommand::drive(Direction::Forward, "1500"),
            Ok(MotorCommand::Forward(1500))
        );
        assert_eq!(
            MotorCommand::drive(Direction::Reverse, " 0 "),
            Ok(MotorCommand::Reverse(0))
        );
    }

    #[test]
    fn drive_rejects_non_numeric() {
        for input in ["abc", "", "  ", "-5", "+5", "12.5", "1e3", "15 00"] {
            let res = MotorCommand::drive(Direction::Forward, input);
            assert!(
                matches!(res, Err(ValidationError::InvalidRpm { .. })),
                "{input:?} gave {res:?}"
            );
        }
    }

    #[test]
    fn drive_rejects_overflow() {
        let res = parse_rpm("99999999999");
        assert!(matches!(res, Err(ValidationError::RpmOutOfRange { .. })));
    }

    #[test]
    fn pid_rejects_single_bad_field() {
        let err = PidParameters::from_inputs("1.0", "x", "0.1").unwrap_err();
        assert_eq!(err.field(), "ki");
        assert!(matches!(
            err,
            ValidationError::InvalidGain {
                field: GainField::Ki,
                ..
            }
        ));
    }

    #[test]
    fn pid_rejects_non_finite() {
        let err = PidParameters::from_inputs("inf", "0.5", "0.1").unwrap_err();
        assert!(matches!(
            err,
            ValidationError::NonFiniteGain {
                field: GainField::Kp,
                ..
            }
        ));
        assert!(PidParameters::new(1.0, f64::NAN, 0.0).is_err());
    }

    #[test]
    fn pid_accepts_decimal_fields() {
        let pid = PidParameters::from_inputs("1.0", " 0.5", "1e-1").unwrap();
        assert_eq!(pid, PidParameters::default());
    }

    #[test]
    fn error_messages_name_the_field() {
        let err = PidParameters::from_inputs("1", "2", "zz").unwrap_err();
        assert!(err.to_string().contains("kd"));
        let err = parse_rpm("abc").unwrap_err();
        assert!(err.to_string().contains("RPM"));
    }
}

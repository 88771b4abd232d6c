use serde::Serialize;

/// One telemetry reading reported by the motor controller.
///
/// Samples are immutable once built. The device timestamp is kept as
/// reported (already rounded by the decoder) and is not checked for
/// monotonicity: duplicates and out-of-order readings pass through as-is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TelemetrySample {
    timestamp_s: f64,
    rpm: f64,
    setpoint: f64,
}

impl TelemetrySample {
    pub fn new(timestamp_s: f64, rpm: f64, setpoint: f64) -> Self {
        Self {
            timestamp_s,
            rpm,
            setpoint,
        }
    }

    /// Device time in seconds.
    pub fn timestamp_s(&self) -> f64 {
        self.timestamp_s
    }

    /// Measured speed.
    pub fn rpm(&self) -> f64 {
        self.rpm
    }

    /// Speed the controller is regulating towards.
    pub fn setpoint(&self) -> f64 {
        self.setpoint
    }
}

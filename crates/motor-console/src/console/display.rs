use motor_core::tags::{DEVICE_TIME_S, MOTOR_RPM, SETPOINT_RPM};
use motor_core::{TelemetrySample, WindowSnapshot};
use motor_link::DisplaySink;
use std::fmt;
use std::io::{self, Stdout, Write};

/// Line-per-sample telemetry printer.
///
/// Write failures are dropped; a closed stdout must not stop ingestion.
pub struct TerminalDisplay<W: Write + Send> {
    out: W,
    quiet: bool,
}

impl TerminalDisplay<Stdout> {
    pub fn stdout(quiet: bool) -> Self {
        Self::new(io::stdout(), quiet)
    }
}

impl<W: Write + Send> TerminalDisplay<W> {
    pub fn new(out: W, quiet: bool) -> Self {
        Self { out, quiet }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> DisplaySink for TerminalDisplay<W> {
    fn on_sample(&mut self, latest: &TelemetrySample, _window: &WindowSnapshot) {
        if self.quiet {
            return;
        }
        let _ = writeln!(self.out, "{}", format_sample(latest));
        let _ = self.out.flush();
    }
}

pub fn format_sample(sample: &TelemetrySample) -> String {
    format!(
        "{}={:.2} {}  {}={:.1}  {}={:.1}",
        DEVICE_TIME_S.label,
        sample.timestamp_s(),
        DEVICE_TIME_S.unit,
        MOTOR_RPM.label,
        sample.rpm(),
        SETPOINT_RPM.label,
        sample.setpoint(),
    )
}

/// Aggregate view of a window, printed by the `show` command.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSummary {
    pub samples: usize,
    pub span_s: f64,
    pub rpm_min: f64,
    pub rpm_max: f64,
    pub rpm_mean: f64,
    pub setpoint: f64,
}

pub fn summarize(window: &WindowSnapshot) -> Option<WindowSummary> {
    let latest = window.latest()?;
    let first = window.timestamps.first().copied().unwrap_or_default();

    let (min, max, sum) = window.rpm.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY, 0.0),
        |(min, max, sum), &rpm| (min.min(rpm), max.max(rpm), sum + rpm),
    );

    Some(WindowSummary {
        samples: window.len(),
        span_s: latest.timestamp_s() - first,
        rpm_min: min,
        rpm_max: max,
        rpm_mean: sum / window.len() as f64,
        setpoint: latest.setpoint(),
    })
}

impl fmt::Display for WindowSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} samples over {:.2} s  rpm min/mean/max {:.1}/{:.1}/{:.1}  setpoint {:.1}",
            self.samples, self.span_s, self.rpm_min, self.rpm_mean, self.rpm_max, self.setpoint
        )
    }
}

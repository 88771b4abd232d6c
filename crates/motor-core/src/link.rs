use serde::Serialize;
use thiserror::Error;

/// Whether the console acquired its link at startup.
///
/// Decided once; an `Unavailable` link never becomes `Open` later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    Unavailable,
    Open,
}

impl LinkState {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unavailable => "unavailable",
            Self::Open => "open",
        }
    }
}

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("link I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("link closed by the device")]
    Closed,
}

/// Line-oriented channel to the motor controller.
///
/// Lines exchanged here carry no terminator; implementations append `\n`
/// on write and strip it on read.
pub trait Link: Send {
    fn write_line(&mut self, line: &str) -> Result<(), LinkError>;

    /// Returns `Ok(None)` when the read timed out without a complete line.
    fn read_line(&mut self) -> Result<Option<String>, LinkError>;

    /// Short label for logs, e.g. the port name.
    fn name(&self) -> &str;
}

impl<L: Link + ?Sized> Link for Box<L> {
    fn write_line(&mut self, line: &str) -> Result<(), LinkError> {
        (**self).write_line(line)
    }

    fn read_line(&mut self) -> Result<Option<String>, LinkError> {
        (**self).read_line()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

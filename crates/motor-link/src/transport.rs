use crate::metrics::LINK_OPEN;
use crate::serial::{SerialConfig, SerialLink};
use motor_core::{Link, LinkError, LinkState};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("link unavailable: {reason}")]
    Unavailable { reason: String },
    #[error(transparent)]
    Io(#[from] LinkError),
    #[error("refusing to send text containing a line break: {text:?}")]
    EmbeddedNewline { text: String },
}

enum Channel {
    Unavailable { reason: String },
    Open {
        link: Mutex<Box<dyn Link>>,
        name: String,
    },
}

/// Shared handle to the controller link.
///
/// Reads and writes take the same lock, so one `write_line` and one
/// `read_line` never interleave on the wire. The lock is taken per call.
pub struct Transport {
    channel: Channel,
}

impl Transport {
    /// Opens the serial port. Failure is not an error here: it yields an
    /// unavailable transport whose operations all report it.
    pub fn open(config: &SerialConfig) -> Self {
        match SerialLink::open(config) {
            Ok(link) => Self::with_link(link),
            Err(e) => {
                warn!(port = %config.port, error = %e, "Serial port unavailable");
                Self::unavailable(format!("{}: {}", config.port, e))
            }
        }
    }

    pub fn with_link(link: impl Link + 'static) -> Self {
        LINK_OPEN.set(1.0);
        let name = link.name().to_string();
        Self {
            channel: Channel::Open {
                link: Mutex::new(Box::new(link)),
                name,
            },
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        LINK_OPEN.set(0.0);
        Self {
            channel: Channel::Unavailable {
                reason: reason.into(),
            },
        }
    }

    pub fn state(&self) -> LinkState {
        match self.channel {
            Channel::Unavailable { .. } => LinkState::Unavailable,
            Channel::Open { .. } => LinkState::Open,
        }
    }

    /// Link name for logs, or the reason it is unavailable.
    pub fn describe(&self) -> &str {
        match &self.channel {
            Channel::Unavailable { reason } => reason,
            Channel::Open { name, .. } => name,
        }
    }

    pub fn write_line(&self, text: &str) -> Result<(), TransportError> {
        let mut link = self.lock()?;
        if text.contains(['\n', '\r']) {
            return Err(TransportError::EmbeddedNewline {
                text: text.to_string(),
            });
        }
        link.write_line(text)?;
        debug!(line = text, "Sent");
        Ok(())
    }

    /// `Ok(None)` when the read timed out with no complete line.
    pub fn read_line(&self) -> Result<Option<String>, TransportError> {
        let mut link = self.lock()?;
        Ok(link.read_line()?)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Box<dyn Link>>, TransportError> {
        match &self.channel {
            Channel::Unavailable { reason } => Err(TransportError::Unavailable {
                reason: reason.clone(),
            }),
            Channel::Open { link, .. } => {
                Ok(link.lock().unwrap_or_else(PoisonError::into_inner))
            }
        }
    }
}

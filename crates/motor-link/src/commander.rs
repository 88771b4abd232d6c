use crate::metrics::{COMMANDS_REJECTED, COMMANDS_SENT, TRANSPORT_ERRORS};
use crate::protocol::{encode_motor, encode_pid};
use crate::transport::{Transport, TransportError};
use motor_core::{Direction, MotorCommand, PidParameters, ValidationError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Confirmation that a command left the console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentCommand {
    /// Exact text written to the link, without the terminator.
    pub wire: String,
}

/// Command path used by operator actions.
///
/// Validates raw input, encodes it and writes it in one call. Nothing is
/// written unless the whole command validated. Writes are fire-and-forget.
#[derive(Clone)]
pub struct Commander {
    transport: Arc<Transport>,
}

impl Commander {
    pub fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    pub fn drive(
        &self,
        direction: Direction,
        rpm_input: &str,
    ) -> Result<SentCommand, CommandError> {
        let command = MotorCommand::drive(direction, rpm_input).map_err(rejected)?;
        self.send_motor(command)
    }

    pub fn stop(&self) -> Result<SentCommand, CommandError> {
        self.send_motor(MotorCommand::Stop)
    }

    pub fn update_pid(
        &self,
        kp_input: &str,
        ki_input: &str,
        kd_input: &str,
    ) -> Result<SentCommand, CommandError> {
        let gains = PidParameters::from_inputs(kp_input, ki_input, kd_input).map_err(rejected)?;
        self.send_pid(&gains)
    }

    pub fn send_motor(&self, command: MotorCommand) -> Result<SentCommand, CommandError> {
        self.send(encode_motor(command))
    }

    pub fn send_pid(&self, gains: &PidParameters) -> Result<SentCommand, CommandError> {
        self.send(encode_pid(gains))
    }

    fn send(&self, wire: String) -> Result<SentCommand, CommandError> {
        match self.transport.write_line(&wire) {
            Ok(()) => {
                COMMANDS_SENT.inc();
                info!(command = %wire, "Command sent");
                Ok(SentCommand { wire })
            }
            Err(e) => {
                if matches!(e, TransportError::Io(_)) {
                    TRANSPORT_ERRORS.inc();
                }
                warn!(command = %wire, error = %e, "Command not sent");
                Err(e.into())
            }
        }
    }
}

fn rejected(e: ValidationError) -> ValidationError {
    COMMANDS_REJECTED.inc();
    warn!(field = e.field(), error = %e, "Command rejected");
    e
}

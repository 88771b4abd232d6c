//! Operator command line parsing.
//!
//! Only splits the line into an action; numeric validation belongs to the
//! command path so raw text reaches it unchanged.

use motor_core::Direction;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Drive { direction: Direction, rpm: String },
    Stop,
    Pid { kp: String, ki: String, kd: String },
    Show,
    Status,
    Help,
    Quit,
    Empty,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("unknown command '{0}' (type 'help')")]
    UnknownCommand(String),
    #[error("'{verb}' needs {expected}")]
    MissingArgument {
        verb: &'static str,
        expected: &'static str,
    },
}

pub fn parse_action(line: &str) -> Result<Action, InputError> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(Action::Empty);
    };

    match verb.to_ascii_lowercase().as_str() {
        "f" | "forward" => drive(Direction::Forward, "forward", words.next()),
        "r" | "reverse" => drive(Direction::Reverse, "reverse", words.next()),
        "s" | "stop" => Ok(Action::Stop),
        "pid" => match (words.next(), words.next(), words.next()) {
            (Some(kp), Some(ki), Some(kd)) => Ok(Action::Pid {
                kp: kp.to_string(),
                ki: ki.to_string(),
                kd: kd.to_string(),
            }),
            _ => Err(InputError::MissingArgument {
                verb: "pid",
                expected: "<KP> <KI> <KD>",
            }),
        },
        "show" => Ok(Action::Show),
        "status" => Ok(Action::Status),
        "help" | "?" => Ok(Action::Help),
        "q" | "quit" | "exit" => Ok(Action::Quit),
        _ => Err(InputError::UnknownCommand(verb.to_string())),
    }
}

fn drive(
    direction: Direction,
    verb: &'static str,
    rpm: Option<&str>,
) -> Result<Action, InputError> {
    match rpm {
        Some(rpm) => Ok(Action::Drive {
            direction,
            rpm: rpm.to_string(),
        }),
        None => Err(InputError::MissingArgument {
            verb,
            expected: "<RPM>",
        }),
    }
}

pub const HELP: &str = "\
commands:
  f, forward <RPM>     run forward
  r, reverse <RPM>     run in reverse
  s, stop              stop the motor
  pid <KP> <KI> <KD>   update PID gains
  show                 summarize the telemetry window
  status               link and window status
  q, quit              leave";

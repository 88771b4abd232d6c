use super::display::{format_sample, summarize};
use super::input::{Action, HELP};
use crate::infra::audit::{AuditEventType, AuditLogger};
use motor_core::WindowStore;
use motor_link::{CommandError, Commander, SentCommand, Transport};
use std::sync::Arc;

/// What the input loop does after an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    Reply(String),
    Quit,
}

/// Operator side of the console: turns actions into commands and replies.
pub struct Session {
    commander: Commander,
    transport: Arc<Transport>,
    store: Arc<WindowStore>,
    audit: Option<Arc<AuditLogger>>,
}

impl Session {
    pub fn new(
        transport: Arc<Transport>,
        store: Arc<WindowStore>,
        audit: Option<Arc<AuditLogger>>,
    ) -> Self {
        Self {
            commander: Commander::new(Arc::clone(&transport)),
            transport,
            store,
            audit,
        }
    }

    pub fn handle(&self, action: Action) -> Flow {
        let reply = match action {
            Action::Drive { direction, rpm } => {
                let result = self.commander.drive(direction, &rpm);
                self.report(&format!("{direction:?} {rpm}"), result)
            }
            Action::Stop => self.report("stop", self.commander.stop()),
            Action::Pid { kp, ki, kd } => {
                let result = self.commander.update_pid(&kp, &ki, &kd);
                self.report(&format!("pid {kp} {ki} {kd}"), result)
            }
            Action::Show => match summarize(&self.store.snapshot()) {
                Some(summary) => summary.to_string(),
                None => "no telemetry yet".to_string(),
            },
            Action::Status => self.status(),
            Action::Help => HELP.to_string(),
            Action::Quit => return Flow::Quit,
            Action::Empty => String::new(),
        };
        Flow::Reply(reply)
    }

    fn status(&self) -> String {
        let link = format!(
            "{} ({})",
            self.transport.state().as_str(),
            self.transport.describe()
        );
        let latest = self
            .store
            .latest()
            .map(|s| format_sample(&s))
            .unwrap_or_else(|| "none".to_string());
        format!(
            "link: {link}\nwindow: {}/{} samples\nlatest: {latest}",
            self.store.len(),
            self.store.capacity()
        )
    }

    fn report(&self, input: &str, result: Result<SentCommand, CommandError>) -> String {
        match result {
            Ok(sent) => {
                self.audit(
                    AuditEventType::CommandSent,
                    serde_json::json!({ "input": input, "wire": sent.wire }),
                );
                format!("sent {}", sent.wire)
            }
            Err(CommandError::Validation(e)) => {
                self.audit(
                    AuditEventType::CommandRejected,
                    serde_json::json!({
                        "input": input,
                        "field": e.field(),
                        "error": e.to_string(),
                    }),
                );
                format!("error: {e}")
            }
            Err(CommandError::Transport(e)) => {
                self.audit(
                    AuditEventType::CommandFailed,
                    serde_json::json!({ "input": input, "error": e.to_string() }),
                );
                format!("error: {e}")
            }
        }
    }

    fn audit(&self, event: AuditEventType, details: serde_json::Value) {
        if let Some(logger) = &self.audit {
            logger.record(event, details);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::input::parse_action;
    use crate::infra::audit::AuditEntry;
    use motor_core::{SimConfig, SimulatedDevice, TelemetrySample};

    fn reply(session: &Session, line: &str) -> String {
        match session.handle(parse_action(line).unwrap()) {
            Flow::Reply(text) => text,
            Flow::Quit => panic!("unexpected quit for {line:?}"),
        }
    }

    fn simulated_session(audit: Option<Arc<AuditLogger>>) -> Session {
        let transport = Arc::new(Transport::with_link(SimulatedDevice::new(
            SimConfig::unpaced(),
        )));
        Session::new(transport, Arc::new(WindowStore::new(10)), audit)
    }

    #[test]
    fn valid_commands_are_sent() {
        let session = simulated_session(None);
        assert_eq!(reply(&session, "f 1500"), "sent F1500");
        assert_eq!(reply(&session, "r 20"), "sent R20");
        assert_eq!(reply(&session, "stop"), "sent STOP");
        assert_eq!(reply(&session, "pid 2 0.5 0.05"), "sent PID,2.0,0.5,0.05");
    }

    #[test]
    fn invalid_input_is_reported() {
        let session = simulated_session(None);
        let text = reply(&session, "f abc");
        assert!(text.starts_with("error: invalid RPM"), "{text}");
        let text = reply(&session, "pid 1.0 x 0.1");
        assert!(text.contains("ki"), "{text}");
    }

    #[test]
    fn unavailable_link_reports_each_command() {
        let session = Session::new(
            Arc::new(Transport::unavailable("/dev/ttyACM0: not found")),
            Arc::new(WindowStore::default()),
            None,
        );
        let text = reply(&session, "f 100");
        assert!(text.starts_with("error: link unavailable"), "{text}");
        assert!(reply(&session, "status").contains("unavailable (/dev/ttyACM0: not found)"));
    }

    #[test]
    fn show_and_status_read_the_window() {
        let session = simulated_session(None);
        assert_eq!(reply(&session, "show"), "no telemetry yet");

        session.store.append(TelemetrySample::new(0.1, 10.0, 100.0));
        session.store.append(TelemetrySample::new(0.2, 30.0, 100.0));
        assert!(reply(&session, "show").starts_with("2 samples over 0.10 s"));

        let status = reply(&session, "status");
        assert!(status.contains("window: 2/10 samples"), "{status}");
        assert!(status.contains("rpm=30.0"), "{status}");
    }

    #[test]
    fn quit_ends_session() {
        let session = simulated_session(None);
        assert_eq!(session.handle(Action::Quit), Flow::Quit);
        assert_eq!(session.handle(Action::Empty), Flow::Reply(String::new()));
    }

    #[test]
    fn commands_are_audited() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let logger = Arc::new(AuditLogger::new(&path).unwrap());
        let session = simulated_session(Some(logger));

        reply(&session, "f 1200");
        reply(&session, "f -1");
        reply(&session, "show");

        let entries: Vec<AuditEntry> = std::fs::read_to_string(&path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].event_type, AuditEventType::CommandSent);
        assert_eq!(entries[0].details["wire"], "F1200");
        assert_eq!(entries[1].event_type, AuditEventType::CommandRejected);
        assert_eq!(entries[1].details["field"], "rpm");
    }
}

use motor_core::{SimConfig, DEFAULT_WINDOW_CAPACITY};
use motor_link::{IngestConfig, SerialConfig};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub show_help: bool,
    pub list_ports: bool,
    pub run_seconds: Option<u64>,
    pub port: String,
    pub baud_rate: u32,
    pub read_timeout_ms: u64,
    pub window_capacity: usize,
    pub poll_interval_ms: u64,
    pub simulate: bool,
    pub sim_interval_ms: u64,
    pub quiet: bool,
    pub json_logs: bool,
    pub log_dir: Option<PathBuf>,
    pub metrics_addr: Option<String>,
    pub audit_path: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        let serial = SerialConfig::default();
        Self {
            show_help: false,
            list_ports: false,
            run_seconds: None,
            port: serial.port,
            baud_rate: serial.baud_rate,
            read_timeout_ms: serial.read_timeout.as_millis() as u64,
            window_capacity: DEFAULT_WINDOW_CAPACITY,
            poll_interval_ms: 100,
            simulate: false,
            sim_interval_ms: 100,
            quiet: false,
            json_logs: false,
            log_dir: None,
            metrics_addr: None,
            audit_path: None,
        }
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        let args: Vec<String> = std::env::args().collect();
        Self::from_args(&args)
    }

    pub fn from_args(args: &[String]) -> Self {
        let mut cfg = RuntimeConfig::default();
        let mut i = 1;
        while i < args.len() {
            let value = args.get(i + 1);
            let mut consumed = true;
            match (args[i].as_str(), value) {
                ("--port", Some(v)) => cfg.port = v.clone(),
                ("--baud", Some(v)) => cfg.baud_rate = v.parse().unwrap_or(cfg.baud_rate),
                ("--read-timeout-ms", Some(v)) => {
                    cfg.read_timeout_ms = v.parse().unwrap_or(cfg.read_timeout_ms)
                }
                ("--window", Some(v)) => {
                    cfg.window_capacity = v.parse().unwrap_or(cfg.window_capacity)
                }
                ("--poll-ms", Some(v)) => {
                    cfg.poll_interval_ms = v.parse().unwrap_or(cfg.poll_interval_ms)
                }
                ("--sim-interval-ms", Some(v)) => {
                    cfg.sim_interval_ms = v.parse().unwrap_or(cfg.sim_interval_ms)
                }
                ("--run-seconds", Some(v)) => cfg.run_seconds = v.parse::<u64>().ok(),
                ("--log-dir", Some(v)) => cfg.log_dir = Some(PathBuf::from(v)),
                ("--metrics-addr", Some(v)) => cfg.metrics_addr = Some(v.clone()),
                ("--audit-log", Some(v)) => cfg.audit_path = Some(PathBuf::from(v)),
                (flag, _) => {
                    consumed = false;
                    match flag {
                        "--simulate" => cfg.simulate = true,
                        "--list-ports" => cfg.list_ports = true,
                        "--quiet" | "-q" => cfg.quiet = true,
                        "--json-logs" => cfg.json_logs = true,
                        "--help" | "-h" => {
                            cfg.show_help = true;
                            break;
                        }
                        _ => {}
                    }
                }
            }
            i += if consumed { 2 } else { 1 };
        }
        cfg
    }

    pub fn serial_config(&self) -> SerialConfig {
        SerialConfig {
            port: self.port.clone(),
            baud_rate: self.baud_rate,
            read_timeout: Duration::from_millis(self.read_timeout_ms),
        }
    }

    pub fn ingest_config(&self) -> IngestConfig {
        IngestConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }

    pub fn sim_config(&self) -> SimConfig {
        let interval = Duration::from_millis(self.sim_interval_ms);
        SimConfig {
            frame_interval: interval,
            idle_timeout: interval,
            step_s: interval.as_secs_f64().max(0.01),
            ..SimConfig::default()
        }
    }

    pub fn print_help() {
        println!(
            r#"motor-console - Serial console for a PID-controlled DC motor

USAGE:
    motor-console [OPTIONS]

OPTIONS:
    --port <NAME>             Serial port of the controller [default: /dev/ttyACM0, COM7 on Windows]
    --baud <RATE>             Serial baud rate [default: 9600]
    --read-timeout-ms <MS>    Serial read timeout [default: 1000]
    --window <N>              Telemetry samples kept for display [default: 100]
    --poll-ms <MS>            Pause after a read with no data [default: 100]
    --simulate                Talk to a built-in simulated controller instead of a port
    --sim-interval-ms <MS>    Telemetry period of the simulated controller [default: 100]
    --list-ports              List available serial ports and exit
    --run-seconds <SECS>      Run for a fixed duration then exit
    -q, --quiet               Do not print each telemetry sample
    --json-logs               Output logs in JSON format (for log aggregation)
    --log-dir <DIR>           Also write logs to a daily rolling file in DIR
    --metrics-addr <ADDR>     Enable Prometheus metrics server on address (e.g., 0.0.0.0:9090)
    --audit-log <PATH>        Append a JSONL journal of commands to PATH
    -h, --help                Print this help message

CONSOLE COMMANDS:
    f, forward <RPM>          Run forward at RPM
    r, reverse <RPM>          Run in reverse at RPM
    s, stop                   Stop the motor
    pid <KP> <KI> <KD>        Update PID gains
    show                      Summarize the telemetry window
    status                    Show link and ingestion status
    help                      List console commands
    q, quit                   Leave the console

ENVIRONMENT VARIABLES:
    RUST_LOG                  Set log filter (e.g., RUST_LOG=debug,motor_link=trace)

EXAMPLES:
    # Connect to an Arduino on the first USB serial port
    motor-console --port /dev/ttyUSB0

    # Try the console without hardware
    motor-console --simulate

    # Bounded run with metrics and a command journal
    motor-console --run-seconds 60 --metrics-addr 0.0.0.0:9090 --audit-log ./audit.jsonl
"#
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("motor-console")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn defaults_match_controller_firmware() {
        let cfg = RuntimeConfig::from_args(&args(&[]));
        assert_eq!(cfg.baud_rate, 9600);
        assert_eq!(cfg.read_timeout_ms, 1000);
        assert_eq!(cfg.window_capacity, 100);
        assert!(!cfg.simulate);
    }

    #[test]
    fn parses_link_options() {
        let cfg = RuntimeConfig::from_args(&args(&[
            "--port",
            "/dev/ttyUSB1",
            "--baud",
            "115200",
            "--window",
            "250",
            "--simulate",
            "--run-seconds",
            "5",
            "-q",
        ]));
        assert_eq!(cfg.port, "/dev/ttyUSB1");
        assert_eq!(cfg.baud_rate, 115200);
        assert_eq!(cfg.window_capacity, 250);
        assert!(cfg.simulate);
        assert!(cfg.quiet);
        assert_eq!(cfg.run_seconds, Some(5));
        assert_eq!(cfg.serial_config().baud_rate, 115200);
    }

    #[test]
    fn bad_numbers_keep_defaults() {
        let cfg = RuntimeConfig::from_args(&args(&["--baud", "fast", "--poll-ms", "-3"]));
        assert_eq!(cfg.baud_rate, 9600);
        assert_eq!(cfg.poll_interval_ms, 100);
    }

    #[test]
    fn help_stops_parsing() {
        let cfg = RuntimeConfig::from_args(&args(&["--help", "--simulate"]));
        assert!(cfg.show_help);
        assert!(!cfg.simulate);
    }
}

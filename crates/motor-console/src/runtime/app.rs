use crate::console::{parse_action, Flow, Session, TerminalDisplay};
use crate::infra::audit::{AuditEventType, AuditLogger};
use crate::runtime::config::RuntimeConfig;
use crate::runtime::logging::init_tracing;
use motor_core::{SimulatedDevice, WindowStore};
use motor_link::{
    available_ports, init_metrics, serve_metrics, spawn_ingest, IngestStats, Transport,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to initialize log file: {0}")]
    Logging(#[from] tracing_appender::rolling::InitError),
    #[error("audit logging requested but {path} could not be opened: {source}")]
    Audit {
        path: String,
        #[source]
        source: io::Error,
    },
}

pub fn run_from_args() -> Result<(), AppError> {
    let config = RuntimeConfig::from_env();
    if config.show_help {
        RuntimeConfig::print_help();
        return Ok(());
    }
    if config.list_ports {
        list_ports();
        return Ok(());
    }
    run(config)
}

fn list_ports() {
    let ports = available_ports();
    if ports.is_empty() {
        println!("no serial ports found");
    }
    for port in ports {
        if port.description.is_empty() {
            println!("{}", port.name);
        } else {
            println!("{}  {}", port.name, port.description);
        }
    }
}

pub fn run(config: RuntimeConfig) -> Result<(), AppError> {
    let _log_guard = init_tracing(config.json_logs, config.log_dir.as_deref())?;

    init_metrics();
    let metrics_enabled = config.metrics_addr.is_some();
    let _metrics_handle = config.metrics_addr.clone().map(|addr| {
        info!(addr = %addr, "Starting metrics server");
        serve_metrics(addr)
    });

    let audit_logger = init_audit_logger(config.audit_path.as_ref())?;
    let audit = |event: AuditEventType, details: serde_json::Value| {
        if let Some(logger) = &audit_logger {
            logger.record(event, details);
        }
    };

    audit(
        AuditEventType::SystemStart,
        serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "port": config.port,
            "simulate": config.simulate,
            "metrics_enabled": metrics_enabled,
        }),
    );

    let transport = Arc::new(if config.simulate {
        info!(
            interval_ms = config.sim_interval_ms,
            "Using simulated controller"
        );
        Transport::with_link(SimulatedDevice::new(config.sim_config()))
    } else {
        info!(port = %config.port, baud = config.baud_rate, "Opening serial link");
        Transport::open(&config.serial_config())
    });

    let link_open = transport.state().is_open();
    audit(
        if link_open {
            AuditEventType::LinkOpened
        } else {
            AuditEventType::LinkUnavailable
        },
        serde_json::json!({ "link": transport.describe() }),
    );

    let store = Arc::new(WindowStore::new(config.window_capacity));
    let stop = Arc::new(AtomicBool::new(false));

    let ingest_handle = if link_open {
        match spawn_ingest(
            Arc::clone(&transport),
            Arc::clone(&store),
            TerminalDisplay::stdout(config.quiet),
            config.ingest_config(),
            Arc::clone(&stop),
        ) {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(error = %e, "Ingestion not started");
                None
            }
        }
    } else {
        println!(
            "link unavailable: {} (commands will not be sent)",
            transport.describe()
        );
        None
    };

    let session = Session::new(
        Arc::clone(&transport),
        Arc::clone(&store),
        audit_logger.clone(),
    );
    info!(window = store.capacity(), "Console ready. Type 'help' for commands.");
    run_session(&session, config.run_seconds);

    stop.store(true, Ordering::Relaxed);
    let stats = ingest_handle.and_then(|handle| handle.join().ok());
    let stats = stats.unwrap_or_default();
    log_stats(&stats);

    audit(
        AuditEventType::SystemShutdown,
        serde_json::json!({
            "frames_decoded": stats.frames_decoded,
            "decode_errors": stats.decode_errors,
            "io_errors": stats.io_errors,
        }),
    );
    Ok(())
}

/// Reads operator lines until quit, end of input or the run deadline.
///
/// With a deadline set, end of input does not end the session.
fn run_session(session: &Session, run_seconds: Option<u64>) {
    let deadline = run_seconds.map(|secs| {
        info!(seconds = secs, "Running for limited duration");
        Instant::now() + Duration::from_secs(secs)
    });
    let lines = spawn_stdin_reader();
    let mut input_open = true;

    loop {
        let wait = match deadline {
            Some(deadline) => match deadline.checked_duration_since(Instant::now()) {
                Some(remaining) => remaining,
                None => break,
            },
            None => Duration::from_secs(3600),
        };

        if !input_open {
            thread::sleep(wait);
            continue;
        }

        match lines.recv_timeout(wait) {
            Ok(line) => match parse_action(&line) {
                Ok(action) => match session.handle(action) {
                    Flow::Reply(text) => print_reply(&text),
                    Flow::Quit => break,
                },
                Err(e) => print_reply(&format!("error: {e}")),
            },
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                if deadline.is_none() {
                    break;
                }
                input_open = false;
            }
        }
    }
}

fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
    if let Err(e) = spawned {
        warn!(error = %e, "Failed to start input reader");
    }
    rx
}

fn print_reply(text: &str) {
    if text.is_empty() {
        return;
    }
    let mut out = io::stdout().lock();
    let _ = writeln!(out, "{text}");
    let _ = out.flush();
}

fn log_stats(stats: &IngestStats) {
    info!(
        lines_read = stats.lines_read,
        frames_decoded = stats.frames_decoded,
        lines_ignored = stats.lines_ignored,
        decode_errors = stats.decode_errors,
        read_timeouts = stats.read_timeouts,
        io_errors = stats.io_errors,
        "Run complete"
    );
}

fn init_audit_logger(
    audit_path: Option<&PathBuf>,
) -> Result<Option<Arc<AuditLogger>>, AppError> {
    audit_path
        .map(|path| match AuditLogger::new(path) {
            Ok(logger) => {
                info!(path = %path.display(), "Audit logging enabled");
                Ok(Arc::new(logger))
            }
            Err(source) => Err(AppError::Audit {
                path: path.display().to_string(),
                source,
            }),
        })
        .transpose()
}

//! Prometheus metrics for the console's link and ingestion path.

use motor_core::tags;
use prometheus::core::Collector;
use prometheus::{Encoder, Gauge, IntCounter, Registry, TextEncoder};
use std::sync::LazyLock;
use std::thread;
use tiny_http::{Response, Server};

/// Global metrics registry
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

fn register<C: Collector + Clone + 'static>(collector: C) -> C {
    REGISTRY
        .register(Box::new(collector.clone()))
        .expect("metric names are unique");
    collector
}

fn counter(name: &str, help: &str) -> IntCounter {
    register(IntCounter::new(name, help).expect("valid counter definition"))
}

fn gauge(name: &str, help: &str) -> Gauge {
    register(Gauge::new(name, help).expect("valid gauge definition"))
}

// ============================================================================
// Ingestion
// ============================================================================

pub static FRAMES_DECODED: LazyLock<IntCounter> = LazyLock::new(|| {
    counter(
        "motor_console_frames_decoded_total",
        "Telemetry frames decoded and stored",
    )
});

pub static LINES_IGNORED: LazyLock<IntCounter> = LazyLock::new(|| {
    counter(
        "motor_console_lines_ignored_total",
        "Inbound lines that were not telemetry frames",
    )
});

pub static DECODE_ERRORS: LazyLock<IntCounter> = LazyLock::new(|| {
    counter(
        "motor_console_decode_errors_total",
        "Malformed telemetry frames dropped",
    )
});

pub static READ_TIMEOUTS: LazyLock<IntCounter> = LazyLock::new(|| {
    counter(
        "motor_console_read_timeouts_total",
        "Link reads that timed out without a line",
    )
});

pub static TRANSPORT_ERRORS: LazyLock<IntCounter> = LazyLock::new(|| {
    counter(
        "motor_console_transport_errors_total",
        "Link reads or writes that failed with an I/O error",
    )
});

// ============================================================================
// Commands
// ============================================================================

pub static COMMANDS_SENT: LazyLock<IntCounter> = LazyLock::new(|| {
    counter(
        "motor_console_commands_sent_total",
        "Commands written to the link",
    )
});

pub static COMMANDS_REJECTED: LazyLock<IntCounter> = LazyLock::new(|| {
    counter(
        "motor_console_commands_rejected_total",
        "Commands refused by input validation",
    )
});

// ============================================================================
// Process state
// ============================================================================

pub static MOTOR_RPM: LazyLock<Gauge> =
    LazyLock::new(|| gauge(tags::MOTOR_RPM.metric, "Latest measured motor speed"));

pub static SETPOINT_RPM: LazyLock<Gauge> =
    LazyLock::new(|| gauge(tags::SETPOINT_RPM.metric, "Latest controller setpoint"));

pub static DEVICE_TIME_S: LazyLock<Gauge> = LazyLock::new(|| {
    gauge(
        tags::DEVICE_TIME_S.metric,
        "Device timestamp of the latest frame in seconds",
    )
});

pub static WINDOW_LEN: LazyLock<Gauge> =
    LazyLock::new(|| gauge(tags::WINDOW_LEN.metric, "Samples held in the sliding window"));

/// Link status (1 = open, 0 = unavailable)
pub static LINK_OPEN: LazyLock<Gauge> =
    LazyLock::new(|| gauge(tags::LINK_OPEN.metric, "Link status (1=open, 0=unavailable)"));

// ============================================================================
// Metrics HTTP Server
// ============================================================================

/// Start the metrics HTTP server on the given address.
/// Returns a join handle for the server thread.
pub fn serve_metrics(bind_addr: String) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let server = match Server::http(&bind_addr) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("Failed to start metrics server on {}: {}", bind_addr, e);
                return;
            }
        };

        tracing::info!("Metrics server listening on http://{}/metrics", bind_addr);

        for request in server.incoming_requests() {
            let response = match request.url() {
                "/metrics" => {
                    let mut buffer = Vec::new();
                    match TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer) {
                        Ok(()) => Response::from_data(buffer).with_header(text_plain()),
                        Err(e) => {
                            tracing::warn!("Failed to encode metrics: {}", e);
                            Response::from_string("Internal Server Error").with_status_code(500)
                        }
                    }
                }
                "/health" => Response::from_string("OK"),
                // Ready once telemetry has arrived
                "/ready" if FRAMES_DECODED.get() > 0 => Response::from_string("Ready"),
                "/ready" => Response::from_string("Not Ready").with_status_code(503),
                _ => Response::from_string("Not Found").with_status_code(404),
            };
            let _ = request.respond(response);
        }
    })
}

fn text_plain() -> tiny_http::Header {
    tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"text/plain; version=0.0.4"[..])
        .expect("static header is valid ASCII")
}

/// Initialize all metrics (forces lazy initialization)
pub fn init_metrics() {
    let _ = FRAMES_DECODED.get();
    let _ = LINES_IGNORED.get();
    let _ = DECODE_ERRORS.get();
    let _ = READ_TIMEOUTS.get();
    let _ = TRANSPORT_ERRORS.get();
    let _ = COMMANDS_SENT.get();
    let _ = COMMANDS_REJECTED.get();
    let _ = MOTOR_RPM.get();
    let _ = SETPOINT_RPM.get();
    let _ = DEVICE_TIME_S.get();
    let _ = WINDOW_LEN.get();
    let _ = LINK_OPEN.get();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_exposes_link_metrics() {
        init_metrics();
        COMMANDS_SENT.inc();
        let names: Vec<String> = REGISTRY
            .gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();
        assert!(names.iter().any(|n| n == "motor_console_commands_sent_total"));
        assert!(names.iter().any(|n| n == tags::MOTOR_RPM.metric));
    }
}

use crate::metrics::{
    DECODE_ERRORS, DEVICE_TIME_S, FRAMES_DECODED, LINES_IGNORED, MOTOR_RPM, READ_TIMEOUTS,
    SETPOINT_RPM, TRANSPORT_ERRORS, WINDOW_LEN,
};
use crate::protocol::decode_line;
use crate::transport::{Transport, TransportError};
use motor_core::{TelemetrySample, WindowSnapshot, WindowStore};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Receives the window after every stored sample.
///
/// Called on the ingestion thread with no lock held; implementations own
/// all rendering.
pub trait DisplaySink: Send {
    fn on_sample(&mut self, latest: &TelemetrySample, window: &WindowSnapshot);
}

impl<F> DisplaySink for F
where
    F: FnMut(&TelemetrySample, &WindowSnapshot) + Send,
{
    fn on_sample(&mut self, latest: &TelemetrySample, window: &WindowSnapshot) {
        self(latest, window)
    }
}

#[derive(Clone, Debug)]
pub struct IngestConfig {
    /// Pause after a read that produced no line.
    pub poll_interval: Duration,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IngestState {
    #[default]
    Idle,
    Running,
}

#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct IngestStats {
    pub lines_read: u64,
    pub frames_decoded: u64,
    pub lines_ignored: u64,
    pub decode_errors: u64,
    pub read_timeouts: u64,
    pub io_errors: u64,
}

/// Reads the link, decodes telemetry and feeds the window store.
///
/// The only reader of the transport. Decode and I/O failures are logged
/// and counted; the loop keeps going until `stop` is raised.
pub struct IngestLoop<S: DisplaySink> {
    transport: Arc<Transport>,
    store: Arc<WindowStore>,
    sink: S,
    config: IngestConfig,
    state: IngestState,
    stats: IngestStats,
}

impl<S: DisplaySink> IngestLoop<S> {
    pub fn new(
        transport: Arc<Transport>,
        store: Arc<WindowStore>,
        sink: S,
        config: IngestConfig,
    ) -> Self {
        Self {
            transport,
            store,
            sink,
            config,
            state: IngestState::Idle,
            stats: IngestStats::default(),
        }
    }

    pub fn run(&mut self, stop: &AtomicBool) {
        self.state = IngestState::Running;
        info!(
            link = %self.transport.describe(),
            window = self.store.capacity(),
            poll_ms = self.config.poll_interval.as_millis() as u64,
            "Ingestion running"
        );

        while !stop.load(Ordering::Relaxed) {
            match self.transport.read_line() {
                Ok(Some(line)) => self.handle_line(&line),
                Ok(None) => {
                    self.stats.read_timeouts += 1;
                    READ_TIMEOUTS.inc();
                    thread::sleep(self.config.poll_interval);
                }
                Err(TransportError::Unavailable { reason }) => {
                    warn!(%reason, "Link unavailable, ingestion stopping");
                    break;
                }
                Err(e) => {
                    self.stats.io_errors += 1;
                    TRANSPORT_ERRORS.inc();
                    warn!(error = %e, "Link read failed");
                    thread::sleep(self.config.poll_interval);
                }
            }
        }

        debug!(stats = ?self.stats, "Ingestion stopped");
    }

    fn handle_line(&mut self, line: &str) {
        self.stats.lines_read += 1;
        match decode_line(line) {
            Ok(Some(sample)) => self.store_sample(sample),
            Ok(None) => {
                self.stats.lines_ignored += 1;
                LINES_IGNORED.inc();
                trace!(line, "Device output");
            }
            Err(e) => {
                self.stats.decode_errors += 1;
                DECODE_ERRORS.inc();
                warn!(error = %e, "Dropping malformed frame");
            }
        }
    }

    fn store_sample(&mut self, sample: TelemetrySample) {
        self.store.append(sample);
        self.stats.frames_decoded += 1;

        FRAMES_DECODED.inc();
        DEVICE_TIME_S.set(sample.timestamp_s());
        MOTOR_RPM.set(sample.rpm());
        SETPOINT_RPM.set(sample.setpoint());

        let window = self.store.snapshot();
        WINDOW_LEN.set(window.len() as f64);
        self.sink.on_sample(&sample, &window);
    }

    pub fn state(&self) -> IngestState {
        self.state
    }

    pub fn stats(&self) -> &IngestStats {
        &self.stats
    }
}

/// Starts ingestion on its own thread.
///
/// Refuses to start when the link is unavailable. The thread returns its
/// statistics once `stop` is raised.
pub fn spawn_ingest<S: DisplaySink + 'static>(
    transport: Arc<Transport>,
    store: Arc<WindowStore>,
    sink: S,
    config: IngestConfig,
    stop: Arc<AtomicBool>,
) -> Result<thread::JoinHandle<IngestStats>, TransportError> {
    if !transport.state().is_open() {
        return Err(TransportError::Unavailable {
            reason: transport.describe().to_string(),
        });
    }

    let mut ingest = IngestLoop::new(transport, store, sink, config);
    thread::Builder::new()
        .name("ingest".to_string())
        .spawn(move || {
            ingest.run(&stop);
            ingest.stats().clone()
        })
        .map_err(|e| TransportError::Io(e.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use motor_core::{Link, LinkError};
    use std::collections::VecDeque;

    type Reply = Result<Option<String>, LinkError>;

    struct ScriptedLink {
        inbound: VecDeque<Reply>,
        stop: Arc<AtomicBool>,
    }

    impl Link for ScriptedLink {
        fn write_line(&mut self, _line: &str) -> Result<(), LinkError> {
            Ok(())
        }

        fn read_line(&mut self) -> Reply {
            match self.inbound.pop_front() {
                Some(item) => item,
                None => {
                    self.stop.store(true, Ordering::Relaxed);
                    Ok(None)
                }
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn run_script(lines: Vec<Reply>) -> (IngestStats, Arc<WindowStore>, usize) {
        let stop = Arc::new(AtomicBool::new(false));
        let link = ScriptedLink {
            inbound: lines.into(),
            stop: Arc::clone(&stop),
        };
        let transport = Arc::new(Transport::with_link(link));
        let store = Arc::new(WindowStore::new(3));
        let mut notified = 0usize;
        let config = IngestConfig {
            poll_interval: Duration::ZERO,
        };
        let stats = {
            let sink = |_: &TelemetrySample, window: &WindowSnapshot| {
                assert!(window.len() <= 3);
                notified += 1;
            };
            let mut ingest = IngestLoop::new(transport, Arc::clone(&store), sink, config);
            assert_eq!(ingest.state(), IngestState::Idle);
            ingest.run(&stop);
            assert_eq!(ingest.state(), IngestState::Running);
            ingest.stats().clone()
        };
        (stats, store, notified)
    }

    fn line(text: &str) -> Reply {
        Ok(Some(text.to_string()))
    }

    #[test]
    fn stores_frames_and_skips_noise() {
        let (stats, store, notified) = run_script(vec![
            line("System ready."),
            line("DATA:0.1,10,100"),
            line("DATA:0.2,oops,100"),
            Ok(None),
            line("DATA:0.3,30"),
            Err(LinkError::Io(std::io::Error::other("framing error"))),
            line("DATA:0.4,40,100"),
        ]);

        assert_eq!(stats.lines_read, 5);
        assert_eq!(stats.frames_decoded, 2);
        assert_eq!(stats.lines_ignored, 1);
        assert_eq!(stats.decode_errors, 2);
        assert_eq!(stats.io_errors, 1);
        // one scripted timeout plus the final one raising stop
        assert_eq!(stats.read_timeouts, 2);
        assert_eq!(notified, 2);
        assert_eq!(store.snapshot().rpm, vec![10.0, 40.0]);
    }

    #[test]
    fn window_evicts_during_ingest() {
        let frames = (0..5).map(|i| line(&format!("DATA:{i},{i},0"))).collect();
        let (stats, store, notified) = run_script(frames);
        assert_eq!(stats.frames_decoded, 5);
        assert_eq!(notified, 5);
        assert_eq!(store.snapshot().timestamps, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn refuses_to_start_without_link() {
        let transport = Arc::new(Transport::unavailable("port busy"));
        let store = Arc::new(WindowStore::default());
        let stop = Arc::new(AtomicBool::new(false));
        let sink = |_: &TelemetrySample, _: &WindowSnapshot| {};
        let res = spawn_ingest(transport, store, sink, IngestConfig::default(), stop);
        assert!(matches!(res, Err(TransportError::Unavailable { .. })));
    }
}

pub mod commander;
pub mod ingest;
pub mod metrics;
pub mod protocol;
pub mod serial;
pub mod transport;

pub use commander::{CommandError, Commander, SentCommand};
pub use ingest::{spawn_ingest, DisplaySink, IngestConfig, IngestLoop, IngestState, IngestStats};
pub use metrics::{init_metrics, serve_metrics};
pub use protocol::{decode_line, encode_motor, encode_pid, DecodeError, FRAME_PREFIX};
pub use serial::{available_ports, SerialConfig, SerialLink};
pub use transport::{Transport, TransportError};

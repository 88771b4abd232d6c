//! Serial port link to the motor controller.

use motor_core::{Link, LinkError};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{Read, Write};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Longest line kept while waiting for a terminator.
const MAX_LINE_LEN: usize = 4096;

#[derive(Debug, Clone)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
    pub read_timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_port().to_string(),
            baud_rate: 9600,
            read_timeout: Duration::from_secs(1),
        }
    }
}

fn default_port() -> &'static str {
    if cfg!(windows) {
        "COM7"
    } else {
        "/dev/ttyACM0"
    }
}

/// Reassembles newline-terminated lines from raw serial chunks.
///
/// Bytes after the last terminator stay pending until a later chunk
/// completes them. A run of more than `MAX_LINE_LEN` bytes without a
/// terminator is dropped.
#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Appends a chunk. Returns the number of bytes discarded, if any.
    pub(crate) fn extend(&mut self, chunk: &[u8]) -> usize {
        self.pending.extend_from_slice(chunk);
        let unterminated = match self.pending.iter().rposition(|b| *b == b'\n') {
            Some(pos) => self.pending.len() - pos - 1,
            None => self.pending.len(),
        };
        if unterminated > MAX_LINE_LEN {
            let keep = self.pending.len() - unterminated;
            self.pending.truncate(keep);
            unterminated
        } else {
            0
        }
    }

    /// Next complete line, without its `\n` or `\r\n`.
    pub(crate) fn next_line(&mut self) -> Option<String> {
        let pos = self.pending.iter().position(|b| *b == b'\n')?;
        let raw: Vec<u8> = self.pending.drain(..=pos).collect();
        let text = String::from_utf8_lossy(&raw);
        Some(text.trim_end_matches(['\r', '\n']).to_string())
    }

    pub(crate) fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Newline-framed link over a serial port (8N1, no flow control).
pub struct SerialLink {
    port: Box<dyn SerialPort>,
    name: String,
    read_timeout: Duration,
    lines: LineBuffer,
}

impl SerialLink {
    pub fn open(config: &SerialConfig) -> Result<Self, serialport::Error> {
        let port = serialport::new(&config.port, config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(config.read_timeout)
            .open()?;

        info!(
            port = %config.port,
            baud = config.baud_rate,
            timeout_ms = config.read_timeout.as_millis() as u64,
            "Serial port opened"
        );

        Ok(Self {
            port,
            name: config.port.clone(),
            read_timeout: config.read_timeout,
            lines: LineBuffer::default(),
        })
    }
}

impl Link for SerialLink {
    fn write_line(&mut self, line: &str) -> Result<(), LinkError> {
        let mut frame = Vec::with_capacity(line.len() + 1);
        frame.extend_from_slice(line.as_bytes());
        frame.push(b'\n');
        self.port.write_all(&frame)?;
        self.port.flush()?;
        Ok(())
    }

    fn read_line(&mut self) -> Result<Option<String>, LinkError> {
        if let Some(line) = self.lines.next_line() {
            return Ok(Some(line));
        }

        let deadline = Instant::now() + self.read_timeout;
        let mut chunk = [0u8; 256];
        loop {
            match self.port.read(&mut chunk) {
                Ok(0) => return Ok(None),
                Ok(n) => {
                    let dropped = self.lines.extend(&chunk[..n]);
                    if dropped > 0 {
                        warn!(port = %self.name, bytes = dropped, "Discarding unterminated input");
                    }
                    if let Some(line) = self.lines.next_line() {
                        return Ok(Some(line));
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => return Ok(None),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
            if Instant::now() >= deadline {
                let held = self.lines.pending_len();
                if held > 0 {
                    debug!(port = %self.name, bytes = held, "Partial line held");
                }
                return Ok(None);
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// One enumerated serial port.
#[derive(Debug, Clone)]
pub struct PortInfo {
    pub name: String,
    pub description: String,
}

pub fn available_ports() -> Vec<PortInfo> {
    match serialport::available_ports() {
        Ok(ports) => ports
            .into_iter()
            .map(|p| {
                let description = match p.port_type {
                    serialport::SerialPortType::UsbPort(usb) => format!(
                        "USB {:04x}:{:04x} {}",
                        usb.vid,
                        usb.pid,
                        usb.product.unwrap_or_default()
                    ),
                    serialport::SerialPortType::BluetoothPort => "Bluetooth".to_string(),
                    serialport::SerialPortType::PciPort => "PCI".to_string(),
                    serialport::SerialPortType::Unknown => String::new(),
                };
                PortInfo {
                    name: p.port_name,
                    description,
                }
            })
            .collect(),
        Err(e) => {
            debug!(error = %e, "Serial port enumeration failed");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_line_completes_on_next_chunk() {
        let mut lines = LineBuffer::default();
        assert_eq!(lines.extend(b"DATA:1.0,15"), 0);
        assert_eq!(lines.next_line(), None);
        assert_eq!(lines.pending_len(), 11);

        lines.extend(b"00,1500\nDATA:1.1");
        assert_eq!(lines.next_line().as_deref(), Some("DATA:1.0,1500,1500"));
        assert_eq!(lines.next_line(), None);

        lines.extend(b",1,2\n");
        assert_eq!(lines.next_line().as_deref(), Some("DATA:1.1,1,2"));
        assert_eq!(lines.pending_len(), 0);
    }

    #[test]
    fn strips_crlf_and_splits_chunks() {
        let mut lines = LineBuffer::default();
        lines.extend(b"System ready.\r\nDATA:0.1,0,0\r\n\n");
        assert_eq!(lines.next_line().as_deref(), Some("System ready."));
        assert_eq!(lines.next_line().as_deref(), Some("DATA:0.1,0,0"));
        assert_eq!(lines.next_line().as_deref(), Some(""));
        assert_eq!(lines.next_line(), None);
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let mut lines = LineBuffer::default();
        lines.extend(b"DATA:\xff1,2,3\n");
        assert_eq!(lines.next_line().as_deref(), Some("DATA:\u{FFFD}1,2,3"));
    }

    #[test]
    fn overlong_unterminated_input_is_dropped() {
        let mut lines = LineBuffer::default();
        lines.extend(b"DATA:1,2,3\n");
        let noise = vec![b'x'; MAX_LINE_LEN + 1];
        assert_eq!(lines.extend(&noise), MAX_LINE_LEN + 1);
        // complete lines ahead of the noise survive
        assert_eq!(lines.next_line().as_deref(), Some("DATA:1,2,3"));
        assert_eq!(lines.pending_len(), 0);

        lines.extend(b"DATA:4,5,6\n");
        assert_eq!(lines.next_line().as_deref(), Some("DATA:4,5,6"));
    }

    #[test]
    fn line_at_limit_is_kept() {
        let mut lines = LineBuffer::default();
        let body = vec![b'7'; MAX_LINE_LEN];
        assert_eq!(lines.extend(&body), 0);
        lines.extend(b"\n");
        assert_eq!(lines.next_line().map(|l| l.len()), Some(MAX_LINE_LEN));
    }
}

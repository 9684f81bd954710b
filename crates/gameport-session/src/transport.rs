use std::io::{self, BufRead, BufReader, Read};

use serialport::{SerialPort, SerialPortType};

use crate::config::SessionConfig;
use crate::error::TransportError;

/// Longest line kept in the buffer before it is handed over as is.
const MAX_LINE_LEN: usize = 256;

/// Source of newline terminated telemetry lines.
pub trait Transport: Send {
    /// Read one line including its terminator.
    ///
    /// Returns `Ok(None)` when nothing complete arrived within the read
    /// timeout. That is not an error.
    fn read_line(&mut self) -> Result<Option<Vec<u8>>, TransportError>;
}

/// Opens transports by port name.
pub trait Connector: Send + Sync {
    fn open(
        &self,
        port: &str,
        config: &SessionConfig,
    ) -> Result<Box<dyn Transport>, TransportError>;
}

/// [`Connector`] for real serial ports.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialConnector;

impl Connector for SerialConnector {
    fn open(
        &self,
        port: &str,
        config: &SessionConfig,
    ) -> Result<Box<dyn Transport>, TransportError> {
        let serial = serialport::new(port, config.baud_rate)
            .timeout(config.read_timeout)
            .open()
            .map_err(|e| TransportError::Open {
                port: port.to_owned(),
                source: e.into(),
            })?;
        log::debug!("opened {port} at {} baud", config.baud_rate);
        Ok(Box::new(SerialTransport::new(serial)))
    }
}

/// Line reader over an open serial port.
///
/// Bytes of a line split by a read timeout are kept until the rest arrives.
/// Each call consumes at most one buffered chunk, so a port that never sends
/// a newline cannot keep the caller inside `read_line`. A line reaching
/// `MAX_LINE_LEN` bytes is handed over as is and the rest of it, up to the
/// next newline, is dropped.
pub struct SerialTransport<R = Box<dyn SerialPort>> {
    reader: BufReader<R>,
    pending: Vec<u8>,
    discarding: bool,
}

impl<R: Read> SerialTransport<R> {
    pub fn new(port: R) -> Self {
        Self {
            reader: BufReader::new(port),
            pending: Vec::with_capacity(64),
            discarding: false,
        }
    }
}

impl<R: Read + Send> Transport for SerialTransport<R> {
    fn read_line(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        let available = match self.reader.fill_buf() {
            Ok([]) => return Err(TransportError::Closed),
            Ok(available) => available,
            Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::Interrupted) => {
                return Ok(None);
            }
            Err(e) => return Err(TransportError::Read(e)),
        };
        let newline = available.iter().position(|&b| b == b'\n');

        if self.discarding {
            let used = newline.map_or(available.len(), |i| i + 1);
            self.discarding = newline.is_none();
            self.reader.consume(used);
            return Ok(None);
        }

        let room = MAX_LINE_LEN - self.pending.len();
        let (used, complete) = match newline {
            Some(i) if i < room => (i + 1, true),
            _ => {
                let used = available.len().min(room);
                (used, used == room)
            }
        };
        self.pending.extend_from_slice(&available[..used]);
        self.reader.consume(used);

        if !complete {
            return Ok(None);
        }
        if !self.pending.ends_with(b"\n") {
            self.discarding = true;
        }
        Ok(Some(std::mem::take(&mut self.pending)))
    }
}

/// A serial port available on this machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub name: String,
    /// USB product string, when known.
    pub product: Option<String>,
}

/// List serial ports available on this machine.
pub fn list_ports() -> Result<Vec<PortInfo>, TransportError> {
    let ports = serialport::available_ports()
        .map_err(|e| TransportError::Enumerate(e.into()))?;
    Ok(ports
        .into_iter()
        .map(|port| PortInfo {
            product: match port.port_type {
                SerialPortType::UsbPort(usb) => usb.product,
                _ => None,
            },
            name: port.port_name,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;

    /// Reader replaying scripted chunks, then timing out forever.
    struct Script(VecDeque<io::Result<Vec<u8>>>);

    impl Script {
        fn new(steps: impl IntoIterator<Item = io::Result<&'static [u8]>>) -> Self {
            Self(steps.into_iter().map(|s| s.map(<[u8]>::to_vec)).collect())
        }
    }

    impl Read for Script {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.pop_front() {
                Some(Ok(mut chunk)) => {
                    let len = chunk.len().min(buf.len());
                    buf[..len].copy_from_slice(&chunk[..len]);
                    if len < chunk.len() {
                        self.0.push_front(Ok(chunk.split_off(len)));
                    }
                    Ok(len)
                }
                Some(Err(e)) => Err(e),
                None => Err(io::ErrorKind::TimedOut.into()),
            }
        }
    }

    /// Reader that never stops sending the same byte.
    struct Flood(u8);

    impl Read for Flood {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            buf.fill(self.0);
            Ok(buf.len())
        }
    }

    fn timeout() -> io::Result<&'static [u8]> {
        Err(io::ErrorKind::TimedOut.into())
    }

    #[test]
    fn partial_line_is_completed_after_timeout() {
        let mut transport = SerialTransport::new(Script::new([
            Ok(&b"512,512"[..]),
            timeout(),
            Ok(&b",0\r\n"[..]),
        ]));
        assert_eq!(transport.read_line().unwrap(), None);
        assert_eq!(transport.read_line().unwrap(), None);
        assert_eq!(
            transport.read_line().unwrap(),
            Some(b"512,512,0\r\n".to_vec())
        );
        assert_eq!(transport.read_line().unwrap(), None);
    }

    #[test]
    fn lines_from_one_chunk_are_returned_one_by_one() {
        let mut transport = SerialTransport::new(Script::new([Ok(&b"a\nb\n"[..])]));
        assert_eq!(transport.read_line().unwrap(), Some(b"a\n".to_vec()));
        assert_eq!(transport.read_line().unwrap(), Some(b"b\n".to_vec()));
        assert_eq!(transport.read_line().unwrap(), None);
    }

    #[test]
    fn endless_line_is_cut_at_max_len() {
        let mut transport = SerialTransport::new(Flood(b'x'));
        let line = transport
            .read_line()
            .unwrap()
            .expect("full buffer should be handed over");
        assert_eq!(line.len(), MAX_LINE_LEN);

        for _ in 0..1000 {
            assert_eq!(transport.read_line().unwrap(), None);
            assert!(transport.pending.is_empty());
        }
    }

    #[test]
    fn rest_of_long_line_is_dropped() {
        let long: &'static [u8] = vec![b'9'; MAX_LINE_LEN + 40].leak();
        let mut transport =
            SerialTransport::new(Script::new([Ok(long), Ok(&b"\n1,2\n"[..])]));

        let first = transport.read_line().unwrap().expect("cut line");
        assert_eq!(first.len(), MAX_LINE_LEN);
        while transport.discarding {
            assert_eq!(transport.read_line().unwrap(), None);
        }
        assert_eq!(transport.read_line().unwrap(), Some(b"1,2\n".to_vec()));
    }

    #[test]
    fn end_of_stream_is_closed() {
        let mut transport = SerialTransport::new(Script::new([Ok(&b""[..])]));
        assert!(matches!(transport.read_line(), Err(TransportError::Closed)));
    }

    #[test]
    fn read_errors_are_reported() {
        let mut transport =
            SerialTransport::new(Script::new([Err(io::Error::other("unplugged"))]));
        assert!(matches!(transport.read_line(), Err(TransportError::Read(_))));
    }

    #[test]
    #[ignore] // Requires a serial port (run with: cargo test -- --ignored)
    fn lists_ports() {
        let ports = list_ports().expect("ports should be listed");
        assert!(!ports.is_empty());
    }

    #[test]
    fn opening_missing_port_fails() {
        let result = SerialConnector.open("/dev/gameport-missing", &SessionConfig::default());
        assert!(matches!(result, Err(TransportError::Open { .. })));
    }
}

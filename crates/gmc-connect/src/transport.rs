//! Serial transport
//!
//! [`Transport`] is the seam between the protocol client and the physical
//! line; [`SerialLink`] is the real implementation, and tests substitute an
//! in-memory one. The three read primitives mirror the three reply
//! disciplines the protocol needs: settle-and-drain for replies with no
//! documented length, terminator-bounded for text, and size-bounded for
//! binary payloads. A size-bounded read never stops early on a terminator
//! byte, so binary payloads that happen to contain `0x0A` come through
//! intact.

use std::io::{Read, Write};
use std::time::{Duration, Instant};

use serialport::{ClearBuffer, SerialPort};
use tracing::{debug, trace};

use crate::error::TransportError;

/// Default read timeout for a link
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default settle delay before a best-effort drain
///
/// Firmware does not flush replies atomically; 300 ms is enough for every
/// supported model to finish writing at every supported bit rate.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(300);

/// Byte-level access to a counter
///
/// The protocol has no correlation ids, so replies are only meaningful when
/// a single command is in flight. `&mut self` on every method makes that
/// exclusivity explicit in the type system.
pub trait Transport {
    /// Write all bytes, then flush; a short write is an error
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Sleep for `settle`, then drain whatever the device has queued
    ///
    /// An empty result is not an error; callers that need bytes decide
    /// what emptiness means.
    fn read_available(&mut self, settle: Duration) -> Result<Vec<u8>, TransportError>;

    /// Read until `terminator` is seen (inclusive) or the link timeout
    /// elapses; on timeout whatever arrived is returned without the
    /// terminator
    fn read_until(&mut self, terminator: u8) -> Result<Vec<u8>, TransportError>;

    /// Read until exactly `size` bytes accumulate or the link timeout
    /// elapses; a short buffer is returned as-is and callers validate
    /// the length
    fn read_sized(&mut self, size: usize) -> Result<Vec<u8>, TransportError>;

    /// Discard everything queued in both directions
    fn reset_buffers(&mut self) -> Result<(), TransportError>;

    /// Close the line; idempotent
    fn close(&mut self);

    /// Whether the line is currently open
    fn is_open(&self) -> bool;
}

/// A serial line bound to one endpoint at one bit rate
pub struct SerialLink {
    port: Option<Box<dyn SerialPort>>,
    path: String,
    baud: u32,
    timeout: Duration,
}

impl SerialLink {
    /// Open an endpoint; `timeout` bounds every subsequent blocking read
    pub fn open(path: &str, baud: u32, timeout: Duration) -> Result<Self, TransportError> {
        debug!("opening {} at {} baud", path, baud);
        let port = serialport::new(path, baud)
            .timeout(timeout)
            .open()
            .map_err(|source| TransportError::Open {
                port: path.to_string(),
                source,
            })?;
        Ok(Self {
            port: Some(port),
            path: path.to_string(),
            baud,
            timeout,
        })
    }

    /// Endpoint path this link was opened on
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Bit rate this link was opened at
    pub fn baud(&self) -> u32 {
        self.baud
    }

    /// Read timeout applied to bounded reads
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn port_mut(&mut self) -> Result<&mut Box<dyn SerialPort>, TransportError> {
        self.port.as_mut().ok_or(TransportError::NotOpen)
    }
}

impl Transport for SerialLink {
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        trace!("write {:02X?}", bytes);
        let port = self.port_mut()?;
        port.write_all(bytes)?;
        port.flush()?;
        Ok(())
    }

    fn read_available(&mut self, settle: Duration) -> Result<Vec<u8>, TransportError> {
        std::thread::sleep(settle);
        let port = self.port_mut()?;
        let waiting = port.bytes_to_read()? as usize;
        if waiting == 0 {
            trace!("read_available: nothing queued");
            return Ok(Vec::new());
        }
        let mut buf = vec![0u8; waiting];
        port.read_exact(&mut buf)?;
        trace!("read_available: drained {} byte(s)", buf.len());
        Ok(buf)
    }

    fn read_until(&mut self, terminator: u8) -> Result<Vec<u8>, TransportError> {
        let deadline = Instant::now() + self.timeout;
        let port = self.port_mut()?;
        let mut out = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match port.read(&mut byte) {
                // 0 bytes from a serial read means the line went away
                Ok(0) => break,
                Ok(_) => {
                    out.push(byte[0]);
                    if byte[0] == terminator {
                        break;
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => break,
                Err(e) => return Err(e.into()),
            }
            if Instant::now() >= deadline {
                trace!("read_until: deadline hit with {} byte(s)", out.len());
                break;
            }
        }
        Ok(out)
    }

    fn read_sized(&mut self, size: usize) -> Result<Vec<u8>, TransportError> {
        let deadline = Instant::now() + self.timeout;
        let port = self.port_mut()?;
        let mut out = Vec::with_capacity(size);
        let mut chunk = [0u8; 64];
        while out.len() < size {
            let want = (size - out.len()).min(chunk.len());
            match port.read(&mut chunk[..want]) {
                Ok(0) => break,
                Ok(n) => out.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => break,
                Err(e) => return Err(e.into()),
            }
            if Instant::now() >= deadline {
                break;
            }
        }
        trace!("read_sized: wanted {}, got {}", size, out.len());
        Ok(out)
    }

    fn reset_buffers(&mut self) -> Result<(), TransportError> {
        debug!("resetting serial buffers");
        self.port_mut()?.clear(ClearBuffer::All)?;
        Ok(())
    }

    fn close(&mut self) {
        if let Some(port) = self.port.take() {
            debug!("closing {}", self.path);
            drop(port);
        }
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }
}

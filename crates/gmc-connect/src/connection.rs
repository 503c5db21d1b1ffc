//! Connection layer
//!
//! A [`Connection`] owns one transport and applies the request/reply
//! discipline: write the encoded command, then read according to the
//! command's declared reply shape. Callers never touch the read primitives
//! directly for command traffic, so the discipline cannot drift per call
//! site.

use std::time::Duration;

use gmc_protocol::{DeviceCommand, ReplyShape};
use tracing::{debug, trace};

use crate::error::TransportError;
use crate::transport::{Transport, DEFAULT_SETTLE};

/// An exclusive connection to one counter
///
/// Owns the transport for its whole lifetime. Operations are strictly
/// sequential; the protocol carries no correlation ids, so interleaving
/// commands would pair replies with the wrong requests.
#[derive(Debug)]
pub struct Connection<T: Transport> {
    transport: T,
    settle: Duration,
}

impl<T: Transport> Connection<T> {
    /// Wrap an open transport
    ///
    /// This is also the bring-your-own-port path: any [`Transport`]
    /// implementation works, already configured however the caller wants.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            settle: DEFAULT_SETTLE,
        }
    }

    /// Change the settle delay used for best-effort reads
    pub fn set_settle(&mut self, settle: Duration) {
        self.settle = settle;
    }

    /// Issue one command and collect its reply per the declared shape
    ///
    /// Fire-and-forget commands return an empty buffer immediately.
    /// Size-bounded replies may come back short on timeout; decoders
    /// validate the length.
    pub fn issue(&mut self, command: &DeviceCommand) -> Result<Vec<u8>, TransportError> {
        trace!("issue {:?}", command);
        self.transport.write(&command.encode())?;
        match command.reply_shape() {
            ReplyShape::None => Ok(Vec::new()),
            ReplyShape::Settle => self.transport.read_available(self.settle),
            ReplyShape::Exact(size) => self.transport.read_sized(size),
        }
    }

    /// Serial-number self-test
    ///
    /// Resets buffers, asks for the serial number, and treats any
    /// non-empty reply as confirmation of a protocol partner. Heuristic
    /// only: the protocol has no real handshake. An empty reply is
    /// `Ok(false)`, not an error.
    pub fn verify(&mut self) -> Result<bool, TransportError> {
        self.transport.reset_buffers()?;
        let reply = self.issue(&DeviceCommand::SerialNumber)?;
        debug!("self-test reply: {} byte(s)", reply.len());
        Ok(!reply.is_empty())
    }

    /// Discard anything queued in both directions
    pub fn reset_buffers(&mut self) -> Result<(), TransportError> {
        self.transport.reset_buffers()
    }

    /// Close the underlying line; idempotent
    pub fn close(&mut self) {
        self.transport.close();
    }

    /// Whether the underlying line is open
    pub fn is_open(&self) -> bool {
        self.transport.is_open()
    }

    /// Direct transport access
    ///
    /// Heartbeat streaming reads raw samples between commands and needs
    /// the primitives, not the command discipline.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Give the transport back
    pub fn into_transport(self) -> T {
        self.transport
    }
}

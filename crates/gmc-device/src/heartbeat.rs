//! Heartbeat streaming
//!
//! With the heartbeat enabled, the counter pushes one count-per-second
//! sample every second without being asked. [`HeartbeatSamples`] pulls a
//! fixed number of them off the line; the sample width (2 or 4 bytes)
//! comes from the device's protocol revision.

use gmc_connect::Transport;
use gmc_protocol::decode;
use tracing::trace;

use crate::device::Device;
use crate::error::DeviceError;

/// Finite stream of per-second count samples
///
/// Yields at most the requested number of samples. The first error ends
/// the stream, and an ended stream stays ended.
pub struct HeartbeatSamples<'a, T: Transport> {
    device: &'a mut Device<T>,
    remaining: usize,
    done: bool,
}

impl<'a, T: Transport> HeartbeatSamples<'a, T> {
    pub(crate) fn new(device: &'a mut Device<T>, count: usize) -> Self {
        Self {
            device,
            remaining: count,
            done: false,
        }
    }

    /// Samples still to be pulled
    pub fn remaining(&self) -> usize {
        self.remaining
    }
}

impl<T: Transport> Iterator for HeartbeatSamples<'_, T> {
    type Item = Result<u32, DeviceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let sample_len = self.device.info().cps_sample_len;
        let raw = match self
            .device
            .connection_mut()
            .transport_mut()
            .read_sized(sample_len)
        {
            Ok(raw) => raw,
            Err(e) => {
                self.done = true;
                return Some(Err(e.into()));
            }
        };

        match decode::decode_cps_sample(&raw, sample_len) {
            Ok(sample) => {
                trace!("heartbeat sample: {} cps", sample);
                Some(Ok(sample))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e.into()))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            (0, Some(0))
        } else {
            // errors can end the stream early
            (0, Some(self.remaining))
        }
    }
}

//! Virtual counter simulation
//!
//! Provides a simulated counter that parses command frames as they are
//! written and queues protocol-accurate reply bytes, behind the same
//! transport seam the real serial link implements. Replies are queued
//! synchronously, so tests run without delays.

use std::collections::VecDeque;
use std::time::Duration;

use gmc_connect::{Transport, TransportError};
use gmc_protocol::command::REPLY_SENTINEL;
use gmc_protocol::decode::{encode_count, COUNT_LEN, CPS_RFC1201_MASK};
use gmc_protocol::{resolve_model, ModelInfo};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Longest plausible command frame; a longer run without a closing `>>`
/// is discarded as line noise
const MAX_FRAME: usize = 64;

/// Length of a complete history-read frame: `<SPIR` + 5 parameter bytes +
/// `>>`. The parameter bytes are binary and may themselves contain `>`,
/// so this frame cannot be scanned for its terminator.
const SPIR_FRAME_LEN: usize = 12;

/// Configuration for creating a virtual counter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualCounterConfig {
    /// Version string reported for `<GETVER>>`
    pub version: String,
    /// 7-byte factory serial number
    pub serial: [u8; 7],
    /// Battery voltage in tenths of a volt (48 reads back as "4.8v")
    pub voltage_tenths: u8,
    /// Counts per minute
    pub cpm: u32,
    /// Counts per second
    pub cps: u32,
    /// High-dose tube counts per minute
    pub cpm_high: u32,
    /// Low-dose tube counts per minute
    pub cpm_low: u32,
    /// Position reading (x, y, z)
    pub gyro: [i16; 3],
    /// Clock fields: year-2000, month, day, hour, minute, second
    pub datetime: [u8; 6],
    /// Configuration blob; empty means an all-zero blob of the model's size
    pub config_blob: Vec<u8>,
    /// History flash image; reads beyond it yield erased-flash `0xFF`
    pub history: Vec<u8>,
    /// CPS sequence cycled through while the heartbeat is on
    pub heartbeat_series: Vec<u32>,
}

impl Default for VirtualCounterConfig {
    fn default() -> Self {
        Self {
            version: "GMC-500+Re 2.40".to_string(),
            serial: [0xF4, 0x88, 0x00, 0x01, 0x23, 0x45, 0x67],
            voltage_tenths: 48,
            cpm: 28,
            cps: 1,
            cpm_high: 25,
            cpm_low: 3,
            gyro: [10, -10, 0],
            datetime: [23, 6, 15, 12, 30, 45],
            config_blob: Vec::new(),
            history: Vec::new(),
            heartbeat_series: vec![1, 2, 3, 2, 1],
        }
    }
}

/// A simulated counter that answers command frames protocol-accurately
#[derive(Debug)]
pub struct VirtualCounter {
    config: VirtualCounterConfig,
    open: bool,
    heartbeat: bool,
    heartbeat_index: usize,
    /// Written bytes not yet forming a complete frame
    inbox: Vec<u8>,
    /// Reply bytes waiting to be read, as one undifferentiated stream
    outbox: VecDeque<u8>,
    /// Complete frames parsed so far
    frames: Vec<Vec<u8>>,
    truncate_next: Option<usize>,
    silence_next: bool,
}

impl VirtualCounter {
    /// Create a virtual counter with default state (a GMC-500+)
    pub fn new() -> Self {
        Self::from_config(VirtualCounterConfig::default())
    }

    /// Create a virtual counter from configuration
    pub fn from_config(config: VirtualCounterConfig) -> Self {
        Self {
            config,
            open: true,
            heartbeat: false,
            heartbeat_index: 0,
            inbox: Vec::new(),
            outbox: VecDeque::new(),
            frames: Vec::new(),
            truncate_next: None,
            silence_next: false,
        }
    }

    /// Current configuration
    pub fn config(&self) -> &VirtualCounterConfig {
        &self.config
    }

    /// Mutate the configuration mid-test (e.g. to change the CPM value)
    pub fn config_mut(&mut self) -> &mut VirtualCounterConfig {
        &mut self.config
    }

    /// Whether the heartbeat push is currently enabled
    pub fn heartbeat_enabled(&self) -> bool {
        self.heartbeat
    }

    /// Complete command frames received so far
    pub fn frames_seen(&self) -> &[Vec<u8>] {
        &self.frames
    }

    /// Reply bytes currently queued for reading
    pub fn queued_reply_len(&self) -> usize {
        self.outbox.len()
    }

    /// Truncate the next queued reply to `keep` bytes
    pub fn truncate_next_reply(&mut self, keep: usize) {
        self.truncate_next = Some(keep);
    }

    /// Swallow the next reply entirely, simulating silent firmware
    pub fn silence_next_reply(&mut self) {
        self.silence_next = true;
    }

    fn model_info(&self) -> Option<&'static ModelInfo> {
        resolve_model(&self.config.version).ok()
    }

    fn cps_sample_len(&self) -> usize {
        self.model_info().map_or(COUNT_LEN, |info| info.cps_sample_len)
    }

    fn config_blob_len(&self) -> usize {
        self.model_info()
            .map_or(512, |info| info.config_layout.blob_len)
    }

    fn ensure_open(&self) -> Result<(), TransportError> {
        if self.open {
            Ok(())
        } else {
            Err(TransportError::NotOpen)
        }
    }

    fn queue_reply(&mut self, bytes: Vec<u8>) {
        if self.silence_next {
            self.silence_next = false;
            debug!("sim swallowing a {} byte reply", bytes.len());
            return;
        }
        let mut bytes = bytes;
        if let Some(keep) = self.truncate_next.take() {
            debug!("sim truncating reply from {} to {} byte(s)", bytes.len(), keep);
            bytes.truncate(keep);
        }
        self.outbox.extend(bytes);
    }

    fn drain(&mut self, size: usize) -> Vec<u8> {
        let take = size.min(self.outbox.len());
        self.outbox.drain(..take).collect()
    }

    fn synthesize_heartbeat_sample(&mut self) {
        let sample = if self.config.heartbeat_series.is_empty() {
            0
        } else {
            let index = self.heartbeat_index % self.config.heartbeat_series.len();
            self.config.heartbeat_series[index]
        };
        self.heartbeat_index += 1;
        let payload = match self.cps_sample_len() {
            2 => ((sample as u16) & CPS_RFC1201_MASK).to_be_bytes().to_vec(),
            _ => encode_count(sample).to_vec(),
        };
        trace!("sim heartbeat sample {} -> {:02X?}", sample, payload);
        self.queue_reply(payload);
    }

    /// Extract and handle every complete frame in the inbox
    fn pump_inbox(&mut self) {
        loop {
            let Some(start) = self.inbox.iter().position(|&b| b == b'<') else {
                self.inbox.clear();
                return;
            };
            if start > 0 {
                self.inbox.drain(..start);
            }

            if self.inbox.starts_with(b"<SPIR") {
                if self.inbox.len() < SPIR_FRAME_LEN {
                    // parameter bytes still in flight
                    return;
                }
                if &self.inbox[SPIR_FRAME_LEN - 2..SPIR_FRAME_LEN] != b">>" {
                    // malformed; skip the opening bracket and rescan
                    self.inbox.drain(..1);
                    continue;
                }
                let frame: Vec<u8> = self.inbox.drain(..SPIR_FRAME_LEN).collect();
                debug!("sim frame: SPIR");
                self.handle_spir(&frame[5..10]);
                self.frames.push(frame);
                continue;
            }

            let Some(end) = self.inbox.windows(2).position(|w| w == b">>") else {
                if self.inbox.len() > MAX_FRAME {
                    self.inbox.clear();
                }
                return;
            };
            let frame: Vec<u8> = self.inbox.drain(..end + 2).collect();
            self.handle_frame(frame);
        }
    }

    fn handle_frame(&mut self, frame: Vec<u8>) {
        let name = frame[1..frame.len() - 2].to_vec();
        debug!("sim frame: {}", String::from_utf8_lossy(&name));
        self.frames.push(frame);

        match name.as_slice() {
            b"GETVER" => {
                let reply = self.config.version.clone().into_bytes();
                self.queue_reply(reply);
            }
            b"GETSERIAL" => {
                let reply = self.config.serial.to_vec();
                self.queue_reply(reply);
            }
            b"GETVOLT" => {
                let mut reply = format!(
                    "{}.{}v",
                    self.config.voltage_tenths / 10,
                    self.config.voltage_tenths % 10
                )
                .into_bytes();
                reply.push(0);
                self.queue_reply(reply);
            }
            b"GETCPM" => {
                let reply = encode_count(self.config.cpm).to_vec();
                self.queue_reply(reply);
            }
            b"GETCPS" => {
                let reply = encode_count(self.config.cps).to_vec();
                self.queue_reply(reply);
            }
            b"GETCPMH" => {
                let reply = encode_count(self.config.cpm_high).to_vec();
                self.queue_reply(reply);
            }
            b"GETCPML" => {
                let reply = encode_count(self.config.cpm_low).to_vec();
                self.queue_reply(reply);
            }
            b"GETGYRO" => {
                let mut reply = Vec::with_capacity(7);
                for axis in self.config.gyro {
                    reply.extend_from_slice(&axis.to_be_bytes());
                }
                reply.push(REPLY_SENTINEL);
                self.queue_reply(reply);
            }
            b"GETDATETIME" => {
                let mut reply = self.config.datetime.to_vec();
                reply.push(REPLY_SENTINEL);
                self.queue_reply(reply);
            }
            b"HEARTBEAT1" => {
                self.heartbeat = true;
                self.heartbeat_index = 0;
            }
            b"HEARTBEAT0" => {
                self.heartbeat = false;
            }
            b"GETCFG" => {
                let blob = if self.config.config_blob.is_empty() {
                    vec![0u8; self.config_blob_len()]
                } else {
                    self.config.config_blob.clone()
                };
                self.queue_reply(blob);
            }
            // real firmware does not answer commands it does not know
            _ => {
                debug!(
                    "sim ignoring unknown command {:?}",
                    String::from_utf8_lossy(&name)
                );
            }
        }
    }

    fn handle_spir(&mut self, params: &[u8]) {
        let address = u32::from_be_bytes([0, params[0], params[1], params[2]]) as usize;
        let length = u16::from_be_bytes([params[3], params[4]]) as usize;

        // erased flash reads back 0xFF
        let mut page = vec![0xFF; length];
        if address < self.config.history.len() {
            let available = (self.config.history.len() - address).min(length);
            page[..available].copy_from_slice(&self.config.history[address..address + available]);
        }
        debug!("sim history read: {:#08X} + {}", address, length);
        self.queue_reply(page);
    }
}

impl Default for VirtualCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for VirtualCounter {
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.ensure_open()?;
        trace!("sim write {:02X?}", bytes);
        self.inbox.extend_from_slice(bytes);
        self.pump_inbox();
        Ok(())
    }

    fn read_available(&mut self, _settle: Duration) -> Result<Vec<u8>, TransportError> {
        // replies are queued synchronously, so there is nothing to wait for
        self.ensure_open()?;
        let len = self.outbox.len();
        Ok(self.drain(len))
    }

    fn read_until(&mut self, terminator: u8) -> Result<Vec<u8>, TransportError> {
        self.ensure_open()?;
        let mut out = Vec::new();
        while let Some(byte) = self.outbox.pop_front() {
            out.push(byte);
            if byte == terminator {
                break;
            }
        }
        Ok(out)
    }

    fn read_sized(&mut self, size: usize) -> Result<Vec<u8>, TransportError> {
        self.ensure_open()?;
        if self.heartbeat && self.outbox.is_empty() {
            self.synthesize_heartbeat_sample();
        }
        Ok(self.drain(size))
    }

    fn reset_buffers(&mut self) -> Result<(), TransportError> {
        self.ensure_open()?;
        self.inbox.clear();
        self.outbox.clear();
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

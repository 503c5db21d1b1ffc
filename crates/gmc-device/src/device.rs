//! Capability-bound device handle
//!
//! A [`Device`] pairs an open connection with the capability record
//! resolved from the counter's version string. Every operation checks the
//! capability set before touching the wire, so asking a single-tube
//! GMC-300 for its second tube fails fast instead of timing out against
//! silent firmware.

use std::time::Duration;

use chrono::NaiveDateTime;
use gmc_connect::{Connection, Transport};
use gmc_protocol::{
    decode, decode_config, CommandKind, ConfigSnapshot, DeviceCommand, DeviceModel, GyroReading,
    ModelInfo,
};
use tracing::debug;

use crate::error::DeviceError;
use crate::heartbeat::HeartbeatSamples;

/// Highest flash address a 3-byte history pointer can express
pub const FLASH_ADDRESS_MAX: u32 = 0x00FF_FFFF;

/// Largest history span one read command may request
pub const HISTORY_SPAN_MAX: u16 = 4096;

/// Poll attempts while waiting for a history page out of flash
const HISTORY_POLL_ATTEMPTS: u64 = 10;

/// A GQ GMC counter with a resolved capability set
#[derive(Debug)]
pub struct Device<T: Transport> {
    connection: Connection<T>,
    info: &'static ModelInfo,
    version: String,
}

impl<T: Transport> Device<T> {
    pub(crate) fn from_parts(
        connection: Connection<T>,
        info: &'static ModelInfo,
        version: String,
    ) -> Self {
        Self {
            connection,
            info,
            version,
        }
    }

    /// The model this device resolved to
    pub fn model(&self) -> DeviceModel {
        self.info.model
    }

    /// Static capability record for this device
    pub fn info(&self) -> &'static ModelInfo {
        self.info
    }

    /// Version string reported during identification
    pub fn version_string(&self) -> &str {
        &self.version
    }

    /// Direct access to the underlying connection
    pub fn connection_mut(&mut self) -> &mut Connection<T> {
        &mut self.connection
    }

    /// Give the connection back, discarding the identity
    pub fn into_connection(self) -> Connection<T> {
        self.connection
    }

    fn ensure_supported(&self, command: CommandKind) -> Result<(), DeviceError> {
        if self.info.supports(command) {
            Ok(())
        } else {
            Err(DeviceError::Unsupported {
                model: self.info.model,
                command,
            })
        }
    }

    /// Re-read the version string from the device
    pub fn version(&mut self) -> Result<String, DeviceError> {
        self.ensure_supported(CommandKind::Version)?;
        let raw = self.connection.issue(&DeviceCommand::Version)?;
        Ok(decode::decode_version(&raw)?)
    }

    /// Factory serial number as lowercase hex
    pub fn serial_number(&mut self) -> Result<String, DeviceError> {
        self.ensure_supported(CommandKind::SerialNumber)?;
        let raw = self.connection.issue(&DeviceCommand::SerialNumber)?;
        Ok(decode::decode_serial_number(&raw)?)
    }

    /// Battery voltage in volts
    pub fn voltage(&mut self) -> Result<f64, DeviceError> {
        self.ensure_supported(CommandKind::Voltage)?;
        let raw = self.connection.issue(&DeviceCommand::Voltage)?;
        Ok(decode::decode_voltage(&raw)?)
    }

    /// Counts per minute
    pub fn cpm(&mut self) -> Result<u32, DeviceError> {
        self.count(CommandKind::Cpm, DeviceCommand::Cpm)
    }

    /// Counts in the last second
    pub fn cps(&mut self) -> Result<u32, DeviceError> {
        self.count(CommandKind::Cps, DeviceCommand::Cps)
    }

    /// Counts per minute from the high-sensitivity tube (dual-tube models)
    pub fn cpm_high(&mut self) -> Result<u32, DeviceError> {
        self.count(CommandKind::CpmHigh, DeviceCommand::CpmHigh)
    }

    /// Counts per minute from the low-sensitivity tube (dual-tube models)
    pub fn cpm_low(&mut self) -> Result<u32, DeviceError> {
        self.count(CommandKind::CpmLow, DeviceCommand::CpmLow)
    }

    fn count(&mut self, kind: CommandKind, command: DeviceCommand) -> Result<u32, DeviceError> {
        self.ensure_supported(kind)?;
        let raw = self.connection.issue(&command)?;
        Ok(decode::decode_count(&raw)?)
    }

    /// Position reading from the built-in accelerometer
    pub fn gyro(&mut self) -> Result<GyroReading, DeviceError> {
        self.ensure_supported(CommandKind::Gyro)?;
        let raw = self.connection.issue(&DeviceCommand::Gyro)?;
        Ok(decode::decode_gyro(&raw)?)
    }

    /// The device's real-time clock
    pub fn datetime(&mut self) -> Result<NaiveDateTime, DeviceError> {
        self.ensure_supported(CommandKind::DateTime)?;
        let raw = self.connection.issue(&DeviceCommand::DateTime)?;
        Ok(decode::decode_datetime(&raw)?)
    }

    /// Fetch and decode the configuration block
    ///
    /// The register layout follows the device's protocol revision; fields
    /// without a decoder come back as [`gmc_protocol::ConfigValue::Raw`].
    pub fn config(&mut self) -> Result<ConfigSnapshot, DeviceError> {
        self.ensure_supported(CommandKind::Config)?;
        let raw = self.connection.issue(&DeviceCommand::Config)?;
        Ok(decode_config(&raw, self.info.config_layout)?)
    }

    /// Ask the device to push one count sample per second
    pub fn heartbeat_on(&mut self) -> Result<(), DeviceError> {
        self.ensure_supported(CommandKind::HeartbeatOn)?;
        self.connection.issue(&DeviceCommand::HeartbeatOn)?;
        Ok(())
    }

    /// Stop the per-second sample push
    pub fn heartbeat_off(&mut self) -> Result<(), DeviceError> {
        self.ensure_supported(CommandKind::HeartbeatOff)?;
        self.connection.issue(&DeviceCommand::HeartbeatOff)?;
        Ok(())
    }

    /// Stream `count` heartbeat samples
    ///
    /// Discards anything already queued (samples accumulate from the
    /// moment [`heartbeat_on`](Self::heartbeat_on) is sent), then returns
    /// an iterator that reads one sample per `next()`. The first error
    /// exhausts the iterator.
    pub fn heartbeat_live(&mut self, count: usize) -> Result<HeartbeatSamples<'_, T>, DeviceError> {
        self.ensure_supported(CommandKind::HeartbeatOn)?;
        self.connection.reset_buffers()?;
        Ok(HeartbeatSamples::new(self, count))
    }

    /// Fetch one raw page of the history log from flash
    ///
    /// `address` is a 3-byte flash offset and `length` the number of bytes
    /// to read, at most [`HISTORY_SPAN_MAX`]. Flash reads are slow and
    /// their completion is not signalled, so the reply is polled with a
    /// growing delay; whatever arrived by the last poll is returned.
    /// An empty page is a legitimate result, not an error.
    pub fn read_history_page(
        &mut self,
        address: u32,
        length: u16,
    ) -> Result<Vec<u8>, DeviceError> {
        self.ensure_supported(CommandKind::ReadHistory)?;
        if address > FLASH_ADDRESS_MAX {
            return Err(DeviceError::InvalidParameter(format!(
                "history address {address:#X} does not fit in 3 bytes"
            )));
        }
        if length == 0 || length > HISTORY_SPAN_MAX {
            return Err(DeviceError::InvalidParameter(format!(
                "history span {length} is outside 1..={HISTORY_SPAN_MAX}"
            )));
        }

        self.connection.reset_buffers()?;
        let command = DeviceCommand::ReadHistory { address, length };
        let transport = self.connection.transport_mut();
        transport.write(&command.encode())?;

        let mut page = Vec::new();
        for attempt in 0..HISTORY_POLL_ATTEMPTS {
            let settle = Duration::from_millis(100 * (attempt + 1));
            let chunk = transport.read_available(settle)?;
            if !chunk.is_empty() {
                page = chunk;
                break;
            }
        }
        debug!(
            "history page at {:#08X}: requested {}, got {} byte(s)",
            address,
            length,
            page.len()
        );
        Ok(page)
    }
}

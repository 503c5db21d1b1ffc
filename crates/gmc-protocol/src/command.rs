//! GMC command vocabulary
//!
//! Every operation on a counter is one write of an ASCII bracketed directive
//! followed by an optional reply. How many reply bytes to expect is a
//! property of the command, declared here as its [`ReplyShape`] so the
//! connection layer can pick the right read discipline without per-command
//! special cases.

use crate::decode::{COUNT_LEN, DATETIME_LEN, GYRO_LEN, SERIAL_LEN, VOLTAGE_LEN};

/// Terminator byte for line-feed-bounded text replies
pub const TEXT_TERMINATOR: u8 = b'\n';

/// Trailing sentinel byte on gyro and datetime replies
pub const REPLY_SENTINEL: u8 = 0xAA;

/// How the reply to a command is bounded on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyShape {
    /// No reply at all; the command is fire-and-forget
    None,
    /// No documented length or terminator; read whatever the device has
    /// buffered after a settle delay (best effort)
    Settle,
    /// Exactly this many bytes
    Exact(usize),
}

/// Command classes, used for per-model capability checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CommandKind {
    Version,
    SerialNumber,
    Voltage,
    Cpm,
    Cps,
    CpmHigh,
    CpmLow,
    Gyro,
    DateTime,
    HeartbeatOn,
    HeartbeatOff,
    Config,
    ReadHistory,
}

/// One request token in the GMC vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCommand {
    /// `<GETVER>>` - firmware model and revision text
    Version,
    /// `<GETSERIAL>>` - 7-byte device serial number
    SerialNumber,
    /// `<GETVOLT>>` - battery voltage as short ASCII text
    Voltage,
    /// `<GETCPM>>` - counts per minute
    Cpm,
    /// `<GETCPS>>` - counts per second
    Cps,
    /// `<GETCPMH>>` - counts per minute, high-dose tube
    CpmHigh,
    /// `<GETCPML>>` - counts per minute, low-dose tube
    CpmLow,
    /// `<GETGYRO>>` - 3-axis position data
    Gyro,
    /// `<GETDATETIME>>` - on-device clock
    DateTime,
    /// `<HEARTBEAT1>>` - start autonomous once-per-second CPS output
    HeartbeatOn,
    /// `<HEARTBEAT0>>` - stop autonomous CPS output
    HeartbeatOff,
    /// `<GETCFG>>` - raw configuration blob
    Config,
    /// `<SPIR..>>` - one page of the on-device history log flash
    ReadHistory { address: u32, length: u16 },
}

impl DeviceCommand {
    /// Encode this command to its wire bytes
    ///
    /// `ReadHistory` embeds the address as three big-endian bytes, so the
    /// top byte of `address` is discarded; callers bound it to 24 bits.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            DeviceCommand::Version => b"<GETVER>>".to_vec(),
            DeviceCommand::SerialNumber => b"<GETSERIAL>>".to_vec(),
            DeviceCommand::Voltage => b"<GETVOLT>>".to_vec(),
            DeviceCommand::Cpm => b"<GETCPM>>".to_vec(),
            DeviceCommand::Cps => b"<GETCPS>>".to_vec(),
            DeviceCommand::CpmHigh => b"<GETCPMH>>".to_vec(),
            DeviceCommand::CpmLow => b"<GETCPML>>".to_vec(),
            DeviceCommand::Gyro => b"<GETGYRO>>".to_vec(),
            DeviceCommand::DateTime => b"<GETDATETIME>>".to_vec(),
            DeviceCommand::HeartbeatOn => b"<HEARTBEAT1>>".to_vec(),
            DeviceCommand::HeartbeatOff => b"<HEARTBEAT0>>".to_vec(),
            DeviceCommand::Config => b"<GETCFG>>".to_vec(),
            DeviceCommand::ReadHistory { address, length } => {
                // <SPIR[A2][A1][A0][L1][L0]>> with a 3-byte big-endian
                // address and a 2-byte big-endian length
                let mut bytes = Vec::with_capacity(12);
                bytes.extend_from_slice(b"<SPIR");
                bytes.extend_from_slice(&address.to_be_bytes()[1..]);
                bytes.extend_from_slice(&length.to_be_bytes());
                bytes.extend_from_slice(b">>");
                bytes
            }
        }
    }

    /// The read discipline the reply to this command needs
    ///
    /// History pages are declared [`ReplyShape::Settle`]: flash reads on
    /// slow firmware trickle in, so the device layer polls with growing
    /// settle delays rather than one sized read.
    pub fn reply_shape(&self) -> ReplyShape {
        match self {
            DeviceCommand::Version | DeviceCommand::Config | DeviceCommand::ReadHistory { .. } => {
                ReplyShape::Settle
            }
            DeviceCommand::SerialNumber => ReplyShape::Exact(SERIAL_LEN),
            DeviceCommand::Voltage => ReplyShape::Exact(VOLTAGE_LEN),
            DeviceCommand::Cpm
            | DeviceCommand::Cps
            | DeviceCommand::CpmHigh
            | DeviceCommand::CpmLow => ReplyShape::Exact(COUNT_LEN),
            DeviceCommand::Gyro => ReplyShape::Exact(GYRO_LEN),
            DeviceCommand::DateTime => ReplyShape::Exact(DATETIME_LEN),
            DeviceCommand::HeartbeatOn | DeviceCommand::HeartbeatOff => ReplyShape::None,
        }
    }

    /// The capability class this command belongs to
    pub fn kind(&self) -> CommandKind {
        match self {
            DeviceCommand::Version => CommandKind::Version,
            DeviceCommand::SerialNumber => CommandKind::SerialNumber,
            DeviceCommand::Voltage => CommandKind::Voltage,
            DeviceCommand::Cpm => CommandKind::Cpm,
            DeviceCommand::Cps => CommandKind::Cps,
            DeviceCommand::CpmHigh => CommandKind::CpmHigh,
            DeviceCommand::CpmLow => CommandKind::CpmLow,
            DeviceCommand::Gyro => CommandKind::Gyro,
            DeviceCommand::DateTime => CommandKind::DateTime,
            DeviceCommand::HeartbeatOn => CommandKind::HeartbeatOn,
            DeviceCommand::HeartbeatOff => CommandKind::HeartbeatOff,
            DeviceCommand::Config => CommandKind::Config,
            DeviceCommand::ReadHistory { .. } => CommandKind::ReadHistory,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DeviceCommand, ReplyShape};

    #[test]
    fn test_encode_plain_commands() {
        assert_eq!(DeviceCommand::Version.encode(), b"<GETVER>>");
        assert_eq!(DeviceCommand::Cpm.encode(), b"<GETCPM>>");
        assert_eq!(DeviceCommand::HeartbeatOn.encode(), b"<HEARTBEAT1>>");
        assert_eq!(DeviceCommand::HeartbeatOff.encode(), b"<HEARTBEAT0>>");
        assert_eq!(DeviceCommand::DateTime.encode(), b"<GETDATETIME>>");
    }

    #[test]
    fn test_encode_read_history() {
        let cmd = DeviceCommand::ReadHistory {
            address: 0x010203,
            length: 0x0405,
        };
        assert_eq!(cmd.encode(), b"<SPIR\x01\x02\x03\x04\x05>>");
    }

    #[test]
    fn test_encode_read_history_start_of_flash() {
        let cmd = DeviceCommand::ReadHistory {
            address: 0,
            length: 2048,
        };
        assert_eq!(cmd.encode(), b"<SPIR\x00\x00\x00\x08\x00>>");
    }

    #[test]
    fn test_reply_shapes() {
        assert_eq!(DeviceCommand::Version.reply_shape(), ReplyShape::Settle);
        assert_eq!(DeviceCommand::Config.reply_shape(), ReplyShape::Settle);
        assert_eq!(
            DeviceCommand::SerialNumber.reply_shape(),
            ReplyShape::Exact(7)
        );
        assert_eq!(DeviceCommand::Voltage.reply_shape(), ReplyShape::Exact(5));
        assert_eq!(DeviceCommand::Cps.reply_shape(), ReplyShape::Exact(4));
        assert_eq!(DeviceCommand::Gyro.reply_shape(), ReplyShape::Exact(7));
        assert_eq!(DeviceCommand::DateTime.reply_shape(), ReplyShape::Exact(7));
        assert_eq!(DeviceCommand::HeartbeatOn.reply_shape(), ReplyShape::None);
    }
}

//! GMC Protocol Library
//!
//! This crate provides command encoding and reply decoding for the serial
//! protocol spoken by GQ Electronics GMC Geiger counters (GMC-300 through
//! GMC-600+):
//!
//! - **Commands** are ASCII bracketed directives, e.g. `<GETVER>>` or
//!   `<GETCPM>>`; a few carry binary parameter bytes between the name and
//!   the closing `>>`.
//! - **Replies** are unframed: free-form text, or a fixed number of binary
//!   bytes per command. There is no checksum and no length prefix, so every
//!   decoder validates the byte count it was handed before unpacking.
//!
//! Two vendor protocol revisions cover the model range: GQ-RFC1201
//! (GMC-300/320 family) and GQ-RFC1801 (GMC-500/600 family). They share the
//! command vocabulary but differ in configuration layout and in the width of
//! autonomous heartbeat samples.
//!
//! # Architecture
//!
//! - [`command`]: the command vocabulary, each with its wire encoding and
//!   declared reply shape
//! - [`decode`]: one decoder per reply payload format
//! - [`models`]: version-string classification into per-model capability sets
//! - [`config`]: declarative register tables driving configuration decoding
//!
//! This crate does no I/O; the connection layer feeds it raw reply bytes.
//!
//! # Example
//!
//! ```rust
//! use gmc_protocol::{decode, DeviceCommand, ReplyShape};
//!
//! let cmd = DeviceCommand::Cpm;
//! assert_eq!(cmd.encode(), b"<GETCPM>>");
//! assert_eq!(cmd.reply_shape(), ReplyShape::Exact(4));
//!
//! // Reply bytes arrive from the transport; the decoder checks the length.
//! let cpm = decode::decode_count(&[0x00, 0x00, 0x00, 0x1C]).unwrap();
//! assert_eq!(cpm, 28);
//! ```

pub mod command;
pub mod config;
pub mod decode;
pub mod error;
pub mod models;

pub use command::{CommandKind, DeviceCommand, ReplyShape};
pub use config::{decode_config, ConfigField, ConfigLayout, ConfigSnapshot, ConfigValue, FieldKind};
pub use decode::GyroReading;
pub use error::{DecodeError, UnsupportedModel};
pub use models::{resolve_model, DeviceModel, ModelInfo};

/// Identifies which vendor protocol revision a counter's firmware follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProtocolRevision {
    /// GQ-RFC1201 (GMC-300/320 family)
    Rfc1201,
    /// GQ-RFC1801 (GMC-500/600 family)
    Rfc1801,
}

impl ProtocolRevision {
    /// Returns the vendor document name for this revision
    pub fn name(&self) -> &'static str {
        match self {
            ProtocolRevision::Rfc1201 => "GQ-RFC1201",
            ProtocolRevision::Rfc1801 => "GQ-RFC1801",
        }
    }
}

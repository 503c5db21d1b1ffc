//! Error types for GMC protocol decoding and model resolution

use thiserror::Error;

/// Errors that can occur while decoding a reply payload
///
/// Replies carry no framing, so a short payload (commonly a link timeout
/// mid-reply) is detected here rather than at the transport layer. The
/// offending bytes are carried along for diagnosis.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Reply did not have the declared byte count
    #[error("reply length mismatch: expected {expected} bytes, got {got} ({raw:02X?})")]
    LengthMismatch {
        expected: usize,
        got: usize,
        raw: Vec<u8>,
    },

    /// Best-effort read produced nothing; indistinguishable from a timeout
    #[error("empty reply")]
    EmptyReply,

    /// Reply is not valid UTF-8 text
    #[error("reply is not valid text: {raw:02X?}")]
    InvalidText { raw: Vec<u8> },

    /// Reply is not a parseable decimal number
    #[error("reply is not a decimal number: {raw:02X?}")]
    InvalidNumber { raw: Vec<u8> },

    /// Reply fields do not form a valid calendar timestamp
    #[error("reply is not a valid calendar time: {raw:02X?}")]
    InvalidDateTime { raw: Vec<u8> },

    /// A config field descriptor cannot be decoded as declared
    #[error("config field {name} cannot be decoded as declared (offset {offset}, len {len})")]
    InvalidField {
        name: &'static str,
        offset: usize,
        len: usize,
    },
}

/// A reported version string matched no known model
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unrecognized device version: {version:?}")]
pub struct UnsupportedModel {
    /// The full version string the device reported
    pub version: String,
}

//! Error types for the device layer

use gmc_connect::TransportError;
use gmc_protocol::{CommandKind, DecodeError, DeviceModel, UnsupportedModel};
use thiserror::Error;

/// Errors from device operations
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The serial line failed
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The device answered, but the reply did not decode
    #[error("bad reply: {0}")]
    Decode(#[from] DecodeError),

    /// The reported version string matched no known model
    #[error(transparent)]
    UnsupportedDevice(#[from] UnsupportedModel),

    /// The command is not in this model's capability set
    #[error("{model} does not support {command:?}")]
    Unsupported {
        model: DeviceModel,
        command: CommandKind,
    },

    /// A caller-supplied parameter is out of range
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

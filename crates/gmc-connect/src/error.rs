//! Error types for the connection layer

use thiserror::Error;

/// Errors from the serial transport itself
#[derive(Debug, Error)]
pub enum TransportError {
    /// The link was used after `close()` (or was never opened)
    #[error("link is not open")]
    NotOpen,

    /// Opening the endpoint failed
    #[error("failed to open {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },

    /// I/O failure mid-operation
    #[error("serial I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port control failure (buffer reset, queue inspection)
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

/// Errors that can occur while negotiating a connection
#[derive(Debug, Error)]
pub enum ConnectError {
    /// Enumerating serial endpoints failed
    #[error("failed to enumerate serial endpoints: {0}")]
    Enumeration(String),

    /// Every candidate endpoint/bit-rate pair was tried without success
    #[error("no device found after {attempts} open attempt(s)")]
    NoDevice { attempts: usize },

    /// Transport failure outside the probing loop
    #[error(transparent)]
    Transport(#[from] TransportError),
}

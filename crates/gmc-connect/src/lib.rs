//! GMC Connection Library
//!
//! Serial endpoint discovery, bit-rate negotiation, and the request/reply
//! connection layer for GQ GMC Geiger counters.
//!
//! The protocol has no handshake and no framing, so connecting is a
//! probing exercise: enumerate candidate endpoints, walk the supported bit
//! rates fastest-first, and accept the first line that opens (optionally
//! tightened with a serial-number self-test). Supplying an exact endpoint
//! and bit rate skips all of that.
//!
//! # Example
//!
//! ```rust,no_run
//! use gmc_connect::{connect, ConnectConfig, SelectionHints};
//! use gmc_protocol::DeviceCommand;
//!
//! let hints = SelectionHints {
//!     description: Some("CH340".to_string()),
//!     ..Default::default()
//! };
//! let mut conn = connect(&hints, &ConnectConfig::default()).unwrap();
//! let reply = conn.issue(&DeviceCommand::Version).unwrap();
//! println!("version bytes: {:02X?}", reply);
//! ```

pub mod connection;
pub mod error;
pub mod negotiate;
pub mod scanner;
pub mod transport;

pub use connection::Connection;
pub use error::{ConnectError, TransportError};
pub use negotiate::{
    candidate_plan, connect, connect_exact, Candidate, ConnectConfig, SelectionHints, BAUD_RATES,
};
pub use scanner::{list_endpoints, EndpointInfo};
pub use transport::{SerialLink, Transport, DEFAULT_SETTLE, DEFAULT_TIMEOUT};

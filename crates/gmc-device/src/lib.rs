//! GMC Device Library
//!
//! High-level API for GQ GMC Geiger counters: identify the model on an
//! open connection, then read it through typed, capability-checked
//! operations.
//!
//! The counter never announces what it can do; capabilities are resolved
//! from the version string against a static model database, and every
//! operation is checked against that set before any bytes move. The usual
//! flow is connect, identify, operate:
//!
//! ```rust,no_run
//! use gmc_connect::{connect, ConnectConfig, SelectionHints};
//! use gmc_device::identify;
//!
//! let conn = connect(&SelectionHints::default(), &ConnectConfig::default()).unwrap();
//! let mut device = identify(conn).unwrap();
//! println!("{}: {} CPM", device.model(), device.cpm().unwrap());
//! ```

pub mod device;
pub mod error;
pub mod heartbeat;
pub mod identify;

pub use device::{Device, FLASH_ADDRESS_MAX, HISTORY_SPAN_MAX};
pub use error::DeviceError;
pub use heartbeat::HeartbeatSamples;
pub use identify::identify;

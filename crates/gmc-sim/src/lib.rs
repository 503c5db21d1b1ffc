//! GMC Simulation Library
//!
//! This crate provides a simulated GQ GMC counter for testing the protocol
//! stack without physical hardware. The [`VirtualCounter`] implements the
//! same transport seam as the real serial link: commands written to it are
//! parsed as frames and answered with protocol-accurate reply bytes, and
//! fault injection covers the short-reply and silent-firmware cases real
//! counters exhibit.
//!
//! # Example
//!
//! ```rust
//! use gmc_connect::Transport;
//! use gmc_sim::VirtualCounter;
//! use std::time::Duration;
//!
//! let mut counter = VirtualCounter::new();
//! counter.write(b"<GETVER>>").unwrap();
//! let version = counter.read_available(Duration::ZERO).unwrap();
//! assert_eq!(version, b"GMC-500+Re 2.40".to_vec());
//! ```

pub mod counter;

pub use counter::{VirtualCounter, VirtualCounterConfig};

//! Bit-rate negotiation
//!
//! Finds the one endpoint/bit-rate pair that behaves like a counter. The
//! protocol has no handshake, so a successful open is the only cheap
//! acceptance signal; an optional serial-number self-test tightens that up
//! at the cost of one command round trip per candidate.
//!
//! Worst-case latency for a blind sweep is `endpoints x bit rates x
//! timeout`, which is why the plan walks rates fastest-first and why
//! [`connect_exact`] exists.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::connection::Connection;
use crate::error::ConnectError;
use crate::scanner::{list_endpoints, EndpointInfo};
use crate::transport::{SerialLink, DEFAULT_TIMEOUT};

/// Supported bit rates, fastest first
pub const BAUD_RATES: [u32; 10] = [
    115_200, 57_600, 38_400, 28_800, 19_200, 14_400, 9_600, 4_800, 2_400, 1_200,
];

/// Hints for picking an endpoint
///
/// An endpoint is selected if it satisfies ANY supplied hint; with no
/// hints set, every endpoint is a candidate. String hints match as
/// case-insensitive substrings. `baud` is not an endpoint property: on its
/// own it restricts the rate sweep, and together with `port` it makes the
/// pair exact and skips discovery entirely.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionHints {
    /// Endpoint path or path fragment (e.g. `ttyUSB0`, `COM3`); combined
    /// with `baud` it is taken as the exact path
    pub port: Option<String>,
    /// Exact bit rate
    pub baud: Option<u32>,
    /// USB vendor id
    pub vid: Option<u16>,
    /// USB product id
    pub pid: Option<u16>,
    /// Substring of the USB description
    pub description: Option<String>,
    /// Substring of the hardware id (e.g. `VID:PID=1A86`)
    pub hardware_id: Option<String>,
}

impl SelectionHints {
    /// Whether no hint at all is set
    pub fn is_empty(&self) -> bool {
        self.port.is_none()
            && self.baud.is_none()
            && self.vid.is_none()
            && self.pid.is_none()
            && self.description.is_none()
            && self.hardware_id.is_none()
    }

    /// Whether this endpoint satisfies at least one endpoint hint
    ///
    /// Returns true when only non-endpoint hints (`baud`) are set.
    pub fn matches(&self, endpoint: &EndpointInfo) -> bool {
        let mut any_endpoint_hint = false;

        if let Some(port) = &self.port {
            any_endpoint_hint = true;
            if contains_ci(&endpoint.path, port) {
                return true;
            }
        }
        if let Some(vid) = self.vid {
            any_endpoint_hint = true;
            if endpoint.vid == Some(vid) {
                return true;
            }
        }
        if let Some(pid) = self.pid {
            any_endpoint_hint = true;
            if endpoint.pid == Some(pid) {
                return true;
            }
        }
        if let Some(description) = &self.description {
            any_endpoint_hint = true;
            if contains_ci(&endpoint.description(), description) {
                return true;
            }
        }
        if let Some(hardware_id) = &self.hardware_id {
            any_endpoint_hint = true;
            if contains_ci(&endpoint.hardware_id(), hardware_id) {
                return true;
            }
        }

        !any_endpoint_hint
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// One endpoint/bit-rate pair the probing loop will try
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: String,
    pub baud: u32,
}

/// Settings applied to every link the negotiator opens
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    /// Read timeout for every opened link
    pub timeout: Duration,
    /// Run the serial-number self-test before accepting a candidate
    ///
    /// Off by default: a wrong-rate line usually fails at open or reads
    /// garbage, and the self-test doubles per-candidate latency.
    pub verify: bool,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            verify: false,
        }
    }
}

/// Build the ordered candidate list for the probing loop
///
/// Pure, so planning is testable without hardware. An exact `port` +
/// `baud` hint pair yields exactly one candidate; a lone `baud` hint
/// restricts the rate list; otherwise every matching endpoint is paired
/// with every supported rate, fastest first.
pub fn candidate_plan(hints: &SelectionHints, endpoints: &[EndpointInfo]) -> Vec<Candidate> {
    if let (Some(port), Some(baud)) = (&hints.port, hints.baud) {
        return vec![Candidate {
            path: port.clone(),
            baud,
        }];
    }

    let rates: Vec<u32> = match hints.baud {
        Some(baud) => vec![baud],
        None => BAUD_RATES.to_vec(),
    };

    let mut plan = Vec::new();
    for endpoint in endpoints {
        if !hints.is_empty() && !hints.matches(endpoint) {
            continue;
        }
        for &baud in &rates {
            plan.push(Candidate {
                path: endpoint.path.clone(),
                baud,
            });
        }
    }
    plan
}

/// Find a counter and return an open connection to it
///
/// Walks the candidate plan in order and accepts the first endpoint that
/// opens (and, when `config.verify` is set, answers the serial-number
/// self-test). Failed candidates are logged and skipped; only running out
/// of candidates is an error.
pub fn connect(
    hints: &SelectionHints,
    config: &ConnectConfig,
) -> Result<Connection<SerialLink>, ConnectError> {
    // exact pair: do not enumerate anything
    let endpoints = if hints.port.is_some() && hints.baud.is_some() {
        Vec::new()
    } else {
        list_endpoints()?
    };

    let plan = candidate_plan(hints, &endpoints);
    if plan.is_empty() {
        error!("no candidate endpoints to probe");
        return Err(ConnectError::NoDevice { attempts: 0 });
    }

    let mut attempts = 0;
    for candidate in &plan {
        attempts += 1;
        debug!("trying {} at {} baud", candidate.path, candidate.baud);

        let link = match SerialLink::open(&candidate.path, candidate.baud, config.timeout) {
            Ok(link) => link,
            Err(e) => {
                debug!(
                    "open failed for {} at {} baud: {}",
                    candidate.path, candidate.baud, e
                );
                continue;
            }
        };

        let mut conn = Connection::new(link);
        if config.verify {
            match conn.verify() {
                Ok(true) => {}
                Ok(false) => {
                    warn!(
                        "{} at {} baud opened but failed the serial-number self-test",
                        candidate.path, candidate.baud
                    );
                    conn.close();
                    continue;
                }
                Err(e) => {
                    warn!(
                        "self-test error on {} at {} baud: {}",
                        candidate.path, candidate.baud, e
                    );
                    conn.close();
                    continue;
                }
            }
        }

        info!("connected to {} at {} baud", candidate.path, candidate.baud);
        return Ok(conn);
    }

    error!("no device found after {} open attempt(s)", attempts);
    Err(ConnectError::NoDevice { attempts })
}

/// Open a known endpoint at a known rate, skipping discovery entirely
pub fn connect_exact(
    path: &str,
    baud: u32,
    config: &ConnectConfig,
) -> Result<Connection<SerialLink>, ConnectError> {
    debug!("exact connect: {} at {} baud", path, baud);
    let link = SerialLink::open(path, baud, config.timeout)?;
    info!("connected to {} at {} baud", path, baud);
    Ok(Connection::new(link))
}

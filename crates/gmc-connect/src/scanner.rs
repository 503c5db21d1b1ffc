//! Serial endpoint scanner
//!
//! Enumerates the host's serial endpoints and carries the USB identity
//! strings that hint matching works against.

use serialport::{available_ports, SerialPortType};
use serde::Serialize;
use tracing::info;

use crate::error::ConnectError;

/// Information about one serial endpoint
#[derive(Debug, Clone, Serialize)]
pub struct EndpointInfo {
    /// Endpoint path (e.g. `/dev/ttyUSB0`, `COM3`)
    pub path: String,
    /// USB vendor id, if this is a USB endpoint
    pub vid: Option<u16>,
    /// USB product id, if this is a USB endpoint
    pub pid: Option<u16>,
    /// USB serial number, if the adapter reports one
    pub serial_number: Option<String>,
    /// USB manufacturer string
    pub manufacturer: Option<String>,
    /// USB product string
    pub product: Option<String>,
}

impl EndpointInfo {
    fn from_serialport(name: String, port_type: &SerialPortType) -> Self {
        match port_type {
            SerialPortType::UsbPort(usb) => Self {
                path: name,
                vid: Some(usb.vid),
                pid: Some(usb.pid),
                serial_number: usb.serial_number.clone(),
                manufacturer: usb.manufacturer.clone(),
                product: usb.product.clone(),
            },
            _ => Self {
                path: name,
                vid: None,
                pid: None,
                serial_number: None,
                manufacturer: None,
                product: None,
            },
        }
    }

    /// Free-text description used for substring hint matching
    pub fn description(&self) -> String {
        match (&self.manufacturer, &self.product) {
            (Some(manufacturer), Some(product)) => format!("{manufacturer} {product}"),
            (Some(manufacturer), None) => manufacturer.clone(),
            (None, Some(product)) => product.clone(),
            (None, None) => "n/a".to_string(),
        }
    }

    /// Hardware-id string in the `USB VID:PID=1A86:7523` form hint
    /// matching expects; `n/a` for non-USB endpoints
    pub fn hardware_id(&self) -> String {
        match (self.vid, self.pid) {
            (Some(vid), Some(pid)) => match &self.serial_number {
                Some(serial) => format!("USB VID:PID={vid:04X}:{pid:04X} SER={serial}"),
                None => format!("USB VID:PID={vid:04X}:{pid:04X}"),
            },
            _ => "n/a".to_string(),
        }
    }
}

/// Enumerate all serial endpoints on the host
pub fn list_endpoints() -> Result<Vec<EndpointInfo>, ConnectError> {
    info!("enumerating serial endpoints");
    let ports = available_ports().map_err(|e| ConnectError::Enumeration(e.to_string()))?;

    let endpoints: Vec<_> = ports
        .into_iter()
        .map(|p| EndpointInfo::from_serialport(p.port_name, &p.port_type))
        .collect();

    if endpoints.is_empty() {
        info!("no serial endpoints found");
    } else {
        info!("found {} serial endpoint(s)", endpoints.len());
        for endpoint in &endpoints {
            info!(
                "  {} - {} [{}]",
                endpoint.path,
                endpoint.description(),
                endpoint.hardware_id()
            );
        }
    }

    Ok(endpoints)
}

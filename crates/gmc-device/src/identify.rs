//! Device identification
//!
//! The version string is the only identity the protocol offers, so this is
//! where a raw connection becomes a typed [`Device`].

use gmc_connect::{Connection, Transport};
use gmc_protocol::{decode, resolve_model, DeviceCommand};
use tracing::info;

use crate::device::Device;
use crate::error::DeviceError;

/// Identify the counter on an open connection
///
/// Issues the version command, classifies the reported string against the
/// model database, and binds the connection to the resolved capability
/// set. The version string is cached on the returned device.
pub fn identify<T: Transport>(mut conn: Connection<T>) -> Result<Device<T>, DeviceError> {
    let raw = conn.issue(&DeviceCommand::Version)?;
    let version = decode::decode_version(&raw)?;
    let model_info = resolve_model(&version)?;
    info!(
        "identified {} ({}) from version {:?}",
        model_info.name,
        model_info.revision.name(),
        version
    );
    Ok(Device::from_parts(conn, model_info, version))
}

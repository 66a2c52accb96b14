//! Capability → fully-qualified topic resolution.
//!
//! Driver topics (robot status, CAN speeds, comms activity, ...) are not
//! addressable by their base names; the interface manager maps a capability
//! base name to whatever fully-qualified topic the deployed driver actually
//! publishes. An empty answer means the feature is unavailable on this
//! vehicle – the dependent subscription is skipped, never an error.

use cav_types::ConsoleError;
use tracing::debug;

use crate::gateway::BusGateway;

/// Resolve one capability base name to its fully-qualified topic name.
///
/// The resolved name is identified by suffix match, mirroring how drivers
/// advertise `.../<base_name>` under their own namespace. Returns `Ok(None)`
/// when no driver advertises the capability.
pub async fn resolve_topic(
    gateway: &dyn BusGateway,
    base_name: &str,
) -> Result<Option<String>, ConsoleError> {
    let driver_data = gateway
        .drivers_with_capabilities(&[base_name.to_string()])
        .await?;
    let resolved = driver_data
        .into_iter()
        .find(|topic| topic.ends_with(base_name));
    if resolved.is_none() {
        debug!(capability = base_name, "no driver advertises capability, skipping");
    }
    Ok(resolved)
}

//! Capabilities (pluggable automation behaviors) and their derived identifiers.
//!
//! A capability is identified on the wire only by its `(name, version)` pair.
//! [`CapabilityId::derive`] turns that pair into a single stable key used to
//! correlate a later availability report back to the entry it belongs to.
//!
//! # Escaping rules
//!
//! * the name is trimmed and every run of whitespace collapses to one `_`
//! * the version is trimmed and every `.` becomes `_`
//! * the two parts are joined with `&`
//!
//! The derivation is pure: the same `(name, version)` pair always yields the
//! same id regardless of surrounding whitespace in the source strings.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A named, versioned pluggable behavior that can participate in automated
/// driving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    pub name: String,
    pub version: String,
    /// Bus-confirmed activation state.
    pub activated: bool,
    /// Required capabilities cannot be deactivated by the operator.
    pub required: bool,
    /// Whether the capability currently reports itself available.
    pub available: bool,
}

impl Capability {
    /// The derived join key for this capability.
    pub fn id(&self) -> CapabilityId {
        CapabilityId::derive(&self.name, &self.version)
    }
}

/// Stable identifier derived from a capability's `(name, version)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CapabilityId(String);

impl CapabilityId {
    /// Derive the identifier. See the module docs for the escaping rules.
    pub fn derive(name: &str, version: &str) -> Self {
        let name_part = name.trim().split_whitespace().collect::<Vec<_>>().join("_");
        let version_part = version.trim().replace('.', "_");
        Self(format!("{name_part}&{version_part}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic() {
        let a = CapabilityId::derive("Lane Keep", "1.2");
        let b = CapabilityId::derive("Lane Keep", "1.2");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "Lane_Keep&1_2");
    }

    #[test]
    fn whitespace_variance_yields_same_id() {
        // An activation request and a later availability report must agree on
        // the id even when one side carries stray whitespace.
        let request = CapabilityId::derive("Lane Keep", "1.2");
        let report = CapabilityId::derive("  Lane   Keep ", " 1.2 ");
        assert_eq!(request, report);
    }

    #[test]
    fn version_dots_are_escaped() {
        let id = CapabilityId::derive("Platooning", "2.0.1");
        assert_eq!(id.as_str(), "Platooning&2_0_1");
    }

    #[test]
    fn capability_id_matches_manual_derivation() {
        let cap = Capability {
            name: "Cruising".into(),
            version: "0.9".into(),
            activated: true,
            required: false,
            available: false,
        };
        assert_eq!(cap.id(), CapabilityId::derive("Cruising", "0.9"));
    }
}

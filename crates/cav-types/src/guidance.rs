//! Guidance state reports and the operator-facing button projection.
//!
//! Two different things live here and must not be conflated:
//!
//! * [`GuidanceState`] – what the vehicle's guidance subsystem reports about
//!   itself on the guidance-state topic.
//! * [`GuidanceButtonState`] – the one-way projection shown to the operator.
//!   It is derived from bus reports plus the engagement precondition and is
//!   never the source of truth.

use serde::{Deserialize, Serialize};

/// Guidance subsystem state as reported on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuidanceState {
    Shutdown,
    Startup,
    DriversReady,
    Active,
    Engaged,
    Inactive,
    /// A code outside the published enum; reported and otherwise ignored.
    Unknown(u8),
}

impl GuidanceState {
    /// Map the wire code to a state.
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Shutdown,
            1 => Self::Startup,
            2 => Self::DriversReady,
            3 => Self::Active,
            4 => Self::Engaged,
            5 => Self::Inactive,
            other => Self::Unknown(other),
        }
    }
}

/// Visible state of the engage/disengage control.
///
/// `ENGAGED` may only ever be shown when the bus has confirmed the engaged
/// state; the projection can lag the vehicle but must never lead it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuidanceButtonState {
    /// Precondition not met; the control cannot be used.
    Disabled,
    /// Route, capabilities, and widgets selected; ready to request guidance.
    Enabled,
    /// Operator requested guidance and the bus confirmed the request, but the
    /// vehicle has not reported ENGAGED yet.
    Active,
    /// Vehicle-confirmed automated control.
    Engaged,
    /// Guidance reported itself inactive (e.g. driver override).
    Inactive,
    /// Operator toggled guidance off. Terminal for the session.
    Disengaged,
}

//! [`BusMessage`] – the tagged union of every topic payload the console
//! consumes.
//!
//! Each subscribed topic delivers exactly one of these variants. Decoding from
//! the raw wire form happens at the bus boundary; the workflow components only
//! ever see these typed values. Optional fields that a deployment does not
//! publish are simply absent, never an error.

use serde::{Deserialize, Serialize};

use crate::alert::SystemAlert;
use crate::capability::Capability;
use crate::guidance::GuidanceState;
use crate::route::{RouteEventKind, RouteSegment, RouteState};

/// Health classification published on the driver-discovery stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriverStatusKind {
    Off,
    Operational,
    Degraded,
    Fault,
    Unknown(u8),
}

impl DriverStatusKind {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Off,
            1 => Self::Operational,
            2 => Self::Degraded,
            3 => Self::Fault,
            other => Self::Unknown(other),
        }
    }
}

/// Response of the get-system-version service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemVersion {
    pub system_name: String,
    pub revision: String,
}

/// One typed message delivered on a topic subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BusMessage {
    SystemAlert(SystemAlert),
    GuidanceState(GuidanceState),
    RouteEvent(RouteEventKind),
    RouteState(RouteState),
    ActiveRoute { segments: Vec<RouteSegment> },
    /// Full capability list broadcast; last message wins, no diffing.
    AvailablePlugins(Vec<Capability>),
    RobotStatus { robot_active: bool, robot_enabled: bool },
    SpeedAccel { speed_mps: f64, max_accel: f64 },
    CanSpeed { speed_mps: f64 },
    CanEngineSpeed { rpm: f64 },
    FilteredVelocity { speed_mps: f64 },
    AccEngaged(bool),
    LateralControl { axle_angle: f64, max_axle_angle_rate: f64, max_accel: f64 },
    Diagnostic {
        name: String,
        message: String,
        hardware_id: String,
        primed: Option<bool>,
    },
    DriverDiscovery { position: bool, status: DriverStatusKind },
    ControllingPlugins { longitudinal_plugin: String, lateral_plugin: String },
    Bsm { id: String, latitude: f64, longitude: f64 },
    /// Comm-activity tick; `inbound` distinguishes the direction.
    CommActivity { inbound: bool },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::SystemAlertKind;

    #[test]
    fn driver_status_codes_map() {
        assert_eq!(DriverStatusKind::from_code(0), DriverStatusKind::Off);
        assert_eq!(DriverStatusKind::from_code(1), DriverStatusKind::Operational);
        assert_eq!(DriverStatusKind::from_code(2), DriverStatusKind::Degraded);
        assert_eq!(DriverStatusKind::from_code(3), DriverStatusKind::Fault);
        assert_eq!(DriverStatusKind::from_code(8), DriverStatusKind::Unknown(8));
    }

    #[test]
    fn bus_message_serde_roundtrip() {
        let msg = BusMessage::SystemAlert(SystemAlert {
            kind: SystemAlertKind::Ready,
            description: "System is ready.".into(),
        });
        let json = serde_json::to_string(&msg).unwrap();
        let back: BusMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(msg, back);
    }

    #[test]
    fn diagnostic_optional_fields_roundtrip() {
        let msg = BusMessage::Diagnostic {
            name: "srx_controller".into(),
            message: "ok".into(),
            hardware_id: "srx-1".into(),
            primed: None,
        };
        let json = serde_json::to_string(&msg).unwrap();
        let back: BusMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(msg, back);
    }
}

//! Route records, lifecycle phases, and route service result codes.
//!
//! The route services report numeric error codes. Known codes get a variant;
//! anything else is carried verbatim in `Other` so it can be shown to the
//! operator exactly as received (the defensive default for protocol drift).

use serde::{Deserialize, Serialize};

/// One selectable route as returned by the list-available-routes service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub id: String,
    pub name: String,
    pub valid: bool,
}

/// Lifecycle of route selection, driven by the selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutePhase {
    NoRoute,
    RouteListed,
    RouteSelected,
    RouteStarting,
    RouteActive,
}

/// Result of the set-active-route service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetRouteOutcome {
    NoError,
    NoRoute,
    Other(i32),
}

impl SetRouteOutcome {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::NoError,
            1 => Self::NoRoute,
            other => Self::Other(other),
        }
    }
}

/// Result of the start-active-route service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartRouteOutcome {
    NoError,
    NoActiveRoute,
    InvalidStartingLocation,
    /// The route was already being followed; treated the same as success.
    AlreadyFollowingRoute,
    Other(i32),
}

impl StartRouteOutcome {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::NoError,
            1 => Self::NoActiveRoute,
            2 => Self::InvalidStartingLocation,
            3 => Self::AlreadyFollowingRoute,
            other => Self::Other(other),
        }
    }

    /// Success codes proceed to the capability view.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::NoError | Self::AlreadyFollowingRoute)
    }
}

/// Events published on the route-event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteEventKind {
    RouteCompleted,
    LeftRoute,
    Other(i32),
}

impl RouteEventKind {
    pub fn from_code(code: i32) -> Self {
        match code {
            3 => Self::RouteCompleted,
            4 => Self::LeftRoute,
            other => Self::Other(other),
        }
    }
}

/// Progress snapshot published on the route-state stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteState {
    pub route_id: String,
    pub cross_track: f64,
    pub down_track: f64,
    pub current_segment_id: u32,
    pub segment_speed_limit: f64,
    pub lane_index: Option<i32>,
}

/// One segment of the active route. Only the waypoint coordinates the status
/// view needs; map plotting is outside this core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSegment {
    pub latitude: f64,
    pub longitude: f64,
    pub speed_limit: f64,
}

//! `cav-types` – Shared Vocabulary
//!
//! Domain types exchanged between the operator console core and the vehicle
//! bus. Everything that crosses the bus boundary is decoded into one of these
//! tagged types at the edge and never trusted as an untyped payload
//! downstream.
//!
//! # Modules
//!
//! - [`alert`] – [`SystemAlert`][alert::SystemAlert]: the six-way system-alert
//!   classification that gates all workflow entry.
//! - [`guidance`] – [`GuidanceState`][guidance::GuidanceState] reports from the
//!   automation stack and the [`GuidanceButtonState`][guidance::GuidanceButtonState]
//!   projection the operator sees.
//! - [`route`] – route records, lifecycle phases, and the service result codes
//!   for route selection and start.
//! - [`capability`] – named, versioned capabilities (plugins) and the pure
//!   [`CapabilityId`][capability::CapabilityId] derivation used as the join key
//!   between activation requests and availability reports.
//! - [`message`] – [`BusMessage`][message::BusMessage]: the tagged union of every
//!   topic payload the console subscribes to.
//! - [`error`] – [`ConsoleError`][error::ConsoleError]: the single error taxonomy
//!   spanning transport, protocol, and client-side rejections.

pub mod alert;
pub mod capability;
pub mod error;
pub mod guidance;
pub mod message;
pub mod route;

pub use alert::{SystemAlert, SystemAlertKind};
pub use capability::{Capability, CapabilityId};
pub use error::ConsoleError;
pub use guidance::{GuidanceButtonState, GuidanceState};
pub use message::{BusMessage, DriverStatusKind, SystemVersion};
pub use route::{
    Route, RouteEventKind, RoutePhase, RouteSegment, RouteState, SetRouteOutcome,
    StartRouteOutcome,
};

//! `cav-workflow` – Guidance Engagement Workflow
//!
//! The safety-relevant core of the operator console: decides when vehicle
//! guidance may be enabled, activated, and engaged, and reacts to the
//! asynchronous state reports that can pre-empt the forward flow at any
//! point.
//!
//! Control flow runs [`Orchestrator`] → [`ReadinessGate`] → [`RouteSelector`]
//! → [`EngagementMachine`], while bus events (fatal alerts, guidance
//! shutdown, route departure) feed back in through pump tasks the
//! orchestrator owns.
//!
//! # Modules
//!
//! - [`ui`] – the [`OperatorUi`][ui::OperatorUi] seam replacing DOM, modal,
//!   and audio collaborators.
//! - [`config`] – [`WorkflowConfig`][config::WorkflowConfig]: retry budgets
//!   and deployment parameters.
//! - [`readiness`] – [`ReadinessGate`][readiness::ReadinessGate]: gates all
//!   workflow entry on the system-alert stream.
//! - [`routes`] – [`RouteSelector`][routes::RouteSelector]: route lifecycle
//!   and capability activation with client-side guards.
//! - [`engagement`] – [`EngagementMachine`][engagement::EngagementMachine]:
//!   the two-axis active/engaged state machine behind the guidance button.
//! - [`status`] – [`StatusView`][status::StatusView]: resolver-driven
//!   telemetry fan-in for the status and log views.
//! - [`telemetry`] – `tracing` subscriber setup for embedding hosts.
//! - [`orchestrator`] – [`Orchestrator`][orchestrator::Orchestrator]: the
//!   reentrant connect/reconnect decision point with the
//!   resume-after-reload path.

pub mod config;
pub mod engagement;
pub mod orchestrator;
pub mod readiness;
pub mod routes;
pub mod status;
pub mod telemetry;
pub mod ui;

pub use config::WorkflowConfig;
pub use engagement::{EngagementMachine, ReportFlow, ToggleOutcome};
pub use orchestrator::{Orchestrator, WorkflowStep};
pub use readiness::{ReadinessGate, ReadinessOutcome};
pub use routes::RouteSelector;
pub use status::StatusView;
pub use ui::{OperatorUi, RecordingUi, UiEvent};

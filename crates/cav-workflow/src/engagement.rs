//! [`EngagementMachine`] – the guidance button state machine.
//!
//! The button is the single control for activating, engaging, and
//! disengaging guidance. Its state is driven from two directions: operator
//! toggles (which go out over the bus and only take effect once confirmed)
//! and guidance state reports (which arrive on the bus and are authoritative).
//!
//! Session flags uphold one invariant throughout: `engaged` implies
//! `active`. Clearing `active` clears `engaged` with it; raising `engaged`
//! raises `active`.

use std::sync::Arc;

use cav_bus::BusGateway;
use cav_session::SessionFlags;
use cav_types::{ConsoleError, GuidanceButtonState, GuidanceState};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::ui::OperatorUi;

/// What a confirmed toggle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// Guidance was off and is now active.
    Activated,
    /// Guidance was on and is now shutting down for this session.
    Disengaged,
}

/// Whether guidance report processing can continue after a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFlow {
    Continue,
    /// A SHUTDOWN report. The session is over; stop consuming reports.
    Terminal,
}

pub struct EngagementMachine {
    gateway: Arc<dyn BusGateway>,
    ui: Arc<dyn OperatorUi>,
    flags: SessionFlags,
    selected_widgets: usize,
    // One-shot: fires on the first INACTIVE after an ENGAGED.
    alert_armed: bool,
    engaged_at: Option<DateTime<Utc>>,
}

impl EngagementMachine {
    pub fn new(gateway: Arc<dyn BusGateway>, ui: Arc<dyn OperatorUi>, flags: SessionFlags) -> Self {
        let engaged_at = flags.engaged_since();
        Self {
            gateway,
            ui,
            flags,
            selected_widgets: 0,
            alert_armed: true,
            engaged_at,
        }
    }

    pub fn set_selected_widgets(&mut self, count: usize) {
        self.selected_widgets = count;
    }

    /// Whether the button may be enabled: a route is selected, at least one
    /// capability is active, and the operator has a populated layout.
    pub fn precondition(&self, route_selected: bool, active_capabilities: usize) -> bool {
        route_selected && active_capabilities > 0 && self.selected_widgets > 0
    }

    /// Re-project the button from the current session flags.
    pub fn refresh(&self, route_selected: bool, active_capabilities: usize) {
        if self.flags.guidance_active() {
            return;
        }
        let state = if self.precondition(route_selected, active_capabilities) {
            GuidanceButtonState::Enabled
        } else {
            GuidanceButtonState::Disabled
        };
        self.ui.set_button(state);
    }

    /// Operator toggle. The requested value is the opposite of the current
    /// `active` flag; nothing changes locally unless the bus confirms exactly
    /// that value.
    pub async fn toggle(&mut self) -> Result<ToggleOutcome, ConsoleError> {
        let requested = !self.flags.guidance_active();
        let confirmed = self.gateway.set_guidance_active(requested).await?;

        if confirmed != requested {
            warn!(requested, confirmed, "guidance toggle not confirmed");
            self.ui
                .status("Guidance failed to set the value, please try again.");
            return Err(ConsoleError::GuidanceToggleRejected { requested });
        }

        if requested {
            self.apply(GuidanceButtonState::Active);
            Ok(ToggleOutcome::Activated)
        } else {
            self.apply(GuidanceButtonState::Disengaged);
            Ok(ToggleOutcome::Disengaged)
        }
    }

    /// Drive the machine from a bus guidance state report.
    pub fn on_guidance_report(&mut self, state: GuidanceState) -> ReportFlow {
        match state {
            GuidanceState::Startup => {
                self.ui.status("Guidance is starting up.");
                ReportFlow::Continue
            }
            // Readiness is announced via system alerts; the report alone
            // changes nothing.
            GuidanceState::DriversReady => ReportFlow::Continue,
            GuidanceState::Active => {
                self.apply(GuidanceButtonState::Active);
                ReportFlow::Continue
            }
            GuidanceState::Engaged => {
                self.apply(GuidanceButtonState::Engaged);
                ReportFlow::Continue
            }
            GuidanceState::Inactive => {
                self.apply(GuidanceButtonState::Inactive);
                ReportFlow::Continue
            }
            GuidanceState::Shutdown => {
                info!("guidance reported shutdown");
                // Vehicle-initiated, not an operator disengage; the notice
                // must say so.
                self.flags.set_guidance_active(false);
                self.ui.takeover(
                    "System received a Guidance SHUTDOWN message. \
                     PLEASE TAKE MANUAL CONTROL OF THE VEHICLE.",
                );
                self.ui.set_button(GuidanceButtonState::Disengaged);
                ReportFlow::Terminal
            }
            GuidanceState::Unknown(code) => {
                debug!(code, "unrecognized guidance state report");
                ReportFlow::Continue
            }
        }
    }

    /// Apply a button state: update the session flags, fire one-shot side
    /// effects, and project onto the UI.
    pub fn apply(&mut self, state: GuidanceButtonState) {
        match state {
            GuidanceButtonState::Disabled | GuidanceButtonState::Enabled => {
                self.flags.set_guidance_active(false);
            }
            GuidanceButtonState::Active => {
                self.flags.set_guidance_active(true);
                self.flags.set_guidance_engaged(false);
            }
            GuidanceButtonState::Engaged => {
                self.flags.set_guidance_engaged(true);
                self.alert_armed = true;
                if self.engaged_at.is_none() {
                    let now = Utc::now();
                    self.flags.mark_engaged_start(now);
                    self.engaged_at = self.flags.engaged_since().or(Some(now));
                }
            }
            GuidanceButtonState::Inactive => {
                self.flags.set_guidance_active(false);
                if self.alert_armed {
                    self.alert_armed = false;
                    self.ui.play_alert();
                    self.ui.status(
                        "Guidance has gone inactive. Please take manual control of the vehicle.",
                    );
                }
            }
            GuidanceButtonState::Disengaged => {
                self.flags.set_guidance_active(false);
                self.ui.takeover(
                    "You are disengaging guidance. Please take manual control of the vehicle.",
                );
            }
        }
        self.ui.set_button(state);
    }

    /// Elapsed engaged time as `NNh NNm NNs`, or `None` before the first
    /// ENGAGED of the session.
    pub fn engaged_elapsed(&self, now: DateTime<Utc>) -> Option<String> {
        let since = self.engaged_at?;
        let elapsed = (now - since).max(Duration::zero());
        let total = elapsed.num_seconds();
        Some(format!(
            "{:02}h {:02}m {:02}s",
            total / 3600,
            (total % 3600) / 60,
            total % 60
        ))
    }
}

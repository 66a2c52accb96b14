//! [`OperatorUi`] – the presentation seam.
//!
//! Rendering, modals, and audio are external collaborators; the workflow only
//! emits intent through this trait. A deployment binds it to its actual
//! front end; tests use [`RecordingUi`] and assert on the recorded events.

use std::sync::Mutex;

use cav_types::{CapabilityId, GuidanceButtonState, Route};

/// Everything the workflow is allowed to tell the operator.
pub trait OperatorUi: Send + Sync {
    /// Replace the capabilities status line.
    fn status(&self, message: &str);

    /// Append a line to the scrolling log view.
    fn log_line(&self, message: &str);

    /// Project the guidance button state.
    fn set_button(&self, state: GuidanceButtonState);

    /// Blocking manual-control notice. Irrecoverable for this session.
    fn takeover(&self, message: &str);

    /// One-shot audible alert. Re-arming is the caller's concern.
    fn play_alert(&self);

    /// Upsert a key/value row in a status table.
    fn table_row(&self, table: &str, key: &str, value: String);

    /// Present the route choices.
    fn show_route_options(&self, routes: &[Route]);

    /// Snap a route selection affordance back to unselected.
    fn revert_route_selection(&self, route_id: &str);

    /// Sync a capability control to an activation state.
    fn capability_state(&self, id: &CapabilityId, activated: bool);

    /// Mark a capability's availability report.
    fn capability_available(&self, id: &CapabilityId, available: bool);
}

/// One recorded UI interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Status(String),
    Log(String),
    Button(GuidanceButtonState),
    Takeover(String),
    Alert,
    Row { table: String, key: String, value: String },
    RoutesShown(usize),
    RouteReverted(String),
    CapabilityState { id: CapabilityId, activated: bool },
    CapabilityAvailable { id: CapabilityId, available: bool },
}

/// Test double recording every interaction in order.
#[derive(Default)]
pub struct RecordingUi {
    events: Mutex<Vec<UiEvent>>,
}

impl RecordingUi {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, event: UiEvent) {
        self.events.lock().expect("ui log poisoned").push(event);
    }

    pub fn events(&self) -> Vec<UiEvent> {
        self.events.lock().expect("ui log poisoned").clone()
    }

    /// The most recently projected button state, if any.
    pub fn last_button(&self) -> Option<GuidanceButtonState> {
        self.events()
            .into_iter()
            .rev()
            .find_map(|event| match event {
                UiEvent::Button(state) => Some(state),
                _ => None,
            })
    }

    pub fn alert_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, UiEvent::Alert))
            .count()
    }

    pub fn takeover_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, UiEvent::Takeover(_)))
            .count()
    }

    /// Whether any status line contains `needle`.
    pub fn saw_status_containing(&self, needle: &str) -> bool {
        self.events().iter().any(|event| {
            matches!(event, UiEvent::Status(message) if message.contains(needle))
        })
    }
}

impl OperatorUi for RecordingUi {
    fn status(&self, message: &str) {
        self.push(UiEvent::Status(message.to_string()));
    }

    fn log_line(&self, message: &str) {
        self.push(UiEvent::Log(message.to_string()));
    }

    fn set_button(&self, state: GuidanceButtonState) {
        self.push(UiEvent::Button(state));
    }

    fn takeover(&self, message: &str) {
        self.push(UiEvent::Takeover(message.to_string()));
    }

    fn play_alert(&self) {
        self.push(UiEvent::Alert);
    }

    fn table_row(&self, table: &str, key: &str, value: String) {
        self.push(UiEvent::Row {
            table: table.to_string(),
            key: key.to_string(),
            value,
        });
    }

    fn show_route_options(&self, routes: &[Route]) {
        self.push(UiEvent::RoutesShown(routes.len()));
    }

    fn revert_route_selection(&self, route_id: &str) {
        self.push(UiEvent::RouteReverted(route_id.to_string()));
    }

    fn capability_state(&self, id: &CapabilityId, activated: bool) {
        self.push(UiEvent::CapabilityState {
            id: id.clone(),
            activated,
        });
    }

    fn capability_available(&self, id: &CapabilityId, available: bool) {
        self.push(UiEvent::CapabilityAvailable {
            id: id.clone(),
            available,
        });
    }
}

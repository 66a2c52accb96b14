//! [`Orchestrator`] – the reentrant workflow entry point.
//!
//! Every (re)connection funnels through [`Orchestrator::evaluate_next_step`],
//! which inspects the persisted session flags and decides whether this is a
//! fresh session (list routes, wait for the operator) or a resume after a
//! console reload mid-drive (rebuild capabilities and monitors without
//! touching the vehicle's state).
//!
//! The orchestrator owns every pump task. Aborting a pump is also what drops
//! its topic subscription.

use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use cav_bus::{BusGateway, Topic};
use cav_session::SessionFlags;
use cav_types::{BusMessage, ConsoleError, Route, RouteEventKind, RouteState};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::WorkflowConfig;
use crate::engagement::{EngagementMachine, ReportFlow, ToggleOutcome};
use crate::readiness::{ReadinessGate, ReadinessOutcome};
use crate::routes::RouteSelector;
use crate::status::StatusView;
use crate::ui::OperatorUi;

/// What the workflow decided to do on (re)connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStep {
    /// Terminal alert or exhausted readiness budget. Nothing started.
    Halted,
    /// Fresh session: routes are listed and the operator must pick one.
    AwaitingRouteSelection,
    /// A mid-drive session was restored from the persisted flags.
    Resumed,
}

pub struct Orchestrator {
    gateway: Arc<dyn BusGateway>,
    ui: Arc<dyn OperatorUi>,
    flags: SessionFlags,
    config: WorkflowConfig,
    selector: Arc<Mutex<RouteSelector>>,
    machine: Arc<Mutex<EngagementMachine>>,
    status: StatusView,
    // Shared with the guidance pump so a SHUTDOWN report can cut it.
    alert_monitor: Arc<StdMutex<Option<JoinHandle<()>>>>,
    guidance_monitor: Option<JoinHandle<()>>,
    route_monitor: Option<JoinHandle<()>>,
    availability_monitor: Option<JoinHandle<()>>,
}

impl Orchestrator {
    pub fn new(
        gateway: Arc<dyn BusGateway>,
        ui: Arc<dyn OperatorUi>,
        flags: SessionFlags,
        config: WorkflowConfig,
    ) -> Self {
        let selector = Arc::new(Mutex::new(RouteSelector::new(
            Arc::clone(&gateway),
            Arc::clone(&ui),
            flags.clone(),
        )));
        let machine = Arc::new(Mutex::new(EngagementMachine::new(
            Arc::clone(&gateway),
            Arc::clone(&ui),
            flags.clone(),
        )));
        let status = StatusView::new(Arc::clone(&gateway), Arc::clone(&ui));
        Self {
            gateway,
            ui,
            flags,
            config,
            selector,
            machine,
            status,
            alert_monitor: Arc::new(StdMutex::new(None)),
            guidance_monitor: None,
            route_monitor: None,
            availability_monitor: None,
        }
    }

    /// Inspect the session and start whichever flow applies. Reentrant: each
    /// (re)connection calls this again, and every decision derives from the
    /// persisted flags, never from in-memory leftovers. Monitors from the
    /// previous connection are torn down first so reconnects never stack
    /// duplicate pumps.
    pub async fn evaluate_next_step(&mut self) -> Result<WorkflowStep, ConsoleError> {
        self.stop_monitors();

        let mut gate = ReadinessGate::new(
            self.gateway.as_ref(),
            self.flags.clone(),
            Arc::clone(&self.ui),
        );
        match gate.await_ready(&self.config).await {
            ReadinessOutcome::Terminal | ReadinessOutcome::TimedOut => {
                return Ok(WorkflowStep::Halted);
            }
            ReadinessOutcome::Ready => {
                self.spawn_alert_monitor(gate);
            }
        }

        self.status.start().await?;
        self.status.show_system_version().await?;
        self.status
            .show_host_instructions(&self.config.host_instructions_param)
            .await?;

        self.spawn_guidance_monitor();
        self.spawn_route_monitor();

        match self.flags.selected_route() {
            None => {
                self.selector.lock().await.list_routes().await?;
                Ok(WorkflowStep::AwaitingRouteSelection)
            }
            Some(route_name) => {
                info!(route = %route_name, "resuming persisted session");
                let active = {
                    let mut selector = self.selector.lock().await;
                    selector.load_capabilities().await?;
                    selector.active_count()
                };
                self.machine.lock().await.refresh(true, active);
                if self.flags.guidance_active() {
                    self.spawn_availability_monitor();
                }
                Ok(WorkflowStep::Resumed)
            }
        }
    }

    /// Operator picked a route: activate and start it, then load the
    /// capabilities that go with it.
    pub async fn select_route(&mut self, route: &Route) -> Result<(), ConsoleError> {
        {
            let mut selector = self.selector.lock().await;
            selector.select_route(route).await?;
            selector.load_capabilities().await?;
        }
        self.refresh_button().await;
        Ok(())
    }

    /// Operator toggled a capability. The engaged flag decides which
    /// client-side guards apply.
    pub async fn toggle_capability(
        &mut self,
        id: &cav_types::CapabilityId,
        desired: bool,
    ) -> Result<bool, ConsoleError> {
        let engaged = self.flags.guidance_engaged();
        let confirmed = self
            .selector
            .lock()
            .await
            .toggle_capability(id, desired, engaged)
            .await?;
        self.refresh_button().await;
        Ok(confirmed)
    }

    /// Operator pressed the guidance button.
    pub async fn toggle_guidance(&mut self) -> Result<ToggleOutcome, ConsoleError> {
        let outcome = self.machine.lock().await.toggle().await?;
        match outcome {
            ToggleOutcome::Activated => {
                self.spawn_availability_monitor();
                // Topic identity is stable, so re-attaching after a halt is
                // safe and the no-op case is cheap.
                if !self.status.is_running() {
                    self.status.start().await?;
                }
            }
            ToggleOutcome::Disengaged => {
                if let Some(handle) = self.availability_monitor.take() {
                    handle.abort();
                }
            }
        }
        Ok(outcome)
    }

    /// Operator changed the widget layout; the engagement precondition
    /// depends on it.
    pub async fn set_selected_widgets(&mut self, count: usize) {
        self.machine.lock().await.set_selected_widgets(count);
        self.refresh_button().await;
    }

    /// Transport loss. Everything stops; the operator must take over.
    pub fn on_connection_closed(&mut self) {
        warn!("vehicle bus connection closed");
        self.stop_monitors();
        self.ui.takeover(
            "Connection to the vehicle bus was lost. \
             PLEASE TAKE MANUAL CONTROL OF THE VEHICLE.",
        );
    }

    async fn refresh_button(&self) {
        let (route_selected, active) = {
            let selector = self.selector.lock().await;
            (
                self.flags.selected_route().is_some(),
                selector.active_count(),
            )
        };
        self.machine.lock().await.refresh(route_selected, active);
    }

    fn stop_monitors(&mut self) {
        if let Some(handle) = self.alert_monitor.lock().expect("monitor slot poisoned").take() {
            handle.abort();
        }
        for handle in [
            self.guidance_monitor.take(),
            self.route_monitor.take(),
            self.availability_monitor.take(),
        ]
        .into_iter()
        .flatten()
        {
            handle.abort();
        }
        self.status.stop();
    }

    // ── Pump tasks ─────────────────────────────────────────────────────────

    /// Keep the opened gate classifying alerts for the rest of the session.
    fn spawn_alert_monitor(&self, mut gate: ReadinessGate) {
        let Some(mut alerts) = gate.take_alerts() else {
            return;
        };
        let handle = tokio::spawn(async move {
            loop {
                match alerts.recv().await {
                    Ok(BusMessage::SystemAlert(alert)) => {
                        if gate.classify(&alert) == Some(ReadinessOutcome::Terminal) {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "alert monitor lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
        *self.alert_monitor.lock().expect("monitor slot poisoned") = Some(handle);
    }

    fn spawn_guidance_monitor(&mut self) {
        let mut rx = self.gateway.subscribe(&Topic::GuidanceState);
        let machine = Arc::clone(&self.machine);
        let alert_monitor = Arc::clone(&self.alert_monitor);
        self.guidance_monitor = Some(tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(BusMessage::GuidanceState(state)) => {
                        let flow = machine.lock().await.on_guidance_report(state);
                        if flow == ReportFlow::Terminal {
                            // Session over: the alert monitor goes with it.
                            if let Some(handle) =
                                alert_monitor.lock().expect("monitor slot poisoned").take()
                            {
                                handle.abort();
                            }
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "guidance monitor lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }));
    }

    fn spawn_route_monitor(&mut self) {
        let mut events = self.gateway.subscribe(&Topic::RouteEvent);
        let mut states = self.gateway.subscribe(&Topic::RouteState);
        let mut active = self.gateway.subscribe(&Topic::ActiveRoute);
        let ui = Arc::clone(&self.ui);
        self.route_monitor = Some(tokio::spawn(async move {
            // The active-route geometry is latched; later rebroadcasts of the
            // same route carry nothing new.
            let mut segments_reported = false;
            loop {
                let message = tokio::select! {
                    message = events.recv() => message,
                    message = states.recv() => message,
                    message = active.recv() => message,
                };
                match message {
                    Ok(BusMessage::RouteEvent(RouteEventKind::RouteCompleted)) => {
                        ui.takeover(
                            "Route has been completed. \
                             PLEASE TAKE MANUAL CONTROL OF THE VEHICLE.",
                        );
                    }
                    Ok(BusMessage::RouteEvent(RouteEventKind::LeftRoute)) => {
                        ui.takeover(
                            "Vehicle has left the route. \
                             PLEASE TAKE MANUAL CONTROL OF THE VEHICLE.",
                        );
                    }
                    Ok(BusMessage::RouteEvent(RouteEventKind::Other(code))) => {
                        warn!(code, "unrecognized route event");
                    }
                    Ok(BusMessage::RouteState(state)) => render_route_state(ui.as_ref(), &state),
                    Ok(BusMessage::ActiveRoute { segments }) => {
                        // Empty segment lists do get reported.
                        if !segments_reported {
                            ui.table_row("route", "Segments", segments.len().to_string());
                            segments_reported = !segments.is_empty();
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "route monitor lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }));
    }

    fn spawn_availability_monitor(&mut self) {
        if self.availability_monitor.is_some() {
            return;
        }
        let mut rx = self.gateway.subscribe(&Topic::AvailablePlugins);
        let selector = Arc::clone(&self.selector);
        self.availability_monitor = Some(tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(BusMessage::AvailablePlugins(report)) => {
                        selector.lock().await.apply_availability(report);
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "availability monitor lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }));
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.stop_monitors();
    }
}

fn render_route_state(ui: &dyn OperatorUi, state: &RouteState) {
    ui.table_row("route", "Segment", state.current_segment_id.to_string());
    ui.table_row("route", "Down Track", format!("{:.1} m", state.down_track));
    ui.table_row("route", "Cross Track", format!("{:.1} m", state.cross_track));
    ui.table_row(
        "route",
        "Speed Limit",
        format!("{:.1} m/s", state.segment_speed_limit),
    );
    if let Some(lane) = state.lane_index {
        ui.table_row("route", "Lane", lane.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cav_bus::ScriptedGateway;
    use cav_session::MemoryStore;
    use cav_types::{Capability, CapabilityId, GuidanceState};
    use tokio::task::yield_now;

    use crate::ui::{RecordingUi, UiEvent};

    struct Harness {
        gateway: Arc<ScriptedGateway>,
        ui: Arc<RecordingUi>,
        flags: SessionFlags,
        orchestrator: Orchestrator,
    }

    fn harness() -> Harness {
        let gateway = Arc::new(ScriptedGateway::new());
        let ui = Arc::new(RecordingUi::new());
        let flags = SessionFlags::new(Arc::new(MemoryStore::new()));
        // The readiness handshake is covered by the gate's own tests.
        flags.set_system_alert_ready(true);
        let orchestrator = Orchestrator::new(
            gateway.clone(),
            ui.clone(),
            flags.clone(),
            WorkflowConfig::default(),
        );
        Harness { gateway, ui, flags, orchestrator }
    }

    fn capability(name: &str, activated: bool) -> Capability {
        Capability {
            name: name.to_string(),
            version: "1.0".to_string(),
            activated,
            required: false,
            available: false,
        }
    }

    #[tokio::test]
    async fn fresh_session_lists_routes() -> Result<(), ConsoleError> {
        let mut h = harness();
        h.gateway.set_routes(vec![Route {
            id: "r1".into(),
            name: "Route A".into(),
            valid: true,
        }]);

        let step = h.orchestrator.evaluate_next_step().await?;
        assert_eq!(step, WorkflowStep::AwaitingRouteSelection);
        assert_eq!(h.gateway.call_count("list_available_routes"), 1);
        assert!(h.ui.events().contains(&UiEvent::RoutesShown(1)));
        Ok(())
    }

    #[tokio::test]
    async fn persisted_route_resumes_without_relisting() -> Result<(), ConsoleError> {
        let mut h = harness();
        h.flags.set_selected_route("Route A");
        h.flags.set_guidance_active(true);
        h.gateway.set_plugins(vec![capability("Route Following", true)]);

        let step = h.orchestrator.evaluate_next_step().await?;
        assert_eq!(step, WorkflowStep::Resumed);
        assert_eq!(h.gateway.call_count("list_available_routes"), 0);
        assert_eq!(h.gateway.call_count("get_registered_plugins"), 1);
        // Mid-drive resume re-attaches the availability and route streams.
        assert_eq!(h.gateway.call_count("subscribe AvailablePlugins"), 1);
        assert_eq!(h.gateway.call_count("subscribe ActiveRoute"), 1);
        Ok(())
    }

    #[tokio::test]
    async fn resume_without_active_guidance_skips_availability_stream(
    ) -> Result<(), ConsoleError> {
        let mut h = harness();
        h.flags.set_selected_route("Route A");
        h.gateway.set_plugins(vec![capability("Route Following", true)]);

        let step = h.orchestrator.evaluate_next_step().await?;
        assert_eq!(step, WorkflowStep::Resumed);
        assert_eq!(h.gateway.call_count("subscribe AvailablePlugins"), 0);
        Ok(())
    }

    #[tokio::test]
    async fn route_completion_demands_takeover() -> Result<(), ConsoleError> {
        let mut h = harness();
        h.gateway.set_routes(vec![Route {
            id: "r1".into(),
            name: "Route A".into(),
            valid: true,
        }]);
        h.orchestrator.evaluate_next_step().await?;

        h.gateway
            .publish(
                &Topic::RouteEvent,
                BusMessage::RouteEvent(RouteEventKind::RouteCompleted),
            )
            .expect("route monitor subscribed");
        yield_now().await;

        assert_eq!(h.ui.takeover_count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn reconnect_replaces_monitors_instead_of_stacking_them() -> Result<(), ConsoleError> {
        let mut h = harness();
        h.gateway.set_routes(vec![Route {
            id: "r1".into(),
            name: "Route A".into(),
            valid: true,
        }]);

        h.orchestrator.evaluate_next_step().await?;
        h.orchestrator.evaluate_next_step().await?;
        // Let the first connection's aborted pumps actually wind down.
        for _ in 0..8 {
            yield_now().await;
        }

        h.gateway
            .publish(
                &Topic::RouteEvent,
                BusMessage::RouteEvent(RouteEventKind::LeftRoute),
            )
            .expect("route monitor subscribed");
        yield_now().await;

        // One event, one notice, however many reconnects preceded it.
        assert_eq!(h.ui.takeover_count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn guidance_toggle_attaches_availability_stream() -> Result<(), ConsoleError> {
        let mut h = harness();
        h.flags.set_selected_route("Route A");
        h.gateway.set_plugins(vec![capability("Lane Keep", true)]);
        h.orchestrator.evaluate_next_step().await?;

        let outcome = h.orchestrator.toggle_guidance().await?;
        assert_eq!(outcome, ToggleOutcome::Activated);

        let mut available = capability("Lane Keep", true);
        available.available = true;
        h.gateway
            .publish(
                &Topic::AvailablePlugins,
                BusMessage::AvailablePlugins(vec![available]),
            )
            .expect("availability monitor subscribed");
        yield_now().await;

        let id = CapabilityId::derive("Lane Keep", "1.0");
        assert!(h.ui.events().contains(&UiEvent::CapabilityAvailable { id, available: true }));
        Ok(())
    }

    #[tokio::test]
    async fn shutdown_report_cuts_the_session() -> Result<(), ConsoleError> {
        let mut h = harness();
        h.flags.set_selected_route("Route A");
        h.gateway.set_plugins(vec![capability("Lane Keep", true)]);
        h.orchestrator.evaluate_next_step().await?;

        h.gateway
            .publish(
                &Topic::GuidanceState,
                BusMessage::GuidanceState(GuidanceState::Shutdown),
            )
            .expect("guidance monitor subscribed");
        for _ in 0..8 {
            yield_now().await;
        }

        assert_eq!(h.ui.takeover_count(), 1);
        assert!(!h.flags.guidance_active());
        assert!(!h.flags.guidance_engaged());
        Ok(())
    }

    #[tokio::test]
    async fn connection_loss_demands_takeover() -> Result<(), ConsoleError> {
        let mut h = harness();
        h.gateway.set_routes(vec![Route {
            id: "r1".into(),
            name: "Route A".into(),
            valid: true,
        }]);
        h.orchestrator.evaluate_next_step().await?;

        h.orchestrator.on_connection_closed();
        assert!(h
            .ui
            .events()
            .iter()
            .any(|event| matches!(event, UiEvent::Takeover(message) if message.contains("Connection"))));
        Ok(())
    }
}

//! [`StatusView`] – live vehicle telemetry projected into status tables.
//!
//! Fixed topics are subscribed directly; driver topics go through the
//! capability resolver first, and a base name no driver advertises is
//! skipped rather than treated as an error. Each subscription gets its own
//! pump task; stopping the view aborts the pumps, which is also what
//! unsubscribes them.

use std::sync::Arc;

use cav_bus::{resolve_topic, BusGateway, Topic, TopicReceiver};
use cav_types::{BusMessage, ConsoleError, DriverStatusKind};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::ui::OperatorUi;

/// Speeds arrive in meters per second; operators read miles per hour.
pub const METER_TO_MPH: f64 = 2.23694;

const TBN_ROBOT_STATUS: &str = "control/robot_status";
const TBN_CMD_SPEED: &str = "control/cmd_speed";
const TBN_CMD_LATERAL: &str = "control/cmd_lateral";
const TBN_ENGINE_SPEED: &str = "can/engine_speed";
const TBN_CAN_SPEED: &str = "can/speed";
const TBN_ACC_ENGAGED: &str = "can/acc_engaged";
const TBN_INBOUND_COMMS: &str = "comms/inbound_binary_msg";
const TBN_OUTBOUND_COMMS: &str = "comms/outbound_binary_msg";

const DRIVER_BASE_NAMES: [&str; 8] = [
    TBN_ROBOT_STATUS,
    TBN_CMD_SPEED,
    TBN_CMD_LATERAL,
    TBN_ENGINE_SPEED,
    TBN_CAN_SPEED,
    TBN_ACC_ENGAGED,
    TBN_INBOUND_COMMS,
    TBN_OUTBOUND_COMMS,
];

const FIXED_TOPICS: [Topic; 5] = [
    Topic::FilteredVelocity,
    Topic::Diagnostics,
    Topic::DriverDiscovery,
    Topic::ControllingPlugins,
    Topic::IncomingBsm,
];

/// Subscribes the telemetry topics and keeps the status tables current.
pub struct StatusView {
    gateway: Arc<dyn BusGateway>,
    ui: Arc<dyn OperatorUi>,
    handles: Vec<JoinHandle<()>>,
}

impl StatusView {
    pub fn new(gateway: Arc<dyn BusGateway>, ui: Arc<dyn OperatorUi>) -> Self {
        Self {
            gateway,
            ui,
            handles: Vec::new(),
        }
    }

    /// Resolve and subscribe every telemetry topic, one pump task each.
    pub async fn start(&mut self) -> Result<(), ConsoleError> {
        for topic in FIXED_TOPICS {
            let rx = self.gateway.subscribe(&topic);
            self.spawn_pump(rx);
        }

        for base_name in DRIVER_BASE_NAMES {
            match resolve_topic(self.gateway.as_ref(), base_name).await? {
                Some(resolved) => {
                    let rx = self.gateway.subscribe(&Topic::Resolved(resolved));
                    self.spawn_pump(rx);
                }
                None => continue,
            }
        }

        info!(pumps = self.handles.len(), "status view started");
        Ok(())
    }

    /// Abort every pump task, which also drops their subscriptions.
    pub fn stop(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        !self.handles.is_empty()
    }

    fn spawn_pump(&mut self, mut rx: TopicReceiver) {
        let ui = Arc::clone(&self.ui);
        self.handles.push(tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(message) => render(ui.as_ref(), message),
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(topic = ?rx.topic(), skipped, "telemetry pump lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }));
    }

    /// Fetch and display the deployed system name and revision.
    pub async fn show_system_version(&self) -> Result<(), ConsoleError> {
        let version = self.gateway.get_system_version().await?;
        self.ui.table_row("system", "Name", version.system_name);
        self.ui.table_row("system", "Version", version.revision);
        Ok(())
    }

    /// Show deployment-configured host instructions, if any are set.
    pub async fn show_host_instructions(&self, parameter: &str) -> Result<(), ConsoleError> {
        if let Some(instructions) = self.gateway.get_parameter(parameter).await? {
            self.ui.log_line(&instructions);
        }
        Ok(())
    }
}

fn mph(speed_mps: f64) -> f64 {
    speed_mps * METER_TO_MPH
}

fn render(ui: &dyn OperatorUi, message: BusMessage) {
    match message {
        BusMessage::RobotStatus { robot_active, robot_enabled } => {
            let state = match (robot_enabled, robot_active) {
                (false, _) => "Disabled",
                (true, false) => "Enabled",
                (true, true) => "Engaged",
            };
            ui.table_row("vehicle", "Controller", state.to_string());
        }
        BusMessage::SpeedAccel { speed_mps, max_accel } => {
            ui.table_row(
                "vehicle",
                "Cmd Speed",
                format!("{:.2} m/s ({:.1} MPH)", speed_mps, mph(speed_mps)),
            );
            ui.table_row("vehicle", "Max Accel", format!("{max_accel:.2} m/s²"));
        }
        BusMessage::CanSpeed { speed_mps } => {
            ui.table_row("vehicle", "Actual Speed", format!("{:.1} MPH", mph(speed_mps)));
        }
        BusMessage::CanEngineSpeed { rpm } => {
            ui.table_row("vehicle", "Engine Speed", format!("{rpm:.0} RPM"));
        }
        BusMessage::FilteredVelocity { speed_mps } => {
            ui.table_row("vehicle", "Velocity", format!("{:.1} MPH", mph(speed_mps)));
        }
        BusMessage::AccEngaged(engaged) => {
            let state = if engaged { "Engaged" } else { "Off" };
            ui.table_row("vehicle", "ACC", state.to_string());
        }
        BusMessage::LateralControl { axle_angle, max_axle_angle_rate, max_accel } => {
            ui.table_row("vehicle", "Axle Angle", format!("{axle_angle:.2}°"));
            ui.table_row(
                "vehicle",
                "Max Axle Rate",
                format!("{max_axle_angle_rate:.2}°/s"),
            );
            ui.table_row("vehicle", "Lateral Max Accel", format!("{max_accel:.2} m/s²"));
        }
        BusMessage::Diagnostic { name, message, primed, .. } => {
            let value = match primed {
                Some(primed) => format!("{message} (primed: {primed})"),
                None => message,
            };
            ui.table_row("diagnostics", &name, value);
        }
        BusMessage::DriverDiscovery { position, status } => {
            let role = if position { "Position Driver" } else { "Driver" };
            ui.table_row("diagnostics", role, driver_status_label(status).to_string());
        }
        BusMessage::ControllingPlugins { longitudinal_plugin, lateral_plugin } => {
            ui.table_row("vehicle", "Longitudinal Control", longitudinal_plugin);
            ui.table_row("vehicle", "Lateral Control", lateral_plugin);
        }
        BusMessage::Bsm { id, latitude, longitude } => {
            ui.table_row("comms", &format!("BSM {id}"), format!("{latitude:.6}, {longitude:.6}"));
        }
        BusMessage::CommActivity { inbound } => {
            let direction = if inbound { "Inbound" } else { "Outbound" };
            ui.table_row("comms", direction, "active".to_string());
        }
        // Workflow topics are pumped elsewhere.
        _ => {}
    }
}

fn driver_status_label(status: DriverStatusKind) -> &'static str {
    match status {
        DriverStatusKind::Off => "Off",
        DriverStatusKind::Operational => "Operational",
        DriverStatusKind::Degraded => "Degraded",
        DriverStatusKind::Fault => "Fault",
        DriverStatusKind::Unknown(_) => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cav_bus::ScriptedGateway;
    use tokio::task::yield_now;

    use crate::ui::{RecordingUi, UiEvent};

    fn row_value(ui: &RecordingUi, wanted_key: &str) -> Option<String> {
        ui.events().into_iter().rev().find_map(|event| match event {
            UiEvent::Row { key, value, .. } if key == wanted_key => Some(value),
            _ => None,
        })
    }

    #[tokio::test]
    async fn unadvertised_driver_topics_are_skipped() -> Result<(), ConsoleError> {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.set_driver_topics(vec!["/drivers/srx/control/robot_status".into()]);
        let ui = Arc::new(RecordingUi::new());

        let mut view = StatusView::new(gateway.clone(), ui);
        view.start().await?;

        // Five fixed topics plus the single advertised driver topic.
        assert_eq!(gateway.call_count("subscribe"), 6);
        view.stop();
        Ok(())
    }

    #[tokio::test]
    async fn speeds_are_converted_to_mph() -> Result<(), ConsoleError> {
        let gateway = Arc::new(ScriptedGateway::new());
        let ui = Arc::new(RecordingUi::new());

        let mut view = StatusView::new(gateway.clone(), ui.clone());
        view.start().await?;

        gateway
            .publish(&Topic::FilteredVelocity, BusMessage::FilteredVelocity { speed_mps: 10.0 })
            .expect("pump subscribed");
        yield_now().await;

        // 10 m/s is 22.3694 MPH.
        assert_eq!(row_value(&ui, "Velocity").as_deref(), Some("22.4 MPH"));
        view.stop();
        Ok(())
    }

    #[tokio::test]
    async fn stop_drops_all_subscriptions() -> Result<(), ConsoleError> {
        let gateway = Arc::new(ScriptedGateway::new());
        let ui = Arc::new(RecordingUi::new());

        let mut view = StatusView::new(gateway.clone(), ui);
        view.start().await?;
        assert!(view.is_running());

        view.stop();
        // Aborted pumps drop their receivers on their next poll.
        for _ in 0..8 {
            yield_now().await;
        }
        assert!(!view.is_running());
        // With every receiver gone, publishing has nobody to reach.
        let result = gateway
            .publish(&Topic::FilteredVelocity, BusMessage::FilteredVelocity { speed_mps: 1.0 });
        assert!(result.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn version_rows_show_name_and_revision() -> Result<(), ConsoleError> {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.set_version(cav_types::SystemVersion {
            system_name: "CAV Prototype".into(),
            revision: "3.2.1".into(),
        });
        let ui = Arc::new(RecordingUi::new());

        let view = StatusView::new(gateway, ui.clone());
        view.show_system_version().await?;

        assert_eq!(row_value(&ui, "Name").as_deref(), Some("CAV Prototype"));
        assert_eq!(row_value(&ui, "Version").as_deref(), Some("3.2.1"));
        Ok(())
    }

    #[tokio::test]
    async fn unset_host_instructions_show_nothing() -> Result<(), ConsoleError> {
        let gateway = Arc::new(ScriptedGateway::new());
        let ui = Arc::new(RecordingUi::new());

        let view = StatusView::new(gateway, ui.clone());
        view.show_host_instructions("/ui/host_instructions").await?;

        assert!(ui.events().is_empty());
        Ok(())
    }

    #[test]
    fn robot_status_projects_three_states() {
        let ui = RecordingUi::new();
        render(&ui, BusMessage::RobotStatus { robot_active: false, robot_enabled: false });
        render(&ui, BusMessage::RobotStatus { robot_active: false, robot_enabled: true });
        render(&ui, BusMessage::RobotStatus { robot_active: true, robot_enabled: true });

        let values: Vec<String> = ui
            .events()
            .into_iter()
            .filter_map(|event| match event {
                UiEvent::Row { value, .. } => Some(value),
                _ => None,
            })
            .collect();
        assert_eq!(values, vec!["Disabled", "Enabled", "Engaged"]);
    }
}

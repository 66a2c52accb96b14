//! [`ReadinessGate`] – gates all workflow entry on the system-alert stream.
//!
//! The gate classifies every alert it sees. `READY` lets the workflow
//! proceed; `NOT_READY` (and any unrecognized classification, the fail-safe
//! default) keeps it waiting; `FATAL` and `SHUTDOWN` are terminal – the gate
//! unsubscribes permanently and the operator is told to take manual control.
//!
//! Waiting is a bounded fixed-delay poll loop. Exhausting the attempt budget
//! reports a "please refresh" failure; it never loops indefinitely and never
//! panics.

use std::sync::Arc;

use cav_bus::{BusGateway, Topic, TopicReceiver};
use cav_session::SessionFlags;
use cav_types::{BusMessage, SystemAlert, SystemAlertKind};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::config::WorkflowConfig;
use crate::ui::OperatorUi;

/// How a readiness wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessOutcome {
    /// System reported READY; the workflow may proceed.
    Ready,
    /// Fatal/shutdown alert or transport loss. Never resumed automatically.
    Terminal,
    /// Attempt budget exhausted without READY. Reported, not fatal.
    TimedOut,
}

/// Subscribes to the system-alert stream and decides whether the workflow
/// may proceed.
pub struct ReadinessGate {
    flags: SessionFlags,
    ui: Arc<dyn OperatorUi>,
    /// `None` once the gate has terminally unsubscribed.
    alerts: Option<TopicReceiver>,
}

impl ReadinessGate {
    pub fn new(gateway: &dyn BusGateway, flags: SessionFlags, ui: Arc<dyn OperatorUi>) -> Self {
        Self {
            flags,
            ui,
            alerts: Some(gateway.subscribe(&Topic::SystemAlert)),
        }
    }

    /// Classify one alert, updating the persisted ready flag and the log.
    /// Returns an outcome when the alert settles the wait.
    pub fn classify(&mut self, alert: &SystemAlert) -> Option<ReadinessOutcome> {
        match alert.kind {
            SystemAlertKind::Caution => {
                self.ui
                    .log_line(&format!("System received a CAUTION message. {}", alert.description));
                None
            }
            SystemAlertKind::Warning => {
                self.ui
                    .log_line(&format!("System received a WARNING message. {}", alert.description));
                None
            }
            SystemAlertKind::Fatal => {
                self.alerts = None;
                self.ui.takeover(&format!(
                    "System received a FATAL message. Please wait for system to shut down. {} \
                     PLEASE TAKE MANUAL CONTROL OF THE VEHICLE.",
                    alert.description
                ));
                Some(ReadinessOutcome::Terminal)
            }
            SystemAlertKind::NotReady => {
                self.flags.set_system_alert_ready(false);
                self.ui.log_line(&format!(
                    "System is not ready, please wait and try again. {}",
                    alert.description
                ));
                None
            }
            SystemAlertKind::Ready => {
                self.flags.set_system_alert_ready(true);
                info!("system reported READY");
                self.ui
                    .log_line(&format!("System is ready. {}", alert.description));
                Some(ReadinessOutcome::Ready)
            }
            SystemAlertKind::Shutdown => {
                self.flags.set_system_alert_ready(false);
                self.alerts = None;
                self.ui.takeover(
                    "System is shutting down. PLEASE TAKE MANUAL CONTROL OF THE VEHICLE.",
                );
                Some(ReadinessOutcome::Terminal)
            }
            SystemAlertKind::Unknown(code) => {
                // Fail-safe default: anything unrecognized is not-ready.
                self.flags.set_system_alert_ready(false);
                self.ui.log_line(&format!(
                    "System alert type {code} is unknown. Assuming system is not yet ready. {}",
                    alert.description
                ));
                None
            }
        }
    }

    /// Wait until the system reports READY, a terminal alert arrives, or the
    /// attempt budget runs out.
    pub async fn await_ready(&mut self, config: &WorkflowConfig) -> ReadinessOutcome {
        if self.flags.system_alert_ready() {
            return ReadinessOutcome::Ready;
        }

        for attempt in 1..=config.ready_max_attempts {
            self.ui.status("Awaiting SYSTEM READY status ...");
            info!(attempt, max = config.ready_max_attempts, "waiting for system ready");

            let deadline = tokio::time::sleep(config.ready_retry_delay);
            tokio::pin!(deadline);

            loop {
                let received = {
                    let Some(alerts) = self.alerts.as_mut() else {
                        return ReadinessOutcome::Terminal;
                    };
                    tokio::select! {
                        _ = &mut deadline => break,
                        received = alerts.recv() => received,
                    }
                };
                match received {
                    Ok(BusMessage::SystemAlert(alert)) => {
                        if let Some(outcome) = self.classify(&alert) {
                            return outcome;
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "system-alert subscriber lagged");
                    }
                    Err(RecvError::Closed) => {
                        self.ui.takeover(
                            "Connection to the vehicle bus was lost. \
                             PLEASE TAKE MANUAL CONTROL OF THE VEHICLE.",
                        );
                        return ReadinessOutcome::Terminal;
                    }
                }
            }
        }

        self.ui.status(
            "Sorry, did not receive SYSTEM READY status, please refresh your browser to try again.",
        );
        ReadinessOutcome::TimedOut
    }

    /// Hand the remaining alert subscription to the caller so alerts keep
    /// being monitored after the gate has opened. `None` if terminally
    /// unsubscribed.
    pub fn take_alerts(&mut self) -> Option<TopicReceiver> {
        self.alerts.take()
    }
}

//! The [`BusGateway`] trait – the console's single seam to the vehicle bus.
//!
//! Every request/response interaction is a typed async method; every topic
//! subscription is a [`TopicReceiver`]. Concrete transports (a WebSocket
//! bridge client in deployment, [`ScriptedGateway`][crate::scripted::ScriptedGateway]
//! in tests) implement this trait; the workflow crates only ever hold an
//! `Arc<dyn BusGateway>`.

use async_trait::async_trait;
use cav_types::{
    Capability, ConsoleError, Route, SetRouteOutcome, StartRouteOutcome, SystemVersion,
};

use crate::bus::{Topic, TopicReceiver};

/// Request/response and pub/sub access to the vehicle bus.
///
/// Service calls resolve with the decoded response or a
/// [`ConsoleError::Transport`] when the connection is gone. Protocol-level
/// error codes are part of the typed responses, not of the `Err` channel –
/// a service answering "NO_ROUTE" did answer.
#[async_trait]
pub trait BusGateway: Send + Sync {
    /// List the routes available for selection.
    async fn list_available_routes(&self) -> Result<Vec<Route>, ConsoleError>;

    /// Request activation of one route by identifier.
    async fn set_active_route(&self, route_id: &str) -> Result<SetRouteOutcome, ConsoleError>;

    /// Request start of the previously activated route.
    async fn start_active_route(&self) -> Result<StartRouteOutcome, ConsoleError>;

    /// Fetch the full registered-capability list. Callers rebuild their view
    /// from each response; there is no diffing protocol.
    async fn get_registered_plugins(&self) -> Result<Vec<Capability>, ConsoleError>;

    /// Request (de)activation of one capability. Returns the bus-confirmed
    /// activation state, which may disagree with the request.
    async fn activate_plugin(
        &self,
        name: &str,
        version: &str,
        activated: bool,
    ) -> Result<bool, ConsoleError>;

    /// Request the guidance active flag. Returns the bus-confirmed value,
    /// which may disagree with the request.
    async fn set_guidance_active(&self, active: bool) -> Result<bool, ConsoleError>;

    /// Resolve capability base names to fully-qualified topic names. An empty
    /// result means no driver advertises the capability – a valid answer.
    async fn drivers_with_capabilities(
        &self,
        capabilities: &[String],
    ) -> Result<Vec<String>, ConsoleError>;

    /// Fetch the deployed system name and revision for display.
    async fn get_system_version(&self) -> Result<SystemVersion, ConsoleError>;

    /// Fetch one deployment parameter. `None` when the parameter is unset.
    async fn get_parameter(&self, name: &str) -> Result<Option<String>, ConsoleError>;

    /// Subscribe to a topic. Dropping (or aborting the task that owns) the
    /// receiver is the only unsubscription primitive.
    fn subscribe(&self, topic: &Topic) -> TopicReceiver;
}

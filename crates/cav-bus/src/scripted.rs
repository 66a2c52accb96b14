//! [`ScriptedGateway`] – a scriptable in-process gateway for tests.
//!
//! Service responses are canned ahead of time; topic traffic rides an
//! embedded [`LocalBus`]. Every service call and subscription is appended to
//! a call log so tests can assert not just on outcomes but on which bus
//! interactions happened – including that a rejected action produced zero
//! bus calls.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use cav_types::{
    BusMessage, Capability, ConsoleError, Route, SetRouteOutcome, StartRouteOutcome, SystemVersion,
};

use crate::bus::{LocalBus, Topic, TopicReceiver};
use crate::gateway::BusGateway;

#[derive(Default)]
struct Script {
    routes: Vec<Route>,
    set_route_outcomes: VecDeque<SetRouteOutcome>,
    start_route_outcomes: VecDeque<StartRouteOutcome>,
    plugins: Vec<Capability>,
    activation_results: VecDeque<bool>,
    guidance_results: VecDeque<bool>,
    driver_topics: Vec<String>,
    parameters: HashMap<String, String>,
    version: Option<SystemVersion>,
}

/// Scriptable [`BusGateway`] double. Defaults echo success: route services
/// answer `NO_ERROR`, activation and guidance calls confirm the requested
/// value.
pub struct ScriptedGateway {
    bus: LocalBus,
    script: Mutex<Script>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self {
            bus: LocalBus::default(),
            script: Mutex::new(Script::default()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn record(&self, call: String) {
        self.calls.lock().expect("call log poisoned").push(call);
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().expect("script poisoned")
    }

    // ── Scripting ──────────────────────────────────────────────────────────

    pub fn set_routes(&self, routes: Vec<Route>) {
        self.script().routes = routes;
    }

    pub fn push_set_route_outcome(&self, outcome: SetRouteOutcome) {
        self.script().set_route_outcomes.push_back(outcome);
    }

    pub fn push_start_route_outcome(&self, outcome: StartRouteOutcome) {
        self.script().start_route_outcomes.push_back(outcome);
    }

    pub fn set_plugins(&self, plugins: Vec<Capability>) {
        self.script().plugins = plugins;
    }

    /// Queue the confirmed state of the next activate-plugin call. Without a
    /// queued value the call confirms the requested state.
    pub fn push_activation_result(&self, new_state: bool) {
        self.script().activation_results.push_back(new_state);
    }

    /// Queue the confirmed value of the next set-guidance-active call.
    pub fn push_guidance_result(&self, confirmed: bool) {
        self.script().guidance_results.push_back(confirmed);
    }

    pub fn set_driver_topics(&self, topics: Vec<String>) {
        self.script().driver_topics = topics;
    }

    pub fn set_parameter(&self, name: &str, value: &str) {
        self.script()
            .parameters
            .insert(name.to_string(), value.to_string());
    }

    pub fn set_version(&self, version: SystemVersion) {
        self.script().version = Some(version);
    }

    // ── Introspection ──────────────────────────────────────────────────────

    /// Every service call and subscription so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("call log poisoned").clone()
    }

    /// Count of recorded calls whose log line starts with `prefix`.
    pub fn call_count(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|line| line.starts_with(prefix))
            .count()
    }

    /// Publish a message on the embedded bus, driving subscribers.
    pub fn publish(&self, topic: &Topic, message: BusMessage) -> Result<usize, ConsoleError> {
        self.bus.publish(topic, message)
    }
}

impl Default for ScriptedGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BusGateway for ScriptedGateway {
    async fn list_available_routes(&self) -> Result<Vec<Route>, ConsoleError> {
        self.record("list_available_routes".to_string());
        Ok(self.script().routes.clone())
    }

    async fn set_active_route(&self, route_id: &str) -> Result<SetRouteOutcome, ConsoleError> {
        self.record(format!("set_active_route {route_id}"));
        Ok(self
            .script()
            .set_route_outcomes
            .pop_front()
            .unwrap_or(SetRouteOutcome::NoError))
    }

    async fn start_active_route(&self) -> Result<StartRouteOutcome, ConsoleError> {
        self.record("start_active_route".to_string());
        Ok(self
            .script()
            .start_route_outcomes
            .pop_front()
            .unwrap_or(StartRouteOutcome::NoError))
    }

    async fn get_registered_plugins(&self) -> Result<Vec<Capability>, ConsoleError> {
        self.record("get_registered_plugins".to_string());
        Ok(self.script().plugins.clone())
    }

    async fn activate_plugin(
        &self,
        name: &str,
        version: &str,
        activated: bool,
    ) -> Result<bool, ConsoleError> {
        self.record(format!("activate_plugin {name} {version} {activated}"));
        Ok(self
            .script()
            .activation_results
            .pop_front()
            .unwrap_or(activated))
    }

    async fn set_guidance_active(&self, active: bool) -> Result<bool, ConsoleError> {
        self.record(format!("set_guidance_active {active}"));
        Ok(self.script().guidance_results.pop_front().unwrap_or(active))
    }

    async fn drivers_with_capabilities(
        &self,
        capabilities: &[String],
    ) -> Result<Vec<String>, ConsoleError> {
        self.record(format!("drivers_with_capabilities {capabilities:?}"));
        let script = self.script();
        Ok(script
            .driver_topics
            .iter()
            .filter(|topic| capabilities.iter().any(|cap| topic.ends_with(cap.as_str())))
            .cloned()
            .collect())
    }

    async fn get_system_version(&self) -> Result<SystemVersion, ConsoleError> {
        self.record("get_system_version".to_string());
        Ok(self.script().version.clone().unwrap_or(SystemVersion {
            system_name: "CAV Console".to_string(),
            revision: "dev".to_string(),
        }))
    }

    async fn get_parameter(&self, name: &str) -> Result<Option<String>, ConsoleError> {
        self.record(format!("get_parameter {name}"));
        Ok(self.script().parameters.get(name).cloned())
    }

    fn subscribe(&self, topic: &Topic) -> TopicReceiver {
        self.record(format!("subscribe {topic:?}"));
        self.bus.subscribe(topic)
    }
}

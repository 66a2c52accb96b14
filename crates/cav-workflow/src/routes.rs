//! [`RouteSelector`] – route lifecycle and capability activation.
//!
//! Route selection walks `NO_ROUTE → ROUTE_LISTED → ROUTE_SELECTED →
//! ROUTE_STARTING → ROUTE_ACTIVE`. Every service failure reverts the
//! selection affordance and reports the code – unrecognized codes verbatim,
//! the defensive default for protocol drift.
//!
//! Capability toggles are guarded client-side before any bus call:
//! required capabilities can never be deactivated, and while guidance is
//! engaged the last active capability must stay active. The local view of a
//! toggle is pessimistic – it holds the pre-toggle state until the bus
//! confirms, so a lost response can never leave a stuck-activated control.

use std::sync::Arc;

use cav_bus::BusGateway;
use cav_session::SessionFlags;
use cav_types::{
    Capability, CapabilityId, ConsoleError, Route, RoutePhase, SetRouteOutcome, StartRouteOutcome,
};
use tracing::{info, warn};

use crate::ui::OperatorUi;

/// One capability as locally tracked, keyed by its derived id.
#[derive(Debug, Clone)]
pub struct CapabilityRecord {
    pub id: CapabilityId,
    pub capability: Capability,
}

/// Drives route selection/start and capability activation.
pub struct RouteSelector {
    gateway: Arc<dyn BusGateway>,
    ui: Arc<dyn OperatorUi>,
    flags: SessionFlags,
    phase: RoutePhase,
    capabilities: Vec<CapabilityRecord>,
}

impl RouteSelector {
    pub fn new(gateway: Arc<dyn BusGateway>, ui: Arc<dyn OperatorUi>, flags: SessionFlags) -> Self {
        Self {
            gateway,
            ui,
            flags,
            phase: RoutePhase::NoRoute,
            capabilities: Vec::new(),
        }
    }

    pub fn phase(&self) -> RoutePhase {
        self.phase
    }

    /// Locally tracked capabilities, in bus order.
    pub fn capabilities(&self) -> &[CapabilityRecord] {
        &self.capabilities
    }

    pub fn active_count(&self) -> usize {
        self.capabilities
            .iter()
            .filter(|record| record.capability.activated)
            .count()
    }

    /// Fetch and present the available routes. An empty list is terminal for
    /// this path.
    pub async fn list_routes(&mut self) -> Result<Vec<Route>, ConsoleError> {
        self.ui.status("Awaiting the list of available routes...");
        let routes = self.gateway.list_available_routes().await?;

        if routes.is_empty() {
            self.ui.status(
                "Sorry, there are no available routes, and cannot proceed without one. \
                 Please contact your System Admin.",
            );
            return Err(ConsoleError::NoRoutes);
        }

        self.phase = RoutePhase::RouteListed;
        self.ui.show_route_options(&routes);
        self.ui.status("Please select a route.");
        Ok(routes)
    }

    /// Activate and start `route`. On success the route name is persisted and
    /// the phase reaches [`RoutePhase::RouteActive`]; on failure the
    /// selection affordance is reverted and the phase falls back to
    /// [`RoutePhase::RouteListed`].
    pub async fn select_route(&mut self, route: &Route) -> Result<(), ConsoleError> {
        match self.gateway.set_active_route(&route.id).await? {
            SetRouteOutcome::NoError => {
                self.phase = RoutePhase::RouteSelected;
                self.start_route(route).await
            }
            SetRouteOutcome::NoRoute => {
                self.revert_selection(route, "NO_ROUTE", "Setting the active route failed");
                Err(ConsoleError::Service {
                    service: "set_active_route".to_string(),
                    code: 1,
                })
            }
            SetRouteOutcome::Other(code) => {
                self.revert_selection(route, &code.to_string(), "Setting the active route failed");
                Err(ConsoleError::Service {
                    service: "set_active_route".to_string(),
                    code,
                })
            }
        }
    }

    async fn start_route(&mut self, route: &Route) -> Result<(), ConsoleError> {
        self.phase = RoutePhase::RouteStarting;

        let (description, code) = match self.gateway.start_active_route().await? {
            StartRouteOutcome::NoError | StartRouteOutcome::AlreadyFollowingRoute => {
                self.flags.set_selected_route(&route.name);
                self.phase = RoutePhase::RouteActive;
                info!(route = %route.name, "route active");
                self.ui
                    .status(&format!("Selected route is \"{}\".", route.name));
                return Ok(());
            }
            StartRouteOutcome::NoActiveRoute => ("NO_ACTIVE_ROUTE".to_string(), 1),
            StartRouteOutcome::InvalidStartingLocation => {
                ("INVALID_STARTING_LOCATION".to_string(), 2)
            }
            // Unrecognized codes are stringified and reported verbatim.
            StartRouteOutcome::Other(code) => (code.to_string(), code),
        };
        self.revert_selection(route, &description, "Starting the active route failed");
        Err(ConsoleError::Service {
            service: "start_active_route".to_string(),
            code,
        })
    }

    fn revert_selection(&mut self, route: &Route, description: &str, action: &str) {
        warn!(route = %route.id, code = description, "route service failure");
        self.ui.status(&format!(
            "{action} ({description}). Please try again or contact your System Administrator.",
        ));
        self.ui.table_row("route", "Error Code", description.to_string());
        self.ui.revert_route_selection(&route.id);
        self.phase = RoutePhase::RouteListed;
    }

    /// Rebuild the capability set from the registered-plugin service. Last
    /// response wins; nothing is diffed against the previous set. An empty
    /// list is terminal for this path.
    pub async fn load_capabilities(&mut self) -> Result<usize, ConsoleError> {
        self.ui
            .status("Please select one or more capabilities to activate.");
        let plugins = self.gateway.get_registered_plugins().await?;

        self.capabilities = plugins
            .into_iter()
            .map(|capability| CapabilityRecord {
                id: capability.id(),
                capability,
            })
            .collect();

        if self.capabilities.is_empty() {
            self.ui.status(
                "Sorry, there are no capabilities available, and cannot proceed without one. \
                 Please contact your System Admin.",
            );
            return Err(ConsoleError::NoCapabilities);
        }

        for record in &self.capabilities {
            self.ui
                .capability_state(&record.id, record.capability.activated);
        }
        Ok(self.capabilities.len())
    }

    /// Request (de)activation of one capability.
    ///
    /// Client-side guards reject the request before any bus call:
    /// * a required capability cannot be deactivated;
    /// * while `engaged`, the last active capability cannot be deactivated.
    ///
    /// Otherwise the local control is pessimistically held at its pre-toggle
    /// state, the bus is asked, and the control is corrected to whatever the
    /// bus confirmed.
    pub async fn toggle_capability(
        &mut self,
        id: &CapabilityId,
        desired: bool,
        engaged: bool,
    ) -> Result<bool, ConsoleError> {
        let index = self
            .capabilities
            .iter()
            .position(|record| record.id == *id)
            .ok_or_else(|| ConsoleError::UnknownCapability(id.to_string()))?;

        let record = &self.capabilities[index];
        let previous = record.capability.activated;

        if !desired && record.capability.required {
            self.ui
                .status("Sorry, this capability is required. It cannot be deactivated.");
            self.ui.capability_state(id, previous);
            return Err(ConsoleError::RequiredCapability(record.capability.name.clone()));
        }

        if !desired && engaged && previous && self.active_count() == 1 {
            self.ui.status(
                "Sorry, guidance is engaged and there must be at least one active capability. \
                 You can choose to disengage to deactivate all capabilities.",
            );
            self.ui.capability_state(id, previous);
            return Err(ConsoleError::LastActiveCapability);
        }

        // Pessimistic default: present the pre-toggle state until the bus
        // confirms, so a lost response cannot leave a stuck control.
        self.ui.capability_state(id, previous);

        let (name, version) = {
            let capability = &self.capabilities[index].capability;
            (capability.name.clone(), capability.version.clone())
        };
        let confirmed = self.gateway.activate_plugin(&name, &version, desired).await?;

        if confirmed != desired {
            warn!(capability = %name, desired, confirmed, "capability activation refused");
            self.ui
                .status("Activating the capability failed, please try again.");
        } else {
            self.ui
                .status("Please select one or more capabilities to activate.");
        }

        self.capabilities[index].capability.activated = confirmed;
        self.ui.capability_state(id, confirmed);
        Ok(confirmed)
    }

    /// Apply an availability broadcast. Entries are correlated by derived id;
    /// reports for unknown ids are skipped. An empty report clears the
    /// availability mark on every active entry.
    pub fn apply_availability(&mut self, report: Vec<Capability>) {
        if report.is_empty() {
            for record in &mut self.capabilities {
                if record.capability.activated {
                    record.capability.available = false;
                    self.ui.capability_available(&record.id, false);
                }
            }
            return;
        }

        for reported in report {
            let id = reported.id();
            if let Some(record) = self.capabilities.iter_mut().find(|r| r.id == id) {
                record.capability.available = reported.available;
                self.ui.capability_available(&id, reported.available);
            }
        }
    }
}

//! [`SessionFlags`] – typed accessors over the persisted session flags.
//!
//! Four flags gate the guidance workflow:
//!
//! | Flag | Meaning |
//! |---|---|
//! | `guidance_active` | operator successfully requested automation |
//! | `guidance_engaged` | the vehicle bus confirmed the ENGAGED state |
//! | `system_alert_ready` | most recent terminal system-alert classification |
//! | `selected_route_name` | chosen route, absent until selected |
//!
//! The writer enforces the invariant `engaged ⇒ active`: raising `engaged`
//! raises `active`, and clearing `active` clears `engaged`. No reachable
//! write sequence can leave `engaged=true` next to `active=false`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::store::SessionStore;

const KEY_GUIDANCE_ACTIVE: &str = "guidance_active";
const KEY_GUIDANCE_ENGAGED: &str = "guidance_engaged";
const KEY_SYSTEM_ALERT_READY: &str = "system_alert_ready";
const KEY_SELECTED_ROUTE: &str = "selected_route_name";
const KEY_ENGAGED_SINCE: &str = "engaged_since";

/// Sentinel stored when no route has been chosen yet.
pub const NO_ROUTE_SELECTED: &str = "No Route Selected";

/// Cheaply cloneable handle over the session store. Reads always go to the
/// store; nothing is cached across calls.
#[derive(Clone)]
pub struct SessionFlags {
    store: Arc<dyn SessionStore>,
}

impl SessionFlags {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    fn bool_flag(&self, key: &str) -> bool {
        matches!(self.store.get(key).as_deref(), Some("true"))
    }

    fn set_bool(&self, key: &str, value: bool) {
        self.store.set(key, if value { "true" } else { "false" });
    }

    pub fn guidance_active(&self) -> bool {
        self.bool_flag(KEY_GUIDANCE_ACTIVE)
    }

    /// Set `guidance_active`. Clearing it also clears `guidance_engaged`,
    /// keeping the `engaged ⇒ active` invariant.
    pub fn set_guidance_active(&self, active: bool) {
        self.set_bool(KEY_GUIDANCE_ACTIVE, active);
        if !active && self.bool_flag(KEY_GUIDANCE_ENGAGED) {
            debug!("clearing stale engaged flag with active");
            self.set_bool(KEY_GUIDANCE_ENGAGED, false);
        }
    }

    pub fn guidance_engaged(&self) -> bool {
        self.bool_flag(KEY_GUIDANCE_ENGAGED)
    }

    /// Set `guidance_engaged`. Raising it also raises `guidance_active`.
    pub fn set_guidance_engaged(&self, engaged: bool) {
        if engaged {
            self.set_bool(KEY_GUIDANCE_ACTIVE, true);
        }
        self.set_bool(KEY_GUIDANCE_ENGAGED, engaged);
    }

    pub fn system_alert_ready(&self) -> bool {
        self.bool_flag(KEY_SYSTEM_ALERT_READY)
    }

    pub fn set_system_alert_ready(&self, ready: bool) {
        self.set_bool(KEY_SYSTEM_ALERT_READY, ready);
    }

    /// The selected route name, or `None` while the sentinel (or nothing) is
    /// stored.
    pub fn selected_route(&self) -> Option<String> {
        match self.store.get(KEY_SELECTED_ROUTE) {
            Some(name) if !name.is_empty() && name != NO_ROUTE_SELECTED => Some(name),
            _ => None,
        }
    }

    pub fn set_selected_route(&self, name: &str) {
        self.store.set(KEY_SELECTED_ROUTE, name);
    }

    pub fn clear_selected_route(&self) {
        self.store.remove(KEY_SELECTED_ROUTE);
    }

    /// Timestamp of the first ENGAGED confirmation, for the elapsed timer.
    pub fn engaged_since(&self) -> Option<DateTime<Utc>> {
        self.store
            .get(KEY_ENGAGED_SINCE)
            .and_then(|raw| raw.parse().ok())
    }

    /// Record the engagement start, once. Later calls keep the first value.
    pub fn mark_engaged_start(&self, now: DateTime<Utc>) {
        if self.engaged_since().is_none() {
            self.store.set(KEY_ENGAGED_SINCE, &now.to_rfc3339());
        }
    }

    /// Explicit removal of the guidance flags, used by disengage/logout flows.
    pub fn clear_guidance(&self) {
        self.store.remove(KEY_GUIDANCE_ACTIVE);
        self.store.remove(KEY_GUIDANCE_ENGAGED);
        self.store.remove(KEY_ENGAGED_SINCE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn flags() -> SessionFlags {
        SessionFlags::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn defaults_are_false_and_no_route() {
        let f = flags();
        assert!(!f.guidance_active());
        assert!(!f.guidance_engaged());
        assert!(!f.system_alert_ready());
        assert_eq!(f.selected_route(), None);
    }

    #[test]
    fn engaged_implies_active() {
        let f = flags();
        f.set_guidance_engaged(true);
        assert!(f.guidance_active());
        assert!(f.guidance_engaged());
    }

    #[test]
    fn clearing_active_clears_engaged() {
        let f = flags();
        f.set_guidance_engaged(true);
        f.set_guidance_active(false);
        assert!(!f.guidance_active());
        assert!(!f.guidance_engaged());
    }

    #[test]
    fn sentinel_route_reads_as_none() {
        let f = flags();
        f.set_selected_route(NO_ROUTE_SELECTED);
        assert_eq!(f.selected_route(), None);
        f.set_selected_route("Route A");
        assert_eq!(f.selected_route(), Some("Route A".to_string()));
        f.clear_selected_route();
        assert_eq!(f.selected_route(), None);
    }

    #[test]
    fn flags_survive_reload_over_same_store() {
        // A reload creates fresh accessors over the same backing store.
        let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::new());
        let before = SessionFlags::new(store.clone());
        before.set_guidance_active(true);
        before.set_selected_route("Route A");

        let after = SessionFlags::new(store);
        assert!(after.guidance_active());
        assert_eq!(after.selected_route(), Some("Route A".to_string()));
    }

    #[test]
    fn engaged_start_is_recorded_once() {
        let f = flags();
        let first = Utc::now();
        f.mark_engaged_start(first);
        f.mark_engaged_start(first + chrono::Duration::seconds(30));
        let stored = f.engaged_since().expect("timestamp stored");
        assert_eq!(stored.timestamp(), first.timestamp());
    }

    #[test]
    fn clear_guidance_removes_all_engagement_state() {
        let f = flags();
        f.set_guidance_engaged(true);
        f.mark_engaged_start(Utc::now());
        f.clear_guidance();
        assert!(!f.guidance_active());
        assert!(!f.guidance_engaged());
        assert_eq!(f.engaged_since(), None);
    }
}

//! The session key-value store seam.
//!
//! The console never talks to concrete storage; it goes through
//! [`SessionStore`]. Entries survive until explicitly removed – there is no
//! implicit expiry, which is what makes resume-after-reload possible.

use std::collections::HashMap;
use std::sync::Mutex;

/// String-keyed session storage. Overwrite-latest-wins: callers read fresh on
/// every access and never hold a value across an async boundary they cannot
/// lock.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// In-memory store. One instance models one session; dropping it models the
/// session ending.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .expect("session store poisoned")
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .expect("session store poisoned")
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries
            .lock()
            .expect("session store poisoned")
            .remove(key);
    }
}

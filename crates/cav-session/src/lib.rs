//! `cav-session` – Persisted Session Flags
//!
//! Typed accessors over an injected key-value [`SessionStore`]. The four
//! persisted flags survive a console reload within one session and are the
//! only state the orchestrator may use to resume a workflow mid-flight.
//!
//! # Modules
//!
//! - [`store`] – the [`SessionStore`][store::SessionStore] trait and the
//!   in-memory [`MemoryStore`][store::MemoryStore] implementation.
//! - [`flags`] – [`SessionFlags`][flags::SessionFlags]: typed accessors that
//!   enforce the `engaged ⇒ active` invariant at the writer.

pub mod flags;
pub mod store;

pub use flags::{NO_ROUTE_SELECTED, SessionFlags};
pub use store::{MemoryStore, SessionStore};

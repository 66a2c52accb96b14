//! `cav-bus` – The Bus Boundary
//!
//! Everything the console knows about the vehicle bus lives behind the
//! [`BusGateway`] trait: typed request/response service calls plus typed
//! topic subscriptions. The workflow crates never see transport frames.
//!
//! # Modules
//!
//! - [`bus`] – [`LocalBus`][bus::LocalBus]: in-process, topic-partitioned
//!   publish/subscribe built on [`tokio::sync::broadcast`], preserving
//!   per-topic publish order and guaranteeing nothing across topics.
//! - [`gateway`] – the [`BusGateway`][gateway::BusGateway] trait.
//! - [`resolver`] – capability-name → fully-qualified-topic resolution with
//!   empty-result-means-skip semantics.
//! - [`scripted`] – [`ScriptedGateway`][scripted::ScriptedGateway]: a canned
//!   gateway that records every service call, for tests.

pub mod bus;
pub mod gateway;
pub mod resolver;
pub mod scripted;

pub use bus::{LocalBus, Topic, TopicReceiver};
pub use gateway::BusGateway;
pub use resolver::resolve_topic;
pub use scripted::ScriptedGateway;

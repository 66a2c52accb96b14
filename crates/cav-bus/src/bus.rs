//! In-process, typed, topic-partitioned publish/subscribe bus.
//!
//! Uses [`tokio::sync::broadcast`] channels so every subscriber receives
//! every message on its topic without any single subscriber blocking the
//! others. Messages on one topic arrive in publish order; nothing is
//! guaranteed across topics – subscribers must not assume, for example, that
//! a service response lands before the next availability broadcast.

use std::collections::HashMap;
use std::sync::Mutex;

use cav_types::{BusMessage, ConsoleError};
use tokio::sync::broadcast;

/// Default per-topic channel capacity (buffered messages before old ones are
/// dropped for slow subscribers).
const DEFAULT_CAPACITY: usize = 256;

/// The topics the console subscribes to.
///
/// Fixed lanes carry the guidance workflow traffic; [`Topic::Resolved`]
/// carries a fully-qualified driver topic returned by the capability
/// resolver, whose name is deployment configuration rather than contract.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    SystemAlert,
    AvailablePlugins,
    GuidanceState,
    ActiveRoute,
    RouteState,
    RouteEvent,
    ControllingPlugins,
    DriverDiscovery,
    IncomingBsm,
    FilteredVelocity,
    Diagnostics,
    /// A fully-qualified topic name obtained from the resolver.
    Resolved(String),
}

/// Shared in-process bus. Per-topic channels are created lazily on first
/// publish or subscribe.
pub struct LocalBus {
    capacity: usize,
    channels: Mutex<HashMap<Topic, broadcast::Sender<BusMessage>>>,
}

impl LocalBus {
    /// Create a bus whose topic channels each buffer `capacity` messages.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            channels: Mutex::new(HashMap::new()),
        }
    }

    fn sender(&self, topic: &Topic) -> broadcast::Sender<BusMessage> {
        let mut channels = self.channels.lock().expect("bus channel map poisoned");
        channels
            .entry(topic.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Publish `message` to `topic`.
    ///
    /// Returns the number of active receivers that were handed the message,
    /// or [`ConsoleError::Channel`] when nobody is subscribed.
    pub fn publish(&self, topic: &Topic, message: BusMessage) -> Result<usize, ConsoleError> {
        self.sender(topic)
            .send(message)
            .map_err(|_| ConsoleError::Channel(format!("no subscribers for topic {topic:?}")))
    }

    /// Subscribe to `topic`. Dropping the receiver is the unsubscription
    /// primitive.
    pub fn subscribe(&self, topic: &Topic) -> TopicReceiver {
        TopicReceiver {
            topic: topic.clone(),
            receiver: self.sender(topic).subscribe(),
        }
    }
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// An async receiver bound to a single [`Topic`].
pub struct TopicReceiver {
    topic: Topic,
    receiver: broadcast::Receiver<BusMessage>,
}

impl TopicReceiver {
    /// Wait for the next message on this topic.
    ///
    /// * `Err(RecvError::Lagged(n))` – the subscriber fell behind and `n`
    ///   messages were dropped; the caller decides whether to continue.
    /// * `Err(RecvError::Closed)` – the bus has shut down.
    pub async fn recv(&mut self) -> Result<BusMessage, broadcast::error::RecvError> {
        self.receiver.recv().await
    }

    /// Non-blocking receive, used to drain already-delivered messages.
    pub fn try_recv(&mut self) -> Result<BusMessage, broadcast::error::TryRecvError> {
        self.receiver.try_recv()
    }

    /// The [`Topic`] this receiver is bound to.
    pub fn topic(&self) -> &Topic {
        &self.topic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cav_types::{GuidanceState, SystemAlert};

    fn alert(code: u8) -> BusMessage {
        BusMessage::SystemAlert(SystemAlert::from_code(code, "test"))
    }

    #[tokio::test]
    async fn publish_and_receive_in_order() -> Result<(), Box<dyn std::error::Error>> {
        let bus = LocalBus::default();
        let mut rx = bus.subscribe(&Topic::SystemAlert);

        bus.publish(&Topic::SystemAlert, alert(4))?;
        bus.publish(&Topic::SystemAlert, alert(5))?;

        assert_eq!(rx.recv().await?, alert(4));
        assert_eq!(rx.recv().await?, alert(5));
        Ok(())
    }

    #[tokio::test]
    async fn topics_are_isolated() -> Result<(), Box<dyn std::error::Error>> {
        let bus = LocalBus::default();
        let mut alerts = bus.subscribe(&Topic::SystemAlert);
        let _guidance = bus.subscribe(&Topic::GuidanceState);

        bus.publish(
            &Topic::GuidanceState,
            BusMessage::GuidanceState(GuidanceState::Active),
        )?;

        let result =
            tokio::time::timeout(std::time::Duration::from_millis(50), alerts.recv()).await;
        assert!(result.is_err(), "alert subscriber must not see guidance traffic");
        Ok(())
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_message() -> Result<(), Box<dyn std::error::Error>> {
        let bus = LocalBus::default();
        let mut rx1 = bus.subscribe(&Topic::GuidanceState);
        let mut rx2 = bus.subscribe(&Topic::GuidanceState);

        bus.publish(
            &Topic::GuidanceState,
            BusMessage::GuidanceState(GuidanceState::Engaged),
        )?;

        assert_eq!(rx1.recv().await?, BusMessage::GuidanceState(GuidanceState::Engaged));
        assert_eq!(rx2.recv().await?, BusMessage::GuidanceState(GuidanceState::Engaged));
        Ok(())
    }

    #[test]
    fn publish_without_subscribers_is_an_error() {
        let bus = LocalBus::default();
        assert!(bus.publish(&Topic::SystemAlert, alert(5)).is_err());
    }

    #[tokio::test]
    async fn resolved_topics_are_distinct_lanes() -> Result<(), Box<dyn std::error::Error>> {
        let bus = LocalBus::default();
        let mut robot = bus.subscribe(&Topic::Resolved("/drivers/srx/control/robot_status".into()));
        let _speed = bus.subscribe(&Topic::Resolved("/drivers/srx/control/cmd_speed".into()));

        bus.publish(
            &Topic::Resolved("/drivers/srx/control/robot_status".into()),
            BusMessage::RobotStatus { robot_active: true, robot_enabled: true },
        )?;

        assert_eq!(
            robot.recv().await?,
            BusMessage::RobotStatus { robot_active: true, robot_enabled: true }
        );
        Ok(())
    }

    #[tokio::test]
    async fn slow_subscriber_lags_instead_of_blocking() {
        let bus = LocalBus::new(8);
        let mut slow = bus.subscribe(&Topic::SystemAlert);

        for _ in 0..1000 {
            let _ = bus.publish(&Topic::SystemAlert, alert(1));
        }

        let result = slow.recv().await;
        assert!(
            matches!(result, Err(broadcast::error::RecvError::Lagged(_))),
            "expected Lagged, got {result:?}"
        );
    }
}

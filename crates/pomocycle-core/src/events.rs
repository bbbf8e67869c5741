use serde::{Deserialize, Serialize};

use crate::controller::TimerSnapshot;
use crate::timer::{PauseReason, Phase, Remaining};

/// Every observable change in the timer produces an Event.
/// The presentation layer subscribes to them and renders what it is told.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// One second was counted down.
    Tick { remaining: Remaining },
    /// The current phase ran out. When `awaiting_confirmation` is set the
    /// core will not switch phase until asked to.
    PhaseCompleted {
        phase: Phase,
        cycle_count: u32,
        awaiting_confirmation: bool,
    },
    PhaseChanged { phase: Phase, cycle_count: u32 },
    TimerPaused { reason: PauseReason },
    /// A durable write failed; the timer keeps running from memory.
    PersistenceWarning { message: String },
    StateChanged { snapshot: TimerSnapshot },
}

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&Event) + Send>;

/// Synchronous publish/subscribe channel.
///
/// Delivery happens on the publishing thread, to every subscriber, in
/// subscription order.
#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&Event) + Send + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    pub fn publish(&mut self, event: &Event) {
        for (_, subscriber) in self.subscribers.iter_mut() {
            subscriber(event);
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn tick(seconds: u32) -> Event {
        Event::Tick {
            remaining: Remaining::new(0, 0, seconds),
        }
    }

    #[test]
    fn delivers_in_subscription_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();

        for name in ["first", "second", "third"] {
            let log = log.clone();
            bus.subscribe(move |_| log.lock().unwrap().push(name));
        }

        bus.publish(&tick(1));
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let count = Arc::new(Mutex::new(0));
        let mut bus = EventBus::new();
        let id = {
            let count = count.clone();
            bus.subscribe(move |_| *count.lock().unwrap() += 1)
        };

        bus.publish(&tick(2));
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(&tick(1));

        assert_eq!(*count.lock().unwrap(), 1);
        assert!(bus.is_empty());
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = Event::PhaseChanged {
            phase: Phase::LongBreak,
            cycle_count: 4,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "phase_changed");
        assert_eq!(json["phase"], "LONG_BREAK");
        assert_eq!(json["cycle_count"], 4);
    }
}

//! Presentation events.
//!
//! Systems never call into the UI. They push [`GameEvent`]s into an
//! [`EventSink`]; the session buffers them in an [`EventQueue`] and the host
//! drains the queue once per frame, either handling the events directly or
//! fanning them out through an [`EventBus`].

use serde::{Deserialize, Serialize};

use crate::combat::status::StatusKind;
use crate::combat::ActorId;
use crate::economy::store::AdReward;

/// Where a batch of produced resources came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductionSource {
    Live,
    Offline,
    OfflineDoubler,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    UpgradeStarted {
        building_id: String,
        target_level: u32,
        cost: u64,
        duration_secs: f64,
    },
    UpgradeCompleted {
        building_id: String,
        new_level: u32,
    },
    ResourcesProduced {
        gold: u64,
        premium: u64,
        source: ProductionSource,
    },
    /// `attacker` is `None` for damage over time
    DamageDealt {
        attacker: Option<ActorId>,
        target: ActorId,
        damage: f64,
        is_critical: bool,
    },
    AttackDodged {
        attacker: ActorId,
        target: ActorId,
    },
    StatusEffectApplied {
        target: ActorId,
        kind: StatusKind,
        duration_secs: f64,
    },
    StatusEffectRemoved {
        target: ActorId,
        kind: StatusKind,
    },
    XpGained {
        amount: u64,
        current_xp: u64,
    },
    LevelUp {
        new_level: u32,
    },
    ProductGranted {
        product_id: String,
    },
    AdRewardGranted {
        reward: AdReward,
    },
    AdBoostExpired,
}

/// Receiver for presentation events
pub trait EventSink {
    fn emit(&mut self, event: GameEvent);
}

/// Discards everything. Useful when a caller has no presentation layer.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: GameEvent) {}
}

impl EventSink for Vec<GameEvent> {
    fn emit(&mut self, event: GameEvent) {
        self.push(event);
    }
}

/// FIFO buffer of events waiting for the host
#[derive(Debug, Default, Clone)]
pub struct EventQueue {
    events: Vec<GameEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every pending event, leaving the queue empty
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn pending_events(&self) -> &[GameEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventSink for EventQueue {
    fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Box<dyn FnMut(&GameEvent)>;

/// Fan-out of events to subscriber callbacks.
///
/// Subscribers must not rely on being called in any particular order.
#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    subscribers: Vec<(SubscriptionId, Handler)>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&GameEvent) + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(handler)));
        id
    }

    /// Returns false when the id was not subscribed
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn publish(&mut self, event: &GameEvent) {
        for (_, handler) in self.subscribers.iter_mut() {
            handler(event);
        }
    }

    /// Drain a queue and publish every event; returns how many were delivered
    pub fn dispatch(&mut self, queue: &mut EventQueue) -> usize {
        let events = queue.drain_events();
        for event in &events {
            self.publish(event);
        }
        events.len()
    }
}

impl EventSink for EventBus {
    fn emit(&mut self, event: GameEvent) {
        self.publish(&event);
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

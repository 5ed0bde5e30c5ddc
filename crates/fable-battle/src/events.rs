//! Event bus for inter-system communication.
//!
//! The bus is an explicitly constructed broadcast channel. Every subscriber
//! registers for a set of [`Topic`]s and receives its own copy of each
//! matching event on a private receiver, which it drains during its own update.

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use fable_common::{ActorId, ContentRef};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::actor::ActorKind;
use crate::hero_team::SavedRoster;
use crate::strategy::CombatStrategy;

// ============================================================================
// Payloads
// ============================================================================

/// One side of a battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// The player's party.
    Heroes,
    /// The hostile team.
    Foes,
}

impl Side {
    /// The other side.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Heroes => Self::Foes,
            Self::Foes => Self::Heroes,
        }
    }
}

/// What the acting member wants to do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionIntent {
    /// Use a strategy on the current target.
    Use(CombatStrategy),
    /// Run away from the battle.
    Flee,
}

/// Payload of `battle.action`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleAction {
    /// Side the intent is issued for.
    pub side: Side,
    /// The intent itself.
    pub intent: ActionIntent,
}

/// Payload of `actor.gainExp`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpReport {
    /// Actor that gained experience.
    pub actor: ActorId,
    /// Display name of the actor.
    pub name: String,
    /// Experience applied.
    pub exp: u32,
    /// Levels reached, ascending.
    pub levels: Vec<u32>,
    /// Names of abilities learned.
    pub abilities: Vec<String>,
}

/// How a battle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BattleOutcome {
    /// Every foe was defeated.
    Victory,
    /// Every hero was defeated.
    Defeat,
    /// The heroes ran away.
    Fled,
}

// ============================================================================
// Events
// ============================================================================

/// Event types that can be sent through the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GameEvent {
    /// A hostile actor engaged the party
    BattleStart {
        /// World actor that started the encounter
        enemy: ActorId,
    },
    /// An actor wants to act
    BattleAction(BattleAction),
    /// An actor gained experience
    ActorGainExp(ExpReport),
    /// Roster state should be persisted
    TeamSave(SavedRoster),
    /// An actor was defeated in battle
    ActorDefeated {
        /// Defeated actor
        actor: ActorId,
        /// Its content reference
        reference: ContentRef,
        /// Its kind
        kind: ActorKind,
    },
    /// A battle finished
    BattleEnd {
        /// How it ended
        outcome: BattleOutcome,
    },
}

impl GameEvent {
    /// Topic this event is published under.
    #[must_use]
    pub const fn topic(&self) -> Topic {
        match self {
            Self::BattleStart { .. } => Topic::BattleStart,
            Self::BattleAction(_) => Topic::BattleAction,
            Self::ActorGainExp(_) => Topic::ActorGainExp,
            Self::TeamSave(_) => Topic::TeamSave,
            Self::ActorDefeated { .. } => Topic::ActorDefeated,
            Self::BattleEnd { .. } => Topic::BattleEnd,
        }
    }
}

/// Event categories subscribers register for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    /// `battle.start`
    BattleStart,
    /// `battle.action`
    BattleAction,
    /// `actor.gainExp`
    ActorGainExp,
    /// `team.save`
    TeamSave,
    /// `actor.defeated`
    ActorDefeated,
    /// `battle.end`
    BattleEnd,
}

impl Topic {
    /// Every topic.
    pub const ALL: [Self; 6] = [
        Self::BattleStart,
        Self::BattleAction,
        Self::ActorGainExp,
        Self::TeamSave,
        Self::ActorDefeated,
        Self::BattleEnd,
    ];

    /// Dotted wire name of the topic.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::BattleStart => "battle.start",
            Self::BattleAction => "battle.action",
            Self::ActorGainExp => "actor.gainExp",
            Self::TeamSave => "team.save",
            Self::ActorDefeated => "actor.defeated",
            Self::BattleEnd => "battle.end",
        }
    }
}

// ============================================================================
// Bus
// ============================================================================

/// Handle identifying a registration on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Debug)]
struct Subscriber {
    id: SubscriptionId,
    topics: Vec<Topic>,
    sender: Sender<GameEvent>,
}

/// Event bus for broadcasting events to subscribers.
#[derive(Debug)]
pub struct EventBus {
    /// Registered subscribers
    subscribers: Mutex<Vec<Subscriber>>,
    /// Next subscription id
    next_id: AtomicU64,
    /// Per-subscriber channel capacity
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus {
    /// Creates a new event bus with the given per-subscriber capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            capacity,
        }
    }

    /// Registers for the given topics.
    pub fn subscribe(&self, topics: &[Topic]) -> Subscription {
        let (sender, receiver) = bounded(self.capacity);
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.lock().push(Subscriber {
            id,
            topics: topics.to_vec(),
            sender,
        });
        Subscription { id, receiver }
    }

    /// Releases a registration. Returns whether it existed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        subscribers.len() != before
    }

    /// Publishes an event to every subscriber of its topic.
    pub fn publish(&self, event: GameEvent) {
        let topic = event.topic();
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|subscriber| {
            if !subscriber.topics.contains(&topic) {
                return true;
            }
            match subscriber.sender.try_send(event.clone()) {
                Ok(()) => true,
                // Non-blocking send - if full, event is dropped
                Err(TrySendError::Full(_)) => {
                    warn!("Subscriber {:?} full, dropped {}", subscriber.id, topic.name());
                    true
                },
                Err(TrySendError::Disconnected(_)) => false,
            }
        });
    }

    /// Number of live registrations.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Returns the per-subscriber capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Receiving end of a registration.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    receiver: Receiver<GameEvent>,
}

impl Subscription {
    /// Registration id, used to unsubscribe.
    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Takes the next pending event, if any.
    #[must_use]
    pub fn try_next(&self) -> Option<GameEvent> {
        self.receiver.try_recv().ok()
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<GameEvent> {
        self.receiver.try_iter().collect()
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }
}

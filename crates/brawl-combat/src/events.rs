//! Event bus carrying match and gauntlet events out to presentation.

use crossbeam_channel::{bounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::audits::AuditObserver;

/// Which side of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Left side, human controlled
    Player,
    /// Right side
    Enemy,
}

impl Side {
    /// The other side.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Player => Self::Enemy,
            Self::Enemy => Self::Player,
        }
    }
}

/// Events published while a match or gauntlet runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MatchEvent {
    /// An attack box touched a hitbox
    Hit {
        /// Side that attacked
        attacker: Side,
        /// Health removed
        damage: i32,
        /// Hit was blocked
        blocked: bool,
        /// Hit was swallowed by an escape
        invincible: bool,
    },
    /// A block was attempted with no charges left
    GuardBroken {
        /// Side that tried to block
        side: Side,
    },
    /// Round decided
    RoundEnd {
        /// Round number, 1-based
        round: u32,
        /// Winner; `None` for a draw
        winner: Option<Side>,
    },
    /// Next round started
    RoundStart {
        /// Round number, 1-based
        round: u32,
    },
    /// Match decided
    MatchEnd {
        /// Winner
        winner: Side,
    },
    /// Ticks suspended
    Paused,
    /// Ticks resumed
    Resumed,
    /// Gauntlet enemy spawned
    AuditStart {
        /// 1-based index
        index: u32,
        /// Gauntlet length
        total: u32,
        /// Enemy name
        name: String,
    },
    /// Gauntlet enemy defeated
    AuditEnd {
        /// 1-based index
        index: u32,
        /// Gauntlet length
        total: u32,
    },
    /// Every gauntlet enemy defeated
    AuditsComplete,
    /// Player fell during the gauntlet
    PlayerDied,
}

/// Event bus for broadcasting events to subscribers.
#[derive(Debug, Clone)]
pub struct EventBus {
    /// Sender for broadcasting events
    sender: Sender<MatchEvent>,
    /// Receiver for collecting events
    receiver: Receiver<MatchEvent>,
    /// Channel capacity
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus {
    /// Creates a new event bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity.max(1));
        Self {
            sender,
            receiver,
            capacity: capacity.max(1),
        }
    }

    /// Publishes an event to the bus.
    pub fn publish(&self, event: MatchEvent) {
        // Non-blocking send; a full bus drops the event.
        if self.sender.try_send(event).is_err() {
            warn!(capacity = self.capacity, "Event bus full, dropping event");
        }
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<MatchEvent> {
        self.receiver.try_iter().collect()
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Creates a new sender handle for publishing events.
    #[must_use]
    pub fn sender(&self) -> Sender<MatchEvent> {
        self.sender.clone()
    }
}

impl AuditObserver for EventBus {
    fn on_audit_start(&mut self, index: u32, total: u32, name: &str) {
        self.publish(MatchEvent::AuditStart {
            index,
            total,
            name: name.to_string(),
        });
    }

    fn on_audit_end(&mut self, index: u32, total: u32) {
        self.publish(MatchEvent::AuditEnd { index, total });
    }

    fn on_all_complete(&mut self) {
        self.publish(MatchEvent::AuditsComplete);
    }

    fn on_player_died(&mut self) {
        self.publish(MatchEvent::PlayerDied);
    }
}

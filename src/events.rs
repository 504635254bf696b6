//! Diagnostic event reporting for the scheduler.
//!
//! Hosts subscribe to observe playback lifecycle and admission decisions
//! without polling. Publishing is non-blocking; a subscriber that stops
//! draining its channel simply accumulates events.

use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;

use crate::scheduler::{ChannelId, FinishReason};

/// Why a play request was declined. These are expected, frequent outcomes,
/// not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Emission point beyond the audible range.
    Culled,
    /// The sound's group is at its concurrent-play cap.
    GroupSaturated,
    /// No free channel and no eligible preemption victim.
    PoolExhausted,
}

/// Scheduler events, past tense: things that have happened.
#[derive(Debug, Clone)]
pub enum SchedulerEvent {
    /// A channel was allocated and playback configured.
    PlaybackStarted { channel: ChannelId, sound: String },

    /// A channel was released.
    PlaybackFinished {
        channel: ChannelId,
        sound: String,
        reason: FinishReason,
    },

    /// A play request was declined.
    PlayRejected { sound: String, reason: RejectReason },

    /// A configuration entry was skipped during initialization.
    ConfigEntrySkipped { entry: String, detail: String },
}

impl SchedulerEvent {
    /// Human-readable description of the event.
    pub fn description(&self) -> String {
        match self {
            SchedulerEvent::PlaybackStarted { channel, sound } => {
                format!("Playback started on {channel}: {sound}")
            }
            SchedulerEvent::PlaybackFinished {
                channel,
                sound,
                reason,
            } => {
                format!("Playback finished on {channel}: {sound} ({reason:?})")
            }
            SchedulerEvent::PlayRejected { sound, reason } => {
                format!("Play rejected: {sound} ({reason:?})")
            }
            SchedulerEvent::ConfigEntrySkipped { entry, detail } => {
                format!("Config entry skipped: {entry} ({detail})")
            }
        }
    }
}

/// Subscriber ID for tracking subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(usize);

struct Subscriber {
    id: SubscriberId,
    sender: Sender<SchedulerEvent>,
}

/// Event bus broadcasting scheduler events to subscribers.
pub struct EventBus {
    subscribers: Arc<RwLock<Vec<Subscriber>>>,
    next_id: Arc<RwLock<usize>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(Vec::new())),
            next_id: Arc::new(RwLock::new(0)),
        }
    }

    /// Subscribe to events, returns a receiver and subscription ID
    pub fn subscribe(&self) -> (Receiver<SchedulerEvent>, SubscriberId) {
        let (tx, rx) = unbounded();

        let mut next_id = self.next_id.write();
        let id = SubscriberId(*next_id);
        *next_id += 1;
        drop(next_id);

        self.subscribers.write().push(Subscriber { id, sender: tx });

        (rx, id)
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        self.subscribers.write().retain(|s| s.id != id);
    }

    /// Publish an event to all subscribers (non-blocking).
    pub fn publish(&self, event: SchedulerEvent) {
        let subscribers = self.subscribers.read();

        for subscriber in subscribers.iter() {
            // If send fails, the subscriber channel is closed - that's ok
            let _ = subscriber.sender.try_send(event.clone());
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    pub fn clear(&self) {
        self.subscribers.write().clear();
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            subscribers: Arc::clone(&self.subscribers),
            next_id: Arc::clone(&self.next_id),
        }
    }
}

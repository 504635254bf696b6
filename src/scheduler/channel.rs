//! One slot of the fixed playback pool.
//!
//! A channel has a stable index for the process lifetime and is either free
//! or playing. Channel 0 is reserved for exclusive playback and is excluded
//! from the general pool rotation.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::fade::{FadePhase, FadeTask};
use super::group::GroupId;
use crate::catalog::ClipSource;

/// Playback priority, five named levels. `Normal` is the default; higher
/// priorities may preempt lower ones when the pool is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    VeryLow,
    Low,
    Normal,
    High,
    VeryHigh,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

impl Priority {
    /// Numeric level, -2 (VeryLow) through 2 (VeryHigh). Used in logs.
    pub fn rank(self) -> i8 {
        match self {
            Priority::VeryLow => -2,
            Priority::Low => -1,
            Priority::Normal => 0,
            Priority::High => 1,
            Priority::VeryHigh => 2,
        }
    }
}

/// Whether a channel slot is occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupancy {
    Free,
    Playing,
}

/// Handle to a channel slot. Index 0 is the reserved channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(pub(crate) usize);

impl ChannelId {
    /// The always-available exclusive channel.
    pub const RESERVED: ChannelId = ChannelId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Why a channel was released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// Playback reached its natural end time.
    Completed,
    /// Explicitly stopped by the caller.
    Stopped,
    /// A fade-out ramp reached silence.
    FadedOut,
    /// A higher-priority request took the channel.
    Preempted,
}

/// Passed to a channel's finished callback when it is released.
#[derive(Debug, Clone, Copy)]
pub struct FinishedEvent {
    pub channel: ChannelId,
    pub reason: FinishReason,
}

/// Single-shot callback invoked when a channel is released.
pub type FinishedCallback = Box<dyn FnOnce(FinishedEvent) + Send>;

/// A playback start that has been admitted but not yet handed to the backend
/// because the request carried a delay.
#[derive(Debug, Clone)]
pub(crate) struct PendingStart {
    pub at: Instant,
    pub clip: ClipSource,
    pub pitch: f32,
    pub position: [f32; 3],
}

/// One pool slot. All mutation goes through the scheduler.
pub struct Channel {
    index: usize,
    pub(crate) occupancy: Occupancy,
    pub(crate) priority: Priority,
    /// Natural completion time; `None` while looping or free.
    pub(crate) end_time: Option<Instant>,
    pub(crate) looping: bool,
    pub(crate) base_volume: f32,
    pub(crate) current_volume: f32,
    pub(crate) fade: Option<FadeTask>,
    /// Non-owning reference into the scheduler's group registry.
    pub(crate) group: Option<GroupId>,
    pub(crate) on_finished: Option<FinishedCallback>,
    pub(crate) pending: Option<PendingStart>,
    pub(crate) sound_name: Option<String>,
}

impl Channel {
    pub(crate) fn new(index: usize) -> Self {
        Self {
            index,
            occupancy: Occupancy::Free,
            priority: Priority::default(),
            end_time: None,
            looping: false,
            base_volume: 1.0,
            current_volume: 1.0,
            fade: None,
            group: None,
            on_finished: None,
            pending: None,
            sound_name: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn occupancy(&self) -> Occupancy {
        self.occupancy
    }

    pub fn is_playing(&self) -> bool {
        self.occupancy == Occupancy::Playing
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn current_volume(&self) -> f32 {
        self.current_volume
    }

    pub fn base_volume(&self) -> f32 {
        self.base_volume
    }

    pub fn fade_phase(&self) -> FadePhase {
        self.fade
            .as_ref()
            .map(FadeTask::phase)
            .unwrap_or(FadePhase::None)
    }

    pub fn group(&self) -> Option<GroupId> {
        self.group
    }

    pub fn sound_name(&self) -> Option<&str> {
        self.sound_name.as_deref()
    }

    /// Return the slot to its idle state. The index is the only surviving
    /// field.
    pub(crate) fn reset(&mut self) {
        self.occupancy = Occupancy::Free;
        self.priority = Priority::default();
        self.end_time = None;
        self.looping = false;
        self.base_volume = 1.0;
        self.current_volume = 1.0;
        self.fade = None;
        self.group = None;
        self.on_finished = None;
        self.pending = None;
        self.sound_name = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_ordering_matches_ranks() {
        assert!(Priority::VeryLow < Priority::Low);
        assert!(Priority::Low < Priority::Normal);
        assert!(Priority::Normal < Priority::High);
        assert!(Priority::High < Priority::VeryHigh);
        assert_eq!(Priority::VeryLow.rank(), -2);
        assert_eq!(Priority::Normal.rank(), 0);
        assert_eq!(Priority::VeryHigh.rank(), 2);
    }

    #[test]
    fn test_default_priority() {
        assert_eq!(Priority::default(), Priority::Normal);
    }

    #[test]
    fn test_channel_reset_clears_playback_state() {
        let mut ch = Channel::new(3);
        ch.occupancy = Occupancy::Playing;
        ch.looping = true;
        ch.current_volume = 0.4;
        ch.sound_name = Some("explosion".to_string());

        ch.reset();

        assert_eq!(ch.index(), 3);
        assert_eq!(ch.occupancy(), Occupancy::Free);
        assert!(!ch.is_looping());
        assert_eq!(ch.current_volume(), 1.0);
        assert!(ch.sound_name().is_none());
        assert_eq!(ch.fade_phase(), FadePhase::None);
    }

    #[test]
    fn test_reserved_channel_id() {
        assert_eq!(ChannelId::RESERVED.index(), 0);
        assert_eq!(ChannelId::RESERVED.to_string(), "#0");
    }
}

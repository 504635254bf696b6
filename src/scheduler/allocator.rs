//! Priority-based channel allocation.
//!
//! A pure decision over the pool: pull from the free list, or pick a
//! preemption victim when the pool is exhausted. The scheduler applies the
//! decision; nothing here mutates the pool.

use super::channel::Priority;
use super::pool::ChannelPool;

/// How the requester wants a channel chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelPreference {
    /// Use the reserved channel (index 0); bypasses pooling entirely.
    Reserved,
    /// Any general channel, allocated by the rules below.
    Any,
}

/// A successful allocation decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Allocation {
    /// Reconfigure the reserved channel. Always available.
    Reserved,
    /// The head of the FIFO free list.
    FromFreeList(usize),
    /// Stop this playing channel and take its slot.
    Preempt(usize),
}

/// Decide where a request at `priority` can play.
///
/// Preemption ladder, applied only when the free list is empty:
/// - `VeryLow` requests never preempt.
/// - Any channel strictly below the requested priority is fair game; the
///   first match in allocation order (oldest first) is taken.
/// - Below-`Normal` requests stop there.
/// - Requests at `Normal` or above may, as a last resort, take the oldest
///   channel at or below `Normal` so they are not starved by a wall of
///   default-priority playback.
///
/// Returns `None` when the request cannot be placed; callers treat that as
/// a normal admission rejection.
pub fn allocate(
    pool: &ChannelPool,
    preference: ChannelPreference,
    priority: Priority,
) -> Option<Allocation> {
    if preference == ChannelPreference::Reserved {
        return Some(Allocation::Reserved);
    }

    if let Some(index) = pool.peek_free() {
        return Some(Allocation::FromFreeList(index));
    }

    if priority == Priority::VeryLow {
        return None;
    }

    if let Some((index, _)) = pool.playing_iter().find(|(_, ch)| ch.priority() < priority) {
        return Some(Allocation::Preempt(index));
    }

    if priority < Priority::Normal {
        return None;
    }

    pool.playing_iter()
        .find(|(_, ch)| ch.priority() <= Priority::Normal)
        .map(|(index, _)| Allocation::Preempt(index))
}

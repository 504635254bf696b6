//! The scheduler: admission, allocation, and the per-tick drive.
//!
//! All shared state (pool, group counters, per-channel fades) is owned here
//! and mutated only through this API. The scheduler is single-threaded and
//! tick-driven; a multi-threaded host wraps the whole object in one mutex so
//! the allocator's free-list pop and preemption scan stay in a single
//! exclusion domain.

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Context;

use crate::catalog::{SoundCatalog, SoundDefinition};
use crate::config::SchedulerConfig;
use crate::error::AppResult;
use crate::events::{EventBus, RejectReason, SchedulerEvent};
use crate::output::AudioOutput;

use super::allocator::{allocate, Allocation, ChannelPreference};
use super::channel::{
    Channel, ChannelId, FinishReason, FinishedCallback, FinishedEvent, Occupancy, PendingStart,
};
use super::distance::should_cull;
use super::fade::{FadeKind, FadePhase, FadeTask};
use super::group::{GroupId, GroupRegistry, SoundGroup};
use super::pool::{ChannelPool, RESERVED_INDEX};

/// Bounded audio-channel scheduler.
///
/// Accepts play requests, decides whether and where they can play given the
/// fixed channel pool, per-group concurrency caps, and distance culling, and
/// drives each active channel's fade lifecycle until it finishes or is
/// reclaimed. Rendering is delegated to the [`AudioOutput`] backend.
pub struct SoundScheduler {
    pool: ChannelPool,
    groups: GroupRegistry,
    output: Box<dyn AudioOutput>,
    events: EventBus,
    listener: Option<[f32; 3]>,
    master_volume: f32,
    max_audible_distance: f32,
    default_fade_out: Duration,
    /// Current time, advanced only by `tick`.
    now: Instant,
}

impl SoundScheduler {
    pub fn new(config: &SchedulerConfig, output: Box<dyn AudioOutput>) -> Self {
        Self::with_events(config, output, EventBus::new())
    }

    /// Build the scheduler publishing to an existing event bus, so hosts can
    /// subscribe before initialization diagnostics are emitted.
    pub fn with_events(
        config: &SchedulerConfig,
        output: Box<dyn AudioOutput>,
        events: EventBus,
    ) -> Self {
        let (groups, skipped) = GroupRegistry::from_configs(&config.groups);
        for name in skipped {
            events.publish(SchedulerEvent::ConfigEntrySkipped {
                entry: name,
                detail: "duplicate group name".to_string(),
            });
        }

        tracing::info!(
            general_channels = config.general_channels,
            groups = groups.len(),
            "Sound scheduler initialized"
        );

        Self {
            pool: ChannelPool::new(config.general_channels),
            groups,
            output,
            events,
            listener: None,
            master_volume: config.master_volume.clamp(0.0, 1.0),
            max_audible_distance: config.max_audible_distance,
            default_fade_out: config.default_fade_out(),
            now: Instant::now(),
        }
    }

    /// Load configuration from disk and build both the scheduler and the
    /// sound catalog it was configured with.
    pub fn from_config_path(
        path: &Path,
        output: Box<dyn AudioOutput>,
    ) -> AppResult<(Self, SoundCatalog)> {
        let config = SchedulerConfig::load(path)
            .with_context(|| format!("loading scheduler config from {}", path.display()))?;

        let scheduler = Self::new(&config, output);
        let (catalog, skipped) = SoundCatalog::from_definitions(config.sounds);
        for name in skipped {
            scheduler.events.publish(SchedulerEvent::ConfigEntrySkipped {
                entry: name,
                detail: "duplicate sound name".to_string(),
            });
        }

        Ok((scheduler, catalog))
    }

    /// Bus carrying playback lifecycle and admission diagnostics.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Request playback of a sound at a world position.
    ///
    /// Admission runs cheapest-rejection-first: distance cull, then group
    /// cap, then channel allocation. Every rejection is a normal outcome
    /// signaled by `None`; transient over-subscription is expected under
    /// load and must never be treated as an error.
    pub fn play(
        &mut self,
        sound: &SoundDefinition,
        position: [f32; 3],
        preference: ChannelPreference,
        delay: Duration,
    ) -> Option<ChannelId> {
        if should_cull(
            position,
            self.listener,
            self.max_audible_distance,
            sound.max_distance,
        ) {
            tracing::debug!(sound = %sound.name, "Play request culled by distance");
            self.events.publish(SchedulerEvent::PlayRejected {
                sound: sound.name.clone(),
                reason: RejectReason::Culled,
            });
            return None;
        }

        let group = self.resolve_group(sound);
        if !self.groups.can_play(group) {
            tracing::debug!(sound = %sound.name, "Play request rejected: group at capacity");
            self.events.publish(SchedulerEvent::PlayRejected {
                sound: sound.name.clone(),
                reason: RejectReason::GroupSaturated,
            });
            return None;
        }

        let clip = match sound.pick_clip() {
            Some(clip) => clip.clone(),
            None => {
                tracing::debug!(sound = %sound.name, "Nothing to play: definition has no clips");
                return None;
            }
        };

        let decision = match allocate(&self.pool, preference, sound.priority) {
            Some(decision) => decision,
            None => {
                tracing::info!(
                    sound = %sound.name,
                    priority = sound.priority.rank(),
                    "Play request rejected: pool exhausted"
                );
                self.events.publish(SchedulerEvent::PlayRejected {
                    sound: sound.name.clone(),
                    reason: RejectReason::PoolExhausted,
                });
                return None;
            }
        };

        let index = match decision {
            Allocation::Reserved => {
                // The reserved channel is always available for
                // reassignment; release any current occupant first.
                self.release(RESERVED_INDEX, FinishReason::Preempted, true);
                RESERVED_INDEX
            }
            Allocation::FromFreeList(_) => self.pool.claim_free()?,
            Allocation::Preempt(victim) => {
                tracing::debug!(
                    channel = victim,
                    sound = %sound.name,
                    "Preempting lower-priority channel"
                );
                // Victim release happens-before the new occupant's
                // configuration; the channel stays in the playing set but
                // moves to the tail so allocation order stays truthful.
                self.release(victim, FinishReason::Preempted, false);
                self.pool.move_to_tail(victim);
                victim
            }
        };

        let start_at = self.now + delay;
        let base_volume = sound.volume.clamp(0.0, 1.0);
        let master = self.master_volume;

        {
            let ch = self.pool.channel_mut(index)?;
            ch.occupancy = Occupancy::Playing;
            ch.priority = sound.priority;
            ch.looping = sound.looping;
            ch.base_volume = base_volume;
            ch.current_volume = base_volume;
            ch.fade = None;
            ch.group = group;
            ch.end_time = (!sound.looping).then(|| start_at + clip.duration());
            ch.sound_name = Some(sound.name.clone());
            ch.on_finished = None;
            ch.pending = (!delay.is_zero()).then(|| PendingStart {
                at: start_at,
                clip: clip.clone(),
                pitch: sound.pitch,
                position,
            });
        }

        self.groups.increment(group);

        if delay.is_zero() {
            self.output.begin(
                index,
                &clip,
                base_volume * master,
                sound.pitch,
                sound.looping,
                position,
            );
        }

        tracing::info!(
            channel = index,
            sound = %sound.name,
            priority = sound.priority.rank(),
            "Playing"
        );
        self.events.publish(SchedulerEvent::PlaybackStarted {
            channel: ChannelId(index),
            sound: sound.name.clone(),
        });

        debug_assert!(self.pool.conservation_holds());
        Some(ChannelId(index))
    }

    /// Stop a channel, fading out by default.
    ///
    /// With `fade_out` the call delegates to [`Self::fade_out`] using the
    /// configured default duration (subject to its silent-channel no-op).
    /// Without it the channel is halted, its finished callback fired, its
    /// group slot released, and the slot returned to the free-list tail.
    /// Returns false for an out-of-range index or an idle channel; a second
    /// consecutive stop is a no-op, never a double group decrement.
    pub fn stop(&mut self, id: ChannelId, fade_out: bool) -> bool {
        match self.pool.channel(id.index()) {
            None => {
                tracing::warn!(channel = id.index(), "stop on out-of-range channel");
                return false;
            }
            Some(ch) if !ch.is_playing() => return false,
            Some(_) => {}
        }

        if fade_out {
            self.fade_out(id, self.default_fade_out, Duration::ZERO);
        } else {
            self.release(id.index(), FinishReason::Stopped, true);
            debug_assert!(self.pool.conservation_holds());
        }
        true
    }

    /// Stop every pooled channel. The reserved channel is meant for
    /// continuous/ambient use and is excluded unless explicitly requested.
    pub fn stop_all(&mut self, include_reserved: bool) {
        for index in self.pool.playing().to_vec() {
            self.release(index, FinishReason::Stopped, true);
        }
        if include_reserved {
            self.release(RESERVED_INDEX, FinishReason::Stopped, true);
        }
        debug_assert!(self.pool.conservation_holds());
    }

    /// Ramp a playing channel from silence up to `target_volume`.
    pub fn fade_in(&mut self, id: ChannelId, duration: Duration, target_volume: f32) {
        if let Some(ch) = self.playing_channel_mut(id, "fade_in") {
            ch.fade = Some(FadeTask::new(
                FadeKind::In,
                0.0,
                target_volume,
                duration,
                Duration::ZERO,
            ));
            ch.current_volume = 0.0;
        } else {
            return;
        }
        self.output.set_volume(id.index(), 0.0);
    }

    /// Ramp a channel down to silence and release it when the ramp lands.
    ///
    /// No-op when the channel is not currently producing sound, so racy
    /// callers fading out an already-silent channel are tolerated.
    pub fn fade_out(&mut self, id: ChannelId, duration: Duration, delay: Duration) {
        let producing = self.output.is_producing_sound(id.index());
        let Some(ch) = self.playing_channel_mut(id, "fade_out") else {
            return;
        };
        if !producing {
            tracing::debug!(channel = id.index(), "fade_out on silent channel ignored");
            return;
        }

        let start = ch.current_volume;
        ch.fade = Some(FadeTask::new(FadeKind::Out, start, 0.0, duration, delay));
    }

    /// Ramp a channel to `target_volume` and keep playing there: a
    /// foreground/background modulation, not a stop. Ignored while the
    /// channel is fading out: exit beats duck.
    pub fn duck(&mut self, id: ChannelId, duration: Duration, target_volume: f32) {
        let Some(ch) = self.playing_channel_mut(id, "duck") else {
            return;
        };
        if ch.fade_phase() == FadePhase::FadingOut {
            tracing::debug!(channel = id.index(), "duck ignored during fade-out");
            return;
        }

        let start = ch.current_volume;
        ch.fade = Some(FadeTask::new(
            FadeKind::Duck,
            start,
            target_volume,
            duration,
            Duration::ZERO,
        ));
    }

    /// Attach a single-shot callback fired when the channel is released
    /// (natural finish, explicit stop, fade-out completion, or preemption).
    pub fn set_on_finished(&mut self, id: ChannelId, callback: FinishedCallback) {
        if let Some(ch) = self.playing_channel_mut(id, "set_on_finished") {
            ch.on_finished = Some(callback);
        }
    }

    /// Advance the scheduler by one frame.
    ///
    /// Naturally finished channels are reclaimed first, so their slots are
    /// visible to `play` calls made later in the same frame. Then delayed
    /// starts are issued, then every active fade advances by the elapsed
    /// time since the previous tick; a fade-out that lands releases its
    /// channel through the same path as an immediate stop.
    pub fn tick(&mut self, now: Instant) {
        let dt = now.saturating_duration_since(self.now);
        self.now = now;

        let mut finished = Vec::new();
        for index in self.active_indices() {
            let Some(ch) = self.pool.channel(index) else {
                continue;
            };
            if ch.is_playing() && !ch.looping && ch.end_time.is_some_and(|end| now >= end) {
                finished.push(index);
            }
        }
        for index in finished {
            self.release(index, FinishReason::Completed, true);
        }

        let master = self.master_volume;

        let mut starts = Vec::new();
        for index in self.active_indices() {
            let Some(ch) = self.pool.channel_mut(index) else {
                continue;
            };
            if !ch.is_playing() || !ch.pending.as_ref().is_some_and(|p| now >= p.at) {
                continue;
            }
            let Some(pending) = ch.pending.take() else {
                continue;
            };
            starts.push((index, pending, ch.current_volume, ch.looping));
        }
        for (index, pending, volume, looping) in starts {
            self.output.begin(
                index,
                &pending.clip,
                volume * master,
                pending.pitch,
                looping,
                pending.position,
            );
        }

        let mut volume_updates = Vec::new();
        let mut completed_fade_outs = Vec::new();
        for index in self.active_indices() {
            let Some(ch) = self.pool.channel_mut(index) else {
                continue;
            };
            if !ch.is_playing() {
                continue;
            }
            let Some(task) = ch.fade.as_mut() else {
                continue;
            };

            let step = task.advance(dt);
            let kind = task.kind();
            ch.current_volume = step.volume;
            if step.finished {
                ch.fade = None;
            }

            volume_updates.push((index, step.volume));
            if step.finished && kind == FadeKind::Out {
                completed_fade_outs.push(index);
            }
        }
        for (index, volume) in volume_updates {
            self.output.set_volume(index, volume * master);
        }
        for index in completed_fade_outs {
            self.release(index, FinishReason::FadedOut, true);
        }

        debug_assert!(self.pool.conservation_holds());
    }

    /// Bind (or unbind) the reference point for distance culling. With no
    /// listener bound, culling is skipped.
    pub fn set_listener_position(&mut self, position: Option<[f32; 3]>) {
        self.listener = position;
    }

    pub fn listener_position(&self) -> Option<[f32; 3]> {
        self.listener
    }

    /// Set the scheduler-wide volume multiplier and push it to every active
    /// channel.
    pub fn set_master_volume(&mut self, volume: f32) {
        self.master_volume = volume.clamp(0.0, 1.0);
        let master = self.master_volume;

        let updates: Vec<(usize, f32)> = self
            .active_indices()
            .into_iter()
            .filter_map(|i| self.pool.channel(i).map(|ch| (i, ch.current_volume())))
            .collect();
        for (index, current) in updates {
            self.output.set_volume(index, current * master);
        }
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    pub fn is_playing(&self, id: ChannelId) -> bool {
        self.pool
            .channel(id.index())
            .is_some_and(Channel::is_playing)
    }

    pub fn fade_phase(&self, id: ChannelId) -> FadePhase {
        self.pool
            .channel(id.index())
            .map(Channel::fade_phase)
            .unwrap_or(FadePhase::None)
    }

    /// Read-only view of a channel slot.
    pub fn channel(&self, id: ChannelId) -> Option<&Channel> {
        self.pool.channel(id.index())
    }

    pub fn free_channels(&self) -> usize {
        self.pool.free_count()
    }

    pub fn playing_channels(&self) -> usize {
        self.pool.playing_count()
    }

    pub fn general_channels(&self) -> usize {
        self.pool.capacity()
    }

    pub fn group(&self, name: &str) -> Option<&SoundGroup> {
        self.groups.id(name).and_then(|id| self.groups.get(id))
    }

    fn resolve_group(&self, sound: &SoundDefinition) -> Option<GroupId> {
        let name = sound.group.as_deref()?;
        let id = self.groups.id(name);
        if id.is_none() {
            tracing::debug!(group = %name, sound = %sound.name, "Unknown group; playing uncapped");
        }
        id
    }

    /// Occupied channels: the reserved channel (when busy) plus the playing
    /// set in allocation order.
    fn active_indices(&self) -> Vec<usize> {
        let mut indices = Vec::with_capacity(self.pool.playing_count() + 1);
        if self
            .pool
            .channel(RESERVED_INDEX)
            .is_some_and(Channel::is_playing)
        {
            indices.push(RESERVED_INDEX);
        }
        indices.extend_from_slice(self.pool.playing());
        indices
    }

    fn playing_channel_mut(&mut self, id: ChannelId, op: &str) -> Option<&mut Channel> {
        match self.pool.channel_mut(id.index()) {
            None => {
                tracing::warn!(channel = id.index(), op, "Operation on out-of-range channel");
                None
            }
            Some(ch) if !ch.is_playing() => {
                tracing::debug!(channel = id.index(), op, "Operation on idle channel ignored");
                None
            }
            Some(ch) => Some(ch),
        }
    }

    /// The single release path: every way a channel stops goes through
    /// here, so the finished callback fires exactly once and the group slot
    /// is returned exactly once per allocation.
    ///
    /// With `return_to_pool` false the channel is being preempted: it keeps
    /// its slot in the playing set for the incoming occupant.
    fn release(&mut self, index: usize, reason: FinishReason, return_to_pool: bool) {
        let (callback, group, name) = {
            let Some(ch) = self.pool.channel_mut(index) else {
                return;
            };
            if !ch.is_playing() {
                return;
            }
            let callback = ch.on_finished.take();
            let group = ch.group.take();
            let name = ch.sound_name.take().unwrap_or_default();
            ch.reset();
            (callback, group, name)
        };

        self.output.halt(index);
        self.groups.decrement(group);
        if return_to_pool {
            self.pool.reclaim(index);
        }

        tracing::debug!(channel = index, sound = %name, ?reason, "Channel released");

        if let Some(callback) = callback {
            callback(FinishedEvent {
                channel: ChannelId(index),
                reason,
            });
        }
        self.events.publish(SchedulerEvent::PlaybackFinished {
            channel: ChannelId(index),
            sound: name,
            reason,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ClipSource;
    use crate::output::NullOutput;
    use crate::scheduler::Priority;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const ORIGIN: [f32; 3] = [0.0, 0.0, 0.0];

    fn config(general_channels: usize) -> SchedulerConfig {
        SchedulerConfig {
            general_channels,
            ..SchedulerConfig::default()
        }
    }

    fn sound(name: &str, priority: Priority) -> SoundDefinition {
        SoundDefinition {
            name: name.to_string(),
            clips: vec![ClipSource {
                path: format!("{name}.mp3"),
                duration_secs: 5.0,
            }],
            priority,
            volume: 1.0,
            pitch: 1.0,
            max_distance: 0.0,
            group: None,
            looping: false,
        }
    }

    fn scheduler(general_channels: usize) -> (SoundScheduler, crate::output::NullProbe) {
        let output = NullOutput::new();
        let probe = output.probe();
        let mut sched = SoundScheduler::new(&config(general_channels), Box::new(output));
        sched.tick(Instant::now());
        (sched, probe)
    }

    #[test]
    fn test_play_allocates_distinct_channels() {
        let (mut sched, _) = scheduler(4);
        let s = sound("shot", Priority::Normal);

        let mut seen = Vec::new();
        for _ in 0..4 {
            let id = sched
                .play(&s, ORIGIN, ChannelPreference::Any, Duration::ZERO)
                .unwrap();
            assert!(!seen.contains(&id));
            seen.push(id);
        }
        assert_eq!(sched.free_channels(), 0);
        assert_eq!(sched.playing_channels(), 4);
    }

    #[test]
    fn test_culled_request_consumes_nothing() {
        let (mut sched, probe) = scheduler(2);
        sched.set_listener_position(Some(ORIGIN));

        let mut s = sound("distant", Priority::Normal);
        s.max_distance = 10.0;

        let id = sched.play(&s, [15.0, 0.0, 0.0], ChannelPreference::Any, Duration::ZERO);
        assert!(id.is_none());
        assert_eq!(sched.free_channels(), 2);
        assert_eq!(probe.begin_count(), 0);
    }

    #[test]
    fn test_tick_reclaims_finished_channels() {
        let (mut sched, probe) = scheduler(2);
        let t0 = Instant::now();
        sched.tick(t0);

        let s = sound("shot", Priority::Normal); // 5s clip
        let id = sched
            .play(&s, ORIGIN, ChannelPreference::Any, Duration::ZERO)
            .unwrap();

        sched.tick(t0 + Duration::from_secs(3));
        assert!(sched.is_playing(id));

        sched.tick(t0 + Duration::from_secs(6));
        assert!(!sched.is_playing(id));
        assert_eq!(sched.free_channels(), 2);
        assert!(!probe.is_producing(id.index()));
    }

    #[test]
    fn test_looping_channel_never_naturally_finishes() {
        let (mut sched, _) = scheduler(2);
        let t0 = Instant::now();
        sched.tick(t0);

        let mut s = sound("ambience", Priority::Normal);
        s.looping = true;
        let id = sched
            .play(&s, ORIGIN, ChannelPreference::Any, Duration::ZERO)
            .unwrap();

        sched.tick(t0 + Duration::from_secs(3600));
        assert!(sched.is_playing(id));
    }

    #[test]
    fn test_delayed_start_begins_on_time() {
        let (mut sched, probe) = scheduler(2);
        let t0 = Instant::now();
        sched.tick(t0);

        let s = sound("drum", Priority::Normal);
        let id = sched
            .play(&s, ORIGIN, ChannelPreference::Any, Duration::from_secs(2))
            .unwrap();

        assert!(sched.is_playing(id));
        assert_eq!(probe.begin_count(), 0);

        sched.tick(t0 + Duration::from_secs(1));
        assert_eq!(probe.begin_count(), 0);

        sched.tick(t0 + Duration::from_secs(2));
        assert_eq!(probe.begin_count(), 1);
        // end time includes the delay: 2s delay + 5s clip
        sched.tick(t0 + Duration::from_secs(8));
        assert!(!sched.is_playing(id));
    }

    #[test]
    fn test_stop_immediate_is_idempotent() {
        let mut cfg = config(2);
        cfg.groups.push(crate::scheduler::GroupConfig {
            name: "weapons".to_string(),
            max_concurrent: 4,
        });
        let mut sched = SoundScheduler::new(&cfg, Box::new(NullOutput::new()));
        sched.tick(Instant::now());

        let mut s = sound("shot", Priority::Normal);
        s.group = Some("weapons".to_string());

        let id = sched
            .play(&s, ORIGIN, ChannelPreference::Any, Duration::ZERO)
            .unwrap();
        assert_eq!(sched.group("weapons").unwrap().current_count(), 1);

        assert!(sched.stop(id, false));
        assert_eq!(sched.group("weapons").unwrap().current_count(), 0);

        // Second stop: validation no-op, no double decrement.
        assert!(!sched.stop(id, false));
        assert_eq!(sched.group("weapons").unwrap().current_count(), 0);
    }

    #[test]
    fn test_stop_out_of_range_is_validation_error() {
        let (mut sched, _) = scheduler(2);
        assert!(!sched.stop(ChannelId(99), false));
    }

    #[test]
    fn test_preemption_fires_victim_callback() {
        let (mut sched, _) = scheduler(1);
        let fired = Arc::new(AtomicUsize::new(0));

        let low = sound("low", Priority::Low);
        let id = sched
            .play(&low, ORIGIN, ChannelPreference::Any, Duration::ZERO)
            .unwrap();

        let counter = Arc::clone(&fired);
        sched.set_on_finished(
            id,
            Box::new(move |event| {
                assert_eq!(event.reason, FinishReason::Preempted);
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        let high = sound("high", Priority::High);
        let stolen = sched
            .play(&high, ORIGIN, ChannelPreference::Any, Duration::ZERO)
            .unwrap();

        assert_eq!(stolen, id);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(sched.playing_channels(), 1);
    }

    #[test]
    fn test_fade_in_then_fade_out_leaves_one_fade() {
        let (mut sched, _) = scheduler(2);
        let s = sound("music", Priority::Normal);
        let id = sched
            .play(&s, ORIGIN, ChannelPreference::Any, Duration::ZERO)
            .unwrap();

        sched.fade_in(id, Duration::from_secs(1), 1.0);
        assert_eq!(sched.fade_phase(id), FadePhase::FadingIn);

        sched.fade_out(id, Duration::from_secs(1), Duration::ZERO);
        assert_eq!(sched.fade_phase(id), FadePhase::FadingOut);
    }

    #[test]
    fn test_duck_does_not_override_fade_out() {
        let (mut sched, _) = scheduler(2);
        let s = sound("music", Priority::Normal);
        let id = sched
            .play(&s, ORIGIN, ChannelPreference::Any, Duration::ZERO)
            .unwrap();

        sched.fade_out(id, Duration::from_secs(1), Duration::ZERO);
        sched.duck(id, Duration::from_millis(200), 0.3);
        assert_eq!(sched.fade_phase(id), FadePhase::FadingOut);
    }

    #[test]
    fn test_duck_keeps_channel_playing_at_target() {
        let (mut sched, probe) = scheduler(2);
        let t0 = Instant::now();
        sched.tick(t0);

        let s = sound("music", Priority::Normal);
        let id = sched
            .play(&s, ORIGIN, ChannelPreference::Any, Duration::ZERO)
            .unwrap();

        sched.duck(id, Duration::from_secs(1), 0.25);
        sched.tick(t0 + Duration::from_secs(2));

        assert!(sched.is_playing(id));
        assert_eq!(sched.fade_phase(id), FadePhase::None);
        let volume = sched.channel(id).unwrap().current_volume();
        assert!((volume - 0.25).abs() < 1e-4);
        assert_eq!(probe.volume(id.index()), Some(0.25));
    }

    #[test]
    fn test_play_clears_stale_fade() {
        let (mut sched, _) = scheduler(1);
        let s = sound("a", Priority::Normal);
        let id = sched
            .play(&s, ORIGIN, ChannelPreference::Any, Duration::ZERO)
            .unwrap();
        sched.fade_in(id, Duration::from_secs(5), 1.0);

        // Same channel via preemption-free reuse: stop, then play again.
        sched.stop(id, false);
        let id2 = sched
            .play(&s, ORIGIN, ChannelPreference::Any, Duration::ZERO)
            .unwrap();
        assert_eq!(sched.fade_phase(id2), FadePhase::None);
    }

    #[test]
    fn test_master_volume_scales_backend_volume() {
        let (mut sched, probe) = scheduler(2);
        let mut s = sound("shot", Priority::Normal);
        s.volume = 0.8;

        sched.set_master_volume(0.5);
        let id = sched
            .play(&s, ORIGIN, ChannelPreference::Any, Duration::ZERO)
            .unwrap();

        let volume = probe.volume(id.index()).unwrap();
        assert!((volume - 0.4).abs() < 1e-4);
    }

    #[test]
    fn test_unknown_group_plays_uncapped() {
        let (mut sched, _) = scheduler(2);
        let mut s = sound("shot", Priority::Normal);
        s.group = Some("no-such-group".to_string());

        assert!(sched
            .play(&s, ORIGIN, ChannelPreference::Any, Duration::ZERO)
            .is_some());
    }
}

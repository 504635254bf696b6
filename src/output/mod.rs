//! Playback backends.
//!
//! The scheduler decides which channel plays what and how loud; an
//! [`AudioOutput`] does the actual sound production. The scheduler only ever
//! calls this trait; it does not decode or mix audio.

pub mod rodio_backend;

pub use rodio_backend::RodioOutput;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::catalog::ClipSource;

/// Per-channel playback device abstraction.
///
/// Channel indices match the scheduler's pool slots. Implementations must
/// tolerate `begin` on a channel that is already producing sound (restart)
/// and `halt`/`set_volume` on an idle channel (no-op); the scheduler treats
/// backend failures as degraded playback, never as fatal errors.
pub trait AudioOutput {
    /// Start producing sound on a channel.
    fn begin(
        &mut self,
        channel: usize,
        clip: &ClipSource,
        volume: f32,
        pitch: f32,
        looping: bool,
        position: [f32; 3],
    );

    /// Adjust the volume of a channel that is producing sound.
    fn set_volume(&mut self, channel: usize, volume: f32);

    /// Immediately silence a channel.
    fn halt(&mut self, channel: usize);

    /// Whether the channel is currently producing sound.
    fn is_producing_sound(&self, channel: usize) -> bool;
}

/// What a `begin` call looked like, recorded by [`NullOutput`].
#[derive(Debug, Clone, PartialEq)]
pub struct BeginCall {
    pub channel: usize,
    pub clip_path: String,
    pub volume: f32,
    pub pitch: f32,
    pub looping: bool,
    pub position: [f32; 3],
}

#[derive(Default)]
struct NullState {
    producing: HashSet<usize>,
    begins: Vec<BeginCall>,
    halts: Vec<usize>,
    volumes: HashMap<usize, f32>,
}

/// Backend that produces no sound and records every call. Used by tests and
/// headless hosts.
#[derive(Default)]
pub struct NullOutput {
    state: Arc<Mutex<NullState>>,
}

impl NullOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// A probe sharing this backend's state, for inspection after the
    /// backend itself has been handed to the scheduler.
    pub fn probe(&self) -> NullProbe {
        NullProbe {
            state: Arc::clone(&self.state),
        }
    }
}

impl AudioOutput for NullOutput {
    fn begin(
        &mut self,
        channel: usize,
        clip: &ClipSource,
        volume: f32,
        pitch: f32,
        looping: bool,
        position: [f32; 3],
    ) {
        let mut state = self.state.lock();
        state.producing.insert(channel);
        state.volumes.insert(channel, volume);
        state.begins.push(BeginCall {
            channel,
            clip_path: clip.path.clone(),
            volume,
            pitch,
            looping,
            position,
        });
    }

    fn set_volume(&mut self, channel: usize, volume: f32) {
        self.state.lock().volumes.insert(channel, volume);
    }

    fn halt(&mut self, channel: usize) {
        let mut state = self.state.lock();
        state.producing.remove(&channel);
        state.halts.push(channel);
    }

    fn is_producing_sound(&self, channel: usize) -> bool {
        self.state.lock().producing.contains(&channel)
    }
}

/// Read-only view into a [`NullOutput`]'s recorded activity.
#[derive(Clone)]
pub struct NullProbe {
    state: Arc<Mutex<NullState>>,
}

impl NullProbe {
    pub fn is_producing(&self, channel: usize) -> bool {
        self.state.lock().producing.contains(&channel)
    }

    pub fn begin_count(&self) -> usize {
        self.state.lock().begins.len()
    }

    pub fn begins(&self) -> Vec<BeginCall> {
        self.state.lock().begins.clone()
    }

    pub fn halt_count(&self) -> usize {
        self.state.lock().halts.len()
    }

    pub fn volume(&self, channel: usize) -> Option<f32> {
        self.state.lock().volumes.get(&channel).copied()
    }
}

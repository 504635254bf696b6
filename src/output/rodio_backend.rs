//! rodio-backed playback.
//!
//! One sink per channel, recreated on each `begin` so a restart never
//! inherits queued audio. Clip bytes are preloaded into memory and cached;
//! each play decodes from the in-memory copy. This backend mixes to plain
//! stereo; positioning is the host mixer's concern, so the emission point
//! is not used here.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};

use super::AudioOutput;
use crate::catalog::ClipSource;
use crate::error::AudioError;

pub struct RodioOutput {
    _stream: OutputStream,
    stream_handle: OutputStreamHandle,
    sinks: Vec<Option<Sink>>,
    cache: HashMap<String, Arc<Vec<u8>>>,
}

impl RodioOutput {
    /// Open the default output device with one slot per scheduler channel
    /// (general channels plus the reserved channel).
    pub fn new(channels: usize) -> Result<Self, AudioError> {
        let (stream, stream_handle) =
            OutputStream::try_default().map_err(|e| AudioError::StreamInitFailed(Box::new(e)))?;

        Ok(Self {
            _stream: stream,
            stream_handle,
            sinks: (0..channels).map(|_| None).collect(),
            cache: HashMap::new(),
        })
    }

    /// Read a clip into memory ahead of time. `begin` loads lazily, but
    /// preloading avoids disk reads on the playback path.
    pub fn preload(&mut self, clip: &ClipSource) -> Result<(), AudioError> {
        self.clip_bytes(&clip.path).map(|_| ())
    }

    fn clip_bytes(&mut self, path: &str) -> Result<Arc<Vec<u8>>, AudioError> {
        if let Some(bytes) = self.cache.get(path) {
            return Ok(Arc::clone(bytes));
        }

        let data = std::fs::read(path).map_err(|e| AudioError::LoadFailed {
            path: path.to_string(),
            source: Box::new(e),
        })?;
        tracing::debug!(path = %path, bytes = data.len(), "Loaded audio clip");

        let bytes = Arc::new(data);
        self.cache.insert(path.to_string(), Arc::clone(&bytes));
        Ok(bytes)
    }
}

impl AudioOutput for RodioOutput {
    fn begin(
        &mut self,
        channel: usize,
        clip: &ClipSource,
        volume: f32,
        pitch: f32,
        looping: bool,
        _position: [f32; 3],
    ) {
        if channel >= self.sinks.len() {
            tracing::warn!(channel, "begin on out-of-range backend channel");
            return;
        }

        let bytes = match self.clip_bytes(&clip.path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(channel, error = %e, "Skipping playback");
                return;
            }
        };

        // Stop whatever the previous occupant left behind.
        if let Some(old) = self.sinks[channel].take() {
            old.stop();
        }

        let sink = match Sink::try_new(&self.stream_handle) {
            Ok(sink) => sink,
            Err(e) => {
                tracing::error!(channel, error = %e, "Failed to create sink");
                return;
            }
        };

        // Note: rodio's Decoder requires owned data with 'static lifetime
        let cursor = Cursor::new((*bytes).clone());
        let decoder = match Decoder::new(cursor) {
            Ok(decoder) => decoder,
            Err(e) => {
                tracing::error!(channel, path = %clip.path, error = %e, "Failed to decode clip");
                return;
            }
        };

        // Each transformation returns a different type, so we use dynamic
        // dispatch to build the chain conditionally.
        let source: Box<dyn Source<Item = i16> + Send> = {
            let mut boxed: Box<dyn Source<Item = i16> + Send> = Box::new(decoder);

            if (pitch - 1.0).abs() > f32::EPSILON {
                boxed = Box::new(boxed.speed(pitch));
            }

            if looping {
                boxed = Box::new(boxed.repeat_infinite());
            }

            boxed
        };

        sink.append(source);
        sink.set_volume(volume.clamp(0.0, 1.0));
        sink.play();
        self.sinks[channel] = Some(sink);

        tracing::debug!(channel, path = %clip.path, volume, pitch, looping, "Playback began");
    }

    fn set_volume(&mut self, channel: usize, volume: f32) {
        if let Some(sink) = self.sinks.get(channel).and_then(Option::as_ref) {
            sink.set_volume(volume.clamp(0.0, 1.0));
        }
    }

    fn halt(&mut self, channel: usize) {
        if let Some(sink) = self.sinks.get_mut(channel).and_then(Option::take) {
            sink.stop();
        }
    }

    fn is_producing_sound(&self, channel: usize) -> bool {
        self.sinks
            .get(channel)
            .and_then(Option::as_ref)
            .map(|sink| !sink.empty())
            .unwrap_or(false)
    }
}

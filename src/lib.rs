//! Bounded audio-channel scheduler.
//!
//! Accepts requests to play a sound, decides whether and where each can play
//! given a fixed pool of playback channels, enforces per-group concurrency
//! caps and distance-based culling, and drives each active channel through a
//! fade-volume lifecycle until it finishes or is reclaimed. Rendering is
//! delegated to a pluggable [`AudioOutput`] backend; the crate ships a
//! rodio-based one plus a silent recording backend for tests and headless
//! hosts.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::time::{Duration, Instant};
//! use sfx_scheduler::{
//!     ChannelPreference, NullOutput, SchedulerConfig, SoundDefinition, SoundScheduler,
//! };
//!
//! let config = SchedulerConfig::default();
//! let mut scheduler = SoundScheduler::new(&config, Box::new(NullOutput::new()));
//! scheduler.set_listener_position(Some([0.0, 0.0, 0.0]));
//!
//! let shot: SoundDefinition = serde_json::from_str(
//!     r#"{"name": "shot", "clips": [{"path": "shot.mp3", "duration_secs": 0.8}]}"#,
//! ).unwrap();
//!
//! scheduler.tick(Instant::now());
//! if let Some(id) = scheduler.play(&shot, [2.0, 0.0, 1.0], ChannelPreference::Any, Duration::ZERO) {
//!     scheduler.fade_in(id, Duration::from_millis(200), 1.0);
//! }
//! // ... every frame:
//! scheduler.tick(Instant::now());
//! ```
//!
//! A rejected play request (culled, group at capacity, pool exhausted) is a
//! normal outcome signaled by `None`, not an error.

pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod output;
pub mod scheduler;

// Re-export the public surface
pub use catalog::{ClipSource, SoundCatalog, SoundDefinition};
pub use config::SchedulerConfig;
pub use error::{AppResult, AudioError, ConfigError};
pub use events::{EventBus, RejectReason, SchedulerEvent, SubscriberId};
pub use output::{AudioOutput, NullOutput, RodioOutput};
pub use scheduler::{
    Channel, ChannelId, ChannelPreference, FadePhase, FinishReason, FinishedCallback,
    FinishedEvent, GroupConfig, Priority, SoundGroup, SoundScheduler,
};

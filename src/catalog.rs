//! Sound catalog: logical sound names resolved to playback descriptors.
//!
//! The catalog is built from static configuration before the scheduler
//! starts. Duplicate names are reported and skipped rather than aborting,
//! and a missing sound resolves to a defined silent descriptor so lookups
//! never fail at runtime.

use std::collections::HashMap;
use std::time::Duration;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::scheduler::Priority;

/// Name reserved for the fallback descriptor returned for unknown sounds.
pub const SILENT_SOUND: &str = "__silent";

fn default_volume() -> f32 {
    1.0
}

fn default_pitch() -> f32 {
    1.0
}

/// One playable clip variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipSource {
    /// Path to the encoded audio data, resolved by the playback backend.
    pub path: String,

    /// Natural playback length. Drives the channel's end time; ignored for
    /// looping sounds.
    pub duration_secs: f32,
}

impl ClipSource {
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f32(self.duration_secs.max(0.0))
    }
}

/// Descriptor for one logical sound.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoundDefinition {
    pub name: String,

    /// Clip variants; one is chosen at random per play.
    #[serde(default)]
    pub clips: Vec<ClipSource>,

    #[serde(default)]
    pub priority: Priority,

    /// Base volume in [0, 1].
    #[serde(default = "default_volume")]
    pub volume: f32,

    /// Playback rate multiplier.
    #[serde(default = "default_pitch")]
    pub pitch: f32,

    /// Per-sound audible range; 0 means bounded only by the global range.
    #[serde(default)]
    pub max_distance: f32,

    /// Group name for concurrency capping; `None` for group-less playback.
    #[serde(default)]
    pub group: Option<String>,

    #[serde(default)]
    pub looping: bool,
}

impl SoundDefinition {
    /// The descriptor unknown sound names resolve to: nothing to play,
    /// nothing audible.
    pub fn silent() -> Self {
        Self {
            name: SILENT_SOUND.to_string(),
            clips: Vec::new(),
            priority: Priority::VeryLow,
            volume: 0.0,
            pitch: 1.0,
            max_distance: 0.0,
            group: None,
            looping: false,
        }
    }

    /// Pick a clip variant at random. `None` when the definition has no
    /// clips (the silent descriptor, or a misconfigured entry).
    pub fn pick_clip(&self) -> Option<&ClipSource> {
        self.clips.choose(&mut rand::thread_rng())
    }
}

/// All sound definitions known to the host, keyed by name.
pub struct SoundCatalog {
    sounds: HashMap<String, SoundDefinition>,
    silent: SoundDefinition,
}

impl SoundCatalog {
    /// Build the catalog. Duplicate names keep the first definition; later
    /// duplicates are skipped and returned so the caller can report them.
    pub fn from_definitions(definitions: Vec<SoundDefinition>) -> (Self, Vec<String>) {
        let mut sounds = HashMap::new();
        let mut skipped = Vec::new();

        for def in definitions {
            if sounds.contains_key(&def.name) {
                tracing::warn!(sound = %def.name, "Duplicate sound definition skipped");
                skipped.push(def.name);
                continue;
            }
            sounds.insert(def.name.clone(), def);
        }

        let catalog = Self {
            sounds,
            silent: SoundDefinition::silent(),
        };
        (catalog, skipped)
    }

    /// Resolve a name, falling back to the silent descriptor when unknown.
    pub fn resolve(&self, name: &str) -> &SoundDefinition {
        match self.sounds.get(name) {
            Some(def) => def,
            None => {
                tracing::debug!(sound = %name, "Unknown sound resolved to silent descriptor");
                &self.silent
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&SoundDefinition> {
        self.sounds.get(name)
    }

    pub fn len(&self) -> usize {
        self.sounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sounds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(name: &str, clips: usize) -> SoundDefinition {
        SoundDefinition {
            name: name.to_string(),
            clips: (0..clips)
                .map(|i| ClipSource {
                    path: format!("{name}_{i}.mp3"),
                    duration_secs: 1.5,
                })
                .collect(),
            priority: Priority::default(),
            volume: 1.0,
            pitch: 1.0,
            max_distance: 0.0,
            group: None,
            looping: false,
        }
    }

    #[test]
    fn test_duplicate_definitions_skipped() {
        let (catalog, skipped) =
            SoundCatalog::from_definitions(vec![def("shot", 1), def("step", 2), def("shot", 3)]);

        assert_eq!(catalog.len(), 2);
        assert_eq!(skipped, vec!["shot".to_string()]);
        // First definition wins
        assert_eq!(catalog.get("shot").unwrap().clips.len(), 1);
    }

    #[test]
    fn test_unknown_name_resolves_to_silent() {
        let (catalog, _) = SoundCatalog::from_definitions(vec![]);
        let resolved = catalog.resolve("missing");

        assert_eq!(resolved.name, SILENT_SOUND);
        assert!(resolved.clips.is_empty());
        assert_eq!(resolved.volume, 0.0);
    }

    #[test]
    fn test_pick_clip_draws_from_variants() {
        let definition = def("step", 3);
        for _ in 0..20 {
            let clip = definition.pick_clip().unwrap();
            assert!(clip.path.starts_with("step_"));
        }
    }

    #[test]
    fn test_silent_descriptor_has_no_clip() {
        assert!(SoundDefinition::silent().pick_clip().is_none());
    }

    #[test]
    fn test_clip_duration_negative_clamped() {
        let clip = ClipSource {
            path: "x.mp3".to_string(),
            duration_secs: -1.0,
        };
        assert_eq!(clip.duration(), Duration::ZERO);
    }

    #[test]
    fn test_definition_serialization_defaults() {
        let json = r#"{"name": "shot", "clips": [{"path": "shot.mp3", "duration_secs": 0.8}]}"#;
        let def: SoundDefinition = serde_json::from_str(json).unwrap();

        assert_eq!(def.priority, Priority::Normal);
        assert_eq!(def.volume, 1.0);
        assert_eq!(def.pitch, 1.0);
        assert!(!def.looping);
        assert!(def.group.is_none());
    }
}

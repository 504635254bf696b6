//! Named sound groups with concurrent-play caps.
//!
//! Group capacity is independent of channel pooling: a play request can be
//! rejected because its group is saturated even when free channels remain.

use serde::{Deserialize, Serialize};

/// Non-owning handle into the scheduler's group registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId(pub(crate) usize);

/// Static configuration for one group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupConfig {
    pub name: String,

    /// Maximum simultaneous plays; 0 means unlimited.
    #[serde(default)]
    pub max_concurrent: u32,
}

/// A named category of sounds sharing a concurrent-play cap.
#[derive(Debug)]
pub struct SoundGroup {
    name: String,
    max_concurrent: u32,
    current: u32,
}

impl SoundGroup {
    fn new(name: String, max_concurrent: u32) -> Self {
        Self {
            name,
            max_concurrent,
            current: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_concurrent(&self) -> u32 {
        self.max_concurrent
    }

    pub fn current_count(&self) -> u32 {
        self.current
    }

    fn can_admit(&self) -> bool {
        self.max_concurrent == 0 || self.current < self.max_concurrent
    }
}

/// All groups known to the scheduler, with the admission/counting logic.
///
/// Increment and decrement clamp instead of asserting: a mismatched pair
/// caused by an external force-stop must not wedge admission control, and the
/// count is only ever used for admission, not exact accounting.
#[derive(Debug, Default)]
pub struct GroupRegistry {
    groups: Vec<SoundGroup>,
}

impl GroupRegistry {
    /// Build the registry from static configuration. Duplicate names keep
    /// the first entry; later duplicates are skipped and returned so the
    /// caller can report them. Counts start at zero.
    pub fn from_configs(configs: &[GroupConfig]) -> (Self, Vec<String>) {
        let mut registry = Self::default();
        let mut skipped = Vec::new();

        for config in configs {
            if registry.id(&config.name).is_some() {
                tracing::warn!(group = %config.name, "Duplicate sound group skipped");
                skipped.push(config.name.clone());
                continue;
            }
            registry
                .groups
                .push(SoundGroup::new(config.name.clone(), config.max_concurrent));
        }

        (registry, skipped)
    }

    pub fn id(&self, name: &str) -> Option<GroupId> {
        self.groups
            .iter()
            .position(|g| g.name == name)
            .map(GroupId)
    }

    pub fn get(&self, id: GroupId) -> Option<&SoundGroup> {
        self.groups.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Admission check. Group-less playback is always admitted.
    pub fn can_play(&self, id: Option<GroupId>) -> bool {
        match id.and_then(|id| self.groups.get(id.0)) {
            Some(group) => group.can_admit(),
            None => true,
        }
    }

    /// Count one successful allocation against the group.
    pub fn increment(&mut self, id: Option<GroupId>) {
        if let Some(group) = id.and_then(|id| self.groups.get_mut(id.0)) {
            group.current = group.current.saturating_add(1);
            if group.max_concurrent > 0 {
                group.current = group.current.min(group.max_concurrent);
            }
        }
    }

    /// Release one allocation. Called exactly once per successful allocation
    /// that consumed a slot, from the scheduler's stop/reclaim path.
    pub fn decrement(&mut self, id: Option<GroupId>) {
        if let Some(group) = id.and_then(|id| self.groups.get_mut(id.0)) {
            group.current = group.current.saturating_sub(1);
        }
    }

    /// Zero every counter, as on scheduler (re)initialization.
    pub fn reset_counts(&mut self) {
        for group in &mut self.groups {
            group.current = 0;
        }
    }
}

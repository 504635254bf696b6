//! Timed volume ramps for playback channels.
//!
//! A fade is plain state advanced by the scheduler tick, not a suspended
//! routine. At most one fade drives a channel's volume at any instant;
//! starting a new one always replaces the old one.

use std::time::Duration;

/// What a fade ramp is doing to the channel once it completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeKind {
    /// Ramp from silence up to a target volume.
    In,
    /// Ramp down to silence; the channel is stopped on completion.
    Out,
    /// Ramp to a target volume; the channel keeps playing there.
    Duck,
}

/// Observable fade state of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadePhase {
    None,
    FadingIn,
    FadingOut,
    Ducking,
}

/// Result of advancing a fade by one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeStep {
    /// Volume the channel should be at after this step.
    pub volume: f32,
    /// The ramp reached its target exactly; the task is spent.
    pub finished: bool,
}

/// One in-flight volume ramp: linear from a start volume to a target over a
/// duration, after an optional start delay.
#[derive(Debug, Clone)]
pub struct FadeTask {
    kind: FadeKind,
    start_volume: f32,
    target_volume: f32,
    duration: Duration,
    delay: Duration,
    elapsed: Duration,
}

impl FadeTask {
    pub fn new(
        kind: FadeKind,
        start_volume: f32,
        target_volume: f32,
        duration: Duration,
        delay: Duration,
    ) -> Self {
        Self {
            kind,
            start_volume: start_volume.clamp(0.0, 1.0),
            target_volume: target_volume.clamp(0.0, 1.0),
            duration,
            delay,
            elapsed: Duration::ZERO,
        }
    }

    pub fn kind(&self) -> FadeKind {
        self.kind
    }

    pub fn phase(&self) -> FadePhase {
        match self.kind {
            FadeKind::In => FadePhase::FadingIn,
            FadeKind::Out => FadePhase::FadingOut,
            FadeKind::Duck => FadePhase::Ducking,
        }
    }

    pub fn target_volume(&self) -> f32 {
        self.target_volume
    }

    /// Advance the ramp by `dt` of elapsed time.
    ///
    /// The start delay is consumed first; any remainder of `dt` flows into
    /// the ramp itself, so a tick that straddles the delay boundary does not
    /// lose time. Once `elapsed >= duration` the step reports exactly the
    /// target volume (no floating overshoot) and marks the task finished.
    pub fn advance(&mut self, mut dt: Duration) -> FadeStep {
        if !self.delay.is_zero() {
            if dt < self.delay {
                self.delay -= dt;
                return FadeStep {
                    volume: self.start_volume,
                    finished: false,
                };
            }
            dt -= self.delay;
            self.delay = Duration::ZERO;
        }

        self.elapsed = self.elapsed.saturating_add(dt);

        if self.duration.is_zero() || self.elapsed >= self.duration {
            return FadeStep {
                volume: self.target_volume,
                finished: true,
            };
        }

        let t = self.elapsed.as_secs_f32() / self.duration.as_secs_f32();
        FadeStep {
            volume: lerp(self.start_volume, self.target_volume, t),
            finished: false,
        }
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_ramp_midpoint() {
        let mut task = FadeTask::new(FadeKind::In, 0.0, 1.0, ms(1000), Duration::ZERO);
        let step = task.advance(ms(500));
        assert!((step.volume - 0.5).abs() < 1e-4);
        assert!(!step.finished);
    }

    #[test]
    fn test_ramp_hits_exact_target() {
        let mut task = FadeTask::new(FadeKind::Out, 0.8, 0.0, ms(1000), Duration::ZERO);
        let step = task.advance(ms(1500));
        assert_eq!(step.volume, 0.0);
        assert!(step.finished);
    }

    #[test]
    fn test_zero_duration_completes_immediately() {
        let mut task = FadeTask::new(FadeKind::Duck, 1.0, 0.3, Duration::ZERO, Duration::ZERO);
        let step = task.advance(ms(1));
        assert_eq!(step.volume, 0.3);
        assert!(step.finished);
    }

    #[test]
    fn test_delay_holds_start_volume() {
        let mut task = FadeTask::new(FadeKind::Out, 0.6, 0.0, ms(1000), ms(500));
        let step = task.advance(ms(200));
        assert_eq!(step.volume, 0.6);
        assert!(!step.finished);
    }

    #[test]
    fn test_delay_remainder_flows_into_ramp() {
        let mut task = FadeTask::new(FadeKind::Out, 1.0, 0.0, ms(1000), ms(500));
        // 500ms delay + 500ms of ramp in one step
        let step = task.advance(ms(1000));
        assert!((step.volume - 0.5).abs() < 1e-4);
        assert!(!step.finished);

        let step = task.advance(ms(500));
        assert_eq!(step.volume, 0.0);
        assert!(step.finished);
    }

    #[test]
    fn test_volumes_clamped_on_construction() {
        let task = FadeTask::new(FadeKind::In, -0.5, 1.5, ms(100), Duration::ZERO);
        assert_eq!(task.target_volume(), 1.0);
        assert_eq!(task.start_volume, 0.0);
    }

    #[test]
    fn test_phase_mapping() {
        let task = FadeTask::new(FadeKind::In, 0.0, 1.0, ms(100), Duration::ZERO);
        assert_eq!(task.phase(), FadePhase::FadingIn);
        let task = FadeTask::new(FadeKind::Out, 1.0, 0.0, ms(100), Duration::ZERO);
        assert_eq!(task.phase(), FadePhase::FadingOut);
        let task = FadeTask::new(FadeKind::Duck, 1.0, 0.2, ms(100), Duration::ZERO);
        assert_eq!(task.phase(), FadePhase::Ducking);
    }
}

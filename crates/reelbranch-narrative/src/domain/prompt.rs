//! Decision prompt state machine.
//!
//! One machine instance tracks the node that is currently playing. It is
//! restarted whenever the active node changes and advanced only by playback
//! progress reports.

use serde::Serialize;

/// Default gap, in seconds, between the reported position and the end of the
/// segment at which the prompt is raised.
pub const DEFAULT_NEAR_END_THRESHOLD_SECS: f64 = 6.0;

/// Tuning for the prompt state machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PromptConfig {
    /// Remaining playback time at or below which the prompt fires. Zero
    /// fires only once the reported position reaches the duration.
    pub near_end_threshold_secs: f64,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            near_end_threshold_secs: DEFAULT_NEAR_END_THRESHOLD_SECS,
        }
    }
}

/// Where the active node is in its prompt lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptPhase {
    /// Segment playing, prompt hidden.
    Playing,
    /// The near-end edge fired and the prompt is about to be committed.
    NearEnd,
    /// Prompt visible, playback halted.
    PromptShown,
}

/// Edge-triggered near-end detector.
#[derive(Debug, Clone)]
pub struct PromptMachine {
    phase: PromptPhase,
    threshold: f64,
}

impl PromptMachine {
    /// Creates a machine in `Playing`.
    #[must_use]
    pub fn new(config: PromptConfig) -> Self {
        Self {
            phase: PromptPhase::Playing,
            threshold: config.near_end_threshold_secs.max(0.0),
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> PromptPhase {
        self.phase
    }

    /// Resets to `Playing` for a newly activated node.
    pub fn restart(&mut self) {
        self.phase = PromptPhase::Playing;
    }

    /// Feeds a progress report. Returns `true` exactly once per activation:
    /// when the report first lands inside the near-end window of a segment
    /// with a known duration.
    pub fn observe(&mut self, position: f64, duration: f64) -> bool {
        if self.phase != PromptPhase::Playing {
            return false;
        }
        if !position.is_finite() || !duration.is_finite() || duration <= 0.0 {
            return false;
        }
        if duration - position <= self.threshold {
            self.phase = PromptPhase::NearEnd;
            return true;
        }
        false
    }

    /// Marks the prompt as shown after the edge has been acted on.
    pub fn commit_prompt(&mut self) {
        if self.phase == PromptPhase::NearEnd {
            self.phase = PromptPhase::PromptShown;
        }
    }
}

impl Default for PromptMachine {
    fn default() -> Self {
        Self::new(PromptConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observe_fires_once_inside_window() {
        let mut machine = PromptMachine::default();

        assert!(!machine.observe(10.0, 100.0));
        assert!(machine.observe(94.0, 100.0));
        machine.commit_prompt();
        assert!(!machine.observe(96.0, 100.0));
        assert_eq!(machine.phase(), PromptPhase::PromptShown);
    }

    #[test]
    fn test_zero_threshold_waits_for_exact_end() {
        let mut machine = PromptMachine::new(PromptConfig {
            near_end_threshold_secs: 0.0,
        });

        assert!(!machine.observe(99.5, 100.0));
        assert!(machine.observe(100.0, 100.0));
    }

    #[test]
    fn test_unknown_duration_never_fires() {
        let mut machine = PromptMachine::default();

        assert!(!machine.observe(0.0, 0.0));
        assert!(!machine.observe(3.0, f64::NAN));
        assert_eq!(machine.phase(), PromptPhase::Playing);
    }

    #[test]
    fn test_restart_rearms_the_edge() {
        let mut machine = PromptMachine::default();
        assert!(machine.observe(99.0, 100.0));
        machine.commit_prompt();

        machine.restart();

        assert_eq!(machine.phase(), PromptPhase::Playing);
        assert!(machine.observe(99.0, 100.0));
    }
}

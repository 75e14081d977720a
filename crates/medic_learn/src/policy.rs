//! Confidence arithmetic.
//!
//! Base confidence is the success ratio. Once a solution has proven
//! itself often enough it earns a loyalty bonus, capped at 1.0, so a
//! veteran remedy with one bad day is not overtaken by a lucky newcomer.

use medic_config::LearningConfig;
use medic_store::ConfidenceModel;

#[derive(Debug, Clone, Copy)]
pub struct ConfidencePolicy {
    bonus: f64,
    bonus_threshold: u32,
}

impl ConfidencePolicy {
    pub fn from_config(config: &LearningConfig) -> Self {
        Self {
            bonus: config.confidence_bonus,
            bonus_threshold: config.bonus_success_threshold,
        }
    }
}

impl Default for ConfidencePolicy {
    fn default() -> Self {
        Self::from_config(&LearningConfig::default())
    }
}

impl ConfidenceModel for ConfidencePolicy {
    fn initial(&self, success: bool) -> f64 {
        if success { 1.0 } else { 0.1 }
    }

    fn recompute(&self, success_count: u32, failure_count: u32) -> f64 {
        let total = success_count + failure_count;
        if total == 0 {
            return 0.0;
        }
        let mut confidence = f64::from(success_count) / f64::from(total);
        if success_count >= self.bonus_threshold {
            confidence = (confidence + self.bonus).min(1.0);
        }
        confidence
    }
}

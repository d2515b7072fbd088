//! Smell gate for smellcheck.
//!
//! The overall score is the highest confidence of any reported smell; a run
//! passes when that score does not exceed the threshold.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::detect::{RunResult, SmellResult};

/// Default threshold when the config doesn't specify one.
pub const DEFAULT_THRESHOLD: f64 = 0.75;

/// The calculated smell score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmellScore {
    /// Highest smell confidence, 0.0 when there are no smells
    pub score: f64,
    pub smell_count: usize,
    /// Smells whose confidence exceeds the threshold
    pub high_confidence_count: usize,
    /// Number of smells per smell type
    pub breakdown: BTreeMap<String, usize>,
    /// The threshold used
    pub threshold: f64,
    /// Whether the check passed (score <= threshold)
    pub passed: bool,
}

/// Calculate the smell score of a run with the configured threshold.
pub fn calculate(result: &RunResult, config: &Config) -> SmellScore {
    calculate_with_threshold(result.smells(), config.threshold)
}

/// Calculate the smell score of any set of smells.
pub fn calculate_with_threshold<'a>(
    smells: impl IntoIterator<Item = &'a SmellResult>,
    threshold: f64,
) -> SmellScore {
    let mut score: f64 = 0.0;
    let mut smell_count = 0;
    let mut high_confidence_count = 0;
    let mut breakdown = BTreeMap::new();

    for smell in smells {
        smell_count += 1;
        score = score.max(smell.confidence);
        if smell.confidence > threshold {
            high_confidence_count += 1;
        }
        *breakdown.entry(smell.smell.as_str().to_string()).or_insert(0) += 1;
    }

    SmellScore {
        score,
        smell_count,
        high_confidence_count,
        breakdown,
        threshold,
        passed: score <= threshold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{Metric, Severity, SmellKind};

    fn make_smell(smell: SmellKind, confidence: f64) -> SmellResult {
        SmellResult {
            smell,
            display_name: smell.display_name().to_string(),
            confidence,
            location: "f".to_string(),
            start_line: 1,
            end_line: 2,
            metric_value: Metric::Count(1),
            threshold: Metric::Count(1),
            refactor_hint: String::new(),
            severity: Severity::Warning,
        }
    }

    #[test]
    fn test_no_smells_passes() {
        let score = calculate(&RunResult::default(), &Config::default());
        assert_eq!(score.score, 0.0);
        assert_eq!(score.smell_count, 0);
        assert!(score.passed);
    }

    #[test]
    fn test_score_is_max_confidence() {
        let smells = vec![
            make_smell(SmellKind::LongMethod, 0.6),
            make_smell(SmellKind::DeepNesting, 0.9),
            make_smell(SmellKind::LongMethod, 0.8),
        ];
        let score = calculate_with_threshold(&smells, DEFAULT_THRESHOLD);
        assert_eq!(score.score, 0.9);
        assert_eq!(score.smell_count, 3);
        assert_eq!(score.high_confidence_count, 2);
        assert_eq!(score.breakdown.get("long_method"), Some(&2));
        assert!(!score.passed);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let smells = vec![make_smell(SmellKind::GodClass, 0.75)];
        let score = calculate_with_threshold(&smells, 0.75);
        assert!(score.passed);
        assert_eq!(score.high_confidence_count, 0);
    }
}

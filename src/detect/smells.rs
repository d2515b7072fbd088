//! Smell classification over extracted features.
//!
//! Each smell has a fixed threshold; the excess over it is mapped to a
//! confidence in `[0, 1]` with a logistic curve:
//!
//! ```text
//! confidence = 1 / (1 + e^(-excess / scale))
//! ```
//!
//! which is 0.5 at the threshold and approaches 1.0 as the excess grows.
//! Thresholds and scales are fixed so scores stay comparable across runs.

use crate::analysis;
use crate::features::{self, ClassFeatures, FileFeatures, MethodFeatures};

use super::{Metric, Severity, SmellKind, SmellResult};

/// Trigger thresholds (a smell fires when the metric exceeds them).
pub mod thresholds {
    pub const LONG_METHOD_LOC: usize = 30;
    pub const LARGE_PARAMETER_LIST: usize = 5;
    pub const DEEP_NESTING: usize = 3;
    pub const HIGH_COMPLEXITY: usize = 10;
    /// Minimum number of classified calls before feature envy is considered.
    pub const FEATURE_ENVY_MIN_CALLS: usize = 3;
    pub const FEATURE_ENVY_RATIO: f64 = 0.7;
    pub const GOD_CLASS_METHODS: usize = 10;
    pub const GOD_CLASS_WMC: usize = 40;
}

/// Sigmoid scales per smell.
pub mod scales {
    pub const LONG_METHOD: f64 = 20.0;
    pub const LARGE_PARAMETER_LIST: f64 = 3.0;
    pub const DEEP_NESTING: f64 = 2.0;
    pub const HIGH_COMPLEXITY: f64 = 5.0;
    pub const FEATURE_ENVY: f64 = 3.0;
    /// Feature envy ratios are multiplied by this before the sigmoid.
    pub const FEATURE_ENVY_AMPLIFY: f64 = 10.0;
    pub const GOD_CLASS_METHODS: f64 = 5.0;
    pub const GOD_CLASS_WMC: f64 = 20.0;
}

/// Severity escalation limits.
pub mod escalation {
    /// `long_method` is an error from this many lines.
    pub const LONG_METHOD_ERROR_LOC: usize = 60;
    /// `high_complexity` is an error above this complexity.
    pub const HIGH_COMPLEXITY_ERROR: usize = 20;
    /// `god_class` (method count) is an error above this many methods.
    pub const GOD_CLASS_ERROR_METHODS: usize = 20;
}

mod hints {
    pub const LONG_METHOD: &str = "Extract sub-routines using the 'Extract Method' refactoring.";
    pub const LARGE_PARAMETER_LIST: &str = "Introduce a Parameter Object or Builder pattern.";
    pub const DEEP_NESTING: &str =
        "Flatten using early returns or extract nested blocks into separate methods.";
    pub const HIGH_COMPLEXITY: &str =
        "Simplify branches: extract conditions, use polymorphism, or redesign logic.";
    pub const FEATURE_ENVY: &str =
        "Move the method closer to the data it uses via 'Move Method' refactoring.";
    pub const GOD_CLASS_METHODS: &str =
        "Split the class by responsibility using the Single Responsibility Principle.";
    pub const GOD_CLASS_WMC: &str =
        "Decompose complex methods and distribute responsibilities across smaller classes.";
}

/// Logistic calibration of a threshold excess.
pub fn sigmoid(excess: f64, scale: f64) -> f64 {
    1.0 / (1.0 + (-excess / scale).exp())
}

/// Classify every function and class in `features`.
///
/// Standalone functions are evaluated first, then each class followed by its
/// methods; the result is stably sorted by confidence, highest first.
pub fn classify(features: &FileFeatures) -> Vec<SmellResult> {
    let mut smells = Vec::new();

    for function in &features.standalone_functions {
        smells.extend(method_smells(function, None));
    }

    for class in &features.classes {
        smells.extend(class_smell(class));
        for method in &class.methods {
            smells.extend(method_smells(method, Some(&class.name)));
        }
    }

    smells.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    smells
}

/// Parse, extract and classify in one step.
///
/// Malformed source or an unsupported language yields no smells; use
/// [`features::extract_source`] to tell "clean" from "not analyzed".
pub fn detect_smells(source: &str, language: &str) -> Vec<SmellResult> {
    match analysis::parse(source, language) {
        Ok(tree) => classify(&features::extract(&tree)),
        Err(e) => {
            tracing::debug!("smell detection skipped: {}", e);
            Vec::new()
        }
    }
}

/// Serialize findings as a JSON array.
pub fn smells_to_json(smells: &[SmellResult]) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(smells)?)
}

/// Evaluate every method-level smell independently.
fn method_smells(method: &MethodFeatures, class_name: Option<&str>) -> Vec<SmellResult> {
    let location = match class_name {
        Some(class) => format!("{}.{}", class, method.name),
        None => method.name.clone(),
    };
    let finding = |smell: SmellKind,
                   confidence: f64,
                   metric_value: Metric,
                   threshold: Metric,
                   refactor_hint: &str,
                   severity: Severity| SmellResult {
        smell,
        display_name: smell.display_name().to_string(),
        confidence,
        location: location.clone(),
        start_line: method.start_line,
        end_line: method.end_line,
        metric_value,
        threshold,
        refactor_hint: refactor_hint.to_string(),
        severity,
    };

    let mut smells = Vec::new();

    if method.loc > thresholds::LONG_METHOD_LOC {
        let severity = if method.loc >= escalation::LONG_METHOD_ERROR_LOC {
            Severity::Error
        } else {
            Severity::Warning
        };
        smells.push(finding(
            SmellKind::LongMethod,
            sigmoid(excess(method.loc, thresholds::LONG_METHOD_LOC), scales::LONG_METHOD),
            Metric::Count(method.loc),
            Metric::Count(thresholds::LONG_METHOD_LOC),
            hints::LONG_METHOD,
            severity,
        ));
    }

    if method.params > thresholds::LARGE_PARAMETER_LIST {
        smells.push(finding(
            SmellKind::LargeParameterList,
            sigmoid(
                excess(method.params, thresholds::LARGE_PARAMETER_LIST),
                scales::LARGE_PARAMETER_LIST,
            ),
            Metric::Count(method.params),
            Metric::Count(thresholds::LARGE_PARAMETER_LIST),
            hints::LARGE_PARAMETER_LIST,
            Severity::Warning,
        ));
    }

    if method.max_nesting_depth > thresholds::DEEP_NESTING {
        smells.push(finding(
            SmellKind::DeepNesting,
            sigmoid(
                excess(method.max_nesting_depth, thresholds::DEEP_NESTING),
                scales::DEEP_NESTING,
            ),
            Metric::Count(method.max_nesting_depth),
            Metric::Count(thresholds::DEEP_NESTING),
            hints::DEEP_NESTING,
            Severity::Warning,
        ));
    }

    if method.complexity > thresholds::HIGH_COMPLEXITY {
        let severity = if method.complexity > escalation::HIGH_COMPLEXITY_ERROR {
            Severity::Error
        } else {
            Severity::Warning
        };
        smells.push(finding(
            SmellKind::HighComplexity,
            sigmoid(
                excess(method.complexity, thresholds::HIGH_COMPLEXITY),
                scales::HIGH_COMPLEXITY,
            ),
            Metric::Count(method.complexity),
            Metric::Count(thresholds::HIGH_COMPLEXITY),
            hints::HIGH_COMPLEXITY,
            severity,
        ));
    }

    let total_calls = method.total_calls();
    if total_calls >= thresholds::FEATURE_ENVY_MIN_CALLS {
        let ratio = method.external_calls as f64 / total_calls as f64;
        if ratio > thresholds::FEATURE_ENVY_RATIO {
            let amplified = (ratio - thresholds::FEATURE_ENVY_RATIO) * scales::FEATURE_ENVY_AMPLIFY;
            smells.push(finding(
                SmellKind::FeatureEnvy,
                sigmoid(amplified, scales::FEATURE_ENVY),
                Metric::Ratio(round2(ratio)),
                Metric::Ratio(thresholds::FEATURE_ENVY_RATIO),
                hints::FEATURE_ENVY,
                Severity::Warning,
            ));
        }
    }

    smells
}

/// At most one god-class finding: method count first, then WMC.
fn class_smell(class: &ClassFeatures) -> Option<SmellResult> {
    let (display_name, confidence, metric, threshold, hint, severity) =
        if class.num_methods > thresholds::GOD_CLASS_METHODS {
            let severity = if class.num_methods > escalation::GOD_CLASS_ERROR_METHODS {
                Severity::Error
            } else {
                Severity::Warning
            };
            (
                "God Class",
                sigmoid(
                    excess(class.num_methods, thresholds::GOD_CLASS_METHODS),
                    scales::GOD_CLASS_METHODS,
                ),
                class.num_methods,
                thresholds::GOD_CLASS_METHODS,
                hints::GOD_CLASS_METHODS,
                severity,
            )
        } else if class.wmc > thresholds::GOD_CLASS_WMC {
            (
                "God Class (High WMC)",
                sigmoid(
                    excess(class.wmc, thresholds::GOD_CLASS_WMC),
                    scales::GOD_CLASS_WMC,
                ),
                class.wmc,
                thresholds::GOD_CLASS_WMC,
                hints::GOD_CLASS_WMC,
                Severity::Error,
            )
        } else {
            return None;
        };

    Some(SmellResult {
        smell: SmellKind::GodClass,
        display_name: display_name.to_string(),
        confidence,
        location: class.name.clone(),
        start_line: class.start_line,
        end_line: class.end_line,
        metric_value: Metric::Count(metric),
        threshold: Metric::Count(threshold),
        refactor_hint: hint.to_string(),
        severity,
    })
}

fn excess(value: usize, threshold: usize) -> f64 {
    value.saturating_sub(threshold) as f64
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

//! Core types for detection results.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity levels for findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// The structural smells the classifier reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmellKind {
    LongMethod,
    GodClass,
    FeatureEnvy,
    LargeParameterList,
    DeepNesting,
    HighComplexity,
}

impl SmellKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SmellKind::LongMethod => "long_method",
            SmellKind::GodClass => "god_class",
            SmellKind::FeatureEnvy => "feature_envy",
            SmellKind::LargeParameterList => "large_parameter_list",
            SmellKind::DeepNesting => "deep_nesting",
            SmellKind::HighComplexity => "high_complexity",
        }
    }

    /// Human-readable name used in reports.
    pub fn display_name(&self) -> &'static str {
        match self {
            SmellKind::LongMethod => "Long Method",
            SmellKind::GodClass => "God Class",
            SmellKind::FeatureEnvy => "Feature Envy",
            SmellKind::LargeParameterList => "Large Parameter List",
            SmellKind::DeepNesting => "Deep Nesting",
            SmellKind::HighComplexity => "High Cyclomatic Complexity",
        }
    }

    /// Named refactoring that addresses the smell.
    pub fn strategy(&self) -> &'static str {
        match self {
            SmellKind::LongMethod => "Extract Method",
            SmellKind::GodClass => "Split Class",
            SmellKind::FeatureEnvy => "Move Method",
            SmellKind::LargeParameterList => "Introduce Parameter Object",
            SmellKind::DeepNesting => "Flatten with Early Returns",
            SmellKind::HighComplexity => "Simplify Branching",
        }
    }
}

impl fmt::Display for SmellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A metric value or threshold: a count, or a ratio for feature envy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Metric {
    Count(usize),
    Ratio(f64),
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Count(n) => write!(f, "{}", n),
            Metric::Ratio(r) => write!(f, "{:.2}", r),
        }
    }
}

/// A located, scored smell finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmellResult {
    pub smell: SmellKind,
    pub display_name: String,
    /// Calibrated confidence in `[0, 1]`.
    pub confidence: f64,
    /// `Class.method`, `function` or `Class`.
    pub location: String,
    pub start_line: usize,
    pub end_line: usize,
    pub metric_value: Metric,
    pub threshold: Metric,
    pub refactor_hint: String,
    pub severity: Severity,
}

/// Kinds of control-flow defects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    InfiniteLoop,
    UnreachableCode,
    VariableNotUpdated,
}

impl IssueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::InfiniteLoop => "infinite_loop",
            IssueType::UnreachableCode => "unreachable_code",
            IssueType::VariableNotUpdated => "variable_not_updated",
        }
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single control-flow defect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlFlowIssue {
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub line: usize,
    pub description: String,
    pub severity: Severity,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_serializes_untagged() {
        assert_eq!(serde_json::to_string(&Metric::Count(12)).unwrap(), "12");
        assert_eq!(serde_json::to_string(&Metric::Ratio(0.75)).unwrap(), "0.75");
    }

    #[test]
    fn test_issue_serializes_type_field() {
        let issue = ControlFlowIssue {
            issue_type: IssueType::UnreachableCode,
            line: 3,
            description: "Unreachable code after return statement".into(),
            severity: Severity::Warning,
        };
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["type"], "unreachable_code");
        assert_eq!(json["severity"], "warning");
    }
}

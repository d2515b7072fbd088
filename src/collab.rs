//! Boundaries to external collaborators.
//!
//! Logic analysis, optimization advice and refactoring are provided by
//! components outside this crate (typically model-backed services). They are
//! consumed through the traits below. The one place a collaborator calls back
//! into the analysis core is [`RefactorGuard`], which only accepts a rewrite
//! once it re-parses.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::analysis::{self, Language, LoopKind, Node, NodeKind, SyntaxTree};
use crate::detect::SmellKind;
use crate::error::AnalysisError;

/// Produces free-text observations about the logic of a source unit.
pub trait LogicAnalyzer: Send + Sync {
    fn analyze(&self, source: &str, language: Language) -> anyhow::Result<Vec<String>>;
}

/// Produces optimization suggestions for a source unit.
pub trait Optimizer: Send + Sync {
    fn suggest(&self, source: &str, language: Language) -> anyhow::Result<Vec<OptimizationSuggestion>>;
}

/// Rewrites a source unit to remove one smell.
///
/// Returns the raw response; code is pulled out with [`extract_code`].
pub trait Refactorer: Send + Sync {
    fn refactor(&self, source: &str, smell: SmellKind, confidence: f64) -> anyhow::Result<String>;
}

/// One optimization suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizationSuggestion {
    /// Category such as `performance` or `readability`.
    #[serde(rename = "type")]
    pub kind: String,
    pub line: usize,
    pub suggestion: String,
    pub impact: String,
    #[serde(default)]
    pub example: String,
}

/// Drop suggestions repeating an earlier `(line, suggestion)` pair.
pub fn dedupe_suggestions(suggestions: Vec<OptimizationSuggestion>) -> Vec<OptimizationSuggestion> {
    let mut seen = HashSet::new();
    suggestions
        .into_iter()
        .filter(|s| seen.insert((s.line, s.suggestion.clone())))
        .collect()
}

static TAGGED_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```[\w+#-]+[ \t]*\r?\n([\s\S]+?)```").unwrap());

static BARE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```\s*([\s\S]+?)```").unwrap());

/// Pull code out of a collaborator response.
///
/// Prefers the first fenced block with a language tag, then any fenced block,
/// then the whole response. The result is trimmed.
pub fn extract_code(raw: &str) -> String {
    for fence in [&*TAGGED_FENCE, &*BARE_FENCE] {
        if let Some(code) = fence.captures(raw).and_then(|c| c.get(1)) {
            return code.as_str().trim().to_string();
        }
    }
    raw.trim().to_string()
}

/// Check a rewrite candidate; empty candidates are invalid.
pub fn validate_candidate(candidate: &str, language: Language) -> Result<(), AnalysisError> {
    if candidate.trim().is_empty() {
        return Err(AnalysisError::ValidationFailure("candidate is empty".to_string()));
    }
    analysis::get_backend(language)
        .validate(candidate)
        .map_err(|e| AnalysisError::ValidationFailure(e.to_string()))
}

/// Result of a guarded refactoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefactorOutcome {
    pub success: bool,
    /// The rewrite on success, the unchanged input otherwise.
    pub refactored_text: String,
    pub smell: SmellKind,
    pub strategy: String,
    pub notes: String,
}

/// Runs a [`Refactorer`] and rolls back any rewrite that does not parse.
pub struct RefactorGuard<R> {
    refactorer: R,
    language: Language,
}

impl<R: Refactorer> RefactorGuard<R> {
    pub fn new(refactorer: R, language: Language) -> Self {
        Self {
            refactorer,
            language,
        }
    }

    pub fn refactor(&self, source: &str, smell: SmellKind, confidence: f64) -> RefactorOutcome {
        let strategy = smell.strategy().to_string();
        let rolled_back = |notes: String| RefactorOutcome {
            success: false,
            refactored_text: source.to_string(),
            smell,
            strategy: strategy.clone(),
            notes,
        };

        let raw = match self.refactorer.refactor(source, smell, confidence) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("refactoring collaborator failed: {:#}", e);
                return rolled_back(format!("Refactoring collaborator error: {:#}", e));
            }
        };

        let candidate = extract_code(&raw);
        match validate_candidate(&candidate, self.language) {
            Ok(()) => RefactorOutcome {
                success: true,
                refactored_text: candidate,
                smell,
                strategy: strategy.clone(),
                notes: format!(
                    "Applied '{}' refactoring; the result parses. Confidence was {:.0}%.",
                    strategy,
                    confidence * 100.0
                ),
            },
            Err(e) => {
                tracing::debug!("rolling back refactor candidate: {}", e);
                rolled_back(format!(
                    "{}; rolled back to the original. Review the code manually.",
                    e
                ))
            }
        }
    }
}

/// Syntax-only optimizer for loop idioms.
///
/// Flags `range(len(x))` iteration, loops whose only statement appends to a
/// list, and loops nested inside loops. Source that fails to parse yields no
/// suggestions.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicOptimizer;

impl Optimizer for HeuristicOptimizer {
    fn suggest(&self, source: &str, language: Language) -> anyhow::Result<Vec<OptimizationSuggestion>> {
        let tree = match analysis::get_backend(language).parse(source) {
            Ok(tree) => tree,
            Err(_) => return Ok(Vec::new()),
        };
        Ok(dedupe_suggestions(loop_suggestions(&tree)))
    }
}

fn loop_suggestions(tree: &SyntaxTree) -> Vec<OptimizationSuggestion> {
    let loops: Vec<&Node> = tree
        .walk()
        .filter(|n| matches!(n.kind, NodeKind::For { .. }))
        .collect();
    let mut out = Vec::new();

    for node in &loops {
        if let NodeKind::For {
            kind: LoopKind::Each,
            iter: Some(iter),
            ..
        } = &node.kind
        {
            if is_range_len(iter) {
                out.push(suggestion(
                    "readability",
                    node,
                    "Use enumerate() instead of range(len())",
                    "More Pythonic and readable",
                    "for i, item in enumerate(items):",
                ));
            }
        }
    }

    if tree.language() == Language::Python {
        for node in &loops {
            if let Some([only]) = node.body() {
                if is_method_call(only, "append") {
                    out.push(suggestion(
                        "readability",
                        node,
                        "Consider using list comprehension",
                        "More concise and Pythonic",
                        "result = [item for item in items]",
                    ));
                }
            }
        }
    }

    for node in &loops {
        let nested = node
            .children()
            .into_iter()
            .flat_map(|child| child.walk())
            .any(|n| matches!(n.kind, NodeKind::For { .. }));
        if nested {
            out.push(suggestion(
                "performance",
                node,
                "Nested loops detected - consider optimizing",
                "May have O(n²) time complexity",
                "Consider using sets, dicts, or different algorithm",
            ));
        }
    }

    out
}

fn suggestion(kind: &str, node: &Node, text: &str, impact: &str, example: &str) -> OptimizationSuggestion {
    OptimizationSuggestion {
        kind: kind.to_string(),
        line: node.start_line(),
        suggestion: text.to_string(),
        impact: impact.to_string(),
        example: example.to_string(),
    }
}

fn is_call_to<'n>(node: &'n Node, function: &str) -> Option<&'n [Node]> {
    match &node.kind {
        NodeKind::Call { callee, args } if callee.name() == Some(function) => Some(args),
        _ => None,
    }
}

fn is_range_len(iter: &Node) -> bool {
    matches!(is_call_to(iter, "range"), Some([arg]) if is_call_to(arg, "len").is_some())
}

fn is_method_call(node: &Node, method: &str) -> bool {
    match &node.kind {
        NodeKind::Call { callee, .. } => {
            matches!(&callee.kind, NodeKind::Attribute { attr, .. } if attr == method)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    struct Canned(&'static str);

    impl Refactorer for Canned {
        fn refactor(&self, _: &str, _: SmellKind, _: f64) -> anyhow::Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct Failing;

    impl Refactorer for Failing {
        fn refactor(&self, _: &str, _: SmellKind, _: f64) -> anyhow::Result<String> {
            Err(anyhow!("service unavailable"))
        }
    }

    const ORIGINAL: &str = "def f(a, b, c, d, e, g):\n    return a\n";

    #[test]
    fn test_extract_code_prefers_tagged_fence() {
        let raw = "Here you go:\n```python\ndef f():\n    return 1\n```\nDone.";
        assert_eq!(extract_code(raw), "def f():\n    return 1");
    }

    #[test]
    fn test_extract_code_bare_fence_and_plain() {
        assert_eq!(extract_code("```\nx = 1\n```"), "x = 1");
        assert_eq!(extract_code("  x = 1  \n"), "x = 1");
    }

    #[test]
    fn test_guard_accepts_valid_rewrite() {
        let guard = RefactorGuard::new(
            Canned("```python\ndef f(params):\n    return params.a\n```"),
            Language::Python,
        );
        let outcome = guard.refactor(ORIGINAL, SmellKind::LargeParameterList, 0.6);
        assert!(outcome.success);
        assert_eq!(outcome.refactored_text, "def f(params):\n    return params.a");
        assert_eq!(outcome.strategy, "Introduce Parameter Object");
    }

    #[test]
    fn test_guard_rolls_back_invalid_rewrite() {
        let guard = RefactorGuard::new(Canned("def f(:\n"), Language::Python);
        let outcome = guard.refactor(ORIGINAL, SmellKind::LongMethod, 0.9);
        assert!(!outcome.success);
        assert_eq!(outcome.refactored_text, ORIGINAL);
        assert!(outcome.notes.contains("rolled back"));
    }

    #[test]
    fn test_guard_rolls_back_truncated_rewrite() {
        let guard = RefactorGuard::new(
            Canned("```python\ndef build_report(rows):\n```"),
            Language::Python,
        );
        let outcome = guard.refactor(ORIGINAL, SmellKind::LongMethod, 0.9);
        assert!(!outcome.success);
        assert_eq!(outcome.refactored_text, ORIGINAL);
        assert!(outcome.notes.contains("expected an indented block"));
    }

    #[test]
    fn test_guard_rolls_back_empty_rewrite() {
        let guard = RefactorGuard::new(Canned("```\n   \n```"), Language::Python);
        assert!(!guard.refactor(ORIGINAL, SmellKind::LongMethod, 0.9).success);
    }

    #[test]
    fn test_guard_rolls_back_on_collaborator_error() {
        let guard = RefactorGuard::new(Failing, Language::Python);
        let outcome = guard.refactor(ORIGINAL, SmellKind::GodClass, 0.8);
        assert!(!outcome.success);
        assert_eq!(outcome.refactored_text, ORIGINAL);
        assert!(outcome.notes.contains("service unavailable"));
    }

    #[test]
    fn test_validate_candidate_error_kind() {
        let err = validate_candidate("", Language::Python).unwrap_err();
        assert!(matches!(err, AnalysisError::ValidationFailure(_)));
        assert!(validate_candidate("x = 1\n", Language::Python).is_ok());
    }

    #[test]
    fn test_dedupe_keeps_first() {
        let s = |line, text: &str, impact: &str| OptimizationSuggestion {
            kind: "performance".into(),
            line,
            suggestion: text.into(),
            impact: impact.into(),
            example: String::new(),
        };
        let deduped = dedupe_suggestions(vec![
            s(1, "a", "first"),
            s(1, "a", "second"),
            s(2, "a", "third"),
        ]);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].impact, "first");
    }

    #[test]
    fn test_heuristic_optimizer() {
        let src = "\
for i in range(len(items)):
    print(items[i])

out = []
for x in xs:
    out.append(x)

for a in xs:
    for b in ys:
        pair(a, b)
";
        let found = HeuristicOptimizer.suggest(src, Language::Python).unwrap();
        let lines: Vec<(usize, &str)> = found.iter().map(|s| (s.line, s.kind.as_str())).collect();
        assert_eq!(
            lines,
            vec![(1, "readability"), (5, "readability"), (8, "performance")]
        );
    }

    #[test]
    fn test_heuristic_optimizer_ignores_bad_source() {
        assert!(HeuristicOptimizer
            .suggest("for x in\n", Language::Python)
            .unwrap()
            .is_empty());
    }
}

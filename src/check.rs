//! Syntax checking with fix suggestions.
//!
//! Deterministic: a failed parse becomes one `syntax_error` diagnostic with a
//! suggestion guessed from the message and the offending line. Source that
//! parses is additionally checked for Python import forms that tend to break
//! outside a package.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::analysis::{self, Language, NodeKind, SyntaxTree};
use crate::error::{AnalysisError, ParseError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckStatus::Ok => write!(f, "ok"),
            CheckStatus::Warning => write!(f, "warning"),
            CheckStatus::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    SyntaxError,
    ImportWarning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    #[serde(rename = "type")]
    pub kind: DiagnosticKind,
    pub line: usize,
    pub column: usize,
    pub message: String,
    pub suggestion: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckReport {
    pub status: CheckStatus,
    pub errors: Vec<Diagnostic>,
}

impl CheckReport {
    pub fn has_errors(&self) -> bool {
        self.status == CheckStatus::Error
    }
}

/// Check `source` written in `language_id`.
///
/// Malformed source is reported. An unknown language id or a backend failure,
/// such as a tree nested past the depth limit, is an error.
pub fn check(source: &str, language_id: &str) -> Result<CheckReport, AnalysisError> {
    let language: Language = language_id.parse()?;

    let tree = match analysis::get_backend(language).parse(source) {
        Ok(tree) => tree,
        Err(AnalysisError::Parse(e)) => {
            return Ok(CheckReport {
                status: CheckStatus::Error,
                errors: vec![syntax_diagnostic(&e, source, language)],
            })
        }
        Err(e) => return Err(e),
    };

    let errors = import_warnings(&tree);
    let status = if errors.is_empty() {
        CheckStatus::Ok
    } else {
        CheckStatus::Warning
    };
    Ok(CheckReport { status, errors })
}

fn syntax_diagnostic(error: &ParseError, source: &str, language: Language) -> Diagnostic {
    let line_text = source
        .lines()
        .nth(error.line.saturating_sub(1))
        .unwrap_or_default();
    let previous = source
        .lines()
        .take(error.line.saturating_sub(1))
        .filter(|l| !l.trim().is_empty())
        .last();

    Diagnostic {
        kind: DiagnosticKind::SyntaxError,
        line: error.line,
        column: error.column,
        message: error.message.clone(),
        suggestion: suggest_fix(&error.message, line_text, previous, language),
    }
}

static BLOCK_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(if|elif|else|def|class|for|while|try|except|finally|with)\b").unwrap()
});

static MISSING_CLOSER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^missing '[)\]}]'$").unwrap());

/// Guess a fix for a syntax error from its message and source line.
pub fn suggest_fix(message: &str, line: &str, previous: Option<&str>, language: Language) -> String {
    let lower = message.to_lowercase();

    if language == Language::Python {
        if let Some(caps) = BLOCK_HEADER.captures(line) {
            if lower == "missing ':'" || !line.contains(':') {
                return colon_hint(&caps[1]).to_string();
            }
        }
    }

    if MISSING_CLOSER.is_match(&lower) || unbalanced(line) {
        return "Check for unclosed parentheses, brackets, or quotes".to_string();
    }

    if has_unterminated_string(line) {
        return "Add closing quote to string".to_string();
    }

    if language == Language::Python
        && (lower.contains("indent") || unexpected_indent(line, previous))
    {
        return "Fix indentation - use consistent spaces or tabs".to_string();
    }

    if let Some(rest) = lower.strip_prefix("missing parentheses in call to ") {
        let name = rest.trim_matches(|c: char| !c.is_alphanumeric());
        return format!("Call {} as a function: {}(...)", name, name);
    }

    if lower.starts_with("missing") {
        return format!("Insert the {}", lower.trim_start_matches("missing "));
    }

    if lower == "invalid syntax" {
        return "Check syntax - missing colon, parenthesis, or bracket".to_string();
    }

    format!("Review {} syntax documentation", language_title(language))
}

fn colon_hint(keyword: &str) -> &'static str {
    match keyword {
        "if" | "elif" => "Add colon ':' after if condition",
        "def" => "Add colon ':' after function definition",
        "class" => "Add colon ':' after class definition",
        "for" => "Add colon ':' after for statement",
        "while" => "Add colon ':' after while condition",
        "with" => "Add colon ':' after with statement",
        _ => "Add colon ':' at the end of the block header",
    }
}

fn unbalanced(line: &str) -> bool {
    let mut depth: i64 = 0;
    for c in line.chars() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            _ => {}
        }
    }
    depth != 0
}

fn has_unterminated_string(line: &str) -> bool {
    let mut open: Option<char> = None;
    let mut escaped = false;
    for c in line.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match (open, c) {
            (Some(_), '\\') => escaped = true,
            (Some(q), c) if c == q => open = None,
            (None, '#') => break,
            (None, '"' | '\'' | '`') => open = Some(c),
            _ => {}
        }
    }
    open.is_some()
}

/// Deeper indentation after a line that does not open a block.
fn unexpected_indent(line: &str, previous: Option<&str>) -> bool {
    let indent = |s: &str| s.len() - s.trim_start().len();
    match previous {
        Some(prev) => indent(line) > indent(prev) && !prev.trim_end().ends_with(':'),
        None => indent(line) > 0,
    }
}

fn language_title(language: Language) -> &'static str {
    match language {
        Language::Python => "Python",
        Language::JavaScript => "JavaScript",
        Language::TypeScript | Language::Tsx => "TypeScript",
    }
}

fn import_warnings(tree: &SyntaxTree) -> Vec<Diagnostic> {
    if tree.language() != Language::Python {
        return Vec::new();
    }

    let mut out = Vec::new();
    for node in tree.walk() {
        if let NodeKind::Import {
            modules,
            relative,
            wildcard,
            ..
        } = &node.kind
        {
            if *relative {
                out.push(Diagnostic {
                    kind: DiagnosticKind::ImportWarning,
                    line: node.start_line(),
                    column: node.span.start_col,
                    message: format!("Relative import detected: {}", modules.join(", ")),
                    suggestion: "Relative imports may fail outside package context".to_string(),
                });
            }
            if *wildcard {
                out.push(Diagnostic {
                    kind: DiagnosticKind::ImportWarning,
                    line: node.start_line(),
                    column: node.span.start_col,
                    message: "Wildcard import detected (import *)".to_string(),
                    suggestion: "Consider importing specific names for clarity".to_string(),
                });
            }
        }
    }
    out
}

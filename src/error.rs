//! Error taxonomy for the analysis core.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A structured syntax error reported by a language backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseError {
    /// Line of the first offending token (1-indexed).
    pub line: usize,
    /// Column of the first offending token (1-indexed).
    pub column: usize,
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

/// Errors produced by the parser adapter and its clients.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// The source is malformed.
    #[error("syntax error at {0}")]
    Parse(ParseError),
    /// No backend exists for the requested language.
    #[error("language {0:?} is not supported")]
    UnsupportedLanguage(String),
    /// A refactor candidate did not re-parse.
    #[error("refactored code failed validation: {0}")]
    ValidationFailure(String),
    /// The tree-sitter runtime rejected a grammar or returned no tree.
    #[error("parser backend failure: {0}")]
    Backend(String),
    /// The syntax tree nests deeper than the analyses walk.
    #[error("source nests deeper than {limit} levels at line {line}")]
    TooDeep { line: usize, limit: usize },
}

impl AnalysisError {
    /// The syntax error, if this is a parse failure.
    pub fn parse_error(&self) -> Option<&ParseError> {
        match self {
            AnalysisError::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ParseError> for AnalysisError {
    fn from(e: ParseError) -> Self {
        AnalysisError::Parse(e)
    }
}

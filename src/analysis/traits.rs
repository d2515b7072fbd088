//! Core trait for language backends.

use super::{Language, SyntaxTree};
use crate::error::AnalysisError;

/// Language-specific parser backend.
///
/// Each supported language implements this trait to turn source text into
/// the language-neutral [`SyntaxTree`].
///
/// # Thread Safety
///
/// Note: tree_sitter::Parser is not Sync, so implementations create a parser
/// per call instead of sharing one.
pub trait LanguageBackend: Send + Sync {
    /// The language (or dialect) this backend parses.
    fn language(&self) -> Language;

    /// Returns file extensions this backend handles (without dot).
    ///
    /// Examples: `["py"]`, `["ts", "mts"]`
    fn file_extensions(&self) -> &'static [&'static str];

    /// Parse source text and lower it into a [`SyntaxTree`].
    ///
    /// Fails with [`AnalysisError::Parse`] carrying the position of the first
    /// offending token when the source is malformed, and with
    /// [`AnalysisError::TooDeep`] when it nests past
    /// [`MAX_TREE_DEPTH`](super::MAX_TREE_DEPTH).
    fn parse(&self, source: &str) -> Result<SyntaxTree, AnalysisError>;

    /// Check that `source` parses cleanly.
    fn validate(&self, source: &str) -> Result<(), AnalysisError> {
        self.parse(source).map(|_| ())
    }

    /// Check if this backend handles the given file extension.
    fn handles_extension(&self, ext: &str) -> bool {
        self.file_extensions().contains(&ext)
    }
}

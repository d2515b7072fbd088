//! Parser adapter: source text in, language-neutral syntax tree out.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────┐     ┌───────────────┐
//! │ Source text     │────▶│ Backends     │────▶│ SyntaxTree    │
//! │ + language id   │     │ (Python, JS, │     │ (Module,      │
//! └─────────────────┘     │  TS, TSX)    │     │  Function, …) │
//!                         └──────────────┘     └───────────────┘
//!                                                      │
//!                         ┌──────────────┐             │
//!                         │ features,    │◀────────────┘
//!                         │ detect       │
//!                         └──────────────┘
//! ```
//!
//! # Adding a New Language
//!
//! 1. Create a new module in `src/analysis/languages/`
//! 2. Implement `LanguageBackend`, lowering the tree-sitter CST into `Node`s
//! 3. Add a `Language` variant and register the backend in `languages/mod.rs`

mod languages;
mod traits;
mod tree;

pub use languages::{
    get_backend, get_backend_by_id, get_backend_for_extension, register_backends, Dialect,
    JavaScriptBackend, Language, PythonBackend, MAX_TREE_DEPTH,
};
pub use traits::LanguageBackend;
pub use tree::{
    BoolOperator, Literal, LoopKind, Node, NodeKind, Param, Span, SyntaxTree, Walk,
};

use crate::error::AnalysisError;

/// Parse `source` written in `language_id` (canonical name or alias).
///
/// Fails with [`AnalysisError::UnsupportedLanguage`] for unknown languages and
/// [`AnalysisError::Parse`] when the source is malformed.
pub fn parse(source: &str, language_id: &str) -> Result<SyntaxTree, AnalysisError> {
    get_backend_by_id(language_id)?.parse(source)
}

/// Check that `source` is syntactically valid in `language_id`.
pub fn validate(source: &str, language_id: &str) -> Result<(), AnalysisError> {
    get_backend_by_id(language_id)?.validate(source)
}

//! Language backend implementations and the static backend registry.

mod javascript;
mod python;

pub use javascript::{Dialect, JavaScriptBackend};
pub use python::PythonBackend;

use std::fmt;
use std::str::FromStr;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use super::LanguageBackend;
use crate::error::{AnalysisError, ParseError};

/// Languages with a registered backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Tsx,
}

impl Language {
    pub const ALL: [Language; 4] = [
        Language::Python,
        Language::JavaScript,
        Language::TypeScript,
        Language::Tsx,
    ];

    /// Canonical identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Tsx => "tsx",
        }
    }

    /// Resolve a language from its file extension (without dot).
    pub fn from_extension(ext: &str) -> Option<Language> {
        Language::ALL
            .into_iter()
            .find(|lang| get_backend(*lang).handles_extension(ext))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = AnalysisError;

    /// Accepts canonical names, editor language ids and common aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "python" | "py" => Ok(Language::Python),
            "javascript" | "js" | "javascriptreact" | "jsx" => Ok(Language::JavaScript),
            "typescript" | "ts" => Ok(Language::TypeScript),
            "typescriptreact" | "tsx" => Ok(Language::Tsx),
            _ => Err(AnalysisError::UnsupportedLanguage(s.to_string())),
        }
    }
}

/// Static storage for the Python backend.
static PYTHON_BACKEND: OnceCell<PythonBackend> = OnceCell::new();

/// Static storage for the JavaScript backend.
static JAVASCRIPT_BACKEND: OnceCell<JavaScriptBackend> = OnceCell::new();

/// Static storage for the TypeScript backend.
static TYPESCRIPT_BACKEND: OnceCell<JavaScriptBackend> = OnceCell::new();

/// Static storage for the TSX backend.
static TSX_BACKEND: OnceCell<JavaScriptBackend> = OnceCell::new();

/// Initialize every backend up front.
///
/// Optional; backends are created lazily on first use. Idempotent.
pub fn register_backends() {
    for lang in Language::ALL {
        get_backend(lang);
    }
}

/// Get the backend for a language.
pub fn get_backend(language: Language) -> &'static dyn LanguageBackend {
    match language {
        Language::Python => PYTHON_BACKEND.get_or_init(PythonBackend::new),
        Language::JavaScript => {
            JAVASCRIPT_BACKEND.get_or_init(|| JavaScriptBackend::new(Dialect::JavaScript))
        }
        Language::TypeScript => {
            TYPESCRIPT_BACKEND.get_or_init(|| JavaScriptBackend::new(Dialect::TypeScript))
        }
        Language::Tsx => TSX_BACKEND.get_or_init(|| JavaScriptBackend::new(Dialect::Tsx)),
    }
}

/// Get a backend by language identifier or alias.
pub fn get_backend_by_id(lang_id: &str) -> Result<&'static dyn LanguageBackend, AnalysisError> {
    lang_id.parse::<Language>().map(get_backend)
}

/// Get a backend for the given file extension (without dot).
///
/// Returns None if no backend handles the extension.
pub fn get_backend_for_extension(ext: &str) -> Option<&'static dyn LanguageBackend> {
    Language::from_extension(ext).map(get_backend)
}

/// Named, non-extra children of a tree-sitter node (comments are extras).
pub(crate) fn named_children<'t>(node: tree_sitter::Node<'t>) -> Vec<tree_sitter::Node<'t>> {
    let mut cursor = node.walk();
    let children = node
        .named_children(&mut cursor)
        .filter(|child| !child.is_extra())
        .collect();
    children
}

/// Children of a node under a repeated field name.
pub(crate) fn field_children<'t>(
    node: tree_sitter::Node<'t>,
    field: &str,
) -> Vec<tree_sitter::Node<'t>> {
    let mut cursor = node.walk();
    let children = node.children_by_field_name(field, &mut cursor).collect();
    children
}

/// Locate the first syntax error in a tree-sitter tree, in document order.
///
/// `MISSING` nodes are reported as `missing <token>`, `ERROR` nodes as
/// `invalid syntax`.
pub(crate) fn first_syntax_error(root: tree_sitter::Node) -> Option<ParseError> {
    if !root.has_error() {
        return None;
    }

    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_missing() || node.is_error() {
            let pos = node.start_position();
            let message = if node.is_error() {
                "invalid syntax".to_string()
            } else if node.is_named() {
                format!("missing {}", node.kind())
            } else {
                format!("missing '{}'", node.kind())
            };
            return Some(ParseError {
                line: pos.row + 1,
                column: pos.column + 1,
                message,
            });
        }

        if node.has_error() {
            let mut cursor = node.walk();
            let children: Vec<_> = node.children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
    }

    None
}

/// Deepest syntax tree the backends lower.
///
/// Lowering, nesting metrics and tree teardown recurse once per level, so
/// anything deeper is rejected before lowering starts.
pub const MAX_TREE_DEPTH: usize = 128;

/// Reject trees nesting deeper than [`MAX_TREE_DEPTH`].
///
/// Each `elif_clause` also counts the clauses before it, since the lowered
/// tree chains them as nested `else` branches.
pub(crate) fn check_depth(root: tree_sitter::Node) -> Result<(), AnalysisError> {
    let mut stack = vec![(root, 0usize)];
    while let Some((node, depth)) = stack.pop() {
        if depth > MAX_TREE_DEPTH {
            return Err(AnalysisError::TooDeep {
                line: node.start_position().row + 1,
                limit: MAX_TREE_DEPTH,
            });
        }

        let mut elifs = 0;
        for child in named_children(node) {
            let mut child_depth = depth + 1;
            if child.kind() == "elif_clause" {
                elifs += 1;
                child_depth += elifs;
            }
            stack.push((child, child_depth));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_aliases() {
        assert_eq!("python".parse::<Language>().unwrap(), Language::Python);
        assert_eq!("py".parse::<Language>().unwrap(), Language::Python);
        assert_eq!(
            "javascriptreact".parse::<Language>().unwrap(),
            Language::JavaScript
        );
        assert_eq!("ts".parse::<Language>().unwrap(), Language::TypeScript);
        assert_eq!("typescriptreact".parse::<Language>().unwrap(), Language::Tsx);
        assert!(matches!(
            "cobol".parse::<Language>(),
            Err(AnalysisError::UnsupportedLanguage(_))
        ));
    }

    #[test]
    fn test_extension_lookup() {
        assert_eq!(Language::from_extension("py"), Some(Language::Python));
        assert_eq!(Language::from_extension("mjs"), Some(Language::JavaScript));
        assert_eq!(Language::from_extension("ts"), Some(Language::TypeScript));
        assert_eq!(Language::from_extension("tsx"), Some(Language::Tsx));
        assert!(get_backend_for_extension("rb").is_none());
        assert!(get_backend_for_extension("pyi").is_none());
    }

    #[test]
    fn test_backend_reports_its_language() {
        for lang in Language::ALL {
            assert_eq!(get_backend(lang).language(), lang);
        }
    }

    fn sum_chain(terms: usize) -> String {
        format!("x = 1{}\n", " + 1".repeat(terms))
    }

    #[test]
    fn test_deep_expression_is_too_deep() {
        let err = get_backend(Language::Python)
            .parse(&sum_chain(5000))
            .unwrap_err();
        assert_eq!(
            err,
            AnalysisError::TooDeep {
                line: 1,
                limit: MAX_TREE_DEPTH
            }
        );

        let js = format!("let x = 1{};\n", " + 1".repeat(5000));
        assert!(matches!(
            get_backend(Language::JavaScript).parse(&js),
            Err(AnalysisError::TooDeep { .. })
        ));
    }

    #[test]
    fn test_moderate_depth_still_parses() {
        assert!(get_backend(Language::Python).parse(&sum_chain(100)).is_ok());
    }

    #[test]
    fn test_long_elif_chain_counts_as_nesting() {
        let mut src = String::from("if x == 0:\n    pass\n");
        for i in 1..200 {
            src.push_str(&format!("elif x == {}:\n    pass\n", i));
        }
        assert!(matches!(
            get_backend(Language::Python).parse(&src),
            Err(AnalysisError::TooDeep { .. })
        ));

        let mut short = String::from("if x == 0:\n    pass\n");
        for i in 1..20 {
            short.push_str(&format!("elif x == {}:\n    pass\n", i));
        }
        assert!(get_backend(Language::Python).parse(&short).is_ok());
    }
}

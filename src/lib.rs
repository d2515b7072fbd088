//! smellcheck - static code smell and control-flow analysis.
//!
//! smellcheck parses one source unit at a time into a language-neutral
//! syntax tree, extracts per-method and per-class structural metrics, and
//! turns threshold excess into calibrated confidence scores for six
//! structural smells. A second pass finds control-flow defects and renders
//! a small flow graph of the first one as a Mermaid diagram.
//!
//! # Architecture
//!
//! The codebase uses tree-sitter for parsing:
//!
//! - `analysis`: Parser adapter, language backends and the `SyntaxTree`
//! - `features`: Structural metrics (LOC, complexity, nesting, coupling)
//! - `detect`: Smell classifier, control-flow analyzer and the `Runner`
//! - `check`: Syntax checking with fix suggestions
//! - `collab`: Interfaces to external logic, optimization and refactoring services
//! - `config`: YAML configuration schema
//! - `report`: Output formatting (text, JSON)
//! - `score`: Smell gate calculation
//!
//! # Example
//!
//! ```no_run
//! let smells = smellcheck::detect_smells("def f(a, b, c, d, e, g):\n    pass\n", "python");
//! assert_eq!(smells[0].smell, smellcheck::SmellKind::LargeParameterList);
//!
//! let flow = smellcheck::analyze_control_flow("while True:\n    pass\n", "python");
//! assert!(flow.has_issues);
//! ```

pub mod analysis;
pub mod check;
pub mod cli;
pub mod collab;
pub mod config;
pub mod detect;
pub mod error;
pub mod features;
pub mod report;
pub mod score;

pub use analysis::{parse, register_backends, validate, Language, LanguageBackend, SyntaxTree};
pub use check::{check, CheckReport, CheckStatus, Diagnostic, DiagnosticKind};
pub use collab::{
    extract_code, LogicAnalyzer, OptimizationSuggestion, Optimizer, RefactorGuard,
    RefactorOutcome, Refactorer,
};
pub use config::Config;
pub use detect::{
    analyze_control_flow, classify, detect_smells, ControlFlowAnalyzer, ControlFlowIssue,
    ControlFlowResult, FileReport, IssueType, RunResult, Runner, Severity, SmellKind,
    SmellResult,
};
pub use error::{AnalysisError, ParseError};
pub use features::{extract, extract_source, ClassFeatures, FileFeatures, MethodFeatures};
pub use score::SmellScore;

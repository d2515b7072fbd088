//! Detection runner that orchestrates all analyses for a set of files.

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::analysis::{get_backend, Language};
use crate::collab::{dedupe_suggestions, LogicAnalyzer, OptimizationSuggestion, Optimizer};
use crate::config::Config;
use crate::error::{AnalysisError, ParseError};
use crate::features;

use super::{classify, ControlFlowAnalyzer, ControlFlowIssue, ControlFlowResult, SmellResult};

/// Everything found in one source unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub language: Language,
    /// Set when the source did not parse; no other analysis is attempted then.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syntax_error: Option<ParseError>,
    /// Set when the backend failed for any other reason, such as a tree
    /// nesting past the depth limit. Analysis is not attempted then either.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_error: Option<String>,
    pub smells: Vec<SmellResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_flow: Option<ControlFlowResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub logic_findings: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub optimizations: Vec<OptimizationSuggestion>,
}

impl FileReport {
    fn new(language: Language) -> Self {
        Self {
            path: None,
            language,
            syntax_error: None,
            analysis_error: None,
            smells: Vec::new(),
            control_flow: None,
            logic_findings: Vec::new(),
            optimizations: Vec::new(),
        }
    }

    pub fn control_flow_issues(&self) -> &[ControlFlowIssue] {
        self.control_flow
            .as_ref()
            .map(|cf| cf.issues.as_slice())
            .unwrap_or_default()
    }

    pub fn is_clean(&self) -> bool {
        self.syntax_error.is_none()
            && self.analysis_error.is_none()
            && self.smells.is_empty()
            && self.control_flow_issues().is_empty()
    }
}

/// Reports for a set of files, sorted by path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub files: Vec<FileReport>,
    /// Files that could not be read.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unreadable: Vec<PathBuf>,
}

impl RunResult {
    pub fn smells(&self) -> impl Iterator<Item = &SmellResult> {
        self.files.iter().flat_map(|f| f.smells.iter())
    }

    pub fn control_flow_issues(&self) -> impl Iterator<Item = &ControlFlowIssue> {
        self.files.iter().flat_map(|f| f.control_flow_issues().iter())
    }

    pub fn syntax_error_count(&self) -> usize {
        self.files.iter().filter(|f| f.syntax_error.is_some()).count()
    }

    /// Files whose analysis failed for a reason other than a syntax error.
    pub fn analysis_error_count(&self) -> usize {
        self.files.iter().filter(|f| f.analysis_error.is_some()).count()
    }
}

/// Executes smell classification and control-flow analysis.
pub struct Runner {
    min_confidence: f64,
    control_flow: Option<ControlFlowAnalyzer>,
    logic: Option<Box<dyn LogicAnalyzer>>,
    optimizer: Option<Box<dyn Optimizer>>,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner {
    /// Create a runner with control-flow analysis on and no collaborators.
    pub fn new() -> Self {
        Self {
            min_confidence: 0.0,
            control_flow: Some(ControlFlowAnalyzer::default()),
            logic: None,
            optimizer: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new()
            .min_confidence(config.min_confidence)
            .control_flow(config.control_flow.enabled)
            .max_graphs(config.control_flow.max_graphs)
    }

    /// Hide smells less confident than `min_confidence`.
    pub fn min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    /// Set whether control-flow analysis runs.
    pub fn control_flow(mut self, enabled: bool) -> Self {
        self.control_flow = enabled.then(|| self.control_flow.unwrap_or_default());
        self
    }

    pub fn max_graphs(mut self, max_graphs: usize) -> Self {
        self.control_flow = self.control_flow.map(|cf| cf.with_max_graphs(max_graphs));
        self
    }

    pub fn with_logic_analyzer(mut self, analyzer: impl LogicAnalyzer + 'static) -> Self {
        self.logic = Some(Box::new(analyzer));
        self
    }

    pub fn with_optimizer(mut self, optimizer: impl Optimizer + 'static) -> Self {
        self.optimizer = Some(Box::new(optimizer));
        self
    }

    /// Analyze one source unit.
    ///
    /// A syntax error or backend failure is recorded in the report and ends
    /// the analysis.
    pub fn analyze_source(&self, source: &str, language: Language) -> FileReport {
        let mut report = FileReport::new(language);

        let tree = match get_backend(language).parse(source) {
            Ok(tree) => tree,
            Err(AnalysisError::Parse(e)) => {
                tracing::debug!("syntax error at {}, analysis not attempted", e);
                report.syntax_error = Some(e);
                return report;
            }
            Err(e) => {
                tracing::warn!("{}, analysis not attempted", e);
                report.analysis_error = Some(e.to_string());
                return report;
            }
        };

        let file_features = features::extract(&tree);
        report.smells = classify(&file_features)
            .into_iter()
            .filter(|s| s.confidence >= self.min_confidence)
            .collect();

        report.control_flow = self.control_flow.map(|cf| cf.analyze(&tree));

        if let Some(logic) = &self.logic {
            match logic.analyze(source, language) {
                Ok(findings) => report.logic_findings = findings,
                Err(e) => tracing::warn!("logic analyzer failed: {:#}", e),
            }
        }
        if let Some(optimizer) = &self.optimizer {
            match optimizer.suggest(source, language) {
                Ok(suggestions) => report.optimizations = dedupe_suggestions(suggestions),
                Err(e) => tracing::warn!("optimizer failed: {:#}", e),
            }
        }

        report
    }

    /// Analyze a file on disk, choosing the language by extension.
    ///
    /// Returns None for files no backend handles.
    pub fn analyze_file(&self, path: &Path) -> Option<anyhow::Result<FileReport>> {
        let ext = path.extension()?.to_str()?;
        let language = Language::from_extension(ext)?;

        Some(fs::read_to_string(path).map_err(anyhow::Error::from).map(|source| {
            tracing::debug!("analyzing {}", path.display());
            let mut report = self.analyze_source(&source, language);
            report.path = Some(path.to_path_buf());
            report
        }))
    }

    /// Analyze files in parallel. Results are sorted by path.
    pub fn run(&self, files: &[PathBuf]) -> RunResult {
        let results: Vec<_> = files
            .par_iter()
            .filter_map(|path| self.analyze_file(path).map(|r| (path, r)))
            .collect();

        let mut run = RunResult::default();
        for (path, result) in results {
            match result {
                Ok(report) => run.files.push(report),
                Err(e) => {
                    tracing::warn!("failed to read {}: {}", path.display(), e);
                    run.unreadable.push(path.clone());
                }
            }
        }

        // Sort by path for deterministic ordering
        run.files.sort_by(|a, b| a.path.cmp(&b.path));
        run.unreadable.sort();
        run
    }
}

//! Detection of structural smells and control-flow defects.

mod control_flow;
mod graph;
mod runner;
mod smells;
mod types;

pub use control_flow::{
    analyze_control_flow, ControlFlowAnalyzer, ControlFlowResult, MAX_GRAPHS_PER_ANALYSIS,
};
pub use graph::{to_mermaid, CfgEdge, CfgNode, CfgNodeType, PROBLEM_CLASS_DEF};
pub use runner::{FileReport, RunResult, Runner};
pub use smells::{classify, detect_smells, escalation, scales, sigmoid, smells_to_json, thresholds};
pub use types::{ControlFlowIssue, IssueType, Metric, Severity, SmellKind, SmellResult};

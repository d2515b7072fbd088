//! Minimal control-flow graphs for reported issues and their Mermaid rendering.

use serde::{Deserialize, Serialize};

/// Role of a node in an issue graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CfgNodeType {
    Entry,
    Condition,
    Block,
    Exit,
    Unreachable,
}

impl CfgNodeType {
    /// Mermaid shape delimiters for this node type.
    fn shape(&self) -> (&'static str, &'static str) {
        match self {
            CfgNodeType::Condition => ("{", "}"),
            CfgNodeType::Unreachable => ("[[", "]]"),
            CfgNodeType::Entry | CfgNodeType::Block | CfgNodeType::Exit => ("[", "]"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CfgNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: CfgNodeType,
    pub label: String,
    pub line: usize,
    pub is_problematic: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problem_description: Option<String>,
}

impl CfgNode {
    pub fn new(id: impl Into<String>, node_type: CfgNodeType, label: impl Into<String>, line: usize) -> Self {
        Self {
            id: id.into(),
            node_type,
            label: label.into(),
            line,
            is_problematic: false,
            problem_description: None,
        }
    }

    /// Mark the node as the location of a problem.
    pub fn problem(mut self, description: impl Into<String>) -> Self {
        self.is_problematic = true;
        self.problem_description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CfgEdge {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl CfgEdge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            label: None,
        }
    }

    pub fn labeled(from: impl Into<String>, to: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::new(from, to)
        }
    }
}

/// Style applied to problematic nodes.
pub const PROBLEM_CLASS_DEF: &str =
    "classDef problem fill:#ff6b6b,stroke:#c92a2a,stroke-width:3px,color:#fff";

/// Render nodes and edges as a Mermaid `flowchart TD`.
///
/// Output depends only on the input order, so identical graphs render
/// byte-for-byte identically. An empty graph renders as an empty string.
///
/// # Format
/// ```text
/// flowchart TD
///     start["Start"]
///     condition{"True"}:::problem
///     start --> condition
///     condition -->|"true"| body
///
///     classDef problem fill:#ff6b6b,...
/// ```
pub fn to_mermaid(nodes: &[CfgNode], edges: &[CfgEdge]) -> String {
    if nodes.is_empty() {
        return String::new();
    }

    let mut out = String::from("flowchart TD\n");

    for node in nodes {
        let (open, close) = node.node_type.shape();
        let class = if node.is_problematic { ":::problem" } else { "" };
        out.push_str(&format!(
            "    {}{}\"{}\"{}{}\n",
            node.id,
            open,
            escape_label(&node.label),
            close,
            class
        ));
    }

    for edge in edges {
        match &edge.label {
            Some(label) => out.push_str(&format!(
                "    {} -->|\"{}\"| {}\n",
                edge.from,
                escape_label(label),
                edge.to
            )),
            None => out.push_str(&format!("    {} --> {}\n", edge.from, edge.to)),
        }
    }

    out.push('\n');
    out.push_str("    ");
    out.push_str(PROBLEM_CLASS_DEF);
    out
}

/// Double quotes become single quotes and whitespace runs collapse to one space.
fn escape_label(label: &str) -> String {
    label
        .replace('"', "'")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_graph_renders_empty() {
        assert_eq!(to_mermaid(&[], &[]), "");
    }

    #[test]
    fn test_shapes_and_classes() {
        let nodes = vec![
            CfgNode::new("start", CfgNodeType::Entry, "Start", 1),
            CfgNode::new("condition", CfgNodeType::Condition, "True", 1).problem("loops"),
            CfgNode::new("exit", CfgNodeType::Unreachable, "Exit (unreachable)", 3)
                .problem("This exit is never reached"),
        ];
        let edges = vec![
            CfgEdge::new("start", "condition"),
            CfgEdge::labeled("condition", "exit", "false (never taken)"),
        ];

        let expected = "\
flowchart TD
    start[\"Start\"]
    condition{\"True\"}:::problem
    exit[[\"Exit (unreachable)\"]]:::problem
    start --> condition
    condition -->|\"false (never taken)\"| exit

    classDef problem fill:#ff6b6b,stroke:#c92a2a,stroke-width:3px,color:#fff";
        assert_eq!(to_mermaid(&nodes, &edges), expected);
    }

    #[test]
    fn test_label_escaping() {
        assert_eq!(escape_label("x == \"a\"\n   and y"), "x == 'a' and y");
    }

    #[test]
    fn test_node_serializes_type() {
        let node = CfgNode::new("body", CfgNodeType::Block, "Loop Body", 2);
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "block");
        assert!(json.get("problem_description").is_none());
    }
}

//! Control-flow defect detection: non-terminating loops, stale loop
//! conditions and code after `return`/`break`/`continue`.
//!
//! Rules are applied during one pre-order walk of the tree. At a loop node
//! the loop rules fire before the unreachable-code rule for its body, so the
//! issue list is in document order of the constructs that caused them.
//!
//! Only the first `max_graphs` issues get a flow graph; the default of one
//! graph per analysis is a deliberate limit, not an omission.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::analysis::{self, Language, LoopKind, Node, NodeKind, SyntaxTree};

use super::graph::{self, CfgEdge, CfgNode, CfgNodeType};
use super::{ControlFlowIssue, IssueType, Severity};

/// Default number of issues that receive a generated graph.
pub const MAX_GRAPHS_PER_ANALYSIS: usize = 1;

/// Issues found in one source unit, with the graph of the first issue(s).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlFlowResult {
    pub has_issues: bool,
    pub issues: Vec<ControlFlowIssue>,
    pub nodes: Vec<CfgNode>,
    pub edges: Vec<CfgEdge>,
    /// Mermaid flowchart of `nodes` and `edges`; empty when there is no graph.
    pub diagram: String,
}

impl ControlFlowResult {
    /// The result for source that could not be analyzed.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Analyze `source` with the default graph policy.
///
/// Parse failures and unsupported languages yield [`ControlFlowResult::empty`].
pub fn analyze_control_flow(source: &str, language: &str) -> ControlFlowResult {
    ControlFlowAnalyzer::default().analyze_source(source, language)
}

#[derive(Debug, Clone, Copy)]
pub struct ControlFlowAnalyzer {
    max_graphs: usize,
}

impl Default for ControlFlowAnalyzer {
    fn default() -> Self {
        Self {
            max_graphs: MAX_GRAPHS_PER_ANALYSIS,
        }
    }
}

impl ControlFlowAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate graphs for up to `max_graphs` issues instead of one.
    pub fn with_max_graphs(mut self, max_graphs: usize) -> Self {
        self.max_graphs = max_graphs;
        self
    }

    pub fn max_graphs(&self) -> usize {
        self.max_graphs
    }

    pub fn analyze_source(&self, source: &str, language: &str) -> ControlFlowResult {
        match analysis::parse(source, language) {
            Ok(tree) => self.analyze(&tree),
            Err(e) => {
                tracing::debug!("control-flow analysis skipped: {}", e);
                ControlFlowResult::empty()
            }
        }
    }

    pub fn analyze(&self, tree: &SyntaxTree) -> ControlFlowResult {
        let detections = detect(tree);

        let mut nodes = Vec::new();
        let mut edges = Vec::new();
        for (index, detection) in detections.iter().take(self.max_graphs).enumerate() {
            let prefix = if index == 0 {
                String::new()
            } else {
                format!("g{}_", index + 1)
            };
            let (n, e) = detection.graph(&prefix);
            nodes.extend(n);
            edges.extend(e);
        }

        let diagram = graph::to_mermaid(&nodes, &edges);
        let issues: Vec<ControlFlowIssue> = detections.into_iter().map(|d| d.issue).collect();

        ControlFlowResult {
            has_issues: !issues.is_empty(),
            issues,
            nodes,
            edges,
            diagram,
        }
    }
}

/// An issue together with the construct it was found on.
struct Detection {
    issue: ControlFlowIssue,
    origin: Origin,
}

enum Origin {
    /// A `while` loop, or a counter `for` drawn the same way.
    Conditional {
        line: usize,
        end_line: usize,
        condition: String,
        has_break: bool,
    },
    /// A `for` loop over a collection.
    Iteration {
        line: usize,
        end_line: usize,
        target: String,
        iterable: String,
    },
    /// A statement following a block terminator.
    Unreachable {
        owner_line: usize,
        terminator: &'static str,
        terminator_line: usize,
        line: usize,
    },
}

fn detect(tree: &SyntaxTree) -> Vec<Detection> {
    let mut found = Vec::new();

    for node in tree.walk() {
        match &node.kind {
            NodeKind::While { test, body, .. } => check_while(tree, node, test, body, &mut found),
            NodeKind::For {
                kind: LoopKind::Each,
                target,
                iter,
                body,
                ..
            } => {
                if let Some(target) = target {
                    check_overwritten_target(tree, node, target, iter.as_deref(), body, &mut found);
                }
            }
            NodeKind::For {
                kind: LoopKind::Counter,
                test,
                body,
                ..
            } => check_counter_loop(tree, node, test.as_deref(), body, &mut found),
            _ => {}
        }

        if matches!(
            node.kind,
            NodeKind::Function { .. }
                | NodeKind::Lambda { .. }
                | NodeKind::For { .. }
                | NodeKind::While { .. }
        ) {
            if let Some(body) = node.body() {
                check_unreachable(node, body, &mut found);
            }
        }
    }

    found
}

fn check_while(
    tree: &SyntaxTree,
    node: &Node,
    test: &Node,
    body: &[Node],
    found: &mut Vec<Detection>,
) {
    let condition = tree.text(test).to_string();
    let has_break = contains_break(body);

    if test.as_bool() == Some(true) {
        if has_break {
            return;
        }
        let description = match tree.language() {
            Language::Python => format!("Infinite loop: while {} without break statement", condition),
            _ => format!("Infinite loop: while({}) without break statement", condition),
        };
        found.push(Detection {
            issue: ControlFlowIssue {
                issue_type: IssueType::InfiniteLoop,
                line: node.start_line(),
                description,
                severity: Severity::Error,
            },
            origin: Origin::Conditional {
                line: node.start_line(),
                end_line: node.end_line(),
                condition,
                has_break,
            },
        });
        return;
    }

    let condition_vars = condition_variables(test);
    if condition_vars.is_empty() {
        return;
    }
    let modified = modified_variables(body);
    if condition_vars.iter().any(|v| modified.contains(v)) {
        return;
    }

    let names: Vec<&str> = condition_vars.iter().map(String::as_str).collect();
    found.push(Detection {
        issue: ControlFlowIssue {
            issue_type: IssueType::VariableNotUpdated,
            line: node.start_line(),
            description: format!(
                "Loop condition variable(s) \"{}\" never modified in loop body",
                names.join(", ")
            ),
            severity: Severity::Warning,
        },
        origin: Origin::Conditional {
            line: node.start_line(),
            end_line: node.end_line(),
            condition,
            has_break,
        },
    });
}

/// `for (;;)` and `for (; true; )` without a `break`.
fn check_counter_loop(
    tree: &SyntaxTree,
    node: &Node,
    test: Option<&Node>,
    body: &[Node],
    found: &mut Vec<Detection>,
) {
    let always_true = test.map_or(true, |t| t.as_bool() == Some(true));
    if !always_true || contains_break(body) {
        return;
    }

    found.push(Detection {
        issue: ControlFlowIssue {
            issue_type: IssueType::InfiniteLoop,
            line: node.start_line(),
            description: "Infinite loop: for(;;) without break statement".to_string(),
            severity: Severity::Error,
        },
        origin: Origin::Conditional {
            line: node.start_line(),
            end_line: node.end_line(),
            condition: test
                .map(|t| tree.text(t).to_string())
                .unwrap_or_else(|| "for(;;)".to_string()),
            has_break: false,
        },
    });
}

/// A top-level assignment of a literal to the loop variable.
fn check_overwritten_target(
    tree: &SyntaxTree,
    node: &Node,
    target: &str,
    iter: Option<&Node>,
    body: &[Node],
    found: &mut Vec<Detection>,
) {
    let overwritten = body.iter().any(|stmt| match &stmt.kind {
        NodeKind::Assign {
            targets,
            value: Some(value),
        } => value.is_literal() && targets.iter().any(|t| t.name() == Some(target)),
        _ => false,
    });
    if !overwritten {
        return;
    }

    found.push(Detection {
        issue: ControlFlowIssue {
            issue_type: IssueType::VariableNotUpdated,
            line: node.start_line(),
            description: format!(
                "Loop variable \"{}\" overwritten with constant in loop body",
                target
            ),
            severity: Severity::Warning,
        },
        origin: Origin::Iteration {
            line: node.start_line(),
            end_line: node.end_line(),
            target: target.to_string(),
            iterable: iter.map(|i| tree.text(i).to_string()).unwrap_or_default(),
        },
    });
}

/// Report the statement after the first terminator of `body`, if any.
fn check_unreachable(owner: &Node, body: &[Node], found: &mut Vec<Detection>) {
    let Some(index) = body.iter().position(|stmt| stmt.terminator().is_some()) else {
        return;
    };
    let (Some(terminator), Some(next)) = (body[index].terminator(), body.get(index + 1)) else {
        return;
    };

    found.push(Detection {
        issue: ControlFlowIssue {
            issue_type: IssueType::UnreachableCode,
            line: next.start_line(),
            description: format!("Unreachable code after {} statement", terminator),
            severity: Severity::Warning,
        },
        origin: Origin::Unreachable {
            owner_line: owner.start_line(),
            terminator,
            terminator_line: body[index].start_line(),
            line: next.start_line(),
        },
    });
}

fn contains_break(body: &[Node]) -> bool {
    body.iter()
        .flat_map(|stmt| stmt.walk())
        .any(|n| matches!(n.kind, NodeKind::Break))
}

/// Identifiers read by a loop condition, sorted.
fn condition_variables(test: &Node) -> BTreeSet<String> {
    test.walk()
        .filter_map(|n| match &n.kind {
            NodeKind::Name(name) | NodeKind::SelfRef(name) => Some(name.clone()),
            _ => None,
        })
        .collect()
}

/// Identifiers assigned (plainly or augmented) anywhere in a loop body.
fn modified_variables(body: &[Node]) -> BTreeSet<String> {
    let mut modified = BTreeSet::new();
    for n in body.iter().flat_map(|stmt| stmt.walk()) {
        match &n.kind {
            NodeKind::Assign { targets, .. } => {
                for target in targets {
                    if let NodeKind::Name(name) = &target.kind {
                        modified.insert(name.clone());
                    }
                }
            }
            NodeKind::AugAssign { target, .. } => {
                if let NodeKind::Name(name) = &target.kind {
                    modified.insert(name.clone());
                }
            }
            _ => {}
        }
    }
    modified
}

impl Detection {
    fn graph(&self, prefix: &str) -> (Vec<CfgNode>, Vec<CfgEdge>) {
        let id = |name: &str| format!("{}{}", prefix, name);

        match &self.origin {
            Origin::Conditional {
                line,
                end_line,
                condition,
                has_break,
            } => {
                let mut nodes = vec![
                    CfgNode::new(id("start"), CfgNodeType::Entry, "Start", *line),
                    CfgNode::new(id("condition"), CfgNodeType::Condition, condition.as_str(), *line)
                        .problem(self.issue.description.as_str()),
                    CfgNode::new(id("body"), CfgNodeType::Block, "Loop Body", line + 1),
                ];
                let mut edges = vec![
                    CfgEdge::new(id("start"), id("condition")),
                    CfgEdge::labeled(id("condition"), id("body"), "true"),
                    CfgEdge::labeled(id("body"), id("condition"), "repeat"),
                ];

                if *has_break {
                    nodes.push(CfgNode::new(id("exit"), CfgNodeType::Exit, "Exit", *end_line));
                    edges.push(CfgEdge::labeled(id("body"), id("exit"), "break"));
                    edges.push(CfgEdge::labeled(id("condition"), id("exit"), "false"));
                } else {
                    nodes.push(
                        CfgNode::new(
                            id("exit"),
                            CfgNodeType::Unreachable,
                            "Exit (unreachable)",
                            *end_line,
                        )
                        .problem("This exit is never reached"),
                    );
                    edges.push(CfgEdge::labeled(
                        id("condition"),
                        id("exit"),
                        "false (never taken)",
                    ));
                }
                (nodes, edges)
            }
            Origin::Iteration {
                line,
                end_line,
                target,
                iterable,
            } => {
                let condition = CfgNode::new(
                    id("condition"),
                    CfgNodeType::Condition,
                    format!("More items in {}?", iterable),
                    *line,
                )
                .problem(self.issue.description.as_str());
                let nodes = vec![
                    CfgNode::new(id("start"), CfgNodeType::Entry, "Start", *line),
                    CfgNode::new(id("init"), CfgNodeType::Block, format!("{} = ...", target), *line),
                    condition,
                    CfgNode::new(id("body"), CfgNodeType::Block, "Loop Body", line + 1),
                    CfgNode::new(id("exit"), CfgNodeType::Exit, "Exit", *end_line),
                ];
                let edges = vec![
                    CfgEdge::new(id("start"), id("init")),
                    CfgEdge::new(id("init"), id("condition")),
                    CfgEdge::labeled(id("condition"), id("body"), "true"),
                    CfgEdge::labeled(id("body"), id("condition"), "next item"),
                    CfgEdge::labeled(id("condition"), id("exit"), "false"),
                ];
                (nodes, edges)
            }
            Origin::Unreachable {
                owner_line,
                terminator,
                terminator_line,
                line,
            } => {
                let nodes = vec![
                    CfgNode::new(id("start"), CfgNodeType::Entry, "Start", *owner_line),
                    CfgNode::new(
                        id("code"),
                        CfgNodeType::Block,
                        format!("Code before {}", terminator),
                        *owner_line,
                    ),
                    CfgNode::new(
                        id("terminator"),
                        CfgNodeType::Block,
                        format!("{} statement", terminator),
                        *terminator_line,
                    ),
                    CfgNode::new(
                        id("unreachable"),
                        CfgNodeType::Unreachable,
                        format!("Line {} (unreachable)", line),
                        *line,
                    )
                    .problem(self.issue.description.as_str()),
                ];
                // No edge reaches the unreachable node.
                let edges = vec![
                    CfgEdge::new(id("start"), id("code")),
                    CfgEdge::new(id("code"), id("terminator")),
                ];
                (nodes, edges)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn py(src: &str) -> ControlFlowResult {
        analyze_control_flow(src, "python")
    }

    #[test]
    fn test_while_true_without_break() {
        let result = py("while True:\n    print('spin')\n");
        assert!(result.has_issues);
        assert_eq!(result.issues.len(), 1);
        let issue = &result.issues[0];
        assert_eq!(issue.issue_type, IssueType::InfiniteLoop);
        assert_eq!(issue.severity, Severity::Error);
        assert_eq!(issue.line, 1);
        assert_eq!(
            issue.description,
            "Infinite loop: while True without break statement"
        );

        let condition = result.nodes.iter().find(|n| n.id == "condition").unwrap();
        assert!(condition.is_problematic);
        assert!(result
            .edges
            .iter()
            .any(|e| e.label.as_deref() == Some("false (never taken)")));
        assert!(result.diagram.starts_with("flowchart TD\n"));
        assert!(result.diagram.contains("never taken"));
    }

    #[test]
    fn test_while_true_with_nested_break() {
        let src = "while True:\n    if done():\n        break\n";
        assert!(py(src).issues.is_empty());
    }

    #[test]
    fn test_stale_condition_variable() {
        let src = "i = 0\nwhile i < n:\n    print(i)\n";
        let result = py(src);
        assert_eq!(result.issues.len(), 1);
        let issue = &result.issues[0];
        assert_eq!(issue.issue_type, IssueType::VariableNotUpdated);
        assert_eq!(issue.line, 2);
        assert_eq!(
            issue.description,
            "Loop condition variable(s) \"i, n\" never modified in loop body"
        );
    }

    #[test]
    fn test_updated_condition_variable() {
        assert!(py("i = 0\nwhile i < 10:\n    i += 1\n").issues.is_empty());
        assert!(py("while x:\n    x = step(x)\n").issues.is_empty());
    }

    #[test]
    fn test_for_target_overwritten() {
        let src = "for x in items:\n    x = 0\n    print(x)\n";
        let result = py(src);
        assert_eq!(result.issues.len(), 1);
        assert_eq!(
            result.issues[0].description,
            "Loop variable \"x\" overwritten with constant in loop body"
        );
        let condition = result.nodes.iter().find(|n| n.id == "condition").unwrap();
        assert_eq!(condition.label, "More items in items?");
        assert!(condition.is_problematic);
        assert_eq!(result.nodes.len(), 5);
    }

    #[test]
    fn test_unreachable_after_return() {
        let src = "def f():\n    return 1\n    print('never')\n";
        let result = py(src);
        assert_eq!(result.issues.len(), 1);
        let issue = &result.issues[0];
        assert_eq!(issue.issue_type, IssueType::UnreachableCode);
        assert_eq!(issue.line, 3);
        assert_eq!(issue.description, "Unreachable code after return statement");

        let unreachable = result
            .nodes
            .iter()
            .find(|n| n.node_type == CfgNodeType::Unreachable)
            .unwrap();
        assert!(result.edges.iter().all(|e| e.to != unreachable.id));
    }

    #[test]
    fn test_only_first_terminator_per_block() {
        let src = "def f():\n    return 1\n    x = 2\n    return x\n    y = 3\n";
        assert_eq!(py(src).issues.len(), 1);
    }

    #[test]
    fn test_unreachable_after_break_in_loop() {
        let src = "for x in xs:\n    break\n    print(x)\n";
        let result = py(src);
        assert_eq!(result.issues.len(), 1);
        assert_eq!(
            result.issues[0].description,
            "Unreachable code after break statement"
        );
    }

    #[test]
    fn test_terminator_last_is_fine() {
        assert!(py("def f(x):\n    if x:\n        return 1\n    return 2\n")
            .issues
            .is_empty());
    }

    #[test]
    fn test_loop_rule_precedes_unreachable_rule() {
        let src = "while True:\n    continue\n    print('x')\n";
        let result = py(src);
        let types: Vec<_> = result.issues.iter().map(|i| i.issue_type).collect();
        assert_eq!(types, vec![IssueType::InfiniteLoop, IssueType::UnreachableCode]);
    }

    #[test]
    fn test_only_first_issue_gets_graph() {
        let src = "while True:\n    pass\n\nwhile True:\n    pass\n";
        let result = py(src);
        assert_eq!(result.issues.len(), 2);
        assert!(result.nodes.iter().all(|n| !n.id.starts_with("g2_")));

        let tree = analysis::parse(src, "python").unwrap();
        let result = ControlFlowAnalyzer::new().with_max_graphs(2).analyze(&tree);
        assert!(result.nodes.iter().any(|n| n.id == "g2_condition"));
        assert_eq!(result.diagram.matches("classDef problem").count(), 1);
    }

    #[test]
    fn test_javascript_infinite_loops() {
        let result = analyze_control_flow("while (true) { tick(); }\n", "javascript");
        assert_eq!(
            result.issues[0].description,
            "Infinite loop: while(true) without break statement"
        );

        let result = analyze_control_flow("for (;;) { tick(); }\n", "javascript");
        assert_eq!(result.issues.len(), 1);
        assert_eq!(
            result.issues[0].description,
            "Infinite loop: for(;;) without break statement"
        );
    }

    #[test]
    fn test_javascript_unreachable() {
        let src = "function f() {\n  return 1;\n  console.log('x');\n}\n";
        let result = analyze_control_flow(src, "javascript");
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].line, 3);
    }

    #[test]
    fn test_parse_failure_is_empty() {
        let result = py("while True\n    pass\n");
        assert_eq!(result, ControlFlowResult::empty());
        assert!(result.diagram.is_empty());
    }

    #[test]
    fn test_deterministic_output() {
        let src = "def f():\n    while True:\n        x = 1\n    return x\n";
        let a = py(src);
        let b = py(src);
        assert_eq!(a, b);
        assert_eq!(a.diagram, b.diagram);
    }
}

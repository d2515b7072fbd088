//! Structural metrics per function and per class.
//!
//! The metrics feed the smell classifier:
//! - LOC (non-blank lines) per function, class and file
//! - Parameter count, excluding receivers and variadics
//! - Cyclomatic complexity (decision points + 1)
//! - Maximum nesting depth of control structures
//! - Local vs. external call classification
//! - WMC (sum of method complexities) and CBO (distinct external receivers)

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::analysis::{self, Node, NodeKind, Param, SyntaxTree};
use crate::error::AnalysisError;

/// Metrics for a single function or method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodFeatures {
    pub name: String,
    pub start_line: usize,
    pub end_line: usize,
    /// Non-blank lines in `[start_line, end_line]`.
    pub loc: usize,
    /// Parameter count without receivers and variadics.
    pub params: usize,
    pub complexity: usize,
    pub max_nesting_depth: usize,
    /// Callee text of every call, in source order.
    pub calls_made: Vec<String>,
    pub local_calls: usize,
    pub external_calls: usize,
}

impl MethodFeatures {
    pub fn total_calls(&self) -> usize {
        self.local_calls + self.external_calls
    }
}

/// Metrics for a single class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassFeatures {
    pub name: String,
    pub start_line: usize,
    pub end_line: usize,
    pub methods: Vec<MethodFeatures>,
    /// Weighted methods per class: sum of method complexities.
    pub wmc: usize,
    /// Coupling between objects: distinct external receivers.
    pub cbo: usize,
    pub loc: usize,
    pub num_methods: usize,
}

/// Metrics for one source unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFeatures {
    pub classes: Vec<ClassFeatures>,
    pub standalone_functions: Vec<MethodFeatures>,
    pub total_loc: usize,
    pub total_methods: usize,
    /// Imported module paths, in source order.
    pub imports: Vec<String>,
}

impl FileFeatures {
    /// Standalone functions followed by every class method.
    pub fn all_methods(&self) -> impl Iterator<Item = &MethodFeatures> {
        self.standalone_functions
            .iter()
            .chain(self.classes.iter().flat_map(|c| c.methods.iter()))
    }
}

/// Parse `source` and extract its features.
pub fn extract_source(source: &str, language: &str) -> Result<FileFeatures, AnalysisError> {
    let tree = analysis::parse(source, language)?;
    Ok(extract(&tree))
}

/// Extract features from a parsed tree.
pub fn extract(tree: &SyntaxTree) -> FileFeatures {
    let mut features = FileFeatures::default();
    let mut external = HashSet::new();

    for node in tree.walk() {
        if let NodeKind::Import { modules, names, .. } = &node.kind {
            features.imports.extend(modules.iter().cloned());
            external.extend(names.iter().cloned());
        }
    }

    let extractor = Extractor {
        tree,
        external: &external,
    };

    for node in tree.statements() {
        match &node.kind {
            NodeKind::Class { name, body, .. } => {
                let class = extractor.class(node, name, body);
                features.total_methods += class.num_methods;
                features.classes.push(class);
            }
            NodeKind::Function { name, params, .. } => {
                features
                    .standalone_functions
                    .push(extractor.function(node, name, params, &HashSet::new()));
                features.total_methods += 1;
            }
            _ => {}
        }
    }

    features.total_loc = tree.total_non_blank_lines();
    features
}

struct Extractor<'a> {
    tree: &'a SyntaxTree,
    /// Names made visible by imports.
    external: &'a HashSet<String>,
}

impl Extractor<'_> {
    fn class(&self, node: &Node, name: &str, body: &[Node]) -> ClassFeatures {
        let method_nodes: Vec<(&Node, &str, &[Param])> = body
            .iter()
            .filter_map(|n| match &n.kind {
                NodeKind::Function { name, params, .. } => {
                    Some((n, name.as_str(), params.as_slice()))
                }
                _ => None,
            })
            .collect();
        let method_names: HashSet<&str> = method_nodes.iter().map(|(_, name, _)| *name).collect();

        let mut coupled: BTreeSet<&str> = BTreeSet::new();
        let mut methods = Vec::with_capacity(method_nodes.len());
        for (method, method_name, params) in method_nodes {
            methods.push(self.function(method, method_name, params, &method_names));
            for n in method.walk() {
                if let NodeKind::Attribute { value, .. } = &n.kind {
                    if let NodeKind::Name(receiver) = &value.kind {
                        if self.external.contains(receiver) {
                            coupled.insert(receiver);
                        }
                    }
                }
            }
        }

        ClassFeatures {
            name: name.to_string(),
            start_line: node.start_line(),
            end_line: node.end_line(),
            wmc: methods.iter().map(|m| m.complexity).sum(),
            cbo: coupled.len(),
            loc: self.tree.non_blank_lines(node.start_line(), node.end_line()),
            num_methods: methods.len(),
            methods,
        }
    }

    fn function(
        &self,
        node: &Node,
        name: &str,
        params: &[Param],
        class_methods: &HashSet<&str>,
    ) -> MethodFeatures {
        let mut calls_made = Vec::new();
        let mut local_calls = 0;
        let mut external_calls = 0;
        for n in node.walk() {
            let NodeKind::Call { callee, .. } = &n.kind else {
                continue;
            };
            match &callee.kind {
                NodeKind::Name(callee_name) => {
                    calls_made.push(callee_name.clone());
                    if class_methods.contains(callee_name.as_str()) {
                        local_calls += 1;
                    } else if self.external.contains(callee_name) {
                        external_calls += 1;
                    }
                }
                NodeKind::Attribute { value, attr } => {
                    let receiver = match &value.kind {
                        NodeKind::Name(id) | NodeKind::SelfRef(id) => id.as_str(),
                        _ => "?",
                    };
                    calls_made.push(format!("{}.{}", receiver, attr));
                    if matches!(value.kind, NodeKind::Name(_)) {
                        external_calls += 1;
                    } else {
                        local_calls += 1;
                    }
                }
                _ => {}
            }
        }

        MethodFeatures {
            name: name.to_string(),
            start_line: node.start_line(),
            end_line: node.end_line(),
            loc: self.tree.non_blank_lines(node.start_line(), node.end_line()),
            params: params.iter().filter(|p| p.counts()).count(),
            complexity: cyclomatic_complexity(node),
            max_nesting_depth: max_nesting(node, 0),
            calls_made,
            local_calls,
            external_calls,
        }
    }
}

/// McCabe complexity: 1 + decision points in the subtree.
///
/// Decision points are `if`, loops, exception handlers, `with`, `assert`,
/// comprehension clauses and non-default `case` arms; a boolean chain of `N`
/// operands adds `N - 1`.
pub fn cyclomatic_complexity(node: &Node) -> usize {
    1 + node
        .walk()
        .map(|n| match &n.kind {
            NodeKind::If { .. }
            | NodeKind::For { .. }
            | NodeKind::While { .. }
            | NodeKind::ExceptHandler { .. }
            | NodeKind::With { .. }
            | NodeKind::Assert { .. }
            | NodeKind::ComprehensionFor { .. } => 1,
            NodeKind::Case { is_default, .. } => usize::from(!is_default),
            NodeKind::BoolOp { operands, .. } => operands.len().saturating_sub(1),
            _ => 0,
        })
        .sum::<usize>()
}

/// Deepest control-structure nesting below `node`.
pub fn max_nesting(node: &Node, current: usize) -> usize {
    node.children()
        .into_iter()
        .map(|child| {
            let depth = if increases_nesting(child) {
                current + 1
            } else {
                current
            };
            max_nesting(child, depth)
        })
        .fold(current, usize::max)
}

fn increases_nesting(node: &Node) -> bool {
    matches!(
        node.kind,
        NodeKind::If { .. }
            | NodeKind::For { .. }
            | NodeKind::While { .. }
            | NodeKind::With { .. }
            | NodeKind::Try { .. }
            | NodeKind::ExceptHandler { .. }
    )
}

//! Language-neutral syntax tree produced by the backends.
//!
//! Every backend lowers its concrete tree-sitter tree into [`SyntaxTree`], a
//! closed set of node variants. Downstream analyses match on [`NodeKind`]
//! exhaustively, so adding a variant is a compile-checked change everywhere
//! it matters.

use std::fmt;

use super::Language;

/// Source location span with byte offsets and line/column positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Start byte offset (0-indexed).
    pub start_byte: usize,
    /// End byte offset (0-indexed, exclusive).
    pub end_byte: usize,
    /// Start line (1-indexed).
    pub start_line: usize,
    /// Start column (1-indexed).
    pub start_col: usize,
    /// End line (1-indexed).
    pub end_line: usize,
    /// End column (1-indexed).
    pub end_col: usize,
}

impl Span {
    /// Create a span from a tree-sitter node.
    pub fn from_node(node: tree_sitter::Node) -> Self {
        let start = node.start_position();
        let end = node.end_position();
        Self {
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
            start_line: start.row + 1, // tree-sitter is 0-indexed
            start_col: start.column + 1,
            end_line: end.row + 1,
            end_col: end.column + 1,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start_line, self.start_col)
    }
}

/// A constant value written directly in the source.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Bool(bool),
    Number(String),
    Str(String),
    Null,
}

/// Short-circuit boolean operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOperator {
    And,
    Or,
    /// `??` in JavaScript/TypeScript.
    Coalesce,
}

/// The two loop shapes a `for` statement can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopKind {
    /// Iterates a collection (`for x in xs`, `for (x of xs)`).
    Each,
    /// C-style `for (init; test; update)`.
    Counter,
}

/// A declared function parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    /// The conventional instance/class receiver (`self`, `cls`, TS `this`).
    pub is_receiver: bool,
    /// Collects remaining arguments (`*args`, `**kwargs`, `...rest`).
    pub is_variadic: bool,
}

impl Param {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_receiver: false,
            is_variadic: false,
        }
    }

    /// Whether this parameter counts towards a function's parameter list size.
    pub fn counts(&self) -> bool {
        !self.is_receiver && !self.is_variadic
    }
}

/// A node of the lowered tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
}

/// Closed set of node kinds understood by the analyses.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Module {
        body: Vec<Node>,
    },
    /// One import statement. `modules` are the imported module paths as
    /// written, `names` every identifier the import makes visible.
    Import {
        modules: Vec<String>,
        names: Vec<String>,
        relative: bool,
        wildcard: bool,
    },
    Class {
        name: String,
        bases: Vec<Node>,
        body: Vec<Node>,
    },
    Function {
        name: String,
        params: Vec<Param>,
        body: Vec<Node>,
    },
    /// Anonymous function: Python `lambda`, JS arrow functions and function
    /// expressions.
    Lambda {
        params: Vec<Param>,
        body: Vec<Node>,
    },
    If {
        test: Box<Node>,
        body: Vec<Node>,
        orelse: Vec<Node>,
    },
    For {
        kind: LoopKind,
        /// Loop variable when it is a single identifier.
        target: Option<String>,
        /// Target patterns, initializers and update expressions.
        header: Vec<Node>,
        iter: Option<Box<Node>>,
        test: Option<Box<Node>>,
        body: Vec<Node>,
        orelse: Vec<Node>,
    },
    While {
        test: Box<Node>,
        body: Vec<Node>,
        orelse: Vec<Node>,
    },
    With {
        items: Vec<Node>,
        body: Vec<Node>,
    },
    Try {
        body: Vec<Node>,
        handlers: Vec<Node>,
        orelse: Vec<Node>,
        finalbody: Vec<Node>,
    },
    ExceptHandler {
        types: Vec<Node>,
        body: Vec<Node>,
    },
    Switch {
        subject: Box<Node>,
        cases: Vec<Node>,
    },
    Case {
        is_default: bool,
        patterns: Vec<Node>,
        body: Vec<Node>,
    },
    Assert {
        args: Vec<Node>,
    },
    Return {
        value: Option<Box<Node>>,
    },
    Break,
    Continue,
    Assign {
        targets: Vec<Node>,
        value: Option<Box<Node>>,
    },
    AugAssign {
        target: Box<Node>,
        value: Option<Box<Node>>,
    },
    Call {
        callee: Box<Node>,
        args: Vec<Node>,
    },
    Attribute {
        value: Box<Node>,
        attr: String,
    },
    BoolOp {
        op: BoolOperator,
        operands: Vec<Node>,
    },
    Comprehension {
        element: Vec<Node>,
        generators: Vec<Node>,
    },
    /// One `for … in …` clause of a comprehension with its `if` filters.
    ComprehensionFor {
        targets: Vec<Node>,
        iter: Box<Node>,
        conditions: Vec<Node>,
    },
    Name(String),
    /// The instance receiver expression (`self`, `this`).
    SelfRef(String),
    Literal(Literal),
    /// Anything without analytic meaning; children are kept so walks still
    /// reach nested calls and assignments.
    Other {
        children: Vec<Node>,
    },
}

impl Node {
    pub fn new(kind: NodeKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn start_line(&self) -> usize {
        self.span.start_line
    }

    pub fn end_line(&self) -> usize {
        self.span.end_line
    }

    /// Direct children in source order.
    pub fn children(&self) -> Vec<&Node> {
        fn all(nodes: &[Node]) -> impl Iterator<Item = &Node> {
            nodes.iter()
        }

        match &self.kind {
            NodeKind::Module { body } => all(body).collect(),
            NodeKind::Import { .. }
            | NodeKind::Break
            | NodeKind::Continue
            | NodeKind::Name(_)
            | NodeKind::SelfRef(_)
            | NodeKind::Literal(_) => Vec::new(),
            NodeKind::Class { bases, body, .. } => all(bases).chain(all(body)).collect(),
            NodeKind::Function { body, .. } | NodeKind::Lambda { body, .. } => {
                all(body).collect()
            }
            NodeKind::If { test, body, orelse } | NodeKind::While { test, body, orelse } => {
                std::iter::once(test.as_ref())
                    .chain(all(body))
                    .chain(all(orelse))
                    .collect()
            }
            NodeKind::For {
                header,
                iter,
                test,
                body,
                orelse,
                ..
            } => all(header)
                .chain(iter.as_deref())
                .chain(test.as_deref())
                .chain(all(body))
                .chain(all(orelse))
                .collect(),
            NodeKind::With { items, body } => all(items).chain(all(body)).collect(),
            NodeKind::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => all(body)
                .chain(all(handlers))
                .chain(all(orelse))
                .chain(all(finalbody))
                .collect(),
            NodeKind::ExceptHandler { types, body } => all(types).chain(all(body)).collect(),
            NodeKind::Switch { subject, cases } => {
                std::iter::once(subject.as_ref()).chain(all(cases)).collect()
            }
            NodeKind::Case { patterns, body, .. } => all(patterns).chain(all(body)).collect(),
            NodeKind::Assert { args } => all(args).collect(),
            NodeKind::Return { value } => value.as_deref().into_iter().collect(),
            NodeKind::Assign { targets, value } => {
                all(targets).chain(value.as_deref()).collect()
            }
            NodeKind::AugAssign { target, value } => std::iter::once(target.as_ref())
                .chain(value.as_deref())
                .collect(),
            NodeKind::Call { callee, args } => {
                std::iter::once(callee.as_ref()).chain(all(args)).collect()
            }
            NodeKind::Attribute { value, .. } => vec![value.as_ref()],
            NodeKind::BoolOp { operands, .. } => all(operands).collect(),
            NodeKind::Comprehension {
                element,
                generators,
            } => all(element).chain(all(generators)).collect(),
            NodeKind::ComprehensionFor {
                targets,
                iter,
                conditions,
            } => all(targets)
                .chain(std::iter::once(iter.as_ref()))
                .chain(all(conditions))
                .collect(),
            NodeKind::Other { children } => all(children).collect(),
        }
    }

    /// Pre-order traversal of this node and all of its descendants.
    pub fn walk(&self) -> Walk<'_> {
        Walk { stack: vec![self] }
    }

    /// The statement list this node owns, for block-bearing nodes.
    pub fn body(&self) -> Option<&[Node]> {
        match &self.kind {
            NodeKind::Module { body }
            | NodeKind::Class { body, .. }
            | NodeKind::Function { body, .. }
            | NodeKind::Lambda { body, .. }
            | NodeKind::If { body, .. }
            | NodeKind::For { body, .. }
            | NodeKind::While { body, .. }
            | NodeKind::With { body, .. }
            | NodeKind::Try { body, .. }
            | NodeKind::ExceptHandler { body, .. }
            | NodeKind::Case { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Identifier name for names, functions and classes.
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Name(name) | NodeKind::SelfRef(name) => Some(name),
            NodeKind::Function { name, .. } | NodeKind::Class { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Boolean value when this node is a boolean literal.
    pub fn as_bool(&self) -> Option<bool> {
        match &self.kind {
            NodeKind::Literal(Literal::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.kind, NodeKind::Literal(_))
    }

    /// Keyword of a statement that ends its block (`return`, `break`, `continue`).
    pub fn terminator(&self) -> Option<&'static str> {
        match self.kind {
            NodeKind::Return { .. } => Some("return"),
            NodeKind::Break => Some("break"),
            NodeKind::Continue => Some("continue"),
            _ => None,
        }
    }
}

/// Pre-order iterator over a subtree.
pub struct Walk<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children().into_iter().rev());
        Some(node)
    }
}

/// The result of parsing one source unit.
///
/// Owns the lowered tree and the source text it was produced from; read-only
/// to every analysis and dropped after the analysis pass.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    language: Language,
    root: Node,
    source: String,
}

impl SyntaxTree {
    pub fn new(language: Language, root: Node, source: impl Into<String>) -> Self {
        Self {
            language,
            root,
            source: source.into(),
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Source text covered by a node.
    pub fn text(&self, node: &Node) -> &str {
        self.source
            .get(node.span.start_byte..node.span.end_byte)
            .unwrap_or("")
    }

    /// Top-level statements.
    pub fn statements(&self) -> &[Node] {
        self.root.body().unwrap_or(&[])
    }

    /// Pre-order traversal of the whole tree.
    pub fn walk(&self) -> Walk<'_> {
        self.root.walk()
    }

    /// Count non-blank physical lines in `[start_line, end_line]` (1-indexed, inclusive).
    pub fn non_blank_lines(&self, start_line: usize, end_line: usize) -> usize {
        if end_line < start_line {
            return 0;
        }
        self.source
            .lines()
            .skip(start_line.saturating_sub(1))
            .take(end_line + 1 - start_line.max(1))
            .filter(|line| !line.trim().is_empty())
            .count()
    }

    /// Count non-blank physical lines in the whole source.
    pub fn total_non_blank_lines(&self) -> usize {
        self.source
            .lines()
            .filter(|line| !line.trim().is_empty())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(kind: NodeKind, line: usize) -> Node {
        Node::new(
            kind,
            Span {
                start_line: line,
                end_line: line,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_walk_is_preorder() {
        let call = leaf(
            NodeKind::Call {
                callee: Box::new(leaf(NodeKind::Name("print".into()), 2)),
                args: vec![leaf(NodeKind::Name("x".into()), 2)],
            },
            2,
        );
        let func = leaf(
            NodeKind::Function {
                name: "f".into(),
                params: vec![],
                body: vec![call],
            },
            1,
        );

        let names: Vec<_> = func.walk().filter_map(|n| n.name()).collect();
        assert_eq!(names, vec!["f", "print", "x"]);
    }

    #[test]
    fn test_terminator_keywords() {
        assert_eq!(leaf(NodeKind::Break, 1).terminator(), Some("break"));
        assert_eq!(leaf(NodeKind::Continue, 1).terminator(), Some("continue"));
        assert_eq!(
            leaf(NodeKind::Return { value: None }, 1).terminator(),
            Some("return")
        );
        assert_eq!(leaf(NodeKind::Name("x".into()), 1).terminator(), None);
    }

    #[test]
    fn test_non_blank_lines() {
        let tree = SyntaxTree::new(
            Language::Python,
            leaf(NodeKind::Module { body: vec![] }, 1),
            "a = 1\n\n   \nb = 2\nc = 3\n",
        );
        assert_eq!(tree.total_non_blank_lines(), 3);
        assert_eq!(tree.non_blank_lines(1, 4), 2);
        assert_eq!(tree.non_blank_lines(4, 5), 2);
        assert_eq!(tree.non_blank_lines(5, 4), 0);
    }

    #[test]
    fn test_param_counts() {
        let mut receiver = Param::named("self");
        receiver.is_receiver = true;
        assert!(!receiver.counts());
        assert!(Param::named("x").counts());
    }
}

//! Python backend using tree-sitter.

use tree_sitter::{Node as TsNode, Parser};

use super::{check_depth, field_children, first_syntax_error, named_children};
use crate::analysis::{
    BoolOperator, Language, LanguageBackend, Literal, LoopKind, Node, NodeKind, Param, Span,
    SyntaxTree,
};
use crate::error::{AnalysisError, ParseError};

/// Receiver parameter names skipped when counting parameters.
const RECEIVERS: &[&str] = &["self", "cls"];

/// Compound statements whose body must be an indented block.
const BLOCK_OWNERS: &[&str] = &[
    "function_definition",
    "class_definition",
    "if_statement",
    "elif_clause",
    "else_clause",
    "for_statement",
    "while_statement",
    "with_statement",
    "try_statement",
    "except_clause",
    "except_group_clause",
    "finally_clause",
    "match_statement",
    "case_clause",
];

pub struct PythonBackend {
    language: tree_sitter::Language,
}

impl PythonBackend {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_python::LANGUAGE.into(),
        }
    }

    fn create_parser(&self) -> Result<Parser, AnalysisError> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| AnalysisError::Backend(e.to_string()))?;
        Ok(parser)
    }
}

impl Default for PythonBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageBackend for PythonBackend {
    fn language(&self) -> Language {
        Language::Python
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["py"]
    }

    fn parse(&self, source: &str) -> Result<SyntaxTree, AnalysisError> {
        let mut parser = self.create_parser()?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| AnalysisError::Backend("python parser returned no tree".into()))?;

        let root = tree.root_node();
        let src = source.as_bytes();
        if let Some(err) = first_syntax_error(root).or_else(|| first_layout_error(root, src)) {
            return Err(err.into());
        }
        check_depth(root)?;

        let lowerer = Lowerer { src };
        let module = Node::new(
            NodeKind::Module {
                body: lowerer.statements(root),
            },
            Span::from_node(root),
        );
        Ok(SyntaxTree::new(Language::Python, module, source))
    }
}

/// Lowers a tree-sitter-python CST into [`Node`]s.
struct Lowerer<'a> {
    src: &'a [u8],
}

impl Lowerer<'_> {
    fn text(&self, node: TsNode) -> String {
        node.utf8_text(self.src).unwrap_or("").to_string()
    }

    fn field_text(&self, node: TsNode, field: &str) -> String {
        node.child_by_field_name(field)
            .map(|n| self.text(n))
            .unwrap_or_default()
    }

    /// Lower every statement directly under `node` (a module or block).
    fn statements(&self, node: TsNode) -> Vec<Node> {
        let mut out = Vec::new();
        for child in named_children(node) {
            self.statement(child, &mut out);
        }
        out
    }

    fn block(&self, node: Option<TsNode>) -> Vec<Node> {
        node.map(|n| self.statements(n)).unwrap_or_default()
    }

    fn statement(&self, node: TsNode, out: &mut Vec<Node>) {
        let span = Span::from_node(node);
        let kind = match node.kind() {
            "expression_statement" => {
                let mut exprs: Vec<Node> = named_children(node)
                    .into_iter()
                    .map(|child| self.expr(child))
                    .collect();
                if exprs.len() == 1 {
                    out.append(&mut exprs);
                    return;
                }
                NodeKind::Other { children: exprs }
            }
            "import_statement" => self.import(node),
            "import_from_statement" | "future_import_statement" => self.import_from(node),
            "decorated_definition" => {
                if let Some(def) = node.child_by_field_name("definition") {
                    self.statement(def, out);
                }
                return;
            }
            "class_definition" => NodeKind::Class {
                name: self.field_text(node, "name"),
                bases: node
                    .child_by_field_name("superclasses")
                    .map(|args| self.arguments(args))
                    .unwrap_or_default(),
                body: self.block(node.child_by_field_name("body")),
            },
            "function_definition" => NodeKind::Function {
                name: self.field_text(node, "name"),
                params: node
                    .child_by_field_name("parameters")
                    .map(|p| self.params(p))
                    .unwrap_or_default(),
                body: self.block(node.child_by_field_name("body")),
            },
            "if_statement" => {
                let alternatives = field_children(node, "alternative");
                NodeKind::If {
                    test: self.boxed_field(node, "condition"),
                    body: self.block(node.child_by_field_name("consequence")),
                    orelse: self.else_chain(&alternatives),
                }
            }
            "for_statement" => {
                let left = node.child_by_field_name("left");
                NodeKind::For {
                    kind: LoopKind::Each,
                    target: left
                        .filter(|l| l.kind() == "identifier")
                        .map(|l| self.text(l)),
                    header: left.map(|l| self.expr(l)).into_iter().collect(),
                    iter: node
                        .child_by_field_name("right")
                        .map(|r| Box::new(self.expr(r))),
                    test: None,
                    body: self.block(node.child_by_field_name("body")),
                    orelse: self.else_body(node.child_by_field_name("alternative")),
                }
            }
            "while_statement" => NodeKind::While {
                test: self.boxed_field(node, "condition"),
                body: self.block(node.child_by_field_name("body")),
                orelse: self.else_body(node.child_by_field_name("alternative")),
            },
            "with_statement" => {
                let mut items = Vec::new();
                for clause in named_children(node).into_iter().filter(|c| c.kind() == "with_clause") {
                    for item in named_children(clause) {
                        let value = item.child_by_field_name("value").unwrap_or(item);
                        items.push(self.expr(value));
                    }
                }
                NodeKind::With {
                    items,
                    body: self.block(node.child_by_field_name("body")),
                }
            }
            "try_statement" => self.try_statement(node),
            "match_statement" => self.match_statement(node),
            "assert_statement" => NodeKind::Assert {
                args: self.exprs(node),
            },
            "return_statement" => NodeKind::Return {
                value: named_children(node)
                    .first()
                    .map(|value| Box::new(self.expr(*value))),
            },
            "break_statement" => NodeKind::Break,
            "continue_statement" => NodeKind::Continue,
            "pass_statement" => NodeKind::Other { children: vec![] },
            _ => {
                out.push(self.expr(node));
                return;
            }
        };
        out.push(Node::new(kind, span));
    }

    /// Fold `elif`/`else` clauses into nested `If` nodes.
    fn else_chain(&self, alternatives: &[TsNode]) -> Vec<Node> {
        let Some((first, rest)) = alternatives.split_first() else {
            return Vec::new();
        };
        match first.kind() {
            "elif_clause" => vec![Node::new(
                NodeKind::If {
                    test: self.boxed_field(*first, "condition"),
                    body: self.block(first.child_by_field_name("consequence")),
                    orelse: self.else_chain(rest),
                },
                Span::from_node(*first),
            )],
            "else_clause" => self.block(first.child_by_field_name("body")),
            _ => self.else_chain(rest),
        }
    }

    fn else_body(&self, clause: Option<TsNode>) -> Vec<Node> {
        clause
            .map(|c| self.block(c.child_by_field_name("body")))
            .unwrap_or_default()
    }

    fn try_statement(&self, node: TsNode) -> NodeKind {
        let mut handlers = Vec::new();
        let mut orelse = Vec::new();
        let mut finalbody = Vec::new();

        for child in named_children(node) {
            match child.kind() {
                "except_clause" | "except_group_clause" => {
                    let mut types = Vec::new();
                    let mut body = Vec::new();
                    for part in named_children(child) {
                        if part.kind() == "block" {
                            body = self.statements(part);
                        } else {
                            types.push(self.expr(part));
                        }
                    }
                    handlers.push(Node::new(
                        NodeKind::ExceptHandler { types, body },
                        Span::from_node(child),
                    ));
                }
                "else_clause" => orelse = self.block(child.child_by_field_name("body")),
                "finally_clause" => {
                    finalbody = named_children(child)
                        .into_iter()
                        .filter(|c| c.kind() == "block")
                        .flat_map(|c| self.statements(c))
                        .collect();
                }
                _ => {}
            }
        }

        NodeKind::Try {
            body: self.block(node.child_by_field_name("body")),
            handlers,
            orelse,
            finalbody,
        }
    }

    fn match_statement(&self, node: TsNode) -> NodeKind {
        let mut subjects: Vec<Node> = field_children(node, "subject")
            .into_iter()
            .map(|s| self.expr(s))
            .collect();
        let subject = if subjects.len() == 1 {
            subjects.remove(0)
        } else {
            Node::new(
                NodeKind::Other { children: subjects },
                Span::from_node(node),
            )
        };

        let mut cases = Vec::new();
        if let Some(body) = node.child_by_field_name("body") {
            for clause in named_children(body)
                .into_iter()
                .filter(|c| c.kind() == "case_clause")
            {
                let patterns: Vec<TsNode> = named_children(clause)
                    .into_iter()
                    .filter(|c| c.kind() == "case_pattern")
                    .collect();
                let is_default =
                    patterns.len() == 1 && self.text(patterns[0]).trim() == "_";
                let mut pattern_nodes: Vec<Node> =
                    patterns.into_iter().map(|p| self.expr(p)).collect();
                if let Some(guard) = clause.child_by_field_name("guard") {
                    pattern_nodes.push(self.expr(guard));
                }
                cases.push(Node::new(
                    NodeKind::Case {
                        is_default,
                        patterns: pattern_nodes,
                        body: self.block(clause.child_by_field_name("consequence")),
                    },
                    Span::from_node(clause),
                ));
            }
        }

        NodeKind::Switch {
            subject: Box::new(subject),
            cases,
        }
    }

    /// `import a.b`, `import a.b as c`
    fn import(&self, node: TsNode) -> NodeKind {
        let mut modules = Vec::new();
        let mut names = Vec::new();
        for name in field_children(node, "name") {
            match name.kind() {
                "aliased_import" => {
                    modules.push(self.field_text(name, "name"));
                    names.push(self.field_text(name, "alias"));
                }
                _ => {
                    let module = self.text(name);
                    names.push(first_segment(&module));
                    modules.push(module);
                }
            }
        }
        NodeKind::Import {
            modules,
            names,
            relative: false,
            wildcard: false,
        }
    }

    /// `from m import n`, `from . import n as k`, `from m import *`
    fn import_from(&self, node: TsNode) -> NodeKind {
        let mut relative = false;
        let module = match node.child_by_field_name("module_name") {
            Some(m) if m.kind() == "relative_import" => {
                relative = true;
                named_children(m)
                    .into_iter()
                    .find(|c| c.kind() == "dotted_name")
                    .map(|c| self.text(c))
                    .unwrap_or_default()
            }
            Some(m) => self.text(m),
            None if node.kind() == "future_import_statement" => "__future__".to_string(),
            None => String::new(),
        };

        let mut names = Vec::new();
        if !module.is_empty() {
            names.push(first_segment(&module));
        }
        for name in field_children(node, "name") {
            match name.kind() {
                "aliased_import" => names.push(self.field_text(name, "alias")),
                _ => names.push(self.text(name)),
            }
        }
        let wildcard = named_children(node)
            .iter()
            .any(|c| c.kind() == "wildcard_import");

        NodeKind::Import {
            modules: if module.is_empty() { vec![] } else { vec![module] },
            names,
            relative,
            wildcard,
        }
    }

    fn params(&self, node: TsNode) -> Vec<Param> {
        named_children(node)
            .into_iter()
            .filter_map(|p| self.param(p))
            .collect()
    }

    fn param(&self, node: TsNode) -> Option<Param> {
        let param = match node.kind() {
            "identifier" => Param::named(self.text(node)),
            "default_parameter" | "typed_default_parameter" => {
                Param::named(self.field_text(node, "name"))
            }
            "typed_parameter" => {
                let inner = named_children(node).into_iter().next()?;
                return self.param(inner);
            }
            "list_splat_pattern" | "dictionary_splat_pattern" => {
                let name = named_children(node)
                    .first()
                    .map(|n| self.text(*n))
                    .unwrap_or_default();
                Param {
                    name,
                    is_receiver: false,
                    is_variadic: true,
                }
            }
            "tuple_pattern" => Param::named(self.text(node)),
            // `*` and `/` separators
            _ => return None,
        };
        Some(Param {
            is_receiver: RECEIVERS.contains(&param.name.as_str()),
            ..param
        })
    }

    fn arguments(&self, node: TsNode) -> Vec<Node> {
        named_children(node)
            .into_iter()
            .map(|arg| match arg.kind() {
                "keyword_argument" => arg
                    .child_by_field_name("value")
                    .map(|v| self.expr(v))
                    .unwrap_or_else(|| self.expr(arg)),
                _ => self.expr(arg),
            })
            .collect()
    }

    fn exprs(&self, node: TsNode) -> Vec<Node> {
        named_children(node)
            .into_iter()
            .map(|child| self.expr(child))
            .collect()
    }

    fn boxed_field(&self, node: TsNode, field: &str) -> Box<Node> {
        Box::new(match node.child_by_field_name(field) {
            Some(child) => self.expr(child),
            None => Node::new(NodeKind::Other { children: vec![] }, Span::from_node(node)),
        })
    }

    fn expr(&self, node: TsNode) -> Node {
        let span = Span::from_node(node);
        let kind = match node.kind() {
            "identifier" => match self.text(node).as_str() {
                "self" => NodeKind::SelfRef("self".into()),
                name => NodeKind::Name(name.to_string()),
            },
            "true" => NodeKind::Literal(Literal::Bool(true)),
            "false" => NodeKind::Literal(Literal::Bool(false)),
            "none" => NodeKind::Literal(Literal::Null),
            "integer" | "float" => NodeKind::Literal(Literal::Number(self.text(node))),
            "string" | "concatenated_string" => {
                let interpolations: Vec<Node> = interpolations(node)
                    .into_iter()
                    .flat_map(|i| self.exprs(i))
                    .collect();
                if interpolations.is_empty() {
                    NodeKind::Literal(Literal::Str(self.text(node)))
                } else {
                    NodeKind::Other {
                        children: interpolations,
                    }
                }
            }
            "parenthesized_expression" => {
                if let Some(inner) = named_children(node).into_iter().next() {
                    return self.expr(inner);
                }
                NodeKind::Other { children: vec![] }
            }
            "call" => NodeKind::Call {
                callee: self.boxed_field(node, "function"),
                args: node
                    .child_by_field_name("arguments")
                    .map(|args| match args.kind() {
                        "argument_list" => self.arguments(args),
                        _ => vec![self.expr(args)],
                    })
                    .unwrap_or_default(),
            },
            "attribute" => NodeKind::Attribute {
                value: self.boxed_field(node, "object"),
                attr: self.field_text(node, "attribute"),
            },
            "boolean_operator" => {
                let op = match self.field_text(node, "operator").as_str() {
                    "and" => BoolOperator::And,
                    _ => BoolOperator::Or,
                };
                let mut operands = Vec::new();
                self.flatten_bool(node, op, &mut operands);
                NodeKind::BoolOp { op, operands }
            }
            "assignment" => {
                let mut targets = Vec::new();
                let mut current = node;
                let value = loop {
                    if let Some(left) = current.child_by_field_name("left") {
                        targets.push(self.expr(left));
                    }
                    match current.child_by_field_name("right") {
                        Some(right) if right.kind() == "assignment" => current = right,
                        Some(right) => break Some(Box::new(self.expr(right))),
                        None => break None,
                    }
                };
                NodeKind::Assign { targets, value }
            }
            "augmented_assignment" => NodeKind::AugAssign {
                target: self.boxed_field(node, "left"),
                value: node
                    .child_by_field_name("right")
                    .map(|r| Box::new(self.expr(r))),
            },
            "list_comprehension"
            | "set_comprehension"
            | "dictionary_comprehension"
            | "generator_expression" => self.comprehension(node),
            "lambda" => NodeKind::Lambda {
                params: node
                    .child_by_field_name("parameters")
                    .map(|p| self.params(p))
                    .unwrap_or_default(),
                body: node
                    .child_by_field_name("body")
                    .map(|b| vec![self.expr(b)])
                    .unwrap_or_default(),
            },
            _ => NodeKind::Other {
                children: self.exprs(node),
            },
        };
        Node::new(kind, span)
    }

    /// Flatten `a and b and c` into one operand list, as Python's AST does.
    fn flatten_bool(&self, node: TsNode, op: BoolOperator, out: &mut Vec<Node>) {
        for side in ["left", "right"] {
            let Some(child) = node.child_by_field_name(side) else {
                continue;
            };
            let same_op = child.kind() == "boolean_operator"
                && self.field_text(child, "operator") == self.field_text(node, "operator");
            if same_op && side == "left" {
                self.flatten_bool(child, op, out);
            } else {
                out.push(self.expr(child));
            }
        }
    }

    fn comprehension(&self, node: TsNode) -> NodeKind {
        let element = node
            .child_by_field_name("body")
            .map(|b| vec![self.expr(b)])
            .unwrap_or_default();

        let mut generators: Vec<Node> = Vec::new();
        for clause in named_children(node) {
            match clause.kind() {
                "for_in_clause" => {
                    let iters = field_children(clause, "right");
                    let iter = match iters.as_slice() {
                        [single] => self.expr(*single),
                        _ => Node::new(
                            NodeKind::Other {
                                children: iters.iter().map(|i| self.expr(*i)).collect(),
                            },
                            Span::from_node(clause),
                        ),
                    };
                    generators.push(Node::new(
                        NodeKind::ComprehensionFor {
                            targets: clause
                                .child_by_field_name("left")
                                .map(|l| vec![self.expr(l)])
                                .unwrap_or_default(),
                            iter: Box::new(iter),
                            conditions: Vec::new(),
                        },
                        Span::from_node(clause),
                    ));
                }
                "if_clause" => {
                    if let Some(Node {
                        kind: NodeKind::ComprehensionFor { conditions, .. },
                        ..
                    }) = generators.last_mut()
                    {
                        conditions.extend(self.exprs(clause));
                    }
                }
                _ => {}
            }
        }

        NodeKind::Comprehension {
            element,
            generators,
        }
    }
}

fn first_segment(module: &str) -> String {
    module.split('.').next().unwrap_or(module).to_string()
}

/// `interpolation` children of a (possibly concatenated) string.
fn interpolations(node: TsNode) -> Vec<TsNode> {
    let mut found = Vec::new();
    for child in named_children(node) {
        match child.kind() {
            "interpolation" => found.push(child),
            "string" => found.extend(interpolations(child)),
            _ => {}
        }
    }
    found
}

/// Find the first layout error the grammar recovers from silently.
///
/// tree-sitter-python accepts an empty suite, a suite indented no further
/// than its header, a stray indent inside a suite and Python 2 `print`/`exec`
/// statements, all without an `ERROR` node. CPython rejects every one of them.
fn first_layout_error(root: TsNode, src: &[u8]) -> Option<ParseError> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        let found = match node.kind() {
            "print_statement" | "exec_statement" => {
                let keyword = node.kind().trim_end_matches("_statement");
                Some(error_at(
                    node,
                    format!("Missing parentheses in call to '{}'", keyword),
                ))
            }
            "module" | "block" => misaligned_statement(node, src),
            kind if BLOCK_OWNERS.contains(&kind) => missing_body(node),
            _ => None,
        };
        if found.is_some() {
            return found;
        }

        let children = named_children(node);
        stack.extend(children.into_iter().rev());
    }

    None
}

/// The body of a compound statement must hold a statement, either on the
/// header line or indented past it.
fn missing_body(owner: TsNode) -> Option<ParseError> {
    let header = owner.start_position();
    let first = owner
        .child_by_field_name("body")
        .or_else(|| owner.child_by_field_name("consequence"))
        .or_else(|| {
            named_children(owner)
                .into_iter()
                .find(|child| child.kind() == "block")
        })
        .and_then(|body| named_children(body).into_iter().next());

    match first {
        Some(stmt)
            if stmt.start_position().row == header.row
                || stmt.start_position().column > header.column =>
        {
            None
        }
        _ => Some(error_at(owner, "expected an indented block".to_string())),
    }
}

/// Statements of one suite that begin a line must share a column.
fn misaligned_statement(suite: TsNode, src: &[u8]) -> Option<ParseError> {
    let nested = suite
        .parent()
        .is_some_and(|parent| matches!(parent.kind(), "module" | "block"));
    if suite.kind() == "block" && nested {
        return Some(error_at(suite, "unexpected indent".to_string()));
    }

    let mut column = None;
    for stmt in named_children(suite) {
        if !starts_line(stmt, src) {
            continue;
        }
        let col = stmt.start_position().column;
        match column {
            None => column = Some(col),
            Some(expected) if col > expected => {
                return Some(error_at(stmt, "unexpected indent".to_string()));
            }
            Some(expected) if col < expected => {
                return Some(error_at(
                    stmt,
                    "unindent does not match any outer indentation level".to_string(),
                ));
            }
            Some(_) => {}
        }
    }

    None
}

/// Only whitespace precedes the node on its line.
fn starts_line(node: TsNode, src: &[u8]) -> bool {
    let start = node.start_byte();
    let line_start = start.saturating_sub(node.start_position().column);
    src.get(line_start..start)
        .is_some_and(|prefix| prefix.iter().all(|b| *b == b' ' || *b == b'\t'))
}

fn error_at(node: TsNode, message: String) -> ParseError {
    let pos = node.start_position();
    ParseError {
        line: pos.row + 1,
        column: pos.column + 1,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> SyntaxTree {
        PythonBackend::new().parse(src).unwrap()
    }

    #[test]
    fn test_parse_function_and_params() {
        let tree = parse("class A:\n    def m(self, a, b=1, *args, **kw):\n        return a\n");
        let class = &tree.statements()[0];
        let NodeKind::Class { name, body, .. } = &class.kind else {
            panic!("expected class, got {:?}", class.kind);
        };
        assert_eq!(name, "A");

        let NodeKind::Function { name, params, .. } = &body[0].kind else {
            panic!("expected method");
        };
        assert_eq!(name, "m");
        let counted: Vec<_> = params.iter().filter(|p| p.counts()).map(|p| &p.name).collect();
        assert_eq!(counted, vec!["a", "b"]);
        assert_eq!(body[0].start_line(), 2);
    }

    #[test]
    fn test_elif_becomes_nested_if() {
        let tree = parse("if a:\n    x = 1\nelif b:\n    x = 2\nelse:\n    x = 3\n");
        let NodeKind::If { orelse, .. } = &tree.statements()[0].kind else {
            panic!("expected if");
        };
        assert_eq!(orelse.len(), 1);
        let NodeKind::If { orelse: inner, .. } = &orelse[0].kind else {
            panic!("expected elif as nested if");
        };
        assert_eq!(inner.len(), 1);
    }

    #[test]
    fn test_bool_op_is_flattened() {
        let tree = parse("x = a and b and c\n");
        let NodeKind::Assign { value, .. } = &tree.statements()[0].kind else {
            panic!("expected assignment");
        };
        let value = value.as_deref().unwrap();
        let NodeKind::BoolOp { op, operands } = &value.kind else {
            panic!("expected bool op");
        };
        assert_eq!(*op, BoolOperator::And);
        assert_eq!(operands.len(), 3);
    }

    #[test]
    fn test_imports() {
        let tree = parse("import os.path as p\nfrom collections import OrderedDict as OD\nfrom . import x\n");
        let imports: Vec<_> = tree
            .statements()
            .iter()
            .filter_map(|s| match &s.kind {
                NodeKind::Import {
                    modules,
                    names,
                    relative,
                    ..
                } => Some((modules.clone(), names.clone(), *relative)),
                _ => None,
            })
            .collect();

        assert_eq!(imports[0], (vec!["os.path".to_string()], vec!["p".to_string()], false));
        assert_eq!(
            imports[1],
            (
                vec!["collections".to_string()],
                vec!["collections".to_string(), "OD".to_string()],
                false
            )
        );
        assert!(imports[2].2);
    }

    #[test]
    fn test_while_true_literal() {
        let tree = parse("while True:\n    pass\n");
        let NodeKind::While { test, .. } = &tree.statements()[0].kind else {
            panic!("expected while");
        };
        assert_eq!(test.as_bool(), Some(true));
    }

    #[test]
    fn test_syntax_error_position() {
        let err = PythonBackend::new().parse("def foo(\n").unwrap_err();
        let parse_error = err.parse_error().expect("parse error");
        assert!(parse_error.line >= 1);
        assert!(!parse_error.message.is_empty());
    }

    #[test]
    fn test_empty_source() {
        let tree = parse("");
        assert!(tree.statements().is_empty());
    }

    fn layout_error(src: &str) -> ParseError {
        match PythonBackend::new().parse(src) {
            Err(AnalysisError::Parse(e)) => e,
            other => panic!(
                "expected a syntax error for {:?}, got {:?}",
                src,
                other.map(|_| ())
            ),
        }
    }

    #[test]
    fn test_header_without_body_is_rejected() {
        for src in ["def f(x):\n", "class A:\n", "if x:\n", "for i in xs:\n"] {
            let err = layout_error(src);
            assert_eq!(err.line, 1);
            assert_eq!(err.message, "expected an indented block");
        }
    }

    #[test]
    fn test_body_not_indented_is_rejected() {
        let err = layout_error("def f():\nreturn 1\n");
        assert_eq!(err.message, "expected an indented block");
    }

    #[test]
    fn test_stray_indent_is_rejected() {
        let err = layout_error("def f():\n    return 1\n      x = 2\n");
        assert_eq!(err.line, 3);
        assert_eq!(err.message, "unexpected indent");
    }

    #[test]
    fn test_python2_print_is_rejected() {
        let err = layout_error("print 'hello'\n");
        assert_eq!(err.line, 1);
        assert!(err.message.contains("Missing parentheses in call to 'print'"));
    }

    #[test]
    fn test_valid_layouts_still_parse() {
        parse("if x: y = 1\nelse: y = 2\n");
        parse("def f():\n    # comment\n    return 1\n\n\nclass A:\n    pass\n");
        parse("x = (1,\n     2); y = 3\nz = 4\n");
        parse("try:\n    a()\nexcept ValueError:\n    b()\nfinally:\n    c()\n");
        parse("match cmd:\n    case 'go':\n        run()\n    case _:\n        stop()\n");
    }
}

//! JavaScript and TypeScript backend using tree-sitter.
//!
//! One backend type serves the three dialects; TypeScript and TSX share the
//! JavaScript statement grammar and only add type-level syntax, which lowers
//! to nothing.

use tree_sitter::{Node as TsNode, Parser};

use super::{check_depth, field_children, first_syntax_error, named_children};
use crate::analysis::{
    BoolOperator, Language, LanguageBackend, Literal, LoopKind, Node, NodeKind, Param, Span,
    SyntaxTree,
};
use crate::error::AnalysisError;

/// Grammar variant served by a [`JavaScriptBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    JavaScript,
    TypeScript,
    Tsx,
}

pub struct JavaScriptBackend {
    dialect: Dialect,
    language: tree_sitter::Language,
}

impl JavaScriptBackend {
    pub fn new(dialect: Dialect) -> Self {
        let language = match dialect {
            Dialect::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Dialect::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Dialect::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        };
        Self { dialect, language }
    }

    fn create_parser(&self) -> Result<Parser, AnalysisError> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| AnalysisError::Backend(e.to_string()))?;
        Ok(parser)
    }
}

impl LanguageBackend for JavaScriptBackend {
    fn language(&self) -> Language {
        match self.dialect {
            Dialect::JavaScript => Language::JavaScript,
            Dialect::TypeScript => Language::TypeScript,
            Dialect::Tsx => Language::Tsx,
        }
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        match self.dialect {
            Dialect::JavaScript => &["js", "jsx", "mjs", "cjs"],
            Dialect::TypeScript => &["ts", "mts", "cts"],
            Dialect::Tsx => &["tsx"],
        }
    }

    fn parse(&self, source: &str) -> Result<SyntaxTree, AnalysisError> {
        let mut parser = self.create_parser()?;
        let tree = parser.parse(source, None).ok_or_else(|| {
            AnalysisError::Backend(format!("{} parser returned no tree", self.language()))
        })?;

        let root = tree.root_node();
        if let Some(err) = first_syntax_error(root) {
            return Err(err.into());
        }
        check_depth(root)?;

        let lowerer = Lowerer {
            src: source.as_bytes(),
        };
        let module = Node::new(
            NodeKind::Module {
                body: lowerer.statements(root),
            },
            Span::from_node(root),
        );
        Ok(SyntaxTree::new(self.language(), module, source))
    }
}

/// Kinds that lower through [`Lowerer::statement`] wherever they appear.
fn is_statement(kind: &str) -> bool {
    kind.ends_with("_statement") || kind.ends_with("_declaration") || kind == "statement_block"
}

fn is_function_value(kind: &str) -> bool {
    matches!(
        kind,
        "arrow_function" | "function_expression" | "function" | "generator_function"
    )
}

fn unquote(text: &str) -> String {
    text.trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .to_string()
}

/// Lowers a tree-sitter-javascript/typescript CST into [`Node`]s.
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

    fn empty(node: TsNode) -> Node {
        Node::new(NodeKind::Other { children: vec![] }, Span::from_node(node))
    }

    fn statements(&self, node: TsNode) -> Vec<Node> {
        let mut out = Vec::new();
        for child in named_children(node) {
            self.statement(child, &mut out);
        }
        out
    }

    /// Statements of a block, or the single statement of an unbraced body.
    fn body(&self, node: Option<TsNode>) -> Vec<Node> {
        match node {
            Some(n) if n.kind() == "statement_block" => self.statements(n),
            Some(n) => {
                let mut out = Vec::new();
                self.statement(n, &mut out);
                out
            }
            None => Vec::new(),
        }
    }

    fn statement(&self, node: TsNode, out: &mut Vec<Node>) {
        let span = Span::from_node(node);
        let kind = match node.kind() {
            "empty_statement" | "hash_bang_line" => return,
            "expression_statement" => {
                for child in named_children(node) {
                    out.push(self.expr(child));
                }
                return;
            }
            "import_statement" => self.import(node),
            "export_statement" => {
                if let Some(decl) = node.child_by_field_name("declaration") {
                    self.statement(decl, out);
                } else if let Some(value) = node.child_by_field_name("value") {
                    out.push(self.expr(value));
                }
                return;
            }
            "class_declaration" | "abstract_class_declaration" => self.class(node),
            "function_declaration" | "generator_function_declaration" => NodeKind::Function {
                name: self.field_text(node, "name"),
                params: self.params_of(node),
                body: self.body(node.child_by_field_name("body")),
            },
            "lexical_declaration" | "variable_declaration" => {
                for declarator in named_children(node)
                    .into_iter()
                    .filter(|d| d.kind() == "variable_declarator")
                {
                    out.push(self.declarator(declarator));
                }
                return;
            }
            "if_statement" => NodeKind::If {
                test: self.condition(node, "condition"),
                body: self.body(node.child_by_field_name("consequence")),
                orelse: node
                    .child_by_field_name("alternative")
                    .and_then(|alt| named_children(alt).into_iter().next())
                    .map(|stmt| self.body(Some(stmt)))
                    .unwrap_or_default(),
            },
            "for_statement" => self.counter_for(node),
            "for_in_statement" => {
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
                    body: self.body(node.child_by_field_name("body")),
                    orelse: Vec::new(),
                }
            }
            "while_statement" | "do_statement" => NodeKind::While {
                test: self.condition(node, "condition"),
                body: self.body(node.child_by_field_name("body")),
                orelse: Vec::new(),
            },
            "try_statement" => NodeKind::Try {
                body: self.body(node.child_by_field_name("body")),
                handlers: node
                    .child_by_field_name("handler")
                    .map(|h| {
                        vec![Node::new(
                            NodeKind::ExceptHandler {
                                types: Vec::new(),
                                body: self.body(h.child_by_field_name("body")),
                            },
                            Span::from_node(h),
                        )]
                    })
                    .unwrap_or_default(),
                orelse: Vec::new(),
                finalbody: node
                    .child_by_field_name("finalizer")
                    .map(|f| self.body(f.child_by_field_name("body")))
                    .unwrap_or_default(),
            },
            "switch_statement" => self.switch(node),
            "return_statement" => NodeKind::Return {
                value: named_children(node)
                    .first()
                    .map(|value| Box::new(self.expr(*value))),
            },
            "break_statement" => NodeKind::Break,
            "continue_statement" => NodeKind::Continue,
            "labeled_statement" => {
                if let Some(body) = node.child_by_field_name("body") {
                    self.statement(body, out);
                }
                return;
            }
            "statement_block" => NodeKind::Other {
                children: self.statements(node),
            },
            // Type-level declarations carry no runtime behavior.
            "interface_declaration"
            | "type_alias_declaration"
            | "enum_declaration"
            | "ambient_declaration"
            | "function_signature"
            | "import_alias" => NodeKind::Other { children: vec![] },
            _ => {
                out.push(self.expr(node));
                return;
            }
        };
        out.push(Node::new(kind, span));
    }

    /// `const f = () => {}` becomes a named function, `const x = require("m")`
    /// an import, anything else an assignment.
    fn declarator(&self, node: TsNode) -> Node {
        let span = Span::from_node(node);
        let name = node.child_by_field_name("name");
        let value = node.child_by_field_name("value");

        let required = value.and_then(|v| self.require_source(v));

        let kind = match (value, required) {
            (Some(v), _) if is_function_value(v.kind()) => NodeKind::Function {
                name: name.map(|n| self.text(n)).unwrap_or_default(),
                params: self.params_of(v),
                body: self.function_body(v),
            },
            (_, Some(module)) => NodeKind::Import {
                relative: module.starts_with('.'),
                modules: vec![module],
                names: name.map(|n| self.pattern_names(n)).unwrap_or_default(),
                wildcard: false,
            },
            _ => NodeKind::Assign {
                targets: name.map(|n| self.expr(n)).into_iter().collect(),
                value: value.map(|v| Box::new(self.expr(v))),
            },
        };
        Node::new(kind, span)
    }

    /// Module path of a `require("…")` call.
    fn require_source(&self, node: TsNode) -> Option<String> {
        if node.kind() != "call_expression" {
            return None;
        }
        let callee = node.child_by_field_name("function")?;
        if self.text(callee) != "require" {
            return None;
        }
        let args = node.child_by_field_name("arguments")?;
        let first = named_children(args).into_iter().next()?;
        (first.kind() == "string").then(|| unquote(&self.text(first)))
    }

    /// Identifiers bound by a declaration pattern.
    fn pattern_names(&self, node: TsNode) -> Vec<String> {
        match node.kind() {
            "identifier" | "shorthand_property_identifier_pattern" => vec![self.text(node)],
            "pair_pattern" => node
                .child_by_field_name("value")
                .map(|v| self.pattern_names(v))
                .unwrap_or_default(),
            _ => named_children(node)
                .into_iter()
                .flat_map(|c| self.pattern_names(c))
                .collect(),
        }
    }

    fn import(&self, node: TsNode) -> NodeKind {
        let module = node
            .child_by_field_name("source")
            .map(|s| unquote(&self.text(s)))
            .unwrap_or_default();

        let mut names = Vec::new();
        let mut wildcard = false;
        for clause in named_children(node)
            .into_iter()
            .filter(|c| c.kind() == "import_clause")
        {
            for part in named_children(clause) {
                match part.kind() {
                    "identifier" => names.push(self.text(part)),
                    "namespace_import" => {
                        wildcard = true;
                        names.extend(
                            named_children(part)
                                .into_iter()
                                .filter(|c| c.kind() == "identifier")
                                .map(|c| self.text(c)),
                        );
                    }
                    "named_imports" => {
                        for spec in named_children(part) {
                            let bound = spec
                                .child_by_field_name("alias")
                                .or_else(|| spec.child_by_field_name("name"));
                            if let Some(bound) = bound {
                                names.push(self.text(bound));
                            }
                        }
                    }
                    _ => {}
                }
            }
        }

        NodeKind::Import {
            relative: module.starts_with('.'),
            modules: if module.is_empty() { vec![] } else { vec![module] },
            names,
            wildcard,
        }
    }

    fn class(&self, node: TsNode) -> NodeKind {
        let bases = named_children(node)
            .into_iter()
            .filter(|c| c.kind() == "class_heritage")
            .flat_map(|h| self.exprs(h))
            .collect();

        let mut body = Vec::new();
        if let Some(class_body) = node.child_by_field_name("body") {
            for member in named_children(class_body) {
                if let Some(lowered) = self.class_member(member) {
                    body.push(lowered);
                }
            }
        }

        NodeKind::Class {
            name: self.field_text(node, "name"),
            bases,
            body,
        }
    }

    fn class_member(&self, node: TsNode) -> Option<Node> {
        let span = Span::from_node(node);
        let kind = match node.kind() {
            "method_definition" => NodeKind::Function {
                name: self.field_text(node, "name"),
                params: self.params_of(node),
                body: self.body(node.child_by_field_name("body")),
            },
            "field_definition" | "public_field_definition" => {
                let name = node
                    .child_by_field_name("property")
                    .or_else(|| node.child_by_field_name("name"));
                match node.child_by_field_name("value") {
                    Some(v) if is_function_value(v.kind()) => NodeKind::Function {
                        name: name.map(|n| self.text(n)).unwrap_or_default(),
                        params: self.params_of(v),
                        body: self.function_body(v),
                    },
                    value => NodeKind::Assign {
                        targets: Vec::new(),
                        value: value.map(|v| Box::new(self.expr(v))),
                    },
                }
            }
            "class_static_block" => NodeKind::Other {
                children: self.body(node.child_by_field_name("body")),
            },
            _ => return None,
        };
        Some(Node::new(kind, span))
    }

    fn counter_for(&self, node: TsNode) -> NodeKind {
        let mut header = Vec::new();
        if let Some(init) = node.child_by_field_name("initializer") {
            self.statement(init, &mut header);
        }

        let test = node.child_by_field_name("condition").and_then(|c| match c.kind() {
            "empty_statement" | ";" => None,
            "expression_statement" => named_children(c)
                .into_iter()
                .next()
                .map(|e| Box::new(self.expr(e))),
            _ => Some(Box::new(self.expr(c))),
        });

        if let Some(increment) = node.child_by_field_name("increment") {
            header.push(self.expr(increment));
        }

        NodeKind::For {
            kind: LoopKind::Counter,
            target: None,
            header,
            iter: None,
            test,
            body: self.body(node.child_by_field_name("body")),
            orelse: Vec::new(),
        }
    }

    fn switch(&self, node: TsNode) -> NodeKind {
        let cases = node
            .child_by_field_name("body")
            .map(named_children)
            .unwrap_or_default()
            .into_iter()
            .filter(|c| matches!(c.kind(), "switch_case" | "switch_default"))
            .map(|case| {
                let mut body = Vec::new();
                for stmt in field_children(case, "body") {
                    self.statement(stmt, &mut body);
                }
                Node::new(
                    NodeKind::Case {
                        is_default: case.kind() == "switch_default",
                        patterns: case
                            .child_by_field_name("value")
                            .map(|v| vec![self.expr(v)])
                            .unwrap_or_default(),
                        body,
                    },
                    Span::from_node(case),
                )
            })
            .collect();

        NodeKind::Switch {
            subject: self.condition(node, "value"),
            cases,
        }
    }

    /// A parenthesized condition with the parentheses stripped.
    fn condition(&self, node: TsNode, field: &str) -> Box<Node> {
        Box::new(match node.child_by_field_name(field) {
            Some(cond) => self.expr(cond),
            None => Self::empty(node),
        })
    }

    fn params_of(&self, function: TsNode) -> Vec<Param> {
        if let Some(single) = function.child_by_field_name("parameter") {
            return vec![Param::named(self.text(single))];
        }
        function
            .child_by_field_name("parameters")
            .map(named_children)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| self.param(p))
            .collect()
    }

    fn param(&self, node: TsNode) -> Option<Param> {
        match node.kind() {
            "identifier" | "object_pattern" | "array_pattern" => {
                Some(Param::named(self.text(node)))
            }
            "assignment_pattern" => Some(Param::named(self.field_text(node, "left"))),
            "rest_pattern" => Some(Param {
                name: self.text(node).trim_start_matches("...").to_string(),
                is_receiver: false,
                is_variadic: true,
            }),
            "required_parameter" | "optional_parameter" => {
                let pattern = node.child_by_field_name("pattern")?;
                match pattern.kind() {
                    "this" => Some(Param {
                        name: "this".into(),
                        is_receiver: true,
                        is_variadic: false,
                    }),
                    _ => self.param(pattern),
                }
            }
            _ => None,
        }
    }

    /// Body of a function-valued expression; expression-bodied arrows become
    /// a one-element body.
    fn function_body(&self, function: TsNode) -> Vec<Node> {
        match function.child_by_field_name("body") {
            Some(body) if body.kind() == "statement_block" => self.statements(body),
            Some(body) => vec![self.expr(body)],
            None => Vec::new(),
        }
    }

    fn exprs(&self, node: TsNode) -> Vec<Node> {
        let mut out = Vec::new();
        for child in named_children(node) {
            if is_statement(child.kind()) {
                self.statement(child, &mut out);
            } else {
                out.push(self.expr(child));
            }
        }
        out
    }

    fn expr(&self, node: TsNode) -> Node {
        let span = Span::from_node(node);
        let kind = match node.kind() {
            "identifier" | "shorthand_property_identifier" => NodeKind::Name(self.text(node)),
            "this" => NodeKind::SelfRef("this".into()),
            "true" => NodeKind::Literal(Literal::Bool(true)),
            "false" => NodeKind::Literal(Literal::Bool(false)),
            "null" | "undefined" => NodeKind::Literal(Literal::Null),
            "number" => NodeKind::Literal(Literal::Number(self.text(node))),
            "string" | "regex" => NodeKind::Literal(Literal::Str(self.text(node))),
            "template_string" => {
                let substitutions: Vec<Node> = named_children(node)
                    .into_iter()
                    .filter(|c| c.kind() == "template_substitution")
                    .flat_map(|c| self.exprs(c))
                    .collect();
                if substitutions.is_empty() {
                    NodeKind::Literal(Literal::Str(self.text(node)))
                } else {
                    NodeKind::Other {
                        children: substitutions,
                    }
                }
            }
            "parenthesized_expression"
            | "non_null_expression"
            | "as_expression"
            | "satisfies_expression" => {
                if let Some(inner) = named_children(node).into_iter().next() {
                    return self.expr(inner);
                }
                NodeKind::Other { children: vec![] }
            }
            "call_expression" => NodeKind::Call {
                callee: self.condition(node, "function"),
                args: node
                    .child_by_field_name("arguments")
                    .map(|args| match args.kind() {
                        "arguments" => self.exprs(args),
                        _ => vec![self.expr(args)],
                    })
                    .unwrap_or_default(),
            },
            "new_expression" => NodeKind::Call {
                callee: self.condition(node, "constructor"),
                args: node
                    .child_by_field_name("arguments")
                    .map(|args| self.exprs(args))
                    .unwrap_or_default(),
            },
            "member_expression" => NodeKind::Attribute {
                value: self.condition(node, "object"),
                attr: self.field_text(node, "property"),
            },
            "binary_expression" => {
                let operator = self.field_text(node, "operator");
                match bool_operator(&operator) {
                    Some(op) => {
                        let mut operands = Vec::new();
                        self.flatten_bool(node, &operator, &mut operands);
                        NodeKind::BoolOp { op, operands }
                    }
                    None => NodeKind::Other {
                        children: self.exprs(node),
                    },
                }
            }
            "assignment_expression" => NodeKind::Assign {
                targets: node
                    .child_by_field_name("left")
                    .map(|l| vec![self.expr(l)])
                    .unwrap_or_default(),
                value: node
                    .child_by_field_name("right")
                    .map(|r| Box::new(self.expr(r))),
            },
            "augmented_assignment_expression" => NodeKind::AugAssign {
                target: self.condition(node, "left"),
                value: node
                    .child_by_field_name("right")
                    .map(|r| Box::new(self.expr(r))),
            },
            "update_expression" => NodeKind::AugAssign {
                target: self.condition(node, "argument"),
                value: None,
            },
            "arrow_function" | "function_expression" | "function" | "generator_function"
            | "method_definition" => NodeKind::Lambda {
                params: self.params_of(node),
                body: self.function_body(node),
            },
            "class" => self.class(node),
            _ if is_statement(node.kind()) => {
                let mut children = Vec::new();
                self.statement(node, &mut children);
                NodeKind::Other { children }
            }
            _ => NodeKind::Other {
                children: self.exprs(node),
            },
        };
        Node::new(kind, span)
    }

    /// Flatten a left-associative chain of the same logical operator.
    fn flatten_bool(&self, node: TsNode, operator: &str, out: &mut Vec<Node>) {
        if let Some(left) = node.child_by_field_name("left") {
            if left.kind() == "binary_expression" && self.field_text(left, "operator") == operator {
                self.flatten_bool(left, operator, out);
            } else {
                out.push(self.expr(left));
            }
        }
        if let Some(right) = node.child_by_field_name("right") {
            out.push(self.expr(right));
        }
    }
}

fn bool_operator(operator: &str) -> Option<BoolOperator> {
    match operator {
        "&&" => Some(BoolOperator::And),
        "||" => Some(BoolOperator::Or),
        "??" => Some(BoolOperator::Coalesce),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(dialect: Dialect, src: &str) -> SyntaxTree {
        JavaScriptBackend::new(dialect).parse(src).unwrap()
    }

    #[test]
    fn test_arrow_declarator_is_function() {
        let tree = parse(Dialect::JavaScript, "const add = (a, b) => a + b;\n");
        let NodeKind::Function { name, params, body } = &tree.statements()[0].kind else {
            panic!("expected function, got {:?}", tree.statements()[0].kind);
        };
        assert_eq!(name, "add");
        assert_eq!(params.len(), 2);
        assert_eq!(body.len(), 1);
    }

    #[test]
    fn test_class_methods() {
        let tree = parse(
            Dialect::JavaScript,
            "class A extends B {\n  run(x) { return this.go(x); }\n  stop() {}\n}\n",
        );
        let NodeKind::Class { name, body, bases } = &tree.statements()[0].kind else {
            panic!("expected class");
        };
        assert_eq!(name, "A");
        assert_eq!(bases.len(), 1);
        let methods: Vec<_> = body.iter().filter_map(|m| m.name()).collect();
        assert_eq!(methods, vec!["run", "stop"]);
    }

    #[test]
    fn test_for_without_condition() {
        let tree = parse(Dialect::JavaScript, "for (;;) { tick(); }\n");
        let NodeKind::For { kind, test, .. } = &tree.statements()[0].kind else {
            panic!("expected for");
        };
        assert_eq!(*kind, LoopKind::Counter);
        assert!(test.is_none());
    }

    #[test]
    fn test_logical_chain_flattened() {
        let tree = parse(Dialect::JavaScript, "if (a && b && c) { x(); }\n");
        let NodeKind::If { test, .. } = &tree.statements()[0].kind else {
            panic!("expected if");
        };
        let NodeKind::BoolOp { operands, .. } = &test.kind else {
            panic!("expected bool op, got {:?}", test.kind);
        };
        assert_eq!(operands.len(), 3);
    }

    #[test]
    fn test_imports_and_require() {
        let tree = parse(
            Dialect::JavaScript,
            "import fs, { readFile as rf } from 'fs';\nconst { join } = require('./path');\n",
        );
        let NodeKind::Import { modules, names, .. } = &tree.statements()[0].kind else {
            panic!("expected import");
        };
        assert_eq!(modules, &vec!["fs".to_string()]);
        assert_eq!(names, &vec!["fs".to_string(), "rf".to_string()]);

        let NodeKind::Import {
            modules, relative, ..
        } = &tree.statements()[1].kind
        else {
            panic!("expected require import");
        };
        assert_eq!(modules, &vec!["./path".to_string()]);
        assert!(*relative);
    }

    #[test]
    fn test_typescript_this_param_is_receiver() {
        let tree = parse(
            Dialect::TypeScript,
            "function f(this: Window, a: number, ...rest: string[]): void {}\n",
        );
        let NodeKind::Function { params, .. } = &tree.statements()[0].kind else {
            panic!("expected function");
        };
        let counted = params.iter().filter(|p| p.counts()).count();
        assert_eq!(counted, 1);
    }

    #[test]
    fn test_tsx_parses() {
        let tree = parse(
            Dialect::Tsx,
            "export function App(): JSX.Element { return <div>{1}</div>; }\n",
        );
        assert_eq!(tree.language(), Language::Tsx);
        assert!(matches!(tree.statements()[0].kind, NodeKind::Function { .. }));
    }

    #[test]
    fn test_syntax_error() {
        let err = JavaScriptBackend::new(Dialect::JavaScript)
            .parse("function (")
            .unwrap_err();
        assert!(err.parse_error().is_some());
    }
}

//! Lowering from the tree-sitter-python parse tree to the typed AST.
//!
//! tree-sitter hands back an untyped tree addressed by node-kind strings.
//! Everything the slicer needs is translated here, once, into the closed
//! [`Stmt`]/[`Expr`] enums; the dataflow visitor never touches tree-sitter
//! nodes. Unknown statement kinds become [`Stmt::Other`], unknown expression
//! kinds become [`Expr::Group`] over their named children, so nothing is
//! dropped silently.

use tree_sitter::{Node, Parser};

use crate::ast::types::{Expr, FunctionDef, ImportItem, Module, Stmt};
use crate::error::{Result, SliceError};

/// Parse Python source into a typed [`Module`].
///
/// `file_label` is only used in error messages. Tree-sitter is error
/// tolerant, so a tree containing ERROR nodes is treated as a parse
/// failure: the slicer must not report line facts from a tree it cannot
/// trust.
///
/// # Errors
///
/// * [`SliceError::TreeSitter`] - the grammar could not be loaded
/// * [`SliceError::Parse`] - the source is not syntactically valid
pub fn parse_source(source: &str, file_label: &str) -> Result<Module> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| SliceError::TreeSitter(e.to_string()))?;

    let tree = parser.parse(source, None).ok_or_else(|| SliceError::Parse {
        file: file_label.to_string(),
        message: "parser returned no tree".to_string(),
    })?;

    let root = tree.root_node();
    if root.has_error() {
        return Err(SliceError::Parse {
            file: file_label.to_string(),
            message: format!(
                "syntax error near line {}",
                first_error_line(root).unwrap_or(1)
            ),
        });
    }

    Ok(Module {
        body: lower_block(root, source.as_bytes()),
    })
}

/// Line of the first ERROR or missing node under `node`, for diagnostics.
fn first_error_line(node: Node) -> Option<usize> {
    if node.is_error() || node.is_missing() {
        return Some(node.start_position().row + 1);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(line) = first_error_line(child) {
            return Some(line);
        }
    }
    None
}

// =============================================================================
// Helpers
// =============================================================================

/// Get text from a node, handling UTF-8 safely.
fn node_text<'a>(node: Node<'a>, source: &'a [u8]) -> &'a str {
    std::str::from_utf8(&source[node.start_byte()..node.end_byte()]).unwrap_or("")
}

/// Find first child with given kind.
fn child_by_kind<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == kind {
            return Some(child);
        }
    }
    None
}

/// 1-based start line of a node.
#[inline]
fn line_of(node: Node) -> usize {
    node.start_position().row + 1
}

/// Rebuild a dotted module path (`a.b.c`) from a `dotted_name` node.
fn extract_dotted_name(node: Node, source: &[u8]) -> String {
    let mut cursor = node.walk();
    let parts: Vec<&str> = node
        .children(&mut cursor)
        .filter(|c| c.kind() == "identifier")
        .map(|c| node_text(c, source))
        .collect();
    parts.join(".")
}

// =============================================================================
// Statement lowering
// =============================================================================

/// Lower every statement directly under `node` (a module or block).
fn lower_block(node: Node, source: &[u8]) -> Vec<Stmt> {
    let mut stmts = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.is_named() && child.kind() != "comment" {
            lower_statement(child, source, &mut stmts);
        }
    }
    stmts
}

/// Lower statements out of a field that holds a block (or is absent).
fn lower_body_field(node: Node, field: &str, source: &[u8]) -> Vec<Stmt> {
    node.child_by_field_name(field)
        .map(|block| lower_block(block, source))
        .unwrap_or_default()
}

fn lower_statement(node: Node, source: &[u8], out: &mut Vec<Stmt>) {
    let line = line_of(node);
    match node.kind() {
        "expression_statement" => {
            // May hold assignments, bare expressions, or several small
            // statements separated by semicolons.
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                if !child.is_named() || child.kind() == "comment" {
                    continue;
                }
                match child.kind() {
                    "assignment" => {
                        if let Some(stmt) = lower_assignment(child, source) {
                            out.push(stmt);
                        }
                    }
                    "augmented_assignment" => {
                        if let (Some(left), Some(right)) = (
                            child.child_by_field_name("left"),
                            child.child_by_field_name("right"),
                        ) {
                            out.push(Stmt::AugAssign {
                                line: line_of(child),
                                target: lower_expr(left, source),
                                value: lower_expr(right, source),
                            });
                        }
                    }
                    _ => out.push(Stmt::Expr {
                        line: line_of(child),
                        value: lower_expr(child, source),
                    }),
                }
            }
        }

        "return_statement" => {
            let value = named_children(node)
                .into_iter()
                .next()
                .map(|c| lower_expr(c, source));
            out.push(Stmt::Return { line, value });
        }

        "for_statement" => {
            let target = node
                .child_by_field_name("left")
                .map(|n| lower_expr(n, source))
                .unwrap_or(Expr::Group {
                    line,
                    children: vec![],
                });
            let iter = node
                .child_by_field_name("right")
                .map(|n| lower_expr(n, source))
                .unwrap_or(Expr::Group {
                    line,
                    children: vec![],
                });
            out.push(Stmt::For {
                line,
                target,
                iter,
                body: lower_body_field(node, "body", source),
                orelse: lower_else_clause(node, source),
            });
        }

        "while_statement" => {
            let test = node
                .child_by_field_name("condition")
                .map(|n| lower_expr(n, source))
                .unwrap_or(Expr::Group {
                    line,
                    children: vec![],
                });
            out.push(Stmt::While {
                line,
                test,
                body: lower_body_field(node, "body", source),
                orelse: lower_else_clause(node, source),
            });
        }

        "if_statement" => out.push(lower_if(node, source)),

        "with_statement" => {
            let mut items = Vec::new();
            if let Some(clause) = child_by_kind(node, "with_clause") {
                let mut cursor = clause.walk();
                for item in clause.children(&mut cursor) {
                    if item.kind() != "with_item" {
                        continue;
                    }
                    if let Some(value) = item.child_by_field_name("value") {
                        // `expr as name` wraps the context expression in an
                        // as_pattern; the expression is what flows.
                        let expr_node = if value.kind() == "as_pattern" {
                            value.named_child(0).unwrap_or(value)
                        } else {
                            value
                        };
                        items.push(lower_expr(expr_node, source));
                    }
                }
            }
            out.push(Stmt::With {
                line,
                items,
                body: lower_body_field(node, "body", source),
            });
        }

        "try_statement" => {
            let mut handlers = Vec::new();
            let mut orelse = Vec::new();
            let mut finalbody = Vec::new();
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                match child.kind() {
                    "except_clause" | "except_group_clause" => {
                        if let Some(block) = child_by_kind(child, "block") {
                            handlers.push(lower_block(block, source));
                        }
                    }
                    "else_clause" => {
                        if let Some(block) = child_by_kind(child, "block") {
                            orelse = lower_block(block, source);
                        }
                    }
                    "finally_clause" => {
                        if let Some(block) = child_by_kind(child, "block") {
                            finalbody = lower_block(block, source);
                        }
                    }
                    _ => {}
                }
            }
            out.push(Stmt::Try {
                line,
                body: lower_body_field(node, "body", source),
                handlers,
                orelse,
                finalbody,
            });
        }

        "function_definition" => {
            if let Some(def) = lower_function(node, source) {
                out.push(Stmt::FunctionDef(def));
            }
        }

        "decorated_definition" => {
            if let Some(inner) = node.child_by_field_name("definition") {
                lower_statement(inner, source, out);
            }
        }

        "class_definition" => {
            let name = node
                .child_by_field_name("name")
                .map(|n| node_text(n, source).to_string())
                .unwrap_or_default();
            out.push(Stmt::ClassDef {
                line,
                name,
                body: lower_body_field(node, "body", source),
            });
        }

        "import_statement" => {
            let items = lower_plain_import(node, source);
            out.push(Stmt::Import { line, items });
        }

        "import_from_statement" => {
            let (module, level, items) = lower_from_import(node, source);
            out.push(Stmt::ImportFrom {
                line,
                module,
                level,
                items,
            });
        }

        _ => out.push(Stmt::Other { line }),
    }
}

/// Lower `a = b = expr`, flattening chained targets, or return `None` for
/// annotation-only statements (`x: int`) that bind nothing.
fn lower_assignment(node: Node, source: &[u8]) -> Option<Stmt> {
    let line = line_of(node);
    let mut targets = Vec::new();
    let mut current = node;

    loop {
        if let Some(left) = current.child_by_field_name("left") {
            push_targets(left, source, &mut targets);
        }
        let right = current.child_by_field_name("right")?;
        if right.kind() == "assignment" {
            current = right;
        } else {
            return Some(Stmt::Assign {
                line,
                targets,
                value: lower_expr(right, source),
            });
        }
    }
}

/// Flatten `a, b = ...` target patterns into individual target expressions.
fn push_targets(node: Node, source: &[u8], out: &mut Vec<Expr>) {
    match node.kind() {
        "pattern_list" | "tuple_pattern" | "list_pattern" => {
            for child in named_children(node) {
                push_targets(child, source, out);
            }
        }
        _ => out.push(lower_expr(node, source)),
    }
}

/// Fold an if-statement's elif/else chain into nested `If` statements.
fn lower_if(node: Node, source: &[u8]) -> Stmt {
    let line = line_of(node);
    let test = node
        .child_by_field_name("condition")
        .map(|n| lower_expr(n, source))
        .unwrap_or(Expr::Group {
            line,
            children: vec![],
        });
    let body = lower_body_field(node, "consequence", source);

    let mut alternatives = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "elif_clause" || child.kind() == "else_clause" {
            alternatives.push(child);
        }
    }

    let mut orelse = Vec::new();
    for alt in alternatives.into_iter().rev() {
        if alt.kind() == "else_clause" {
            orelse = child_by_kind(alt, "block")
                .map(|b| lower_block(b, source))
                .unwrap_or_default();
        } else {
            let elif_test = alt
                .child_by_field_name("condition")
                .map(|n| lower_expr(n, source))
                .unwrap_or(Expr::Group {
                    line: line_of(alt),
                    children: vec![],
                });
            orelse = vec![Stmt::If {
                line: line_of(alt),
                test: elif_test,
                body: lower_body_field(alt, "consequence", source),
                orelse,
            }];
        }
    }

    Stmt::If {
        line,
        test,
        body,
        orelse,
    }
}

fn lower_function(node: Node, source: &[u8]) -> Option<FunctionDef> {
    let name = node_text(node.child_by_field_name("name")?, source).to_string();
    let mut params = Vec::new();
    if let Some(param_list) = node.child_by_field_name("parameters") {
        for param in named_children(param_list) {
            match param.kind() {
                "identifier" => params.push(node_text(param, source).to_string()),
                "typed_parameter" => {
                    if let Some(id) = child_by_kind(param, "identifier") {
                        params.push(node_text(id, source).to_string());
                    }
                }
                "default_parameter" | "typed_default_parameter" => {
                    if let Some(id) = param.child_by_field_name("name") {
                        params.push(node_text(id, source).to_string());
                    }
                }
                "list_splat_pattern" | "dictionary_splat_pattern" => {
                    if let Some(id) = child_by_kind(param, "identifier") {
                        params.push(node_text(id, source).to_string());
                    }
                }
                // `/` and `*` separators carry no name
                _ => {}
            }
        }
    }
    Some(FunctionDef {
        line: line_of(node),
        name,
        params,
        body: lower_body_field(node, "body", source),
    })
}

fn lower_else_clause(node: Node, source: &[u8]) -> Vec<Stmt> {
    node.child_by_field_name("alternative")
        .and_then(|alt| child_by_kind(alt, "block"))
        .map(|block| lower_block(block, source))
        .unwrap_or_default()
}

// =============================================================================
// Import lowering
// =============================================================================

/// `import foo.bar, baz as qux` -> one item per module.
fn lower_plain_import(node: Node, source: &[u8]) -> Vec<ImportItem> {
    let mut items = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "dotted_name" => items.push(ImportItem {
                name: extract_dotted_name(child, source),
                alias: None,
            }),
            "aliased_import" => {
                let mut module = String::new();
                let mut alias = None;
                let mut alias_cursor = child.walk();
                for part in child.children(&mut alias_cursor) {
                    match part.kind() {
                        "dotted_name" => module = extract_dotted_name(part, source),
                        // the bare identifier after `as`
                        "identifier" => alias = Some(node_text(part, source).to_string()),
                        _ => {}
                    }
                }
                if !module.is_empty() {
                    items.push(ImportItem {
                        name: module,
                        alias,
                    });
                }
            }
            _ => {}
        }
    }
    items
}

/// `from [.]*module import a as b, c` -> (module, dot level, items).
/// Wildcard imports yield no items; the slicer cannot name what they bind.
fn lower_from_import(node: Node, source: &[u8]) -> (String, usize, Vec<ImportItem>) {
    let mut module = String::new();
    let mut level = 0usize;
    let mut items = Vec::new();
    let mut after_import = false;

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "import" => after_import = true,
            "relative_import" => {
                let mut rel_cursor = child.walk();
                for part in child.children(&mut rel_cursor) {
                    match part.kind() {
                        // Count dots from text directly; the tree shape of
                        // the prefix varies between grammar versions.
                        "import_prefix" => {
                            level = node_text(part, source).chars().filter(|&c| c == '.').count();
                        }
                        "dotted_name" => module = extract_dotted_name(part, source),
                        _ => {}
                    }
                }
            }
            "dotted_name" => {
                if after_import {
                    items.push(ImportItem {
                        name: extract_dotted_name(child, source),
                        alias: None,
                    });
                } else {
                    module = extract_dotted_name(child, source);
                }
            }
            "aliased_import" => {
                let mut name = String::new();
                let mut alias = None;
                let mut alias_cursor = child.walk();
                for part in child.children(&mut alias_cursor) {
                    match part.kind() {
                        "dotted_name" => name = extract_dotted_name(part, source),
                        "identifier" => alias = Some(node_text(part, source).to_string()),
                        _ => {}
                    }
                }
                if !name.is_empty() {
                    items.push(ImportItem { name, alias });
                }
            }
            _ => {}
        }
    }

    (module, level, items)
}

// =============================================================================
// Expression lowering
// =============================================================================

fn named_children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .filter(|c| c.is_named() && c.kind() != "comment")
        .collect()
}

fn lower_expr(node: Node, source: &[u8]) -> Expr {
    let line = line_of(node);
    match node.kind() {
        "identifier" => Expr::Name {
            line,
            id: node_text(node, source).to_string(),
        },

        "attribute" => {
            let value = node
                .child_by_field_name("object")
                .map(|n| lower_expr(n, source))
                .unwrap_or(Expr::Group {
                    line,
                    children: vec![],
                });
            let attr = node
                .child_by_field_name("attribute")
                .map(|n| node_text(n, source).to_string())
                .unwrap_or_default();
            Expr::Attribute {
                line,
                value: Box::new(value),
                attr,
            }
        }

        "call" => {
            let func = node
                .child_by_field_name("function")
                .map(|n| lower_expr(n, source))
                .unwrap_or(Expr::Group {
                    line,
                    children: vec![],
                });
            let mut args = Vec::new();
            let mut kwargs = Vec::new();
            if let Some(arg_list) = node.child_by_field_name("arguments") {
                if arg_list.kind() == "generator_expression" {
                    // f(x for x in xs) - the generator is the sole argument
                    args.push(lower_expr(arg_list, source));
                } else {
                    for arg in named_children(arg_list) {
                        match arg.kind() {
                            "keyword_argument" => {
                                if let Some(value) = arg.child_by_field_name("value") {
                                    kwargs.push(lower_expr(value, source));
                                }
                            }
                            "list_splat" | "dictionary_splat" => {
                                if let Some(inner) = arg.named_child(0) {
                                    kwargs.push(lower_expr(inner, source));
                                }
                            }
                            _ => args.push(lower_expr(arg, source)),
                        }
                    }
                }
            }
            Expr::Call {
                line,
                func: Box::new(func),
                args,
                kwargs,
            }
        }

        "list_comprehension" | "set_comprehension" | "dictionary_comprehension"
        | "generator_expression" => {
            let mut iterables = Vec::new();
            for child in named_children(node) {
                if child.kind() == "for_in_clause" {
                    if let Some(right) = child.child_by_field_name("right") {
                        iterables.push(lower_expr(right, source));
                    }
                }
            }
            Expr::Comprehension { line, iterables }
        }

        "parenthesized_expression" | "await" | "as_pattern" => node
            .named_child(0)
            .map(|inner| lower_expr(inner, source))
            .unwrap_or(Expr::Group {
                line,
                children: vec![],
            }),

        // Lambda parameters are local bindings, not dependencies; only the
        // body can reference outer names.
        "lambda" => {
            let children = node
                .child_by_field_name("body")
                .map(|b| vec![lower_expr(b, source)])
                .unwrap_or_default();
            Expr::Group { line, children }
        }

        // f-string pieces: only interpolated expressions carry names.
        "string" => {
            let mut children = Vec::new();
            collect_interpolations(node, source, &mut children);
            Expr::Group { line, children }
        }

        // Everything else (operators, subscripts, containers, conditionals,
        // walrus, yields, ...) reduces to its named sub-expressions; leaf
        // literals reduce to an empty group.
        _ => Expr::Group {
            line,
            children: named_children(node)
                .into_iter()
                .map(|c| lower_expr(c, source))
                .collect(),
        },
    }
}

fn collect_interpolations(node: Node, source: &[u8], out: &mut Vec<Expr>) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "interpolation" {
            if let Some(expr) = child
                .child_by_field_name("expression")
                .or_else(|| child.named_child(0))
            {
                out.push(lower_expr(expr, source));
            }
        } else if child.child_count() > 0 {
            collect_interpolations(child, source, out);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

//! The dataflow walk over one module.
//!
//! [`FlowVisitor`] runs a single pass in one direction. Backward, it carries
//! a tracked-variable set that only grows: a statement that defines or
//! mutates a tracked variable is emitted and the names it reads join the
//! set. Forward, it stays dormant until the first statement at or past the
//! target line, captures that statement's enclosing function, and from then
//! on reports uses of affected variables inside that function only.
//!
//! Calls with relevant arguments descend one level into the callee body,
//! local or imported, binding positional arguments to parameters. The
//! descent emits nodes labeled with the callee's file and function but never
//! descends again from within.

use std::path::{Path, PathBuf};

use rustc_hash::{FxHashMap, FxHashSet};

use crate::ast::{Expr, FunctionDef, Stmt};
use crate::resolve::{find_function, ImportMap, ImportResolver};
use crate::slice::names::{most_specific, names_in_expr};
use crate::slice::types::{SliceDirection, SliceNode, MODULE_SCOPE};

pub struct FlowVisitor<'a> {
    direction: SliceDirection,
    target_line: usize,
    file_label: PathBuf,
    lines: &'a [String],
    imports: &'a ImportMap,
    resolver: Option<&'a ImportResolver>,
    functions: &'a FxHashMap<String, &'a FunctionDef>,

    /// Backward: variables whose producers we want. Forward: variables the
    /// criterion value has reached. Monotonically growing either way.
    pub tracked: FxHashSet<String>,
    pub nodes: Vec<SliceNode>,

    function_stack: Vec<String>,
    started: bool,
    target_function: Option<String>,
}

impl<'a> FlowVisitor<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        variable: &str,
        target_line: usize,
        direction: SliceDirection,
        file_label: impl Into<PathBuf>,
        lines: &'a [String],
        imports: &'a ImportMap,
        resolver: Option<&'a ImportResolver>,
        functions: &'a FxHashMap<String, &'a FunctionDef>,
    ) -> Self {
        debug_assert!(direction != SliceDirection::Both);
        let mut tracked = FxHashSet::default();
        tracked.insert(variable.to_string());
        Self {
            direction,
            target_line,
            file_label: file_label.into(),
            lines,
            imports,
            resolver,
            functions,
            tracked,
            nodes: Vec::new(),
            function_stack: vec![MODULE_SCOPE.to_string()],
            started: false,
            target_function: None,
        }
    }

    pub fn visit(&mut self, body: &[Stmt]) {
        for stmt in body {
            self.visit_stmt(stmt);
        }
    }

    fn current_function(&self) -> &str {
        self.function_stack.last().map(String::as_str).unwrap_or(MODULE_SCOPE)
    }

    /// Forward walks stay dormant until the first statement at or past the
    /// target line; that statement's enclosing function becomes the scope
    /// the forward slice is confined to.
    fn maybe_start(&mut self, line: usize) {
        if !self.started && line >= self.target_line {
            self.started = true;
            self.target_function = Some(self.current_function().to_string());
        }
    }

    /// True while forward emission is allowed: started, and still inside
    /// the function that contained the target line.
    fn in_target_scope(&self) -> bool {
        self.started && self.target_function.as_deref() == Some(self.current_function())
    }

    fn line_text(&self, line: usize) -> String {
        line.checked_sub(1)
            .and_then(|idx| self.lines.get(idx))
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default()
    }

    fn push_node(
        &mut self,
        line: usize,
        variable: String,
        operation: String,
        code: String,
        dependencies: Vec<String>,
        context: Option<String>,
    ) {
        self.nodes.push(SliceNode {
            file: self.file_label.clone(),
            line,
            variable,
            operation,
            code,
            function: self.current_function().to_string(),
            dependencies,
            context,
        });
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        if self.direction == SliceDirection::Forward {
            self.maybe_start(stmt.line());
        }
        match stmt {
            Stmt::FunctionDef(def) => self.visit_function_def(def),
            Stmt::Assign {
                line,
                targets,
                value,
            } => self.visit_assign(*line, targets, value),
            Stmt::AugAssign {
                line,
                target,
                value,
            } => {
                // `x += y` redefines x from its right-hand side; the
                // assignment rules cover it.
                self.visit_assign(*line, std::slice::from_ref(target), value);
            }
            Stmt::Expr { line, value } => self.visit_expr_stmt(*line, value),
            Stmt::For {
                line,
                target,
                iter,
                body,
                orelse,
            } => {
                self.visit_for(*line, target, iter);
                self.visit(body);
                self.visit(orelse);
            }
            Stmt::While {
                test, body, orelse, ..
            } => {
                self.scan_calls(test);
                self.visit(body);
                self.visit(orelse);
            }
            Stmt::If {
                test, body, orelse, ..
            } => {
                self.scan_calls(test);
                self.visit(body);
                self.visit(orelse);
            }
            Stmt::With { line, items, body } => {
                self.visit_with(*line, items);
                self.visit(body);
            }
            Stmt::Try {
                body,
                handlers,
                orelse,
                finalbody,
                ..
            } => {
                self.visit(body);
                for handler in handlers {
                    self.visit(handler);
                }
                self.visit(orelse);
                self.visit(finalbody);
            }
            Stmt::Return { line, value } => {
                if let Some(value) = value {
                    self.visit_return(*line, value);
                }
            }
            Stmt::ClassDef { body, .. } => self.visit(body),
            Stmt::Import { .. } | Stmt::ImportFrom { .. } | Stmt::Other { .. } => {}
        }
    }

    fn visit_function_def(&mut self, def: &FunctionDef) {
        self.function_stack.push(def.name.clone());
        if self.direction == SliceDirection::Backward {
            for param in &def.params {
                if self.tracked.contains(param) {
                    self.push_node(
                        def.line,
                        param.clone(),
                        "parameter".to_string(),
                        format!("def {}(..., {}, ...)", def.name, param),
                        Vec::new(),
                        None,
                    );
                }
            }
        }
        self.visit(&def.body);
        self.function_stack.pop();
    }

    fn visit_assign(&mut self, line: usize, targets: &[Expr], value: &Expr) {
        match self.direction {
            SliceDirection::Backward => {
                if line <= self.target_line {
                    for target in targets {
                        let Expr::Name { id, .. } = target else { continue };
                        if !self.tracked.contains(id) {
                            continue;
                        }
                        let rhs = names_in_expr(value);
                        self.push_node(
                            line,
                            id.clone(),
                            "assignment".to_string(),
                            self.line_text(line),
                            most_specific(&rhs),
                            None,
                        );

                        // A call on the right-hand side produced the tracked
                        // value; follow into the callee once.
                        if let Expr::Call { func, args, .. } = value {
                            if let Expr::Name { id: callee, .. } = func.as_ref() {
                                let mut arg_vars = FxHashSet::default();
                                for arg in args {
                                    arg_vars.extend(names_in_expr(arg));
                                }
                                if !arg_vars.is_empty() {
                                    let callee = callee.clone();
                                    self.analyze_call(&callee, args, &arg_vars);
                                }
                            }
                        }

                        let rhs = names_in_expr(value);
                        self.tracked.extend(rhs);
                    }
                }
            }
            SliceDirection::Forward | SliceDirection::Both => {
                if self.in_target_scope() {
                    let rhs = names_in_expr(value);
                    let hit = sorted_intersection(&rhs, &self.tracked);
                    if !hit.is_empty() {
                        for target in targets {
                            let Expr::Name { id, .. } = target else { continue };
                            self.push_node(
                                line,
                                id.clone(),
                                "assignment".to_string(),
                                self.line_text(line),
                                hit.clone(),
                                None,
                            );
                            self.tracked.insert(id.clone());
                        }
                    }
                }
                self.scan_calls(value);
            }
        }
    }

    fn visit_expr_stmt(&mut self, line: usize, value: &Expr) {
        if let Expr::Call { func, args, .. } = value {
            if let Expr::Attribute {
                value: receiver,
                attr,
                ..
            } = func.as_ref()
            {
                // Mutating method calls like items.append(x) tie the
                // receiver to the arguments.
                let obj = receiver_base(receiver);
                match self.direction {
                    SliceDirection::Backward => {
                        if line <= self.target_line && self.tracked.contains(&obj) {
                            let mut arg_vars = FxHashSet::default();
                            for arg in args {
                                arg_vars.extend(names_in_expr(arg));
                            }
                            let mut deps: Vec<String> = arg_vars.iter().cloned().collect();
                            deps.sort();
                            self.push_node(
                                line,
                                obj,
                                format!(".{attr}()"),
                                self.line_text(line),
                                deps,
                                None,
                            );
                            self.tracked.extend(arg_vars);
                        }
                    }
                    SliceDirection::Forward | SliceDirection::Both => {
                        if self.in_target_scope() && self.tracked.contains(&obj) {
                            self.push_node(
                                line,
                                obj,
                                format!(".{attr}()"),
                                self.line_text(line),
                                Vec::new(),
                                None,
                            );
                        }
                    }
                }
            }
        }
        self.scan_calls(value);
    }

    fn visit_for(&mut self, line: usize, target: &Expr, iter: &Expr) {
        match self.direction {
            SliceDirection::Backward => {
                let Expr::Name { id, .. } = target else { return };
                if line <= self.target_line && self.tracked.contains(id) {
                    let iter_vars = names_in_expr(iter);
                    let mut deps: Vec<String> = iter_vars.iter().cloned().collect();
                    deps.sort();
                    self.push_node(
                        line,
                        id.clone(),
                        "for loop".to_string(),
                        self.line_text(line),
                        deps.clone(),
                        Some(format!("iterates over {}", deps.join(", "))),
                    );
                    self.tracked.extend(iter_vars);
                }
            }
            SliceDirection::Forward | SliceDirection::Both => {
                if self.in_target_scope() {
                    let iter_vars = names_in_expr(iter);
                    let hit = sorted_intersection(&iter_vars, &self.tracked);
                    if !hit.is_empty() {
                        if let Expr::Name { id, .. } = target {
                            self.push_node(
                                line,
                                id.clone(),
                                "for loop".to_string(),
                                self.line_text(line),
                                hit.clone(),
                                Some(format!("iterates over {}", hit.join(", "))),
                            );
                            self.tracked.insert(id.clone());
                        }
                    }
                }
                self.scan_calls(iter);
            }
        }
    }

    fn visit_with(&mut self, line: usize, items: &[Expr]) {
        if self.direction != SliceDirection::Backward && self.in_target_scope() {
            for item in items {
                let item_vars = names_in_expr(item);
                let hit = sorted_intersection(&item_vars, &self.tracked);
                if let Some(first) = hit.first() {
                    self.push_node(
                        line,
                        first.clone(),
                        "used in with statement".to_string(),
                        self.line_text(line),
                        hit.clone(),
                        None,
                    );
                }
            }
        }
        if self.direction != SliceDirection::Backward {
            for item in items {
                self.scan_calls(item);
            }
        }
    }

    fn visit_return(&mut self, line: usize, value: &Expr) {
        if self.direction != SliceDirection::Backward {
            if self.in_target_scope() {
                let return_vars = names_in_expr(value);
                let hit = sorted_intersection(&return_vars, &self.tracked);
                if let Some(first) = hit.first() {
                    self.push_node(
                        line,
                        first.clone(),
                        "returned".to_string(),
                        self.line_text(line),
                        hit.clone(),
                        None,
                    );
                }
            }
            self.scan_calls(value);
        }
    }

    /// Forward only: find every call in an expression tree and report
    /// affected variables passed as arguments, then follow a plain-name
    /// callee into its body.
    fn scan_calls(&mut self, expr: &Expr) {
        if self.direction == SliceDirection::Backward {
            return;
        }
        match expr {
            Expr::Call {
                line,
                func,
                args,
                kwargs,
            } => {
                if self.in_target_scope() {
                    let mut matched = FxHashSet::default();
                    for arg in args {
                        let arg_vars = names_in_expr(arg);
                        let hit = sorted_intersection(&arg_vars, &self.tracked);
                        if let Some(first) = hit.first() {
                            self.push_node(
                                *line,
                                first.clone(),
                                format!("passed to {}()", callee_label(func)),
                                self.line_text(*line),
                                hit.clone(),
                                None,
                            );
                            matched.extend(hit);
                        }
                    }
                    if !matched.is_empty() && self.resolver.is_some() {
                        if let Expr::Name { id, .. } = func.as_ref() {
                            let callee = id.clone();
                            self.analyze_call(&callee, args, &matched);
                        }
                    }
                }
                self.scan_calls(func);
                for arg in args {
                    self.scan_calls(arg);
                }
                for kwarg in kwargs {
                    self.scan_calls(kwarg);
                }
            }
            Expr::Attribute { value, .. } => self.scan_calls(value),
            Expr::Group { children, .. } => {
                for child in children {
                    self.scan_calls(child);
                }
            }
            Expr::Comprehension { iterables, .. } => {
                for iterable in iterables {
                    self.scan_calls(iterable);
                }
            }
            Expr::Name { .. } => {}
        }
    }

    // ========================================================================
    // Interprocedural descent
    // ========================================================================

    /// Follow a call into its callee body, once. Imported callees win over
    /// local ones; a callee that is neither resolves to nothing and the
    /// call stays a leaf.
    fn analyze_call(&mut self, callee: &str, args: &[Expr], relevant: &FxHashSet<String>) {
        if let Some(resolver) = self.resolver {
            if self.imports.contains_key(callee) {
                let Some((path, parsed, original_name)) =
                    resolver.resolve_function_source(callee, self.imports)
                else {
                    return;
                };
                let Some(def) = find_function(&parsed.module, &original_name) else {
                    return;
                };
                let Some(params) = bind_params(def, args, relevant) else {
                    return;
                };
                let label: PathBuf = path
                    .file_name()
                    .map(PathBuf::from)
                    .unwrap_or_else(|| path.clone());
                self.descend(def, params, &label, &parsed.lines);
                return;
            }
        }

        let Some(def) = self.functions.get(callee).copied() else {
            return;
        };
        let Some(params) = bind_params(def, args, relevant) else {
            return;
        };
        let label = self.file_label.clone();
        let lines = self.lines;
        self.descend(def, params, &label, lines);
    }

    fn descend(
        &mut self,
        def: &FunctionDef,
        params: FxHashSet<String>,
        file: &Path,
        lines: &[String],
    ) {
        let mut inner = params;
        for stmt in &def.body {
            match self.direction {
                SliceDirection::Backward => {
                    self.track_backward(stmt, &mut inner, file, lines, &def.name)
                }
                SliceDirection::Forward | SliceDirection::Both => {
                    self.track_forward(stmt, &mut inner, file, lines, &def.name)
                }
            }
        }
    }

    /// One statement of a callee body, backward. Emits producers of the
    /// bound parameters and grows the inner tracked set through nested
    /// assignments, but never descends further.
    fn track_backward(
        &mut self,
        stmt: &Stmt,
        tracked: &mut FxHashSet<String>,
        file: &Path,
        lines: &[String],
        function: &str,
    ) {
        match stmt {
            Stmt::Assign {
                line,
                targets,
                value,
            } => {
                let rhs = names_in_expr(value);
                let hit = sorted_intersection(&rhs, tracked);
                if let Some(first) = hit.first() {
                    self.nodes.push(SliceNode {
                        file: file.to_path_buf(),
                        line: *line,
                        variable: first.clone(),
                        operation: "assignment".to_string(),
                        code: line_in(lines, *line),
                        function: function.to_string(),
                        dependencies: hit.clone(),
                        context: None,
                    });
                    if let Some(Expr::Name { id, .. }) = targets.first() {
                        tracked.insert(id.clone());
                    }
                }
                for target in targets {
                    if let Expr::Name { id, .. } = target {
                        if tracked.contains(id) {
                            tracked.extend(names_in_expr(value));
                        }
                    }
                }
            }
            Stmt::Expr { line, value } => {
                if let Expr::Call { func, args, .. } = value {
                    let mut arg_vars = FxHashSet::default();
                    for arg in args {
                        arg_vars.extend(names_in_expr(arg));
                    }
                    let hit = sorted_intersection(&arg_vars, tracked);
                    if let Some(first) = hit.first() {
                        self.nodes.push(SliceNode {
                            file: file.to_path_buf(),
                            line: *line,
                            variable: first.clone(),
                            operation: format!("passed to {}()", callee_label(func)),
                            code: line_in(lines, *line),
                            function: function.to_string(),
                            dependencies: hit,
                            context: None,
                        });
                    }
                }
            }
            _ => {}
        }
        // Assignments buried in compound statements still grow the tracked
        // set, even though only top-level ones are reported.
        grow_from_nested_assigns(stmt, tracked);
    }

    /// One statement of a callee body, forward. Reports where the bound
    /// parameters flow, recursing through compound statements.
    fn track_forward(
        &mut self,
        stmt: &Stmt,
        tracked: &mut FxHashSet<String>,
        file: &Path,
        lines: &[String],
        function: &str,
    ) {
        match stmt {
            Stmt::Assign {
                line,
                targets,
                value,
            } => {
                let rhs = names_in_expr(value);
                let hit = sorted_intersection(&rhs, tracked);
                if let Some(first) = hit.first() {
                    self.nodes.push(SliceNode {
                        file: file.to_path_buf(),
                        line: *line,
                        variable: first.clone(),
                        operation: "assignment".to_string(),
                        code: line_in(lines, *line),
                        function: function.to_string(),
                        dependencies: hit,
                        context: None,
                    });
                    if let Some(Expr::Name { id, .. }) = targets.first() {
                        tracked.insert(id.clone());
                    }
                }
            }
            Stmt::Expr { line, value } => {
                if let Expr::Call { func, args, .. } = value {
                    let mut arg_vars = FxHashSet::default();
                    for arg in args {
                        arg_vars.extend(names_in_expr(arg));
                    }
                    let hit = sorted_intersection(&arg_vars, tracked);
                    if let Some(first) = hit.first() {
                        self.nodes.push(SliceNode {
                            file: file.to_path_buf(),
                            line: *line,
                            variable: first.clone(),
                            operation: format!("passed to {}()", callee_label(func)),
                            code: line_in(lines, *line),
                            function: function.to_string(),
                            dependencies: hit,
                            context: None,
                        });
                    }
                }
            }
            Stmt::Return {
                line,
                value: Some(value),
            } => {
                let return_vars = names_in_expr(value);
                let hit = sorted_intersection(&return_vars, tracked);
                if let Some(first) = hit.first() {
                    self.nodes.push(SliceNode {
                        file: file.to_path_buf(),
                        line: *line,
                        variable: first.clone(),
                        operation: "returned".to_string(),
                        code: line_in(lines, *line),
                        function: function.to_string(),
                        dependencies: hit,
                        context: None,
                    });
                }
            }
            Stmt::With { line, items, body } => {
                for item in items {
                    let item_vars = names_in_expr(item);
                    let hit = sorted_intersection(&item_vars, tracked);
                    if let Some(first) = hit.first() {
                        self.nodes.push(SliceNode {
                            file: file.to_path_buf(),
                            line: *line,
                            variable: first.clone(),
                            operation: "used in with statement".to_string(),
                            code: line_in(lines, *line),
                            function: function.to_string(),
                            dependencies: hit,
                            context: None,
                        });
                    }
                }
                for sub in body {
                    self.track_forward(sub, tracked, file, lines, function);
                }
            }
            Stmt::Try {
                body,
                handlers,
                orelse,
                finalbody,
                ..
            } => {
                for sub in body
                    .iter()
                    .chain(handlers.iter().flatten())
                    .chain(orelse)
                    .chain(finalbody)
                {
                    self.track_forward(sub, tracked, file, lines, function);
                }
            }
            Stmt::For { body, orelse, .. }
            | Stmt::While { body, orelse, .. }
            | Stmt::If { body, orelse, .. } => {
                for sub in body.iter().chain(orelse) {
                    self.track_forward(sub, tracked, file, lines, function);
                }
            }
            _ => {}
        }
    }
}

/// Bind positional arguments to parameter names, keeping only parameters
/// whose argument reads a relevant variable. `None` when nothing binds.
fn bind_params(
    def: &FunctionDef,
    args: &[Expr],
    relevant: &FxHashSet<String>,
) -> Option<FxHashSet<String>> {
    let mut params = FxHashSet::default();
    for (arg, param) in args.iter().zip(&def.params) {
        let arg_vars = names_in_expr(arg);
        if arg_vars.iter().any(|v| relevant.contains(v)) {
            params.insert(param.clone());
        }
    }
    if params.is_empty() {
        None
    } else {
        Some(params)
    }
}

fn grow_from_nested_assigns(stmt: &Stmt, tracked: &mut FxHashSet<String>) {
    let mut grow = |targets: &[Expr], value: &Expr| {
        for target in targets {
            if let Expr::Name { id, .. } = target {
                if tracked.contains(id) {
                    tracked.extend(names_in_expr(value));
                }
            }
        }
    };
    match stmt {
        Stmt::Assign { targets, value, .. } => grow(targets, value),
        Stmt::AugAssign { target, value, .. } => grow(std::slice::from_ref(target), value),
        Stmt::For { body, orelse, .. }
        | Stmt::While { body, orelse, .. }
        | Stmt::If { body, orelse, .. } => {
            for sub in body.iter().chain(orelse) {
                grow_from_nested_assigns(sub, tracked);
            }
        }
        Stmt::With { body, .. } => {
            for sub in body {
                grow_from_nested_assigns(sub, tracked);
            }
        }
        Stmt::Try {
            body,
            handlers,
            orelse,
            finalbody,
            ..
        } => {
            for sub in body
                .iter()
                .chain(handlers.iter().flatten())
                .chain(orelse)
                .chain(finalbody)
            {
                grow_from_nested_assigns(sub, tracked);
            }
        }
        _ => {}
    }
}

/// Display label for a callee expression.
fn callee_label(func: &Expr) -> String {
    match func {
        Expr::Name { id, .. } => id.clone(),
        Expr::Attribute { value, attr, .. } => {
            let base = receiver_base(value);
            if base.is_empty() {
                format!("<unknown>.{attr}")
            } else {
                format!("{base}.{attr}")
            }
        }
        _ => "<unknown>".to_string(),
    }
}

/// Root identifier of a method-call receiver, or `""` for computed
/// receivers like `f(x).append`.
fn receiver_base(expr: &Expr) -> String {
    match expr {
        Expr::Name { id, .. } => id.clone(),
        Expr::Attribute { value, .. } => receiver_base(value),
        _ => String::new(),
    }
}

fn sorted_intersection(names: &FxHashSet<String>, tracked: &FxHashSet<String>) -> Vec<String> {
    let mut hit: Vec<String> = names.intersection(tracked).cloned().collect();
    hit.sort();
    hit
}

fn line_in(lines: &[String], line: usize) -> String {
    line.checked_sub(1)
        .and_then(|idx| lines.get(idx))
        .map(|s| s.trim_end().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::parse_source;
    use crate::resolve::collect_functions;

    fn run(
        source: &str,
        variable: &str,
        line: usize,
        direction: SliceDirection,
    ) -> Vec<SliceNode> {
        let module = parse_source(source, "<test>").unwrap();
        let lines: Vec<String> = source.lines().map(str::to_string).collect();
        let functions = collect_functions(&module);
        let imports = ImportMap::default();
        let mut visitor = FlowVisitor::new(
            variable,
            line,
            direction,
            "test.py",
            &lines,
            &imports,
            None,
            &functions,
        );
        visitor.visit(&module.body);
        visitor.nodes
    }

    #[test]
    fn test_backward_assignment_chain_needs_passes() {
        // One pass only discovers `b` from the `c = b` line; `a` is found
        // on the next pass. A single visit must report the direct producer.
        let source = "a = 1\nb = a\nc = b\n";
        let nodes = run(source, "c", 3, SliceDirection::Backward);
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].line, 3);
        assert_eq!(nodes[0].variable, "c");
        assert_eq!(nodes[0].operation, "assignment");
        assert_eq!(nodes[0].dependencies, vec!["b"]);
    }

    #[test]
    fn test_backward_ignores_later_redefinitions() {
        let source = "x = 1\ny = x\nx = 99\n";
        let nodes = run(source, "y", 2, SliceDirection::Backward);
        let lines: Vec<usize> = nodes.iter().map(|n| n.line).collect();
        assert!(lines.contains(&2));
        assert!(!lines.contains(&3));
    }

    #[test]
    fn test_backward_parameter_node() {
        let source = "def f(data):\n    out = data + 1\n    return out\n";
        // A visit seeded with the grown set finds the parameter.
        let module = parse_source(source, "<test>").unwrap();
        let lines: Vec<String> = source.lines().map(str::to_string).collect();
        let functions = collect_functions(&module);
        let imports = ImportMap::default();
        let mut visitor = FlowVisitor::new(
            "out",
            2,
            SliceDirection::Backward,
            "test.py",
            &lines,
            &imports,
            None,
            &functions,
        );
        visitor.tracked.insert("data".to_string());
        visitor.visit(&module.body);
        let nodes = visitor.nodes;

        assert!(nodes
            .iter()
            .any(|n| n.operation == "parameter" && n.variable == "data" && n.line == 1));
    }

    #[test]
    fn test_backward_method_call_ties_receiver_to_args() {
        let source = "items = []\nitems.append(value)\nresult = items\n";
        let nodes = run(source, "items", 3, SliceDirection::Backward);
        let call = nodes
            .iter()
            .find(|n| n.operation == ".append()")
            .expect("method call node");
        assert_eq!(call.variable, "items");
        assert_eq!(call.dependencies, vec!["value"]);
    }

    #[test]
    fn test_backward_for_loop_tracks_iterable() {
        let source = "rows = load()\nfor row in rows:\n    total = row\n";
        let nodes = run(source, "row", 3, SliceDirection::Backward);
        let loop_node = nodes
            .iter()
            .find(|n| n.operation == "for loop")
            .expect("for loop node");
        assert_eq!(loop_node.variable, "row");
        assert_eq!(loop_node.dependencies, vec!["rows"]);
        assert_eq!(
            loop_node.context.as_deref(),
            Some("iterates over rows")
        );
    }

    #[test]
    fn test_forward_confined_to_target_function() {
        let source = concat!(
            "def main():\n",
            "    x = 1\n",
            "    y = x\n",
            "\n",
            "def other():\n",
            "    z = x\n",
        );
        let nodes = run(source, "x", 2, SliceDirection::Forward);
        assert!(nodes.iter().any(|n| n.line == 3 && n.variable == "y"));
        assert!(!nodes.iter().any(|n| n.line == 6));
    }

    #[test]
    fn test_forward_starts_at_target_line() {
        let source = "y = x\nx = 1\nz = x\n";
        let nodes = run(source, "x", 2, SliceDirection::Forward);
        assert!(!nodes.iter().any(|n| n.line == 1));
        assert!(nodes.iter().any(|n| n.line == 3 && n.variable == "z"));
    }

    #[test]
    fn test_forward_call_argument_reported() {
        let source = "x = 1\nprint(x)\n";
        let nodes = run(source, "x", 1, SliceDirection::Forward);
        let passed = nodes
            .iter()
            .find(|n| n.operation == "passed to print()")
            .expect("passed-to node");
        assert_eq!(passed.variable, "x");
        assert_eq!(passed.line, 2);
    }

    #[test]
    fn test_forward_return_and_with() {
        let source = concat!(
            "def f(path):\n",
            "    with open(path) as fh:\n",
            "        data = fh\n",
            "    return path\n",
        );
        let nodes = run(source, "path", 2, SliceDirection::Forward);
        assert!(nodes.iter().any(|n| n.operation == "returned" && n.line == 4));
        assert!(nodes
            .iter()
            .any(|n| n.operation == "passed to open()" && n.line == 2));
    }

    #[test]
    fn test_local_descent_binds_parameters() {
        let source = concat!(
            "def double(value):\n",
            "    result = value * 2\n",
            "    return result\n",
            "\n",
            "x = 1\n",
            "y = double(x)\n",
        );
        let nodes = run(source, "y", 6, SliceDirection::Backward);
        // The assignment itself plus producers of `value` inside double.
        assert!(nodes.iter().any(|n| n.line == 6 && n.variable == "y"));
        let inner = nodes
            .iter()
            .find(|n| n.line == 2 && n.function == "double")
            .expect("callee body node");
        assert_eq!(inner.operation, "assignment");
        assert_eq!(inner.dependencies, vec!["value"]);
    }

    #[test]
    fn test_forward_local_descent_reports_returned() {
        let source = concat!(
            "def consume(data):\n",
            "    out = data\n",
            "    return out\n",
            "\n",
            "def main():\n",
            "    x = 1\n",
            "    consume(x)\n",
        );
        let module = parse_source(source, "<test>").unwrap();
        let lines: Vec<String> = source.lines().map(str::to_string).collect();
        let functions = collect_functions(&module);
        let imports = ImportMap::default();
        let cache = std::sync::Arc::new(crate::ast::ModuleCache::new());
        let resolver = ImportResolver::new(".", cache);
        let mut visitor = FlowVisitor::new(
            "x",
            6,
            SliceDirection::Forward,
            "test.py",
            &lines,
            &imports,
            Some(&resolver),
            &functions,
        );
        visitor.visit(&module.body);
        let nodes = visitor.nodes;

        assert!(nodes
            .iter()
            .any(|n| n.operation == "passed to consume()" && n.line == 7));
        assert!(nodes
            .iter()
            .any(|n| n.function == "consume" && n.line == 2 && n.operation == "assignment"));
        assert!(nodes
            .iter()
            .any(|n| n.function == "consume" && n.operation == "returned"));
    }
}

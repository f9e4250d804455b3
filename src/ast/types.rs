//! Typed AST for the subset of Python the slicer reasons about.
//!
//! The tree-sitter parse tree is lowered (see [`crate::ast::lower`]) into
//! these closed enums so that every visitor dispatches via exhaustive
//! pattern matching. A statement or expression kind the analysis does not
//! model lowers to an explicit [`Stmt::Other`] / [`Expr::Group`] instead of
//! being silently skipped by an open-ended visitor.
//!
//! Line numbers are 1-based and always refer to the line where the node
//! starts, matching what a user sees in their editor.

/// A parsed module: the lowered statement list of one source file.
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub body: Vec<Stmt>,
}

/// One statement, tagged by the kinds the dataflow analysis distinguishes.
#[derive(Debug, Clone)]
pub enum Stmt {
    /// `x = expr` (possibly chained or tuple-targeted; every target kept)
    Assign {
        line: usize,
        targets: Vec<Expr>,
        value: Expr,
    },
    /// `x += expr` and friends. The target is both read and written.
    AugAssign {
        line: usize,
        target: Expr,
        value: Expr,
    },
    /// A bare expression statement, e.g. a call for its side effects.
    Expr { line: usize, value: Expr },
    /// `return [expr]`
    Return { line: usize, value: Option<Expr> },
    /// `for target in iter: body [else: orelse]`
    For {
        line: usize,
        target: Expr,
        iter: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    /// `while test: body [else: orelse]`
    While {
        line: usize,
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    /// `if test: body [elif/else -> orelse]`. Elif chains nest as a
    /// single-statement `If` inside `orelse`, mirroring how they execute.
    If {
        line: usize,
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    /// `with item [, item]: body`. Only the context expressions are kept.
    With {
        line: usize,
        items: Vec<Expr>,
        body: Vec<Stmt>,
    },
    /// `try: body except: handlers else: orelse finally: finalbody`
    Try {
        line: usize,
        body: Vec<Stmt>,
        handlers: Vec<Vec<Stmt>>,
        orelse: Vec<Stmt>,
        finalbody: Vec<Stmt>,
    },
    /// `def name(params): body` (decorators stripped during lowering)
    FunctionDef(FunctionDef),
    /// `class name: body`. The body is kept so methods are discoverable.
    ClassDef {
        line: usize,
        name: String,
        body: Vec<Stmt>,
    },
    /// `import a.b [as c], ...`
    Import { line: usize, items: Vec<ImportItem> },
    /// `from [.]*module import a [as b], ...`; `level` counts leading dots.
    ImportFrom {
        line: usize,
        module: String,
        level: usize,
        items: Vec<ImportItem>,
    },
    /// Any statement kind the analysis does not model (pass, raise, del,
    /// global, assert, match, ...). Kept so line accounting stays exact.
    Other { line: usize },
}

/// A function definition with positional parameter names in declaration
/// order. Only plain/typed/defaulted/splat parameter names are recorded;
/// that is all positional argument binding needs.
#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub line: usize,
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
}

/// One imported binding: `name [as alias]`.
#[derive(Debug, Clone)]
pub struct ImportItem {
    pub name: String,
    pub alias: Option<String>,
}

impl ImportItem {
    /// The name this import binds locally.
    #[inline]
    pub fn local_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// One expression, reduced to what dependency extraction needs.
#[derive(Debug, Clone)]
pub enum Expr {
    /// A plain identifier.
    Name { line: usize, id: String },
    /// `value.attr`. Chains like `a.b.c` nest left-to-right.
    Attribute {
        line: usize,
        value: Box<Expr>,
        attr: String,
    },
    /// `func(args..., kwargs...)`. Positional arguments are kept separate
    /// from keyword/splat values because interprocedural parameter binding
    /// is positional; both are scanned for dependency names.
    Call {
        line: usize,
        func: Box<Expr>,
        args: Vec<Expr>,
        kwargs: Vec<Expr>,
    },
    /// List/set/dict comprehension or generator expression. Only the
    /// iterable of each `for` clause survives lowering: the bound loop
    /// variable never escapes the construct, so it must not become a
    /// dependency.
    Comprehension { line: usize, iterables: Vec<Expr> },
    /// Any other expression, flattened to its interesting sub-expressions
    /// (binary operators, subscripts, tuples, f-string interpolations, ...).
    /// Literals lower to an empty group.
    Group { line: usize, children: Vec<Expr> },
}

impl Stmt {
    /// 1-based source line where the statement starts.
    pub fn line(&self) -> usize {
        match self {
            Stmt::Assign { line, .. }
            | Stmt::AugAssign { line, .. }
            | Stmt::Expr { line, .. }
            | Stmt::Return { line, .. }
            | Stmt::For { line, .. }
            | Stmt::While { line, .. }
            | Stmt::If { line, .. }
            | Stmt::With { line, .. }
            | Stmt::Try { line, .. }
            | Stmt::ClassDef { line, .. }
            | Stmt::Import { line, .. }
            | Stmt::ImportFrom { line, .. }
            | Stmt::Other { line } => *line,
            Stmt::FunctionDef(def) => def.line,
        }
    }
}

impl Expr {
    /// 1-based source line where the expression starts.
    pub fn line(&self) -> usize {
        match self {
            Expr::Name { line, .. }
            | Expr::Attribute { line, .. }
            | Expr::Call { line, .. }
            | Expr::Comprehension { line, .. }
            | Expr::Group { line, .. } => *line,
        }
    }
}

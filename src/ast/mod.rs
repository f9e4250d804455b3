//! Parsing front end: tree-sitter parsing, lowering to the typed AST, and
//! the per-query module cache.

pub mod cache;
pub mod lower;
pub mod types;

pub use cache::{parse_file, ModuleCache, ParsedModule};
pub use lower::parse_source;
pub use types::{Expr, FunctionDef, ImportItem, Module, Stmt};

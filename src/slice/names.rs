//! Name extraction from expressions.
//!
//! Attribute chains are tracked as dotted paths. Reading `args.file.name`
//! records the full path and every proper prefix, so a criterion variable of
//! `args`, `args.file`, or `args.file.name` all match the read. Before a
//! node's dependency list is emitted the prefixes are filtered back out,
//! keeping only the most specific path actually written in the source.

use rustc_hash::FxHashSet;

use crate::ast::Expr;

/// Every name and attribute path an expression reads, including all proper
/// prefixes of each attribute path.
pub fn names_in_expr(expr: &Expr) -> FxHashSet<String> {
    let mut names = FxHashSet::default();
    collect(expr, &mut names);
    names
}

fn collect(expr: &Expr, names: &mut FxHashSet<String>) {
    match expr {
        Expr::Name { id, .. } => {
            names.insert(id.clone());
        }
        Expr::Attribute { .. } => match attribute_path(expr) {
            Some(path) => {
                // `a.b.c` also registers `a.b` and `a`.
                let mut end = path.len();
                loop {
                    names.insert(path[..end].to_string());
                    match path[..end].rfind('.') {
                        Some(dot) => end = dot,
                        None => break,
                    }
                }
            }
            None => {
                // Attribute of a non-name base, e.g. `f(x).attr`; only the
                // base expression carries dataflow.
                if let Expr::Attribute { value, .. } = expr {
                    collect(value, names);
                }
            }
        },
        Expr::Call {
            func, args, kwargs, ..
        } => {
            collect(func, names);
            for arg in args {
                collect(arg, names);
            }
            for kwarg in kwargs {
                collect(kwarg, names);
            }
        }
        Expr::Comprehension { iterables, .. } => {
            // Loop variables are comprehension-local; only the iterated
            // sources flow in from outside.
            for iterable in iterables {
                collect(iterable, names);
            }
        }
        Expr::Group { children, .. } => {
            for child in children {
                collect(child, names);
            }
        }
    }
}

/// Flatten an attribute chain rooted at a simple name into a dotted path.
/// Returns `None` when the root is anything else (a call, a subscript).
pub fn attribute_path(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Name { id, .. } => Some(id.clone()),
        Expr::Attribute { value, attr, .. } => {
            let base = attribute_path(value)?;
            Some(format!("{base}.{attr}"))
        }
        _ => None,
    }
}

/// Drop every name that is a proper prefix of another, then sort. The
/// survivors are what the statement literally reads.
pub fn most_specific(names: &FxHashSet<String>) -> Vec<String> {
    let mut kept: Vec<String> = names
        .iter()
        .filter(|name| {
            let prefix = format!("{name}.");
            !names.iter().any(|other| other.starts_with(&prefix))
        })
        .cloned()
        .collect();
    kept.sort();
    kept
}

/// The root identifier of a possibly dotted path.
pub fn base_name(path: &str) -> &str {
    path.split('.').next().unwrap_or(path)
}

//! Output renderers for slice results.

pub mod dot;
pub mod graph;
pub mod json;
pub mod tree;

use crate::error::Result;
use crate::slice::types::{SliceNode, SliceResult};

/// Output format for a slice result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Per-file tree view, one entry per line of the slice.
    Tree,
    /// Grouped view showing convergence into and divergence out of the
    /// target.
    Graph,
    /// Machine-readable JSON.
    Json,
    /// Graphviz DOT dataflow graph.
    Dot,
}

pub fn render(result: &SliceResult, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Tree => Ok(tree::render(result)),
        OutputFormat::Graph => Ok(graph::render(result)),
        OutputFormat::Json => json::render(result),
        OutputFormat::Dot => Ok(dot::render(result)),
    }
}

/// Files named by any node, sorted and deduplicated.
pub(crate) fn files_involved(result: &SliceResult) -> Vec<String> {
    let mut files: Vec<String> = result
        .all_nodes()
        .map(|n| n.file.display().to_string())
        .collect();
    files.sort();
    files.dedup();
    files
}

/// Functions named by any node, sorted and deduplicated.
pub(crate) fn functions_involved(result: &SliceResult) -> Vec<String> {
    let mut functions: Vec<String> = result.all_nodes().map(|n| n.function.clone()).collect();
    functions.sort();
    functions.dedup();
    functions
}

/// Merge nodes that landed on the same (file, line) into one, unioning
/// dependencies and noting extra operations in the context. First
/// occurrence keeps its position.
pub(crate) fn merge_nodes_by_line(nodes: &[SliceNode]) -> Vec<SliceNode> {
    let mut merged: Vec<SliceNode> = Vec::new();
    for node in nodes {
        match merged
            .iter_mut()
            .find(|m| m.file == node.file && m.line == node.line)
        {
            None => merged.push(node.clone()),
            Some(existing) => {
                let mut deps = existing.dependencies.clone();
                deps.extend(node.dependencies.iter().cloned());
                deps.sort();
                deps.dedup();
                existing.dependencies = deps;

                if !node.operation.is_empty() && node.operation != existing.operation {
                    match &mut existing.context {
                        None => existing.context = Some(format!("Also: {}", node.operation)),
                        Some(context) => {
                            context.push_str(&format!(", {}", node.operation));
                        }
                    }
                }
            }
        }
    }
    merged
}

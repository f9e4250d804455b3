//! Graphviz DOT output.
//!
//! The target is a highlighted node; backward nodes point at it with dashed
//! edges plus solid edges along discovered def-use pairs, forward nodes are
//! pointed at from it.

use rustc_hash::FxHashSet;

use crate::slice::types::{SliceNode, SliceResult};

pub fn render(result: &SliceResult) -> String {
    let mut out = Vec::new();
    out.push("digraph dataflow {".to_string());
    out.push("  rankdir=TB;".to_string());
    out.push("  node [shape=box, style=filled, fillcolor=lightblue];".to_string());
    out.push(String::new());

    let target_file = result
        .criterion
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| result.criterion.file.display().to_string());
    let target_id = format!("{}:{}", target_file, result.criterion.line);
    out.push(format!(
        "  \"{target_id}\" [label=\"{}\\n{target_id}\", fillcolor=yellow, penwidth=3];",
        escape_label(&result.criterion.variable)
    ));
    out.push(String::new());

    if let Some(backward) = &result.backward {
        if !backward.is_empty() {
            out.push("  // Backward dependencies".to_string());
            let mut seen = FxHashSet::default();
            seen.insert(target_id.clone());
            for node in backward {
                let id = node_id(node);
                if seen.insert(id.clone()) {
                    out.push(declare(node, &id, &target_file, "lightgreen"));
                }
                // Solid edges from each discovered producer of this node's
                // dependencies.
                for dep in &node.dependencies {
                    if let Some(producer) = backward
                        .iter()
                        .find(|other| &other.variable == dep && other.line < node.line)
                    {
                        out.push(format!("  \"{}\" -> \"{id}\";", node_id(producer)));
                    }
                }
                if id != target_id {
                    out.push(format!("  \"{id}\" -> \"{target_id}\" [style=dashed];"));
                }
            }
            out.push(String::new());
        }
    }

    if let Some(forward) = &result.forward {
        if !forward.is_empty() {
            out.push("  // Forward dataflow".to_string());
            let mut seen = FxHashSet::default();
            seen.insert(target_id.clone());
            for node in forward {
                let id = node_id(node);
                if seen.insert(id.clone()) {
                    out.push(declare(node, &id, &target_file, "lightcoral"));
                }
                if id != target_id {
                    out.push(format!("  \"{target_id}\" -> \"{id}\";"));
                }
            }
            out.push(String::new());
        }
    }

    out.push("}".to_string());
    out.join("\n")
}

fn node_id(node: &SliceNode) -> String {
    format!("{}:{}", node.file.display(), node.line)
}

fn declare(node: &SliceNode, node_id: &str, target_file: &str, cross_color: &str) -> String {
    let code = node.code.trim();
    let text: String = if code.is_empty() {
        node.variable.clone()
    } else {
        code.chars().take(50).collect()
    };
    let color = if node.file.display().to_string() != target_file {
        cross_color
    } else {
        "lightblue"
    };
    format!(
        "  \"{node_id}\" [label=\"{}\\n{node_id}\", fillcolor={color}];",
        escape_label(&text)
    )
}

fn escape_label(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

//! Tree view: one entry per slice line, grouped by file and function.

use crate::render::{files_involved, functions_involved, merge_nodes_by_line};
use crate::slice::types::{SliceNode, SliceResult};

pub fn render(result: &SliceResult) -> String {
    let mut out = Vec::new();
    let target_file = result.criterion.file.display().to_string();
    let header = format!(
        "SLICE: {} @ {}:{}",
        result.criterion.variable,
        target_file,
        result.criterion.line
    );
    out.push(format!("╔{}╗", "═".repeat(70)));
    out.push(format!("║  {:<66}  ║", header));
    out.push(format!("╚{}╝", "═".repeat(70)));
    out.push(String::new());

    if let Some(backward) = &result.backward {
        if !backward.is_empty() {
            out.push("BACKWARD SLICE (how did we get here?)".to_string());
            out.push("─".repeat(72));
            out.push(String::new());

            let mut merged = merge_nodes_by_line(backward);
            merged.sort_by(|a, b| (&a.file, a.line).cmp(&(&b.file, b.line)));
            render_nodes(&mut out, result, &merged, "depends on");
            out.push(String::new());
        }
    }

    if let Some(forward) = &result.forward {
        if !forward.is_empty() {
            out.push("FORWARD SLICE (where does it go?)".to_string());
            out.push("─".repeat(72));
            out.push(String::new());

            // Forward order is already meaningful; merge without sorting.
            let merged = merge_nodes_by_line(forward);
            render_nodes(&mut out, result, &merged, "affects");
            out.push(String::new());
        }
    }

    let total: usize = result.all_nodes().count();
    let files = files_involved(result);
    let functions = functions_involved(result);
    out.push("STATISTICS:".to_string());
    out.push(format!("   - Total lines in slice: {total}"));
    out.push(format!(
        "   - Files involved: {} ({})",
        files.len(),
        files.join(", ")
    ));
    out.push(format!(
        "   - Functions involved: {} ({})",
        functions.len(),
        functions.join(", ")
    ));

    out.join("\n")
}

fn render_nodes(out: &mut Vec<String>, result: &SliceResult, nodes: &[SliceNode], deps_word: &str) {
    let target_name = result
        .criterion
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| result.criterion.file.display().to_string());

    let mut current: Option<(String, String)> = None;
    for node in nodes {
        let file = node.file.display().to_string();
        let group = (file.clone(), node.function.clone());
        if current.as_ref() != Some(&group) {
            if current.is_some() {
                out.push(String::new());
            }
            let cross = if file != target_name { " [cross-file]" } else { "" };
            out.push(format!("  {} → {}(){}", file, node.function, cross));
            current = Some(group);
        }

        let marker = if node.line == result.criterion.line {
            "  << TARGET"
        } else {
            ""
        };
        out.push(format!(
            "    ├─ Line {}: {}{}",
            node.line,
            node.code.trim(),
            marker
        ));
        if !node.dependencies.is_empty() {
            out.push(format!(
                "    │  └─ {deps_word}: {}",
                node.dependencies.join(", ")
            ));
        }
        if let Some(context) = &node.context {
            out.push(format!("    │  └─ {context}"));
        }
    }
}

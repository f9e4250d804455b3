//! Grouped graph view: convergence of producers into the target and
//! divergence of the target into derived variables, calls, and other uses.

use crate::slice::types::{SliceNode, SliceResult};

pub fn render(result: &SliceResult) -> String {
    let mut out = Vec::new();
    let header = format!(
        "  GRAPH VIEW: {} @ {}:{}",
        result.criterion.variable,
        result.criterion.file.display(),
        result.criterion.line
    );
    out.push(format!("╔{}╗", "═".repeat(70)));
    out.push(format!("║{:<70}║", header));
    out.push(format!("╚{}╝", "═".repeat(70)));
    out.push(String::new());

    if let Some(backward) = &result.backward {
        if backward.is_empty() {
            out.push("BACKWARD SLICE: No dependencies found".to_string());
            out.push(String::new());
        } else {
            render_backward(&mut out, result, backward);
        }
    }

    if let Some(forward) = &result.forward {
        if forward.is_empty() {
            out.push("FORWARD SLICE: No uses found".to_string());
            out.push(String::new());
        } else {
            render_forward(&mut out, result, forward);
        }
    }

    let total: usize = result.all_nodes().count();
    let backward_lines = distinct_lines(result.backward.as_deref().unwrap_or_default());
    let forward_lines = distinct_lines(result.forward.as_deref().unwrap_or_default());
    out.push("STATISTICS:".to_string());
    out.push(format!("   - Total nodes: {total}"));
    out.push(format!(
        "   - Backward: {backward_lines} lines, Forward: {forward_lines} lines"
    ));

    out.join("\n")
}

fn distinct_lines(nodes: &[SliceNode]) -> usize {
    let mut lines: Vec<usize> = nodes.iter().map(|n| n.line).collect();
    lines.sort_unstable();
    lines.dedup();
    lines.len()
}

fn render_backward(out: &mut Vec<String>, result: &SliceResult, nodes: &[SliceNode]) {
    out.push("BACKWARD SLICE (how did we get here?)".to_string());
    out.push("─".repeat(72));
    out.push(String::new());

    let Some(target) = nodes.iter().find(|n| n.line == result.criterion.line) else {
        out.push(String::new());
        return;
    };

    out.push(format!(
        "  TARGET: {} (Line {})",
        result.criterion.variable, result.criterion.line
    ));
    out.push(format!("     └─ {}", target.code.trim()));
    out.push(String::new());

    if target.dependencies.is_empty() {
        out.push(String::new());
        return;
    }

    out.push(format!(
        "  DIRECT DEPENDENCIES ({}):",
        target.dependencies.len()
    ));
    out.push(String::new());

    let count = target.dependencies.len();
    for (i, dep) in target.dependencies.iter().enumerate() {
        let is_last = i + 1 == count;
        let prefix = if is_last { "     └─" } else { "     ├─" };
        let indent = if is_last { "  " } else { "│ " };

        // The node that produced this dependency, if the slice found one.
        let producer = nodes
            .iter()
            .find(|n| &n.variable == dep && n.line != result.criterion.line);
        match producer {
            Some(node) => {
                out.push(format!("{prefix} {dep} (Line {})", node.line));
                out.push(format!("     {indent}   {}", node.code.trim()));
                if !node.dependencies.is_empty() {
                    out.push(format!(
                        "     {indent}   └─ depends on: {}",
                        node.dependencies.join(", ")
                    ));
                }
            }
            None => out.push(format!("{prefix} {dep} (external or parameter)")),
        }
        if !is_last {
            out.push("     │".to_string());
        }
    }
    out.push(String::new());
}

fn render_forward(out: &mut Vec<String>, result: &SliceResult, nodes: &[SliceNode]) {
    out.push("FORWARD SLICE (where does it go?)".to_string());
    out.push("─".repeat(72));
    out.push(String::new());

    let mut assignments = Vec::new();
    let mut calls = Vec::new();
    let mut other = Vec::new();
    for node in nodes {
        if node.line == result.criterion.line {
            continue;
        }
        if node.operation == "assignment" {
            assignments.push(node);
        } else if node.operation.contains("passed to") {
            calls.push(node);
        } else {
            other.push(node);
        }
    }

    out.push(format!(
        "  SOURCE: {} (Line {})",
        result.criterion.variable, result.criterion.line
    ));
    out.push(String::new());

    if !assignments.is_empty() {
        out.push(format!("  DERIVED VARIABLES ({}):", assignments.len()));
        out.push("     Variables that receive data from the source".to_string());
        out.push(String::new());
        list_nodes(out, &assignments, |node| {
            format!("{} (Line {})", node.variable, node.line)
        });
    }

    if !calls.is_empty() {
        // One entry per distinct call site.
        let mut unique: Vec<&SliceNode> = Vec::new();
        for node in &calls {
            if !unique
                .iter()
                .any(|u| u.line == node.line && u.operation == node.operation)
            {
                unique.push(node);
            }
        }
        unique.sort_by(|a, b| (a.line, &a.operation).cmp(&(b.line, &b.operation)));

        out.push(format!("  PASSED TO FUNCTIONS ({}):", unique.len()));
        out.push(String::new());
        list_nodes(out, &unique, |node| {
            let func = node.operation.replace("passed to ", "");
            format!("{func} (Line {})", node.line)
        });
    }

    if !other.is_empty() {
        out.push(format!("  OTHER USES ({}):", other.len()));
        out.push(String::new());
        list_nodes(out, &other, |node| {
            format!("Line {}: {}", node.line, node.operation)
        });
    }
}

fn list_nodes(out: &mut Vec<String>, nodes: &[&SliceNode], head: impl Fn(&SliceNode) -> String) {
    let count = nodes.len();
    for (i, node) in nodes.iter().enumerate() {
        let is_last = i + 1 == count;
        let prefix = if is_last { "     └─" } else { "     ├─" };
        let indent = if is_last { "  " } else { "│ " };
        out.push(format!("{prefix} {}", head(node)));
        out.push(format!("     {indent}   {}", node.code.trim()));
        if !node.dependencies.is_empty() && node.operation == "assignment" {
            out.push(format!(
                "     {indent}   └─ uses: {}",
                node.dependencies.join(", ")
            ));
        }
        if !is_last {
            out.push("     │".to_string());
        }
    }
    out.push(String::new());
}

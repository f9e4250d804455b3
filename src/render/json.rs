//! Machine-readable JSON output.

use serde_json::{json, Map, Value};

use crate::error::Result;
use crate::render::{files_involved, functions_involved};
use crate::slice::types::{SliceNode, SliceResult};

pub fn render(result: &SliceResult) -> Result<String> {
    let mut data = Map::new();
    data.insert(
        "target".to_string(),
        json!({
            "file": result.criterion.file.display().to_string(),
            "line": result.criterion.line,
            "variable": result.criterion.variable,
        }),
    );

    if let Some(backward) = &result.backward {
        if !backward.is_empty() {
            data.insert(
                "backward_slice".to_string(),
                Value::Array(backward.iter().map(node_to_value).collect()),
            );
        }
    }
    if let Some(forward) = &result.forward {
        if !forward.is_empty() {
            data.insert(
                "forward_slice".to_string(),
                Value::Array(forward.iter().map(node_to_value).collect()),
            );
        }
    }

    let total: usize = result.all_nodes().count();
    data.insert(
        "statistics".to_string(),
        json!({
            "total_lines": total,
            "files_involved": files_involved(result),
            "functions_involved": functions_involved(result),
        }),
    );

    Ok(serde_json::to_string_pretty(&Value::Object(data))?)
}

fn node_to_value(node: &SliceNode) -> Value {
    let mut value = Map::new();
    value.insert(
        "file".to_string(),
        Value::String(node.file.display().to_string()),
    );
    value.insert("line".to_string(), json!(node.line));
    value.insert("function".to_string(), Value::String(node.function.clone()));
    value.insert(
        "code".to_string(),
        Value::String(node.code.trim().to_string()),
    );
    value.insert("variable".to_string(), Value::String(node.variable.clone()));
    value.insert(
        "operation".to_string(),
        Value::String(node.operation.clone()),
    );
    if !node.dependencies.is_empty() {
        value.insert("dependencies".to_string(), json!(node.dependencies));
    }
    if let Some(context) = &node.context {
        value.insert("context".to_string(), Value::String(context.clone()));
    }
    Value::Object(value)
}

//! Slice data model: criteria, nodes, and results.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Enclosing-scope label for statements outside any function.
pub const MODULE_SCOPE: &str = "<module>";

/// Upper bound on backward propagation passes. Convergence normally happens
/// in two or three; the cap only guards against pathological growth.
pub const MAX_PASSES: usize = 10;

/// Which direction the dataflow walk runs from the criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SliceDirection {
    /// Statements that contributed to the criterion value.
    Backward,
    /// Statements the criterion value flows into.
    Forward,
    /// Both walks, reported as two result sets.
    Both,
}

impl std::fmt::Display for SliceDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SliceDirection::Backward => write!(f, "backward"),
            SliceDirection::Forward => write!(f, "forward"),
            SliceDirection::Both => write!(f, "both"),
        }
    }
}

/// The slicing criterion: a variable at a line in a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criterion {
    pub file: PathBuf,
    pub line: usize,
    pub variable: String,
}

impl Criterion {
    pub fn new(file: impl Into<PathBuf>, line: usize, variable: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            variable: variable.into(),
        }
    }
}

impl std::fmt::Display for Criterion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.variable)
    }
}

impl std::str::FromStr for Criterion {
    type Err = crate::error::SliceError;

    /// Parse `<file>:<line>:<variable>`. The split runs from the right so
    /// paths containing colons still parse.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = || {
            crate::error::SliceError::InvalidCriterion(format!(
                "expected <file>:<line>:<variable>, got {s:?}"
            ))
        };
        let mut parts = s.rsplitn(3, ':');
        let variable = parts.next().filter(|v| !v.is_empty()).ok_or_else(invalid)?;
        let line = parts
            .next()
            .and_then(|l| l.parse::<usize>().ok())
            .filter(|l| *l > 0)
            .ok_or_else(invalid)?;
        let file = parts.next().filter(|f| !f.is_empty()).ok_or_else(invalid)?;
        Ok(Criterion::new(file, line, variable))
    }
}

/// One statement included in a slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceNode {
    /// Source file the statement lives in.
    pub file: PathBuf,
    /// 1-based line number.
    pub line: usize,
    /// The variable this node is about.
    pub variable: String,
    /// What the statement does with it ("assignment", "parameter", ...).
    pub operation: String,
    /// The source line, trimmed.
    pub code: String,
    /// Enclosing function name, or [`MODULE_SCOPE`].
    pub function: String,
    /// Names this statement reads, most specific attribute paths only,
    /// sorted for stable output.
    pub dependencies: Vec<String>,
    /// Extra human-readable detail, e.g. what a loop iterates over.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl SliceNode {
    /// Identity for deduplication. Two visits of the same line for the same
    /// variable with the same operation are one node; the same line can
    /// still appear once per distinct variable or operation.
    pub fn key(&self) -> (PathBuf, usize, String, String) {
        (
            self.file.clone(),
            self.line,
            self.variable.clone(),
            self.operation.clone(),
        )
    }
}

/// A completed slice query. A direction that was not requested stays
/// `None`; a requested direction with no findings is an empty list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SliceResult {
    pub criterion: Criterion,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backward: Option<Vec<SliceNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forward: Option<Vec<SliceNode>>,
}

impl SliceResult {
    pub fn new(criterion: Criterion) -> Self {
        Self {
            criterion,
            backward: None,
            forward: None,
        }
    }

    /// All nodes across both directions, backward first.
    pub fn all_nodes(&self) -> impl Iterator<Item = &SliceNode> {
        self.backward
            .iter()
            .flatten()
            .chain(self.forward.iter().flatten())
    }

    /// Files touched by the slice, in first-appearance order.
    pub fn files(&self) -> Vec<&Path> {
        let mut seen = Vec::new();
        for node in self.all_nodes() {
            if !seen.contains(&node.file.as_path()) {
                seen.push(node.file.as_path());
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(line: usize, variable: &str, operation: &str) -> SliceNode {
        SliceNode {
            file: PathBuf::from("main.py"),
            line,
            variable: variable.to_string(),
            operation: operation.to_string(),
            code: String::new(),
            function: MODULE_SCOPE.to_string(),
            dependencies: Vec::new(),
            context: None,
        }
    }

    #[test]
    fn test_key_distinguishes_variable_and_operation() {
        let a = node(5, "x", "assignment");
        let b = node(5, "y", "assignment");
        let c = node(5, "x", "passed to f()");
        assert_ne!(a.key(), b.key());
        assert_ne!(a.key(), c.key());
        assert_eq!(a.key(), a.clone().key());
    }

    #[test]
    fn test_files_first_appearance_order() {
        let mut result = SliceResult::new(Criterion::new("main.py", 5, "x"));
        let mut other = node(1, "x", "parameter");
        other.file = PathBuf::from("utils.py");
        result.backward = Some(vec![node(3, "x", "assignment"), other]);
        result.forward = Some(vec![node(5, "x", "assignment")]);

        let files: Vec<_> = result.files();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0], Path::new("main.py"));
        assert_eq!(files[1], Path::new("utils.py"));
    }

    #[test]
    fn test_criterion_parses_from_the_right() {
        let criterion: Criterion = "src/app/main.py:42:result".parse().unwrap();
        assert_eq!(criterion.file, PathBuf::from("src/app/main.py"));
        assert_eq!(criterion.line, 42);
        assert_eq!(criterion.variable, "result");

        let windows: Criterion = "C:/project/main.py:7:x".parse().unwrap();
        assert_eq!(windows.file, PathBuf::from("C:/project/main.py"));
    }

    #[test]
    fn test_criterion_rejects_malformed() {
        for bad in ["main.py:result", "main.py:0:x", "main.py:abc:x", ":5:x", "main.py:5:"] {
            assert!(bad.parse::<Criterion>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_direction_serializes_lowercase() {
        let json = serde_json::to_string(&SliceDirection::Backward).unwrap();
        assert_eq!(json, "\"backward\"");
    }
}

//! The slice engine: orchestrates parsing, import resolution, and the
//! per-direction walks into one query.
//!
//! Backward slicing is iterative. A single walk only discovers producers of
//! variables that were already tracked when their statement was visited, so
//! the engine reruns the walk with the grown set until a pass discovers no
//! new variables. The set only grows, which bounds the iteration; a hard
//! pass cap guards the degenerate case.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::ast::{ModuleCache, ParsedModule};
use crate::error::{Result, SliceError};
use crate::resolve::{collect_functions, ImportMap, ImportResolver};
use crate::slice::types::{Criterion, SliceDirection, SliceNode, SliceResult, MAX_PASSES};
use crate::slice::visitor::FlowVisitor;

/// Entry point for slice queries against one project root.
#[derive(Debug)]
pub struct Slicer {
    root: PathBuf,
    cache: Arc<ModuleCache>,
    resolver: Option<ImportResolver>,
}

impl Slicer {
    /// A slicer with cross-file analysis enabled.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_cross_file(root, true)
    }

    /// With `cross_file` off, imports are never resolved and every call is
    /// treated as a call into an unknown external function.
    pub fn with_cross_file(root: impl Into<PathBuf>, cross_file: bool) -> Self {
        let root = root.into();
        let cache = Arc::new(ModuleCache::new());
        let resolver =
            cross_file.then(|| ImportResolver::new(root.clone(), Arc::clone(&cache)));
        Self {
            root,
            cache,
            resolver,
        }
    }

    pub fn cache(&self) -> &ModuleCache {
        &self.cache
    }

    /// Run a slice query.
    ///
    /// # Errors
    ///
    /// * [`SliceError::FileNotFound`] - the criterion file does not exist
    /// * [`SliceError::Parse`] - the criterion file is not valid Python
    ///
    /// Failures in *other* files reached through imports never error; those
    /// edges are dropped and the slice stays partial.
    pub fn slice(&self, criterion: &Criterion, direction: SliceDirection) -> Result<SliceResult> {
        let full_path = self.locate(criterion)?;
        tracing::info!(
            file = %full_path.display(),
            line = criterion.line,
            variable = %criterion.variable,
            %direction,
            "slicing"
        );

        let parsed = self.cache.get_or_parse(&full_path)?;
        let functions = collect_functions(&parsed.module);
        let imports = match &self.resolver {
            Some(resolver) => resolver.parse_imports(&parsed.module, &full_path),
            None => ImportMap::default(),
        };

        // Nodes are labeled with the file name, matching how imported files
        // are reported.
        let file_label: PathBuf = full_path
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| full_path.clone());

        let mut result = SliceResult::new(criterion.clone());

        if matches!(direction, SliceDirection::Backward | SliceDirection::Both) {
            result.backward =
                Some(self.backward_pass_loop(criterion, &parsed, &file_label, &imports, &functions));
        }

        if matches!(direction, SliceDirection::Forward | SliceDirection::Both) {
            result.forward =
                Some(self.forward_pass(criterion, &parsed, &file_label, &imports, &functions));
        }

        Ok(result)
    }

    /// Criterion paths resolve against the project root first, then as
    /// given. Missing files are a criterion error, not a parse error.
    fn locate(&self, criterion: &Criterion) -> Result<PathBuf> {
        let joined = self.root.join(&criterion.file);
        if joined.is_file() {
            return Ok(joined);
        }
        if criterion.file.is_file() {
            return Ok(criterion.file.clone());
        }
        Err(SliceError::FileNotFound(joined))
    }

    fn backward_pass_loop(
        &self,
        criterion: &Criterion,
        parsed: &ParsedModule,
        file_label: &Path,
        imports: &ImportMap,
        functions: &rustc_hash::FxHashMap<String, &crate::ast::FunctionDef>,
    ) -> Vec<SliceNode> {
        let mut nodes: Vec<SliceNode> = Vec::new();
        let mut seen = FxHashSet::default();
        let mut relevant: FxHashSet<String> = FxHashSet::default();
        relevant.insert(criterion.variable.clone());

        for pass in 0..MAX_PASSES {
            let mut visitor = FlowVisitor::new(
                &criterion.variable,
                criterion.line,
                SliceDirection::Backward,
                file_label.to_path_buf(),
                &parsed.lines,
                imports,
                self.resolver.as_ref(),
                functions,
            );
            visitor.tracked = relevant.clone();
            visitor.visit(&parsed.module.body);

            for node in visitor.nodes {
                if seen.insert(node.key()) {
                    nodes.push(node);
                }
            }

            let discovered = visitor.tracked.difference(&relevant).count();
            tracing::debug!(pass, discovered, total = visitor.tracked.len(), "backward pass");
            // The first pass may legitimately discover nothing new beyond
            // the criterion variable; always run a second to be sure.
            if discovered == 0 && pass > 0 {
                break;
            }
            relevant = visitor.tracked;
            if pass + 1 == MAX_PASSES {
                tracing::debug!("backward pass cap reached before convergence");
            }
        }

        nodes.sort_by(|a, b| (&a.file, a.line).cmp(&(&b.file, b.line)));
        nodes
    }

    fn forward_pass(
        &self,
        criterion: &Criterion,
        parsed: &ParsedModule,
        file_label: &Path,
        imports: &ImportMap,
        functions: &rustc_hash::FxHashMap<String, &crate::ast::FunctionDef>,
    ) -> Vec<SliceNode> {
        let mut visitor = FlowVisitor::new(
            &criterion.variable,
            criterion.line,
            SliceDirection::Forward,
            file_label.to_path_buf(),
            &parsed.lines,
            imports,
            self.resolver.as_ref(),
            functions,
        );
        visitor.visit(&parsed.module.body);

        // Target-file nodes first, by line; nodes discovered in other files
        // follow in the order the walk reached them, which keeps a callee's
        // body after its call site.
        let (mut same_file, other): (Vec<SliceNode>, Vec<SliceNode>) = visitor
            .nodes
            .into_iter()
            .partition(|node| node.file == file_label);
        same_file.sort_by_key(|node| node.line);
        same_file.extend(other);
        same_file
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn write(dir: &Path, name: &str, source: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, source).unwrap();
        path
    }

    #[test]
    fn test_missing_file_is_file_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let slicer = Slicer::new(dir.path());
        let err = slicer
            .slice(&Criterion::new("absent.py", 1, "x"), SliceDirection::Both)
            .unwrap_err();
        assert!(matches!(err, SliceError::FileNotFound(_)));
    }

    #[test]
    fn test_unparsable_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "broken.py", "def f(:\n");
        let slicer = Slicer::new(dir.path());
        let err = slicer
            .slice(&Criterion::new("broken.py", 1, "x"), SliceDirection::Both)
            .unwrap_err();
        assert!(matches!(err, SliceError::Parse { .. }));
    }

    #[test]
    fn test_target_file_parses_once_through_cache() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "main.py", "x = 1\ny = x\n");
        let slicer = Slicer::new(dir.path());

        slicer
            .slice(&Criterion::new("main.py", 2, "y"), SliceDirection::Both)
            .unwrap();
        assert_eq!(slicer.cache().len(), 1);

        // A second query over the same file reuses the memoized parse.
        slicer
            .slice(&Criterion::new("main.py", 1, "x"), SliceDirection::Backward)
            .unwrap();
        assert_eq!(slicer.cache().len(), 1);
    }

    #[test]
    fn test_backward_transitive_chain_converges() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "chain.py", "a = 1\nb = a\nc = b\nd = c\n");
        let slicer = Slicer::new(dir.path());
        let result = slicer
            .slice(&Criterion::new("chain.py", 4, "d"), SliceDirection::Backward)
            .unwrap();

        let backward = result.backward.unwrap();
        let lines: Vec<usize> = backward.iter().map(|n| n.line).collect();
        // Every link of the chain, found across passes.
        assert_eq!(lines, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_backward_nodes_deduplicated_across_passes() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "dup.py", "a = 1\nb = a\nc = b + a\n");
        let slicer = Slicer::new(dir.path());
        let result = slicer
            .slice(&Criterion::new("dup.py", 3, "c"), SliceDirection::Backward)
            .unwrap();

        let backward = result.backward.unwrap();
        let mut keys: Vec<_> = backward.iter().map(SliceNode::key).collect();
        let before = keys.len();
        keys.dedup();
        assert_eq!(before, keys.len());
    }

    #[test]
    fn test_cross_file_backward_reaches_callee() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "utils.py",
            "def process_data(input_file):\n    data = input_file\n    return data\n",
        );
        write(
            dir.path(),
            "main.py",
            "from utils import process_data\nraw = \"x\"\nresult = process_data(raw)\n",
        );
        let slicer = Slicer::new(dir.path());
        let result = slicer
            .slice(&Criterion::new("main.py", 3, "result"), SliceDirection::Backward)
            .unwrap();

        let backward = result.backward.unwrap();
        assert!(backward
            .iter()
            .any(|n| n.file == PathBuf::from("utils.py") && n.function == "process_data"));
        assert!(backward
            .iter()
            .any(|n| n.file == PathBuf::from("main.py") && n.variable == "result"));
    }

    #[test]
    fn test_cross_file_disabled_stays_local() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "utils.py",
            "def process_data(input_file):\n    return input_file\n",
        );
        write(
            dir.path(),
            "main.py",
            "from utils import process_data\nraw = \"x\"\nresult = process_data(raw)\n",
        );
        let slicer = Slicer::with_cross_file(dir.path(), false);
        let result = slicer
            .slice(&Criterion::new("main.py", 3, "result"), SliceDirection::Backward)
            .unwrap();

        let backward = result.backward.unwrap();
        assert!(backward.iter().all(|n| n.file == PathBuf::from("main.py")));
    }

    #[test]
    fn test_unresolvable_import_degrades_silently() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "main.py",
            "from nowhere import helper\nx = 1\ny = helper(x)\n",
        );
        let slicer = Slicer::new(dir.path());
        let result = slicer
            .slice(&Criterion::new("main.py", 3, "y"), SliceDirection::Backward)
            .unwrap();

        // The call stays a leaf; the local producers are still reported.
        let backward = result.backward.unwrap();
        assert!(backward.iter().any(|n| n.line == 3 && n.variable == "y"));
        assert!(backward.iter().all(|n| n.file == PathBuf::from("main.py")));
    }

    #[test]
    fn test_forward_orders_target_file_by_line() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "fwd.py",
            "x = 1\ny = x\nprint(y)\nz = x\n",
        );
        let slicer = Slicer::new(dir.path());
        let result = slicer
            .slice(&Criterion::new("fwd.py", 1, "x"), SliceDirection::Forward)
            .unwrap();

        let forward = result.forward.unwrap();
        let lines: Vec<usize> = forward.iter().map(|n| n.line).collect();
        let mut sorted = lines.clone();
        sorted.sort_unstable();
        assert_eq!(lines, sorted);
    }

    #[test]
    fn test_both_directions_populated() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b.py", "a = 1\nb = a\nc = b\n");
        let slicer = Slicer::new(dir.path());
        let result = slicer
            .slice(&Criterion::new("b.py", 2, "b"), SliceDirection::Both)
            .unwrap();
        assert!(result.backward.is_some());
        assert!(result.forward.is_some());
    }
}

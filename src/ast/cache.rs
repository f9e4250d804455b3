//! Parsed-module cache.
//!
//! Parsing is the dominant cost when a slice crosses files: the resolver
//! reads a module to trace re-exports and the visitor reads it again to walk
//! a callee body. [`ModuleCache`] memoizes the lowered AST (plus source
//! lines) per file identity so each file is parsed at most once per cache
//! lifetime.
//!
//! The cache is append-only: an entry is written once and never replaced,
//! so a cache may be shared read-mostly across independent queries. Failures
//! memoize as `None` - a file that does not read or parse is "unavailable",
//! never an error at this layer.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rustc_hash::FxHashMap;

use crate::ast::lower::parse_source;
use crate::ast::types::Module;
use crate::error::{Result, SliceError};

/// A lowered module together with the source lines it was parsed from.
///
/// Slice nodes report the raw text of their line, so the lines travel with
/// the AST everywhere a file is analyzed.
#[derive(Debug)]
pub struct ParsedModule {
    pub module: Module,
    pub lines: Vec<String>,
}

impl ParsedModule {
    /// Source text of a 1-based line, or `""` for out-of-range lines.
    pub fn line_text(&self, line: usize) -> &str {
        line.checked_sub(1)
            .and_then(|idx| self.lines.get(idx))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Read and parse one file into a [`ParsedModule`].
///
/// # Errors
///
/// * [`SliceError::IoWithPath`] - the file could not be read
/// * [`SliceError::Parse`] - the contents are not valid Python
pub fn parse_file(path: &Path) -> Result<ParsedModule> {
    let source =
        std::fs::read_to_string(path).map_err(|e| SliceError::io_with_path(e, path))?;
    let label = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let module = parse_source(&source, &label)?;
    Ok(ParsedModule {
        module,
        lines: source.lines().map(str::to_string).collect(),
    })
}

/// Append-only, write-once-per-file memoization of parsed modules.
#[derive(Debug, Default)]
pub struct ModuleCache {
    entries: Mutex<FxHashMap<PathBuf, Option<Arc<ParsedModule>>>>,
}

impl ModuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parsed module for `path`, or `None` if it cannot be read or parsed.
    ///
    /// The first call per path does the work; every later call returns the
    /// memoized outcome, including memoized failure. Errors never escape:
    /// an unavailable file simply produces no tree, and the caller omits
    /// whatever edge it was about to follow.
    pub fn get(&self, path: &Path) -> Option<Arc<ParsedModule>> {
        if let Some(hit) = self
            .entries
            .lock()
            .expect("module cache poisoned")
            .get(path)
        {
            return hit.clone();
        }

        let parsed = match parse_file(path) {
            Ok(pm) => Some(Arc::new(pm)),
            Err(err) => {
                tracing::debug!(path = %path.display(), %err, "file unavailable for analysis");
                None
            }
        };

        self.entries
            .lock()
            .expect("module cache poisoned")
            .entry(path.to_path_buf())
            .or_insert(parsed)
            .clone()
    }

    /// Like [`get`](Self::get), but surfaces the failure instead of
    /// swallowing it.
    ///
    /// Used for the file a query starts from, where a missing or broken
    /// file must stay a reportable error rather than an empty slice. A
    /// memoized failure re-parses so the caller sees the precise error.
    pub fn get_or_parse(&self, path: &Path) -> Result<Arc<ParsedModule>> {
        if let Some(Some(hit)) = self
            .entries
            .lock()
            .expect("module cache poisoned")
            .get(path)
        {
            return Ok(hit.clone());
        }

        let parsed = Arc::new(parse_file(path)?);
        self.entries
            .lock()
            .expect("module cache poisoned")
            .entry(path.to_path_buf())
            .or_insert_with(|| Some(parsed.clone()));
        Ok(parsed)
    }

    /// Number of files with a memoized outcome (hit or failure).
    pub fn len(&self) -> usize {
        self.entries.lock().expect("module cache poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_cache_returns_same_tree() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mod.py");
        std::fs::write(&path, "x = 1\n").unwrap();

        let cache = ModuleCache::new();
        let first = cache.get(&path).expect("should parse");
        let second = cache.get(&path).expect("should parse");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_missing_file_memoizes_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.py");

        let cache = ModuleCache::new();
        assert!(cache.get(&path).is_none());
        // Failure is memoized too; no re-read on the second lookup.
        assert!(cache.get(&path).is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_unparsable_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.py");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "def broken(:").unwrap();

        let cache = ModuleCache::new();
        assert!(cache.get(&path).is_none());
    }

    #[test]
    fn test_get_or_parse_memoizes_and_reports_errors() {
        let dir = tempfile::tempdir().unwrap();
        let ok = dir.path().join("ok.py");
        std::fs::write(&ok, "x = 1\n").unwrap();
        let broken = dir.path().join("broken.py");
        std::fs::write(&broken, "def broken(:\n").unwrap();

        let cache = ModuleCache::new();
        let first = cache.get_or_parse(&ok).expect("should parse");
        let second = cache.get(&ok).expect("should hit the memoized entry");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);

        let err = cache.get_or_parse(&broken).unwrap_err();
        assert!(matches!(err, SliceError::Parse { .. }));
        // The error stays reportable even after a silent lookup memoized
        // the failure.
        assert!(cache.get(&broken).is_none());
        let err = cache.get_or_parse(&broken).unwrap_err();
        assert!(matches!(err, SliceError::Parse { .. }));
    }

    #[test]
    fn test_line_text_bounds() {
        let pm = ParsedModule {
            module: Module::default(),
            lines: vec!["a = 1".to_string(), "b = a".to_string()],
        };
        assert_eq!(pm.line_text(1), "a = 1");
        assert_eq!(pm.line_text(2), "b = a");
        assert_eq!(pm.line_text(0), "");
        assert_eq!(pm.line_text(3), "");
    }
}

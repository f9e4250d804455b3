//! Import resolution and cross-file lookup.
//!
//! Maps the names a file sees to the files where they are actually defined:
//! module references resolve to paths (same directory, then package
//! directory, then project-root relative), and names imported from a package
//! `__init__.py` are traced through its re-export chain to the submodule
//! that really defines them.
//!
//! Resolution is best-effort by design. An import that points at nothing on
//! disk is silently left out of the map; the slicer must keep producing a
//! partial slice when code references external or unresolvable modules.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::ast::{FunctionDef, Module, ModuleCache, ParsedModule, Stmt};

/// Locally visible name -> (defining file, original name there).
pub type ImportMap = FxHashMap<String, (PathBuf, String)>;

/// The package-root file name that marks a directory as a package.
const PACKAGE_ROOT: &str = "__init__.py";

/// Resolves imports to defining files for one project root.
#[derive(Debug)]
pub struct ImportResolver {
    root: PathBuf,
    cache: Arc<ModuleCache>,
}

impl ImportResolver {
    pub fn new(root: impl Into<PathBuf>, cache: Arc<ModuleCache>) -> Self {
        Self {
            root: root.into(),
            cache,
        }
    }

    /// Resolve a module reference to a source file.
    ///
    /// Candidates are tried in order, first hit wins:
    /// 1. `<dir of from_file>/<module>.py`
    /// 2. `<dir of from_file>/<module>/__init__.py` (package directory)
    /// 3. `<root>/<module with dots as separators>.py`
    pub fn resolve_module(&self, module_ref: &str, from_file: &Path) -> Option<PathBuf> {
        let current_dir = from_file.parent().unwrap_or_else(|| Path::new("."));

        let same_dir = current_dir.join(format!("{module_ref}.py"));
        if same_dir.is_file() {
            return Some(same_dir);
        }

        let package = current_dir.join(module_ref).join(PACKAGE_ROOT);
        if package.is_file() {
            return Some(package);
        }

        let root_relative = self.root.join(format!("{}.py", module_ref.replace('.', "/")));
        if root_relative.is_file() {
            return Some(root_relative);
        }

        None
    }

    /// Follow package-root re-exports to the file that defines `name`.
    ///
    /// A non-package file is returned unchanged. For an `__init__.py`, its
    /// `from <sub> import <name>` statements are scanned; a match resolves
    /// the submodule and recurses through nested package roots. A visited
    /// set bounds the recursion so a cyclic re-export chain terminates at
    /// the point where it closes. When nothing matches, the symbol is
    /// assumed to be defined in the package root itself.
    pub fn trace_reexport(&self, path: &Path, name: &str) -> (PathBuf, String) {
        let mut visited = FxHashSet::default();
        self.trace_reexport_inner(path, name, &mut visited)
    }

    fn trace_reexport_inner(
        &self,
        path: &Path,
        name: &str,
        visited: &mut FxHashSet<PathBuf>,
    ) -> (PathBuf, String) {
        if path.file_name().map(|n| n != PACKAGE_ROOT).unwrap_or(true) {
            return (path.to_path_buf(), name.to_string());
        }
        if !visited.insert(path.to_path_buf()) {
            tracing::debug!(
                path = %path.display(),
                name,
                "cyclic re-export chain; stopping trace"
            );
            return (path.to_path_buf(), name.to_string());
        }

        let Some(parsed) = self.cache.get(path) else {
            return (path.to_path_buf(), name.to_string());
        };

        if let Some(traced) = self.scan_reexports(&parsed.module.body, path, name, visited) {
            return traced;
        }

        // No re-export matched: the symbol is defined here directly.
        (path.to_path_buf(), name.to_string())
    }

    /// Scan a package root's statements (including conditionally guarded
    /// ones) for an import that re-exports `name`.
    fn scan_reexports(
        &self,
        stmts: &[Stmt],
        init_path: &Path,
        name: &str,
        visited: &mut FxHashSet<PathBuf>,
    ) -> Option<(PathBuf, String)> {
        for stmt in stmts {
            match stmt {
                Stmt::ImportFrom {
                    module,
                    level,
                    items,
                    ..
                } if !module.is_empty() => {
                    for item in items {
                        if item.local_name() != name {
                            continue;
                        }
                        // Base directory: the package dir for plain and
                        // single-dot imports, one parent up per extra dot.
                        let mut base = init_path.parent()?.to_path_buf();
                        for _ in 1..*level {
                            base = base.parent()?.to_path_buf();
                        }

                        let as_file = base.join(format!("{}.py", module.replace('.', "/")));
                        if as_file.is_file() {
                            return Some((as_file, item.name.clone()));
                        }

                        let as_package = base
                            .join(module.replace('.', "/"))
                            .join(PACKAGE_ROOT);
                        if as_package.is_file() {
                            return Some(self.trace_reexport_inner(
                                &as_package,
                                &item.name,
                                visited,
                            ));
                        }

                        // Absolute re-export (`from mypkg.sub import x`):
                        // fall back to normal module resolution.
                        if *level == 0 {
                            if let Some(resolved) = self.resolve_module(module, init_path) {
                                return Some(self.trace_reexport_inner(
                                    &resolved,
                                    &item.name,
                                    visited,
                                ));
                            }
                        }
                    }
                }
                Stmt::If { body, orelse, .. } => {
                    if let Some(hit) = self
                        .scan_reexports(body, init_path, name, visited)
                        .or_else(|| self.scan_reexports(orelse, init_path, name, visited))
                    {
                        return Some(hit);
                    }
                }
                Stmt::Try { body, .. } => {
                    if let Some(hit) = self.scan_reexports(body, init_path, name, visited) {
                        return Some(hit);
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// Build the import map for one file's module.
    ///
    /// Walks every import statement, including those nested in functions or
    /// conditional blocks. Imports that do not resolve to a file on disk are
    /// omitted; they must not fail the query.
    pub fn parse_imports(&self, module: &Module, file: &Path) -> ImportMap {
        let mut imports = ImportMap::default();
        self.collect_imports(&module.body, file, &mut imports);
        imports
    }

    fn collect_imports(&self, stmts: &[Stmt], file: &Path, imports: &mut ImportMap) {
        for stmt in stmts {
            match stmt {
                Stmt::Import { items, .. } => {
                    for item in items {
                        match self.resolve_module(&item.name, file) {
                            Some(path) => {
                                imports.insert(
                                    item.local_name().to_string(),
                                    (path, item.name.clone()),
                                );
                            }
                            None => tracing::debug!(
                                module = %item.name,
                                from = %file.display(),
                                "unresolved import; omitting"
                            ),
                        }
                    }
                }
                Stmt::ImportFrom {
                    module,
                    level,
                    items,
                    ..
                } => {
                    self.collect_from_import(module, *level, items, file, imports);
                }
                // Imports can hide anywhere; recurse through every body.
                Stmt::FunctionDef(def) => self.collect_imports(&def.body, file, imports),
                Stmt::ClassDef { body, .. } => self.collect_imports(body, file, imports),
                Stmt::If { body, orelse, .. }
                | Stmt::For { body, orelse, .. }
                | Stmt::While { body, orelse, .. } => {
                    self.collect_imports(body, file, imports);
                    self.collect_imports(orelse, file, imports);
                }
                Stmt::With { body, .. } => self.collect_imports(body, file, imports),
                Stmt::Try {
                    body,
                    handlers,
                    orelse,
                    finalbody,
                    ..
                } => {
                    self.collect_imports(body, file, imports);
                    for handler in handlers {
                        self.collect_imports(handler, file, imports);
                    }
                    self.collect_imports(orelse, file, imports);
                    self.collect_imports(finalbody, file, imports);
                }
                _ => {}
            }
        }
    }

    fn collect_from_import(
        &self,
        module: &str,
        level: usize,
        items: &[crate::ast::ImportItem],
        file: &Path,
        imports: &mut ImportMap,
    ) {
        // Relative imports anchor at the importing file's directory, one
        // parent up per dot beyond the first.
        let base_dir = if level > 0 {
            let mut dir = file.parent().map(Path::to_path_buf);
            for _ in 1..level {
                dir = dir.and_then(|d| d.parent().map(Path::to_path_buf));
            }
            dir
        } else {
            None
        };

        if module.is_empty() {
            // `from . import sub` binds submodules directly.
            let Some(dir) = base_dir else { return };
            for item in items {
                let as_file = dir.join(format!("{}.py", item.name));
                let as_package = dir.join(&item.name).join(PACKAGE_ROOT);
                let path = if as_file.is_file() {
                    Some(as_file)
                } else if as_package.is_file() {
                    Some(as_package)
                } else {
                    None
                };
                match path {
                    Some(p) => {
                        imports.insert(item.local_name().to_string(), (p, item.name.clone()));
                    }
                    None => tracing::debug!(
                        module = %item.name,
                        from = %file.display(),
                        "unresolved relative import; omitting"
                    ),
                }
            }
            return;
        }

        let resolved = match &base_dir {
            Some(dir) => {
                let as_file = dir.join(format!("{}.py", module.replace('.', "/")));
                let as_package = dir.join(module.replace('.', "/")).join(PACKAGE_ROOT);
                if as_file.is_file() {
                    Some(as_file)
                } else if as_package.is_file() {
                    Some(as_package)
                } else {
                    None
                }
            }
            None => self.resolve_module(module, file),
        };

        let Some(module_path) = resolved else {
            tracing::debug!(
                module,
                from = %file.display(),
                "unresolved import; omitting"
            );
            return;
        };

        for item in items {
            let (actual_path, actual_name) = self.trace_reexport(&module_path, &item.name);
            imports.insert(item.local_name().to_string(), (actual_path, actual_name));
        }
    }

    /// Resolve an imported callee to its defining file and parsed module.
    ///
    /// Returns `None` when the name is not imported, the file is
    /// unavailable, or the function does not exist there - all conditions
    /// the caller degrades on, not errors.
    pub fn resolve_function_source(
        &self,
        callee: &str,
        imports: &ImportMap,
    ) -> Option<(PathBuf, Arc<ParsedModule>, String)> {
        let (path, original_name) = imports.get(callee)?;
        let parsed = self.cache.get(path)?;
        find_function(&parsed.module, original_name)?;
        Some((path.clone(), parsed, original_name.clone()))
    }

    pub fn cache(&self) -> &ModuleCache {
        &self.cache
    }
}

/// First syntactic function definition with the given name, searching
/// nested bodies in source order. First match wins when a file defines the
/// same name twice; that ambiguity is documented behavior.
pub fn find_function<'m>(module: &'m Module, name: &str) -> Option<&'m FunctionDef> {
    find_in_stmts(&module.body, name)
}

fn find_in_stmts<'m>(stmts: &'m [Stmt], name: &str) -> Option<&'m FunctionDef> {
    for stmt in stmts {
        match stmt {
            Stmt::FunctionDef(def) => {
                if def.name == name {
                    return Some(def);
                }
                if let Some(found) = find_in_stmts(&def.body, name) {
                    return Some(found);
                }
            }
            Stmt::ClassDef { body, .. } => {
                if let Some(found) = find_in_stmts(body, name) {
                    return Some(found);
                }
            }
            Stmt::If { body, orelse, .. }
            | Stmt::For { body, orelse, .. }
            | Stmt::While { body, orelse, .. } => {
                if let Some(found) =
                    find_in_stmts(body, name).or_else(|| find_in_stmts(orelse, name))
                {
                    return Some(found);
                }
            }
            Stmt::With { body, .. } => {
                if let Some(found) = find_in_stmts(body, name) {
                    return Some(found);
                }
            }
            Stmt::Try {
                body,
                handlers,
                orelse,
                finalbody,
                ..
            } => {
                let mut found = find_in_stmts(body, name);
                if found.is_none() {
                    found = handlers.iter().find_map(|h| find_in_stmts(h, name));
                }
                if found.is_none() {
                    found = find_in_stmts(orelse, name).or_else(|| find_in_stmts(finalbody, name));
                }
                if let Some(def) = found {
                    return Some(def);
                }
            }
            _ => {}
        }
    }
    None
}

/// Map every function name defined anywhere in the module to its first
/// (syntactically earliest) definition.
pub fn collect_functions(module: &Module) -> FxHashMap<String, &FunctionDef> {
    let mut map = FxHashMap::default();
    collect_in_stmts(&module.body, &mut map);
    map
}

fn collect_in_stmts<'m>(stmts: &'m [Stmt], map: &mut FxHashMap<String, &'m FunctionDef>) {
    for stmt in stmts {
        match stmt {
            Stmt::FunctionDef(def) => {
                map.entry(def.name.clone()).or_insert(def);
                collect_in_stmts(&def.body, map);
            }
            Stmt::ClassDef { body, .. } => collect_in_stmts(body, map),
            Stmt::If { body, orelse, .. }
            | Stmt::For { body, orelse, .. }
            | Stmt::While { body, orelse, .. } => {
                collect_in_stmts(body, map);
                collect_in_stmts(orelse, map);
            }
            Stmt::With { body, .. } => collect_in_stmts(body, map),
            Stmt::Try {
                body,
                handlers,
                orelse,
                finalbody,
                ..
            } => {
                collect_in_stmts(body, map);
                for handler in handlers {
                    collect_in_stmts(handler, map);
                }
                collect_in_stmts(orelse, map);
                collect_in_stmts(finalbody, map);
            }
            _ => {}
        }
    }
}

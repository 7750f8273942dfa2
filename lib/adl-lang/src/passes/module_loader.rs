//! Module loader: maps module names to files along the search path, parses
//! each file once, merges annotation sidecars, and drives resolution over
//! the import graph depth first so that the finished set is in topological
//! order.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::{IndexMap, IndexSet};

use crate::ast::ast::{Module0, Module1, ModuleName, ScopedName};
use crate::ast::visitor::walk_module;
use crate::ast::Loc;
use crate::error::{CompileError, Result, SourceMap, Warning};
use crate::passes::annotations::merge_sidecar;
use crate::passes::parse::Parser;
use crate::passes::resolve::{check_module_defaults, resolve_module};
use crate::passes::LoadedAdl;
use crate::stdlib;

#[derive(Debug, Clone, Default)]
pub struct LoaderOptions {
    /// Directories searched for imported modules, in order; first match wins.
    pub search_path: Vec<PathBuf>,
    /// Sidecar extensions to merge, e.g. `adl-java`.
    pub merge_exts: Vec<String>,
}

pub struct ModuleLoader {
    options: LoaderOptions,
    sources: SourceMap,
    modules: IndexMap<ModuleName, Module1>,
    builtin: HashSet<ModuleName>,
    in_progress: Vec<ModuleName>,
    warnings: Vec<Warning>,
    stdlib_loaded: bool,
}

impl ModuleLoader {
    pub fn new(options: LoaderOptions) -> Self {
        Self {
            options,
            sources: SourceMap::new(),
            modules: IndexMap::new(),
            builtin: HashSet::new(),
            in_progress: Vec::new(),
            warnings: Vec::new(),
            stdlib_loaded: false,
        }
    }

    /// Source texts loaded so far; needed to render diagnostics after a
    /// failed load.
    pub fn sources(&self) -> &SourceMap {
        &self.sources
    }

    pub fn into_loaded(self) -> LoadedAdl {
        LoadedAdl {
            modules: self.modules,
            sources: self.sources,
            warnings: self.warnings,
            builtin: self.builtin,
        }
    }

    /// Load a root `.adl` file by path, together with everything it
    /// transitively imports. Returns the module's declared name.
    pub fn load_root_file(&mut self, path: &Path) -> Result<ModuleName> {
        self.ensure_stdlib()?;
        if !path.is_file() {
            return Err(CompileError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        self.process_file(path, None)
    }

    /// Load a module by name, looking it up along the search path and then
    /// in the embedded standard library.
    pub fn load_module(&mut self, name: &ModuleName) -> Result<()> {
        self.ensure_stdlib()?;
        if self.modules.contains_key(name) {
            return Ok(());
        }
        if self.in_progress.contains(name) {
            return Err(self.cycle_error(name));
        }

        let dirs = self.options.search_path.clone();
        for dir in &dirs {
            let candidate = dir.join(name.to_rel_path());
            if candidate.is_file() {
                self.process_file(&candidate, Some(name))?;
                return Ok(());
            }
        }

        if let Some(src) = stdlib::module_source(name) {
            self.process_source(
                format!("<builtin>/{}", name.to_rel_path().display()),
                src.to_string(),
                None,
                Some(name),
            )?;
            self.builtin.insert(name.clone());
            return Ok(());
        }

        Err(CompileError::ModuleNotFound {
            name: name.clone(),
            searched: self.options.search_path.clone(),
        })
    }

    /// The embedded `sys.*` modules are always available, and preloading
    /// them keeps bare-name fallback into the standard library total.
    fn ensure_stdlib(&mut self) -> Result<()> {
        if self.stdlib_loaded {
            return Ok(());
        }
        self.stdlib_loaded = true;
        for name in stdlib::module_names() {
            self.load_module(&name)?;
        }
        Ok(())
    }

    fn process_file(&mut self, path: &Path, expected: Option<&ModuleName>) -> Result<ModuleName> {
        let text = fs::read_to_string(path).map_err(|e| CompileError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        self.process_source(
            path.display().to_string(),
            text,
            Some(path.to_path_buf()),
            expected,
        )
    }

    fn process_source(
        &mut self,
        source_name: String,
        text: String,
        file_path: Option<PathBuf>,
        expected: Option<&ModuleName>,
    ) -> Result<ModuleName> {
        let source = self.sources.add(source_name, text.clone());
        let mut module0 = Parser::parse(&text, source)?;

        if let (Some(expected), Some(path)) = (expected, &file_path) {
            if module0.name != *expected {
                return Err(CompileError::ModuleNameMismatch {
                    path: path.clone(),
                    declared: module0.name.clone(),
                    expected: expected.clone(),
                });
            }
        }

        // sidecars merge before resolution so the resolver sees them
        if let Some(path) = &file_path {
            for ext in self.options.merge_exts.clone() {
                let candidate = path.with_extension(&ext);
                if candidate.is_file() {
                    let sidecar = fs::read_to_string(&candidate).map_err(|e| CompileError::Io {
                        path: candidate.clone(),
                        source: e,
                    })?;
                    merge_sidecar(&mut module0, &candidate, &sidecar, &mut self.warnings)?;
                }
            }
        }

        let name = module0.name.clone();
        if self.modules.contains_key(&name) {
            // the same module reached through two roots; first load wins
            return Ok(name);
        }
        if self.in_progress.contains(&name) {
            return Err(self.cycle_error(&name));
        }
        self.in_progress.push(name.clone());

        for dep in find_module_refs(&module0) {
            if dep != name {
                self.load_module(&dep)?;
            }
        }

        let module1 = resolve_module(&module0, &self.modules)?;
        check_module_defaults(&module1, &self.modules)?;

        self.in_progress.pop();
        self.modules.insert(name.clone(), module1);
        Ok(name)
    }

    fn cycle_error(&self, name: &ModuleName) -> CompileError {
        let start = self
            .in_progress
            .iter()
            .position(|m| m == name)
            .unwrap_or(0);
        CompileError::ImportCycle {
            cycle: self.in_progress[start..].to_vec(),
        }
    }
}

/// Every module a parsed module depends on: its import statements plus any
/// qualified name appearing in a type expression.
fn find_module_refs(module: &Module0) -> IndexSet<ModuleName> {
    let mut refs = IndexSet::new();
    for import in &module.imports {
        refs.insert(import.kind.module_name().clone());
    }
    walk_module(module, &mut |sn: &ScopedName, _loc: &Loc| {
        if !sn.module_name.is_empty() {
            refs.insert(sn.module_name.clone());
        }
    });
    refs
}

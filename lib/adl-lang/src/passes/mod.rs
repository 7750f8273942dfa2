//! Compilation passes, in pipeline order: parse, sidecar merge, module
//! loading, resolution, default-value checking.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::ast::ast::{Decl1, Module1, ModuleName, ScopedName};
use crate::ast::Loc;
use crate::error::{CompileError, Result, SourceMap, Warning};
use crate::typeexpr::DeclResolver;

pub mod annotations;
pub mod module_loader;
pub mod parse;
pub mod resolve;

pub use module_loader::{LoaderOptions, ModuleLoader};

/// The fully loaded and resolved module set handed to backends.
///
/// Modules are in topological order (dependencies first) and immutable from
/// here on; backends monomorphise into copies, never in place.
#[derive(Debug)]
pub struct LoadedAdl {
    pub modules: IndexMap<ModuleName, Module1>,
    pub sources: SourceMap,
    pub warnings: Vec<Warning>,
    pub(crate) builtin: HashSet<ModuleName>,
}

impl LoadedAdl {
    /// Total resolver over the loaded set; unknown names are an error.
    pub fn decl(&self, sn: &ScopedName) -> Result<&Decl1> {
        self.get_decl(sn).ok_or_else(|| CompileError::UnknownType {
            name: sn.to_string(),
            loc: Loc::generated(),
        })
    }

    /// Whether the module came from the embedded standard library rather
    /// than the search path.
    pub fn is_builtin(&self, name: &ModuleName) -> bool {
        self.builtin.contains(name)
    }

    /// Modules loaded from user sources, in topological order.
    pub fn user_modules(&self) -> impl Iterator<Item = &Module1> {
        self.modules
            .values()
            .filter(|m| !self.builtin.contains(&m.name))
    }

    /// Every `(module, decl)` pair: modules in topological order, decls in
    /// declaration order.
    pub fn decls_in_order(&self) -> impl Iterator<Item = (&Module1, &Decl1)> {
        self.modules
            .values()
            .flat_map(|m| m.decls.values().map(move |d| (m, d)))
    }
}

impl DeclResolver for LoadedAdl {
    fn get_decl(&self, sn: &ScopedName) -> Option<&Decl1> {
        self.modules.get(&sn.module_name)?.decls.get(&sn.name)
    }
}

//! The contract the compiler core exposes to backend code generators:
//! ordered iteration over resolved decls (see [`LoadedAdl`]), package path
//! mapping, and typed access to annotation payloads.
//!
//! Annotation payloads are schemaless JSON; each backend knows the shapes
//! it cares about and fails with an emit error on mismatch.

use std::collections::HashMap;

use serde_json::Value;

use crate::ast::ast::{Annotations, ModuleName, ScopedName};
use crate::error::Result;
use crate::passes::LoadedAdl;
use crate::writer::FileWriter;

pub mod astgen;

/// A backend code generator, driven over the loaded module set.
pub trait CodeGen {
    fn generate(&self, adl: &LoadedAdl, writer: &mut FileWriter) -> Result<()>;
}

/// Maps ADL module names to target-language package paths: a root package
/// prefix plus per-module overrides.
#[derive(Debug, Clone, Default)]
pub struct PackageMap {
    pub root_package: String,
    pub overrides: HashMap<ModuleName, String>,
}

impl PackageMap {
    pub fn new(root_package: impl Into<String>) -> Self {
        PackageMap {
            root_package: root_package.into(),
            overrides: HashMap::new(),
        }
    }

    pub fn with_override(mut self, module: ModuleName, package: impl Into<String>) -> Self {
        self.overrides.insert(module, package.into());
        self
    }

    pub fn module_path(&self, module: &ModuleName) -> String {
        if let Some(package) = self.overrides.get(module) {
            return package.clone();
        }
        if self.root_package.is_empty() {
            module.to_string()
        } else {
            format!("{}.{}", self.root_package, module)
        }
    }
}

pub fn get_annotation<'a>(annotations: &'a Annotations, key: &ScopedName) -> Option<&'a Value> {
    annotations.get(key)
}

pub fn get_string_annotation<'a>(
    annotations: &'a Annotations,
    key: &ScopedName,
) -> Option<&'a str> {
    annotations.get(key)?.as_str()
}

pub fn get_bool_annotation(annotations: &Annotations, key: &ScopedName) -> Option<bool> {
    annotations.get(key)?.as_bool()
}

/// The doc text attached via `///` comments or an explicit Doc annotation.
pub fn doc_string<'a>(annotations: &'a Annotations) -> Option<&'a str> {
    get_string_annotation(annotations, &crate::ast::ast::well_known::doc())
}

//! The embedded `sys.*` standard library.
//!
//! These modules are always available to the loader: a directory on the
//! search path can shadow them, otherwise the embedded sources are used.

use crate::ast::ast::ModuleName;

const MODULES: [(&str, &str); 4] = [
    ("sys.types", include_str!("../stdlib/sys/types.adl")),
    ("sys.annotations", include_str!("../stdlib/sys/annotations.adl")),
    ("sys.adlast", include_str!("../stdlib/sys/adlast.adl")),
    ("sys.dynamic", include_str!("../stdlib/sys/dynamic.adl")),
];

/// Standard library module names, dependencies first. Bare-name fallback
/// during resolution consults the modules in this order.
pub fn module_names() -> impl Iterator<Item = ModuleName> {
    MODULES
        .iter()
        .map(|(name, _)| ModuleName::parse(name).expect("builtin module names are valid"))
}

pub fn module_source(name: &ModuleName) -> Option<&'static str> {
    let name = name.to_string();
    MODULES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, src)| *src)
}

#![allow(dead_code)]

use std::fs;

use tempfile::TempDir;

use adl_lang::ast::ast::{Decl1, Module1, ModuleName, ScopedName};
use adl_lang::error::CompileError;
use adl_lang::passes::{LoadedAdl, LoaderOptions, ModuleLoader};

/// Compile a single self-contained module from source text.
pub fn compile(src: &str) -> Result<LoadedAdl, CompileError> {
    compile_tree(&["main.adl"], &[("main.adl", src)], &[])
}

/// Materialise `files` in a temporary directory (which is also the search
/// path), then load the named roots.
pub fn compile_tree(
    roots: &[&str],
    files: &[(&str, &str)],
    merge_exts: &[&str],
) -> Result<LoadedAdl, CompileError> {
    let temp = TempDir::new().unwrap();
    for (rel, content) in files {
        let path = temp.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    let mut loader = ModuleLoader::new(LoaderOptions {
        search_path: vec![temp.path().to_path_buf()],
        merge_exts: merge_exts.iter().map(|e| e.to_string()).collect(),
    });
    for root in roots {
        loader.load_root_file(&temp.path().join(root))?;
    }
    Ok(loader.into_loaded())
}

pub fn first_error(src: &str) -> CompileError {
    match compile(src) {
        Ok(_) => panic!("expected compilation to fail for:\n{}", src),
        Err(err) => err,
    }
}

pub fn module_name(s: &str) -> ModuleName {
    ModuleName::parse(s).unwrap()
}

pub fn scoped(module: &str, name: &str) -> ScopedName {
    ScopedName::new(module_name(module), name)
}

pub fn module<'a>(adl: &'a LoadedAdl, name: &str) -> &'a Module1 {
    adl.modules
        .get(&module_name(name))
        .unwrap_or_else(|| panic!("module {} not loaded", name))
}

pub fn decl<'a>(adl: &'a LoadedAdl, module_str: &str, name: &str) -> &'a Decl1 {
    module(adl, module_str)
        .decls
        .get(name)
        .unwrap_or_else(|| panic!("decl {}.{} not found", module_str, name))
}

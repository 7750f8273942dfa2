//! Name resolver: rewrites every type reference of a module into one of the
//! three canonical forms (primitive, type parameter, fully qualified scoped
//! name), checks arities, and rejects type-alias cycles.
//!
//! All imported modules must already be resolved; the loader guarantees
//! this by processing the dependency graph depth first.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use crate::ast::ast::{
    Annotations, Decl, Decl1, DeclType, Field, Ident, ImportKind, Module0, Module1, ModuleName,
    NewType, ScopedName, Struct, TypeDef, TypeExpr, TypeExpr0, TypeExpr1, TypeRef, Union,
};
use crate::ast::primitive::Primitive;
use crate::ast::visitor::walk_decl;
use crate::ast::Loc;
use crate::error::{CompileError, Result};
use crate::stdlib;

pub struct ResolveCtx<'a> {
    module0: &'a Module0,
    modules: &'a IndexMap<ModuleName, Module1>,
    expanded_imports: HashMap<Ident, ScopedName>,
}

/// Resolve one module against its (already resolved) dependencies.
pub fn resolve_module(
    module0: &Module0,
    modules: &IndexMap<ModuleName, Module1>,
) -> Result<Module1> {
    let ctx = ResolveCtx {
        module0,
        modules,
        expanded_imports: expand_imports(module0, modules)?,
    };

    let mut decls = IndexMap::with_capacity(module0.decls.len());
    for (name, decl0) in &module0.decls {
        decls.insert(name.clone(), resolve_decl(&ctx, decl0)?);
    }

    let module1 = Module1 {
        name: module0.name.clone(),
        imports: module0.imports.clone(),
        decls,
        annotations: resolve_annotations(&ctx, &module0.annotations, &Loc::generated())?,
    };

    check_alias_cycles(&module1)?;

    Ok(module1)
}

/// Build the bare-name import table. Whole-module imports expose every decl
/// of the target; scoped imports expose exactly one. Later imports shadow
/// earlier ones.
fn expand_imports(
    module0: &Module0,
    modules: &IndexMap<ModuleName, Module1>,
) -> Result<HashMap<Ident, ScopedName>> {
    let mut table = HashMap::new();
    for import in &module0.imports {
        match &import.kind {
            ImportKind::Module(module_name) => {
                let target = modules.get(module_name).ok_or_else(|| {
                    CompileError::UnknownImport {
                        name: module_name.to_string(),
                        reason: "module is not loaded",
                        loc: import.loc.clone(),
                    }
                })?;
                for decl_name in target.decls.keys() {
                    table.insert(
                        decl_name.clone(),
                        ScopedName::new(module_name.clone(), decl_name.clone()),
                    );
                }
            }
            ImportKind::Scoped(sn) => {
                let target = modules.get(&sn.module_name).ok_or_else(|| {
                    CompileError::UnknownImport {
                        name: sn.to_string(),
                        reason: "module is not loaded",
                        loc: import.loc.clone(),
                    }
                })?;
                if !target.decls.contains_key(&sn.name) {
                    return Err(CompileError::UnknownImport {
                        name: sn.to_string(),
                        reason: "no such decl in the imported module",
                        loc: import.loc.clone(),
                    });
                }
                table.insert(sn.name.clone(), sn.clone());
            }
        }
    }
    Ok(table)
}

fn resolve_decl(ctx: &ResolveCtx, decl0: &Decl<TypeExpr0>) -> Result<Decl1> {
    let type_params = decl0.decl_type.type_params();
    let mut seen = HashSet::new();
    for param in type_params {
        if !seen.insert(param.as_str()) {
            return Err(CompileError::DuplicateTypeParam {
                decl: decl0.name.clone(),
                param: param.clone(),
                loc: decl0.loc.clone(),
            });
        }
    }

    let scope = DeclScope {
        ctx,
        type_params: seen,
    };

    let decl_type = match &decl0.decl_type {
        DeclType::Struct(s) => DeclType::Struct(Struct {
            type_params: s.type_params.clone(),
            fields: resolve_fields(&scope, &decl0.name, &s.fields)?,
        }),
        DeclType::Union(u) => DeclType::Union(Union {
            type_params: u.type_params.clone(),
            fields: resolve_fields(&scope, &decl0.name, &u.fields)?,
        }),
        DeclType::Type(t) => DeclType::Type(TypeDef {
            type_params: t.type_params.clone(),
            type_expr: resolve_type_expr(&scope, &t.type_expr)?,
        }),
        DeclType::Newtype(n) => DeclType::Newtype(NewType {
            type_params: n.type_params.clone(),
            type_expr: resolve_type_expr(&scope, &n.type_expr)?,
            default: n.default.clone(),
        }),
    };

    Ok(Decl1 {
        name: decl0.name.clone(),
        version: decl0.version,
        decl_type,
        annotations: resolve_annotations(ctx, &decl0.annotations, &decl0.loc)?,
        loc: decl0.loc.clone(),
    })
}

fn resolve_fields(
    scope: &DeclScope,
    decl_name: &Ident,
    fields0: &[Field<TypeExpr0>],
) -> Result<Vec<Field<TypeExpr1>>> {
    let mut seen = HashSet::new();
    fields0
        .iter()
        .map(|f| {
            if !seen.insert(f.name.as_str()) {
                return Err(CompileError::DuplicateField {
                    decl: decl_name.clone(),
                    field: f.name.clone(),
                    loc: f.loc.clone(),
                });
            }
            Ok(Field {
                name: f.name.clone(),
                type_expr: resolve_type_expr(scope, &f.type_expr)?,
                default: f.default.clone(),
                annotations: resolve_annotations(scope.ctx, &f.annotations, &f.loc)?,
                loc: f.loc.clone(),
            })
        })
        .collect()
}

struct DeclScope<'a> {
    ctx: &'a ResolveCtx<'a>,
    type_params: HashSet<&'a str>,
}

fn resolve_type_expr(scope: &DeclScope, te0: &TypeExpr0) -> Result<TypeExpr1> {
    let type_ref = resolve_type_ref(scope, &te0.type_ref, &te0.loc)?;

    let expected = arity_of(scope.ctx, &type_ref);
    if te0.parameters.len() != expected {
        return Err(CompileError::ArityMismatch {
            name: type_ref.to_string(),
            expected,
            got: te0.parameters.len(),
            loc: te0.loc.clone(),
        });
    }

    let parameters = te0
        .parameters
        .iter()
        .map(|p| resolve_type_expr(scope, p))
        .collect::<Result<Vec<_>>>()?;

    Ok(TypeExpr {
        type_ref,
        parameters,
        loc: te0.loc.clone(),
    })
}

/// The scope chain for a bare name: enclosing type parameters, then the
/// primitive table, then local decls, then imports, then the standard
/// library modules.
fn resolve_type_ref(scope: &DeclScope, sn0: &ScopedName, loc: &Loc) -> Result<TypeRef> {
    let ctx = scope.ctx;
    if sn0.module_name.is_empty() {
        let name = &sn0.name;
        if scope.type_params.contains(name.as_str()) {
            return Ok(TypeRef::TypeParam(name.clone()));
        }
        if let Some(primitive) = Primitive::from_str(name) {
            return Ok(TypeRef::Primitive(primitive));
        }
        if ctx.module0.decls.contains_key(name) {
            return Ok(TypeRef::ScopedName(ScopedName::new(
                ctx.module0.name.clone(),
                name.clone(),
            )));
        }
        if let Some(target) = ctx.expanded_imports.get(name) {
            return Ok(TypeRef::ScopedName(target.clone()));
        }
        if let Some(target) = stdlib_lookup(ctx, name) {
            return Ok(TypeRef::ScopedName(target));
        }
        Err(CompileError::UnknownType {
            name: name.clone(),
            loc: loc.clone(),
        })
    } else if sn0.module_name == ctx.module0.name {
        if ctx.module0.decls.contains_key(&sn0.name) {
            Ok(TypeRef::ScopedName(sn0.clone()))
        } else {
            Err(CompileError::UnknownType {
                name: sn0.to_string(),
                loc: loc.clone(),
            })
        }
    } else {
        let known = ctx
            .modules
            .get(&sn0.module_name)
            .is_some_and(|m| m.decls.contains_key(&sn0.name));
        if known {
            Ok(TypeRef::ScopedName(sn0.clone()))
        } else {
            Err(CompileError::UnknownType {
                name: sn0.to_string(),
                loc: loc.clone(),
            })
        }
    }
}

fn stdlib_lookup(ctx: &ResolveCtx, name: &str) -> Option<ScopedName> {
    for module_name in stdlib::module_names() {
        if let Some(module) = ctx.modules.get(&module_name) {
            if module.decls.contains_key(name) {
                return Some(ScopedName::new(module_name, name));
            }
        }
    }
    None
}

fn arity_of(ctx: &ResolveCtx, type_ref: &TypeRef) -> usize {
    match type_ref {
        TypeRef::Primitive(p) => p.arity(),
        TypeRef::TypeParam(_) => 0,
        TypeRef::ScopedName(sn) => {
            if sn.module_name == ctx.module0.name {
                ctx.module0
                    .decls
                    .get(&sn.name)
                    .map(|d| d.arity())
                    .unwrap_or(0)
            } else {
                ctx.modules
                    .get(&sn.module_name)
                    .and_then(|m| m.decls.get(&sn.name))
                    .map(|d| d.arity())
                    .unwrap_or(0)
            }
        }
    }
}

/// Annotation keys are names too: a bare key resolves through local decls,
/// imports and `sys.annotations`; a qualified key is kept verbatim (sidecar
/// keys routinely reference backend config modules that are never loaded).
fn resolve_annotations(
    ctx: &ResolveCtx,
    annotations0: &Annotations,
    loc: &Loc,
) -> Result<Annotations> {
    let mut resolved = Annotations::default();
    for (key, value) in &annotations0.0 {
        let key = if key.module_name.is_empty() {
            resolve_annotation_key(ctx, &key.name, loc)?
        } else {
            key.clone()
        };
        resolved.set(key, value.clone());
    }
    Ok(resolved)
}

fn resolve_annotation_key(ctx: &ResolveCtx, name: &Ident, loc: &Loc) -> Result<ScopedName> {
    if ctx.module0.decls.contains_key(name) {
        return Ok(ScopedName::new(ctx.module0.name.clone(), name.clone()));
    }
    if let Some(target) = ctx.expanded_imports.get(name) {
        return Ok(target.clone());
    }
    if let Some(target) = stdlib_lookup(ctx, name) {
        return Ok(target);
    }
    Err(CompileError::UnknownType {
        name: name.clone(),
        loc: loc.clone(),
    })
}

/// Reject cycles among the module's type aliases. Aliases can only refer to
/// aliases of the same module (the module graph itself is acyclic), so the
/// check is local.
fn check_alias_cycles(module: &Module1) -> Result<()> {
    let alias_names: HashSet<&Ident> = module
        .decls
        .values()
        .filter(|d| matches!(d.decl_type, DeclType::Type(_)))
        .map(|d| &d.name)
        .collect();

    let mut edges: HashMap<&Ident, Vec<Ident>> = HashMap::new();
    for name in &alias_names {
        let decl = &module.decls[name.as_str()];
        let mut referenced = Vec::new();
        walk_decl(decl, &mut |type_ref: &TypeRef, _loc: &Loc| {
            if let TypeRef::ScopedName(sn) = type_ref {
                if sn.module_name == module.name && alias_names.contains(&sn.name) {
                    referenced.push(sn.name.clone());
                }
            }
        });
        edges.insert(*name, referenced);
    }

    #[derive(Clone, Copy, PartialEq)]
    enum State {
        InProgress,
        Done,
    }

    fn visit(
        name: &Ident,
        edges: &HashMap<&Ident, Vec<Ident>>,
        state: &mut HashMap<Ident, State>,
        stack: &mut Vec<Ident>,
        module_name: &ModuleName,
    ) -> Result<()> {
        match state.get(name) {
            Some(State::Done) => return Ok(()),
            Some(State::InProgress) => {
                let start = stack.iter().position(|n| n == name).unwrap_or(0);
                return Err(CompileError::TypeAliasCycle {
                    module: module_name.clone(),
                    cycle: stack[start..].to_vec(),
                });
            }
            None => {}
        }
        state.insert(name.clone(), State::InProgress);
        stack.push(name.clone());
        if let Some(targets) = edges.get(name) {
            for target in targets {
                visit(target, edges, state, stack, module_name)?;
            }
        }
        stack.pop();
        state.insert(name.clone(), State::Done);
        Ok(())
    }

    let mut state = HashMap::new();
    let mut stack = Vec::new();
    for name in &alias_names {
        visit(name, &edges, &mut state, &mut stack, &module.name)?;
    }
    Ok(())
}

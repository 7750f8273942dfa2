//! Pure transformations over resolved type expressions: alias and newtype
//! expansion, type-parameter substitution, and monomorphic instantiation of
//! generic decls.
//!
//! Everything here is stateless given a [`DeclResolver`]; nothing mutates
//! the shared AST. Backends that need monomorphic clones collect them in a
//! [`MonomorphCache`], deduplicated by derived name.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use crate::ast::ast::{Decl1, DeclType, Ident, ScopedName, TypeExpr1, TypeRef};

/// Lookup of decls by scoped name. The loaded module set implements this;
/// checkers that run mid-resolution supply their own view.
pub trait DeclResolver {
    fn get_decl(&self, sn: &ScopedName) -> Option<&Decl1>;
}

impl<T: DeclResolver> DeclResolver for &T {
    fn get_decl(&self, sn: &ScopedName) -> Option<&Decl1> {
        (*self).get_decl(sn)
    }
}

/// Replace type parameters by their bound arguments, recursively.
pub fn substitute_type_params(
    bindings: &HashMap<Ident, TypeExpr1>,
    te: &TypeExpr1,
) -> TypeExpr1 {
    if let TypeRef::TypeParam(name) = &te.type_ref {
        if let Some(bound) = bindings.get(name) {
            return bound.clone();
        }
    }
    TypeExpr1 {
        type_ref: te.type_ref.clone(),
        parameters: te
            .parameters
            .iter()
            .map(|p| substitute_type_params(bindings, p))
            .collect(),
        loc: te.loc.clone(),
    }
}

fn bindings_for(decl: &Decl1, arguments: &[TypeExpr1]) -> HashMap<Ident, TypeExpr1> {
    decl.decl_type
        .type_params()
        .iter()
        .cloned()
        .zip(arguments.iter().cloned())
        .collect()
}

/// If the head of `te` is a type alias, substitute its right hand side,
/// iterating until the head is no longer an alias. Terminates because alias
/// cycles are rejected during resolution.
pub fn expand_type_aliases(resolver: &impl DeclResolver, te: &TypeExpr1) -> TypeExpr1 {
    let mut current = te.clone();
    loop {
        let TypeRef::ScopedName(sn) = &current.type_ref else {
            return current;
        };
        let Some(decl) = resolver.get_decl(sn) else {
            return current;
        };
        let DeclType::Type(alias) = &decl.decl_type else {
            return current;
        };
        let bindings = bindings_for(decl, &current.parameters);
        current = substitute_type_params(&bindings, &alias.type_expr);
    }
}

/// As [`expand_type_aliases`], but unwrapping newtypes to their underlying
/// representation. Newtype reference chains may legitimately be cyclic, so
/// expansion stops if it revisits a decl.
pub fn expand_new_types(resolver: &impl DeclResolver, te: &TypeExpr1) -> TypeExpr1 {
    let mut seen: HashSet<ScopedName> = HashSet::new();
    let mut current = te.clone();
    loop {
        let TypeRef::ScopedName(sn) = &current.type_ref else {
            return current;
        };
        let Some(decl) = resolver.get_decl(sn) else {
            return current;
        };
        let DeclType::Newtype(newtype) = &decl.decl_type else {
            return current;
        };
        if !seen.insert(sn.clone()) {
            return current;
        }
        let bindings = bindings_for(decl, &current.parameters);
        current = substitute_type_params(&bindings, &newtype.type_expr);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ExpandOptions {
    pub aliases: bool,
    pub newtypes: bool,
}

/// Expand aliases and/or newtypes through the whole expression, including
/// every parameter position.
pub fn expand_types(
    resolver: &impl DeclResolver,
    te: &TypeExpr1,
    options: ExpandOptions,
) -> TypeExpr1 {
    let mut current = te.clone();
    loop {
        let before = current.clone();
        if options.aliases {
            current = expand_type_aliases(resolver, &current);
        }
        if options.newtypes {
            current = expand_new_types(resolver, &current);
        }
        if current == before {
            break;
        }
    }
    current.parameters = current
        .parameters
        .iter()
        .map(|p| expand_types(resolver, p, options))
        .collect();
    current
}

/// Canonical rendering of a type expression, e.g. `Pair<Int32,Vector<String>>`.
pub fn type_expr_to_string(te: &TypeExpr1) -> String {
    let head = te.type_ref.to_string();
    if te.parameters.is_empty() {
        head
    } else {
        let params: Vec<String> = te.parameters.iter().map(type_expr_to_string).collect();
        format!("{}<{}>", head, params.join(","))
    }
}

/// The default derived name for a monomorphic instance:
/// `Pair<Int32,Int32>` becomes `Pair_Int32_Int32`.
pub fn monomorphic_name(decl_name: &str, arguments: &[TypeExpr1]) -> Ident {
    let mut name = decl_name.to_string();
    for arg in arguments {
        name.push('_');
        name.push_str(&flat_name(arg));
    }
    name
}

fn flat_name(te: &TypeExpr1) -> String {
    let head = match &te.type_ref {
        TypeRef::Primitive(p) => p.as_str().to_string(),
        TypeRef::TypeParam(id) => id.clone(),
        TypeRef::ScopedName(sn) => sn.name.clone(),
    };
    te.parameters
        .iter()
        .fold(head, |acc, p| format!("{}_{}", acc, flat_name(p)))
}

/// Produce a non-generic clone of the decl applied in `te`, with every type
/// parameter substituted by the corresponding argument and the name derived
/// by `name_fn`. Returns `None` when the head is not a decl reference.
pub fn monomorphic_decl(
    te: &TypeExpr1,
    resolver: &impl DeclResolver,
    name_fn: impl Fn(&str, &[TypeExpr1]) -> Ident,
) -> Option<Decl1> {
    let TypeRef::ScopedName(sn) = &te.type_ref else {
        return None;
    };
    let decl = resolver.get_decl(sn)?;
    let bindings = bindings_for(decl, &te.parameters);
    let subst = |inner: &TypeExpr1| substitute_type_params(&bindings, inner);

    let decl_type = match &decl.decl_type {
        DeclType::Struct(s) => DeclType::Struct(crate::ast::ast::Struct {
            type_params: Vec::new(),
            fields: s
                .fields
                .iter()
                .map(|f| {
                    let mut f = f.clone();
                    f.type_expr = subst(&f.type_expr);
                    f
                })
                .collect(),
        }),
        DeclType::Union(u) => DeclType::Union(crate::ast::ast::Union {
            type_params: Vec::new(),
            fields: u
                .fields
                .iter()
                .map(|f| {
                    let mut f = f.clone();
                    f.type_expr = subst(&f.type_expr);
                    f
                })
                .collect(),
        }),
        DeclType::Type(t) => DeclType::Type(crate::ast::ast::TypeDef {
            type_params: Vec::new(),
            type_expr: subst(&t.type_expr),
        }),
        DeclType::Newtype(n) => DeclType::Newtype(crate::ast::ast::NewType {
            type_params: Vec::new(),
            type_expr: subst(&n.type_expr),
            default: n.default.clone(),
        }),
    };

    Some(Decl1 {
        name: name_fn(&decl.name, &te.parameters),
        version: decl.version,
        decl_type,
        annotations: decl.annotations.clone(),
        loc: decl.loc.clone(),
    })
}

/// Memoised monomorphic instantiation, keyed by derived name so repeated
/// applications of the same decl are produced once.
#[derive(Default)]
pub struct MonomorphCache {
    decls: IndexMap<Ident, Decl1>,
}

impl MonomorphCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instantiate(
        &mut self,
        te: &TypeExpr1,
        resolver: &impl DeclResolver,
    ) -> Option<&Decl1> {
        let TypeRef::ScopedName(sn) = &te.type_ref else {
            return None;
        };
        let name = monomorphic_name(&sn.name, &te.parameters);
        if !self.decls.contains_key(&name) {
            let decl = monomorphic_decl(te, resolver, |n, args| monomorphic_name(n, args))?;
            self.decls.insert(name.clone(), decl);
        }
        self.decls.get(&name)
    }

    /// Instances in the order they were first requested.
    pub fn decls(&self) -> impl Iterator<Item = &Decl1> {
        self.decls.values()
    }
}

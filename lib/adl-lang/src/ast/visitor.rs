//! Read-only traversal over every type expression in a module.
//!
//! Cross-references between decls are names, not pointers, so a traversal
//! never recurses into other decls; it walks the syntactic tree of one
//! module and hands each head reference to the visitor.

use crate::ast::ast::{Decl, DeclType, Field, Module, TypeExpr};
use crate::ast::Loc;

pub trait TypeRefVisitor<R> {
    fn visit_type_ref(&mut self, type_ref: &R, loc: &Loc);
}

impl<R, F: FnMut(&R, &Loc)> TypeRefVisitor<R> for F {
    fn visit_type_ref(&mut self, type_ref: &R, loc: &Loc) {
        self(type_ref, loc)
    }
}

pub fn walk_module<R>(module: &Module<TypeExpr<R>>, v: &mut impl TypeRefVisitor<R>) {
    for decl in module.decls.values() {
        walk_decl(decl, v);
    }
}

pub fn walk_decl<R>(decl: &Decl<TypeExpr<R>>, v: &mut impl TypeRefVisitor<R>) {
    match &decl.decl_type {
        DeclType::Struct(s) => walk_fields(&s.fields, v),
        DeclType::Union(u) => walk_fields(&u.fields, v),
        DeclType::Type(t) => walk_type_expr(&t.type_expr, v),
        DeclType::Newtype(n) => walk_type_expr(&n.type_expr, v),
    }
}

pub fn walk_fields<R>(fields: &[Field<TypeExpr<R>>], v: &mut impl TypeRefVisitor<R>) {
    for field in fields {
        walk_type_expr(&field.type_expr, v);
    }
}

pub fn walk_type_expr<R>(te: &TypeExpr<R>, v: &mut impl TypeRefVisitor<R>) {
    v.visit_type_ref(&te.type_ref, &te.loc);
    for p in &te.parameters {
        walk_type_expr(p, v);
    }
}

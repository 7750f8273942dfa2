//! Integration tests: name resolution, kind checking and alias cycles.

mod common;

use common::{compile, decl, first_error, scoped};

use adl_lang::ast::ast::{DeclType, TypeRef};
use adl_lang::ast::primitive::Primitive;
use adl_lang::ast::visitor::{walk_module, walk_type_expr};
use adl_lang::error::CompileError;
use adl_lang::typeexpr::DeclResolver;

#[test]
fn local_references_become_fully_qualified() {
    let adl = compile(
        "module demo {
           struct Leaf {};
           struct Tree {
             Leaf left;
             demo.Leaf right;
           };
         }",
    )
    .unwrap();

    let tree = decl(&adl, "demo", "Tree");
    let DeclType::Struct(s) = &tree.decl_type else {
        panic!("expected a struct");
    };
    for field in &s.fields {
        assert_eq!(
            field.type_expr.type_ref,
            TypeRef::ScopedName(scoped("demo", "Leaf"))
        );
    }
}

#[test]
fn every_reference_is_canonical_and_saturated() {
    let adl = compile(
        "module demo {
           struct Pair<A, B> { A v1; B v2; };
           struct Node { Pair<Int32, Vector<String>> payload; Nullable<Node> next; };
         }",
    )
    .unwrap();

    for m in adl.modules.values() {
        walk_module(m, &mut |type_ref: &TypeRef, _loc: &adl_lang::ast::Loc| {
            if let TypeRef::ScopedName(sn) = type_ref {
                assert!(
                    !sn.module_name.is_empty(),
                    "unqualified reference survived resolution: {}",
                    sn
                );
                assert!(adl.get_decl(sn).is_some(), "dangling reference {}", sn);
            }
        });
    }

    // parameters saturate the head's arity at every node
    fn assert_saturated(adl: &adl_lang::passes::LoadedAdl, te: &adl_lang::ast::ast::TypeExpr1) {
        let expected = match &te.type_ref {
            TypeRef::Primitive(p) => p.arity(),
            TypeRef::TypeParam(_) => 0,
            TypeRef::ScopedName(sn) => adl.get_decl(sn).unwrap().arity(),
        };
        assert_eq!(te.parameters.len(), expected, "unsaturated {:?}", te.type_ref);
        for p in &te.parameters {
            assert_saturated(adl, p);
        }
    }
    let node = decl(&adl, "demo", "Node");
    let DeclType::Struct(s) = &node.decl_type else {
        panic!("expected a struct");
    };
    for field in &s.fields {
        assert_saturated(&adl, &field.type_expr);
    }
}

#[test]
fn mutually_recursive_structs_resolve() {
    let adl = compile(
        "module demo {
           struct Even { Nullable<Odd> next; };
           struct Odd { Nullable<Even> next; };
         }",
    )
    .unwrap();
    assert!(adl.get_decl(&scoped("demo", "Even")).is_some());
    assert!(adl.get_decl(&scoped("demo", "Odd")).is_some());
}

#[test]
fn primitives_beat_imports_but_not_type_params() {
    // a type parameter shadowing a primitive name binds tighter
    let adl = compile(
        "module demo {
           struct Odd<String> { String value; };
         }",
    )
    .unwrap();
    let odd = decl(&adl, "demo", "Odd");
    let DeclType::Struct(s) = &odd.decl_type else {
        panic!("expected a struct");
    };
    assert_eq!(
        s.fields[0].type_expr.type_ref,
        TypeRef::TypeParam("String".into())
    );
}

#[test]
fn stdlib_names_resolve_without_import() {
    let adl = compile(
        "module demo {
           struct S { Maybe<Int32> opt; };
         }",
    )
    .unwrap();
    let s = decl(&adl, "demo", "S");
    let DeclType::Struct(s) = &s.decl_type else {
        panic!("expected a struct");
    };
    assert_eq!(
        s.fields[0].type_expr.type_ref,
        TypeRef::ScopedName(scoped("sys.types", "Maybe"))
    );
}

#[test]
fn unknown_type_is_an_error() {
    let err = first_error("module demo { struct S { Missing x; }; }");
    match err {
        CompileError::UnknownType { name, .. } => assert_eq!(name, "Missing"),
        other => panic!("expected UnknownType, got {:?}", other),
    }
}

#[test]
fn arity_mismatch_on_primitives() {
    let err = first_error("module demo { struct S { Vector v; }; }");
    match err {
        CompileError::ArityMismatch { name, expected, got, .. } => {
            assert_eq!(name, "Vector");
            assert_eq!(expected, 1);
            assert_eq!(got, 0);
        }
        other => panic!("expected ArityMismatch, got {:?}", other),
    }
}

#[test]
fn arity_mismatch_on_generic_decls() {
    let err = first_error(
        "module demo {
           struct Pair<A, B> { A v1; B v2; };
           type Bad = Pair<Int32>;
         }",
    );
    match err {
        CompileError::ArityMismatch { expected, got, .. } => {
            assert_eq!(expected, 2);
            assert_eq!(got, 1);
        }
        other => panic!("expected ArityMismatch, got {:?}", other),
    }
}

#[test]
fn applying_parameters_to_a_type_param_fails() {
    let err = first_error("module demo { struct S<T> { T<Int32> x; }; }");
    assert!(matches!(err, CompileError::ArityMismatch { .. }), "got {:?}", err);
}

#[test]
fn duplicate_fields_rejected() {
    let err = first_error("module demo { struct S { Int32 a; String a; }; }");
    match err {
        CompileError::DuplicateField { decl, field, .. } => {
            assert_eq!(decl, "S");
            assert_eq!(field, "a");
        }
        other => panic!("expected DuplicateField, got {:?}", other),
    }
}

#[test]
fn duplicate_type_params_rejected() {
    let err = first_error("module demo { struct S<T, T> { T x; }; }");
    match err {
        CompileError::DuplicateTypeParam { decl, param, .. } => {
            assert_eq!(decl, "S");
            assert_eq!(param, "T");
        }
        other => panic!("expected DuplicateTypeParam, got {:?}", other),
    }
}

#[test]
fn two_alias_cycle_detected() {
    let err = first_error(
        "module demo {
           type A = B;
           type B = A;
         }",
    );
    match err {
        CompileError::TypeAliasCycle { cycle, .. } => {
            assert!(cycle.contains(&"A".to_string()));
            assert!(cycle.contains(&"B".to_string()));
        }
        other => panic!("expected TypeAliasCycle, got {:?}", other),
    }
}

#[test]
fn self_alias_cycle_detected() {
    let err = first_error("module demo { type A = A; }");
    assert!(matches!(err, CompileError::TypeAliasCycle { .. }), "got {:?}", err);
}

#[test]
fn alias_cycle_through_parameters_detected() {
    let err = first_error("module demo { type A = Vector<A>; }");
    assert!(matches!(err, CompileError::TypeAliasCycle { .. }), "got {:?}", err);
}

#[test]
fn alias_to_newtype_cycle_is_fine() {
    // newtypes are nominal; only alias-to-alias cycles are rejected
    let adl = compile(
        "module demo {
           newtype Wrapped = Vector<Wrapped>;
           type W = Wrapped;
         }",
    )
    .unwrap();
    assert!(adl.get_decl(&scoped("demo", "Wrapped")).is_some());
}

#[test]
fn free_type_variable_in_alias_rejected() {
    let err = first_error("module demo { type Bad = Vector<T>; }");
    match err {
        CompileError::UnknownType { name, .. } => assert_eq!(name, "T"),
        other => panic!("expected UnknownType, got {:?}", other),
    }
}

#[test]
fn unknown_annotation_key_rejected() {
    let err = first_error(
        "module demo {
           @NoSuchAnnotation true
           struct S {};
         }",
    );
    assert!(matches!(err, CompileError::UnknownType { .. }), "got {:?}", err);
}

#[test]
fn walk_type_expr_covers_every_node() {
    let adl = compile(
        "module demo {
           struct S { Vector<Nullable<Int32>> xs; };
         }",
    )
    .unwrap();
    let s = decl(&adl, "demo", "S");
    let DeclType::Struct(st) = &s.decl_type else {
        panic!("expected a struct");
    };
    let mut heads = Vec::new();
    walk_type_expr(&st.fields[0].type_expr, &mut |tr: &TypeRef, _: &adl_lang::ast::Loc| {
        heads.push(tr.clone());
    });
    assert_eq!(
        heads,
        vec![
            TypeRef::Primitive(Primitive::Vector),
            TypeRef::Primitive(Primitive::Nullable),
            TypeRef::Primitive(Primitive::Int32),
        ]
    );
}

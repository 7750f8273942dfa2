//! Integration tests: annotation attachment from source statements and
//! sidecar overlay files.

mod common;

use common::{compile, compile_tree, decl, first_error, scoped};

use adl_lang::ast::ast::{well_known, DeclType};
use adl_lang::backend::{doc_string, get_annotation, get_string_annotation};
use adl_lang::error::CompileError;
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn prefix_annotations_attach_and_resolve() {
    let adl = compile(
        r#"module demo {
             type Rank = Int32;

             @Rank 3
             struct Widget {
               @Rank 7
               String label;
             };
           }"#,
    )
    .unwrap();

    let widget = decl(&adl, "demo", "Widget");
    // the bare key resolved against the local decl table
    assert_eq!(
        get_annotation(&widget.annotations, &scoped("demo", "Rank")),
        Some(&json!(3))
    );
    let DeclType::Struct(s) = &widget.decl_type else {
        panic!("expected a struct");
    };
    assert_eq!(
        get_annotation(&s.fields[0].annotations, &scoped("demo", "Rank")),
        Some(&json!(7))
    );
}

#[test]
fn annotation_without_value_defaults_to_null() {
    let adl = compile(
        "module demo {
           type Hidden = Bool;

           @Hidden
           struct Secret {};
         }",
    )
    .unwrap();
    let secret = decl(&adl, "demo", "Secret");
    assert_eq!(
        get_annotation(&secret.annotations, &scoped("demo", "Hidden")),
        Some(&json!(null))
    );
}

#[test]
fn standalone_annotation_statements_attach_by_path() {
    let adl = compile(
        "module demo {
           type Level = Int32;

           struct Y {
             Word64 z;
           };

           annotation Level 6;
           annotation Y Level 7;
           annotation Y::z Level 8;
         }",
    )
    .unwrap();

    let m = common::module(&adl, "demo");
    let key = scoped("demo", "Level");
    assert_eq!(get_annotation(&m.annotations, &key), Some(&json!(6)));

    let y = decl(&adl, "demo", "Y");
    assert_eq!(get_annotation(&y.annotations, &key), Some(&json!(7)));
    let DeclType::Struct(s) = &y.decl_type else {
        panic!("expected a struct");
    };
    assert_eq!(get_annotation(&s.fields[0].annotations, &key), Some(&json!(8)));
}

#[test]
fn annotation_statement_with_unknown_target_fails() {
    let err = first_error(
        "module demo {
           type Level = Int32;
           struct Y { Word64 z; };
           annotation Y::missing Level 8;
         }",
    );
    assert_eq!(err.kind(), "AnnotationTargetError");

    let err = first_error(
        "module demo {
           type Level = Int32;
           annotation Nope Level 8;
         }",
    );
    assert_eq!(err.kind(), "AnnotationTargetError");
}

#[test]
fn module_prefix_annotations() {
    let adl = compile(
        r#"/// Top level docs.
           module demo {
             struct S {};
           }"#,
    )
    .unwrap();
    let m = common::module(&adl, "demo");
    assert_eq!(doc_string(&m.annotations), Some(" Top level docs."));
}

#[test]
fn sidecar_overlays_decl_annotations() {
    let adl = compile_tree(
        &["demo.adl"],
        &[
            ("demo.adl", "module demo { struct Person { String name; }; }"),
            (
                "demo.adl-java",
                r#"{ "Person": { "annotations": {
                     "adlc.config.java.JavaTable": {"tableName": "people"} } } }"#,
            ),
        ],
        &["adl-java"],
    )
    .unwrap();

    let person = decl(&adl, "demo", "Person");
    assert_eq!(
        get_annotation(
            &person.annotations,
            &scoped("adlc.config.java", "JavaTable")
        ),
        Some(&json!({"tableName": "people"}))
    );
    assert!(adl.warnings.is_empty());
}

#[test]
fn sidecar_overlays_field_annotations() {
    let adl = compile_tree(
        &["demo.adl"],
        &[
            ("demo.adl", "module demo { struct Person { String name; }; }"),
            (
                "demo.adl-java",
                r#"{ "Person": { "fields": { "name": { "annotations": {
                     "sys.annotations.SerializedName": "fullName" } } } } }"#,
            ),
        ],
        &["adl-java"],
    )
    .unwrap();

    let person = decl(&adl, "demo", "Person");
    let DeclType::Struct(s) = &person.decl_type else {
        panic!("expected a struct");
    };
    assert_eq!(
        get_string_annotation(&s.fields[0].annotations, &well_known::serialized_name()),
        Some("fullName")
    );
}

#[test]
fn later_sidecars_win() {
    let adl = compile_tree(
        &["demo.adl"],
        &[
            (
                "demo.adl",
                r#"module demo {
                     type Tag = String;
                     @Tag "from-source"
                     struct S {};
                   }"#,
            ),
            (
                "demo.adl-one",
                r#"{ "S": { "annotations": { "demo.Tag": "from-one" } } }"#,
            ),
            (
                "demo.adl-two",
                r#"{ "S": { "annotations": { "demo.Tag": "from-two" } } }"#,
            ),
        ],
        &["adl-one", "adl-two"],
    )
    .unwrap();

    let s = decl(&adl, "demo", "S");
    assert_eq!(
        get_string_annotation(&s.annotations, &scoped("demo", "Tag")),
        Some("from-two")
    );
}

#[test]
fn sidecar_unknown_names_warn_but_do_not_fail() {
    let adl = compile_tree(
        &["demo.adl"],
        &[
            ("demo.adl", "module demo { struct Person { String name; }; }"),
            (
                "demo.adl-java",
                r#"{ "Ghost": { "annotations": { "a.B": 1 } },
                     "Person": { "fields": { "ghost": { "annotations": { "a.B": 1 } } } } }"#,
            ),
        ],
        &["adl-java"],
    )
    .unwrap();

    assert_eq!(adl.warnings.len(), 2);
    assert!(adl.warnings[0].message.contains("Ghost"));
    assert!(adl.warnings[1].message.contains("ghost"));
}

#[test]
fn malformed_sidecar_is_a_hard_error() {
    let err = compile_tree(
        &["demo.adl"],
        &[
            ("demo.adl", "module demo { struct Person {}; }"),
            ("demo.adl-java", r#"["not", "an", "object"]"#),
        ],
        &["adl-java"],
    )
    .unwrap_err();
    assert!(matches!(err, CompileError::AnnotationShape { .. }), "got {:?}", err);
    assert_eq!(err.kind(), "AnnotationShapeError");
}

#[test]
fn sidecar_annotations_visible_during_resolution() {
    // the overlay happens before the resolver runs, so resolved output
    // carries the merged keys verbatim
    let adl = compile_tree(
        &["demo.adl"],
        &[
            ("demo.adl", "module demo { struct Person {}; }"),
            (
                "demo.adl-java",
                r#"{ "Person": { "annotations": { "x.y.Z": true } } }"#,
            ),
        ],
        &["adl-java"],
    )
    .unwrap();
    let person = decl(&adl, "demo", "Person");
    assert_eq!(
        get_annotation(&person.annotations, &scoped("x.y", "Z")),
        Some(&json!(true))
    );
}

#[test]
fn doc_annotation_key_is_fully_qualified() {
    let adl = compile(
        "module demo {
           /// Documented.
           struct S {};
         }",
    )
    .unwrap();
    let s = decl(&adl, "demo", "S");
    assert_eq!(
        get_string_annotation(&s.annotations, &scoped("sys.annotations", "Doc")),
        Some(" Documented.")
    );
}

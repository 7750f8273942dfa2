//! Integration tests: the output file writer and its manifest.

mod common;

use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};
use tempfile::TempDir;

use adl_lang::backend::astgen::AstGen;
use adl_lang::backend::CodeGen;
use adl_lang::writer::FileWriter;

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[test]
fn writes_create_parent_directories() {
    let temp = TempDir::new().unwrap();
    let mut writer = FileWriter::new(temp.path());
    writer
        .write(Path::new("org/example/ids.json"), b"{}\n")
        .unwrap();
    assert_eq!(
        fs::read(temp.path().join("org/example/ids.json")).unwrap(),
        b"{}\n"
    );
}

#[test]
fn no_overwrite_skips_identical_content() {
    let temp = TempDir::new().unwrap();

    let mut writer = FileWriter::new(temp.path()).with_no_overwrite(true);
    assert!(writer.write(Path::new("out.txt"), b"payload").unwrap());
    // identical content: skipped
    assert!(!writer.write(Path::new("out.txt"), b"payload").unwrap());
    // changed content: rewritten
    assert!(writer.write(Path::new("out.txt"), b"payload2").unwrap());

    // without the flag every write lands
    let mut writer = FileWriter::new(temp.path());
    assert!(writer.write(Path::new("out.txt"), b"payload2").unwrap());
}

#[test]
fn manifest_records_every_write_with_its_digest() {
    let temp = TempDir::new().unwrap();
    let manifest_path = temp.path().join("manifest.txt");

    let mut writer =
        FileWriter::new(temp.path().join("out")).with_manifest(Some(manifest_path.clone()));
    writer.write(Path::new("a.json"), b"alpha\n").unwrap();
    writer.write(Path::new("sub/b.json"), b"beta\n").unwrap();
    writer.close().unwrap();

    let manifest = fs::read_to_string(&manifest_path).unwrap();
    let lines: Vec<&str> = manifest.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], format!("a.json {}", sha256_hex(b"alpha\n")));
    assert_eq!(lines[1], format!("sub/b.json {}", sha256_hex(b"beta\n")));
}

#[test]
fn skipped_writes_still_appear_in_the_manifest() {
    let temp = TempDir::new().unwrap();

    let mut writer = FileWriter::new(temp.path()).with_no_overwrite(true);
    writer.write(Path::new("x.txt"), b"same").unwrap();
    writer.write(Path::new("x.txt"), b"same").unwrap();
    assert_eq!(writer.manifest().len(), 2);
}

#[test]
fn no_temp_files_left_behind() {
    let temp = TempDir::new().unwrap();
    let mut writer = FileWriter::new(temp.path());
    writer.write(Path::new("a/b.txt"), b"x").unwrap();

    let mut names = Vec::new();
    for entry in fs::read_dir(temp.path().join("a")).unwrap() {
        names.push(entry.unwrap().file_name().into_string().unwrap());
    }
    assert_eq!(names, vec!["b.txt"]);
}

#[test]
fn repeated_generation_is_idempotent_under_no_overwrite() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("out");

    let adl = common::compile(
        "module demo {
           struct Person { String name; Int32 age = 21; };
         }",
    )
    .unwrap();

    let mut writer = FileWriter::new(&out).with_no_overwrite(true);
    AstGen.generate(&adl, &mut writer).unwrap();
    let first_mtime = fs::metadata(out.join("demo.json")).unwrap().modified().unwrap();

    let mut writer = FileWriter::new(&out).with_no_overwrite(true);
    AstGen.generate(&adl, &mut writer).unwrap();
    let second_mtime = fs::metadata(out.join("demo.json")).unwrap().modified().unwrap();

    assert_eq!(first_mtime, second_mtime);
}

#[test]
fn astgen_emits_one_file_per_user_module() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("out");

    let adl = common::compile_tree(
        &["a.adl"],
        &[
            ("a.adl", "module a { import b.*; struct A { B b; }; }"),
            ("b.adl", "module b { struct B {}; }"),
        ],
        &[],
    )
    .unwrap();

    let mut writer = FileWriter::new(&out);
    AstGen.generate(&adl, &mut writer).unwrap();

    assert!(out.join("b.json").is_file());
    assert!(out.join("a.json").is_file());
    // builtins are not emitted
    assert!(!out.join("sys.types.json").exists());

    // the dump is valid JSON carrying the resolved decl
    let parsed: serde_json::Value =
        serde_json::from_slice(&fs::read(out.join("a.json")).unwrap()).unwrap();
    assert_eq!(parsed["name"], "a");
    assert!(parsed["decls"]["A"].is_object());
}

//! Annotation attachment: standalone `annotation` statements from the
//! source file, and JSON sidecar files merged over a parsed module.

use std::path::Path;

use serde_json::Value;

use crate::ast::ast::{DeclType, Module0, ScopedName};
use crate::error::{CompileError, Result, Warning};
use crate::parser::grammar::{ExplicitAnnotation, ExplicitAnnotationRef};

/// Attach standalone `annotation` statements to their module, decl or
/// field. A target that does not exist in the module is a hard error.
pub fn apply_explicit_annotations(
    module: &mut Module0,
    explicit: Vec<ExplicitAnnotation>,
) -> Result<()> {
    for ann in explicit {
        let target = match &ann.refr {
            ExplicitAnnotationRef::Module => Some(&mut module.annotations),
            ExplicitAnnotationRef::Decl(decl_name) => module
                .decls
                .get_mut(decl_name)
                .map(|decl| &mut decl.annotations),
            ExplicitAnnotationRef::Field(decl_name, field_name) => {
                module.decls.get_mut(decl_name).and_then(|decl| {
                    let fields = match &mut decl.decl_type {
                        DeclType::Struct(s) => &mut s.fields,
                        DeclType::Union(u) => &mut u.fields,
                        _ => return None,
                    };
                    fields
                        .iter_mut()
                        .find(|f| f.name == *field_name)
                        .map(|f| &mut f.annotations)
                })
            }
        };
        match target {
            Some(annotations) => annotations.set(ann.key, ann.value),
            None => {
                return Err(CompileError::AnnotationTarget {
                    target: ann.refr.to_string(),
                    loc: ann.loc,
                });
            }
        }
    }
    Ok(())
}

/// Overlay a sidecar file onto the module it accompanies.
///
/// The sidecar is a JSON object keyed by decl name:
///
/// ```json
/// { "Person": { "annotations": { "adlc.config.java.JavaTable": {...} },
///               "fields": { "name": { "annotations": { ... } } } } }
/// ```
///
/// Entries naming unknown decls or fields accumulate warnings; a sidecar
/// whose overall shape is wrong is a hard error. Between the primary source
/// and successive sidecars the last writer wins.
pub fn merge_sidecar(
    module: &mut Module0,
    sidecar_path: &Path,
    text: &str,
    warnings: &mut Vec<Warning>,
) -> Result<()> {
    let shape_error = |message: String| CompileError::AnnotationShape {
        path: sidecar_path.to_path_buf(),
        message,
    };

    let root: Value = serde_json::from_str(text).map_err(|e| shape_error(e.to_string()))?;
    let root = root
        .as_object()
        .ok_or_else(|| shape_error("top level must be an object keyed by decl name".into()))?;

    for (decl_name, entry) in root {
        let entry = entry
            .as_object()
            .ok_or_else(|| shape_error(format!("entry for '{}' must be an object", decl_name)))?;

        let Some(decl) = module.decls.get_mut(decl_name) else {
            warnings.push(Warning::new(format!(
                "{}: annotations for unknown decl '{}' in module {} ignored",
                sidecar_path.display(),
                decl_name,
                module.name
            )));
            continue;
        };

        if let Some(anns) = entry.get("annotations") {
            let anns = annotation_object(anns, sidecar_path, decl_name)?;
            for (key, value) in anns {
                decl.annotations.set(key, value);
            }
        }

        let Some(fields) = entry.get("fields") else {
            continue;
        };
        let fields = fields.as_object().ok_or_else(|| {
            shape_error(format!("'fields' for '{}' must be an object", decl_name))
        })?;

        for (field_name, field_entry) in fields {
            let field_entry = field_entry.as_object().ok_or_else(|| {
                shape_error(format!(
                    "field entry '{}.{}' must be an object",
                    decl_name, field_name
                ))
            })?;

            let decl_fields = match &mut decl.decl_type {
                DeclType::Struct(s) => &mut s.fields,
                DeclType::Union(u) => &mut u.fields,
                _ => {
                    warnings.push(Warning::new(format!(
                        "{}: decl '{}' has no fields; '{}' ignored",
                        sidecar_path.display(),
                        decl_name,
                        field_name
                    )));
                    continue;
                }
            };
            let Some(field) = decl_fields.iter_mut().find(|f| f.name == *field_name) else {
                warnings.push(Warning::new(format!(
                    "{}: annotations for unknown field '{}.{}' ignored",
                    sidecar_path.display(),
                    decl_name,
                    field_name
                )));
                continue;
            };

            if let Some(anns) = field_entry.get("annotations") {
                let anns = annotation_object(anns, sidecar_path, decl_name)?;
                for (key, value) in anns {
                    field.annotations.set(key, value);
                }
            }
        }
    }

    Ok(())
}

fn annotation_object(
    value: &Value,
    sidecar_path: &Path,
    decl_name: &str,
) -> Result<Vec<(ScopedName, Value)>> {
    let shape_error = |message: String| CompileError::AnnotationShape {
        path: sidecar_path.to_path_buf(),
        message,
    };

    let object = value.as_object().ok_or_else(|| {
        shape_error(format!("'annotations' for '{}' must be an object", decl_name))
    })?;

    let mut out = Vec::with_capacity(object.len());
    for (key, value) in object {
        let key = ScopedName::parse(key)
            .ok_or_else(|| shape_error(format!("invalid annotation name '{}'", key)))?;
        out.push((key, value.clone()));
    }
    Ok(out)
}

//! Default-value checking: every literal supplied with `= ...` must conform
//! to its field's declared type, after alias expansion.

use std::collections::HashMap;

use base64::Engine;
use indexmap::IndexMap;
use serde_json::Value;

use crate::ast::ast::{
    Decl1, DeclType, Field1, Module1, ModuleName, ScopedName, TypeExpr1, TypeRef,
};
use crate::ast::primitive::Primitive;
use crate::ast::Loc;
use crate::error::{CompileError, Result};
use crate::typeexpr::{expand_type_aliases, substitute_type_params, DeclResolver};

/// Check every default literal in a freshly resolved module. The module's
/// dependencies must already be present in `modules`.
pub fn check_module_defaults(
    module: &Module1,
    modules: &IndexMap<ModuleName, Module1>,
) -> Result<()> {
    let checker = DefaultChecker { module, modules };

    for decl in module.decls.values() {
        match &decl.decl_type {
            DeclType::Struct(s) => checker.check_fields(&decl.name, &s.fields)?,
            DeclType::Union(u) => checker.check_fields(&decl.name, &u.fields)?,
            DeclType::Newtype(n) => {
                if let Some(value) = &n.default {
                    checker.check(
                        &n.type_expr,
                        value,
                        &mut vec![decl.name.clone()],
                        &decl.loc,
                    )?;
                }
            }
            DeclType::Type(_) => {}
        }
    }
    Ok(())
}

struct DefaultChecker<'a> {
    module: &'a Module1,
    modules: &'a IndexMap<ModuleName, Module1>,
}

impl DeclResolver for DefaultChecker<'_> {
    fn get_decl(&self, sn: &ScopedName) -> Option<&Decl1> {
        if sn.module_name == self.module.name {
            self.module.decls.get(&sn.name)
        } else {
            self.modules.get(&sn.module_name)?.decls.get(&sn.name)
        }
    }
}

impl DefaultChecker<'_> {
    fn check_fields(&self, decl_name: &str, fields: &[Field1]) -> Result<()> {
        for field in fields {
            if let Some(value) = &field.default {
                let mut path = vec![decl_name.to_string(), field.name.clone()];
                self.check(&field.type_expr, value, &mut path, &field.loc)?;
            }
        }
        Ok(())
    }

    fn mismatch(
        &self,
        path: &[String],
        expected: impl Into<String>,
        got: &Value,
        loc: &Loc,
    ) -> CompileError {
        CompileError::DefaultValueMismatch {
            path: path.join("."),
            expected: expected.into(),
            got: json_kind(got).to_string(),
            loc: loc.clone(),
        }
    }

    fn check(
        &self,
        te: &TypeExpr1,
        value: &Value,
        path: &mut Vec<String>,
        loc: &Loc,
    ) -> Result<()> {
        let te = expand_type_aliases(&self, te);
        match &te.type_ref {
            TypeRef::Primitive(p) => self.check_primitive(*p, &te.parameters, value, path, loc),
            // a still-generic field; checked after monomorphisation
            TypeRef::TypeParam(_) => Ok(()),
            TypeRef::ScopedName(sn) => {
                let decl = self.get_decl(sn).ok_or_else(|| {
                    self.mismatch(path, format!("known decl {}", sn), value, loc)
                })?;
                let bindings: HashMap<_, _> = decl
                    .decl_type
                    .type_params()
                    .iter()
                    .cloned()
                    .zip(te.parameters.iter().cloned())
                    .collect();
                match &decl.decl_type {
                    DeclType::Struct(s) => {
                        self.check_struct(sn, &s.fields, &bindings, value, path, loc)
                    }
                    DeclType::Union(u) => {
                        self.check_union(sn, &u.fields, &bindings, value, path, loc)
                    }
                    DeclType::Newtype(n) => {
                        let underlying = substitute_type_params(&bindings, &n.type_expr);
                        self.check(&underlying, value, path, loc)
                    }
                    DeclType::Type(t) => {
                        let aliased = substitute_type_params(&bindings, &t.type_expr);
                        self.check(&aliased, value, path, loc)
                    }
                }
            }
        }
    }

    fn check_primitive(
        &self,
        p: Primitive,
        parameters: &[TypeExpr1],
        value: &Value,
        path: &mut Vec<String>,
        loc: &Loc,
    ) -> Result<()> {
        match p {
            Primitive::Void => match value {
                Value::Null => Ok(()),
                _ => Err(self.mismatch(path, "null", value, loc)),
            },
            Primitive::Bool => match value {
                Value::Bool(_) => Ok(()),
                _ => Err(self.mismatch(path, "Bool", value, loc)),
            },
            Primitive::String => match value {
                Value::String(_) => Ok(()),
                _ => Err(self.mismatch(path, "String", value, loc)),
            },
            Primitive::Float | Primitive::Double => match value {
                Value::Number(_) => Ok(()),
                _ => Err(self.mismatch(path, p.as_str(), value, loc)),
            },
            Primitive::Int8
            | Primitive::Int16
            | Primitive::Int32
            | Primitive::Int64
            | Primitive::Word8
            | Primitive::Word16
            | Primitive::Word32
            | Primitive::Word64 => {
                let n = value
                    .as_i64()
                    .map(i128::from)
                    .or_else(|| value.as_u64().map(i128::from))
                    .ok_or_else(|| self.mismatch(path, p.as_str(), value, loc))?;
                let (min, max) = p.integer_bounds().expect("integral primitive has bounds");
                if n < min || n > max {
                    return Err(self.mismatch(path, format!("{} in [{}, {}]", p, min, max), value, loc));
                }
                Ok(())
            }
            Primitive::Bytes => {
                let s = value
                    .as_str()
                    .ok_or_else(|| self.mismatch(path, "base64 string", value, loc))?;
                base64::engine::general_purpose::STANDARD
                    .decode(s)
                    .map_err(|_| self.mismatch(path, "base64 string", value, loc))?;
                Ok(())
            }
            Primitive::Json => Ok(()),
            Primitive::TypeToken => {
                Err(self.mismatch(path, "TypeToken (no default value supported)", value, loc))
            }
            Primitive::Vector => {
                let items = value
                    .as_array()
                    .ok_or_else(|| self.mismatch(path, "array", value, loc))?;
                for (i, item) in items.iter().enumerate() {
                    path.push(i.to_string());
                    self.check(&parameters[0], item, path, loc)?;
                    path.pop();
                }
                Ok(())
            }
            Primitive::StringMap => {
                let entries = value
                    .as_object()
                    .ok_or_else(|| self.mismatch(path, "object", value, loc))?;
                for (key, item) in entries {
                    path.push(key.clone());
                    self.check(&parameters[0], item, path, loc)?;
                    path.pop();
                }
                Ok(())
            }
            Primitive::Nullable => match value {
                Value::Null => Ok(()),
                _ => self.check(&parameters[0], value, path, loc),
            },
        }
    }

    fn check_struct(
        &self,
        sn: &ScopedName,
        fields: &[Field1],
        bindings: &HashMap<String, TypeExpr1>,
        value: &Value,
        path: &mut Vec<String>,
        loc: &Loc,
    ) -> Result<()> {
        let object = value
            .as_object()
            .ok_or_else(|| self.mismatch(path, format!("{} object", sn), value, loc))?;

        for key in object.keys() {
            if !fields.iter().any(|f| f.name == *key) {
                return Err(self.mismatch(
                    path,
                    format!("a field of {}", sn),
                    &Value::String(key.clone()),
                    loc,
                ));
            }
        }

        for field in fields {
            match object.get(&field.name) {
                Some(item) => {
                    let field_te = substitute_type_params(bindings, &field.type_expr);
                    path.push(field.name.clone());
                    self.check(&field_te, item, path, loc)?;
                    path.pop();
                }
                None => {
                    if field.default.is_none() {
                        path.push(field.name.clone());
                        let err = self.mismatch(path, "a value (field has no default)", value, loc);
                        path.pop();
                        return Err(err);
                    }
                }
            }
        }
        Ok(())
    }

    /// A union default is either `{"branch": value}`, or for `Void` arms the
    /// shorthand `"branch"` (and `{"branch": null}`).
    fn check_union(
        &self,
        sn: &ScopedName,
        fields: &[Field1],
        bindings: &HashMap<String, TypeExpr1>,
        value: &Value,
        path: &mut Vec<String>,
        loc: &Loc,
    ) -> Result<()> {
        let (branch, item) = match value {
            Value::String(branch) => (branch, None),
            Value::Object(object) if object.len() == 1 => {
                let (branch, item) = object.iter().next().expect("single entry");
                (branch, Some(item))
            }
            _ => {
                return Err(self.mismatch(
                    path,
                    format!("single-key object or void field name of {}", sn),
                    value,
                    loc,
                ));
            }
        };

        let field = fields.iter().find(|f| f.name == *branch).ok_or_else(|| {
            self.mismatch(
                path,
                format!("a field of {}", sn),
                &Value::String(branch.clone()),
                loc,
            )
        })?;

        let field_te = substitute_type_params(bindings, &field.type_expr);
        let is_void = matches!(
            expand_type_aliases(&self, &field_te).type_ref,
            TypeRef::Primitive(Primitive::Void)
        );

        match item {
            None => {
                if is_void {
                    Ok(())
                } else {
                    path.push(branch.clone());
                    let err = self.mismatch(path, "a value for the union branch", value, loc);
                    path.pop();
                    Err(err)
                }
            }
            Some(item) => {
                path.push(branch.clone());
                self.check(&field_te, item, path, loc)?;
                path.pop();
                Ok(())
            }
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "double",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

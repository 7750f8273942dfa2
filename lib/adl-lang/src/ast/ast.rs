//! The core ADL data model.
//!
//! The AST exists in two stages, distinguished by the reference
//! representation carried inside type expressions:
//!
//! - `TypeExpr0` references are raw `ScopedName`s straight from the parser;
//!   an empty module name marks a bare identifier still to be resolved.
//! - `TypeExpr1` references are canonical `TypeRef`s: a primitive, a type
//!   parameter of the enclosing decl, or a fully qualified scoped name.
//!
//! Everything between `Module` and `Field` is generic over the stage so the
//! resolver can rebuild the tree without duplicating the shape.

use std::fmt;
use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ast::primitive::Primitive;
use crate::ast::Loc;

pub type Ident = String;

pub fn is_valid_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A dotted module name, e.g. `foo.bar.baz`.
///
/// The empty name is only used on unresolved scoped names to mark a bare
/// identifier; it never survives resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ModuleName(pub Vec<Ident>);

impl ModuleName {
    pub fn new(parts: Vec<Ident>) -> Self {
        ModuleName(parts)
    }

    pub fn empty() -> Self {
        ModuleName(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn parse(s: &str) -> Option<ModuleName> {
        if s.is_empty() {
            return Some(ModuleName::empty());
        }
        let parts: Vec<Ident> = s.split('.').map(str::to_string).collect();
        if parts.iter().all(|p| is_valid_ident(p)) {
            Some(ModuleName(parts))
        } else {
            None
        }
    }

    /// Filesystem path for the module relative to a search directory:
    /// `foo.bar.baz` maps to `foo/bar/baz.adl`.
    pub fn to_rel_path(&self) -> PathBuf {
        let mut path: PathBuf = self.0.iter().collect();
        path.set_extension("adl");
        path
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

impl From<ModuleName> for String {
    fn from(m: ModuleName) -> String {
        m.to_string()
    }
}

impl TryFrom<String> for ModuleName {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        ModuleName::parse(&s).ok_or_else(|| format!("invalid module name '{}'", s))
    }
}

/// Globally unique identity of a declaration: module plus local name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ScopedName {
    pub module_name: ModuleName,
    pub name: Ident,
}

impl ScopedName {
    pub fn new(module_name: ModuleName, name: impl Into<Ident>) -> Self {
        ScopedName {
            module_name,
            name: name.into(),
        }
    }

    pub fn parse(s: &str) -> Option<ScopedName> {
        let (module, name) = match s.rsplit_once('.') {
            Some((m, n)) => (ModuleName::parse(m)?, n),
            None => (ModuleName::empty(), s),
        };
        if is_valid_ident(name) {
            Some(ScopedName::new(module, name))
        } else {
            None
        }
    }
}

impl fmt::Display for ScopedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.module_name.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}.{}", self.module_name, self.name)
        }
    }
}

impl From<ScopedName> for String {
    fn from(sn: ScopedName) -> String {
        sn.to_string()
    }
}

impl TryFrom<String> for ScopedName {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        ScopedName::parse(&s).ok_or_else(|| format!("invalid scoped name '{}'", s))
    }
}

/// The canonical head of a resolved type expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TypeRef {
    Primitive(Primitive),
    TypeParam(Ident),
    #[serde(rename = "reference")]
    ScopedName(ScopedName),
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Primitive(p) => f.write_str(p.as_str()),
            TypeRef::TypeParam(id) => f.write_str(id),
            TypeRef::ScopedName(sn) => write!(f, "{}", sn),
        }
    }
}

/// A type expression: a head reference applied to saturated parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeExpr<R> {
    pub type_ref: R,
    pub parameters: Vec<TypeExpr<R>>,
    #[serde(skip, default)]
    pub loc: Loc,
}

impl<R> TypeExpr<R> {
    pub fn new(type_ref: R, parameters: Vec<TypeExpr<R>>) -> Self {
        TypeExpr {
            type_ref,
            parameters,
            loc: Loc::generated(),
        }
    }

    pub fn with_loc(type_ref: R, parameters: Vec<TypeExpr<R>>, loc: Loc) -> Self {
        TypeExpr {
            type_ref,
            parameters,
            loc,
        }
    }
}

pub type TypeExpr0 = TypeExpr<ScopedName>;
pub type TypeExpr1 = TypeExpr<TypeRef>;

/// Annotations attached to a module, decl or field: annotation type to
/// JSON payload, keys unique, insertion order preserved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Annotations(pub IndexMap<ScopedName, Value>);

impl Annotations {
    pub fn get(&self, key: &ScopedName) -> Option<&Value> {
        self.0.get(key)
    }

    /// Insert or overwrite; the last writer wins.
    pub fn set(&mut self, key: ScopedName, value: Value) {
        self.0.insert(key, value);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field<TE> {
    pub name: Ident,
    pub type_expr: TE,
    pub default: Option<Value>,
    pub annotations: Annotations,
    #[serde(skip, default)]
    pub loc: Loc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Struct<TE> {
    pub type_params: Vec<Ident>,
    pub fields: Vec<Field<TE>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Union<TE> {
    pub type_params: Vec<Ident>,
    pub fields: Vec<Field<TE>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDef<TE> {
    pub type_params: Vec<Ident>,
    pub type_expr: TE,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewType<TE> {
    pub type_params: Vec<Ident>,
    pub type_expr: TE,
    pub default: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeclType<TE> {
    #[serde(rename = "struct_")]
    Struct(Struct<TE>),
    #[serde(rename = "union_")]
    Union(Union<TE>),
    #[serde(rename = "type_")]
    Type(TypeDef<TE>),
    #[serde(rename = "newtype_")]
    Newtype(NewType<TE>),
}

impl<TE> DeclType<TE> {
    pub fn type_params(&self) -> &[Ident] {
        match self {
            DeclType::Struct(s) => &s.type_params,
            DeclType::Union(u) => &u.type_params,
            DeclType::Type(t) => &t.type_params,
            DeclType::Newtype(n) => &n.type_params,
        }
    }

    pub fn fields(&self) -> &[Field<TE>] {
        match self {
            DeclType::Struct(s) => &s.fields,
            DeclType::Union(u) => &u.fields,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decl<TE> {
    pub name: Ident,
    pub version: Option<u32>,
    pub decl_type: DeclType<TE>,
    pub annotations: Annotations,
    #[serde(skip, default)]
    pub loc: Loc,
}

impl<TE> Decl<TE> {
    /// Number of type arguments an application of this decl must supply.
    pub fn arity(&self) -> usize {
        self.decl_type.type_params().len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImportKind {
    /// `import foo.bar.*;` - every decl of the module.
    #[serde(rename = "moduleName")]
    Module(ModuleName),
    /// `import foo.bar.Baz;` - a single decl.
    #[serde(rename = "scopedName")]
    Scoped(ScopedName),
}

impl ImportKind {
    pub fn module_name(&self) -> &ModuleName {
        match self {
            ImportKind::Module(m) => m,
            ImportKind::Scoped(sn) => &sn.module_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Import {
    pub kind: ImportKind,
    #[serde(skip, default)]
    pub loc: Loc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module<TE> {
    pub name: ModuleName,
    pub imports: Vec<Import>,
    pub decls: IndexMap<Ident, Decl<TE>>,
    pub annotations: Annotations,
}

pub type Module0 = Module<TypeExpr0>;
pub type Module1 = Module<TypeExpr1>;
pub type Decl0 = Decl<TypeExpr0>;
pub type Decl1 = Decl<TypeExpr1>;
pub type Field1 = Field<TypeExpr1>;

/// Well-known annotation names from the embedded standard library.
pub mod well_known {
    use super::{ModuleName, ScopedName};

    pub fn sys_annotations() -> ModuleName {
        ModuleName::new(vec!["sys".into(), "annotations".into()])
    }

    /// `sys.annotations.Doc`, the target of `///` doc comment sugar.
    pub fn doc() -> ScopedName {
        ScopedName::new(sys_annotations(), "Doc")
    }

    pub fn serialized_name() -> ScopedName {
        ScopedName::new(sys_annotations(), "SerializedName")
    }
}

//! Error types and diagnostic rendering.
//!
//! The compiler never recovers from a semantic error: the first failure is
//! raised as a [`CompileError`] and unwound to the driver, which renders it
//! through the [`SourceMap`] as a single `<file>:<line>:<col>: <kind>:
//! <message>` line. Sidecar problems that should not halt compilation are
//! accumulated as [`Warning`]s instead.

use std::path::PathBuf;

use thiserror::Error;

use crate::ast::ast::{Ident, ModuleName};
use crate::ast::{Loc, SourceId};

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("file not found: {}", .path.display())]
    FileNotFound { path: PathBuf },

    #[error("{expected}{}", render_found(.found))]
    Parse {
        expected: String,
        found: Option<String>,
        loc: Loc,
    },

    #[error("module {name} not found (searched {})", render_searched(.searched))]
    ModuleNotFound {
        name: ModuleName,
        searched: Vec<PathBuf>,
    },

    #[error("cyclic imports: {}", .cycle.iter().map(|m| m.to_string()).collect::<Vec<_>>().join(" -> "))]
    ImportCycle { cycle: Vec<ModuleName> },

    #[error("file {} declares module '{declared}', expected '{expected}'", .path.display())]
    ModuleNameMismatch {
        path: PathBuf,
        declared: ModuleName,
        expected: ModuleName,
    },

    #[error("duplicate definition of '{name}'")]
    DuplicateDecl { name: Ident, loc: Loc },

    #[error("duplicate field '{field}' in '{decl}'")]
    DuplicateField { decl: Ident, field: Ident, loc: Loc },

    #[error("duplicate type parameter '{param}' in '{decl}'")]
    DuplicateTypeParam { decl: Ident, param: Ident, loc: Loc },

    #[error("annotation target '{target}' not found")]
    AnnotationTarget { target: String, loc: Loc },

    #[error("cannot import '{name}': {reason}")]
    UnknownImport {
        name: String,
        reason: &'static str,
        loc: Loc,
    },

    #[error("unknown type '{name}'")]
    UnknownType { name: String, loc: Loc },

    #[error("'{name}' expects {expected} type parameter(s), got {got}")]
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
        loc: Loc,
    },

    #[error("cyclic type aliases in module {module}: {}", .cycle.join(" -> "))]
    TypeAliasCycle { module: ModuleName, cycle: Vec<Ident> },

    #[error("invalid default value at {path}: expected {expected}, got {got}")]
    DefaultValueMismatch {
        path: String,
        expected: String,
        got: String,
        loc: Loc,
    },

    #[error("malformed annotation sidecar {}: {message}", .path.display())]
    AnnotationShape { path: PathBuf, message: String },

    #[error("emit failed: {message}")]
    Emit { message: String },

    #[error("io error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CompileError {
    /// Stable kind tag used in rendered diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            CompileError::FileNotFound { .. } => "FileNotFound",
            CompileError::Parse { .. } => "ParseError",
            CompileError::ModuleNotFound { .. } => "ModuleNotFound",
            CompileError::ImportCycle { .. } => "ImportCycle",
            CompileError::ModuleNameMismatch { .. } => "ModuleNotFound",
            CompileError::DuplicateDecl { .. } => "DuplicateDecl",
            CompileError::DuplicateField { .. } => "DuplicateField",
            CompileError::DuplicateTypeParam { .. } => "DuplicateTypeParam",
            CompileError::AnnotationTarget { .. } => "AnnotationTargetError",
            CompileError::UnknownImport { .. } => "UnknownImport",
            CompileError::UnknownType { .. } => "UnknownType",
            CompileError::ArityMismatch { .. } => "ArityMismatch",
            CompileError::TypeAliasCycle { .. } => "TypeAliasCycle",
            CompileError::DefaultValueMismatch { .. } => "DefaultValueMismatch",
            CompileError::AnnotationShape { .. } => "AnnotationShapeError",
            CompileError::Emit { .. } => "EmitError",
            CompileError::Io { .. } => "IOError",
        }
    }

    pub fn loc(&self) -> Option<&Loc> {
        match self {
            CompileError::Parse { loc, .. }
            | CompileError::DuplicateDecl { loc, .. }
            | CompileError::DuplicateField { loc, .. }
            | CompileError::DuplicateTypeParam { loc, .. }
            | CompileError::AnnotationTarget { loc, .. }
            | CompileError::UnknownImport { loc, .. }
            | CompileError::UnknownType { loc, .. }
            | CompileError::ArityMismatch { loc, .. }
            | CompileError::DefaultValueMismatch { loc, .. } => Some(loc),
            _ => None,
        }
    }

    /// Render the single-line diagnostic the driver prints.
    pub fn render(&self, sources: &SourceMap) -> String {
        match self.loc() {
            Some(loc) if !sources.is_empty() => {
                let (file, line, col) = sources.line_col(loc);
                format!("{}:{}:{}: {}: {}", file, line, col, self.kind(), self)
            }
            _ => format!("{}: {}", self.kind(), self),
        }
    }
}

fn render_found(found: &Option<String>) -> String {
    match found {
        Some(f) => format!(", found {}", f),
        None => String::new(),
    }
}

fn render_searched(searched: &[PathBuf]) -> String {
    if searched.is_empty() {
        "no directories".to_string()
    } else {
        searched
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

pub type Result<T> = std::result::Result<T, CompileError>;

/// A non-fatal problem, accumulated and reported after compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub message: String,
}

impl Warning {
    pub fn new(message: impl Into<String>) -> Self {
        Warning {
            message: message.into(),
        }
    }
}

/// Loaded source texts, keyed by [`SourceId`], for diagnostic rendering.
#[derive(Debug, Default)]
pub struct SourceMap {
    files: Vec<(String, String)>,
}

impl SourceMap {
    pub fn new() -> Self {
        SourceMap::default()
    }

    pub fn add(&mut self, name: impl Into<String>, text: impl Into<String>) -> SourceId {
        self.files.push((name.into(), text.into()));
        self.files.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn name(&self, source: SourceId) -> &str {
        &self.files[source].0
    }

    pub fn text(&self, source: SourceId) -> &str {
        &self.files[source].1
    }

    /// 1-based line and column of the start of `loc`.
    pub fn line_col(&self, loc: &Loc) -> (&str, usize, usize) {
        let (name, text) = match self.files.get(loc.source) {
            Some((n, t)) => (n.as_str(), t.as_str()),
            None => return ("<unknown>", 1, 1),
        };
        let offset = loc.span.start.min(text.len());
        let before = &text[..offset];
        let line = before.bytes().filter(|&b| b == b'\n').count() + 1;
        let col = before
            .rfind('\n')
            .map(|nl| before[nl + 1..].chars().count() + 1)
            .unwrap_or_else(|| before.chars().count() + 1);
        (name, line, col)
    }
}

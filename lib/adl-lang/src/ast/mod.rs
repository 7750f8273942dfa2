pub mod ast;
pub mod primitive;
pub mod visitor;

pub type SourceId = usize;
pub type Span = std::ops::Range<usize>;

/// A byte range within a loaded source file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Loc {
    pub source: SourceId,
    pub span: Span,
}

impl Loc {
    pub fn merge(self, other: Loc) -> Loc {
        Loc {
            source: self.source,
            span: self.span.start..other.span.end,
        }
    }

    /// Create a synthetic location (used for generated nodes)
    pub fn generated() -> Self {
        Loc {
            source: 0,
            span: 0..0,
        }
    }
}

impl Default for Loc {
    fn default() -> Self {
        Loc::generated()
    }
}

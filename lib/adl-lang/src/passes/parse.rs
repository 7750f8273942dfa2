use chumsky::error::RichReason;
use chumsky::input::Stream;
use chumsky::prelude::*;
use chumsky::Parser as _;
use indexmap::IndexMap;
use logos::Logos;

use crate::ast::ast::Module0;
use crate::ast::{Loc, SourceId};
use crate::error::{CompileError, Result};
use crate::parser::grammar::{parse_module, ModuleItem, ParseCtx, RawModule};
use crate::parser::lexer::Token;
use crate::passes::annotations::apply_explicit_annotations;

pub struct Parser;

impl Parser {
    /// Parse one ADL source file into an unresolved module: runs the
    /// grammar, folds decls into their table (detecting duplicates), and
    /// attaches standalone `annotation` statements.
    pub fn parse(src: &str, source: SourceId) -> Result<Module0> {
        let raw = Self::parse_raw(src, source)?;
        Self::assemble(raw)
    }

    pub fn parse_raw(src: &str, source: SourceId) -> Result<RawModule> {
        let mut tokens = Vec::new();
        for (tok, span) in Token::lexer(src).spanned() {
            match tok {
                Ok(t) => tokens.push((t, SimpleSpan::from(span.clone()))),
                Err(()) => {
                    return Err(CompileError::Parse {
                        expected: "a valid token".to_string(),
                        found: Some(format!("'{}'", &src[span.clone()])),
                        loc: Loc { source, span },
                    });
                }
            }
        }

        let eoi = SimpleSpan::from(src.len()..src.len());
        let input = Stream::from_iter(tokens).map(eoi, |(tok, span)| (tok, span));
        let ctx = ParseCtx { source_id: source };

        match parse_module(ctx).then_ignore(end()).parse(input).into_result() {
            Ok(raw) => Ok(raw),
            Err(errors) => {
                let err = errors
                    .into_iter()
                    .next()
                    .expect("failed parse reports at least one error");
                Err(rich_to_error(err, source))
            }
        }
    }

    fn assemble(raw: RawModule) -> Result<Module0> {
        let mut imports = Vec::new();
        let mut decls = IndexMap::new();
        let mut explicit = Vec::new();

        for item in raw.items {
            match item {
                ModuleItem::Import(import) => imports.push(import),
                ModuleItem::Annotation(ann) => explicit.push(ann),
                ModuleItem::Decl(decl) => {
                    let loc = decl.loc.clone();
                    let name = decl.name.clone();
                    if decls.insert(name.clone(), decl).is_some() {
                        return Err(CompileError::DuplicateDecl { name, loc });
                    }
                }
            }
        }

        let mut module = Module0 {
            name: raw.name,
            imports,
            decls,
            annotations: raw.annotations,
        };
        apply_explicit_annotations(&mut module, explicit)?;
        Ok(module)
    }
}

fn rich_to_error(err: Rich<'_, Token<'_>, SimpleSpan>, source: SourceId) -> CompileError {
    let loc = Loc {
        source,
        span: err.span().into_range(),
    };
    let found = err.found().map(|t| t.to_string());
    let expected = if let RichReason::Custom(msg) = err.reason() {
        msg.clone()
    } else {
        let patterns: Vec<String> = err.expected().map(|p| p.to_string()).collect();
        if patterns.is_empty() {
            "unexpected input".to_string()
        } else {
            format!("expected {}", patterns.join(" or "))
        }
    };
    CompileError::Parse {
        expected,
        found,
        loc,
    }
}

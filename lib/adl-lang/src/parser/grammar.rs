//! Grammar for ADL source files.
//!
//! Parsers are written against a `(Token, SimpleSpan)` stream produced by
//! the lexer; all are named `parse_*`. The output is a [`RawModule`]: the
//! module header, its items in declaration order, and the standalone
//! `annotation` statements still to be attached by the parse pass.

use chumsky::prelude::*;
use serde_json::Value;

use crate::ast::ast::{
    well_known, Annotations, Decl, DeclType, Field, Ident, Import, ImportKind, ModuleName, NewType,
    ScopedName, Struct, TypeDef, TypeExpr, TypeExpr0, Union,
};
use crate::ast::{Loc, SourceId};
use crate::parser::lexer::Token;

type ParserError<'a> = extra::Err<Rich<'a, Token<'a>, SimpleSpan>>;

#[derive(Clone, Copy)]
pub struct ParseCtx {
    pub source_id: SourceId,
}

impl ParseCtx {
    pub fn to_loc(&self, span: SimpleSpan) -> Loc {
        Loc {
            source: self.source_id,
            span: span.into_range(),
        }
    }
}

/// A module as parsed, before standalone annotations are attached and the
/// decl list is folded into a table.
#[derive(Debug)]
pub struct RawModule {
    pub name: ModuleName,
    pub annotations: Annotations,
    pub items: Vec<ModuleItem>,
}

#[derive(Debug)]
pub enum ModuleItem {
    Import(Import),
    Decl(Decl<TypeExpr0>),
    Annotation(ExplicitAnnotation),
}

/// A standalone `annotation <target>? <name> <value>?;` statement.
#[derive(Debug)]
pub struct ExplicitAnnotation {
    pub refr: ExplicitAnnotationRef,
    pub key: ScopedName,
    pub value: Value,
    pub loc: Loc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExplicitAnnotationRef {
    Module,
    Decl(Ident),
    Field(Ident, Ident),
}

impl std::fmt::Display for ExplicitAnnotationRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExplicitAnnotationRef::Module => f.write_str("<module>"),
            ExplicitAnnotationRef::Decl(d) => f.write_str(d),
            ExplicitAnnotationRef::Field(d, fd) => write!(f, "{}::{}", d, fd),
        }
    }
}

enum PrefixItem {
    Doc(String),
    Ann(ScopedName, Value),
}

/// Merge a run of `///` lines and `@Name value` annotations into one
/// annotation table; doc lines become a single `sys.annotations.Doc`.
fn fold_prefix(items: Vec<PrefixItem>) -> Annotations {
    let mut anns = Annotations::default();
    let mut docs: Vec<String> = Vec::new();
    for item in items {
        match item {
            PrefixItem::Doc(line) => docs.push(line),
            PrefixItem::Ann(key, value) => anns.set(key, value),
        }
    }
    if !docs.is_empty() {
        anns.set(well_known::doc(), Value::String(docs.join("\n")));
    }
    anns
}

fn parse_ident<'a, I>() -> impl Parser<'a, I, Ident, ParserError<'a>> + Clone
where
    I: Input<'a, Token = Token<'a>, Span = SimpleSpan> + chumsky::input::ValueInput<'a>,
{
    select! { Token::Identifier(id) => id.to_string() }
}

fn parse_dotted<'a, I>() -> impl Parser<'a, I, Vec<Ident>, ParserError<'a>> + Clone
where
    I: Input<'a, Token = Token<'a>, Span = SimpleSpan> + chumsky::input::ValueInput<'a>,
{
    parse_ident()
        .separated_by(just(Token::Dot))
        .at_least(1)
        .collect()
}

/// A possibly-qualified name. A single identifier parses as a bare name
/// with an empty module part, to be resolved later.
fn parse_scoped_ref<'a, I>() -> impl Parser<'a, I, ScopedName, ParserError<'a>> + Clone
where
    I: Input<'a, Token = Token<'a>, Span = SimpleSpan> + chumsky::input::ValueInput<'a>,
{
    parse_dotted().map(|mut parts| {
        let name = parts.pop().expect("dotted name has at least one part");
        ScopedName::new(ModuleName::new(parts), name)
    })
}

/// JSON literals, used for default values and annotation payloads.
pub fn parse_json<'a, I>() -> impl Parser<'a, I, Value, ParserError<'a>> + Clone
where
    I: Input<'a, Token = Token<'a>, Span = SimpleSpan> + chumsky::input::ValueInput<'a>,
{
    recursive(|value| {
        let literal = select! {
            Token::Null => Value::Null,
            Token::True => Value::Bool(true),
            Token::False => Value::Bool(false),
            Token::String(s) => Value::String(s),
        };

        // the lexed slice carries the exact decimal text into the value
        let number = select! { Token::Number(raw) => raw }.try_map(|raw, span| {
            raw.parse::<serde_json::Number>()
                .map(Value::Number)
                .map_err(|_| Rich::custom(span, format!("invalid number literal: {}", raw)))
        });

        let array = value
            .clone()
            .separated_by(just(Token::Comma))
            .collect::<Vec<_>>()
            .delimited_by(just(Token::LBracket), just(Token::RBracket))
            .map(Value::Array);

        let member = select! { Token::String(s) => s }
            .then_ignore(just(Token::Colon))
            .then(value.clone());

        let object = member
            .separated_by(just(Token::Comma))
            .collect::<Vec<_>>()
            .delimited_by(just(Token::LBrace), just(Token::RBrace))
            .map(|members: Vec<(String, Value)>| {
                Value::Object(members.into_iter().collect())
            });

        choice((literal, number, array, object))
    })
}

pub fn parse_type_expr<'a, I>(
    ctx: ParseCtx,
) -> impl Parser<'a, I, TypeExpr0, ParserError<'a>> + Clone
where
    I: Input<'a, Token = Token<'a>, Span = SimpleSpan> + chumsky::input::ValueInput<'a>,
{
    recursive(move |te| {
        parse_scoped_ref()
            .then(
                te.separated_by(just(Token::Comma))
                    .at_least(1)
                    .collect::<Vec<_>>()
                    .delimited_by(just(Token::LAngle), just(Token::RAngle))
                    .or_not(),
            )
            .map_with(move |(head, params), e| {
                TypeExpr::with_loc(head, params.unwrap_or_default(), ctx.to_loc(e.span()))
            })
    })
}

fn parse_prefix<'a, I>() -> impl Parser<'a, I, Vec<PrefixItem>, ParserError<'a>> + Clone
where
    I: Input<'a, Token = Token<'a>, Span = SimpleSpan> + chumsky::input::ValueInput<'a>,
{
    let doc = select! { Token::DocComment(line) => PrefixItem::Doc(line.to_string()) };

    let ann = just(Token::At)
        .ignore_then(parse_scoped_ref())
        .then(parse_json().or_not())
        .map(|(key, value)| PrefixItem::Ann(key, value.unwrap_or(Value::Null)));

    doc.or(ann).repeated().collect()
}

fn parse_type_params<'a, I>() -> impl Parser<'a, I, Vec<Ident>, ParserError<'a>> + Clone
where
    I: Input<'a, Token = Token<'a>, Span = SimpleSpan> + chumsky::input::ValueInput<'a>,
{
    parse_ident()
        .separated_by(just(Token::Comma))
        .at_least(1)
        .collect::<Vec<_>>()
        .delimited_by(just(Token::LAngle), just(Token::RAngle))
        .or_not()
        .map(Option::unwrap_or_default)
}

fn parse_field<'a, I>(ctx: ParseCtx) -> impl Parser<'a, I, Field<TypeExpr0>, ParserError<'a>> + Clone
where
    I: Input<'a, Token = Token<'a>, Span = SimpleSpan> + chumsky::input::ValueInput<'a>,
{
    parse_prefix()
        .then(parse_type_expr(ctx))
        .then(parse_ident())
        .then(just(Token::Eq).ignore_then(parse_json()).or_not())
        .then_ignore(just(Token::Semi))
        .map_with(move |(((prefix, type_expr), name), default), e| Field {
            name,
            type_expr,
            default,
            annotations: fold_prefix(prefix),
            loc: ctx.to_loc(e.span()),
        })
}

fn parse_decl<'a, I>(ctx: ParseCtx) -> impl Parser<'a, I, Decl<TypeExpr0>, ParserError<'a>> + Clone
where
    I: Input<'a, Token = Token<'a>, Span = SimpleSpan> + chumsky::input::ValueInput<'a>,
{
    let fields = parse_field(ctx)
        .repeated()
        .collect::<Vec<_>>()
        .delimited_by(just(Token::LBrace), just(Token::RBrace));

    let struct_decl = just(Token::Struct)
        .ignore_then(parse_ident())
        .then(parse_type_params())
        .then(fields.clone())
        .then_ignore(just(Token::Semi))
        .map(|((name, type_params), fields)| {
            (name, DeclType::Struct(Struct { type_params, fields }))
        });

    let union_decl = just(Token::Union)
        .ignore_then(parse_ident())
        .then(parse_type_params())
        .then(fields)
        .then_ignore(just(Token::Semi))
        .try_map(|((name, type_params), fields), span| {
            if fields.is_empty() {
                return Err(Rich::custom(
                    span,
                    format!("union '{}' must have at least one field", name),
                ));
            }
            Ok((name, DeclType::Union(Union { type_params, fields })))
        });

    let type_decl = just(Token::Type)
        .ignore_then(parse_ident())
        .then(parse_type_params())
        .then_ignore(just(Token::Eq))
        .then(parse_type_expr(ctx))
        .then_ignore(just(Token::Semi))
        .map(|((name, type_params), type_expr)| {
            (
                name,
                DeclType::Type(TypeDef {
                    type_params,
                    type_expr,
                }),
            )
        });

    let newtype_decl = just(Token::Newtype)
        .ignore_then(parse_ident())
        .then(parse_type_params())
        .then_ignore(just(Token::Eq))
        .then(parse_type_expr(ctx))
        .then(just(Token::Eq).ignore_then(parse_json()).or_not())
        .then_ignore(just(Token::Semi))
        .map(|(((name, type_params), type_expr), default)| {
            (
                name,
                DeclType::Newtype(NewType {
                    type_params,
                    type_expr,
                    default,
                }),
            )
        });

    parse_prefix()
        .then(choice((struct_decl, union_decl, type_decl, newtype_decl)))
        .map_with(move |(prefix, (name, decl_type)), e| Decl {
            name,
            version: None,
            decl_type,
            annotations: fold_prefix(prefix),
            loc: ctx.to_loc(e.span()),
        })
}

fn parse_import<'a, I>(ctx: ParseCtx) -> impl Parser<'a, I, Import, ParserError<'a>> + Clone
where
    I: Input<'a, Token = Token<'a>, Span = SimpleSpan> + chumsky::input::ValueInput<'a>,
{
    just(Token::Import)
        .ignore_then(parse_dotted())
        .then(
            just(Token::Dot)
                .ignore_then(just(Token::Star))
                .or_not()
                .map(|star| star.is_some()),
        )
        .then_ignore(just(Token::Semi))
        .try_map(move |(mut parts, wildcard), span| {
            let kind = if wildcard {
                ImportKind::Module(ModuleName::new(parts))
            } else if parts.len() >= 2 {
                let name = parts.pop().expect("at least two parts");
                ImportKind::Scoped(ScopedName::new(ModuleName::new(parts), name))
            } else {
                return Err(Rich::custom(
                    span,
                    "import must name a module wildcard or a qualified decl",
                ));
            };
            Ok(Import {
                kind,
                loc: ctx.to_loc(span),
            })
        })
}

/// Either an annotation target (`Decl` or `Decl::field`) or, when no second
/// path follows, the annotation name itself.
enum AnnPath {
    Plain(Vec<Ident>),
    Field(Ident, Ident),
}

fn parse_annotation_stmt<'a, I>(
    ctx: ParseCtx,
) -> impl Parser<'a, I, ExplicitAnnotation, ParserError<'a>> + Clone
where
    I: Input<'a, Token = Token<'a>, Span = SimpleSpan> + chumsky::input::ValueInput<'a>,
{
    let field_ref = parse_ident()
        .then_ignore(just(Token::ModuleSep))
        .then(parse_ident())
        .map(|(decl, field)| AnnPath::Field(decl, field));

    let ann_path = field_ref.or(parse_dotted().map(AnnPath::Plain));

    just(Token::Annotation)
        .ignore_then(ann_path)
        .then(parse_scoped_ref().or_not())
        .then(parse_json().or_not())
        .then_ignore(just(Token::Semi))
        .try_map(move |((first, second), value), span| {
            let (refr, key) = match (first, second) {
                (AnnPath::Plain(parts), Some(key)) => {
                    if parts.len() != 1 {
                        return Err(Rich::custom(
                            span,
                            "annotation target must be a decl or decl::field",
                        ));
                    }
                    let mut parts = parts;
                    (ExplicitAnnotationRef::Decl(parts.pop().unwrap()), key)
                }
                (AnnPath::Field(decl, field), Some(key)) => {
                    (ExplicitAnnotationRef::Field(decl, field), key)
                }
                (AnnPath::Plain(mut parts), None) => {
                    let name = parts.pop().expect("dotted name has at least one part");
                    (
                        ExplicitAnnotationRef::Module,
                        ScopedName::new(ModuleName::new(parts), name),
                    )
                }
                (AnnPath::Field(_, _), None) => {
                    return Err(Rich::custom(span, "annotation is missing a name"));
                }
            };
            Ok(ExplicitAnnotation {
                refr,
                key,
                value: value.unwrap_or(Value::Null),
                loc: ctx.to_loc(span),
            })
        })
}

pub fn parse_module<'a, I>(ctx: ParseCtx) -> impl Parser<'a, I, RawModule, ParserError<'a>> + Clone
where
    I: Input<'a, Token = Token<'a>, Span = SimpleSpan> + chumsky::input::ValueInput<'a>,
{
    let item = choice((
        parse_import(ctx).map(ModuleItem::Import),
        parse_annotation_stmt(ctx).map(ModuleItem::Annotation),
        parse_decl(ctx).map(ModuleItem::Decl),
    ));

    parse_prefix()
        .then_ignore(just(Token::Module))
        .then(parse_dotted().map(ModuleName::new))
        .then(
            item.repeated()
                .collect::<Vec<_>>()
                .delimited_by(just(Token::LBrace), just(Token::RBrace)),
        )
        .then_ignore(just(Token::Semi).or_not())
        .map(|((prefix, name), items)| RawModule {
            name,
            annotations: fold_prefix(prefix),
            items,
        })
}

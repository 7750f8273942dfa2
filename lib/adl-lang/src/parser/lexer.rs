use std::fmt;

use logos::{Logos, Skip};

/// Skip a (possibly nested) block comment. The opening `/*` has already
/// been consumed; an unterminated comment swallows the rest of the input
/// and surfaces as a parse error at end of file.
fn block_comment<'a>(lex: &mut logos::Lexer<'a, Token<'a>>) -> Skip {
    let bytes = lex.remainder().as_bytes();
    let mut depth = 1usize;
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                depth += 1;
                i += 2;
            }
            b'*' if bytes.get(i + 1) == Some(&b'/') => {
                depth -= 1;
                i += 2;
                if depth == 0 {
                    break;
                }
            }
            _ => i += 1,
        }
    }
    lex.bump(i);
    Skip
}

/// Decode the JSON-style escapes of a quoted string literal.
fn unescape_string(slice: &str) -> Option<String> {
    let inner = &slice[1..slice.len() - 1];
    if !inner.contains('\\') {
        return Some(inner.to_string());
    }
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            '"' => out.push('"'),
            '\\' => out.push('\\'),
            '/' => out.push('/'),
            'b' => out.push('\u{0008}'),
            'f' => out.push('\u{000c}'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'u' => {
                let hi = hex4(&mut chars)?;
                let code = if (0xd800..0xdc00).contains(&hi) {
                    // high surrogate, must be followed by \uXXXX low surrogate
                    if chars.next() != Some('\\') || chars.next() != Some('u') {
                        return None;
                    }
                    let lo = hex4(&mut chars)?;
                    if !(0xdc00..0xe000).contains(&lo) {
                        return None;
                    }
                    0x10000 + ((hi - 0xd800) << 10) + (lo - 0xdc00)
                } else {
                    hi
                };
                out.push(char::from_u32(code)?);
            }
            _ => return None,
        }
    }
    Some(out)
}

fn hex4(chars: &mut std::str::Chars) -> Option<u32> {
    let mut v = 0u32;
    for _ in 0..4 {
        v = v * 16 + chars.next()?.to_digit(16)?;
    }
    Some(v)
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
// line comments; `///` is longer and lexes as a DocComment instead
#[logos(skip r"//[^/\n][^\n]*|//")]
pub enum Token<'a> {
    #[token("module")]
    Module,
    #[token("import")]
    Import,
    #[token("struct")]
    Struct,
    #[token("union")]
    Union,
    #[token("type")]
    Type,
    #[token("newtype")]
    Newtype,
    #[token("annotation")]
    Annotation,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,

    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("<")]
    LAngle,
    #[token(">")]
    RAngle,
    #[token(";")]
    Semi,
    #[token(",")]
    Comma,
    #[token("=")]
    Eq,
    #[token(".")]
    Dot,
    #[token("::")]
    ModuleSep,
    #[token(":")]
    Colon,
    #[token("*")]
    Star,
    #[token("@")]
    At,

    #[token("/*", block_comment)]
    BlockComment,

    #[regex(r"///[^\n]*", |lex| &lex.slice()[3..])]
    DocComment(&'a str),

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice())]
    Identifier(&'a str),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| unescape_string(lex.slice()))]
    String(std::string::String),

    // JSON number grammar; the raw slice is kept so the exact decimal text
    // survives into the literal value
    #[regex(r"-?(0|[1-9][0-9]*)(\.[0-9]+)?([eE][+-]?[0-9]+)?", |lex| lex.slice())]
    Number(&'a str),
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Module => f.write_str("module"),
            Token::Import => f.write_str("import"),
            Token::Struct => f.write_str("struct"),
            Token::Union => f.write_str("union"),
            Token::Type => f.write_str("type"),
            Token::Newtype => f.write_str("newtype"),
            Token::Annotation => f.write_str("annotation"),
            Token::True => f.write_str("true"),
            Token::False => f.write_str("false"),
            Token::Null => f.write_str("null"),
            Token::LBrace => f.write_str("{"),
            Token::RBrace => f.write_str("}"),
            Token::LBracket => f.write_str("["),
            Token::RBracket => f.write_str("]"),
            Token::LAngle => f.write_str("<"),
            Token::RAngle => f.write_str(">"),
            Token::Semi => f.write_str(";"),
            Token::Comma => f.write_str(","),
            Token::Eq => f.write_str("="),
            Token::Dot => f.write_str("."),
            Token::ModuleSep => f.write_str("::"),
            Token::Colon => f.write_str(":"),
            Token::Star => f.write_str("*"),
            Token::At => f.write_str("@"),
            Token::BlockComment => f.write_str("comment"),
            Token::DocComment(_) => f.write_str("doc comment"),
            Token::Identifier(id) => f.write_str(id),
            Token::String(_) => f.write_str("string literal"),
            Token::Number(n) => f.write_str(n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> Vec<Token> {
        Token::lexer(src).map(|t| t.expect("lex error")).collect()
    }

    #[test]
    fn keywords_and_punctuation() {
        assert_eq!(
            lex("module a.b { struct S<T> {}; };"),
            vec![
                Token::Module,
                Token::Identifier("a"),
                Token::Dot,
                Token::Identifier("b"),
                Token::LBrace,
                Token::Struct,
                Token::Identifier("S"),
                Token::LAngle,
                Token::Identifier("T"),
                Token::RAngle,
                Token::LBrace,
                Token::RBrace,
                Token::Semi,
                Token::RBrace,
                Token::Semi,
            ]
        );
    }

    #[test]
    fn nested_block_comments() {
        assert_eq!(
            lex("a /* outer /* inner */ still outer */ b"),
            vec![Token::Identifier("a"), Token::Identifier("b")]
        );
    }

    #[test]
    fn doc_comments_survive_line_comments_do_not() {
        assert_eq!(
            lex("// plain\n/// documented\nx"),
            vec![Token::DocComment(" documented"), Token::Identifier("x")]
        );
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            lex(r#""a\nbAé""#),
            vec![Token::String("a\nbA\u{e9}".to_string())]
        );
    }

    #[test]
    fn number_shapes() {
        assert_eq!(
            lex("0 -7 3.25 1e10 -2.5E-3"),
            vec![
                Token::Number("0"),
                Token::Number("-7"),
                Token::Number("3.25"),
                Token::Number("1e10"),
                Token::Number("-2.5E-3"),
            ]
        );
    }
}

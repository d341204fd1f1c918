#[cfg(test)]
mod tests;

use std::{borrow::Cow, fmt, num::IntErrorKind};

use logos::{Lexer, Logos, Skip};

use crate::error::ParseErrorKind;

#[derive(Debug, Clone, Logos, PartialEq)]
#[logos(extras = TokenExtras)]
#[logos(skip r"[\t\v\f\r\n ]+")]
#[logos(skip r"//[^\n]*")]
#[logos(subpattern exponent = r"[eE][+\-]?[0-9]+")]
pub(crate) enum Token<'a> {
    #[regex("[A-Za-z_][A-Za-z0-9_]*")]
    Ident(&'a str),
    #[regex("0", |lex| int(lex, 10, 0))]
    #[regex("0[0-7]+", |lex| int(lex, 8, 1))]
    #[regex("[1-9][0-9]*", |lex| int(lex, 10, 0))]
    #[regex("0[xX][0-9A-Fa-f]+", |lex| int(lex, 16, 2))]
    IntLiteral(u64),
    #[regex(r#"[0-9]+\.[0-9]*(?&exponent)?"#, float)]
    #[regex(r#"[0-9]+(?&exponent)"#, float)]
    #[regex(r#"\.[0-9]+(?&exponent)?"#, float)]
    FloatLiteral(f64),
    #[regex(r#"'|""#, string)]
    StringLiteral(Cow<'a, str>),
    #[token(".")]
    Dot,
    #[token("-")]
    Minus,
    #[token("+")]
    Plus,
    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token("{")]
    LeftBrace,
    #[token("}")]
    RightBrace,
    #[token("[")]
    LeftBracket,
    #[token("]")]
    RightBracket,
    #[token("<")]
    LeftAngleBracket,
    #[token(">")]
    RightAngleBracket,
    #[token(",")]
    Comma,
    #[token("=")]
    Equals,
    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,
    #[token("/*", block_comment)]
    BlockComment,
}

impl Token<'_> {
    // Contextual keywords consumed with expect_eq. The rest are matched as
    // plain identifier patterns in the parser.
    pub const SYNTAX: Token<'static> = Token::Ident("syntax");
    pub const PACKAGE: Token<'static> = Token::Ident("package");
    pub const IMPORT: Token<'static> = Token::Ident("import");
    pub const OPTION: Token<'static> = Token::Ident("option");
    pub const MESSAGE: Token<'static> = Token::Ident("message");
    pub const ENUM: Token<'static> = Token::Ident("enum");
    pub const SERVICE: Token<'static> = Token::Ident("service");
    pub const RPC: Token<'static> = Token::Ident("rpc");
    pub const RETURNS: Token<'static> = Token::Ident("returns");
    pub const ONEOF: Token<'static> = Token::Ident("oneof");
    pub const RESERVED: Token<'static> = Token::Ident("reserved");
    pub const TO: Token<'static> = Token::Ident("to");
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(value) => write!(f, "{}", value),
            Token::IntLiteral(value) => write!(f, "{}", value),
            Token::FloatLiteral(value) => {
                if value.fract() == 0.0 {
                    write!(f, "{:.1}", value)
                } else {
                    write!(f, "{}", value)
                }
            }
            Token::StringLiteral(value) => write!(f, "\"{}\"", value.escape_default()),
            Token::Dot => write!(f, "."),
            Token::Minus => write!(f, "-"),
            Token::Plus => write!(f, "+"),
            Token::LeftParen => write!(f, "("),
            Token::RightParen => write!(f, ")"),
            Token::LeftBrace => write!(f, "{{"),
            Token::RightBrace => write!(f, "}}"),
            Token::LeftBracket => write!(f, "["),
            Token::RightBracket => write!(f, "]"),
            Token::LeftAngleBracket => write!(f, "<"),
            Token::RightAngleBracket => write!(f, ">"),
            Token::Comma => write!(f, ","),
            Token::Equals => write!(f, "="),
            Token::Colon => write!(f, ":"),
            Token::Semicolon => write!(f, ";"),
            Token::BlockComment => write!(f, "/*"),
        }
    }
}

/// State shared between the lexer and the parser.
///
/// The parser is fail-fast, so a single error slot suffices: only the first
/// lex error is kept, and the parser stops as soon as it observes it.
#[derive(Default)]
pub(crate) struct TokenExtras {
    pub error: Option<ParseErrorKind>,
}

impl TokenExtras {
    fn report(&mut self, err: ParseErrorKind) {
        self.error.get_or_insert(err);
    }
}

fn int<'a>(lex: &mut Lexer<'a, Token<'a>>, radix: u32, prefix_len: usize) -> u64 {
    debug_assert!(lex.slice().len() > prefix_len);

    // "08", "0x" and "123abc" lex as a literal followed immediately by more
    // word characters; protobuf requires whitespace between them.
    if matches!(lex.remainder().chars().next(), Some(ch) if ch.is_ascii_alphanumeric() || ch == '_')
    {
        lex.extras
            .report(ParseErrorKind::InvalidNumber { span: lex.span() });
    }

    match u64::from_str_radix(&lex.slice()[prefix_len..], radix) {
        Ok(value) => value,
        Err(err) => {
            debug_assert_eq!(err.kind(), &IntErrorKind::PosOverflow);
            lex.extras
                .report(ParseErrorKind::InvalidNumber { span: lex.span() });
            0
        }
    }
}

fn float<'a>(lex: &mut Lexer<'a, Token<'a>>) -> f64 {
    if matches!(lex.remainder().chars().next(), Some(ch) if ch.is_ascii_alphanumeric() || ch == '_')
    {
        lex.extras
            .report(ParseErrorKind::InvalidNumber { span: lex.span() });
    }

    let value: f64 = lex.slice().parse().expect("failed to parse float");
    if !value.is_finite() {
        lex.extras
            .report(ParseErrorKind::InvalidNumber { span: lex.span() });
    }
    value
}

fn string<'a>(lex: &mut Lexer<'a, Token<'a>>) -> Cow<'a, str> {
    #[derive(Logos)]
    #[logos(subpattern hex = r"[0-9A-Fa-f]")]
    enum Component<'a> {
        #[regex(r#"[^\n\\'"]+"#)]
        Unescaped(&'a str),
        #[regex(r#"['"]"#, terminator)]
        Terminator(char),
        #[regex(r#"\\[nrt0\\'"]"#, char_escape)]
        #[regex(r#"\\[xX](?&hex)(?&hex)"#, hex_escape)]
        #[regex(r#"\\u(?&hex)(?&hex)(?&hex)(?&hex)"#, unicode_escape)]
        Char(char),
    }

    fn terminator<'a>(lex: &mut Lexer<'a, Component<'a>>) -> char {
        debug_assert_eq!(lex.slice().chars().count(), 1);
        lex.slice().chars().next().unwrap()
    }

    fn char_escape<'a>(lex: &mut Lexer<'a, Component<'a>>) -> char {
        match lex.slice().as_bytes()[1] {
            b'n' => '\n',
            b'r' => '\r',
            b't' => '\t',
            b'0' => '\0',
            b'\\' => '\\',
            b'\'' => '\'',
            b'"' => '"',
            _ => unreachable!("failed to parse char escape"),
        }
    }

    fn hex_escape<'a>(lex: &mut Lexer<'a, Component<'a>>) -> char {
        let value = u8::from_str_radix(&lex.slice()[2..], 16).expect("expected valid hex escape");
        char::from(value)
    }

    fn unicode_escape<'a>(lex: &mut Lexer<'a, Component<'a>>) -> Option<char> {
        let value = u32::from_str_radix(&lex.slice()[2..], 16).expect("expected valid hex escape");
        // Surrogate code points are rejected here and reported as an
        // invalid escape below.
        char::from_u32(value)
    }

    let mut result: Option<Cow<'a, str>> = None;

    let mut char_lexer = Component::lexer(lex.remainder());
    let terminator = lex.slice().chars().next().expect("expected quote");

    loop {
        match char_lexer.next() {
            Some(Ok(Component::Unescaped(s))) => cow_push_str(&mut result, s),
            Some(Ok(Component::Terminator(t))) if t == terminator => break,
            Some(Ok(Component::Terminator(ch) | Component::Char(ch))) => {
                result.get_or_insert_with(Cow::default).to_mut().push(ch)
            }
            Some(Err(())) => {
                if char_lexer.slice().contains('\n') {
                    lex.extras
                        .report(ParseErrorKind::UnterminatedString { span: lex.span() });
                } else {
                    let start = lex.span().end + char_lexer.span().start;
                    let end = lex.span().end + char_lexer.span().end;
                    lex.extras
                        .report(ParseErrorKind::InvalidEscape { span: start..end });
                }
                break;
            }
            None => {
                lex.extras
                    .report(ParseErrorKind::UnterminatedString { span: lex.span() });
                break;
            }
        }
    }

    lex.bump(char_lexer.span().end);
    result.unwrap_or_default()
}

fn block_comment<'a>(lex: &mut Lexer<'a, Token<'a>>) -> Skip {
    // Block comments do not nest; the first */ closes the comment.
    match lex.remainder().find("*/") {
        Some(end) => lex.bump(end + 2),
        None => {
            lex.extras
                .report(ParseErrorKind::UnterminatedComment { span: lex.span() });
            lex.bump(lex.remainder().len());
        }
    }
    Skip
}

fn cow_push_str<'a>(cow: &mut Option<Cow<'a, str>>, s: &'a str) {
    match cow {
        Some(cow) => cow.to_mut().push_str(s),
        None => *cow = Some(Cow::Borrowed(s)),
    }
}

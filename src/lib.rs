//! Parsing of proto3 source files.
//!
//! See the documentation for [`parse()`] for details.
#![warn(missing_debug_implementations, missing_docs)]
#![deny(unsafe_code)]
#![doc(html_root_url = "https://docs.rs/proto3-parse/0.1.0/")]

use logos::Span;

pub mod ast;

mod error;
mod lex;
mod parse;
#[cfg(test)]
mod tests;

pub use self::error::{FieldNumberReason, ParseError, ParseErrorKind};

/// The largest permitted field number, `2^29 - 1`.
pub const MAX_FIELD_NUMBER: i32 = 536_870_911;

pub(crate) const MAX_NESTING_DEPTH: u32 = 100;

/// Parses a single proto3 source file into an [`ast::File`].
///
/// This function only looks at the contents of the file, without resolving
/// type names or reading imported files; the returned tree records type
/// references textually. Parsing is fail-fast: the first violated rule is
/// returned as a [`ParseError`] carrying the byte span and 1-based
/// line/column of the offending source.
///
/// # Examples
///
/// ```
/// let source = r#"
///     syntax = "proto3";
///     import "dep.proto";
///
///     message Foo {
///         string name = 1;
///     }
/// "#;
/// let file = proto3_parse::parse(source).unwrap();
/// assert_eq!(file.syntax, "proto3");
/// assert_eq!(file.imports[0].path, "dep.proto");
/// assert_eq!(file.messages[0].name, "Foo");
/// assert_eq!(file.messages[0].fields[0].number, 1);
/// ```
pub fn parse(source: &str) -> Result<ast::File, ParseError> {
    parse::parse_file(source).map_err(|kind| ParseError::new(kind, source))
}

fn join_span(start: Span, end: Span) -> Span {
    start.start..end.end
}

use std::{fmt, sync::Arc};

use logos::Span;
use miette::{Diagnostic, SourceCode};
use thiserror::Error;

use crate::MAX_FIELD_NUMBER;

/// An error that may occur while parsing a proto3 source file.
///
/// The parser is fail-fast: the first rule violation stops parsing and is
/// returned as a single `ParseError`. The error implements
/// [`miette::Diagnostic`] with the offending source attached, so it can be
/// rendered as an annotated snippet.
#[derive(Error, Diagnostic)]
#[error("{}", kind)]
#[diagnostic(forward(kind))]
pub struct ParseError {
    kind: Box<ParseErrorKind>,
    #[source_code]
    source_code: Arc<dyn SourceCode>,
}

/// Why a field number was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldNumberReason {
    /// The number was zero.
    Zero,
    /// The number was in the reserved system range 19000 to 19999.
    ReservedRange,
    /// The number was greater than 536,870,911.
    TooLarge,
}

impl fmt::Display for FieldNumberReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldNumberReason::Zero => write!(f, "field numbers must be positive"),
            FieldNumberReason::ReservedRange => {
                write!(f, "field numbers 19000 to 19999 are reserved")
            }
            FieldNumberReason::TooLarge => {
                write!(f, "field numbers may not be greater than {}", MAX_FIELD_NUMBER)
            }
        }
    }
}

/// The closed set of rules a source file can violate.
#[derive(Error, Debug, Diagnostic, PartialEq)]
pub enum ParseErrorKind {
    /// A character the lexer has no token for, including non-ASCII letters.
    #[error("unexpected character")]
    UnexpectedCharacter {
        /// Where the character was found.
        #[label("found here")]
        span: Span,
    },
    /// A string literal was not closed before a newline or the end of file.
    #[error("unterminated string")]
    UnterminatedString {
        /// Where the string starts.
        #[label("string starts here")]
        span: Span,
    },
    /// An escape sequence outside the supported set.
    #[error("invalid string escape")]
    #[diagnostic(help(
        "supported escapes are \\n \\r \\t \\\\ \\\" \\' \\0 \\xHH and \\uHHHH"
    ))]
    InvalidEscape {
        /// The escape sequence.
        #[label("defined here")]
        span: Span,
    },
    /// A `/* ... */` comment was still open at the end of file.
    #[error("unterminated block comment")]
    UnterminatedComment {
        /// Where the comment starts.
        #[label("comment starts here")]
        span: Span,
    },
    /// A malformed or out-of-range numeric literal.
    #[error("invalid numeric literal")]
    InvalidNumber {
        /// The literal.
        #[label("defined here")]
        span: Span,
    },
    /// An identifier that violates the shape rule for its position.
    #[error("invalid {kind} name '{name}'")]
    InvalidName {
        /// The kind of declaration, e.g. `message` or `field`.
        kind: &'static str,
        /// The offending text.
        name: String,
        /// Where the name was found.
        #[label("defined here")]
        span: Span,
    },
    /// A field number outside the permitted range.
    #[error("invalid field number {number}: {reason}")]
    InvalidFieldNumber {
        /// The rejected number.
        number: u64,
        /// Which range rule it violated.
        reason: FieldNumberReason,
        /// Where the number was found.
        #[label("defined here")]
        span: Span,
    },
    /// An option name with empty, leading or trailing dotted segments.
    #[error("invalid option name")]
    InvalidOptionName {
        /// Where the name was found.
        #[label("defined here")]
        span: Span,
    },
    /// `stream` specified twice on one side of an rpc signature.
    #[error("'stream' may only be specified once")]
    InvalidStream {
        /// The second `stream`.
        #[label("found here")]
        span: Span,
    },
    /// A map key outside the legal key-type set.
    #[error("'{ty}' is not a valid map key type")]
    #[diagnostic(help("a map key must be an integer, boolean or string type"))]
    InvalidMapKey {
        /// The rejected key type.
        ty: String,
        /// Where the key type was found.
        #[label("defined here")]
        span: Span,
    },
    /// `map<..., map<...>>`.
    #[error("a map value may not be another map")]
    InvalidMapValue {
        /// The nested map.
        #[label("defined here")]
        span: Span,
    },
    /// The token stream did not match the grammar.
    #[error("expected {expected}, but found '{found}'")]
    UnexpectedToken {
        /// What the grammar allowed at this point.
        expected: String,
        /// The token that was found instead.
        found: String,
        /// Where it was found.
        #[label("found here")]
        span: Span,
    },
    /// The input ended mid-production.
    #[error("expected {expected}, but reached end of file")]
    UnexpectedEof {
        /// What the grammar allowed at this point.
        expected: String,
    },
    /// A statement was not terminated with `;`.
    #[error("expected ';', but found '{found}'")]
    MissingSemicolon {
        /// The token that was found instead.
        found: String,
        /// Where it was found.
        #[label("found here")]
        span: Span,
    },
    /// An rpc argument list without a type, e.g. `rpc M () returns (B);`.
    #[error("expected a type name")]
    MissingType {
        /// Where the type was expected.
        #[label("expected here")]
        span: Span,
    },
    /// An enum with no values.
    #[error("an enum must have at least one value")]
    EmptyEnum {
        /// The enum body.
        #[label("defined here")]
        span: Span,
    },
    /// A oneof with no fields.
    #[error("a oneof must have at least one field")]
    EmptyOneof {
        /// The oneof body.
        #[label("defined here")]
        span: Span,
    },
    /// Two fields of one message share a number.
    #[error("field number {number} is already used in this message")]
    DuplicateFieldNumber {
        /// The reused number.
        number: i32,
        /// The second use.
        #[label("used again here")]
        span: Span,
    },
    /// Two fields of one message (directly or through oneofs) share a name.
    #[error("a field named '{name}' is already defined in this message")]
    DuplicateFieldName {
        /// The reused name.
        name: String,
        /// The second use.
        #[label("used again here")]
        span: Span,
    },
    /// An enum value name, or number without `allow_alias`, used twice.
    #[error("enum value {kind} '{value}' is already used")]
    DuplicateEnumValue {
        /// `"name"` or `"number"`.
        kind: &'static str,
        /// The reused name or number, as text.
        value: String,
        /// The second use.
        #[label("used again here")]
        span: Span,
    },
    /// The first value of an enum must be zero (unless aliased onto zero).
    #[error("the first value of an enum must have the number zero")]
    EnumFirstValueNotZero {
        /// The first value's number.
        #[label("defined here")]
        span: Span,
    },
    /// A field or enum value number inside a reserved range.
    #[error("number {number} is reserved")]
    ReservedFieldCollision {
        /// The colliding number.
        number: i32,
        /// Where it collides.
        #[label("used here")]
        span: Span,
    },
    /// A field or enum value name declared reserved.
    #[error("the name '{name}' is reserved")]
    ReservedNameCollision {
        /// The colliding name.
        name: String,
        /// Where it collides.
        #[label("used here")]
        span: Span,
    },
    /// Two message, enum or service declarations share a name in one scope.
    #[error("the name '{name}' is already defined in this scope")]
    DuplicateTypeName {
        /// The reused name.
        name: String,
        /// The second declaration.
        #[label("defined again here")]
        span: Span,
    },
    /// More than one package declaration.
    #[error("multiple package names specified")]
    DuplicatePackage {
        /// The first declaration.
        #[label("defined here…")]
        first: Span,
        /// The second declaration.
        #[label("…and again here")]
        second: Span,
    },
    /// Two file-level options with the same normalised name.
    #[error("option '{name}' is set multiple times")]
    DuplicateOption {
        /// The normalised option name.
        name: String,
        /// The first assignment.
        #[label("set here…")]
        first: Span,
        /// The second assignment.
        #[label("…and again here")]
        second: Span,
    },
    /// The proto2 `required` label.
    #[error("required fields are not allowed in proto3 syntax")]
    RequiredNotAllowed {
        /// The label.
        #[label("defined here")]
        span: Span,
    },
    /// A syntax declaration after another top-level statement.
    #[error("a syntax declaration must be the first statement in the file")]
    SyntaxNotFirst {
        /// The late declaration.
        #[label("defined here")]
        span: Span,
    },
    /// A syntax declaration naming anything but `"proto3"`.
    #[error("unknown syntax '{syntax}'")]
    #[diagnostic(help("the only supported value is 'proto3'"))]
    InvalidSyntaxValue {
        /// The declared value.
        syntax: String,
        /// Where it was declared.
        #[label("defined here")]
        span: Span,
    },
    /// More than 99 levels of nested messages.
    #[error("message nesting is too deep")]
    MaxNestingDepthExceeded {
        /// The declaration that crossed the ceiling.
        #[label("nested here")]
        span: Span,
    },
    /// A `repeated` or `optional` label on a map field.
    #[error("map fields cannot have labels")]
    MapFieldWithLabel {
        /// The label.
        #[label("defined here")]
        span: Span,
    },
    /// A `repeated` or `optional` label on a field inside a oneof.
    #[error("oneof fields cannot have labels")]
    OneofFieldWithLabel {
        /// The label.
        #[label("defined here")]
        span: Span,
    },
    /// An enum value number outside the int32 range.
    #[error("enum numbers must be between {} and {}", i32::MIN, i32::MAX)]
    InvalidEnumNumber {
        /// The number.
        #[label("defined here")]
        span: Span,
    },
    /// A known option assigned a value of the wrong shape.
    #[error("expected value to be {expected}, but found '{found}'")]
    InvalidOptionValue {
        /// The shape the option requires.
        expected: &'static str,
        /// The value that was found, as text.
        found: String,
        /// Where the value was found.
        #[label("defined here")]
        span: Span,
    },
    /// A reserved range whose end is less than its start.
    #[error("the end of a reserved range must not be less than the start")]
    InvalidReservedRange {
        /// The range.
        #[label("defined here")]
        span: Span,
    },
}

impl ParseError {
    pub(crate) fn new(kind: ParseErrorKind, source: impl Into<String>) -> Self {
        ParseError {
            kind: Box::new(kind),
            source_code: Arc::new(source.into()),
        }
    }

    /// Gets the rule that was violated.
    pub fn kind(&self) -> &ParseErrorKind {
        &self.kind
    }

    /// Consumes the error, returning the rule that was violated.
    pub fn into_kind(self) -> ParseErrorKind {
        *self.kind
    }

    /// Gets the primary source byte span associated with this error, if any.
    pub fn span(&self) -> Option<Span> {
        match &*self.kind {
            ParseErrorKind::UnexpectedCharacter { span } => Some(span.clone()),
            ParseErrorKind::UnterminatedString { span } => Some(span.clone()),
            ParseErrorKind::InvalidEscape { span } => Some(span.clone()),
            ParseErrorKind::UnterminatedComment { span } => Some(span.clone()),
            ParseErrorKind::InvalidNumber { span } => Some(span.clone()),
            ParseErrorKind::InvalidName { span, .. } => Some(span.clone()),
            ParseErrorKind::InvalidFieldNumber { span, .. } => Some(span.clone()),
            ParseErrorKind::InvalidOptionName { span } => Some(span.clone()),
            ParseErrorKind::InvalidStream { span } => Some(span.clone()),
            ParseErrorKind::InvalidMapKey { span, .. } => Some(span.clone()),
            ParseErrorKind::InvalidMapValue { span } => Some(span.clone()),
            ParseErrorKind::UnexpectedToken { span, .. } => Some(span.clone()),
            ParseErrorKind::UnexpectedEof { .. } => None,
            ParseErrorKind::MissingSemicolon { span, .. } => Some(span.clone()),
            ParseErrorKind::MissingType { span } => Some(span.clone()),
            ParseErrorKind::EmptyEnum { span } => Some(span.clone()),
            ParseErrorKind::EmptyOneof { span } => Some(span.clone()),
            ParseErrorKind::DuplicateFieldNumber { span, .. } => Some(span.clone()),
            ParseErrorKind::DuplicateFieldName { span, .. } => Some(span.clone()),
            ParseErrorKind::DuplicateEnumValue { span, .. } => Some(span.clone()),
            ParseErrorKind::EnumFirstValueNotZero { span } => Some(span.clone()),
            ParseErrorKind::ReservedFieldCollision { span, .. } => Some(span.clone()),
            ParseErrorKind::ReservedNameCollision { span, .. } => Some(span.clone()),
            ParseErrorKind::DuplicateTypeName { span, .. } => Some(span.clone()),
            ParseErrorKind::DuplicatePackage { second, .. } => Some(second.clone()),
            ParseErrorKind::DuplicateOption { second, .. } => Some(second.clone()),
            ParseErrorKind::RequiredNotAllowed { span } => Some(span.clone()),
            ParseErrorKind::SyntaxNotFirst { span } => Some(span.clone()),
            ParseErrorKind::InvalidSyntaxValue { span, .. } => Some(span.clone()),
            ParseErrorKind::MaxNestingDepthExceeded { span } => Some(span.clone()),
            ParseErrorKind::MapFieldWithLabel { span } => Some(span.clone()),
            ParseErrorKind::OneofFieldWithLabel { span } => Some(span.clone()),
            ParseErrorKind::InvalidEnumNumber { span } => Some(span.clone()),
            ParseErrorKind::InvalidOptionValue { span, .. } => Some(span.clone()),
            ParseErrorKind::InvalidReservedRange { span } => Some(span.clone()),
        }
    }

    /// Gets the 1-based line and column of the primary span, if any.
    pub fn position(&self) -> Option<(usize, usize)> {
        let span = self.span()?;
        let contents = self.source_code.read_span(&span.into(), 0, 0).ok()?;
        Some((contents.line() + 1, contents.column() + 1))
    }

    /// Overrides the source code attached to this error, e.g. to include the
    /// file name via [`miette::NamedSource`].
    pub fn with_source_code<S>(self, source: S) -> Self
    where
        S: SourceCode + 'static,
    {
        ParseError {
            kind: self.kind,
            source_code: Arc::new(source),
        }
    }
}

impl fmt::Debug for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some((line, column)) = self.position() {
            write!(f, "{}:{}: ", line, column)?;
        }
        write!(f, "{}", self)
    }
}

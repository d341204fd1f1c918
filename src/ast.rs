//! The abstract syntax tree produced by [`parse()`](crate::parse).
//!
//! All nodes are plain data: they carry no source spans and no behavior
//! beyond construction, equality and the [`OptionName`] display form. Every
//! list preserves source order.

use std::fmt;

/// A parsed proto3 source file.
#[derive(Debug, Clone, PartialEq)]
pub struct File {
    /// The declared syntax. `"proto3"` when no declaration is present.
    pub syntax: String,
    /// The dotted package name, if declared.
    pub package: std::option::Option<String>,
    /// `import` statements, in source order.
    pub imports: Vec<Import>,
    /// File-level options.
    pub options: Vec<Option>,
    /// Top-level messages.
    pub messages: Vec<Message>,
    /// Top-level enums.
    pub enums: Vec<Enum>,
    /// Top-level services.
    pub services: Vec<Service>,
}

impl Default for File {
    fn default() -> Self {
        File {
            syntax: "proto3".to_owned(),
            package: None,
            imports: Vec::new(),
            options: Vec::new(),
            messages: Vec::new(),
            enums: Vec::new(),
            services: Vec::new(),
        }
    }
}

/// An `import` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    /// The quoted path.
    pub path: String,
    /// The modifier, if any.
    pub kind: std::option::Option<ImportKind>,
}

/// Modifier on an [`Import`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    /// `import public "...";`
    Public,
    /// `import weak "...";`
    Weak,
}

/// A `message` definition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Message {
    /// The message name.
    pub name: String,
    /// Fields declared directly in the message body.
    pub fields: Vec<Field>,
    /// `oneof` groups.
    pub oneofs: Vec<Oneof>,
    /// Nested messages.
    pub messages: Vec<Message>,
    /// Nested enums.
    pub enums: Vec<Enum>,
    /// Message-level options.
    pub options: Vec<Option>,
    /// Reserved numbers and names, flattened across `reserved` statements.
    pub reserved: Vec<Reserved>,
}

/// A message field.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// The field name.
    pub name: String,
    /// The field number.
    pub number: i32,
    /// The field type.
    pub ty: Ty,
    /// Whether the field has a `repeated` label. Always false inside a oneof.
    pub repeated: bool,
    /// Whether the field has an `optional` label. Always false inside a oneof.
    pub optional: bool,
    /// Options from the bracketed list, e.g. `[deprecated = true]`.
    pub options: Vec<Option>,
}

/// A field type.
#[derive(Debug, Clone, PartialEq)]
pub enum Ty {
    /// A built-in scalar type.
    Scalar(Scalar),
    /// A reference to a message or enum by name.
    Named(TypeName),
    /// A `map<K, V>` type. The value is never itself a map.
    Map {
        /// The key type.
        key: KeyTy,
        /// The value type.
        value: Box<Ty>,
    },
}

/// The fifteen built-in scalar types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Scalar {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
}

/// The scalar types permitted as map keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum KeyTy {
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
}

/// A dotted type reference, e.g. `.google.protobuf.Empty` or `Bar`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeName {
    /// Whether the reference began with a `.`, denoting a fully-qualified name.
    pub leading_dot: bool,
    /// The dotted identifier segments.
    pub parts: Vec<String>,
}

/// A `oneof` group.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Oneof {
    /// The oneof name.
    pub name: String,
    /// Member fields. `repeated` and `optional` are always false here.
    pub fields: Vec<Field>,
    /// Options declared inside the oneof body.
    pub options: Vec<Option>,
}

/// An `enum` definition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Enum {
    /// The enum name.
    pub name: String,
    /// The values, in source order. Never empty.
    pub values: Vec<EnumValue>,
    /// Enum-level options.
    pub options: Vec<Option>,
    /// Reserved numbers and names.
    pub reserved: Vec<Reserved>,
}

/// A single value of an [`Enum`].
#[derive(Debug, Clone, PartialEq)]
pub struct EnumValue {
    /// The value name.
    pub name: String,
    /// The value number.
    pub number: i32,
    /// Options from the bracketed list.
    pub options: Vec<Option>,
}

/// A `service` definition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Service {
    /// The service name.
    pub name: String,
    /// The declared methods.
    pub rpcs: Vec<Rpc>,
    /// Service-level options.
    pub options: Vec<Option>,
}

/// An `rpc` method.
#[derive(Debug, Clone, PartialEq)]
pub struct Rpc {
    /// The method name.
    pub name: String,
    /// The request type.
    pub input_ty: TypeName,
    /// The response type.
    pub output_ty: TypeName,
    /// Whether the request is a `stream`.
    pub client_streaming: bool,
    /// Whether the response is a `stream`.
    pub server_streaming: bool,
    /// Options from the method body, if it had one.
    pub options: Vec<Option>,
}

/// An option assignment, at any scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Option {
    /// The option name.
    pub name: OptionName,
    /// The assigned value.
    pub value: OptionValue,
}

/// The name part of an [`Option`].
///
/// Either a plain dotted identifier (`java_package`, `foo.bar`) or a
/// parenthesised extension name with an optional dotted suffix
/// (`(my.ext)`, `(my.ext).field`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionName {
    /// The segments inside parentheses, for the extension form.
    pub extension: std::option::Option<Vec<String>>,
    /// The dotted segments following the extension part, or the whole name
    /// for the plain form.
    pub path: Vec<String>,
}

impl OptionName {
    pub(crate) fn plain(path: Vec<String>) -> Self {
        OptionName {
            extension: None,
            path,
        }
    }
}

impl fmt::Display for OptionName {
    /// Writes the normalised form: `(ext.name).suffix` or `plain.name`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut need_dot = false;
        if let Some(extension) = &self.extension {
            write!(f, "({})", extension.join("."))?;
            need_dot = true;
        }
        for part in &self.path {
            if need_dot {
                write!(f, ".")?;
            }
            write!(f, "{}", part)?;
            need_dot = true;
        }
        Ok(())
    }
}

/// The value of an [`Option`].
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    /// A string literal.
    String(String),
    /// An integer literal, with its sign applied.
    Int(i64),
    /// A floating-point literal, with its sign applied.
    Float(f64),
    /// `true` or `false`.
    Bool(bool),
    /// A bare (possibly dotted) identifier, such as an enum value reference.
    Ident(String),
    /// An array literal, `[v, v, ...]`.
    Array(Vec<OptionValue>),
    /// A message literal, `{ name: value ... }`. Keys for extension entries
    /// keep their brackets, e.g. `[my.ext]`.
    Message(Vec<(String, OptionValue)>),
}

/// A single entry of a `reserved` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reserved {
    /// A reserved number range.
    Range(ReservedRange),
    /// A reserved field or value name.
    Name(String),
}

/// An inclusive range of reserved numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservedRange {
    /// The first reserved number.
    pub start: i32,
    /// The last reserved number.
    pub end: i32,
}

impl ReservedRange {
    /// Whether `number` falls inside this range.
    pub fn contains(&self, number: i32) -> bool {
        self.start <= number && number <= self.end
    }
}

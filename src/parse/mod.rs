
use std::collections::HashSet;

use logos::{Lexer, Logos, Span};

use crate::ast;
use crate::error::{FieldNumberReason, ParseErrorKind};
use crate::lex::Token;
use crate::{join_span, MAX_FIELD_NUMBER, MAX_NESTING_DEPTH};

type Result<T, E = ParseErrorKind> = std::result::Result<T, E>;

pub(crate) fn parse_file(source: &str) -> Result<ast::File> {
    Parser::new(source).parse_file()
}

struct Parser<'a> {
    lexer: Lexer<'a, Token<'a>>,
    peek: Option<(Token<'a>, Span)>,
    depth: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NameKind {
    Message,
    Enum,
    Service,
    Rpc,
    Field,
    Oneof,
    Package,
}

impl NameKind {
    fn as_str(self) -> &'static str {
        match self {
            NameKind::Message => "message",
            NameKind::Enum => "enum",
            NameKind::Service => "service",
            NameKind::Rpc => "rpc",
            NameKind::Field => "field",
            NameKind::Oneof => "oneof",
            NameKind::Package => "package",
        }
    }

    fn is_valid(self, name: &str) -> bool {
        let first = name.as_bytes()[0];
        match self {
            NameKind::Message | NameKind::Enum | NameKind::Service | NameKind::Rpc => {
                first.is_ascii_uppercase()
            }
            NameKind::Field | NameKind::Oneof | NameKind::Package => {
                first.is_ascii_lowercase() || first == b'_'
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldContext {
    Message,
    Oneof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReservedContext {
    Message,
    Enum,
}

/// Bookkeeping for the numbers and names used within one message or enum
/// body, so that duplicates and reserved collisions are rejected at the
/// point a declaration is appended, in either statement order.
#[derive(Default)]
struct ScopeChecker {
    numbers: HashSet<i32>,
    names: HashSet<String>,
    reserved_ranges: Vec<ast::ReservedRange>,
    reserved_names: HashSet<String>,
}

impl ScopeChecker {
    fn check_field(&mut self, name: &str, name_span: Span, number: i32, number_span: Span) -> Result<()> {
        if !self.numbers.insert(number) {
            return Err(ParseErrorKind::DuplicateFieldNumber {
                number,
                span: number_span,
            });
        }
        if !self.names.insert(name.to_owned()) {
            return Err(ParseErrorKind::DuplicateFieldName {
                name: name.to_owned(),
                span: name_span,
            });
        }
        if self.is_reserved_number(number) {
            return Err(ParseErrorKind::ReservedFieldCollision {
                number,
                span: number_span,
            });
        }
        if self.reserved_names.contains(name) {
            return Err(ParseErrorKind::ReservedNameCollision {
                name: name.to_owned(),
                span: name_span,
            });
        }
        Ok(())
    }

    fn is_reserved_number(&self, number: i32) -> bool {
        self.reserved_ranges.iter().any(|range| range.contains(number))
    }

    fn add_reserved_range(&mut self, range: ast::ReservedRange, span: Span) -> Result<()> {
        if let Some(&number) = self.numbers.iter().find(|number| range.contains(**number)) {
            return Err(ParseErrorKind::ReservedFieldCollision { number, span });
        }
        self.reserved_ranges.push(range);
        Ok(())
    }

    fn add_reserved_name(&mut self, name: &str, span: Span) -> Result<()> {
        if self.names.contains(name) {
            return Err(ParseErrorKind::ReservedNameCollision {
                name: name.to_owned(),
                span,
            });
        }
        self.reserved_names.insert(name.to_owned());
        Ok(())
    }
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Parser {
            lexer: Token::lexer(source),
            peek: None,
            depth: 0,
        }
    }

    fn parse_file(&mut self) -> Result<ast::File> {
        let mut file = ast::File::default();
        let mut package_span: Option<Span> = None;
        let mut header_closed = false;
        let mut type_names: HashSet<String> = HashSet::new();
        let mut option_names: Vec<(String, Span)> = Vec::new();

        loop {
            match self.peek()? {
                None => break,
                Some((Token::Semicolon, _)) => {
                    self.bump();
                }
                Some((Token::Ident("syntax"), span)) => {
                    if header_closed {
                        return Err(ParseErrorKind::SyntaxNotFirst { span });
                    }
                    file.syntax = self.parse_syntax()?;
                    header_closed = true;
                }
                Some((Token::Ident("package"), span)) => {
                    header_closed = true;
                    if let Some(first) = package_span.clone() {
                        return Err(ParseErrorKind::DuplicatePackage {
                            first,
                            second: span,
                        });
                    }
                    package_span = Some(span);
                    file.package = Some(self.parse_package()?);
                }
                Some((Token::Ident("import"), _)) => {
                    header_closed = true;
                    file.imports.push(self.parse_import()?);
                }
                Some((Token::Ident("option"), _)) => {
                    header_closed = true;
                    let (option, span) = self.parse_option()?;
                    check_known_option(&option, span.clone())?;
                    let name = option.name.to_string();
                    if let Some((_, first)) = option_names.iter().find(|(seen, _)| *seen == name) {
                        return Err(ParseErrorKind::DuplicateOption {
                            name,
                            first: first.clone(),
                            second: span,
                        });
                    }
                    option_names.push((name, span));
                    file.options.push(option);
                }
                Some((Token::Ident("message"), _)) => {
                    header_closed = true;
                    let (message, span) = self.parse_message()?;
                    if !type_names.insert(message.name.clone()) {
                        return Err(ParseErrorKind::DuplicateTypeName {
                            name: message.name,
                            span,
                        });
                    }
                    file.messages.push(message);
                }
                Some((Token::Ident("enum"), _)) => {
                    header_closed = true;
                    let (enum_, span) = self.parse_enum()?;
                    if !type_names.insert(enum_.name.clone()) {
                        return Err(ParseErrorKind::DuplicateTypeName {
                            name: enum_.name,
                            span,
                        });
                    }
                    file.enums.push(enum_);
                }
                Some((Token::Ident("service"), _)) => {
                    header_closed = true;
                    let (service, span) = self.parse_service()?;
                    if !type_names.insert(service.name.clone()) {
                        return Err(ParseErrorKind::DuplicateTypeName {
                            name: service.name,
                            span,
                        });
                    }
                    file.services.push(service);
                }
                _ => {
                    return self.unexpected_token(
                        "'syntax', 'package', 'import', 'option', 'message', 'enum', 'service' or ';'",
                    )
                }
            }
        }

        Ok(file)
    }

    fn parse_syntax(&mut self) -> Result<String> {
        self.expect_eq(&Token::SYNTAX)?;
        self.expect_eq(&Token::Equals)?;
        let syntax = match self.peek()? {
            Some((Token::StringLiteral(value), span)) => {
                if value != "proto3" {
                    return Err(ParseErrorKind::InvalidSyntaxValue {
                        syntax: value.into_owned(),
                        span,
                    });
                }
                self.bump();
                value.into_owned()
            }
            _ => self.unexpected_token("a string literal")?,
        };
        self.expect_semicolon()?;
        Ok(syntax)
    }

    fn parse_package(&mut self) -> Result<String> {
        self.expect_eq(&Token::PACKAGE)?;
        let (mut name, _) = self.expect_name(NameKind::Package)?;
        while self.bump_if_eq(&Token::Dot)? {
            name.push('.');
            name.push_str(&self.expect_name(NameKind::Package)?.0);
        }
        self.expect_semicolon()?;
        Ok(name)
    }

    fn parse_import(&mut self) -> Result<ast::Import> {
        self.expect_eq(&Token::IMPORT)?;
        let kind = match self.peek()? {
            Some((Token::Ident("public"), _)) => {
                self.bump();
                Some(ast::ImportKind::Public)
            }
            Some((Token::Ident("weak"), _)) => {
                self.bump();
                Some(ast::ImportKind::Weak)
            }
            _ => None,
        };
        let path = match self.peek()? {
            Some((Token::StringLiteral(value), _)) => {
                self.bump();
                value.into_owned()
            }
            _ => self.unexpected_token("a string literal")?,
        };
        self.expect_semicolon()?;
        Ok(ast::Import { path, kind })
    }

    fn parse_message(&mut self) -> Result<(ast::Message, Span)> {
        let keyword_span = self.expect_eq(&Token::MESSAGE)?;
        let (name, name_span) = self.expect_name(NameKind::Message)?;

        self.depth += 1;
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(ParseErrorKind::MaxNestingDepthExceeded { span: keyword_span });
        }

        self.expect_eq(&Token::LeftBrace)?;

        let mut message = ast::Message {
            name,
            ..Default::default()
        };
        let mut checker = ScopeChecker::default();
        let mut type_names: HashSet<String> = HashSet::new();

        loop {
            match self.peek()? {
                Some((Token::RightBrace, _)) => {
                    self.bump();
                    break;
                }
                Some((Token::Semicolon, _)) => {
                    self.bump();
                }
                Some((Token::Ident("message"), _)) => {
                    let (nested, span) = self.parse_message()?;
                    if !type_names.insert(nested.name.clone()) {
                        return Err(ParseErrorKind::DuplicateTypeName {
                            name: nested.name,
                            span,
                        });
                    }
                    message.messages.push(nested);
                }
                Some((Token::Ident("enum"), _)) => {
                    let (nested, span) = self.parse_enum()?;
                    if !type_names.insert(nested.name.clone()) {
                        return Err(ParseErrorKind::DuplicateTypeName {
                            name: nested.name,
                            span,
                        });
                    }
                    message.enums.push(nested);
                }
                Some((Token::Ident("option"), _)) => {
                    let (option, span) = self.parse_option()?;
                    check_known_option(&option, span)?;
                    message.options.push(option);
                }
                Some((Token::Ident("oneof"), _)) => {
                    message.oneofs.push(self.parse_oneof(&mut checker)?);
                }
                Some((Token::Ident("reserved"), _)) => {
                    self.parse_reserved(ReservedContext::Message, &mut checker, &mut message.reserved)?;
                }
                Some((Token::Ident(_) | Token::Dot, _)) => {
                    let field = self.parse_field(FieldContext::Message, &mut checker)?;
                    message.fields.push(field);
                }
                _ => {
                    return self.unexpected_token(
                        "'message', 'enum', 'oneof', 'option', 'reserved', a field, '}' or ';'",
                    )
                }
            }
        }

        self.depth -= 1;
        Ok((message, name_span))
    }

    fn parse_field(&mut self, context: FieldContext, checker: &mut ScopeChecker) -> Result<ast::Field> {
        let mut repeated = false;
        let mut optional = false;
        let mut label_span: Option<Span> = None;

        match self.peek()? {
            Some((Token::Ident("repeated"), span)) => {
                self.bump();
                repeated = true;
                label_span = Some(span);
            }
            Some((Token::Ident("optional"), span)) => {
                self.bump();
                optional = true;
                label_span = Some(span);
            }
            Some((Token::Ident("required"), span)) => {
                return Err(ParseErrorKind::RequiredNotAllowed { span });
            }
            _ => (),
        }

        if let (FieldContext::Oneof, Some(span)) = (context, &label_span) {
            return Err(ParseErrorKind::OneofFieldWithLabel { span: span.clone() });
        }

        let ty = self.parse_field_type()?;
        if let (ast::Ty::Map { .. }, Some(span)) = (&ty, label_span) {
            return Err(ParseErrorKind::MapFieldWithLabel { span });
        }

        let (name, name_span) = self.expect_name(NameKind::Field)?;
        self.expect_eq(&Token::Equals)?;
        let (number, number_span) = self.parse_field_number()?;
        let options = match self.peek()? {
            Some((Token::LeftBracket, _)) => self.parse_options_list()?,
            _ => Vec::new(),
        };
        self.expect_semicolon()?;

        checker.check_field(&name, name_span, number, number_span)?;

        Ok(ast::Field {
            name,
            number,
            ty,
            repeated,
            optional,
            options,
        })
    }

    fn parse_field_type(&mut self) -> Result<ast::Ty> {
        match self.peek()? {
            Some((Token::Ident("map"), _)) => {
                self.bump();
                self.expect_eq(&Token::LeftAngleBracket)?;
                let key = self.parse_map_key()?;
                self.expect_eq(&Token::Comma)?;
                if let Some((Token::Ident("map"), span)) = self.peek()? {
                    return Err(ParseErrorKind::InvalidMapValue { span });
                }
                let value = self.parse_field_type()?;
                self.expect_eq(&Token::RightAngleBracket)?;
                Ok(ast::Ty::Map {
                    key,
                    value: Box::new(value),
                })
            }
            Some((Token::Ident(ident), _)) => match scalar_ty(ident) {
                Some(scalar) => {
                    self.bump();
                    Ok(ast::Ty::Scalar(scalar))
                }
                None => Ok(ast::Ty::Named(self.parse_type_name()?)),
            },
            Some((Token::Dot, _)) => Ok(ast::Ty::Named(self.parse_type_name()?)),
            _ => self.unexpected_token("a type name"),
        }
    }

    fn parse_map_key(&mut self) -> Result<ast::KeyTy> {
        match self.peek()? {
            Some((Token::Ident(ident), span)) => match key_ty(ident) {
                Some(key) => {
                    self.bump();
                    Ok(key)
                }
                None => Err(ParseErrorKind::InvalidMapKey {
                    ty: ident.to_owned(),
                    span,
                }),
            },
            Some((Token::Dot, span)) => Err(ParseErrorKind::InvalidMapKey {
                ty: ".".to_owned(),
                span,
            }),
            _ => self.unexpected_token("a map key type"),
        }
    }

    fn parse_type_name(&mut self) -> Result<ast::TypeName> {
        let leading_dot = self.bump_if_eq(&Token::Dot)?;
        let mut parts = vec![self.expect_ident()?.0];
        while self.bump_if_eq(&Token::Dot)? {
            parts.push(self.expect_ident()?.0);
        }
        Ok(ast::TypeName { leading_dot, parts })
    }

    fn parse_field_number(&mut self) -> Result<(i32, Span)> {
        match self.peek()? {
            Some((Token::IntLiteral(value), span)) => {
                self.bump();
                let number = check_field_number(value, span.clone())?;
                Ok((number, span))
            }
            _ => self.unexpected_token("a field number"),
        }
    }

    fn parse_oneof(&mut self, checker: &mut ScopeChecker) -> Result<ast::Oneof> {
        self.expect_eq(&Token::ONEOF)?;
        let (name, _) = self.expect_name(NameKind::Oneof)?;
        let body_start = self.expect_eq(&Token::LeftBrace)?;

        let mut oneof = ast::Oneof {
            name,
            ..Default::default()
        };

        loop {
            match self.peek()? {
                Some((Token::RightBrace, span)) => {
                    self.bump();
                    if oneof.fields.is_empty() {
                        return Err(ParseErrorKind::EmptyOneof {
                            span: join_span(body_start, span),
                        });
                    }
                    break;
                }
                Some((Token::Semicolon, _)) => {
                    self.bump();
                }
                Some((Token::Ident("option"), _)) => {
                    let (option, span) = self.parse_option()?;
                    check_known_option(&option, span)?;
                    oneof.options.push(option);
                }
                Some((Token::Ident(_) | Token::Dot, _)) => {
                    oneof.fields.push(self.parse_field(FieldContext::Oneof, checker)?);
                }
                _ => return self.unexpected_token("'option', a field, '}' or ';'"),
            }
        }

        Ok(oneof)
    }

    fn parse_reserved(
        &mut self,
        context: ReservedContext,
        checker: &mut ScopeChecker,
        out: &mut Vec<ast::Reserved>,
    ) -> Result<()> {
        self.expect_eq(&Token::RESERVED)?;
        match self.peek()? {
            Some((Token::StringLiteral(_), _)) => loop {
                let (name, span) = match self.peek()? {
                    Some((Token::StringLiteral(value), span)) => {
                        self.bump();
                        (value.into_owned(), span)
                    }
                    _ => self.unexpected_token("a string literal")?,
                };
                checker.add_reserved_name(&name, span)?;
                out.push(ast::Reserved::Name(name));
                if !self.bump_if_eq(&Token::Comma)? {
                    break;
                }
            },
            Some((Token::IntLiteral(_) | Token::Minus, _)) => loop {
                let (range, span) = self.parse_reserved_range(context)?;
                checker.add_reserved_range(range, span)?;
                out.push(ast::Reserved::Range(range));
                if !self.bump_if_eq(&Token::Comma)? {
                    break;
                }
            },
            _ => return self.unexpected_token("a number range or a string literal"),
        }
        self.expect_semicolon()?;
        Ok(())
    }

    fn parse_reserved_range(&mut self, context: ReservedContext) -> Result<(ast::ReservedRange, Span)> {
        let (start, start_span) = self.parse_reserved_bound(context)?;
        let (end, end_span) = if self.bump_if_eq(&Token::TO)? {
            match self.peek()? {
                Some((Token::Ident("max"), span)) => {
                    self.bump();
                    let max = match context {
                        ReservedContext::Message => MAX_FIELD_NUMBER,
                        ReservedContext::Enum => i32::MAX,
                    };
                    (max, span)
                }
                _ => self.parse_reserved_bound(context)?,
            }
        } else {
            (start, start_span.clone())
        };

        let span = join_span(start_span, end_span);
        if end < start {
            return Err(ParseErrorKind::InvalidReservedRange { span });
        }
        Ok((ast::ReservedRange { start, end }, span))
    }

    fn parse_reserved_bound(&mut self, context: ReservedContext) -> Result<(i32, Span)> {
        let negative = match context {
            ReservedContext::Enum => self.bump_if_eq(&Token::Minus)?,
            ReservedContext::Message => false,
        };
        match self.peek()? {
            Some((Token::IntLiteral(value), span)) => {
                self.bump();
                let bound = match context {
                    ReservedContext::Message => {
                        if value == 0 {
                            return Err(ParseErrorKind::InvalidFieldNumber {
                                number: value,
                                reason: FieldNumberReason::Zero,
                                span,
                            });
                        } else if value > MAX_FIELD_NUMBER as u64 {
                            return Err(ParseErrorKind::InvalidFieldNumber {
                                number: value,
                                reason: FieldNumberReason::TooLarge,
                                span,
                            });
                        }
                        value as i32
                    }
                    ReservedContext::Enum => {
                        let value = if negative {
                            -(value as i128)
                        } else {
                            value as i128
                        };
                        match i32::try_from(value) {
                            Ok(value) => value,
                            Err(_) => return Err(ParseErrorKind::InvalidEnumNumber { span }),
                        }
                    }
                };
                Ok((bound, span))
            }
            _ => self.unexpected_token("an integer"),
        }
    }

    fn parse_enum(&mut self) -> Result<(ast::Enum, Span)> {
        self.expect_eq(&Token::ENUM)?;
        let (name, name_span) = self.expect_name(NameKind::Enum)?;
        let body_start = self.expect_eq(&Token::LeftBrace)?;

        let mut enum_ = ast::Enum {
            name,
            ..Default::default()
        };
        let mut checker = ScopeChecker::default();
        let mut allow_alias = false;
        let mut numbers: Vec<(i32, Span)> = Vec::new();
        let mut first_number_span: Option<Span> = None;

        loop {
            match self.peek()? {
                Some((Token::RightBrace, span)) => {
                    self.bump();
                    if enum_.values.is_empty() {
                        return Err(ParseErrorKind::EmptyEnum {
                            span: join_span(body_start, span),
                        });
                    }
                    break;
                }
                Some((Token::Semicolon, _)) => {
                    self.bump();
                }
                Some((Token::Ident("option"), _)) => {
                    let (option, span) = self.parse_option()?;
                    check_known_option(&option, span)?;
                    if option.name.extension.is_none() && option.name.path == ["allow_alias"] {
                        if let ast::OptionValue::Bool(value) = &option.value {
                            allow_alias = *value;
                        }
                    }
                    enum_.options.push(option);
                }
                Some((Token::Ident("reserved"), _)) => {
                    self.parse_reserved(ReservedContext::Enum, &mut checker, &mut enum_.reserved)?;
                }
                Some((Token::Ident(_), _)) => {
                    let (value, value_name_span, number_span) = self.parse_enum_value()?;
                    if !checker.names.insert(value.name.clone()) {
                        return Err(ParseErrorKind::DuplicateEnumValue {
                            kind: "name",
                            value: value.name,
                            span: value_name_span,
                        });
                    }
                    if checker.reserved_names.contains(&value.name) {
                        return Err(ParseErrorKind::ReservedNameCollision {
                            name: value.name,
                            span: value_name_span,
                        });
                    }
                    if checker.is_reserved_number(value.number) {
                        return Err(ParseErrorKind::ReservedFieldCollision {
                            number: value.number,
                            span: number_span,
                        });
                    }
                    checker.numbers.insert(value.number);
                    if first_number_span.is_none() {
                        first_number_span = Some(number_span.clone());
                    }
                    numbers.push((value.number, number_span));
                    enum_.values.push(value);
                }
                _ => return self.unexpected_token("a value, 'option', 'reserved', '}' or ';'"),
            }
        }

        // Aliased numbers can only be rejected once the whole body has been
        // seen: allow_alias may lexically follow the alias.
        if !allow_alias {
            let mut seen = HashSet::new();
            for (number, span) in &numbers {
                if !seen.insert(*number) {
                    return Err(ParseErrorKind::DuplicateEnumValue {
                        kind: "number",
                        value: number.to_string(),
                        span: span.clone(),
                    });
                }
            }
        }

        let first = &enum_.values[0];
        if first.number != 0 && !(allow_alias && enum_.values.iter().any(|value| value.number == 0)) {
            return Err(ParseErrorKind::EnumFirstValueNotZero {
                span: first_number_span.expect("enum has a first value"),
            });
        }

        Ok((enum_, name_span))
    }

    fn parse_enum_value(&mut self) -> Result<(ast::EnumValue, Span, Span)> {
        let (name, name_span) = self.expect_ident()?;
        self.expect_eq(&Token::Equals)?;
        let negative = self.bump_if_eq(&Token::Minus)?;
        let (number, number_span) = match self.peek()? {
            Some((Token::IntLiteral(value), span)) => {
                self.bump();
                (check_enum_number(value, negative, span.clone())?, span)
            }
            _ => self.unexpected_token("an integer")?,
        };
        let options = match self.peek()? {
            Some((Token::LeftBracket, _)) => self.parse_options_list()?,
            _ => Vec::new(),
        };
        self.expect_semicolon()?;
        Ok((
            ast::EnumValue {
                name,
                number,
                options,
            },
            name_span,
            number_span,
        ))
    }

    fn parse_service(&mut self) -> Result<(ast::Service, Span)> {
        self.expect_eq(&Token::SERVICE)?;
        let (name, name_span) = self.expect_name(NameKind::Service)?;
        self.expect_eq(&Token::LeftBrace)?;

        let mut service = ast::Service {
            name,
            ..Default::default()
        };

        loop {
            match self.peek()? {
                Some((Token::RightBrace, _)) => {
                    self.bump();
                    break;
                }
                Some((Token::Semicolon, _)) => {
                    self.bump();
                }
                Some((Token::Ident("option"), _)) => {
                    let (option, span) = self.parse_option()?;
                    check_known_option(&option, span)?;
                    service.options.push(option);
                }
                Some((Token::Ident("rpc"), _)) => {
                    service.rpcs.push(self.parse_rpc()?);
                }
                _ => return self.unexpected_token("'rpc', 'option', '}' or ';'"),
            }
        }

        Ok((service, name_span))
    }

    fn parse_rpc(&mut self) -> Result<ast::Rpc> {
        self.expect_eq(&Token::RPC)?;
        let (name, _) = self.expect_name(NameKind::Rpc)?;
        let (input_ty, client_streaming) = self.parse_rpc_type()?;
        self.expect_eq(&Token::RETURNS)?;
        let (output_ty, server_streaming) = self.parse_rpc_type()?;

        let mut options = Vec::new();
        match self.peek()? {
            Some((Token::Semicolon, _)) => {
                self.bump();
            }
            Some((Token::LeftBrace, _)) => {
                self.bump();
                loop {
                    match self.peek()? {
                        Some((Token::RightBrace, _)) => {
                            self.bump();
                            break;
                        }
                        Some((Token::Semicolon, _)) => {
                            self.bump();
                        }
                        Some((Token::Ident("option"), _)) => {
                            let (option, span) = self.parse_option()?;
                            check_known_option(&option, span)?;
                            options.push(option);
                        }
                        _ => return self.unexpected_token("'option', '}' or ';'"),
                    }
                }
            }
            _ => return self.unexpected_token("';' or '{'"),
        }

        Ok(ast::Rpc {
            name,
            input_ty,
            output_ty,
            client_streaming,
            server_streaming,
            options,
        })
    }

    fn parse_rpc_type(&mut self) -> Result<(ast::TypeName, bool)> {
        self.expect_eq(&Token::LeftParen)?;
        if let Some((Token::RightParen, span)) = self.peek()? {
            return Err(ParseErrorKind::MissingType { span });
        }
        let streaming = match self.peek()? {
            Some((Token::Ident("stream"), _)) => {
                self.bump();
                match self.peek()? {
                    Some((Token::Ident("stream"), span)) => {
                        return Err(ParseErrorKind::InvalidStream { span })
                    }
                    Some((Token::RightParen, span)) => {
                        return Err(ParseErrorKind::MissingType { span })
                    }
                    _ => true,
                }
            }
            _ => false,
        };
        let ty = self.parse_type_name()?;
        self.expect_eq(&Token::RightParen)?;
        Ok((ty, streaming))
    }

    fn parse_option(&mut self) -> Result<(ast::Option, Span)> {
        self.expect_eq(&Token::OPTION)?;
        let (option, span) = self.parse_option_body()?;
        self.expect_semicolon()?;
        Ok((option, span))
    }

    fn parse_options_list(&mut self) -> Result<Vec<ast::Option>> {
        self.expect_eq(&Token::LeftBracket)?;
        let mut options = Vec::new();
        loop {
            let (option, span) = self.parse_option_body()?;
            check_known_option(&option, span)?;
            options.push(option);
            match self.peek()? {
                Some((Token::Comma, _)) => {
                    self.bump();
                }
                Some((Token::RightBracket, _)) => {
                    self.bump();
                    break;
                }
                _ => return self.unexpected_token("',' or ']'"),
            }
        }
        Ok(options)
    }

    fn parse_option_body(&mut self) -> Result<(ast::Option, Span)> {
        let (name, name_span) = self.parse_option_name()?;
        self.expect_eq(&Token::Equals)?;
        let value = self.parse_option_value()?;
        Ok((ast::Option { name, value }, name_span))
    }

    fn parse_option_name(&mut self) -> Result<(ast::OptionName, Span)> {
        match self.peek()? {
            Some((Token::LeftParen, open)) => {
                self.bump();
                let mut extension = vec![self.expect_option_ident()?.0];
                while self.bump_if_eq(&Token::Dot)? {
                    extension.push(self.expect_option_ident()?.0);
                }
                let mut end = self.expect_eq(&Token::RightParen)?;
                let mut path = Vec::new();
                while self.bump_if_eq(&Token::Dot)? {
                    let (part, span) = self.expect_option_ident()?;
                    path.push(part);
                    end = span;
                }
                Ok((
                    ast::OptionName {
                        extension: Some(extension),
                        path,
                    },
                    join_span(open, end),
                ))
            }
            Some((Token::Ident(_), _)) => {
                let (first, first_span) = self.expect_option_ident()?;
                let mut path = vec![first];
                let mut end = first_span.clone();
                while self.bump_if_eq(&Token::Dot)? {
                    let (part, span) = self.expect_option_ident()?;
                    path.push(part);
                    end = span;
                }
                Ok((ast::OptionName::plain(path), join_span(first_span, end)))
            }
            Some((_, span)) => Err(ParseErrorKind::InvalidOptionName { span }),
            None => Err(ParseErrorKind::UnexpectedEof {
                expected: "an option name".to_owned(),
            }),
        }
    }

    fn expect_option_ident(&mut self) -> Result<(String, Span)> {
        match self.peek()? {
            Some((Token::Ident(value), span)) => {
                let value = value.to_owned();
                self.bump();
                Ok((value, span))
            }
            Some((_, span)) => Err(ParseErrorKind::InvalidOptionName { span }),
            None => Err(ParseErrorKind::UnexpectedEof {
                expected: "an option name".to_owned(),
            }),
        }
    }

    fn parse_option_value(&mut self) -> Result<ast::OptionValue> {
        match self.peek()? {
            Some((Token::StringLiteral(value), _)) => {
                self.bump();
                Ok(ast::OptionValue::String(value.into_owned()))
            }
            Some((Token::IntLiteral(_) | Token::FloatLiteral(_), _)) => self.parse_number_value(false),
            Some((Token::Minus, _)) => {
                self.bump();
                self.parse_number_value(true)
            }
            Some((Token::Plus, _)) => {
                self.bump();
                self.parse_number_value(false)
            }
            Some((Token::Ident("true"), _)) => {
                self.bump();
                Ok(ast::OptionValue::Bool(true))
            }
            Some((Token::Ident("false"), _)) => {
                self.bump();
                Ok(ast::OptionValue::Bool(false))
            }
            Some((Token::Ident(_), _)) => {
                let (mut name, _) = self.expect_ident()?;
                while self.bump_if_eq(&Token::Dot)? {
                    name.push('.');
                    name.push_str(&self.expect_ident()?.0);
                }
                Ok(ast::OptionValue::Ident(name))
            }
            Some((Token::LeftBracket, _)) => {
                self.bump();
                let mut values = Vec::new();
                if !matches!(self.peek()?, Some((Token::RightBracket, _))) {
                    loop {
                        values.push(self.parse_option_value()?);
                        match self.peek()? {
                            Some((Token::Comma, _)) => {
                                self.bump();
                            }
                            Some((Token::RightBracket, _)) => break,
                            _ => return self.unexpected_token("',' or ']'"),
                        }
                    }
                }
                self.expect_eq(&Token::RightBracket)?;
                Ok(ast::OptionValue::Array(values))
            }
            Some((Token::LeftBrace, _)) => self.parse_message_value(),
            _ => self.unexpected_token("a constant"),
        }
    }

    fn parse_number_value(&mut self, negative: bool) -> Result<ast::OptionValue> {
        match self.peek()? {
            Some((Token::IntLiteral(value), span)) => {
                self.bump();
                let value = if negative {
                    -(value as i128)
                } else {
                    value as i128
                };
                match i64::try_from(value) {
                    Ok(value) => Ok(ast::OptionValue::Int(value)),
                    Err(_) => Err(ParseErrorKind::InvalidNumber { span }),
                }
            }
            Some((Token::FloatLiteral(value), _)) => {
                self.bump();
                Ok(ast::OptionValue::Float(if negative { -value } else { value }))
            }
            _ => self.unexpected_token("a numeric literal"),
        }
    }

    fn parse_message_value(&mut self) -> Result<ast::OptionValue> {
        self.expect_eq(&Token::LeftBrace)?;
        let mut entries = Vec::new();
        loop {
            match self.peek()? {
                Some((Token::RightBrace, _)) => {
                    self.bump();
                    break;
                }
                Some((Token::Comma | Token::Semicolon, _)) => {
                    self.bump();
                }
                Some((Token::Ident(_), _)) => {
                    let (name, _) = self.expect_ident()?;
                    entries.push((name, self.parse_message_entry_value()?));
                }
                Some((Token::LeftBracket, _)) => {
                    self.bump();
                    let (mut name, _) = self.expect_ident()?;
                    while self.bump_if_eq(&Token::Dot)? {
                        name.push('.');
                        name.push_str(&self.expect_ident()?.0);
                    }
                    self.expect_eq(&Token::RightBracket)?;
                    entries.push((format!("[{}]", name), self.parse_message_entry_value()?));
                }
                _ => return self.unexpected_token("a message literal entry or '}'"),
            }
        }
        Ok(ast::OptionValue::Message(entries))
    }

    fn parse_message_entry_value(&mut self) -> Result<ast::OptionValue> {
        // The colon is omissible before a nested message literal.
        if matches!(self.peek()?, Some((Token::LeftBrace, _))) {
            self.parse_message_value()
        } else {
            self.expect_eq(&Token::Colon)?;
            self.parse_option_value()
        }
    }

    fn expect_name(&mut self, kind: NameKind) -> Result<(String, Span)> {
        let (name, span) = match self.peek() {
            Ok(Some((Token::Ident(value), span))) => {
                let value = value.to_owned();
                self.bump();
                (value, span)
            }
            Ok(_) => return self.unexpected_token("an identifier"),
            // A lex error at name position means the name itself is
            // malformed, e.g. it contains non-ASCII letters.
            Err(ParseErrorKind::UnexpectedCharacter { span }) => {
                return Err(ParseErrorKind::InvalidName {
                    kind: kind.as_str(),
                    name: self.lexer.source()[span.clone()].to_owned(),
                    span,
                });
            }
            Err(err) => return Err(err),
        };
        if !kind.is_valid(&name) {
            return Err(ParseErrorKind::InvalidName {
                kind: kind.as_str(),
                name,
                span,
            });
        }
        Ok((name, span))
    }

    fn expect_ident(&mut self) -> Result<(String, Span)> {
        match self.peek()? {
            Some((Token::Ident(value), span)) => {
                let value = value.to_owned();
                self.bump();
                Ok((value, span))
            }
            _ => self.unexpected_token("an identifier"),
        }
    }

    fn expect_eq(&mut self, t: &Token) -> Result<Span> {
        match self.peek()? {
            Some((tok, span)) if tok == *t => {
                self.bump();
                Ok(span)
            }
            _ => self.unexpected_token(format!("'{}'", t)),
        }
    }

    fn expect_semicolon(&mut self) -> Result<()> {
        match self.peek()? {
            Some((Token::Semicolon, _)) => {
                self.bump();
                Ok(())
            }
            Some((found, span)) => Err(ParseErrorKind::MissingSemicolon {
                found: found.to_string(),
                span,
            }),
            None => Err(ParseErrorKind::UnexpectedEof {
                expected: "';'".to_owned(),
            }),
        }
    }

    fn bump_if_eq(&mut self, t: &Token) -> Result<bool> {
        match self.peek()? {
            Some((tok, _)) if tok == *t => {
                self.bump();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn bump(&mut self) -> (Token<'a>, Span) {
        self.peek
            .take()
            .expect("called bump without peek returning Some()")
    }

    fn peek(&mut self) -> Result<Option<(Token<'a>, Span)>> {
        if self.peek.is_none() {
            self.peek = match self.lexer.next() {
                Some(Ok(tok)) => {
                    // String and numeric callbacks report through the error
                    // slot while still yielding a token.
                    if let Some(err) = self.lexer.extras.error.take() {
                        return Err(err);
                    }
                    Some((tok, self.lexer.span()))
                }
                Some(Err(())) => {
                    let err = self.lexer.extras.error.take().unwrap_or(
                        ParseErrorKind::UnexpectedCharacter {
                            span: self.lexer.span(),
                        },
                    );
                    return Err(err);
                }
                None => {
                    if let Some(err) = self.lexer.extras.error.take() {
                        return Err(err);
                    }
                    None
                }
            };
        }
        Ok(self.peek.clone())
    }

    fn unexpected_token<T>(&mut self, expected: impl ToString) -> Result<T> {
        match self.peek()? {
            Some((found, span)) => Err(ParseErrorKind::UnexpectedToken {
                expected: expected.to_string(),
                found: found.to_string(),
                span,
            }),
            None => Err(ParseErrorKind::UnexpectedEof {
                expected: expected.to_string(),
            }),
        }
    }
}

fn check_field_number(number: u64, span: Span) -> Result<i32> {
    if number == 0 {
        Err(ParseErrorKind::InvalidFieldNumber {
            number,
            reason: FieldNumberReason::Zero,
            span,
        })
    } else if number > MAX_FIELD_NUMBER as u64 {
        Err(ParseErrorKind::InvalidFieldNumber {
            number,
            reason: FieldNumberReason::TooLarge,
            span,
        })
    } else if (19000..=19999).contains(&number) {
        Err(ParseErrorKind::InvalidFieldNumber {
            number,
            reason: FieldNumberReason::ReservedRange,
            span,
        })
    } else {
        Ok(number as i32)
    }
}

fn check_enum_number(number: u64, negative: bool, span: Span) -> Result<i32> {
    let number = if negative {
        -(number as i128)
    } else {
        number as i128
    };
    i32::try_from(number).map_err(|_| ParseErrorKind::InvalidEnumNumber { span })
}

/// Shape-checks the handful of well-known options the parser understands.
/// Custom options accept any value shape.
fn check_known_option(option: &ast::Option, span: Span) -> Result<()> {
    if option.name.extension.is_some() || option.name.path.len() != 1 {
        return Ok(());
    }
    let expected = match option.name.path[0].as_str() {
        "allow_alias" | "deprecated" | "cc_enable_arenas" | "java_multiple_files" => {
            match option.value {
                ast::OptionValue::Bool(_) => return Ok(()),
                _ => "a boolean",
            }
        }
        "java_package" | "java_outer_classname" | "go_package" | "csharp_namespace"
        | "objc_class_prefix" | "php_namespace" | "ruby_package" | "swift_prefix" => {
            match option.value {
                ast::OptionValue::String(_) => return Ok(()),
                _ => "a string",
            }
        }
        "optimize_for" => match &option.value {
            ast::OptionValue::Ident(value)
                if matches!(value.as_str(), "SPEED" | "CODE_SIZE" | "LITE_RUNTIME") =>
            {
                return Ok(())
            }
            _ => "one of 'SPEED', 'CODE_SIZE' or 'LITE_RUNTIME'",
        },
        _ => return Ok(()),
    };
    Err(ParseErrorKind::InvalidOptionValue {
        expected,
        found: value_text(&option.value),
        span,
    })
}

fn value_text(value: &ast::OptionValue) -> String {
    match value {
        ast::OptionValue::String(value) => value.clone(),
        ast::OptionValue::Int(value) => value.to_string(),
        ast::OptionValue::Float(value) => value.to_string(),
        ast::OptionValue::Bool(value) => value.to_string(),
        ast::OptionValue::Ident(value) => value.clone(),
        ast::OptionValue::Array(_) => "[...]".to_owned(),
        ast::OptionValue::Message(_) => "{...}".to_owned(),
    }
}

fn scalar_ty(ident: &str) -> Option<ast::Scalar> {
    match ident {
        "double" => Some(ast::Scalar::Double),
        "float" => Some(ast::Scalar::Float),
        "int32" => Some(ast::Scalar::Int32),
        "int64" => Some(ast::Scalar::Int64),
        "uint32" => Some(ast::Scalar::Uint32),
        "uint64" => Some(ast::Scalar::Uint64),
        "sint32" => Some(ast::Scalar::Sint32),
        "sint64" => Some(ast::Scalar::Sint64),
        "fixed32" => Some(ast::Scalar::Fixed32),
        "fixed64" => Some(ast::Scalar::Fixed64),
        "sfixed32" => Some(ast::Scalar::Sfixed32),
        "sfixed64" => Some(ast::Scalar::Sfixed64),
        "bool" => Some(ast::Scalar::Bool),
        "string" => Some(ast::Scalar::String),
        "bytes" => Some(ast::Scalar::Bytes),
        _ => None,
    }
}

fn key_ty(ident: &str) -> Option<ast::KeyTy> {
    match ident {
        "int32" => Some(ast::KeyTy::Int32),
        "int64" => Some(ast::KeyTy::Int64),
        "uint32" => Some(ast::KeyTy::Uint32),
        "uint64" => Some(ast::KeyTy::Uint64),
        "sint32" => Some(ast::KeyTy::Sint32),
        "sint64" => Some(ast::KeyTy::Sint64),
        "fixed32" => Some(ast::KeyTy::Fixed32),
        "fixed64" => Some(ast::KeyTy::Fixed64),
        "sfixed32" => Some(ast::KeyTy::Sfixed32),
        "sfixed64" => Some(ast::KeyTy::Sfixed64),
        "bool" => Some(ast::KeyTy::Bool),
        "string" => Some(ast::KeyTy::String),
        _ => None,
    }
}

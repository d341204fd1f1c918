use crate::ast::{self, KeyTy, Scalar};
use crate::{parse, ParseErrorKind};

fn parse_err(source: &str) -> ParseErrorKind {
    parse(source).unwrap_err().into_kind()
}

#[test]
fn empty_file() {
    assert_eq!(parse("").unwrap(), ast::File::default());
    assert_eq!(parse("  \n\t // comment\n").unwrap(), ast::File::default());
}

#[test]
fn syntax_declaration() {
    assert_eq!(parse(r#"syntax = "proto3";"#).unwrap(), ast::File::default());

    let err = parse(r#"syntax = "proto2";"#).unwrap_err();
    assert!(err.to_string().contains("syntax"));
    assert!(matches!(
        err.kind(),
        ParseErrorKind::InvalidSyntaxValue { syntax, .. } if syntax == "proto2"
    ));
    assert_eq!(err.position(), Some((1, 10)));
}

#[test]
fn syntax_defaults_to_proto3() {
    let file = parse("message A {}").unwrap();
    assert_eq!(file.syntax, "proto3");
}

#[test]
fn syntax_must_be_first() {
    assert!(matches!(
        parse(r#"package test; syntax = "proto3";"#),
        Err(err) if matches!(err.kind(), ParseErrorKind::SyntaxNotFirst { .. })
    ));
    // A second syntax declaration is late by definition.
    assert!(matches!(
        parse_err(r#"syntax = "proto3"; syntax = "proto3";"#),
        ParseErrorKind::SyntaxNotFirst { .. }
    ));
    // Stray semicolons do not close the file header.
    assert!(parse(r#"; syntax = "proto3";"#).is_ok());
}

#[test]
fn imports() {
    let file = parse(
        r#"syntax = "proto3";
        import public "a.proto";
        import weak "b.proto";
        import "c.proto";"#,
    )
    .unwrap();

    assert_eq!(
        file.imports,
        vec![
            ast::Import {
                path: "a.proto".to_owned(),
                kind: Some(ast::ImportKind::Public),
            },
            ast::Import {
                path: "b.proto".to_owned(),
                kind: Some(ast::ImportKind::Weak),
            },
            ast::Import {
                path: "c.proto".to_owned(),
                kind: None,
            },
        ]
    );
}

#[test]
fn packages() {
    let file = parse("package example.v1;").unwrap();
    assert_eq!(file.package.as_deref(), Some("example.v1"));

    assert!(matches!(
        parse_err("package a; package b;"),
        ParseErrorKind::DuplicatePackage { .. }
    ));
}

#[test]
fn duplicate_field_number() {
    assert!(matches!(
        parse_err("message Test { string name = 1; int32 id = 1; }"),
        ParseErrorKind::DuplicateFieldNumber { number: 1, .. }
    ));
}

#[test]
fn reserved_field_collision() {
    assert!(matches!(
        parse_err("message Test { reserved 2, 15, 9 to 11; string name = 2; }"),
        ParseErrorKind::ReservedFieldCollision { number: 2, .. }
    ));
}

#[test]
fn enum_first_value_not_zero() {
    assert!(matches!(
        parse_err("enum E { FIRST = 1; }"),
        ParseErrorKind::EnumFirstValueNotZero { .. }
    ));
}

#[test]
fn enum_aliases() {
    let file = parse("enum E { option allow_alias = true; U = 0; A = 1; B = 1; }").unwrap();
    assert_eq!(file.enums[0].values.len(), 3);
}

#[test]
fn invalid_map_key() {
    assert!(matches!(
        parse_err("message Test { map<float, string> m = 1; }"),
        ParseErrorKind::InvalidMapKey { .. }
    ));
}

#[test]
fn repeated_map_field() {
    assert!(matches!(
        parse_err("message Test { repeated map<string, string> m = 1; }"),
        ParseErrorKind::MapFieldWithLabel { .. }
    ));
}

#[test]
fn streaming_rpc() {
    let file = parse("service S { rpc M (stream Req) returns (stream Resp); }").unwrap();
    let rpc = &file.services[0].rpcs[0];
    assert!(rpc.client_streaming);
    assert!(rpc.server_streaming);
}

#[test]
fn nesting_depth() {
    let mut deep = String::new();
    for i in 0..100 {
        deep.push_str(&format!("message M{} {{ ", i));
    }
    deep.push_str(&"} ".repeat(100));
    assert!(matches!(
        parse_err(&deep),
        ParseErrorKind::MaxNestingDepthExceeded { .. }
    ));

    let mut ok = String::new();
    for i in 0..99 {
        ok.push_str(&format!("message M{} {{ ", i));
    }
    ok.push_str(&"} ".repeat(99));
    assert!(parse(&ok).is_ok());
}

#[test]
fn non_ascii_name() {
    assert!(matches!(
        parse_err("message 测试 {}"),
        ParseErrorKind::InvalidName {
            kind: "message",
            ..
        }
    ));
}

#[test]
fn empty_oneof() {
    assert!(matches!(
        parse_err("message Test { oneof test {} }"),
        ParseErrorKind::EmptyOneof { .. }
    ));
}

#[test]
fn duplicate_type_name() {
    assert!(matches!(
        parse_err("message Test {} enum Test { A = 0; }"),
        ParseErrorKind::DuplicateTypeName { name, .. } if name == "Test"
    ));
    assert!(matches!(
        parse_err("message Test {} service Test {}"),
        ParseErrorKind::DuplicateTypeName { .. }
    ));
}

#[test]
fn duplicate_file_option() {
    let err = parse_err(r#"option java_package = "a"; option java_package = "b";"#);
    assert!(matches!(
        err,
        ParseErrorKind::DuplicateOption { ref name, .. } if name == "java_package"
    ));

    // Normalisation is whitespace-insensitive.
    assert!(matches!(
        parse_err("option foo.bar = 1; option foo . bar = 2;"),
        ParseErrorKind::DuplicateOption { .. }
    ));

    // Message-scope duplicates are left to downstream validation.
    assert!(parse("message M { option foo = 1; option foo = 2; }").is_ok());
}

#[test]
fn whitespace_tolerance() {
    let compact = "syntax=\"proto3\";message A{string b=1;}";
    let spaced = "syntax = \"proto3\" ;\n\n message A {\n\tstring b = 1 ;\n }";
    assert_eq!(parse(compact).unwrap(), parse(spaced).unwrap());
}

#[test]
fn fail_fast_reports_first_error() {
    // The invalid message name precedes the invalid field number.
    assert!(matches!(
        parse_err("message test { string a = 0; }"),
        ParseErrorKind::InvalidName {
            kind: "message",
            ..
        }
    ));
}

#[test]
fn error_positions_are_in_source() {
    let err = parse("syntax = \"proto3\";\nmessage foo {}").unwrap_err();
    assert_eq!(err.position(), Some((2, 9)));

    let source = "message Test { string name = 1; int32 id = 1; }";
    let err = parse(source).unwrap_err();
    let span = err.span().unwrap();
    assert!(span.end <= source.len());
    assert_eq!(err.position(), Some((1, 44)));
}

#[test]
fn kitchen_sink() {
    let file = parse(
        r#"
        syntax = "proto3";

        package example.v1;

        import "other.proto";
        import public "pub.proto";

        option java_package = "com.example.v1";
        option (custom.opt).detail = { name: "x", count: 2 };

        message Person {
            option deprecated = true;

            reserved 100 to 199, 300;
            reserved "legacy_id";

            string name = 1;
            int32 id = 2 [deprecated = true, (custom.field) = FOO];
            repeated .example.Address addresses = 3;
            map<string, Project> projects = 4;

            oneof contact {
                string email = 5;
                uint64 phone = 6;
            }

            message Address {
                string line1 = 1;
            }

            enum Kind {
                KIND_UNSPECIFIED = 0;
                KIND_EMPLOYEE = 1;
            }
        }

        enum Status {
            option allow_alias = true;
            STATUS_UNSPECIFIED = 0;
            STATUS_ACTIVE = 1;
            STATUS_ENABLED = 1;
        }

        service Directory {
            rpc Lookup (LookupRequest) returns (stream Person) {
                option idempotency_level = NO_SIDE_EFFECTS;
            }
            rpc Watch (stream WatchRequest) returns (stream WatchReply);
        }
        "#,
    )
    .unwrap();

    assert_eq!(file.syntax, "proto3");
    assert_eq!(file.package.as_deref(), Some("example.v1"));
    assert_eq!(file.imports.len(), 2);
    assert_eq!(file.options.len(), 2);
    assert_eq!(file.options[1].name.to_string(), "(custom.opt).detail");
    assert_eq!(
        file.options[1].value,
        ast::OptionValue::Message(vec![
            ("name".to_owned(), ast::OptionValue::String("x".to_owned())),
            ("count".to_owned(), ast::OptionValue::Int(2)),
        ])
    );

    let person = &file.messages[0];
    assert_eq!(person.name, "Person");
    assert_eq!(person.options.len(), 1);
    assert_eq!(
        person.reserved,
        vec![
            ast::Reserved::Range(ast::ReservedRange {
                start: 100,
                end: 199,
            }),
            ast::Reserved::Range(ast::ReservedRange {
                start: 300,
                end: 300,
            }),
            ast::Reserved::Name("legacy_id".to_owned()),
        ]
    );
    assert_eq!(person.fields.len(), 4);
    assert_eq!(person.fields[0].ty, ast::Ty::Scalar(Scalar::String));
    assert_eq!(person.fields[1].options.len(), 2);
    assert_eq!(
        person.fields[1].options[1].value,
        ast::OptionValue::Ident("FOO".to_owned())
    );
    assert!(person.fields[2].repeated);
    assert_eq!(
        person.fields[2].ty,
        ast::Ty::Named(ast::TypeName {
            leading_dot: true,
            parts: vec!["example".to_owned(), "Address".to_owned()],
        })
    );
    assert_eq!(
        person.fields[3].ty,
        ast::Ty::Map {
            key: KeyTy::String,
            value: Box::new(ast::Ty::Named(ast::TypeName {
                leading_dot: false,
                parts: vec!["Project".to_owned()],
            })),
        }
    );
    assert_eq!(person.oneofs[0].name, "contact");
    assert_eq!(person.oneofs[0].fields.len(), 2);
    assert_eq!(person.messages[0].name, "Address");
    assert_eq!(person.enums[0].name, "Kind");

    let status = &file.enums[0];
    assert_eq!(status.values.len(), 3);
    assert_eq!(status.values[2].number, 1);

    let directory = &file.services[0];
    assert_eq!(directory.rpcs.len(), 2);
    assert!(!directory.rpcs[0].client_streaming);
    assert!(directory.rpcs[0].server_streaming);
    assert_eq!(directory.rpcs[0].options.len(), 1);
    assert!(directory.rpcs[1].client_streaming);
    assert!(directory.rpcs[1].server_streaming);
}

use super::*;

#[test]
fn simple_tokens() {
    let source = r#"hell0 052 42 0x2A 5. 0.5 0.42e+2 2e-4 .2e+3 _foo"#;
    let mut lexer = Token::lexer(source);

    assert_eq!(lexer.next(), Some(Ok(Token::Ident("hell0"))));
    assert_eq!(lexer.next(), Some(Ok(Token::IntLiteral(42))));
    assert_eq!(lexer.next(), Some(Ok(Token::IntLiteral(42))));
    assert_eq!(lexer.next(), Some(Ok(Token::IntLiteral(42))));
    assert_eq!(lexer.next(), Some(Ok(Token::FloatLiteral(5.))));
    assert_eq!(lexer.next(), Some(Ok(Token::FloatLiteral(0.5))));
    assert_eq!(lexer.next(), Some(Ok(Token::FloatLiteral(0.42e+2))));
    assert_eq!(lexer.next(), Some(Ok(Token::FloatLiteral(2e-4))));
    assert_eq!(lexer.next(), Some(Ok(Token::FloatLiteral(0.2e+3))));
    assert_eq!(lexer.next(), Some(Ok(Token::Ident("_foo"))));
    assert_eq!(lexer.next(), None);

    assert_eq!(lexer.extras.error, None);
}

#[test]
fn punctuation() {
    let source = "{ } ( ) [ ] < > ; , = . : - +";
    let mut lexer = Token::lexer(source);

    assert_eq!(lexer.next(), Some(Ok(Token::LeftBrace)));
    assert_eq!(lexer.next(), Some(Ok(Token::RightBrace)));
    assert_eq!(lexer.next(), Some(Ok(Token::LeftParen)));
    assert_eq!(lexer.next(), Some(Ok(Token::RightParen)));
    assert_eq!(lexer.next(), Some(Ok(Token::LeftBracket)));
    assert_eq!(lexer.next(), Some(Ok(Token::RightBracket)));
    assert_eq!(lexer.next(), Some(Ok(Token::LeftAngleBracket)));
    assert_eq!(lexer.next(), Some(Ok(Token::RightAngleBracket)));
    assert_eq!(lexer.next(), Some(Ok(Token::Semicolon)));
    assert_eq!(lexer.next(), Some(Ok(Token::Comma)));
    assert_eq!(lexer.next(), Some(Ok(Token::Equals)));
    assert_eq!(lexer.next(), Some(Ok(Token::Dot)));
    assert_eq!(lexer.next(), Some(Ok(Token::Colon)));
    assert_eq!(lexer.next(), Some(Ok(Token::Minus)));
    assert_eq!(lexer.next(), Some(Ok(Token::Plus)));
    assert_eq!(lexer.next(), None);

    assert_eq!(lexer.extras.error, None);
}

#[test]
fn keywords_are_identifiers() {
    let mut lexer = Token::lexer("message stream reserved to max true");

    assert_eq!(lexer.next(), Some(Ok(Token::Ident("message"))));
    assert_eq!(lexer.next(), Some(Ok(Token::Ident("stream"))));
    assert_eq!(lexer.next(), Some(Ok(Token::Ident("reserved"))));
    assert_eq!(lexer.next(), Some(Ok(Token::Ident("to"))));
    assert_eq!(lexer.next(), Some(Ok(Token::Ident("max"))));
    assert_eq!(lexer.next(), Some(Ok(Token::Ident("true"))));
    assert_eq!(lexer.next(), None);
}

#[test]
fn string_escapes() {
    let source = r#""hello \n\t\r\0\\\'\" \x41 B""#;
    let mut lexer = Token::lexer(source);

    assert_eq!(
        lexer.next(),
        Some(Ok(Token::StringLiteral("hello \n\t\r\0\\'\" A B".into())))
    );
    assert_eq!(lexer.next(), None);
    assert_eq!(lexer.extras.error, None);
}

#[test]
fn single_quoted_string() {
    let mut lexer = Token::lexer(r#"'abc "def"'"#);

    assert_eq!(
        lexer.next(),
        Some(Ok(Token::StringLiteral("abc \"def\"".into())))
    );
    assert_eq!(lexer.next(), None);
    assert_eq!(lexer.extras.error, None);
}

#[test]
fn invalid_string_escape() {
    let source = r#""\m" foo"#;
    let mut lexer = Token::lexer(source);

    assert!(matches!(lexer.next(), Some(Ok(Token::StringLiteral(_)))));
    assert_eq!(
        lexer.extras.error,
        Some(ParseErrorKind::InvalidEscape { span: 1..2 })
    );
}

#[test]
fn surrogate_unicode_escape() {
    let source = r#""\ud800""#;
    let mut lexer = Token::lexer(source);

    assert!(matches!(lexer.next(), Some(Ok(Token::StringLiteral(_)))));
    assert!(matches!(
        lexer.extras.error,
        Some(ParseErrorKind::InvalidEscape { .. })
    ));
}

#[test]
fn unterminated_string() {
    let source = "\"hello \n foo";
    let mut lexer = Token::lexer(source);

    assert_eq!(
        lexer.next(),
        Some(Ok(Token::StringLiteral("hello ".into())))
    );
    assert_eq!(
        lexer.extras.error,
        Some(ParseErrorKind::UnterminatedString { span: 0..1 })
    );
}

#[test]
fn unterminated_string_at_eof() {
    let mut lexer = Token::lexer("\"hello");

    assert_eq!(
        lexer.next(),
        Some(Ok(Token::StringLiteral("hello".into())))
    );
    assert_eq!(lexer.next(), None);
    assert_eq!(
        lexer.extras.error,
        Some(ParseErrorKind::UnterminatedString { span: 0..1 })
    );
}

#[test]
fn comments_are_skipped() {
    let source = "foo // line\nbar /* block\n comment */ quz";
    let mut lexer = Token::lexer(source);

    assert_eq!(lexer.next(), Some(Ok(Token::Ident("foo"))));
    assert_eq!(lexer.next(), Some(Ok(Token::Ident("bar"))));
    assert_eq!(lexer.next(), Some(Ok(Token::Ident("quz"))));
    assert_eq!(lexer.next(), None);
    assert_eq!(lexer.extras.error, None);
}

#[test]
fn block_comments_do_not_nest() {
    // The inner /* does not open a nested comment; the first */ closes it.
    let mut lexer = Token::lexer("/* a /* b */ c");

    assert_eq!(lexer.next(), Some(Ok(Token::Ident("c"))));
    assert_eq!(lexer.next(), None);
    assert_eq!(lexer.extras.error, None);
}

#[test]
fn unterminated_block_comment() {
    let source = "foo /* bar";
    let mut lexer = Token::lexer(source);

    assert_eq!(lexer.next(), Some(Ok(Token::Ident("foo"))));
    assert_eq!(lexer.next(), None);
    assert_eq!(
        lexer.extras.error,
        Some(ParseErrorKind::UnterminatedComment { span: 4..6 })
    );
}

#[test]
fn integer_overflow() {
    let source = "99999999999999999999999999999999999999";
    let mut lexer = Token::lexer(source);

    assert_eq!(lexer.next(), Some(Ok(Token::IntLiteral(0))));
    assert_eq!(
        lexer.extras.error,
        Some(ParseErrorKind::InvalidNumber {
            span: 0..source.len()
        })
    );
}

#[test]
fn malformed_numbers() {
    let mut lexer = Token::lexer("08");
    assert_eq!(lexer.next(), Some(Ok(Token::IntLiteral(0))));
    assert_eq!(
        lexer.extras.error,
        Some(ParseErrorKind::InvalidNumber { span: 0..1 })
    );

    let mut lexer = Token::lexer("0x");
    assert_eq!(lexer.next(), Some(Ok(Token::IntLiteral(0))));
    assert_eq!(
        lexer.extras.error,
        Some(ParseErrorKind::InvalidNumber { span: 0..1 })
    );

    let mut lexer = Token::lexer("123abc");
    assert_eq!(lexer.next(), Some(Ok(Token::IntLiteral(123))));
    assert_eq!(
        lexer.extras.error,
        Some(ParseErrorKind::InvalidNumber { span: 0..3 })
    );
}

#[test]
fn invalid_token() {
    let mut lexer = Token::lexer("@ foo");

    assert_eq!(lexer.next(), Some(Err(())));
    assert_eq!(lexer.next(), Some(Ok(Token::Ident("foo"))));
    assert_eq!(lexer.next(), None);
}

#[test]
fn non_ascii_identifier() {
    let mut lexer = Token::lexer("测试");

    assert_eq!(lexer.next(), Some(Err(())));
}

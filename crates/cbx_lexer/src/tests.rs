use super::*;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn kinds(source: &str) -> Vec<TokenKind> {
    lex(source)
        .unwrap_or_else(|e| panic!("lex failed: {e}"))
        .tokens
        .into_iter()
        .map(|t| t.kind)
        .collect()
}

fn ident(s: &str) -> TokenKind {
    TokenKind::Ident(Name::from(s))
}

#[test]
fn lexes_require_call() {
    assert_eq!(
        kinds("const a = require('./a');"),
        vec![
            ident("const"),
            ident("a"),
            TokenKind::Punct(Punct::Eq),
            ident("require"),
            TokenKind::Punct(Punct::LParen),
            TokenKind::Str(Name::from("./a")),
            TokenKind::Punct(Punct::RParen),
            TokenKind::Punct(Punct::Semi),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn longest_punctuator_wins() {
    assert_eq!(
        kinds("a >>>= b ?? c?.d === e"),
        vec![
            ident("a"),
            TokenKind::Punct(Punct::UShrEq),
            ident("b"),
            TokenKind::Punct(Punct::QuestionQuestion),
            ident("c"),
            TokenKind::Punct(Punct::QuestionDot),
            ident("d"),
            TokenKind::Punct(Punct::EqEqEq),
            ident("e"),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn numbers_in_every_radix() {
    assert_eq!(
        kinds("0x1F 0o17 0b101 1_000 .5 2e3"),
        vec![
            TokenKind::Number(31.0),
            TokenKind::Number(15.0),
            TokenKind::Number(5.0),
            TokenKind::Number(1000.0),
            TokenKind::Number(0.5),
            TokenKind::Number(2000.0),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn string_escapes_are_cooked() {
    assert_eq!(
        kinds(r#""a\nA\u{42}\x43\"""#),
        vec![TokenKind::Str(Name::from("a\nABC\"")), TokenKind::Eof]
    );
}

#[test]
fn newline_flag_tracks_line_breaks() {
    let tokens = lex("a\nb /* x\ny */ c // tail\nd").unwrap_or_else(|e| panic!("{e}")).tokens;
    let flags: Vec<bool> = tokens.iter().map(|t| t.newline_before).collect();
    assert_eq!(flags, vec![false, true, true, true, false]);
}

#[test]
fn comments_are_kept_aside() {
    let list = lex(r#"import(/* webpackMode: "eager" */ "./a")"#)
        .unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(list.comments.len(), 1);
    assert_eq!(&*list.comments[0].text, r#" webpackMode: "eager" "#);
    assert!(list.comments[0].block);
    assert_eq!(list.comments_between(7, 34).count(), 1);
}

#[test]
fn template_records_expression_spans() {
    let source = "`./dir/${name}.js`";
    let list = lex(source).unwrap_or_else(|e| panic!("{e}"));
    let TokenKind::Template(template) = &list.tokens[0].kind else {
        panic!("expected template, got {:?}", list.tokens[0].kind);
    };
    assert_eq!(
        template.quasis,
        vec![Name::from("./dir/"), Name::from(".js")]
    );
    assert_eq!(template.exprs.len(), 1);
    assert_eq!(&source[template.exprs[0].range()], "name");
}

#[test]
fn nested_template_and_braces_in_hole() {
    let source = "`a${ { b: `c${d}` }.b }e`";
    let list = lex(source).unwrap_or_else(|e| panic!("{e}"));
    let TokenKind::Template(template) = &list.tokens[0].kind else {
        panic!("expected template");
    };
    assert_eq!(&source[template.exprs[0].range()], " { b: `c${d}` }.b ");
    assert_eq!(list.tokens.len(), 2);
}

#[test]
fn offset_shifts_spans() {
    let list = lex_with_offset("x", 40).unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(list.tokens[0].span, Span::new(40, 41));
}

#[test]
fn hashbang_is_skipped() {
    assert_eq!(kinds("#!/usr/bin/env node\nx"), vec![ident("x"), TokenKind::Eof]);
}

#[test]
fn unterminated_string_is_reported() {
    let err = lex("let s = 'abc").err().unwrap_or_else(|| panic!("expected error"));
    assert_eq!(err.kind, LexErrorKind::UnterminatedString);
}

#[test]
fn unterminated_comment_is_reported() {
    let err = lex("a /* never closed").err().unwrap_or_else(|| panic!("expected error"));
    assert_eq!(err.kind, LexErrorKind::UnterminatedComment);
}

#[test]
fn unexpected_character_is_reported() {
    let err = lex("a # b").err().unwrap_or_else(|| panic!("expected error"));
    assert_eq!(err.kind, LexErrorKind::UnexpectedChar('#'));
    assert_eq!(err.span, Span::new(2, 3));
}

proptest! {
    #[test]
    fn identifiers_lex_to_one_token(name in "[A-Za-z_$][A-Za-z0-9_$]{0,16}") {
        let tokens = kinds(&name);
        prop_assert_eq!(tokens, vec![ident(&name), TokenKind::Eof]);
    }

    #[test]
    fn integers_lex_to_their_value(n in 0u32..1_000_000) {
        let tokens = kinds(&n.to_string());
        prop_assert_eq!(tokens, vec![TokenKind::Number(f64::from(n)), TokenKind::Eof]);
    }
}

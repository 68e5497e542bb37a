use super::*;
use pretty_assertions::assert_eq;

fn name(s: &str) -> Name {
    Name::from(s)
}

#[test]
fn bound_names_walks_nested_patterns() {
    let pattern = Pattern::Object {
        props: vec![
            ObjectPatternProp {
                key: PropKey::Named(name("a")),
                value: Pattern::Ident(name("a")),
                default: None,
            },
            ObjectPatternProp {
                key: PropKey::Named(name("b")),
                value: Pattern::Array {
                    elements: vec![
                        None,
                        Some(PatternElement {
                            pattern: Pattern::Ident(name("c")),
                            default: None,
                        }),
                    ],
                    rest: Some(Box::new(Pattern::Ident(name("d")))),
                },
                default: None,
            },
        ],
        rest: Some(name("e")),
    };

    let mut out = Vec::new();
    pattern.bound_names(&mut out);
    assert_eq!(out, vec![name("a"), name("c"), name("d"), name("e")]);
}

#[test]
fn arity_stops_at_default_or_rest() {
    let param = |n: &str, default: bool, rest: bool| Param {
        pattern: Pattern::Ident(name(n)),
        default: default.then(|| Expr::new(ExprKind::Number(1.0), Span::DUMMY)),
        rest,
    };
    let function = Function {
        name: None,
        params: vec![param("a", false, false), param("b", true, false), param("c", false, true)],
        body: FunctionBody::Block(Vec::new()),
        is_arrow: false,
        is_async: false,
        span: Span::DUMMY,
    };
    assert_eq!(function.arity(), 1);
}

#[test]
fn loading_strategy_annotations() {
    assert_eq!(LoadingStrategy::from_annotation("lazy-once"), Some(LoadingStrategy::LazyOnce));
    assert_eq!(LoadingStrategy::from_annotation("weak"), Some(LoadingStrategy::Weak));
    assert_eq!(LoadingStrategy::from_annotation("sometimes"), None);
    assert_eq!(LoadingStrategy::default().to_string(), "lazy");
}

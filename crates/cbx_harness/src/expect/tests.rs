#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::rc::Rc;

use pretty_assertions::assert_eq;

use crate::test_support::{graph, Graph};

/// Run `code`; the message of what it threw, if anything.
fn failure(g: &mut Graph, code: &str) -> Option<String> {
    let wrapped = format!("let failed = null; try {{ {code} }} catch (e) {{ failed = e.message; }} failed");
    let resolver = Rc::clone(&g.resolver);
    let result = resolver.sandbox().run(&mut g.interp, &wrapped, "expect.js").unwrap();
    result.as_str().map(str::to_string)
}

#[track_caller]
fn passes(g: &mut Graph, code: &str) {
    assert_eq!(failure(g, code), None, "{code}");
}

#[track_caller]
fn fails(g: &mut Graph, code: &str) -> String {
    failure(g, code).unwrap_or_else(|| panic!("expected a failure: {code}"))
}

#[test]
fn passing_matchers() {
    let mut g = graph(&[]);
    for code in [
        "expect(1).toBe(1)",
        "expect(NaN).toBe(NaN)",
        "expect({ a: [1, { b: 2 }] }).toEqual({ a: [1, { b: 2 }] })",
        "expect({ a: 1 }).toStrictEqual({ a: 1 })",
        "expect('x').toBeTruthy()",
        "expect(0).toBeFalsy()",
        "expect(null).toBeNull()",
        "expect(undefined).toBeUndefined()",
        "expect(0).toBeDefined()",
        "expect(0 / 0).toBeNaN()",
        "expect([1, 2, 3]).toContain(2)",
        "expect('haystack').toContain('st')",
        "expect('hello world').toMatch('o w')",
        "expect([1, 2]).toHaveLength(2)",
        "expect('abc').toHaveLength(3)",
        "expect({ a: { b: 1 } }).toHaveProperty('a.b', 1)",
        "expect({ a: { b: 1 } }).toHaveProperty(['a', 'b'])",
        "expect(2).toBeGreaterThan(1)",
        "expect(2).toBeGreaterThanOrEqual(2)",
        "expect(1).toBeLessThan(2)",
        "expect(2).toBeLessThanOrEqual(2)",
        "expect(new TypeError('t')).toBeInstanceOf(Error)",
        "expect(() => { throw new Error('boom'); }).toThrow()",
        "expect(() => { throw new Error('boom'); }).toThrow('oo')",
        "expect(() => { throw new TypeError('boom'); }).toThrow(TypeError)",
        "expect(1).not.toBe(2)",
        "expect(() => {}).not.toThrow()",
    ] {
        passes(&mut g, code);
    }
}

#[test]
fn failure_message_shape() {
    let mut g = graph(&[]);
    assert_eq!(
        fails(&mut g, "expect(1).toBe(2)"),
        "expect(received).toBe(expected)\n\nExpected: 2\nReceived: 1"
    );
    assert_eq!(
        fails(&mut g, "expect(1).not.toBe(1)"),
        "expect(received).not.toBe(expected)\n\nExpected: not 1\nReceived: 1"
    );
}

#[test]
fn to_be_is_identity() {
    let mut g = graph(&[]);
    fails(&mut g, "expect({}).toBe({})");
    fails(&mut g, "expect(0).toBe(-0)");
    passes(&mut g, "const o = {}; expect(o).toBe(o)");
}

#[test]
fn namespaces_are_not_plain_objects() {
    let mut g = graph(&[]);
    passes(&mut g, "expect(nsObj({ a: 1 })).not.toEqual({ a: 1 })");
    passes(&mut g, "expect(nsObj({ a: 1 })).toEqual(nsObj({ a: 1 }))");
}

#[test]
fn strict_equality_checks_undefined_properties() {
    let mut g = graph(&[]);
    passes(&mut g, "expect({ a: 1, b: undefined }).toEqual({ a: 1 })");
    fails(&mut g, "expect({ a: 1, b: undefined }).toStrictEqual({ a: 1 })");
}

#[test]
fn to_throw_failures() {
    let mut g = graph(&[]);
    let message = fails(&mut g, "expect(() => 1).toThrow()");
    assert!(message.contains("Expected: a thrown error"), "{message}");
    fails(&mut g, "expect(() => { throw new Error('boom'); }).toThrow('other')");
    fails(&mut g, "expect(() => { throw new Error('boom'); }).toThrow(TypeError)");
}

#[test]
fn resolves_and_rejects() {
    let mut g = graph(&[]);
    let resolver = Rc::clone(&g.resolver);
    let outcome = resolver
        .sandbox()
        .run(
            &mut g.interp,
            r"
            const results = [];
            expect(Promise.resolve(3)).resolves.toBe(3).then(() => results.push('resolved ok'));
            expect(Promise.reject(new Error('why'))).rejects.toThrow('why').then(() => results.push('rejected ok'));
            try {
                expect(Promise.resolve(1)).rejects.toBe(1);
            } catch (e) {
                results.push(e.message.split('\n')[0]);
            }
            results
            ",
            "expect.js",
        )
        .unwrap();
    g.interp.run_until_idle().unwrap();
    let serde_json::Value::Array(items) = g.json(&outcome) else {
        panic!("expected an array");
    };
    let mut seen: Vec<String> = items
        .iter()
        .map(|item| item.as_str().unwrap().to_string())
        .collect();
    seen.sort();
    assert_eq!(
        seen,
        vec![
            "expect(received).rejects.toBe(expected)",
            "rejected ok",
            "resolved ok"
        ]
    );
}

#[test]
fn resolves_requires_a_promise() {
    let mut g = graph(&[]);
    let message = fails(&mut g, "expect(1).resolves.toBe(1)");
    assert!(message.contains("Expected: a promise"), "{message}");
}

#[test]
fn negated_matchers_have_no_modifiers() {
    let mut g = graph(&[]);
    let kinds = {
        let resolver = Rc::clone(&g.resolver);
        resolver
            .sandbox()
            .run(
                &mut g.interp,
                "[typeof expect(1).not.not, typeof expect(1).resolves.resolves, typeof expect(1).not.toBe]",
                "expect.js",
            )
            .unwrap()
    };
    assert_eq!(
        g.json(&kinds),
        serde_json::json!(["undefined", "undefined", "function"])
    );
}

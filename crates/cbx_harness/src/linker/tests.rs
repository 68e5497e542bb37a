#![allow(clippy::unwrap_used, clippy::expect_used)]

use pretty_assertions::assert_eq;
use serde_json::json;

use crate::record::ModuleState;
use crate::test_support::{graph, Graph};

/// Namespace of linked entry `file`.
fn namespace(g: &mut Graph, file: &str) -> cbx_eval::Value {
    let promise = g.require(file);
    g.fulfilled(&promise)
}

#[test]
fn dependencies_evaluate_first_and_once() {
    let mut g = graph(&[
        (
            "log.mjs",
            "globalThis.order = globalThis.order || []; export function log(name) { globalThis.order.push(name); }",
        ),
        ("a.mjs", "import { log } from './log.mjs'; import './b.mjs'; log('a');"),
        ("b.mjs", "import { log } from './log.mjs'; log('b');"),
        (
            "bundle0.mjs",
            "import { log } from './log.mjs'; import './a.mjs'; import './b.mjs'; log('entry'); export const order = globalThis.order;",
        ),
    ]);
    let ns = namespace(&mut g, "bundle0.mjs");
    let order = g.get(&ns, "order");
    assert_eq!(g.json(&order), json!(["b", "a", "entry"]));
    for record in g.resolver.records() {
        assert_eq!(record.state(), ModuleState::Evaluated, "{}", record.identity);
    }
}

#[test]
fn namespace_keys_are_sorted_and_tagged() {
    let mut g = graph(&[(
        "bundle0.mjs",
        "export const zeta = 1; export const alpha = 2; export default 3;",
    )]);
    let ns = namespace(&mut g, "bundle0.mjs");
    let object = ns.as_object().unwrap();
    assert!(object.namespace().is_some());
    assert_eq!(g.json(&ns), json!({ "alpha": 2, "default": 3, "zeta": 1 }));
}

#[test]
fn missing_named_export_fails_linking() {
    let mut g = graph(&[
        ("dep.mjs", "export const present = 1;"),
        ("bundle0.mjs", "import { absent } from './dep.mjs'; export default absent;"),
    ]);
    let promise = g.require("bundle0.mjs");
    let reason = g.rejected(&promise);
    let message = g.get(&reason, "message");
    assert_eq!(
        message.as_str(),
        Some("The requested module './dep.mjs' does not provide an export named 'absent'")
    );
}

#[test]
fn circular_imports_terminate() {
    let mut g = graph(&[
        (
            "b.mjs",
            r"
            import * as a from './bundle0.mjs';
            let early;
            try { early = a.value; } catch (e) { early = e instanceof ReferenceError; }
            export { early };
            export const b = 'b';
            export const aNamespace = a;
            ",
        ),
        (
            "bundle0.mjs",
            "import { b, early, aNamespace } from './b.mjs'; export const value = 'a'; export const seen = [b, early, aNamespace.value];",
        ),
    ]);
    let ns = namespace(&mut g, "bundle0.mjs");
    let seen = g.get(&ns, "seen");
    assert_eq!(g.json(&seen), json!(["b", true, "a"]));
}

#[test]
fn bindings_are_live() {
    let mut g = graph(&[
        ("counter.mjs", "export let count = 0; export function inc() { count += 1; }"),
        (
            "bundle0.mjs",
            "import { count, inc } from './counter.mjs'; const before = count; inc(); inc(); export const seen = [before, count];",
        ),
    ]);
    let ns = namespace(&mut g, "bundle0.mjs");
    let seen = g.get(&ns, "seen");
    assert_eq!(g.json(&seen), json!([0, 2]));
}

#[test]
fn re_exports() {
    let mut g = graph(&[
        ("inner.mjs", "export const x = 1; export const y = 2; export default 'inner';"),
        (
            "middle.mjs",
            "export { x as renamed } from './inner.mjs'; export * from './inner.mjs'; export * as all from './inner.mjs';",
        ),
        (
            "bundle0.mjs",
            "import * as m from './middle.mjs'; export const keys = Object.keys(m); export const values = [m.renamed, m.y, m.all.default];",
        ),
    ]);
    let ns = namespace(&mut g, "bundle0.mjs");
    let keys = g.get(&ns, "keys");
    assert_eq!(g.json(&keys), json!(["all", "renamed", "x", "y"]));
    let values = g.get(&ns, "values");
    assert_eq!(g.json(&values), json!([1, 2, "inner"]));
}

#[test]
fn commonjs_interop() {
    let mut g = graph(&[
        (
            "marked.cjs",
            "exports.__esModule = true; exports.named = 'named'; exports.default = 'default';",
        ),
        ("plain.cjs", "module.exports = { named: 'named', default: 'default' };"),
        (
            "bundle0.mjs",
            r"
            import markedDefault, { named } from './marked.cjs';
            import plainDefault from './plain.cjs';
            export const seen = [markedDefault, named, plainDefault.default];
            ",
        ),
    ]);
    let ns = namespace(&mut g, "bundle0.mjs");
    let seen = g.get(&ns, "seen");
    assert_eq!(g.json(&seen), json!(["default", "named", "default"]));
}

#[test]
fn dynamic_import_strategies_resolve_the_same_namespace() {
    let mut g = graph(&[
        ("one.mjs", "globalThis.loads = (globalThis.loads || 0) + 1; export const one = 1;"),
        (
            "bundle0.mjs",
            r#"
            export default Promise.all([
                import(/* webpackMode: "eager" */ './one.mjs'),
                import(/* webpackMode: "lazy" */ './one.mjs'),
                import(/* webpackMode: "lazy-once" */ './one.mjs'),
                import(/* webpackMode: "weak" */ './one.mjs'),
            ]).then((all) => ({
                same: all.every((ns) => ns === all[0]),
                one: all[0].one,
                loads: globalThis.loads,
            }));
            "#,
        ),
    ]);
    let result = namespace(&mut g, "bundle0.mjs");
    assert_eq!(g.json(&result), json!({ "same": true, "one": 1, "loads": 1 }));
}

#[test]
fn failed_evaluation_rejects_every_importer() {
    let mut g = graph(&[
        ("bad.mjs", "throw new Error('broken');"),
        (
            "bundle0.mjs",
            r"
            const attempt = () => import('./bad.mjs').then(() => 'loaded', (e) => e.message);
            export default Promise.all([attempt(), attempt()]);
            ",
        ),
    ]);
    let result = namespace(&mut g, "bundle0.mjs");
    assert_eq!(g.json(&result), json!(["broken", "broken"]));
}

#[test]
fn import_meta_url_is_a_file_url() {
    let mut g = graph(&[("bundle0.mjs", "export const url = import.meta.url;")]);
    let ns = namespace(&mut g, "bundle0.mjs");
    let url = g.get(&ns, "url");
    let expected = url::Url::from_file_path(g.root.join("bundle0.mjs")).unwrap();
    assert_eq!(url.as_str(), Some(expected.as_str()));
}

#[test]
fn unresolvable_dynamic_import_rejects() {
    let mut g = graph(&[(
        "bundle0.mjs",
        "export default import('./nowhere.mjs').then(() => 'found', (e) => e.code);",
    )]);
    let result = namespace(&mut g, "bundle0.mjs");
    assert_eq!(result.as_str(), Some("MODULE_NOT_FOUND"));
}

const AWAITING_MODULE: (&str, &str) = (
    "slow.mjs",
    "export let ready = false; await null; ready = true;",
);

const READERS: [(&str, &str); 2] = [
    (
        "first.mjs",
        "import { ready } from './slow.mjs'; (globalThis.seen ||= []).push('first:' + ready);",
    ),
    (
        "second.mjs",
        "import { ready } from './slow.mjs'; (globalThis.seen ||= []).push('second:' + ready);",
    ),
];

#[test]
fn static_importers_wait_for_top_level_await() {
    let mut g = graph(&[
        AWAITING_MODULE,
        READERS[0],
        READERS[1],
        (
            "bundle0.mjs",
            "import './first.mjs'; import './second.mjs'; export const seen = globalThis.seen;",
        ),
    ]);
    let ns = namespace(&mut g, "bundle0.mjs");
    let seen = g.get(&ns, "seen");
    assert_eq!(g.json(&seen), json!(["first:true", "second:true"]));
    for record in g.resolver.records() {
        assert_eq!(record.state(), ModuleState::Evaluated, "{}", record.identity);
    }
}

#[test]
fn dynamic_importers_wait_for_a_module_still_evaluating() {
    let mut g = graph(&[
        AWAITING_MODULE,
        READERS[0],
        READERS[1],
        (
            "bundle0.mjs",
            r"
            export default Promise.all([import('./first.mjs'), import('./second.mjs')])
                .then(() => globalThis.seen);
            ",
        ),
    ]);
    let result = namespace(&mut g, "bundle0.mjs");
    assert_eq!(g.json(&result), json!(["first:true", "second:true"]));
}

#[test]
fn rejection_after_top_level_await_rejects_importers() {
    let mut g = graph(&[
        ("late.mjs", "await null; throw new Error('late');"),
        (
            "bundle0.mjs",
            "export default import('./late.mjs').then(() => 'loaded', (e) => e.message);",
        ),
    ]);
    let result = namespace(&mut g, "bundle0.mjs");
    assert_eq!(result.as_str(), Some("late"));
}

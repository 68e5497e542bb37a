use super::common::{assert_passed, Suite, MODULE_OUTPUT};

#[test]
fn one_instance_across_require_paths() {
    let suite = Suite::new();
    suite.case(
        "identity/require",
        &[
            (
                "index.js",
                r#"
                const a = require("./shared");
                const b = require("./shared.js");
                const c = require("./nested/reach");
                it("every path yields the same exports", () => {
                    expect(b).toBe(a);
                    expect(c).toBe(a);
                });
                it("dynamic import wraps the same exports", () =>
                    import("./shared.js").then((ns) => {
                        expect(ns.default).toBe(a);
                    }));
                it("evaluated once", () => {
                    expect(globalThis.sharedRuns).toBe(1);
                });
                "#,
            ),
            (
                "shared.js",
                "globalThis.sharedRuns = (globalThis.sharedRuns || 0) + 1; module.exports = { tag: 'shared' };",
            ),
            ("nested/reach.js", "module.exports = require('../shared');"),
        ],
    );
    assert_passed(&suite.run());
}

#[test]
fn linked_module_evaluates_once_for_five_importers() {
    let suite = Suite::new();
    let importer = "import { count } from './counter.mjs'; export const seen = count;";
    suite.case(
        "identity/esm",
        &[
            (
                "index.js",
                r#"
                import { seen as a } from "./a.mjs";
                import { seen as b } from "./b.mjs";
                import { seen as c } from "./c.mjs";
                import { seen as d } from "./d.mjs";
                import { seen as e } from "./e.mjs";
                it("every importer saw the first evaluation", () => {
                    expect([a, b, c, d, e]).toEqual([1, 1, 1, 1, 1]);
                    expect(globalThis.counterRuns).toBe(1);
                });
                "#,
            ),
            (
                "counter.mjs",
                "globalThis.counterRuns = (globalThis.counterRuns || 0) + 1; export const count = globalThis.counterRuns;",
            ),
            ("a.mjs", importer),
            ("b.mjs", importer),
            ("c.mjs", importer),
            ("d.mjs", importer),
            ("e.mjs", importer),
            ("test.config.toml", MODULE_OUTPUT),
        ],
    );
    assert_passed(&suite.run());
}

#[test]
fn query_suffix_is_a_distinct_instance() {
    let suite = Suite::new();
    suite.case(
        "identity/query",
        &[
            (
                "index.js",
                r#"
                const plain = require("./state");
                const queried = require("./state?fresh");
                it("query suffix evaluates again", () => {
                    expect(queried).not.toBe(plain);
                    expect(globalThis.stateRuns).toBe(2);
                });
                "#,
            ),
            (
                "state.js",
                "globalThis.stateRuns = (globalThis.stateRuns || 0) + 1; module.exports = {};",
            ),
        ],
    );
    assert_passed(&suite.run());
}

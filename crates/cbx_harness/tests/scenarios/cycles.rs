use super::common::{assert_passed, Suite, MODULE_OUTPUT};

#[test]
fn sync_cycle_sees_partial_exports() {
    let suite = Suite::new();
    suite.case(
        "cycles/cjs",
        &[
            (
                "index.js",
                r#"
                const a = require("./a");
                it("b saw what a exported before requiring it", () => {
                    expect(a.fromB).toEqual(["early"]);
                    expect(a.late).toBe("a");
                });
                it("a is complete afterwards", () => {
                    expect(require("./b").a).toBe(a);
                });
                "#,
            ),
            (
                "a.js",
                r#"
                exports.early = "a";
                const b = require("./b");
                exports.late = "a";
                exports.fromB = b.seen;
                "#,
            ),
            (
                "b.js",
                r#"
                const a = require("./a");
                exports.seen = Object.keys(a);
                exports.a = a;
                "#,
            ),
        ],
    );
    assert_passed(&suite.run());
}

#[test]
fn linked_cycle_resolves_through_live_bindings() {
    let suite = Suite::new();
    suite.case(
        "cycles/esm",
        &[
            (
                "index.js",
                r#"
                import { callB, name } from "./a.mjs";
                import { order } from "./b.mjs";
                it("b reads a's binding once both evaluated", () => {
                    expect(name).toBe("a");
                    expect(callB()).toBe("b sees a");
                });
                it("dependencies evaluate first", () => {
                    expect(order).toEqual(["b", "a"]);
                });
                "#,
            ),
            (
                "a.mjs",
                r#"
                import { b, order } from "./b.mjs";
                order.push("a");
                export const name = "a";
                export function callB() { return b(); }
                "#,
            ),
            (
                "b.mjs",
                r#"
                import { name } from "./a.mjs";
                export const order = ["b"];
                export function b() { return "b sees " + name; }
                "#,
            ),
            ("test.config.toml", MODULE_OUTPUT),
        ],
    );
    assert_passed(&suite.run());
}

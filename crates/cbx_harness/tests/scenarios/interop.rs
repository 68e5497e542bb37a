use super::common::{assert_passed, Suite, MODULE_OUTPUT};

#[test]
fn linked_imports_of_sync_modules() {
    let suite = Suite::new();
    suite.case(
        "interop/esm-imports-cjs",
        &[
            (
                "index.js",
                r#"
                import flagged, { named as fromFlagged } from "./flagged.cjs";
                import plain, { named as fromPlain } from "./plain.cjs";
                import * as whole from "./plain.cjs";
                it("flagged exports pass through", () => {
                    expect(flagged).toBe("flagged default");
                    expect(fromFlagged).toBe(1);
                });
                it("plain exports are wrapped", () => {
                    expect(plain).toEqual({ named: 2 });
                    expect(fromPlain).toBe(2);
                    expect(whole.default).toBe(plain);
                });
                "#,
            ),
            (
                "flagged.cjs",
                r#"
                Object.defineProperty(exports, "__esModule", { value: true });
                exports.default = "flagged default";
                exports.named = 1;
                "#,
            ),
            ("plain.cjs", "module.exports = { named: 2 };"),
            ("test.config.toml", MODULE_OUTPUT),
        ],
    );
    assert_passed(&suite.run());
}

#[test]
fn sync_require_of_linked_module_is_a_promise() {
    let suite = Suite::new();
    suite.case(
        "interop/cjs-requires-esm",
        &[
            (
                "index.js",
                r#"
                const pending = require("./esm.mjs");
                it("resolves to the namespace", () =>
                    pending.then((ns) => {
                        expect(ns.value).toBe(3);
                        expect(ns.default).toBe("esm default");
                    }));
                "#,
            ),
            ("esm.mjs", "export const value = 3; export default 'esm default';"),
        ],
    );
    assert_passed(&suite.run());
}

#[test]
fn data_modules_load_as_json() {
    let suite = Suite::new();
    suite.case(
        "interop/json",
        &[
            (
                "index.js",
                r#"
                const data = require("./data.json");
                it("parses json", () => {
                    expect(data).toEqual({ list: [1, 2], nested: { ok: true } });
                    expect(require("./data")).toBe(data);
                });
                "#,
            ),
            ("data.json", r#"{ "list": [1, 2], "nested": { "ok": true } }"#),
        ],
    );
    assert_passed(&suite.run());
}

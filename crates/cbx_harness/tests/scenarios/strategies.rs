use pretty_assertions::assert_eq;

use super::common::{assert_passed, Suite};

/// Same source in three shapes: sync, linked, and sync flagged as linked.
const DIR_CJS: &str = "module.exports = { one: 1, label: 'one' };";
const DIR_ESM: &str = "export const one = 1; export const label = 'one';";
const DIR_MIXED: &str = r#"
Object.defineProperty(exports, "__esModule", { value: true });
exports.one = 1;
exports.label = "one";
"#;

const ENTRY: &str = r#"
const strategies = (load) => Promise.all(load());
const checks = {
    "dir-cjs": () => [
        import(/* webpackMode: "eager" */ "./dir-cjs/one.js"),
        import(/* webpackMode: "lazy" */ "./dir-cjs/one.js"),
        import(/* webpackMode: "lazy-once" */ "./dir-cjs/one.js"),
        import(/* webpackMode: "weak" */ "./dir-cjs/one.js"),
    ],
    "dir-esm": () => [
        import(/* webpackMode: "eager" */ "./dir-esm/one.mjs"),
        import(/* webpackMode: "lazy" */ "./dir-esm/one.mjs"),
        import(/* webpackMode: "lazy-once" */ "./dir-esm/one.mjs"),
        import(/* webpackMode: "weak" */ "./dir-esm/one.mjs"),
    ],
    "dir-mixed": () => [
        import(/* webpackMode: "eager" */ "./dir-mixed/one.js"),
        import(/* webpackMode: "lazy" */ "./dir-mixed/one.js"),
        import(/* webpackMode: "lazy-once" */ "./dir-mixed/one.js"),
        import(/* webpackMode: "weak" */ "./dir-mixed/one.js"),
    ],
};
Object.keys(checks).forEach((dir) => {
    it(dir + " resolves one namespace under every strategy", () =>
        strategies(checks[dir]).then((all) => {
            all.forEach((ns) => {
                expect(ns).toBe(all[0]);
                expect(ns).toEqual(all[0]);
            });
            expect(all[0].one).toBe(1);
            expect(all[0].label).toBe("one");
        }));
});
"#;

#[test]
fn loading_strategies_are_equivalent() {
    let suite = Suite::new();
    suite.case(
        "dynamic/strategies",
        &[
            ("index.js", ENTRY),
            ("dir-cjs/one.js", DIR_CJS),
            ("dir-esm/one.mjs", DIR_ESM),
            ("dir-mixed/one.js", DIR_MIXED),
        ],
    );
    let summary = suite.run();
    assert_passed(&summary);
    let names: Vec<&str> = summary.results[0]
        .assertions
        .iter()
        .map(|a| a.name.as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "dir-cjs resolves one namespace under every strategy",
            "dir-esm resolves one namespace under every strategy",
            "dir-mixed resolves one namespace under every strategy",
        ]
    );
}

#[test]
fn unknown_strategy_is_a_build_warning() {
    let suite = Suite::new();
    suite.case(
        "dynamic/bad-mode",
        &[
            (
                "index.js",
                r#"it("loads", () => import(/* webpackMode: "sometimes" */ "./lib.js"));"#,
            ),
            ("lib.js", "module.exports = 1;"),
            ("warnings.txt", "webpackMode"),
        ],
    );
    assert_passed(&suite.run());
}

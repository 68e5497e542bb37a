use super::common::{assert_passed, Suite};

const WEB: &str = "[[variant]]\ntarget = \"web\"\n";

#[test]
fn script_element_loads_a_chunk() {
    let suite = Suite::new();
    suite.case(
        "web/chunk",
        &[
            (
                "index.js",
                r#"
                const loaded = new Promise((resolve, reject) => {
                    const script = document.createElement("script");
                    script.src = "https://test.cases/path/chunks/extra.js";
                    script.onload = resolve;
                    script.onerror = (event) => reject(event.error);
                    document.head.appendChild(script);
                });
                it("chunk ran in the page realm", () =>
                    loaded.then(() => {
                        expect(self.extra).toBe("chunks/index.js");
                    }));
                "#,
            ),
            (
                "chunks/extra.js",
                "self.extra = document.currentScript.src.replace('https://test.cases/path/', '');",
            ),
            ("test.config.toml", WEB),
        ],
    );
    assert_passed(&suite.run());
}

#[test]
fn worker_round_trip() {
    let suite = Suite::new();
    suite.case(
        "web/worker",
        &[
            (
                "index.js",
                r#"
                it("worker answers", () =>
                    new Promise((resolve) => {
                        const worker = new Worker("./worker.js");
                        worker.onmessage = (event) => {
                            worker.terminate();
                            expect(event.data).toEqual({ doubled: 42 });
                            resolve();
                        };
                        worker.postMessage({ n: 21 });
                    }));
                "#,
            ),
            (
                "worker.js",
                "self.onmessage = (event) => postMessage({ doubled: event.data.n * 2 });",
            ),
            ("test.config.toml", WEB),
        ],
    );
    assert_passed(&suite.run());
}

#[test]
fn web_realm_is_isolated_from_node_variants() {
    let suite = Suite::new();
    suite.case(
        "web/isolation",
        &[
            (
                "index.js",
                r#"
                if (typeof window !== "undefined") {
                    globalThis.leaked = "web";
                    it("web realm is its own global", () => {
                        expect(window).toBe(globalThis);
                    });
                } else {
                    it("node variant does not see web globals", () => {
                        expect(globalThis.leaked).toBe(undefined);
                    });
                }
                "#,
            ),
            (
                "test.config.toml",
                "[[variant]]\ntarget = \"web\"\n\n[[variant]]\ntarget = \"async-node\"\n",
            ),
        ],
    );
    let summary = suite.run();
    assert_passed(&summary);
    assert_eq!(summary.results[0].assertions.len(), 2);
}

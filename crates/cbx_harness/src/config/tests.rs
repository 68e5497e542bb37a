#![allow(clippy::unwrap_used, clippy::expect_used)]

use pretty_assertions::assert_eq;

use super::*;

fn load(text: &str) -> Result<CaseConfig, ConfigError> {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(CONFIG_FILE), text).unwrap();
    CaseConfig::load(dir.path())
}

#[test]
fn missing_file_means_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = CaseConfig::load(dir.path()).unwrap();
    assert_eq!(config.timeout_ms, DEFAULT_TIMEOUT_MS);
    assert_eq!(config.variant.len(), 1);
    assert_eq!(config.variant[0].entry(), "./index.js");
    assert_eq!(config.variant[0].target, TargetSpec::One("async-node".into()));
    assert_eq!(config.generations(false), 1);
}

#[test]
fn parses_variants_and_tables() {
    let config = load(
        r#"
        timeout_ms = 500
        cache = true
        generations = 4

        [modules]
        external = { answer = 42 }

        [resolve]
        "./old" = "./new"

        [[variant]]
        target = ["web", "es2020"]
        output_module = true

        [[variant]]
        entry = "./other.js"
        filename = "out[index].js"
        "#,
    )
    .unwrap();
    assert_eq!(config.timeout_ms, 500);
    assert_eq!(config.generations(false), 4);
    assert_eq!(config.variant.len(), 2);
    assert_eq!(
        config.variant[0].target.names().collect::<Vec<_>>(),
        vec!["web", "es2020"]
    );
    assert_eq!(config.variant[0].filename(0), "bundle0.mjs");
    assert_eq!(config.variant[1].filename(1), "out1.js");
    assert_eq!(config.variant[1].entry(), "./other.js");
    assert_eq!(config.resolve.get("./old").map(String::as_str), Some("./new"));
    assert_eq!(
        config.module_values()["external"],
        serde_json::json!({ "answer": 42 })
    );
}

#[test]
fn unknown_keys_are_rejected() {
    let err = load("timeout = 5").unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "{err}");

    let err = load("[[variant]]\nmode = \"production\"").unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "{err}");
}

#[test]
fn too_few_generations_are_rejected() {
    let err = load("cache = true\ngenerations = 1").unwrap_err();
    assert!(err.to_string().contains("at least 2"), "{err}");
}

#[test]
fn cache_switch_forces_generations() {
    let config = load("").unwrap();
    assert_eq!(config.generations(true), DEFAULT_GENERATIONS);
}

#[test]
fn extension_follows_filename() {
    let variant = VariantConfig {
        filename: Some("main.cjs?v=1".into()),
        ..VariantConfig::default()
    };
    assert_eq!(variant.extension(0), ".cjs");
    assert_eq!(VariantConfig::default().extension(3), ".js");
}

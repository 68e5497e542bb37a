#![allow(clippy::unwrap_used, clippy::expect_used)]

use pretty_assertions::assert_eq;

use super::*;

#[test]
fn classify_rewrites_urls() {
    let base = Path::new("/out/chunks");
    let out = Path::new("/out");
    assert_eq!(
        classify("https://test.cases/path/worker.js", base, out).unwrap(),
        Request::Path {
            base: out.to_path_buf(),
            path: "./worker.js".to_string()
        }
    );
    assert_eq!(
        classify("https://example.com/public/path/1.js", base, out).unwrap(),
        Request::Path {
            base: base.to_path_buf(),
            path: "./1.js".to_string()
        }
    );
    assert_eq!(
        classify("file:///out/a.mjs?x", base, out).unwrap(),
        Request::Path {
            base: base.to_path_buf(),
            path: "/out/a.mjs?x".to_string()
        }
    );
    assert_eq!(
        classify("node:path", base, out).unwrap(),
        Request::Bare("node:path".to_string())
    );
    assert!(matches!(
        classify("file://[bad/x.js", base, out),
        Err(LoadError::InvalidUrl(_))
    ));
}

#[test]
fn queries_move_into_suffix() {
    assert_eq!(
        split_queries("./dir-cjs?1/one"),
        ("./dir-cjs/one".to_string(), "?1".to_string())
    );
    assert_eq!(
        split_queries("./a?x/b.js?y"),
        ("./a/b.js".to_string(), "?x?y".to_string())
    );
    assert_eq!(split_queries("./plain.js"), ("./plain.js".to_string(), String::new()));
}

#[test]
fn probing_order() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    std::fs::write(root.join("a.mjs"), "").unwrap();
    std::fs::write(root.join("a.json"), "{}").unwrap();
    std::fs::create_dir(root.join("pkg")).unwrap();
    std::fs::write(root.join("pkg/index.cjs"), "").unwrap();

    assert_eq!(probe(&root.join("a")), Some(root.join("a.mjs")));
    assert_eq!(probe(&root.join("a.json")), Some(root.join("a.json")));
    assert_eq!(probe(&root.join("pkg")), Some(root.join("pkg/index.cjs")));
    assert_eq!(probe(&root.join("missing")), None);
}

#[test]
fn sub_paths() {
    let root = Path::new("/out");
    assert_eq!(sub_path(root, Path::new("/out/bundle0.js")), "");
    assert_eq!(sub_path(root, Path::new("/out/dir/x/a.js")), "dir/x/");
    assert_eq!(
        relative_identifier(root, Path::new("/out/dir/a.js")).as_deref(),
        Some("./dir/a.js")
    );
}

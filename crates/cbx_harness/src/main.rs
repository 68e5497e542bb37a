//! casebox CLI
//!
//! Runs compiled test cases, or a single script, in the harness sandbox.

use std::path::{Path, PathBuf};
use std::sync::Once;
use std::time::Duration;

use cbx_harness::config::DEFAULT_TIMEOUT_MS;
use cbx_harness::{run_file, CaseRunner, RunnerConfig};

static TRACING_INIT: Once = Once::new();

/// Install a subscriber when `RUST_LOG` is set; `CBX_LOG_TREE` switches
/// to hierarchical span output.
fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_err() {
            return;
        }
        if std::env::var("CBX_LOG_TREE").is_ok() {
            tracing_subscriber::registry()
                .with(
                    tracing_tree::HierarchicalLayer::new(2)
                        .with_targets(true)
                        .with_bracketed_fields(true),
                )
                .with(EnvFilter::from_default_env())
                .init();
        } else {
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(EnvFilter::from_default_env())
                .init();
        }
    });
}

fn main() {
    init_tracing();
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    match args[1].as_str() {
        "test" => {
            let mut config = RunnerConfig::default();
            let mut root = None;
            for arg in args.iter().skip(2) {
                if let Some(filter) = arg.strip_prefix("--filter=") {
                    config.filter = Some(filter.to_string());
                } else if let Some(out) = arg.strip_prefix("--out=") {
                    config.out_dir = PathBuf::from(out);
                } else if arg == "--cache" {
                    config.cache = true;
                } else if arg == "--no-parallel" {
                    config.parallel = false;
                } else if arg == "-v" || arg == "--verbose" {
                    config.verbose = true;
                } else if !arg.starts_with('-') && root.is_none() {
                    root = Some(PathBuf::from(arg));
                } else {
                    eprintln!("error: unknown option '{arg}'");
                    std::process::exit(1);
                }
            }
            let Some(root) = root else {
                eprintln!("error: missing test case directory");
                eprintln!(
                    "Usage: cbx test <dir> [--filter=<substr>] [--cache] [--out=<dir>] [--no-parallel] [-v]"
                );
                std::process::exit(1);
            };
            std::process::exit(run_tests(&root, config));
        }
        "run" => {
            let Some(path) = args.get(2) else {
                eprintln!("error: missing file path");
                eprintln!("Usage: cbx run <file>");
                std::process::exit(1);
            };
            match run_file(Path::new(path), Duration::from_millis(DEFAULT_TIMEOUT_MS)) {
                Ok(value) => println!("{value}"),
                Err(err) => {
                    eprintln!("error: {err}");
                    std::process::exit(1);
                }
            }
        }
        "help" | "--help" | "-h" => print_usage(),
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            std::process::exit(1);
        }
    }
}

fn run_tests(root: &Path, config: RunnerConfig) -> i32 {
    let verbose = config.verbose;
    let runner = CaseRunner::new(config);
    match runner.run(root) {
        Ok(summary) => {
            println!("{}", summary.report(verbose));
            summary.exit_code()
        }
        Err(err) => {
            eprintln!("error: {err}");
            1
        }
    }
}

fn print_usage() {
    println!("casebox test harness");
    println!();
    println!("Usage: cbx <command> [options]");
    println!();
    println!("Commands:");
    println!("  test <dir>   Build and run every test case under <dir>");
    println!("  run <file>   Run one script in a fresh sandbox and print its result");
    println!("  help         Show this message");
    println!();
    println!("Test options:");
    println!("  --filter=<substr>   Only cases whose category/name contains <substr>");
    println!("  --cache             Run cache generations for every case");
    println!("  --out=<dir>         Build output root (default: target/cbx-out)");
    println!("  --no-parallel       Run cases one after another");
    println!("  -v, --verbose       Report passing and skipped cases too");
    println!();
    println!("Set RUST_LOG to enable logging; CBX_LOG_TREE=1 prints span trees.");
}

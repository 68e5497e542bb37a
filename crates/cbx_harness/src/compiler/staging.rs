//! Reference compiler: stages case sources as executable artifacts.
//!
//! Sources are copied into the output directory unchanged and each
//! variant's entry is emitted under its output file name. Every script is
//! parsed so syntax errors and loading-strategy warnings surface as build
//! diagnostics. With a cache directory, a bincode manifest of content
//! fingerprints decides which modules count as restored from cache.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use cbx_ir::ast::ParseGoal;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use super::{
    combine, fingerprint, render_parse_error, BuildFailure, BuildRequest, Compiler,
    InfrastructureLog, ModuleStat, RunResult, VariantRequest,
};
use crate::artifact::{normalize, ModuleKind};
use crate::config::CONFIG_FILE;
use crate::expectations::FIXTURE_FILES;

const MANIFEST_FILE: &str = "manifest.bin";
const MANIFEST_VERSION: u32 = 1;

/// Extensions probed for extension-less requests, in order.
const PROBE_EXTENSIONS: [&str; 4] = [".js", ".mjs", ".cjs", ".json"];

#[derive(Debug, Default, Serialize, Deserialize)]
struct Manifest {
    version: u32,
    fingerprints: BTreeMap<String, u64>,
}

/// A module as seen by one variant's build.
struct StagedModule {
    identifier: String,
    source: PathBuf,
    kind: ModuleKind,
    content: String,
    /// Relative requests found while parsing.
    requests: Vec<String>,
}

#[derive(Debug, Default)]
pub struct StagingCompiler;

impl StagingCompiler {
    pub fn new() -> Self {
        StagingCompiler
    }
}

impl Compiler for StagingCompiler {
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(case = %request.case_dir.display(), generation = request.generation)
    )]
    fn build(
        &mut self,
        request: &BuildRequest,
        log: &mut InfrastructureLog,
    ) -> Result<RunResult, BuildFailure> {
        let sources = collect_sources(&request.case_dir)?;
        fs::create_dir_all(&request.output_dir)
            .map_err(|err| BuildFailure::io(&request.output_dir, err))?;
        for source in &sources {
            let target = request.output_dir.join(source);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|err| BuildFailure::io(parent, err))?;
            }
            fs::copy(request.case_dir.join(source), &target)
                .map_err(|err| BuildFailure::io(&target, err))?;
        }

        let mut result = RunResult::default();
        for variant in &request.variants {
            build_variant(request, variant, &sources, log, &mut result)?;
        }
        tracing::debug!(
            modules = result.modules.len(),
            errors = result.errors.len(),
            warnings = result.warnings.len(),
            "build finished"
        );
        Ok(result)
    }
}

fn build_variant(
    request: &BuildRequest,
    variant: &VariantRequest,
    sources: &[PathBuf],
    log: &mut InfrastructureLog,
    result: &mut RunResult,
) -> Result<(), BuildFailure> {
    let entry_source = normalize(Path::new(&variant.entry));
    let entry_path = request.case_dir.join(&entry_source);
    let entry_content = fs::read_to_string(&entry_path).map_err(|err| {
        BuildFailure::Fatal(format!(
            "Module not found: entry '{}' of variant {}: {err}",
            variant.entry, variant.index
        ))
    })?;
    let bundle = request.output_dir.join(&variant.filename);
    fs::write(&bundle, &entry_content).map_err(|err| BuildFailure::io(&bundle, err))?;

    let mut modules = vec![StagedModule {
        identifier: identifier(Path::new(&variant.filename)),
        source: entry_path,
        kind: ModuleKind::classify(Path::new(&variant.filename), variant.output_module),
        content: entry_content,
        requests: Vec::new(),
    }];
    for source in sources {
        if *source == entry_source || !is_module(source) {
            continue;
        }
        let path = request.case_dir.join(source);
        let content = fs::read_to_string(&path).map_err(|err| BuildFailure::io(&path, err))?;
        modules.push(StagedModule {
            identifier: identifier(source),
            kind: ModuleKind::classify(source, variant.output_module),
            source: path,
            content,
            requests: Vec::new(),
        });
    }

    for module in &mut modules {
        check_module(module, result);
    }

    let own: FxHashMap<&str, u64> = modules
        .iter()
        .map(|m| (m.identifier.as_str(), fingerprint(m.content.as_bytes())))
        .collect();
    let fingerprints: Vec<u64> = if request.propagate_cache {
        let graph = DependencyGraph::new(&modules);
        let mut memo = FxHashMap::default();
        modules
            .iter()
            .map(|m| graph.propagated(&m.identifier, &own, &mut memo, &mut FxHashSet::default()))
            .collect()
    } else {
        modules.iter().map(|m| own[m.identifier.as_str()]).collect()
    };

    let cache_dir = request.variant_cache_dir(variant.index);
    let previous = cache_dir
        .as_deref()
        .map(|dir| load_manifest(dir, log))
        .unwrap_or_default();
    let mut next = Manifest {
        version: MANIFEST_VERSION,
        fingerprints: BTreeMap::new(),
    };
    let mut restored = 0;
    for (module, fingerprint) in modules.iter().zip(fingerprints) {
        let cached = previous.fingerprints.get(&module.identifier) == Some(&fingerprint);
        restored += usize::from(cached);
        next.fingerprints
            .insert(module.identifier.clone(), fingerprint);
        result.modules.push(ModuleStat {
            identifier: module.identifier.clone(),
            variant: variant.index,
            module_type: module.kind.stat_type().to_string(),
            cached,
            fingerprint,
        });
    }

    if let Some(dir) = cache_dir {
        store_manifest(&dir, &next)?;
        log.info(format!(
            "config-{}: {restored} of {} modules restored from cache",
            variant.index,
            modules.len()
        ));
    }
    Ok(())
}

/// Parse (or validate) one module, recording diagnostics and requests.
fn check_module(module: &mut StagedModule, result: &mut RunResult) {
    let goal = match module.kind {
        ModuleKind::Data => {
            if let Err(err) = serde_json::from_str::<serde_json::Value>(&module.content) {
                result
                    .errors
                    .push(format!("{}: JSON parse error: {err}", module.identifier));
            }
            return;
        }
        ModuleKind::Linked => ParseGoal::Module,
        ModuleKind::Sync => ParseGoal::Script,
    };
    match cbx_parse::parse(&module.content, goal) {
        Ok(program) => {
            for warning in &program.warnings {
                result
                    .warnings
                    .push(format!("{}: {}", module.identifier, warning.message));
            }
            module.requests = program
                .module_requests
                .iter()
                .chain(&program.require_literals)
                .filter(|s| s.starts_with("./") || s.starts_with("../"))
                .map(ToString::to_string)
                .collect();
        }
        Err(err) => {
            let name = module.source.display().to_string();
            result
                .errors
                .push(render_parse_error(&name, &module.content, &err));
        }
    }
}

/// Relative module graph of one variant, for fingerprint propagation.
struct DependencyGraph<'a> {
    edges: FxHashMap<&'a str, Vec<&'a str>>,
}

impl<'a> DependencyGraph<'a> {
    fn new(modules: &'a [StagedModule]) -> Self {
        let known: FxHashSet<&str> = modules.iter().map(|m| m.identifier.as_str()).collect();
        let edges = modules
            .iter()
            .map(|module| {
                let dir = Path::new(&module.identifier)
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_default();
                let targets = module
                    .requests
                    .iter()
                    .filter_map(|request| probe(&known, &dir, request))
                    .collect();
                (module.identifier.as_str(), targets)
            })
            .collect();
        DependencyGraph { edges }
    }

    /// Fingerprint of `id` folded with its dependencies'. Back edges of a
    /// cycle contribute their own fingerprint only.
    fn propagated(
        &self,
        id: &'a str,
        own: &FxHashMap<&str, u64>,
        memo: &mut FxHashMap<&'a str, u64>,
        active: &mut FxHashSet<&'a str>,
    ) -> u64 {
        if let Some(done) = memo.get(id) {
            return *done;
        }
        let base = own.get(id).copied().unwrap_or_default();
        if !active.insert(id) {
            return base;
        }
        let deps: Vec<u64> = self
            .edges
            .get(id)
            .into_iter()
            .flatten()
            .map(|dep| self.propagated(*dep, own, memo, active))
            .collect();
        active.remove(id);
        let value = combine(base, deps);
        memo.insert(id, value);
        value
    }
}

/// Find the identifier `request` refers to from `dir`.
fn probe<'a>(known: &FxHashSet<&'a str>, dir: &Path, request: &str) -> Option<&'a str> {
    let path: String = request
        .split('/')
        .map(|segment| segment.split('?').next().unwrap_or_default())
        .collect::<Vec<_>>()
        .join("/");
    let base = identifier(&normalize(&dir.join(path)));
    let candidates = std::iter::once(base.clone())
        .chain(PROBE_EXTENSIONS.iter().map(|ext| format!("{base}{ext}")))
        .chain(PROBE_EXTENSIONS.iter().map(|ext| format!("{base}/index{ext}")));
    for candidate in candidates {
        if let Some(found) = known.get(candidate.as_str()) {
            return Some(found);
        }
    }
    None
}

/// `./`-prefixed, slash-separated form of a relative path.
fn identifier(relative: &Path) -> String {
    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            std::path::Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    format!("./{}", parts.join("/"))
}

fn is_module(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("js" | "mjs" | "cjs" | "json")
    )
}

/// Every file under `case_dir` except configuration, fixtures and hidden
/// entries, relative and sorted.
fn collect_sources(case_dir: &Path) -> Result<Vec<PathBuf>, BuildFailure> {
    fn walk(root: &Path, dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), BuildFailure> {
        let entries = fs::read_dir(dir).map_err(|err| BuildFailure::io(dir, err))?;
        for entry in entries {
            let entry = entry.map_err(|err| BuildFailure::io(dir, err))?;
            let path = entry.path();
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with('.') {
                continue;
            }
            if path.is_dir() {
                walk(root, &path, out)?;
            } else if dir != root || (name != CONFIG_FILE && !FIXTURE_FILES.contains(&&*name)) {
                if let Ok(relative) = path.strip_prefix(root) {
                    out.push(relative.to_path_buf());
                }
            }
        }
        Ok(())
    }

    let mut out = Vec::new();
    walk(case_dir, case_dir, &mut out)?;
    out.sort();
    Ok(out)
}

fn load_manifest(dir: &Path, log: &mut InfrastructureLog) -> Manifest {
    let path = dir.join(MANIFEST_FILE);
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            log.debug(format!("no cache manifest at {}", path.display()));
            return Manifest::default();
        }
        Err(err) => {
            log.warn(format!("cannot read cache manifest {}: {err}", path.display()));
            return Manifest::default();
        }
    };
    match bincode::deserialize::<Manifest>(&bytes) {
        Ok(manifest) if manifest.version == MANIFEST_VERSION => manifest,
        Ok(manifest) => {
            log.warn(format!(
                "cache manifest {} has version {}, expected {MANIFEST_VERSION}; rebuilding",
                path.display(),
                manifest.version
            ));
            Manifest::default()
        }
        Err(err) => {
            log.warn(format!(
                "corrupt cache manifest {}: {err}; rebuilding",
                path.display()
            ));
            Manifest::default()
        }
    }
}

fn store_manifest(dir: &Path, manifest: &Manifest) -> Result<(), BuildFailure> {
    fs::create_dir_all(dir).map_err(|err| BuildFailure::io(dir, err))?;
    let path = dir.join(MANIFEST_FILE);
    let bytes = bincode::serialize(manifest)
        .map_err(|err| BuildFailure::Fatal(format!("cannot encode cache manifest: {err}")))?;
    fs::write(&path, bytes).map_err(|err| BuildFailure::io(&path, err))
}

#[cfg(test)]
mod tests;

//! `test.config.toml`: per-case configuration.
//!
//! Every key is optional. Unknown keys are rejected so a typo never turns
//! into a silently ignored setting.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_FILE: &str = "test.config.toml";

/// Default per-case timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Default number of cache generations: fill, verify, execute.
pub const DEFAULT_GENERATIONS: u32 = 3;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid {}: {message}", path.display())]
    Invalid { path: PathBuf, message: String },
}

/// The `target` of a build variant: one name or a list of names.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum TargetSpec {
    One(String),
    Many(Vec<String>),
}

impl Default for TargetSpec {
    fn default() -> Self {
        TargetSpec::One("async-node".to_string())
    }
}

impl TargetSpec {
    pub fn names(&self) -> impl Iterator<Item = &str> {
        let names: &[String] = match self {
            TargetSpec::One(name) => std::slice::from_ref(name),
            TargetSpec::Many(names) => names,
        };
        names.iter().map(String::as_str)
    }
}

/// One `[[variant]]` table: a single build configuration.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct VariantConfig {
    pub target: TargetSpec,
    /// Entry source, relative to the case directory.
    pub entry: Option<String>,
    /// Emit linked (module-goal) output.
    pub output_module: bool,
    /// Output file name; `[index]` is replaced by the variant index.
    pub filename: Option<String>,
}

impl VariantConfig {
    pub fn entry(&self) -> &str {
        self.entry.as_deref().unwrap_or("./index.js")
    }

    /// Output file name for variant `index`.
    pub fn filename(&self, index: usize) -> String {
        match &self.filename {
            Some(pattern) => pattern.replace("[index]", &index.to_string()),
            None => format!("bundle{index}{}", self.default_extension()),
        }
    }

    fn default_extension(&self) -> &'static str {
        if self.output_module {
            ".mjs"
        } else {
            ".js"
        }
    }

    /// Extension of the emitted bundle, including the dot.
    pub fn extension(&self, index: usize) -> String {
        let filename = self.filename(index);
        let name = filename.split(['?', '#']).next().unwrap_or_default();
        Path::new(name)
            .extension()
            .map_or_else(|| self.default_extension().to_string(), |ext| {
                format!(".{}", ext.to_string_lossy())
            })
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct CaseConfig {
    pub timeout_ms: u64,
    /// Build and check fixtures, but execute nothing.
    pub no_tests: bool,
    /// Skip the case entirely, with a reason.
    pub skip: Option<String>,
    /// Run cache generations.
    pub cache: bool,
    pub generations: Option<u32>,
    /// Dependents of a changed module are rebuilt too.
    pub propagate_cache: bool,
    /// Bundle files to execute per variant instead of `bundle<i>.<ext>`;
    /// `[index]` is replaced by the variant index.
    pub bundles: Vec<String>,
    /// Values returned for opaque module names.
    pub modules: BTreeMap<String, toml::Value>,
    /// Specifier rewrites applied before resolution.
    pub resolve: BTreeMap<String, String>,
    pub variant: Vec<VariantConfig>,
}

impl Default for CaseConfig {
    fn default() -> Self {
        CaseConfig {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            no_tests: false,
            skip: None,
            cache: false,
            generations: None,
            propagate_cache: false,
            bundles: Vec::new(),
            modules: BTreeMap::new(),
            resolve: BTreeMap::new(),
            variant: Vec::new(),
        }
    }
}

impl CaseConfig {
    /// Load `test.config.toml` from `case_dir`; a missing file means defaults.
    pub fn load(case_dir: &Path) -> Result<CaseConfig, ConfigError> {
        let path = case_dir.join(CONFIG_FILE);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(CaseConfig::default().normalized());
            }
            Err(source) => return Err(ConfigError::Io { path, source }),
        };
        let config: CaseConfig =
            toml::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?;
        config.validate(&path)?;
        Ok(config.normalized())
    }

    fn validate(&self, path: &Path) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::Invalid {
            path: path.to_path_buf(),
            message,
        };
        if let Some(generations) = self.generations {
            if generations < 2 {
                return Err(invalid(format!(
                    "`generations` must be at least 2, got {generations}"
                )));
            }
        }
        if self.timeout_ms == 0 {
            return Err(invalid("`timeout_ms` must be positive".to_string()));
        }
        Ok(())
    }

    /// A case without `[[variant]]` tables builds one default variant.
    fn normalized(mut self) -> Self {
        if self.variant.is_empty() {
            self.variant.push(VariantConfig::default());
        }
        self
    }

    /// Number of builds the cache controller runs.
    pub fn generations(&self, force_cache: bool) -> u32 {
        if self.cache || force_cache {
            self.generations.unwrap_or(DEFAULT_GENERATIONS).max(2)
        } else {
            1
        }
    }

    /// The `[modules]` table as JSON.
    pub fn module_values(&self) -> BTreeMap<String, serde_json::Value> {
        self.modules
            .iter()
            .filter_map(|(name, value)| {
                serde_json::to_value(value)
                    .ok()
                    .map(|json| (name.clone(), json))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests;

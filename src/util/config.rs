//! Configuration file support for extbuild.
//!
//! Two configuration file locations are read:
//! - Global: `~/.extbuild/config.toml` - User-wide defaults
//! - Project: `.extbuild/config.toml` under the package root
//!
//! Project config takes precedence over global config, field by field.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::builder::{GenericSpec, ToolRequirement};
use crate::core::BuildConfig;

/// extbuild configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Build settings
    pub build: BuildSection,

    /// Runtime the extensions are built for
    pub runtime: RuntimeSection,

    /// Install locations
    pub install: InstallSection,

    /// Extra generic adapters, registered after the built-ins
    pub adapters: Vec<AdapterConfig>,
}

/// Build-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSection {
    /// Parallel jobs handed to the toolchain (None = toolchain default)
    pub jobs: Option<usize>,

    pub verbose: Option<bool>,

    pub clean_first: Option<bool>,

    /// Stop a batch at the first failure (default: true)
    pub stop_on_failure: Option<bool>,

    /// Extra arguments for every toolchain invocation
    pub args: Vec<String>,

    /// Environment overrides for spawned processes
    pub env: BTreeMap<String, String>,
}

/// Runtime identification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSection {
    /// Engine name (ruby, jruby, truffleruby)
    pub engine: Option<String>,

    /// Dotted version, e.g. "3.4.1"
    pub version: Option<String>,

    /// Path to the runtime executable
    pub path: Option<PathBuf>,
}

/// Install destinations. Relative paths are resolved against the package root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallSection {
    pub dest_path: Option<PathBuf>,
    pub lib_dir: Option<PathBuf>,
}

/// A generic adapter defined in configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    pub name: String,

    /// Descriptor file name globs
    pub patterns: Vec<String>,

    /// Programs that must be on PATH
    pub tools: Vec<String>,

    pub build_command: Vec<String>,

    pub clean_command: Vec<String>,

    pub output_patterns: Vec<String>,
}

impl AdapterConfig {
    /// Convert to the registry's adapter definition.
    pub fn to_spec(&self) -> GenericSpec {
        let mut spec = GenericSpec::new(&self.name, &self.patterns)
            .with_build_command(&self.build_command)
            .with_clean_command(&self.clean_command)
            .with_output_patterns(&self.output_patterns);
        for tool in &self.tools {
            spec = spec.with_tool(ToolRequirement::new(tool, ""));
        }
        spec
    }
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if the file doesn't
    /// exist or can't be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    ///
    /// Adapters are appended; an adapter in `other` replaces one with the
    /// same name.
    pub fn merge(&mut self, other: Config) {
        if other.build.jobs.is_some() {
            self.build.jobs = other.build.jobs;
        }
        if other.build.verbose.is_some() {
            self.build.verbose = other.build.verbose;
        }
        if other.build.clean_first.is_some() {
            self.build.clean_first = other.build.clean_first;
        }
        if other.build.stop_on_failure.is_some() {
            self.build.stop_on_failure = other.build.stop_on_failure;
        }
        if !other.build.args.is_empty() {
            self.build.args = other.build.args;
        }
        self.build.env.extend(other.build.env);

        if other.runtime.engine.is_some() {
            self.runtime.engine = other.runtime.engine;
        }
        if other.runtime.version.is_some() {
            self.runtime.version = other.runtime.version;
        }
        if other.runtime.path.is_some() {
            self.runtime.path = other.runtime.path;
        }

        if other.install.dest_path.is_some() {
            self.install.dest_path = other.install.dest_path;
        }
        if other.install.lib_dir.is_some() {
            self.install.lib_dir = other.install.lib_dir;
        }

        for adapter in other.adapters {
            match self.adapters.iter_mut().find(|a| a.name == adapter.name) {
                Some(existing) => *existing = adapter,
                None => self.adapters.push(adapter),
            }
        }
    }

    /// Build configuration for a package rooted at `package_root`.
    pub fn to_build_config(&self, package_root: &Path) -> BuildConfig {
        let mut config = BuildConfig::new(package_root)
            .with_build_args(&self.build.args)
            .with_verbose(self.build.verbose.unwrap_or(false))
            .with_clean_first(self.build.clean_first.unwrap_or(false))
            .with_parallel(self.build.jobs)
            .with_stop_on_failure(self.build.stop_on_failure.unwrap_or(true));

        for (key, value) in &self.build.env {
            config = config.with_env(key, value);
        }
        if let Some(engine) = &self.runtime.engine {
            config = config.with_runtime_engine(engine);
        }
        if let Some(version) = &self.runtime.version {
            config = config.with_runtime_version(version);
        }
        if let Some(path) = &self.runtime.path {
            config = config.with_runtime_path(path);
        }
        if let Some(dest) = &self.install.dest_path {
            config = config.with_dest_path(package_root.join(dest));
        }
        if let Some(lib_dir) = &self.install.lib_dir {
            config = config.with_lib_dir(package_root.join(lib_dir));
        }

        config
    }

    /// Generic adapter definitions, in configuration order.
    pub fn generic_specs(&self) -> Vec<GenericSpec> {
        self.adapters.iter().map(AdapterConfig::to_spec).collect()
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.extbuild/config.toml)
/// 2. Global config (~/.extbuild/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        config.merge(Config::load_or_default(global_path));
    }
    config.merge(Config::load_or_default(project_path));

    config
}

/// Get the global extbuild config directory (~/.extbuild).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".extbuild"))
}

/// Get the global config path (~/.extbuild/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.extbuild/config.toml).
pub fn project_config_path(package_root: &Path) -> PathBuf {
    package_root.join(".extbuild").join("config.toml")
}

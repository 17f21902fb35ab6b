//! Command implementations

pub mod adapters;
pub mod build;
pub mod clean;
pub mod doctor;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use extbuild::builder::AdapterRegistry;
use extbuild::util::config::{global_config_path, load_config, project_config_path};
use extbuild::util::{Config, SystemRunner};

/// Resolve the package root, defaulting to the current directory.
pub fn package_root(root: Option<PathBuf>) -> Result<PathBuf> {
    match root {
        Some(root) => Ok(root),
        None => std::env::current_dir().context("failed to determine current directory"),
    }
}

/// Global config merged with the package's project config.
pub fn load_package_config(root: &Path) -> Config {
    load_config(global_config_path().as_deref(), &project_config_path(root))
}

/// Built-in adapters followed by the configured generic ones.
pub fn registry(config: &Config) -> AdapterRegistry {
    let runner = Arc::new(SystemRunner);
    let mut registry = AdapterRegistry::with_runner(runner.clone());
    registry.register_generic(config.generic_specs(), runner);
    registry
}

/// Descriptor paths relative to the package root.
pub fn descriptors(root: &Path, paths: Vec<PathBuf>) -> Vec<PathBuf> {
    paths
        .into_iter()
        .map(|path| {
            if path.is_absolute() {
                if let Ok(relative) = path.strip_prefix(root) {
                    return relative.to_path_buf();
                }
            }
            path
        })
        .collect()
}

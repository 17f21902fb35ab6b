//! Implementation of `extbuild build`.

use std::path::PathBuf;

use serde::Serialize;

use crate::builder::{install, AdapterRegistry, BatchEntry};
use crate::core::{BuildConfig, BuildError, CancellationToken};

/// Options for the build operation.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Copy native libraries into the package tree after a successful build
    pub install: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions { install: true }
    }
}

/// Outcome of one processed descriptor.
#[derive(Debug, Clone, Serialize)]
pub struct ExtensionEntry {
    pub descriptor: PathBuf,

    /// Adapter that handled the descriptor, if one was resolved
    pub adapter: Option<String>,

    pub success: bool,

    /// Build log lines
    pub output: Vec<String>,

    /// Artifacts relative to the build directory
    pub artifacts: Vec<PathBuf>,

    pub missing_dependencies: Vec<String>,

    /// Installed files relative to the package root
    pub installed: Vec<String>,

    pub error: Option<String>,

    pub install_error: Option<String>,
}

/// Report for a whole build invocation.
#[derive(Debug, Clone, Serialize)]
pub struct ExtensionsReport {
    pub extensions: Vec<ExtensionEntry>,

    /// First build or install error, in input order
    #[serde(skip)]
    pub first_error: Option<BuildError>,
}

impl ExtensionsReport {
    pub fn success(&self) -> bool {
        self.first_error.is_none()
    }

    pub fn installed(&self) -> impl Iterator<Item = &str> {
        self.extensions
            .iter()
            .flat_map(|e| e.installed.iter().map(String::as_str))
    }
}

/// Build every descriptor, then install the artifacts of each successful
/// build.
///
/// A failed install is recorded on its entry and never stops the remaining
/// installs. The report's first error is the earliest entry's build or
/// install error.
pub fn build_extensions(
    registry: &AdapterRegistry,
    config: &BuildConfig,
    targets: &[PathBuf],
    cancel: &CancellationToken,
    options: &BuildOptions,
) -> ExtensionsReport {
    let entries = registry.run_batch_entries(targets, config, cancel);
    let mut first_error = None;

    let mut extensions = Vec::with_capacity(entries.len());
    for entry in entries {
        let mut extension = extension_entry(&entry);
        let mut error = entry.result.error().cloned();

        if options.install && entry.result.success() {
            let build_dir = config.target_directory(&entry.descriptor);
            match install(config, &entry.descriptor, &build_dir, entry.result.artifacts()) {
                Ok(installed) => {
                    for path in &installed {
                        tracing::info!("Installed {}", path);
                    }
                    extension.installed = installed;
                }
                Err(e) => {
                    tracing::warn!("{}", e);
                    extension.install_error = Some(e.to_string());
                    extension.success = false;
                    error = Some(e);
                }
            }
        }

        if first_error.is_none() {
            first_error = error;
        }
        extensions.push(extension);
    }

    ExtensionsReport {
        extensions,
        first_error,
    }
}

fn extension_entry(entry: &BatchEntry) -> ExtensionEntry {
    let result = &entry.result;
    ExtensionEntry {
        descriptor: entry.descriptor.clone(),
        adapter: entry.adapter.as_ref().map(|a| a.name().to_string()),
        success: result.success(),
        output: result.output().to_vec(),
        artifacts: result.artifacts().to_vec(),
        missing_dependencies: result.missing_dependencies().to_vec(),
        installed: Vec::new(),
        error: result.error().map(ToString::to_string),
        install_error: None,
    }
}

//! Adapter registry and the sequential batch runner.
//!
//! The registry is filled once, then only read. Lookups evaluate adapters
//! in registration order and the first match wins.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::builder::adapters::{
    CMakeAdapter, CargoAdapter, ConfigureAdapter, ExtConfAdapter, GenericAdapter, GenericSpec,
    GoAdapter, JavaAdapter, MakefileAdapter, RakeAdapter,
};
use crate::builder::lifecycle::Adapter;
use crate::core::{BuildConfig, BuildError, BuildResult, CancellationToken};
use crate::util::process::{CommandRunner, SystemRunner};

/// Ordered list of toolchain adapters.
pub struct AdapterRegistry {
    adapters: Vec<Arc<dyn Adapter>>,
}

/// Outcome of a batch: per-target results in input order, plus the first
/// error encountered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub results: Vec<BuildResult>,
    pub first_error: Option<BuildError>,
}

/// One processed target of a batch.
#[derive(Clone)]
pub struct BatchEntry {
    pub descriptor: PathBuf,
    /// `None` when resolution failed or the batch was cancelled first
    pub adapter: Option<Arc<dyn Adapter>>,
    pub result: BuildResult,
}

impl AdapterRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        AdapterRegistry {
            adapters: Vec::new(),
        }
    }

    /// Registry with every built-in adapter, spawning real processes.
    pub fn with_defaults() -> Self {
        Self::with_runner(Arc::new(SystemRunner))
    }

    /// Registry with every built-in adapter sharing `runner`.
    pub fn with_runner(runner: Arc<dyn CommandRunner>) -> Self {
        let mut registry = Self::new();

        registry.register(Arc::new(ExtConfAdapter::new(runner.clone())));
        registry.register(Arc::new(ConfigureAdapter::new(runner.clone())));
        registry.register(Arc::new(RakeAdapter::new(runner.clone())));
        registry.register(Arc::new(CMakeAdapter::new(runner.clone())));
        registry.register(Arc::new(CargoAdapter::new(runner.clone())));
        registry.register(Arc::new(MakefileAdapter::new(runner.clone())));
        registry.register(Arc::new(JavaAdapter::new(runner.clone())));
        registry.register(Arc::new(GoAdapter::new(runner.clone())));

        for spec in GenericSpec::presets() {
            registry.register(Arc::new(GenericAdapter::new(spec, runner.clone())));
        }

        registry
    }

    /// Append generic adapters after everything already registered.
    pub fn register_generic<I>(&mut self, specs: I, runner: Arc<dyn CommandRunner>)
    where
        I: IntoIterator<Item = GenericSpec>,
    {
        for spec in specs {
            self.register(Arc::new(GenericAdapter::new(spec, runner.clone())));
        }
    }

    /// Append an adapter.
    pub fn register(&mut self, adapter: Arc<dyn Adapter>) {
        tracing::debug!("registered adapter {}", adapter.name());
        self.adapters.push(adapter);
    }

    /// Registered adapters in evaluation order.
    pub fn adapters(&self) -> &[Arc<dyn Adapter>] {
        &self.adapters
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Find the adapter for a descriptor. Only the final path segment is
    /// considered.
    pub fn resolve(&self, descriptor: &Path) -> Result<Arc<dyn Adapter>, BuildError> {
        let file_name = descriptor
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| descriptor.to_string_lossy().into_owned());

        self.adapters
            .iter()
            .find(|adapter| adapter.matches(&file_name))
            .cloned()
            .ok_or(BuildError::AdapterNotFound { file: file_name })
    }

    /// Build targets one after another.
    ///
    /// Cancellation is observed only before each target. Failures are
    /// recorded and the batch stops or continues per `stop_on_failure`.
    pub fn run_batch(
        &self,
        targets: &[PathBuf],
        config: &BuildConfig,
        cancel: &CancellationToken,
    ) -> BatchOutcome {
        let entries = self.run_batch_entries(targets, config, cancel);
        let first_error = first_error(&entries);

        BatchOutcome {
            results: entries.into_iter().map(|entry| entry.result).collect(),
            first_error,
        }
    }

    /// Like [`run_batch`](Self::run_batch), keeping the descriptor and
    /// adapter alongside each result.
    pub fn run_batch_entries(
        &self,
        targets: &[PathBuf],
        config: &BuildConfig,
        cancel: &CancellationToken,
    ) -> Vec<BatchEntry> {
        let mut entries = Vec::with_capacity(targets.len());

        for descriptor in targets {
            if cancel.is_cancelled() {
                tracing::warn!("build cancelled before {}", descriptor.display());
                entries.push(BatchEntry {
                    descriptor: descriptor.clone(),
                    adapter: None,
                    result: BuildResult::cancelled(),
                });
                break;
            }

            let adapter = match self.resolve(descriptor) {
                Ok(adapter) => adapter,
                Err(e) => {
                    tracing::warn!("{}", e);
                    entries.push(BatchEntry {
                        descriptor: descriptor.clone(),
                        adapter: None,
                        result: BuildResult::from_error(e),
                    });
                    if config.stop_on_failure {
                        break;
                    }
                    continue;
                }
            };

            tracing::info!("Building {} with {}", descriptor.display(), adapter.name());
            let result = adapter.build(config, descriptor);
            let success = result.success();
            if !success {
                tracing::warn!("{} failed for {}", adapter.name(), descriptor.display());
            }

            entries.push(BatchEntry {
                descriptor: descriptor.clone(),
                adapter: Some(adapter),
                result,
            });

            if !success && config.stop_on_failure {
                break;
            }
        }

        entries
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// First error recorded across a batch, in input order.
fn first_error(entries: &[BatchEntry]) -> Option<BuildError> {
    entries
        .iter()
        .find_map(|entry| entry.result.error().cloned())
}

//! Implementation of `extbuild clean`.

use std::path::PathBuf;

use crate::builder::AdapterRegistry;
use crate::core::BuildConfig;

/// Run each descriptor's clean step.
///
/// Cleaning is best-effort: unresolved descriptors and failing clean
/// steps are logged and returned as warnings.
pub fn clean_extensions(
    registry: &AdapterRegistry,
    config: &BuildConfig,
    targets: &[PathBuf],
) -> Vec<String> {
    let mut warnings = Vec::new();

    for descriptor in targets {
        let adapter = match registry.resolve(descriptor) {
            Ok(adapter) => adapter,
            Err(e) => {
                tracing::warn!("{}", e);
                warnings.push(e.to_string());
                continue;
            }
        };

        tracing::info!("Cleaning {} with {}", descriptor.display(), adapter.name());
        if let Err(e) = adapter.clean(config, descriptor) {
            let warning = format!("{} clean failed for {}: {:#}", adapter.name(), descriptor.display(), e);
            tracing::warn!("{}", warning);
            warnings.push(warning);
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockRunner;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_clean_runs_resolved_adapters() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("Makefile"), "").unwrap();
        let runner = Arc::new(MockRunner::new());
        let registry = AdapterRegistry::with_runner(runner.clone());

        let warnings = clean_extensions(
            &registry,
            &BuildConfig::new(tmp.path()),
            &[PathBuf::from("Makefile"), PathBuf::from("README.md")],
        );

        assert_eq!(
            warnings,
            vec!["no adapter found for extension file: README.md"]
        );
        assert_eq!(runner.calls().len(), 1);
        assert!(runner.calls()[0].ends_with("clean"));
    }

    #[test]
    fn test_clean_failure_is_a_warning() {
        let tmp = TempDir::new().unwrap();
        let runner = Arc::new(MockRunner::new().fail_on("go clean", 1, ""));
        let registry = AdapterRegistry::with_runner(runner);

        let warnings = clean_extensions(
            &registry,
            &BuildConfig::new(tmp.path()),
            &[PathBuf::from("go.mod")],
        );

        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with("Go clean failed for go.mod"));
    }
}

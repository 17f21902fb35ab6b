//! Go extensions built as C shared libraries.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Result};

use super::{lower_extension, lower_name};
use crate::builder::lifecycle::{
    command, dl_ext, run_best_effort, run_lifecycle, run_step, Adapter, Lifecycle,
};
use crate::builder::tools::ToolRequirement;
use crate::core::{BuildConfig, BuildLog, BuildResult, Phase, PhaseResult};
use crate::util::fs::glob_relative;
use crate::util::process::CommandRunner;

pub struct GoAdapter {
    runner: Arc<dyn CommandRunner>,
}

impl GoAdapter {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        GoAdapter { runner }
    }

    /// `<dir-name>.<dlext>`, under the destination when one is set.
    fn output_path(config: &BuildConfig, dir: &Path) -> PathBuf {
        let stem = dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "extension".to_string());
        let file = format!("{}.{}", stem, dl_ext());

        match &config.dest_path {
            Some(dest) => dest.join(file),
            None => PathBuf::from(file),
        }
    }
}

impl Lifecycle for GoAdapter {
    fn configure(&self, config: &BuildConfig, _dir: &Path, mut log: BuildLog) -> PhaseResult {
        if config.verbose {
            log.push("Go modules, no configuration needed");
        }
        Ok(log)
    }

    fn compile(&self, config: &BuildConfig, dir: &Path, mut log: BuildLog) -> PhaseResult {
        if config.clean_first {
            let clean = command(config, "go", dir).arg("clean");
            log = run_best_effort(self.runner.as_ref(), config, &clean, log);
        }

        let cmd = command(config, "go", dir)
            .args(["build", "-buildmode=c-shared", "-o"])
            .arg(Self::output_path(config, dir))
            .args(&config.build_args)
            .env("CGO_ENABLED", "1");

        run_step(self.runner.as_ref(), self.name(), Phase::Compile, config, &cmd, log)
    }

    fn locate(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        glob_relative(dir, &["*.so", "*.bundle", "*.dylib", "*.dll"])
    }
}

impl Adapter for GoAdapter {
    fn name(&self) -> &str {
        "Go"
    }

    fn matches(&self, file_name: &str) -> bool {
        lower_name(file_name) == "go.mod" || lower_extension(file_name).as_deref() == Some("go")
    }

    fn build(&self, config: &BuildConfig, descriptor: &Path) -> BuildResult {
        run_lifecycle(self.name(), self, config, descriptor)
    }

    fn clean(&self, config: &BuildConfig, descriptor: &Path) -> Result<()> {
        let clean = command(config, "go", &config.target_directory(descriptor)).arg("clean");
        let output = self.runner.run(&clean)?;
        if !output.success {
            bail!("`go clean` failed with {}", output.status_text());
        }
        Ok(())
    }

    fn required_tools(&self) -> Vec<ToolRequirement> {
        vec![
            ToolRequirement::new("go", "Go compiler and toolchain"),
            ToolRequirement::new("gcc", "C compiler (required for CGO)")
                .with_alternatives(["clang", "cc"]),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockRunner;
    use tempfile::TempDir;

    #[test]
    fn test_matches() {
        let adapter = GoAdapter::new(Arc::new(MockRunner::new()));
        assert!(adapter.matches("go.mod"));
        assert!(adapter.matches("main.go"));
        assert!(!adapter.matches("go.sum"));
    }

    #[test]
    fn test_build_names_output_after_directory() {
        let tmp = TempDir::new().unwrap();
        let ext = tmp.path().join("ext/fastjson");
        std::fs::create_dir_all(&ext).unwrap();

        let output = format!("fastjson.{}", dl_ext());
        let runner = Arc::new(MockRunner::new().creates("go build", output.clone()));
        let adapter = GoAdapter::new(runner.clone());

        let result = adapter.build(&BuildConfig::new(tmp.path()), Path::new("ext/fastjson/go.mod"));

        assert!(result.success(), "{:?}", result.error());
        assert_eq!(result.artifacts(), &[PathBuf::from(&output)]);

        let commands = runner.commands();
        assert_eq!(
            commands[0].display_command(),
            format!("go build -buildmode=c-shared -o {}", output)
        );
        assert_eq!(commands[0].get_env("CGO_ENABLED"), Some("1"));
    }
}

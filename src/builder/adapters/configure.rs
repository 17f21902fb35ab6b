//! Autoconf-style `configure` scripts followed by make.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use super::make_toolchain;
use super::makefile::{make_clean, run_make};
use crate::builder::lifecycle::{command, locate_native, run_lifecycle, run_step, Adapter, Lifecycle};
use crate::builder::tools::ToolRequirement;
use crate::core::{BuildConfig, BuildLog, BuildResult, Phase, PhaseResult};
use crate::util::process::CommandRunner;

const SCRIPTS: &[&str] = &["configure", "configure.sh"];

pub struct ConfigureAdapter {
    runner: Arc<dyn CommandRunner>,
}

impl ConfigureAdapter {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        ConfigureAdapter { runner }
    }
}

impl Lifecycle for ConfigureAdapter {
    fn configure(&self, config: &BuildConfig, dir: &Path, log: BuildLog) -> PhaseResult {
        let script = SCRIPTS
            .iter()
            .copied()
            .find(|name| dir.join(name).is_file())
            .unwrap_or(SCRIPTS[0]);

        let mut cmd = command(config, "sh", dir).arg(format!("./{}", script));
        if let Some(dest) = &config.dest_path {
            cmd = cmd.arg(format!("--prefix={}", dest.display()));
        }
        let cmd = cmd.args(&config.build_args);

        let log = run_step(self.runner.as_ref(), self.name(), Phase::Configure, config, &cmd, log)?;

        if !dir.join("Makefile").is_file() {
            return Err(log.fail(self.name(), Phase::Configure, "Makefile not generated"));
        }
        Ok(log)
    }

    fn compile(&self, config: &BuildConfig, dir: &Path, log: BuildLog) -> PhaseResult {
        run_make(self.runner.as_ref(), self.name(), config, dir, log)
    }

    fn locate(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        locate_native(dir)
    }
}

impl Adapter for ConfigureAdapter {
    fn name(&self) -> &str {
        "Configure"
    }

    fn matches(&self, file_name: &str) -> bool {
        SCRIPTS.contains(&file_name)
    }

    fn build(&self, config: &BuildConfig, descriptor: &Path) -> BuildResult {
        run_lifecycle(self.name(), self, config, descriptor)
    }

    fn clean(&self, config: &BuildConfig, descriptor: &Path) -> Result<()> {
        make_clean(self.runner.as_ref(), config, &config.target_directory(descriptor))
    }

    fn required_tools(&self) -> Vec<ToolRequirement> {
        let mut tools = vec![ToolRequirement::new("sh", "POSIX shell for configure scripts")];
        tools.extend(make_toolchain());
        tools
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockRunner;
    use crate::util::process::make_program;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_matches() {
        let adapter = ConfigureAdapter::new(Arc::new(MockRunner::new()));
        assert!(adapter.matches("configure"));
        assert!(adapter.matches("configure.sh"));
        assert!(!adapter.matches("configure.ac"));
        assert!(!adapter.matches("Configure"));
    }

    #[test]
    fn test_configure_script_with_prefix() {
        let tmp = TempDir::new().unwrap();
        let ext = tmp.path().join("ext/demo");
        fs::create_dir_all(&ext).unwrap();
        fs::write(ext.join("configure.sh"), "#!/bin/sh\n").unwrap();

        let runner = Arc::new(
            MockRunner::new()
                .creates("sh ./configure.sh", "Makefile")
                .creates(&make_program(), "demo.so"),
        );
        let adapter = ConfigureAdapter::new(runner.clone());
        let config = BuildConfig::new(tmp.path())
            .with_dest_path("/tmp/out")
            .with_build_args(["--enable-shared"]);

        let result = adapter.build(&config, Path::new("ext/demo/configure.sh"));

        assert!(result.success(), "{:?}", result.error());
        assert_eq!(
            runner.calls()[0],
            "sh ./configure.sh --prefix=/tmp/out --enable-shared"
        );
        assert_eq!(result.artifacts(), &[PathBuf::from("demo.so")]);
    }
}

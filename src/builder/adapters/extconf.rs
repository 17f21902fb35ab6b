//! `extconf.rb` scripts that generate a Makefile.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use super::make_toolchain;
use super::makefile::{make_clean, run_make};
use crate::builder::lifecycle::{command, locate_native, run_lifecycle, run_step, Adapter, Lifecycle};
use crate::builder::tools::ToolRequirement;
use crate::core::{BuildConfig, BuildLog, BuildResult, Phase, PhaseResult};
use crate::util::process::CommandRunner;

pub struct ExtConfAdapter {
    runner: Arc<dyn CommandRunner>,
}

impl ExtConfAdapter {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        ExtConfAdapter { runner }
    }
}

impl Lifecycle for ExtConfAdapter {
    fn configure(&self, config: &BuildConfig, dir: &Path, log: BuildLog) -> PhaseResult {
        let cmd = command(config, config.runtime_program(), dir)
            .arg("extconf.rb")
            .args(&config.build_args);
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

impl Adapter for ExtConfAdapter {
    fn name(&self) -> &str {
        "ExtConf"
    }

    fn matches(&self, file_name: &str) -> bool {
        file_name.ends_with("extconf.rb")
    }

    fn build(&self, config: &BuildConfig, descriptor: &Path) -> BuildResult {
        run_lifecycle(self.name(), self, config, descriptor)
    }

    fn clean(&self, config: &BuildConfig, descriptor: &Path) -> Result<()> {
        make_clean(self.runner.as_ref(), config, &config.target_directory(descriptor))
    }

    fn required_tools(&self) -> Vec<ToolRequirement> {
        let mut tools = vec![ToolRequirement::new("ruby", "Ruby interpreter")];
        tools.extend(make_toolchain());
        tools
    }
}

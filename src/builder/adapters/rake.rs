//! Rake task runners (`Rakefile`, `mkrf_conf.rb`).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use crate::builder::lifecycle::{
    command, run_best_effort, run_lifecycle, run_step, Adapter, Lifecycle,
};
use crate::builder::tools::ToolRequirement;
use crate::core::{BuildConfig, BuildLog, BuildResult, Phase, PhaseFailure, PhaseResult};
use crate::util::fs::glob_relative;
use crate::util::process::{CommandRunner, ProcessBuilder};

const DESCRIPTORS: &[&str] = &[
    "Rakefile",
    "rakefile",
    "Rakefile.rb",
    "rakefile.rb",
    "mkrf_conf",
    "mkrf_conf.rb",
];

/// Loads rake through RubyGems when no `rake` executable is on PATH.
const LOAD_RAKE: &str = r#"load Gem.bin_path("rake", "rake")"#;

const OUTPUT_PATTERNS: &[&str] = &[
    "*.so",
    "*.bundle",
    "*.dll",
    "lib/*.so",
    "lib/*.bundle",
    "lib/*.dll",
];

pub struct RakeAdapter {
    runner: Arc<dyn CommandRunner>,
}

impl RakeAdapter {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        RakeAdapter { runner }
    }

    /// Resolve how to invoke rake with `args`.
    ///
    /// Uses `rake` from PATH, then falls back to loading the rake gem
    /// through the runtime. Records `rake` as missing when neither works.
    fn rake_command(
        &self,
        config: &BuildConfig,
        dir: &Path,
        args: &[String],
        mut log: BuildLog,
    ) -> Result<(ProcessBuilder, BuildLog), PhaseFailure> {
        if let Some(rake) = self.runner.find_program("rake") {
            return Ok((command(config, rake, dir).args(args), log));
        }

        let runtime = config.runtime_program();
        let probe = command(config, &runtime, dir).args(["-e", r#"gem "rake""#]);
        let available = self
            .runner
            .run(&probe)
            .map(|output| output.success)
            .unwrap_or(false);

        if !available {
            tracing::warn!("rake is not installed for {}", runtime.display());
            log.missing("rake");
            return Err(log.fail(self.name(), Phase::Compile, "rake not found"));
        }

        let cmd = command(config, &runtime, dir)
            .args(["-rrubygems", "-e", LOAD_RAKE, "--"])
            .args(args);
        Ok((cmd, log))
    }
}

impl Lifecycle for RakeAdapter {
    fn configure(&self, config: &BuildConfig, dir: &Path, mut log: BuildLog) -> PhaseResult {
        if !dir.join("mkrf_conf.rb").is_file() {
            if config.verbose {
                log.push("No mkrf_conf.rb, skipping configuration");
            }
            return Ok(log);
        }

        let cmd = command(config, config.runtime_program(), dir).arg("mkrf_conf.rb");
        run_step(self.runner.as_ref(), self.name(), Phase::Configure, config, &cmd, log)
    }

    fn compile(&self, config: &BuildConfig, dir: &Path, log: BuildLog) -> PhaseResult {
        let (cmd, mut log) = self.rake_command(config, dir, &config.build_args, log)?;

        if config.clean_first {
            let (clean, clean_log) = self.rake_command(config, dir, &["clean".to_string()], log)?;
            log = run_best_effort(self.runner.as_ref(), config, &clean, clean_log);
        }

        let mut cmd = cmd;
        if let Some(jobs) = config.parallel {
            cmd = cmd.env("MAKEFLAGS", format!("-j{}", jobs));
        }
        if let Some(dest) = &config.dest_path {
            cmd = cmd.env("RUBYARCHDIR", dest).env("RUBYLIBDIR", dest);
        }

        run_step(self.runner.as_ref(), self.name(), Phase::Compile, config, &cmd, log)
    }

    fn locate(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        glob_relative(dir, OUTPUT_PATTERNS)
    }
}

impl Adapter for RakeAdapter {
    fn name(&self) -> &str {
        "Rake"
    }

    fn matches(&self, file_name: &str) -> bool {
        DESCRIPTORS.contains(&file_name)
    }

    fn build(&self, config: &BuildConfig, descriptor: &Path) -> BuildResult {
        run_lifecycle(self.name(), self, config, descriptor)
    }

    fn clean(&self, config: &BuildConfig, descriptor: &Path) -> Result<()> {
        let dir = config.target_directory(descriptor);
        if let Ok((clean, _)) =
            self.rake_command(config, &dir, &["clean".to_string()], BuildLog::new())
        {
            run_best_effort(self.runner.as_ref(), config, &clean, BuildLog::new());
        }
        Ok(())
    }

    fn required_tools(&self) -> Vec<ToolRequirement> {
        vec![
            ToolRequirement::new("ruby", "Ruby interpreter"),
            ToolRequirement::new("rake", "Ruby task runner").optional(),
        ]
    }
}

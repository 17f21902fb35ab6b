//! CMake projects (`CMakeLists.txt`).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Result};

use super::makefile::make_clean;
use crate::builder::lifecycle::{
    command, run_best_effort, run_lifecycle, run_step, Adapter, Lifecycle,
};
use crate::builder::tools::ToolRequirement;
use crate::core::{BuildConfig, BuildLog, BuildResult, Phase, PhaseResult};
use crate::util::fs::glob_relative;
use crate::util::process::CommandRunner;

/// Directories CMake projects commonly emit libraries into.
const SEARCH_DIRS: &[&str] = &[".", "Release", "Debug", "lib", "bin", "build", "_builds"];

const LIBRARY_PATTERNS: &[&str] = &["*.so", "*.bundle", "*.dll", "*.dylib"];

pub struct CMakeAdapter {
    runner: Arc<dyn CommandRunner>,
}

impl CMakeAdapter {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        CMakeAdapter { runner }
    }

    fn generator(config: &BuildConfig) -> Option<String> {
        config
            .env
            .get("CMAKE_GENERATOR")
            .cloned()
            .or_else(|| std::env::var("CMAKE_GENERATOR").ok())
            .filter(|g| !g.is_empty())
    }
}

impl Lifecycle for CMakeAdapter {
    fn configure(&self, config: &BuildConfig, dir: &Path, log: BuildLog) -> PhaseResult {
        let mut cmd = command(config, "cmake", dir)
            .arg(".")
            .arg("-DCMAKE_BUILD_TYPE=Release");
        if let Some(dest) = &config.dest_path {
            cmd = cmd.arg(format!("-DCMAKE_INSTALL_PREFIX={}", dest.display()));
        }
        if let Some(generator) = Self::generator(config) {
            cmd = cmd.arg("-G").arg(generator);
        }
        if let Some(runtime) = &config.runtime_path {
            cmd = cmd.env("Ruby_EXECUTABLE", runtime);
        }
        let cmd = cmd.args(&config.build_args);

        run_step(self.runner.as_ref(), self.name(), Phase::Configure, config, &cmd, log)
    }

    fn compile(&self, config: &BuildConfig, dir: &Path, mut log: BuildLog) -> PhaseResult {
        if config.clean_first {
            let clean = command(config, "cmake", dir).args(["--build", ".", "--target", "clean"]);
            log = run_best_effort(self.runner.as_ref(), config, &clean, log);
        }

        let mut build = command(config, "cmake", dir).args(["--build", "."]);
        if let Some(jobs) = config.parallel {
            build = build.arg("--parallel").arg(jobs.to_string());
        }
        let build = build.args(["--config", "Release"]);
        let log = run_step(self.runner.as_ref(), self.name(), Phase::Compile, config, &build, log)?;

        if config.dest_path.is_some() {
            let install = command(config, "cmake", dir).args(["--install", "."]);
            return run_step(self.runner.as_ref(), self.name(), Phase::Compile, config, &install, log);
        }
        Ok(log)
    }

    fn locate(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let patterns: Vec<String> = SEARCH_DIRS
            .iter()
            .filter(|sub| dir.join(sub).is_dir())
            .flat_map(|sub| {
                LIBRARY_PATTERNS.iter().map(move |pattern| {
                    if *sub == "." {
                        pattern.to_string()
                    } else {
                        format!("{}/{}", sub, pattern)
                    }
                })
            })
            .collect();

        let patterns: Vec<&str> = patterns.iter().map(String::as_str).collect();
        glob_relative(dir, &patterns)
    }
}

impl Adapter for CMakeAdapter {
    fn name(&self) -> &str {
        "CMake"
    }

    fn matches(&self, file_name: &str) -> bool {
        file_name == "CMakeLists.txt"
    }

    fn build(&self, config: &BuildConfig, descriptor: &Path) -> BuildResult {
        run_lifecycle(self.name(), self, config, descriptor)
    }

    /// Runs the `clean` target, falling back to `make clean`.
    fn clean(&self, config: &BuildConfig, descriptor: &Path) -> Result<()> {
        let dir = config.target_directory(descriptor);
        let clean = command(config, "cmake", &dir).args(["--build", ".", "--target", "clean"]);

        match self.runner.run(&clean) {
            Ok(output) if output.success => Ok(()),
            Ok(output) if !dir.join("Makefile").is_file() => bail!(
                "`{}` failed with {}",
                clean.display_command(),
                output.status_text()
            ),
            Err(e) if !dir.join("Makefile").is_file() => Err(e),
            _ => make_clean(self.runner.as_ref(), config, &dir),
        }
    }

    fn required_tools(&self) -> Vec<ToolRequirement> {
        vec![
            ToolRequirement::new("cmake", "CMake build system"),
            ToolRequirement::new("gcc", "C/C++ compiler").with_alternatives(["clang", "cc", "cl"]),
        ]
    }
}

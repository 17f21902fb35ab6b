//! Rust extensions built with Cargo.
//!
//! The crate is compiled as a `cdylib`; produced libraries are then staged
//! next to `Cargo.toml` under the name the runtime loads (`libfoo.so`
//! becomes `foo.so`, `foo.bundle` or `foo.dll`).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Result};

use crate::builder::lifecycle::{
    command, dl_ext, run_best_effort, run_lifecycle, run_step, Adapter, Lifecycle,
};
use crate::builder::tools::ToolRequirement;
use crate::core::{BuildConfig, BuildLog, BuildResult, Phase, PhaseResult};
use crate::util::fs::{copy_file, glob_relative};
use crate::util::process::{CommandRunner, ProcessBuilder};

const RUNTIME_CFG: &str = "--cfg=rb_sys_gem --cfg=rubygems";

pub struct CargoAdapter {
    runner: Arc<dyn CommandRunner>,
}

impl CargoAdapter {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        CargoAdapter { runner }
    }

    /// Look a variable up in the configured overrides, then the process
    /// environment.
    fn env_var(config: &BuildConfig, key: &str) -> Option<String> {
        config
            .env
            .get(key)
            .cloned()
            .or_else(|| std::env::var(key).ok())
            .filter(|v| !v.is_empty())
    }

    fn cargo_program(config: &BuildConfig) -> String {
        Self::env_var(config, "CARGO").unwrap_or_else(|| "cargo".to_string())
    }

    fn rustc_cmd(&self, config: &BuildConfig, dir: &Path) -> ProcessBuilder {
        let mut cmd = command(config, Self::cargo_program(config), dir)
            .args(["rustc", "--release", "--crate-type", "cdylib"]);

        if let Some(target) = Self::env_var(config, "CARGO_BUILD_TARGET") {
            cmd = cmd.arg("--target").arg(target);
        }
        if dir.join("Cargo.lock").is_file() {
            cmd = cmd.arg("--locked");
        }
        if let Some(jobs) = config.parallel {
            cmd = cmd.arg("--jobs").arg(jobs.to_string());
        }

        cmd = cmd.args(&config.build_args).arg("--").args(link_args());

        let rustflags = match Self::env_var(config, "RUSTFLAGS") {
            Some(existing) => format!("{} {}", existing, RUNTIME_CFG),
            None => RUNTIME_CFG.to_string(),
        };
        cmd = cmd.env("RUSTFLAGS", rustflags);

        if let Some(path) = &config.runtime_path {
            cmd = cmd.env("RUBY", path);
        }
        if let Some(version) = &config.runtime_version {
            cmd = cmd.env("RUBY_VERSION", version);
        }
        if let Some(engine) = &config.runtime_engine {
            cmd = cmd.env("RUBY_ENGINE", engine);
        }

        cmd
    }

    /// Copy produced libraries into `dir` under runtime naming.
    fn stage(&self, config: &BuildConfig, dir: &Path, mut log: BuildLog) -> PhaseResult {
        let mut release_dir = dir.join("target");
        if let Some(target) = Self::env_var(config, "CARGO_BUILD_TARGET") {
            release_dir = release_dir.join(target);
        }
        let release_dir = release_dir.join("release");

        let libraries = match glob_relative(&release_dir, library_patterns()) {
            Ok(libraries) => libraries,
            Err(e) => {
                return Err(log.fail(
                    self.name(),
                    Phase::Compile,
                    format!("failed to find cargo outputs: {:#}", e),
                ))
            }
        };

        if libraries.is_empty() {
            let cause = format!("no dynamic libraries found in {}", release_dir.display());
            return Err(log.fail(self.name(), Phase::Compile, cause));
        }

        for library in libraries {
            let source = release_dir.join(&library);
            let staged = dir.join(extension_name(&library));

            if let Err(e) = copy_file(&source, &staged) {
                return Err(log.fail(self.name(), Phase::Compile, format!("{:#}", e)));
            }
            tracing::debug!("staged {} -> {}", source.display(), staged.display());
            if config.verbose {
                log.push(format!("Copied {} -> {}", source.display(), staged.display()));
            }
        }

        Ok(log)
    }
}

impl Lifecycle for CargoAdapter {
    fn configure(&self, _config: &BuildConfig, _dir: &Path, log: BuildLog) -> PhaseResult {
        Ok(log)
    }

    fn compile(&self, config: &BuildConfig, dir: &Path, mut log: BuildLog) -> PhaseResult {
        if config.clean_first {
            let clean = command(config, Self::cargo_program(config), dir).arg("clean");
            log = run_best_effort(self.runner.as_ref(), config, &clean, log);
        }

        let cmd = self.rustc_cmd(config, dir);
        let log = run_step(self.runner.as_ref(), self.name(), Phase::Compile, config, &cmd, log)?;
        self.stage(config, dir, log)
    }

    fn locate(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let pattern = format!("*.{}", dl_ext());
        glob_relative(dir, &[pattern.as_str()])
    }
}

impl Adapter for CargoAdapter {
    fn name(&self) -> &str {
        "Cargo"
    }

    fn matches(&self, file_name: &str) -> bool {
        file_name == "Cargo.toml"
    }

    fn build(&self, config: &BuildConfig, descriptor: &Path) -> BuildResult {
        run_lifecycle(self.name(), self, config, descriptor)
    }

    fn clean(&self, config: &BuildConfig, descriptor: &Path) -> Result<()> {
        let dir = config.target_directory(descriptor);
        let clean = command(config, Self::cargo_program(config), &dir).arg("clean");
        let output = self.runner.run(&clean)?;
        if !output.success {
            bail!("`{}` failed with {}", clean.display_command(), output.status_text());
        }
        Ok(())
    }

    fn required_tools(&self) -> Vec<ToolRequirement> {
        vec![
            ToolRequirement::new("cargo", "Rust package manager"),
            ToolRequirement::new("rustc", "Rust compiler"),
        ]
    }
}

/// Dynamic libraries cargo produces on this platform.
fn library_patterns() -> &'static [&'static str] {
    if cfg!(windows) {
        &["*.dll"]
    } else if cfg!(target_os = "macos") {
        &["*.dylib"]
    } else {
        &["*.so"]
    }
}

/// Linker arguments the runtime needs on this platform.
fn link_args() -> Vec<&'static str> {
    if cfg!(target_os = "macos") {
        vec!["-C", "link-arg=-Wl,-undefined,dynamic_lookup"]
    } else if cfg!(windows) {
        vec![
            "-C",
            "link-arg=-Wl,--dynamicbase",
            "-C",
            "link-arg=-Wl,--disable-auto-image-base",
            "-C",
            "link-arg=-static-libgcc",
        ]
    } else {
        Vec::new()
    }
}

/// `libfoo.so` -> `foo.<dlext>`.
fn extension_name(library: &Path) -> String {
    let stem = library
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = stem.strip_prefix("lib").unwrap_or(&stem);
    format!("{}.{}", name, dl_ext())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::BuildError;
    use crate::test_support::MockRunner;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_extension_name() {
        assert_eq!(
            extension_name(Path::new("libmagnus_demo.so")),
            format!("magnus_demo.{}", dl_ext())
        );
        assert_eq!(extension_name(Path::new("demo.dll")), format!("demo.{}", dl_ext()));
    }

    #[test]
    fn test_build_stages_libraries() {
        let tmp = TempDir::new().unwrap();
        let ext = tmp.path().join("ext/demo");
        fs::create_dir_all(&ext).unwrap();
        fs::write(ext.join("Cargo.lock"), "").unwrap();

        let produced = library_patterns()[0].trim_start_matches("*.");
        let library = format!("target/release/libdemo.{}", produced);
        let runner = Arc::new(MockRunner::new().creates("cargo rustc", library));
        let adapter = CargoAdapter::new(runner.clone());
        let config = BuildConfig::new(tmp.path())
            .with_env("CARGO", "cargo")
            .with_env("RUSTFLAGS", "-Copt-level=3")
            .with_env("CARGO_BUILD_TARGET", "")
            .with_runtime_version("3.4.1")
            .with_parallel(Some(4));

        let result = adapter.build(&config, Path::new("ext/demo/Cargo.toml"));

        assert!(result.success(), "{:?}", result.error());
        assert_eq!(result.artifacts(), &[PathBuf::from(format!("demo.{}", dl_ext()))]);
        assert!(ext.join(format!("demo.{}", dl_ext())).is_file());

        let commands = runner.commands();
        let rustc = &commands[0];
        assert!(rustc
            .display_command()
            .starts_with("cargo rustc --release --crate-type cdylib --locked --jobs 4"));
        assert_eq!(
            rustc.get_env("RUSTFLAGS"),
            Some("-Copt-level=3 --cfg=rb_sys_gem --cfg=rubygems")
        );
        assert_eq!(rustc.get_env("RUBY_VERSION"), Some("3.4.1"));
    }

    #[test]
    fn test_no_libraries_is_compile_failure() {
        let tmp = TempDir::new().unwrap();
        let runner = Arc::new(MockRunner::new().respond("cargo", "Finished release"));
        let adapter = CargoAdapter::new(runner);
        let config = BuildConfig::new(tmp.path()).with_env("CARGO", "cargo");

        let result = adapter.build(&config, Path::new("Cargo.toml"));

        match result.error() {
            Some(BuildError::Phase {
                adapter,
                phase,
                cause,
                output,
            }) => {
                assert_eq!(adapter, "Cargo");
                assert_eq!(*phase, Phase::Compile);
                assert!(cause.starts_with("no dynamic libraries found in"));
                assert_eq!(output, "Finished release");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}

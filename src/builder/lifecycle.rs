//! The adapter contract and the three-phase lifecycle driver.
//!
//! Every toolchain adapter goes through the same sequence:
//!
//! ```text
//!   configure ──► compile ──► locate
//!       │            │           │
//!       └── fail ────┴── fail ───┴──► BuildResult (partial log + error)
//! ```
//!
//! The [`BuildLog`] is threaded by value through the phases so each one can
//! be exercised on its own in tests.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::builder::tools::ToolRequirement;
use crate::core::{BuildConfig, BuildError, BuildLog, BuildResult, Phase, PhaseResult};
use crate::util::fs::glob_relative;
use crate::util::process::{CommandRunner, ProcessBuilder};

/// Native library patterns searched by make-style toolchains.
pub const NATIVE_PATTERNS: &[&str] = &["*.so", "*.bundle", "*.dll"];

/// A toolchain adapter.
///
/// Registries evaluate [`Adapter::matches`] in registration order, so an
/// adapter must not assume no other adapter claims the same file.
pub trait Adapter: Send + Sync {
    /// Display name used in logs and failure messages.
    fn name(&self) -> &str;

    /// Whether this adapter claims a descriptor, given its final path segment.
    fn matches(&self, file_name: &str) -> bool;

    /// Build the extension described by `descriptor` (relative to the
    /// package root).
    fn build(&self, config: &BuildConfig, descriptor: &Path) -> BuildResult;

    /// Remove build products. Best-effort; the default does nothing.
    fn clean(&self, _config: &BuildConfig, _descriptor: &Path) -> Result<()> {
        Ok(())
    }

    /// External programs this adapter needs.
    fn required_tools(&self) -> Vec<ToolRequirement> {
        Vec::new()
    }
}

/// The three phases of a build.
pub trait Lifecycle {
    /// Prepare the build. May be a no-op.
    fn configure(&self, config: &BuildConfig, dir: &Path, log: BuildLog) -> PhaseResult;

    /// Compile and link, honoring `parallel`, `clean_first` and `dest_path`.
    fn compile(&self, config: &BuildConfig, dir: &Path, log: BuildLog) -> PhaseResult;

    /// Find produced artifacts, relative to `dir`.
    fn locate(&self, dir: &Path) -> Result<Vec<PathBuf>>;
}

/// Drive a lifecycle for one descriptor.
///
/// Phases run strictly in order; the first failure ends the build and its
/// error is recorded on the result along with every line logged so far.
pub fn run_lifecycle<L>(
    adapter: &str,
    lifecycle: &L,
    config: &BuildConfig,
    descriptor: &Path,
) -> BuildResult
where
    L: Lifecycle + ?Sized,
{
    let dir = config.target_directory(descriptor);

    tracing::debug!("{}: configuring {}", adapter, dir.display());
    let log = match lifecycle.configure(config, &dir, BuildLog::new()) {
        Ok(log) => log,
        Err(failure) => return failure.into(),
    };

    tracing::debug!("{}: compiling {}", adapter, dir.display());
    let log = match lifecycle.compile(config, &dir, log) {
        Ok(log) => log,
        Err(failure) => return failure.into(),
    };

    match lifecycle.locate(&dir) {
        Ok(artifacts) => {
            tracing::debug!("{}: located {} artifact(s)", adapter, artifacts.len());
            BuildResult::succeeded(log, artifacts)
        }
        Err(e) => {
            let error = BuildError::Locate {
                adapter: adapter.to_string(),
                cause: format!("{:#}", e),
                output: log.joined(),
            };
            BuildResult::failed(log, error)
        }
    }
}

/// Start a command in `dir` carrying the configured environment overrides.
///
/// Adapter-specific variables set afterwards take precedence.
pub fn command(config: &BuildConfig, program: impl AsRef<Path>, dir: &Path) -> ProcessBuilder {
    ProcessBuilder::new(program).cwd(dir).envs(&config.env)
}

/// Run one toolchain step, appending its output to the log.
///
/// A spawn error or non-zero exit becomes a failure of `phase`.
pub fn run_step(
    runner: &dyn CommandRunner,
    adapter: &str,
    phase: Phase,
    config: &BuildConfig,
    cmd: &ProcessBuilder,
    mut log: BuildLog,
) -> PhaseResult {
    record_command(config, cmd, &mut log);

    match runner.run(cmd) {
        Ok(output) => {
            log.push_output(&output.output);
            if output.success {
                Ok(log)
            } else {
                let cause = format!(
                    "`{}` failed with {}",
                    cmd.display_command(),
                    output.status_text()
                );
                Err(log.fail(adapter, phase, cause))
            }
        }
        Err(e) => Err(log.fail(adapter, phase, format!("{:#}", e))),
    }
}

/// Run a step whose failure is not fatal (clean sub-steps).
pub fn run_best_effort(
    runner: &dyn CommandRunner,
    config: &BuildConfig,
    cmd: &ProcessBuilder,
    mut log: BuildLog,
) -> BuildLog {
    record_command(config, cmd, &mut log);

    match runner.run(cmd) {
        Ok(output) => {
            log.push_output(&output.output);
            if !output.success {
                tracing::warn!(
                    "`{}` failed with {}, continuing",
                    cmd.display_command(),
                    output.status_text()
                );
            }
        }
        Err(e) => tracing::warn!("{:#}", e),
    }

    log
}

fn record_command(config: &BuildConfig, cmd: &ProcessBuilder, log: &mut BuildLog) {
    if config.verbose {
        log.push(format!("Running: {}", cmd.display_command()));
        if let Some(cwd) = cmd.get_cwd() {
            log.push(format!("Working directory: {}", cwd.display()));
        }
    }
}

/// Locate native libraries directly inside `dir`.
pub fn locate_native(dir: &Path) -> Result<Vec<PathBuf>> {
    glob_relative(dir, NATIVE_PATTERNS)
}

/// The host runtime's loadable extension suffix, without the dot.
pub fn dl_ext() -> &'static str {
    if cfg!(target_os = "macos") {
        "bundle"
    } else if cfg!(windows) {
        "dll"
    } else {
        "so"
    }
}

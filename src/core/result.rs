//! Per-target build results and the log accumulator threaded through phases.

use std::path::PathBuf;

use crate::core::error::{BuildError, Phase};

/// Chronological log of a single target's build.
///
/// Phases take the log by value and hand it back, so every line a phase
/// produced is still available when a later phase fails.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildLog {
    lines: Vec<String>,
    missing_dependencies: Vec<String>,
}

impl BuildLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a single line.
    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// Append the combined output of a process, one entry per line.
    pub fn push_output(&mut self, output: &str) {
        self.lines.extend(output.lines().map(str::to_string));
    }

    /// Record a dependency that could not be found.
    pub fn missing(&mut self, dependency: impl Into<String>) {
        let dependency = dependency.into();
        if !self.missing_dependencies.contains(&dependency) {
            self.missing_dependencies.push(dependency);
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn missing_dependencies(&self) -> &[String] {
        &self.missing_dependencies
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The full log joined with newlines.
    pub fn joined(&self) -> String {
        self.lines.join("\n")
    }

    /// Concatenate another log after this one.
    pub fn append(mut self, other: BuildLog) -> Self {
        self.lines.extend(other.lines);
        for dep in other.missing_dependencies {
            self.missing(dep);
        }
        self
    }

    /// Turn this log into a failure of `phase`, rendering the accumulated
    /// output into the error.
    pub fn fail(
        self,
        adapter: &str,
        phase: Phase,
        cause: impl std::fmt::Display,
    ) -> PhaseFailure {
        let error = BuildError::Phase {
            adapter: adapter.to_string(),
            phase,
            cause: cause.to_string(),
            output: self.joined(),
        };
        PhaseFailure { log: self, error }
    }
}

/// A failed phase: the log up to the failure and the error it raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseFailure {
    pub log: BuildLog,
    pub error: BuildError,
}

/// Outcome of a configure or compile phase.
pub type PhaseResult = Result<BuildLog, PhaseFailure>;

/// Result of building one target.
///
/// Built once by the lifecycle driver (or the registry, for targets that
/// never reached an adapter) and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildResult {
    success: bool,
    log: BuildLog,
    artifacts: Vec<PathBuf>,
    error: Option<BuildError>,
}

impl BuildResult {
    /// A successful build with the located artifacts.
    pub fn succeeded(log: BuildLog, artifacts: Vec<PathBuf>) -> Self {
        BuildResult {
            success: true,
            log,
            artifacts,
            error: None,
        }
    }

    /// A failed build carrying everything logged before the failure.
    pub fn failed(log: BuildLog, error: BuildError) -> Self {
        BuildResult {
            success: false,
            log,
            artifacts: Vec::new(),
            error: Some(error),
        }
    }

    /// A failure that happened before any phase ran.
    pub fn from_error(error: BuildError) -> Self {
        Self::failed(BuildLog::new(), error)
    }

    /// Placeholder result for a target halted by cancellation.
    pub fn cancelled() -> Self {
        Self::from_error(BuildError::Cancelled)
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn output(&self) -> &[String] {
        self.log.lines()
    }

    pub fn log(&self) -> &BuildLog {
        &self.log
    }

    /// Artifact paths relative to the target's build directory.
    pub fn artifacts(&self) -> &[PathBuf] {
        &self.artifacts
    }

    pub fn missing_dependencies(&self) -> &[String] {
        self.log.missing_dependencies()
    }

    pub fn error(&self) -> Option<&BuildError> {
        self.error.as_ref()
    }
}

impl From<PhaseFailure> for BuildResult {
    fn from(failure: PhaseFailure) -> Self {
        BuildResult::failed(failure.log, failure.error)
    }
}

//! Test utilities and mocks for extbuild unit tests.
//!
//! [`MockRunner`] stands in for external toolchains: it returns scripted
//! outputs, records every command and can drop files into the working
//! directory as if a tool had produced them. [`MockAdapter`] is a
//! registry-level stand-in that counts its builds.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use extbuild::test_support::MockRunner;
//!
//! let runner = Arc::new(
//!     MockRunner::new()
//!         .respond("ruby extconf.rb", "creating Makefile")
//!         .creates("ruby extconf.rb", "Makefile"),
//! );
//! let adapter = ExtConfAdapter::new(runner.clone());
//! // ...
//! assert_eq!(runner.calls()[0], "ruby extconf.rb");
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{bail, Result};

use crate::builder::Adapter;
use crate::core::{BuildConfig, BuildError, BuildLog, BuildResult, Phase};
use crate::util::process::{CommandRunner, ProcessBuilder, ProcessOutput};

/// Pattern for matching rendered commands.
#[derive(Debug, Clone)]
pub enum CommandPattern {
    /// Match on the full command string.
    Exact(String),
    /// Match if the command starts with a prefix.
    StartsWith(String),
    /// Match if the command contains a substring.
    Contains(String),
}

impl CommandPattern {
    pub fn matches(&self, cmd: &str) -> bool {
        match self {
            CommandPattern::Exact(s) => cmd == s,
            CommandPattern::StartsWith(s) => cmd.starts_with(s),
            CommandPattern::Contains(s) => cmd.contains(s),
        }
    }
}

#[derive(Debug, Clone)]
enum Reaction {
    Output(ProcessOutput),
    SpawnError(String),
    Creates(PathBuf),
}

/// Scripted [`CommandRunner`].
///
/// Commands with no matching script succeed with empty output. Scripts are
/// tried in the order they were added; the first output-producing match
/// wins, while every matching `creates` entry is applied.
#[derive(Debug, Default)]
pub struct MockRunner {
    scripts: Vec<(CommandPattern, Reaction)>,
    programs: Vec<String>,
    calls: Mutex<Vec<ProcessBuilder>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Succeed with `output` for commands starting with `prefix`.
    pub fn respond(mut self, prefix: &str, output: &str) -> Self {
        self.scripts.push((
            CommandPattern::StartsWith(prefix.to_string()),
            Reaction::Output(ProcessOutput::succeeded(output)),
        ));
        self
    }

    /// Exit with `status` for commands starting with `prefix`.
    pub fn fail_on(mut self, prefix: &str, status: i32, output: &str) -> Self {
        self.scripts.push((
            CommandPattern::StartsWith(prefix.to_string()),
            Reaction::Output(ProcessOutput::failed(status, output)),
        ));
        self
    }

    /// Exit with `status` for commands containing `needle`.
    pub fn fail_containing(mut self, needle: &str, status: i32) -> Self {
        self.scripts.push((
            CommandPattern::Contains(needle.to_string()),
            Reaction::Output(ProcessOutput::failed(status, "")),
        ));
        self
    }

    /// Fail to spawn commands starting with `prefix`.
    pub fn spawn_error(mut self, prefix: &str, message: &str) -> Self {
        self.scripts.push((
            CommandPattern::StartsWith(prefix.to_string()),
            Reaction::SpawnError(message.to_string()),
        ));
        self
    }

    /// Create `file` (relative to the command's working directory) when a
    /// command starting with `prefix` runs.
    pub fn creates(mut self, prefix: &str, file: impl Into<PathBuf>) -> Self {
        self.scripts.push((
            CommandPattern::StartsWith(prefix.to_string()),
            Reaction::Creates(file.into()),
        ));
        self
    }

    /// Make `name` discoverable through [`CommandRunner::find_program`].
    pub fn with_program(mut self, name: &str) -> Self {
        self.programs.push(name.to_string());
        self
    }

    /// Rendered commands, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.commands()
            .iter()
            .map(ProcessBuilder::display_command)
            .collect()
    }

    /// Recorded commands, in call order.
    pub fn commands(&self) -> Vec<ProcessBuilder> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn apply_creates(&self, cmd: &ProcessBuilder, rendered: &str) -> Result<()> {
        let cwd = cmd.get_cwd().unwrap_or_else(|| Path::new("."));
        for (pattern, reaction) in &self.scripts {
            if let Reaction::Creates(file) = reaction {
                if pattern.matches(rendered) {
                    let path = cwd.join(file);
                    if let Some(parent) = path.parent() {
                        fs::create_dir_all(parent)?;
                    }
                    fs::write(&path, "mock artifact")?;
                }
            }
        }
        Ok(())
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, cmd: &ProcessBuilder) -> Result<ProcessOutput> {
        let rendered = cmd.display_command();
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(cmd.clone());
        }

        self.apply_creates(cmd, &rendered)?;

        for (pattern, reaction) in &self.scripts {
            if !pattern.matches(&rendered) {
                continue;
            }
            match reaction {
                Reaction::Output(output) => return Ok(output.clone()),
                Reaction::SpawnError(message) => bail!("{}", message),
                Reaction::Creates(_) => {}
            }
        }

        Ok(ProcessOutput::succeeded(""))
    }

    fn find_program(&self, name: &str) -> Option<PathBuf> {
        self.programs
            .iter()
            .any(|p| p == name)
            .then(|| PathBuf::from("/usr/bin").join(name))
    }
}

type Predicate = Box<dyn Fn(&str) -> bool + Send + Sync>;
type Hook = Box<dyn Fn() + Send + Sync>;

/// Adapter with scripted outcomes and a build counter.
pub struct MockAdapter {
    name: String,
    predicate: Predicate,
    fail: bool,
    artifacts: Vec<PathBuf>,
    on_build: Option<Hook>,
    builds: AtomicUsize,
}

impl MockAdapter {
    /// An adapter whose builds succeed.
    pub fn new<F>(name: &str, predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        MockAdapter {
            name: name.to_string(),
            predicate: Box::new(predicate),
            fail: false,
            artifacts: Vec::new(),
            on_build: None,
            builds: AtomicUsize::new(0),
        }
    }

    /// An adapter whose builds fail in the compile phase.
    pub fn failing<F>(name: &str, predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        MockAdapter {
            fail: true,
            ..Self::new(name, predicate)
        }
    }

    /// Artifacts reported by successful builds.
    pub fn with_artifacts<I, P>(mut self, artifacts: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.artifacts = artifacts.into_iter().map(Into::into).collect();
        self
    }

    /// Run `hook` during every build.
    pub fn on_build<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_build = Some(Box::new(hook));
        self
    }

    /// Number of builds so far.
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

impl Adapter for MockAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, file_name: &str) -> bool {
        (self.predicate)(file_name)
    }

    fn build(&self, _config: &BuildConfig, descriptor: &Path) -> BuildResult {
        self.builds.fetch_add(1, Ordering::SeqCst);
        if let Some(hook) = &self.on_build {
            hook();
        }

        let mut log = BuildLog::new();
        log.push(format!("building {}", descriptor.display()));

        if self.fail {
            let error = BuildError::Phase {
                adapter: self.name.clone(),
                phase: Phase::Compile,
                cause: "exit status 1".to_string(),
                output: log.joined(),
            };
            BuildResult::failed(log, error)
        } else {
            BuildResult::succeeded(log, self.artifacts.clone())
        }
    }
}

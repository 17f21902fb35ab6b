//! Subprocess execution utilities.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result};

/// Builder for subprocess execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    cwd: Option<PathBuf>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: BTreeMap::new(),
            cwd: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: impl AsRef<str>, value: impl AsRef<OsStr>) -> Self {
        self.env.insert(
            key.as_ref().to_string(),
            value.as_ref().to_string_lossy().into_owned(),
        );
        self
    }

    /// Set several environment variables.
    pub fn envs<'a, I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        for (key, value) in vars {
            self.env.insert(key.clone(), value.clone());
        }
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    /// Get the program path.
    pub fn get_program(&self) -> &Path {
        &self.program
    }

    /// Get the arguments.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Get an environment override, if set.
    pub fn get_env(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str)
    }

    /// Get the working directory.
    pub fn get_cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.envs(&self.env);

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        cmd
    }

    /// Execute the command and wait for completion, capturing its output.
    pub fn exec(&self) -> Result<ProcessOutput> {
        let output = self
            .build_command()
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("failed to spawn `{}`", self.program.display()))?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(ProcessOutput {
            status: output.status.code(),
            success: output.status.success(),
            output: combined,
        })
    }

    /// Display the command for logs and error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` when terminated by a signal
    pub status: Option<i32>,
    pub success: bool,
    /// Stdout followed by stderr
    pub output: String,
}

impl ProcessOutput {
    pub fn succeeded(output: impl Into<String>) -> Self {
        ProcessOutput {
            status: Some(0),
            success: true,
            output: output.into(),
        }
    }

    pub fn failed(status: i32, output: impl Into<String>) -> Self {
        ProcessOutput {
            status: Some(status),
            success: false,
            output: output.into(),
        }
    }

    /// Human readable exit status.
    pub fn status_text(&self) -> String {
        match self.status {
            Some(code) => format!("exit status {}", code),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Process execution facility used by adapters.
pub trait CommandRunner: Send + Sync {
    /// Run a command to completion.
    fn run(&self, cmd: &ProcessBuilder) -> Result<ProcessOutput>;

    /// Locate a program on PATH.
    fn find_program(&self, name: &str) -> Option<PathBuf> {
        find_executable(name)
    }
}

/// Runs real processes on the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, cmd: &ProcessBuilder) -> Result<ProcessOutput> {
        tracing::debug!("Running `{}`", cmd.display_command());
        cmd.exec()
    }
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

/// The make program for this platform, honoring `$MAKE`.
pub fn make_program() -> String {
    if let Ok(make) = std::env::var("MAKE") {
        if !make.is_empty() {
            return make;
        }
    }

    if cfg!(windows) {
        "nmake".to_string()
    } else {
        "make".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_process_builder() {
        let output = ProcessBuilder::new("echo").arg("hello").exec().unwrap();

        assert!(output.success);
        assert!(output.output.contains("hello"));
    }

    #[test]
    fn test_display_command() {
        let pb = ProcessBuilder::new("cmake").args(["--build", ".", "--config", "Release"]);

        assert_eq!(pb.display_command(), "cmake --build . --config Release");
    }

    #[test]
    fn test_env_overrides() {
        let mut vars = BTreeMap::new();
        vars.insert("CC".to_string(), "clang".to_string());

        let pb = ProcessBuilder::new("make").envs(&vars).env("DESTDIR", "/tmp/out");
        assert_eq!(pb.get_env("CC"), Some("clang"));
        assert_eq!(pb.get_env("DESTDIR"), Some("/tmp/out"));
    }

    #[test]
    fn test_status_text() {
        assert_eq!(ProcessOutput::failed(2, "").status_text(), "exit status 2");
        assert_eq!(
            ProcessOutput {
                status: None,
                success: false,
                output: String::new()
            }
            .status_text(),
            "terminated by signal"
        );
    }
}

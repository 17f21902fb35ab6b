//! Table-driven adapters for toolchains without a dedicated implementation.
//!
//! A [`GenericSpec`] names the descriptor patterns it claims and a command
//! template. Templates may use these placeholders:
//!
//! - `{{input}}`: the descriptor file name
//! - `{{output}}`: descriptor stem plus the runtime suffix, under the
//!   destination when one is set
//! - `{{dir}}`: the build directory

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use glob::{MatchOptions, Pattern};

use crate::builder::lifecycle::{
    command, dl_ext, run_best_effort, run_lifecycle, run_step, Adapter, Lifecycle, NATIVE_PATTERNS,
};
use crate::builder::tools::ToolRequirement;
use crate::core::{BuildConfig, BuildLog, BuildResult, Phase, PhaseResult};
use crate::util::fs::glob_relative;
use crate::util::process::{CommandRunner, ProcessBuilder};

const CASE_INSENSITIVE: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Definition of a generic adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericSpec {
    pub name: String,
    /// Descriptor file name globs, matched case-insensitively
    pub patterns: Vec<String>,
    pub tools: Vec<ToolRequirement>,
    /// Program and arguments, with placeholders
    pub build_command: Vec<String>,
    pub clean_command: Vec<String>,
    /// Artifact globs relative to the build directory; empty means the
    /// native library suffixes
    pub output_patterns: Vec<String>,
}

impl GenericSpec {
    pub fn new<I, S>(name: impl Into<String>, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        GenericSpec {
            name: name.into(),
            patterns: patterns.into_iter().map(Into::into).collect(),
            tools: Vec::new(),
            build_command: Vec::new(),
            clean_command: Vec::new(),
            output_patterns: Vec::new(),
        }
    }

    pub fn with_tool(mut self, tool: ToolRequirement) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn with_build_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.build_command = command.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_clean_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.clean_command = command.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_output_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Built-in presets: Crystal, Zig and Swift.
    pub fn presets() -> Vec<GenericSpec> {
        vec![
            GenericSpec::new("Crystal", ["*.cr", "shard.yml"])
                .with_tool(ToolRequirement::new("crystal", "Crystal compiler"))
                .with_build_command([
                    "crystal",
                    "build",
                    "--single-module",
                    "--link-flags=-shared",
                    "-o",
                    "{{output}}",
                    "{{input}}",
                ])
                .with_output_patterns(["*.so", "*.dylib", "*.dll", "*.bundle"]),
            GenericSpec::new("Zig", ["build.zig", "*.zig"])
                .with_tool(ToolRequirement::new("zig", "Zig compiler"))
                .with_build_command([
                    "zig",
                    "build-lib",
                    "-dynamic",
                    "-O",
                    "ReleaseFast",
                    "{{input}}",
                ])
                .with_output_patterns([
                    "*.so",
                    "*.dylib",
                    "*.dll",
                    "zig-out/lib/*.so",
                    "zig-out/lib/*.dylib",
                ]),
            GenericSpec::new("Swift", ["*.swift", "Package.swift"])
                .with_tool(ToolRequirement::new("swiftc", "Swift compiler"))
                .with_build_command(["swiftc", "-emit-library", "-o", "{{output}}", "{{input}}"])
                .with_output_patterns(["*.so", "*.dylib", "*.dll"]),
        ]
    }
}

pub struct GenericAdapter {
    spec: GenericSpec,
    patterns: Vec<Pattern>,
    runner: Arc<dyn CommandRunner>,
}

impl GenericAdapter {
    /// Invalid patterns in `spec` are dropped with a warning.
    pub fn new(spec: GenericSpec, runner: Arc<dyn CommandRunner>) -> Self {
        let patterns = spec
            .patterns
            .iter()
            .filter_map(|p| match Pattern::new(p) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    tracing::warn!("ignoring pattern `{}` of {} adapter: {}", p, spec.name, e);
                    None
                }
            })
            .collect();

        GenericAdapter {
            spec,
            patterns,
            runner,
        }
    }

    pub fn spec(&self) -> &GenericSpec {
        &self.spec
    }
}

/// Values substituted into a command template.
struct Placeholders {
    input: String,
    output: String,
    dir: String,
}

impl Placeholders {
    fn new(config: &BuildConfig, descriptor: &Path, dir: &Path) -> Self {
        let input = descriptor
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = descriptor
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        let output = format!("{}.{}", stem, dl_ext());
        let output = match &config.dest_path {
            Some(dest) => dest.join(output).display().to_string(),
            None => output,
        };

        Placeholders {
            input,
            output,
            dir: dir.display().to_string(),
        }
    }

    fn expand(&self, arg: &str) -> String {
        arg.replace("{{input}}", &self.input)
            .replace("{{output}}", &self.output)
            .replace("{{dir}}", &self.dir)
    }
}

/// One generic build; placeholders depend on the descriptor.
struct GenericBuild<'a> {
    adapter: &'a GenericAdapter,
    descriptor: &'a Path,
}

impl GenericBuild<'_> {
    fn render(&self, config: &BuildConfig, dir: &Path, template: &[String]) -> Option<ProcessBuilder> {
        let (program, args) = template.split_first()?;
        let values = Placeholders::new(config, self.descriptor, dir);

        Some(
            command(config, values.expand(program), dir)
                .args(args.iter().map(|arg| values.expand(arg))),
        )
    }
}

impl Lifecycle for GenericBuild<'_> {
    fn configure(&self, _config: &BuildConfig, _dir: &Path, log: BuildLog) -> PhaseResult {
        Ok(log)
    }

    fn compile(&self, config: &BuildConfig, dir: &Path, mut log: BuildLog) -> PhaseResult {
        let spec = &self.adapter.spec;
        let runner = self.adapter.runner.as_ref();

        if config.clean_first {
            if let Some(clean) = self.render(config, dir, &spec.clean_command) {
                log = run_best_effort(runner, config, &clean, log);
            }
        }

        let Some(cmd) = self.render(config, dir, &spec.build_command) else {
            let cause = format!("no build command configured for {} adapter", spec.name);
            return Err(log.fail(&spec.name, Phase::Compile, cause));
        };
        let cmd = cmd.args(&config.build_args);

        run_step(runner, &spec.name, Phase::Compile, config, &cmd, log)
    }

    fn locate(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let outputs = &self.adapter.spec.output_patterns;
        if outputs.is_empty() {
            return glob_relative(dir, NATIVE_PATTERNS);
        }
        let patterns: Vec<&str> = outputs.iter().map(String::as_str).collect();
        glob_relative(dir, &patterns)
    }
}

impl Adapter for GenericAdapter {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn matches(&self, file_name: &str) -> bool {
        self.patterns
            .iter()
            .any(|pattern| pattern.matches_with(file_name, CASE_INSENSITIVE))
    }

    fn build(&self, config: &BuildConfig, descriptor: &Path) -> BuildResult {
        let build = GenericBuild {
            adapter: self,
            descriptor,
        };
        run_lifecycle(self.name(), &build, config, descriptor)
    }

    fn clean(&self, config: &BuildConfig, descriptor: &Path) -> Result<()> {
        let dir = config.target_directory(descriptor);
        let build = GenericBuild {
            adapter: self,
            descriptor,
        };
        if let Some(clean) = build.render(config, &dir, &self.spec.clean_command) {
            run_best_effort(self.runner.as_ref(), config, &clean, BuildLog::new());
        }
        Ok(())
    }

    fn required_tools(&self) -> Vec<ToolRequirement> {
        self.spec.tools.clone()
    }
}

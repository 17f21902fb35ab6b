//! JVM extensions: Maven projects or loose Java sources.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use super::{lower_extension, lower_name};
use crate::builder::lifecycle::{
    command, run_best_effort, run_lifecycle, run_step, Adapter, Lifecycle,
};
use crate::builder::tools::ToolRequirement;
use crate::core::{BuildConfig, BuildLog, BuildResult, Phase, PhaseResult};
use crate::util::fs::glob_relative;
use crate::util::process::CommandRunner;

const POM: &str = "pom.xml";
const CLASSES_DIR: &str = "classes";
const JAR_NAME: &str = "extension.jar";

pub struct JavaAdapter {
    runner: Arc<dyn CommandRunner>,
}

impl JavaAdapter {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        JavaAdapter { runner }
    }

    fn is_maven(descriptor: &Path) -> bool {
        descriptor
            .file_name()
            .is_some_and(|name| lower_name(&name.to_string_lossy()) == POM)
    }
}

/// One Java build, either through Maven or javac + jar.
struct JavaBuild<'a> {
    runner: &'a dyn CommandRunner,
    maven: bool,
}

impl JavaBuild<'_> {
    fn package(&self, config: &BuildConfig, dir: &Path, log: BuildLog) -> PhaseResult {
        let cmd = command(config, "mvn", dir).arg("package").args(&config.build_args);
        run_step(self.runner, "Java", Phase::Compile, config, &cmd, log)
    }

    fn javac(&self, config: &BuildConfig, dir: &Path, log: BuildLog) -> PhaseResult {
        let sources = match glob_relative(dir, &["*.java"]) {
            Ok(sources) if !sources.is_empty() => sources,
            Ok(_) => {
                let cause = format!("no Java source files found in {}", dir.display());
                return Err(log.fail("Java", Phase::Compile, cause));
            }
            Err(e) => return Err(log.fail("Java", Phase::Compile, format!("{:#}", e))),
        };

        let javac = command(config, "javac", dir)
            .args(["-d", CLASSES_DIR])
            .args(&config.build_args)
            .args(&sources);
        let log = run_step(self.runner, "Java", Phase::Compile, config, &javac, log)?;

        let jar = match &config.dest_path {
            Some(dest) => dest.join(JAR_NAME),
            None => PathBuf::from(JAR_NAME),
        };
        let archive = command(config, "jar", dir)
            .arg("cf")
            .arg(&jar)
            .args(["-C", CLASSES_DIR, "."]);
        run_step(self.runner, "Java", Phase::Compile, config, &archive, log)
    }
}

impl Lifecycle for JavaBuild<'_> {
    fn configure(&self, config: &BuildConfig, _dir: &Path, mut log: BuildLog) -> PhaseResult {
        if config.verbose {
            log.push("Java project, no configuration needed");
        }
        Ok(log)
    }

    fn compile(&self, config: &BuildConfig, dir: &Path, log: BuildLog) -> PhaseResult {
        if self.maven {
            self.package(config, dir, log)
        } else {
            self.javac(config, dir, log)
        }
    }

    fn locate(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        glob_relative(dir, &["*.jar", "target/*.jar"])
    }
}

impl Adapter for JavaAdapter {
    fn name(&self) -> &str {
        "Java"
    }

    fn matches(&self, file_name: &str) -> bool {
        lower_name(file_name) == POM || lower_extension(file_name).as_deref() == Some("java")
    }

    fn build(&self, config: &BuildConfig, descriptor: &Path) -> BuildResult {
        let build = JavaBuild {
            runner: self.runner.as_ref(),
            maven: Self::is_maven(descriptor),
        };
        run_lifecycle(self.name(), &build, config, descriptor)
    }

    fn clean(&self, config: &BuildConfig, descriptor: &Path) -> Result<()> {
        let dir = config.target_directory(descriptor);

        if Self::is_maven(descriptor) {
            let clean = command(config, "mvn", &dir).arg("clean");
            run_best_effort(self.runner.as_ref(), config, &clean, BuildLog::new());
            return Ok(());
        }

        for file in glob_relative(&dir, &["*.class", "*.jar"])? {
            let path = dir.join(file);
            if let Err(e) = fs::remove_file(&path) {
                tracing::warn!("failed to remove {}: {}", path.display(), e);
            }
        }
        let classes = dir.join(CLASSES_DIR);
        if classes.is_dir() {
            fs::remove_dir_all(&classes)?;
        }
        Ok(())
    }

    fn required_tools(&self) -> Vec<ToolRequirement> {
        vec![
            ToolRequirement::new("javac", "Java compiler"),
            ToolRequirement::new("jar", "Java archive tool"),
            ToolRequirement::new("mvn", "Maven build tool (for pom.xml projects)").optional(),
        ]
    }
}

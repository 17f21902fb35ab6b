//! Hand-written makefiles, and the make invocation shared with the
//! generated-makefile adapters.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Result};

use super::{lower_name, make_toolchain};
use crate::builder::lifecycle::{
    command, locate_native, run_best_effort, run_lifecycle, run_step, Adapter, Lifecycle,
};
use crate::builder::tools::ToolRequirement;
use crate::core::{BuildConfig, BuildLog, BuildResult, Phase, PhaseResult};
use crate::util::process::{make_program, CommandRunner};

/// Run make in `dir`: optional clean, the build with `-j<N>`, then
/// `make install` with `DESTDIR` when a destination is configured.
pub(super) fn run_make(
    runner: &dyn CommandRunner,
    adapter: &str,
    config: &BuildConfig,
    dir: &Path,
    mut log: BuildLog,
) -> PhaseResult {
    let make = make_program();

    if config.clean_first {
        let clean = command(config, &make, dir).arg("clean");
        log = run_best_effort(runner, config, &clean, log);
    }

    let mut build = command(config, &make, dir);
    if let Some(jobs) = config.parallel {
        build = build.arg(format!("-j{}", jobs));
    }
    if let Some(dest) = &config.dest_path {
        build = build.env("DESTDIR", dest);
    }
    let log = run_step(runner, adapter, Phase::Compile, config, &build, log)?;

    match &config.dest_path {
        Some(dest) => {
            let install = command(config, &make, dir).arg("install").env("DESTDIR", dest);
            run_step(runner, adapter, Phase::Compile, config, &install, log)
        }
        None => Ok(log),
    }
}

/// `make clean`, if a Makefile has been generated.
pub(super) fn make_clean(runner: &dyn CommandRunner, config: &BuildConfig, dir: &Path) -> Result<()> {
    if !dir.join("Makefile").is_file() {
        return Ok(());
    }

    let clean = command(config, make_program(), dir).arg("clean");
    let output = runner.run(&clean)?;
    if !output.success {
        bail!("`{}` failed with {}", clean.display_command(), output.status_text());
    }
    Ok(())
}

/// Builds an existing Makefile with no configuration step.
pub struct MakefileAdapter {
    runner: Arc<dyn CommandRunner>,
}

impl MakefileAdapter {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        MakefileAdapter { runner }
    }
}

impl Lifecycle for MakefileAdapter {
    fn configure(&self, config: &BuildConfig, _dir: &Path, mut log: BuildLog) -> PhaseResult {
        if config.verbose {
            log.push("Using existing Makefile, no configuration needed");
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

impl Adapter for MakefileAdapter {
    fn name(&self) -> &str {
        "Makefile"
    }

    fn matches(&self, file_name: &str) -> bool {
        matches!(lower_name(file_name).as_str(), "makefile" | "gnumakefile")
    }

    fn build(&self, config: &BuildConfig, descriptor: &Path) -> BuildResult {
        run_lifecycle(self.name(), self, config, descriptor)
    }

    fn clean(&self, config: &BuildConfig, descriptor: &Path) -> Result<()> {
        let dir = config.target_directory(descriptor);
        let clean = command(config, make_program(), &dir).arg("clean");
        run_best_effort(self.runner.as_ref(), config, &clean, BuildLog::new());
        Ok(())
    }

    fn required_tools(&self) -> Vec<ToolRequirement> {
        make_toolchain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::BuildError;
    use crate::test_support::MockRunner;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_matches() {
        let adapter = MakefileAdapter::new(Arc::new(MockRunner::new()));
        assert!(adapter.matches("Makefile"));
        assert!(adapter.matches("makefile"));
        assert!(adapter.matches("GNUmakefile"));
        assert!(!adapter.matches("Makefile.in"));
        assert!(!adapter.matches("CMakeLists.txt"));
    }

    #[test]
    fn test_build_with_jobs_and_destination() {
        let tmp = TempDir::new().unwrap();
        let ext = tmp.path().join("ext/demo");
        fs::create_dir_all(&ext).unwrap();
        fs::write(ext.join("Makefile"), "all:\n").unwrap();

        let make = make_program();
        let runner = Arc::new(MockRunner::new().creates(&make, "demo.so"));
        let adapter = MakefileAdapter::new(runner.clone());
        let config = BuildConfig::new(tmp.path())
            .with_parallel(Some(4))
            .with_clean_first(true)
            .with_dest_path("/tmp/stage");

        let result = adapter.build(&config, Path::new("ext/demo/Makefile"));

        assert!(result.success(), "{:?}", result.error());
        assert_eq!(result.artifacts(), &[PathBuf::from("demo.so")]);
        assert_eq!(
            runner.calls(),
            vec![
                format!("{} clean", make),
                format!("{} -j4", make),
                format!("{} install", make),
            ]
        );

        let commands = runner.commands();
        assert_eq!(commands[1].get_env("DESTDIR"), Some("/tmp/stage"));
        assert_eq!(commands[1].get_cwd(), Some(ext.as_path()));
    }

    #[test]
    fn test_install_step_failure() {
        let tmp = TempDir::new().unwrap();
        let runner = Arc::new(MockRunner::new().fail_containing(" install", 2));
        let adapter = MakefileAdapter::new(runner.clone());
        let config = BuildConfig::new(tmp.path()).with_dest_path("/tmp/stage");

        let result = adapter.build(&config, Path::new("Makefile"));

        assert!(!result.success());
        assert_eq!(runner.calls().len(), 2);
        assert!(result.artifacts().is_empty());
    }

    #[test]
    fn test_compile_failure() {
        let tmp = TempDir::new().unwrap();
        let make = make_program();
        let runner = Arc::new(MockRunner::new().fail_on(&make, 2, "demo.c:3: error: expected ';'"));
        let adapter = MakefileAdapter::new(runner);
        let config = BuildConfig::new(tmp.path());

        let result = adapter.build(&config, Path::new("Makefile"));

        assert!(!result.success());
        match result.error() {
            Some(BuildError::Phase { adapter, phase, .. }) => {
                assert_eq!(adapter, "Makefile");
                assert_eq!(*phase, Phase::Compile);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(result
            .error()
            .unwrap()
            .to_string()
            .contains("Build output:\ndemo.c:3: error: expected ';'"));
    }

    #[test]
    fn test_make_clean_without_makefile_is_noop() {
        let tmp = TempDir::new().unwrap();
        let runner = MockRunner::new();
        make_clean(&runner, &BuildConfig::new(tmp.path()), tmp.path()).unwrap();
        assert!(runner.calls().is_empty());
    }
}

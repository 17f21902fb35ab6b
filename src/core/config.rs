//! Per-run build configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Immutable configuration for one build invocation.
///
/// Constructed once by the caller and shared read-only with adapters and
/// the install resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    /// Root directory of the extracted package
    pub package_root: PathBuf,

    /// Explicit destination for compiled extensions
    pub dest_path: Option<PathBuf>,

    /// Library directory override for installation
    pub lib_dir: Option<PathBuf>,

    /// Extra arguments passed to the toolchain
    pub build_args: Vec<String>,

    /// Environment overrides for every spawned process
    pub env: BTreeMap<String, String>,

    /// Runtime engine identifier (ruby, jruby, truffleruby)
    pub runtime_engine: Option<String>,

    /// Dotted runtime version, e.g. "3.4.0"
    pub runtime_version: Option<String>,

    /// Path to the runtime executable
    pub runtime_path: Option<PathBuf>,

    /// Record the commands being run in the build log
    pub verbose: bool,

    /// Run the toolchain's clean step before compiling
    pub clean_first: bool,

    /// Parallel job count handed to the toolchain
    pub parallel: Option<usize>,

    /// Stop a batch at the first failing target
    pub stop_on_failure: bool,
}

impl BuildConfig {
    /// Create a configuration rooted at `package_root` with default options.
    pub fn new(package_root: impl Into<PathBuf>) -> Self {
        BuildConfig {
            package_root: package_root.into(),
            dest_path: None,
            lib_dir: None,
            build_args: Vec::new(),
            env: BTreeMap::new(),
            runtime_engine: None,
            runtime_version: None,
            runtime_path: None,
            verbose: false,
            clean_first: false,
            parallel: None,
            stop_on_failure: true,
        }
    }

    pub fn with_dest_path(mut self, dest: impl Into<PathBuf>) -> Self {
        self.dest_path = Some(dest.into());
        self
    }

    pub fn with_lib_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.lib_dir = Some(dir.into());
        self
    }

    pub fn with_build_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.build_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment override. Later values for the same key win.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_runtime_engine(mut self, engine: impl Into<String>) -> Self {
        self.runtime_engine = Some(engine.into());
        self
    }

    pub fn with_runtime_version(mut self, version: impl Into<String>) -> Self {
        self.runtime_version = Some(version.into());
        self
    }

    pub fn with_runtime_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.runtime_path = Some(path.into());
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_clean_first(mut self, clean_first: bool) -> Self {
        self.clean_first = clean_first;
        self
    }

    /// Set the job count. Zero means "let the toolchain decide".
    pub fn with_parallel(mut self, jobs: Option<usize>) -> Self {
        self.parallel = jobs.filter(|&n| n > 0);
        self
    }

    pub fn with_stop_on_failure(mut self, stop: bool) -> Self {
        self.stop_on_failure = stop;
        self
    }

    /// Runtime executable, falling back to `ruby` on PATH.
    pub fn runtime_program(&self) -> PathBuf {
        self.runtime_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("ruby"))
    }

    /// Directory containing a descriptor, resolved against the package root.
    pub fn target_directory(&self, descriptor: &Path) -> PathBuf {
        let full = self.package_root.join(descriptor);
        full.parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.package_root.clone())
    }
}

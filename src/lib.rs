//! extbuild - native extension build engine
//!
//! This crate dispatches extension descriptors (`extconf.rb`,
//! `CMakeLists.txt`, `Cargo.toml`, ...) to toolchain adapters, runs them
//! through a shared configure/compile/locate lifecycle and installs the
//! produced libraries into the package tree.

pub mod builder;
pub mod core;
pub mod ops;
pub mod util;

/// Test utilities and mocks for extbuild unit tests.
///
/// This module is only available when compiling with `--cfg test`. It
/// provides a scripted process runner and a counting adapter.
#[cfg(test)]
pub mod test_support;

pub use builder::{install, Adapter, AdapterRegistry, BatchOutcome, ToolRequirement};
pub use core::{BuildConfig, BuildError, BuildLog, BuildResult, CancellationToken, Phase};
pub use util::Config;

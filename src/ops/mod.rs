//! High-level operations.
//!
//! This module contains the implementation of extbuild commands.

pub mod build;
pub mod clean;
pub mod doctor;
pub mod runtime;

pub use build::{build_extensions, BuildOptions, ExtensionEntry, ExtensionsReport};
pub use clean::clean_extensions;
pub use doctor::{doctor, format_report, AdapterCheck, DoctorReport};
pub use runtime::{detect_runtime, with_detected_runtime, RuntimeInfo};

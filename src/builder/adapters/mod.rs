//! Built-in toolchain adapters.
//!
//! Each adapter claims descriptor files by name and drives one toolchain
//! family through the configure/compile/locate lifecycle.

mod cargo;
mod cmake;
mod configure;
mod extconf;
mod generic;
mod go;
mod java;
mod makefile;
mod rake;

pub use cargo::CargoAdapter;
pub use cmake::CMakeAdapter;
pub use configure::ConfigureAdapter;
pub use extconf::ExtConfAdapter;
pub use generic::{GenericAdapter, GenericSpec};
pub use go::GoAdapter;
pub use java::JavaAdapter;
pub use makefile::MakefileAdapter;
pub use rake::RakeAdapter;

use crate::builder::tools::ToolRequirement;

/// Make plus a C compiler, shared by every make-driven adapter.
fn make_toolchain() -> Vec<ToolRequirement> {
    vec![
        ToolRequirement::new("make", "Build automation tool").with_alternatives(["gmake", "nmake"]),
        ToolRequirement::new("gcc", "C/C++ compiler").with_alternatives(["clang", "cc", "cl"]),
    ]
}

/// Lowercased final path segment of a descriptor.
fn lower_name(file_name: &str) -> String {
    file_name.to_ascii_lowercase()
}

/// Lowercased extension of a descriptor file name, without the dot.
fn lower_extension(file_name: &str) -> Option<String> {
    std::path::Path::new(file_name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
}

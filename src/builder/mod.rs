//! Native extension build engine.
//!
//! Descriptor files are dispatched to toolchain adapters through an
//! [`AdapterRegistry`]; each adapter runs the configure/compile/locate
//! lifecycle and the install resolver places the results in the package.

pub mod adapters;
pub mod install;
pub mod lifecycle;
pub mod registry;
pub mod tools;

pub use adapters::{GenericAdapter, GenericSpec};
pub use install::{install, Destinations};
pub use lifecycle::{run_lifecycle, Adapter, Lifecycle};
pub use registry::{AdapterRegistry, BatchEntry, BatchOutcome};
pub use tools::{check_tools, tool_status, ToolRequirement, ToolStatus};

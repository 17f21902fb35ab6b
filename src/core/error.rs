//! Error taxonomy for adapter dispatch, builds and installation.

use std::fmt;

use thiserror::Error;

/// Lifecycle phase that runs an external toolchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Configure,
    Compile,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Configure => write!(f, "configure"),
            Phase::Compile => write!(f, "compile"),
        }
    }
}

/// Error produced while resolving, building or installing an extension.
///
/// Values are cloneable so the same error can live in a per-target
/// [`BuildResult`](crate::core::BuildResult) and be surfaced as the first
/// error of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("no adapter found for extension file: {file}")]
    AdapterNotFound { file: String },

    #[error("{adapter} build failed: {cause}{}", build_output(.output))]
    Phase {
        adapter: String,
        phase: Phase,
        cause: String,
        output: String,
    },

    #[error("{adapter} build failed: {cause}{}", build_output(.output))]
    Locate {
        adapter: String,
        cause: String,
        output: String,
    },

    #[error("failed to install {path}: {cause}")]
    Install { path: String, cause: String },

    #[error("build cancelled")]
    Cancelled,

    #[error("{tool} not found in PATH")]
    MissingTool { tool: String },

    #[error("missing required tools: {}", .tools.join(", "))]
    MissingTools { tools: Vec<String> },
}

impl BuildError {
    /// Name of the adapter that produced the error, if any.
    pub fn adapter(&self) -> Option<&str> {
        match self {
            BuildError::Phase { adapter, .. } | BuildError::Locate { adapter, .. } => {
                Some(adapter)
            }
            _ => None,
        }
    }

    /// Whether this error records an observed cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, BuildError::Cancelled)
    }
}

fn build_output(output: &str) -> String {
    if output.is_empty() {
        String::new()
    } else {
        format!("\n\nBuild output:\n{}", output)
    }
}

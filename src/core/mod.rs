//! Core data model: configuration, results, errors and cancellation.

pub mod cancel;
pub mod config;
pub mod error;
pub mod result;

pub use cancel::CancellationToken;
pub use config::BuildConfig;
pub use error::{BuildError, Phase};
pub use result::{BuildLog, BuildResult, PhaseFailure, PhaseResult};

//! Runtime identification.

use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::core::BuildConfig;
use crate::util::process::{CommandRunner, ProcessBuilder};

const PRINT_IDENTITY: &str = r#"print RUBY_ENGINE, " ", RUBY_VERSION"#;

/// Engine and version reported by a runtime executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeInfo {
    pub engine: String,
    pub version: String,
}

/// Ask the runtime at `program` for its engine and version.
pub fn detect_runtime(runner: &dyn CommandRunner, program: &Path) -> Result<RuntimeInfo> {
    let cmd = ProcessBuilder::new(program).args(["-e", PRINT_IDENTITY]);
    let output = runner
        .run(&cmd)
        .with_context(|| format!("failed to query runtime {}", program.display()))?;
    if !output.success {
        bail!(
            "`{}` failed with {}",
            cmd.display_command(),
            output.status_text()
        );
    }

    parse_identity(&output.output)
        .with_context(|| format!("unexpected output from {}: {:?}", program.display(), output.output))
}

fn parse_identity(output: &str) -> Option<RuntimeInfo> {
    let mut parts = output.split_whitespace();
    let engine = parts.next()?;
    let version = parts.next()?;
    if !version.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }

    Some(RuntimeInfo {
        engine: engine.to_string(),
        version: version.to_string(),
    })
}

/// Fill in the runtime engine and version when they are not configured.
///
/// Detection failures are logged; the configuration is returned unchanged.
pub fn with_detected_runtime(runner: &dyn CommandRunner, config: BuildConfig) -> BuildConfig {
    if config.runtime_engine.is_some() && config.runtime_version.is_some() {
        return config;
    }

    let program = config.runtime_program();
    match detect_runtime(runner, &program) {
        Ok(info) => {
            tracing::debug!("detected {} {}", info.engine, info.version);
            let mut config = config;
            if config.runtime_engine.is_none() {
                config.runtime_engine = Some(info.engine);
            }
            if config.runtime_version.is_none() {
                config.runtime_version = Some(info.version);
            }
            config
        }
        Err(e) => {
            tracing::warn!("could not detect runtime version: {:#}", e);
            config
        }
    }
}

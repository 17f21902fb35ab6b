//! Toolchain health checks.
//!
//! The `doctor` command asks every registered adapter which programs it
//! needs and reports whether each one can be found.
//!
//! ## Usage
//!
//! ```bash
//! extbuild doctor           # Summary per adapter
//! extbuild doctor --verbose # Every tool with its location
//! ```

use std::fmt::Write;
use std::path::PathBuf;

use serde::Serialize;

use crate::builder::tools::check_tools_with;
use crate::builder::{tool_status, AdapterRegistry, ToolStatus};
use crate::util::process::find_executable;

/// Tool checks for one adapter.
#[derive(Debug, Clone, Serialize)]
pub struct AdapterCheck {
    /// Adapter display name
    pub adapter: String,

    /// Status of every declared requirement
    pub tools: Vec<ToolStatus>,

    /// Missing-tool error, if any required tool is absent
    pub error: Option<String>,
}

impl AdapterCheck {
    pub fn passed(&self) -> bool {
        self.error.is_none()
    }
}

/// Summary of all health checks.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DoctorReport {
    pub checks: Vec<AdapterCheck>,
}

impl DoctorReport {
    /// Adapters whose required tools are all present.
    pub fn ready_count(&self) -> usize {
        self.checks.iter().filter(|c| c.passed()).count()
    }

    /// Adapters missing at least one required tool.
    pub fn unavailable_count(&self) -> usize {
        self.checks.len() - self.ready_count()
    }
}

/// Check every adapter's tools against PATH.
pub fn doctor(registry: &AdapterRegistry) -> DoctorReport {
    doctor_with(registry, find_executable)
}

/// Check every adapter's tools with a custom program lookup.
pub fn doctor_with<F>(registry: &AdapterRegistry, locate: F) -> DoctorReport
where
    F: Fn(&str) -> Option<PathBuf>,
{
    let checks = registry
        .adapters()
        .iter()
        .map(|adapter| {
            let requirements = adapter.required_tools();
            let error = check_tools_with(&requirements, |name| locate(name).is_some())
                .err()
                .map(|e| e.to_string());
            if let Some(error) = &error {
                tracing::debug!("{}: {}", adapter.name(), error);
            }

            AdapterCheck {
                adapter: adapter.name().to_string(),
                tools: tool_status(&requirements, &locate),
                error,
            }
        })
        .collect();

    DoctorReport { checks }
}

/// Format the doctor report for display.
pub fn format_report(report: &DoctorReport, verbose: bool) -> String {
    let mut output = String::new();

    writeln!(output, "extbuild doctor").unwrap();
    writeln!(output, "===============\n").unwrap();

    for check in &report.checks {
        let status = if check.passed() { "[OK]" } else { "[!!]" };
        writeln!(output, "  {} {}", status, check.adapter).unwrap();

        if let Some(error) = &check.error {
            writeln!(output, "      {}", error).unwrap();
        }

        if verbose {
            for tool in &check.tools {
                let optional = if tool.requirement.optional {
                    " (optional)"
                } else {
                    ""
                };
                match &tool.found {
                    Some((name, path)) => writeln!(
                        output,
                        "      {}{}: {} ({})",
                        tool.requirement.name,
                        optional,
                        name,
                        path.display()
                    )
                    .unwrap(),
                    None => writeln!(
                        output,
                        "      {}{}: not found",
                        tool.requirement.name, optional
                    )
                    .unwrap(),
                }
            }
        }
    }

    writeln!(output).unwrap();
    writeln!(
        output,
        "Summary: {} adapter(s) ready, {} unavailable",
        report.ready_count(),
        report.unavailable_count()
    )
    .unwrap();

    output
}

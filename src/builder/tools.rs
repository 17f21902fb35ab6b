//! Tool requirement checks.
//!
//! Verifies external programs are reachable before a build is attempted.
//! Checking never installs or changes anything.

use std::path::PathBuf;

use serde::Serialize;

use crate::core::BuildError;
use crate::util::process::find_executable;

/// An external program an adapter depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolRequirement {
    /// Primary program name
    pub name: String,

    /// Accepted substitutes, tried in order
    pub alternatives: Vec<String>,

    /// Absence is reported but never fails the check
    pub optional: bool,

    /// What the tool is used for (diagnostics only)
    pub purpose: String,
}

impl ToolRequirement {
    pub fn new(name: impl Into<String>, purpose: impl Into<String>) -> Self {
        ToolRequirement {
            name: name.into(),
            alternatives: Vec::new(),
            optional: false,
            purpose: purpose.into(),
        }
    }

    pub fn with_alternatives<I, S>(mut self, alternatives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.alternatives
            .extend(alternatives.into_iter().map(Into::into));
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Candidate names: primary first, then alternatives.
    pub fn candidates(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.alternatives.iter().map(String::as_str))
    }

    fn describe(&self) -> String {
        if self.purpose.is_empty() {
            self.name.clone()
        } else {
            format!("{} ({})", self.name, self.purpose)
        }
    }
}

/// Resolution state of one requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolStatus {
    pub requirement: ToolRequirement,

    /// Candidate that satisfied the requirement, with its location
    pub found: Option<(String, PathBuf)>,
}

impl ToolStatus {
    pub fn is_satisfied(&self) -> bool {
        self.found.is_some()
    }
}

/// Check requirements against PATH.
pub fn check_tools(requirements: &[ToolRequirement]) -> Result<(), BuildError> {
    check_tools_with(requirements, |name| find_executable(name).is_some())
}

/// Check requirements with a custom program lookup.
///
/// One missing required tool is reported on its own; several are
/// aggregated into a single error. Optional requirements never fail.
pub fn check_tools_with<F>(requirements: &[ToolRequirement], lookup: F) -> Result<(), BuildError>
where
    F: Fn(&str) -> bool,
{
    let mut missing: Vec<String> = Vec::new();

    for req in requirements {
        let found = req.candidates().any(&lookup);
        if !found {
            if req.optional {
                tracing::debug!("optional tool {} not found", req.name);
            } else {
                missing.push(req.describe());
            }
        }
    }

    match missing.len() {
        0 => Ok(()),
        1 => Err(BuildError::MissingTool {
            tool: missing.remove(0),
        }),
        _ => Err(BuildError::MissingTools { tools: missing }),
    }
}

/// Report the status of every requirement, for diagnostics.
pub fn tool_status<F>(requirements: &[ToolRequirement], locate: F) -> Vec<ToolStatus>
where
    F: Fn(&str) -> Option<PathBuf>,
{
    requirements
        .iter()
        .map(|req| ToolStatus {
            requirement: req.clone(),
            found: req
                .candidates()
                .find_map(|name| locate(name).map(|path| (name.to_string(), path))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn on_path(names: &'static [&'static str]) -> impl Fn(&str) -> bool {
        move |name| names.contains(&name)
    }

    #[test]
    fn test_all_satisfied() {
        let reqs = vec![
            ToolRequirement::new("make", "build"),
            ToolRequirement::new("gmake", "").with_alternatives(["make"]),
        ];
        assert!(check_tools_with(&reqs, on_path(&["make"])).is_ok());
    }

    #[test]
    fn test_single_missing_tool() {
        let reqs = vec![ToolRequirement::new("cmake", "CMake build system")];
        let err = check_tools_with(&reqs, on_path(&[])).unwrap_err();
        assert_eq!(
            err,
            BuildError::MissingTool {
                tool: "cmake (CMake build system)".to_string()
            }
        );
        assert_eq!(err.to_string(), "cmake (CMake build system) not found in PATH");
    }

    #[test]
    fn test_single_missing_tool_without_purpose() {
        let reqs = vec![ToolRequirement::new("zig", "")];
        let err = check_tools_with(&reqs, on_path(&[])).unwrap_err();
        assert_eq!(err.to_string(), "zig not found in PATH");
    }

    #[test]
    fn test_aggregated_missing_tools() {
        let reqs = vec![
            ToolRequirement::new("cmake", "CMake build system"),
            ToolRequirement::new("make", "build").with_alternatives(["gmake"]),
            ToolRequirement::new("ninja", ""),
        ];
        let err = check_tools_with(&reqs, on_path(&["gmake"])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "missing required tools: cmake (CMake build system), ninja"
        );
    }

    #[test]
    fn test_alternative_satisfies() {
        let reqs = vec![ToolRequirement::new("make", "build").with_alternatives(["nmake", "gmake"])];
        assert!(check_tools_with(&reqs, on_path(&["gmake"])).is_ok());
    }

    #[test]
    fn test_optional_never_fails() {
        let reqs = vec![ToolRequirement::new("ccache", "compiler cache").optional()];
        assert!(check_tools_with(&reqs, on_path(&[])).is_ok());
    }

    #[test]
    fn test_tool_status_reports_optional() {
        let reqs = vec![
            ToolRequirement::new("cargo", "Rust package manager"),
            ToolRequirement::new("ccache", "").optional(),
        ];
        let status = tool_status(&reqs, |name| {
            (name == "cargo").then(|| PathBuf::from("/usr/bin/cargo"))
        });

        assert!(status[0].is_satisfied());
        assert_eq!(
            status[0].found,
            Some(("cargo".to_string(), PathBuf::from("/usr/bin/cargo")))
        );
        assert!(!status[1].is_satisfied());
        assert!(status[1].requirement.optional);
    }
}

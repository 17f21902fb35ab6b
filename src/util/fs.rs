//! Filesystem utilities.

use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use glob::glob;

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Copy a file, creating parent directories of `dst` as needed.
///
/// Permission bits of `src` are carried over to `dst`.
pub fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent() {
        ensure_dir(parent)?;
    }

    fs::copy(src, dst).with_context(|| {
        format!("failed to copy {} to {}", src.display(), dst.display())
    })?;

    let permissions = fs::metadata(src)
        .with_context(|| format!("failed to stat {}", src.display()))?
        .permissions();
    fs::set_permissions(dst, permissions)
        .with_context(|| format!("failed to set permissions on {}", dst.display()))?;

    Ok(())
}

/// Check whether a path is an existing regular file.
pub fn is_regular_file(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}

/// Find files matching glob patterns under `base`, returned relative to `base`.
///
/// Patterns are matched in order; results keep pattern order and are
/// deduplicated. Directories are ignored.
pub fn glob_relative(base: &Path, patterns: &[&str]) -> Result<Vec<PathBuf>> {
    let mut results: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let full_pattern = base.join(pattern);
        let pattern_str = full_pattern.to_string_lossy();

        let mut matches: Vec<PathBuf> = Vec::new();
        for entry in glob(&pattern_str)
            .with_context(|| format!("invalid glob pattern {} in {}", pattern, base.display()))?
        {
            let path = entry
                .with_context(|| format!("failed to search {} for {}", base.display(), pattern))?;
            if path.is_file() {
                matches.push(relative_path(base, &path));
            }
        }

        matches.sort();
        for path in matches {
            if !results.contains(&path) {
                results.push(path);
            }
        }
    }

    Ok(results)
}

/// Get the relative path from `base` to `path`.
pub fn relative_path(base: &Path, path: &Path) -> PathBuf {
    pathdiff::diff_paths(path, base).unwrap_or_else(|| path.to_path_buf())
}

/// Lexically normalize a path: drop `.` segments and fold `name/..` pairs.
///
/// Leading `..` segments that cannot be folded are kept.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }

    out.iter().collect()
}

/// Render a path with forward slashes.
pub fn to_slash(path: &Path) -> String {
    let parts: Vec<String> = path
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();

    if path.has_root() && cfg!(unix) {
        format!("/{}", parts[1..].join("/"))
    } else {
        parts.join("/")
    }
}

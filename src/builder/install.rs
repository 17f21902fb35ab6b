//! Installation of compiled extensions into the package tree.
//!
//! Native libraries are copied to `lib/[<major>.<minor>/]<module-path>.<ext>`
//! under the package root (or the configured destination). Runtimes from
//! 3.4 onward look in a version-qualified directory first; the unversioned
//! copy keeps older lookup paths working.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::core::{BuildConfig, BuildError};
use crate::util::fs::{copy_file, is_regular_file, normalize_lexically, relative_path, to_slash};

/// Suffixes of loadable native libraries on supported platforms.
pub const NATIVE_SUFFIXES: &[&str] = &["so", "bundle", "dll", "dylib"];

/// Matches `create_makefile("name")` and `create_makefile 'name'`.
static CREATE_MAKEFILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"create_makefile\s*\(?\s*['"]([^'"]+)['"]"#).expect("valid regex")
});

/// Resolved install directories: one primary, plus compatibility copies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destinations {
    pub primary: PathBuf,
    pub additional: Vec<PathBuf>,
}

/// Install the artifacts of one build.
///
/// `build_dir` is the directory the artifacts are relative to. Returns the
/// installed files relative to the package root, using forward slashes.
/// Copies are not rolled back if a later copy fails.
pub fn install(
    config: &BuildConfig,
    descriptor: &Path,
    build_dir: &Path,
    artifacts: &[PathBuf],
) -> Result<Vec<String>, BuildError> {
    if artifacts.is_empty() {
        return Ok(Vec::new());
    }

    if !artifacts.iter().any(|a| is_native_library(a)) {
        return Ok(pass_through(descriptor, artifacts));
    }

    let destinations = match destinations(config) {
        Some(destinations) => destinations,
        None => return Ok(pass_through(descriptor, artifacts)),
    };

    let module = declared_module(config, descriptor);
    let mut installed = Vec::new();

    for artifact in artifacts.iter().filter(|a| is_native_library(a)) {
        let source = build_dir.join(artifact);
        if !is_regular_file(&source) {
            tracing::debug!("skipping {}: not a regular file", source.display());
            continue;
        }

        let relative = install_relative_path(descriptor, artifact, module.as_deref());

        let primary = destinations.primary.join(&relative);
        copy_artifact(&source, &primary)?;
        for dir in &destinations.additional {
            copy_artifact(&source, &dir.join(&relative))?;
        }

        installed.push(to_slash(&relative_path(&config.package_root, &primary)));
    }

    Ok(installed)
}

fn copy_artifact(source: &Path, dest: &Path) -> Result<(), BuildError> {
    tracing::debug!("installing {} -> {}", source.display(), dest.display());
    copy_file(source, dest).map_err(|e| BuildError::Install {
        path: dest.display().to_string(),
        cause: format!("{:#}", e),
    })
}

/// Whether a path names a native library, by suffix.
pub fn is_native_library(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|ext| NATIVE_SUFFIXES.contains(&ext.as_str()))
}

/// Artifacts relative to the package root, without copying.
fn pass_through(descriptor: &Path, artifacts: &[PathBuf]) -> Vec<String> {
    let base = descriptor.parent().unwrap_or_else(|| Path::new(""));
    artifacts
        .iter()
        .map(|artifact| to_slash(&normalize_lexically(&base.join(artifact))))
        .collect()
}

/// Compute the destination set, or `None` when no base directory exists.
pub fn destinations(config: &BuildConfig) -> Option<Destinations> {
    let bases = base_directories(config);
    let (first, rest) = bases.split_first()?;

    let version_dir = config.runtime_version.as_deref().and_then(version_directory);

    let (primary, mut additional) = match &version_dir {
        Some(version) => {
            let mut additional: Vec<PathBuf> = rest.iter().map(|b| b.join(version)).collect();
            additional.extend(bases.iter().cloned());
            (first.join(version), additional)
        }
        None => (first.clone(), rest.to_vec()),
    };

    dedup(&mut additional);
    additional.retain(|dir| *dir != primary);

    Some(Destinations {
        primary,
        additional,
    })
}

/// Candidate base directories, absolute and deduplicated.
fn base_directories(config: &BuildConfig) -> Vec<PathBuf> {
    let root = &config.package_root;
    let absolute = |dir: &Path| {
        if dir.is_absolute() {
            normalize_lexically(dir)
        } else {
            normalize_lexically(&root.join(dir))
        }
    };

    let mut dirs: Vec<PathBuf> = [config.dest_path.as_deref(), config.lib_dir.as_deref()]
        .into_iter()
        .flatten()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(absolute)
        .collect();

    if dirs.is_empty() && !root.as_os_str().is_empty() {
        dirs.push(absolute(Path::new("lib")));
    }

    dedup(&mut dirs);
    dirs
}

fn dedup(dirs: &mut Vec<PathBuf>) {
    let mut seen = Vec::with_capacity(dirs.len());
    dirs.retain(|dir| {
        if seen.contains(dir) {
            false
        } else {
            seen.push(dir.clone());
            true
        }
    });
}

/// Version-qualified directory name for runtimes at or above 3.4.
pub fn version_directory(version: &str) -> Option<String> {
    let mut parts = version.trim().split('.');
    let major: u32 = parts.next()?.parse().ok()?;
    let minor: u32 = parts.next()?.parse().ok()?;

    if major > 3 || (major == 3 && minor >= 4) {
        Some(format!("{}.{}", major, minor))
    } else {
        None
    }
}

/// Module name declared by an `extconf.rb` descriptor, if any.
fn declared_module(config: &BuildConfig, descriptor: &Path) -> Option<String> {
    let is_extconf = descriptor
        .file_name()
        .is_some_and(|name| name.to_string_lossy().ends_with("extconf.rb"));
    if !is_extconf {
        return None;
    }

    let source = fs::read_to_string(config.package_root.join(descriptor)).ok()?;
    scan_module_name(&source)
}

/// Find the first `create_makefile` declaration in descriptor source.
pub fn scan_module_name(source: &str) -> Option<String> {
    CREATE_MAKEFILE
        .captures(source)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Relative install path for one artifact.
///
/// A declared module name wins. Otherwise the path follows the
/// descriptor's directory below `ext/`, ending in the artifact's name.
pub fn install_relative_path(descriptor: &Path, artifact: &Path, module: Option<&str>) -> PathBuf {
    let file_name = artifact
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| artifact.to_path_buf());
    let suffix = artifact
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    let stem = artifact
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut path = match module {
        Some(module) => module.trim_matches('/').to_string(),
        None => {
            let dir = derived_directory(descriptor);
            if dir.is_empty() {
                stem
            } else if dir.rsplit('/').next() == Some(stem.as_str()) {
                dir
            } else {
                format!("{}/{}", dir, stem)
            }
        }
    };

    if !suffix.is_empty() && !path.ends_with(&suffix) {
        path.push_str(&suffix);
    }

    sanitize(Path::new(&path), &file_name)
}

/// Descriptor directory with a leading `ext` segment removed.
fn derived_directory(descriptor: &Path) -> String {
    let parent = descriptor.parent().unwrap_or_else(|| Path::new(""));
    let mut segments: Vec<String> = parent
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if segments.first().map(String::as_str) == Some("ext") {
        segments.remove(0);
    }

    segments.join("/")
}

/// Keep a relative path inside its base; anything escaping collapses to
/// `fallback`.
fn sanitize(path: &Path, fallback: &Path) -> PathBuf {
    let normalized = normalize_lexically(path);
    let escapes = normalized.as_os_str().is_empty()
        || normalized.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });

    if escapes {
        fallback.to_path_buf()
    } else {
        normalized
    }
}

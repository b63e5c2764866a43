//! Configuration warnings and target root validation.
use std::path::{Component, Path, PathBuf};

use super::{CONFIG_FILE_NAME, ConfigFile};
use crate::error::ValidationError;

/// A validation warning detected during configuration loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// The configuration source (e.g., "tilde.toml").
    pub source: String,
    /// The specific item or key that triggered the warning.
    pub item: String,
    /// Human-readable warning message.
    pub message: String,
}

impl ValidationWarning {
    /// Create a new warning.
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        item: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            item: item.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}: {}", self.source, self.item, self.message)
    }
}

/// Return `true` if `dir` is a usable backup directory: relative, naming at
/// least one directory below the target root, and never climbing out of it.
#[must_use]
pub fn is_valid_backup_dir(dir: &str) -> bool {
    let path = Path::new(dir);
    !dir.trim().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        && path
            .components()
            .any(|c| matches!(c, Component::Normal(_)))
}

/// Check a parsed `tilde.toml` for values that will be ignored or replaced.
#[must_use]
pub fn validate_config_file(file: &ConfigFile) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if let Some(dir) = &file.backup_dir
        && !is_valid_backup_dir(dir)
    {
        warnings.push(ValidationWarning::new(
            CONFIG_FILE_NAME,
            "backup_dir",
            format!("'{dir}' must be a relative path inside the target; using the default"),
        ));
    }

    for (i, pattern) in file.ignore.iter().enumerate() {
        if pattern.is_empty() {
            warnings.push(ValidationWarning::new(
                CONFIG_FILE_NAME,
                format!("ignore[{i}]"),
                "empty pattern would match every file; dropped",
            ));
        }
    }

    if file.replace_default_ignore && file.ignore.iter().all(String::is_empty) {
        warnings.push(ValidationWarning::new(
            CONFIG_FILE_NAME,
            "replace_default_ignore",
            "default ignore list replaced by an empty list; repository metadata will be linked",
        ));
    }

    if file.plugins.enabled && file.plugins.url.trim().is_empty() {
        warnings.push(ValidationWarning::new(
            CONFIG_FILE_NAME,
            "plugins.url",
            "empty URL; vim-plug download will be skipped",
        ));
    }

    warnings
}

/// Validate the target root before any mutation.
///
/// Rejects an empty path, the filesystem root and existing non-directories.
/// In a real run a missing target is created and writability is probed
/// with a temporary file. In dry-run nothing is created: a missing target
/// is accepted as-is and writability is judged from permissions only.
///
/// Returns the absolute (canonical when it exists) target path.
///
/// # Errors
///
/// Returns [`ValidationError`] describing the first check that failed.
pub fn validate_target_root(target: &Path, dry_run: bool) -> Result<PathBuf, ValidationError> {
    if target.as_os_str().is_empty() {
        return Err(ValidationError::Empty);
    }
    let absolute = std::path::absolute(target).map_err(|_| ValidationError::Empty)?;
    if is_filesystem_root(&absolute) {
        return Err(ValidationError::FilesystemRoot(absolute));
    }

    match std::fs::metadata(&absolute) {
        Ok(meta) if !meta.is_dir() => return Err(ValidationError::NotADirectory(absolute)),
        Ok(meta) => {
            if dry_run && meta.permissions().readonly() {
                return Err(ValidationError::NotWritable {
                    path: absolute,
                    reason: "directory is read-only".to_string(),
                });
            }
        }
        Err(_) if dry_run => return Ok(absolute),
        Err(_) => {
            std::fs::create_dir_all(&absolute).map_err(|source| {
                ValidationError::CannotCreate {
                    path: absolute.clone(),
                    source,
                }
            })?;
        }
    }

    let canonical = dunce::canonicalize(&absolute).unwrap_or(absolute);
    if is_filesystem_root(&canonical) {
        return Err(ValidationError::FilesystemRoot(canonical));
    }
    if !dry_run {
        probe_writable(&canonical)?;
    }
    Ok(canonical)
}

/// Return `true` for `/`, `C:\` and similar.
fn is_filesystem_root(path: &Path) -> bool {
    path.has_root() && path.parent().is_none()
}

/// Create and remove a probe file in `dir`.
fn probe_writable(dir: &Path) -> Result<(), ValidationError> {
    let probe = dir.join(format!(".tilde-write-test-{}", std::process::id()));
    std::fs::write(&probe, b"").map_err(|e| ValidationError::NotWritable {
        path: dir.to_path_buf(),
        reason: e.to_string(),
    })?;
    std::fs::remove_file(&probe).map_err(|e| ValidationError::NotWritable {
        path: dir.to_path_buf(),
        reason: format!("cannot remove probe file: {e}"),
    })
}

//! Domain-specific error types for the tilde engine.
//!
//! Internal modules return typed errors (e.g. [`ScanError`], [`ApplyError`])
//! while command handlers at the CLI boundary convert them to
//! [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! TildeError
//! ├── Scan(ScanError)             source tree cannot be enumerated (fatal)
//! ├── Validation(ValidationError) target root unusable (fatal)
//! ├── Config(ConfigError)         tilde.toml unreadable or malformed (fatal)
//! └── UserAbort                   batch confirmation declined (fatal)
//!
//! ClassifyError  target unreadable, degraded to a conflict (non-fatal)
//! ApplyError     one file could not be linked/backed up (non-fatal)
//! ContainerError container arguments unusable (fatal for `container`)
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Top-level fatal error for a tilde run.
#[derive(Error, Debug)]
pub enum TildeError {
    /// The source inventory could not be built.
    #[error("scan failed: {0}")]
    Scan(#[from] ScanError),

    /// The target root is unusable.
    #[error("target validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The configuration file could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The user declined the conflict confirmation prompt.
    #[error("installation aborted by user ({conflicts} conflicting file(s) left untouched)")]
    UserAbort {
        /// Number of conflicts that were presented.
        conflicts: usize,
    },
}

/// Errors raised while enumerating the source tree.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The source root does not exist or cannot be stat'ed.
    #[error("cannot read source root {path}: {source}")]
    Root {
        /// Source root that was requested.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The source root exists but is not a directory.
    #[error("source root is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// A directory or entry below the root could not be read.
    #[error("cannot walk {path}: {source}")]
    Walk {
        /// Path that failed, or the root when unknown.
        path: PathBuf,
        /// Underlying walk error.
        source: walkdir::Error,
    },
}

/// Errors raised while validating the target root.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// No target directory could be determined.
    #[error("target directory is empty")]
    Empty,

    /// The target is the filesystem root.
    #[error("refusing to install into the filesystem root: {0}")]
    FilesystemRoot(PathBuf),

    /// The target exists but is not a directory.
    #[error("{0} exists but is not a directory")]
    NotADirectory(PathBuf),

    /// The target does not exist and could not be created.
    #[error("cannot create target directory {path}: {source}")]
    CannotCreate {
        /// Target directory.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The target is not writable.
    #[error("{path} is not writable: {reason}")]
    NotWritable {
        /// Target directory.
        path: PathBuf,
        /// Why the probe failed.
        reason: String,
    },
}

/// Raised when a target entity cannot be inspected.
///
/// Callers degrade this to a conflict rather than treating the target as
/// absent.
#[derive(Error, Debug)]
pub enum ClassifyError {
    /// Metadata or content of the target could not be read.
    #[error("cannot inspect {path}: {source}")]
    Unreadable {
        /// Target path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors for a single file's apply or restore step.
#[derive(Error, Debug)]
pub enum ApplyError {
    /// Parent directories of a link could not be created.
    #[error("cannot create directory {path}: {source}")]
    CreateParent {
        /// Directory that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The symlink could not be created or moved into place.
    #[error("cannot link {link}: {source}")]
    Link {
        /// Link path.
        link: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// An existing entry could not be removed.
    #[error("cannot remove {path}: {source}")]
    Remove {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The original could not be moved into the backup store.
    #[error("cannot back up {from} to {to}: {source}")]
    Backup {
        /// Original path.
        from: PathBuf,
        /// Backup path.
        to: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A backup for this path already exists and would be overwritten.
    #[error("backup already exists at {0}; restore or remove it first")]
    BackupExists(PathBuf),

    /// A backup could not be moved back to its original location.
    #[error("cannot restore {from} to {to}: {source}")]
    Restore {
        /// Backup path.
        from: PathBuf,
        /// Original path.
        to: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Linking failed after a backup and the original could not be moved back.
    #[error("cannot link {link}: {source}; the original remains at {backup} ({restore})")]
    Stranded {
        /// Link path.
        link: PathBuf,
        /// Where the original now lives.
        backup: PathBuf,
        /// Why linking failed.
        source: Box<ApplyError>,
        /// Why the original could not be restored.
        restore: Box<ApplyError>,
    },

    /// Replacing the target would delete a directory.
    #[error("refusing to replace directory {0}; choose backup instead")]
    RefuseDirectory(PathBuf),

    /// The link target could not be expressed relative to its directory.
    #[error("cannot compute relative path from {from} to {to}")]
    RelativePath {
        /// Directory containing the link.
        from: PathBuf,
        /// Source file.
        to: PathBuf,
    },
}

/// Errors raised while loading `tilde.toml`.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("cannot read {path}: {source}")]
    Read {
        /// Config file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not valid TOML for the expected schema.
    #[error("cannot parse {path}: {source}")]
    Parse {
        /// Config file path.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },
}

/// Errors raised while preparing a container invocation.
#[derive(Error, Debug)]
pub enum ContainerError {
    /// A path to mount is missing or not a directory.
    #[error("'{0}' is not a directory")]
    NotADirectory(PathBuf),

    /// An `--env-file` path does not name a file.
    #[error("env file not found: {0}")]
    EnvFileNotFound(PathBuf),

    /// The build context has no `Dockerfile`.
    #[error("no Dockerfile in {0}")]
    MissingDockerfile(PathBuf),
}

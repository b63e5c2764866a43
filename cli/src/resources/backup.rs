//! The backup store: displaced originals mirrored below one directory.
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::ApplyError;
use crate::operations::FileSystemOps;

/// Mirrored backup directory, e.g. `<target>/.tilde-backup/<relative path>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupStore {
    root: PathBuf,
}

impl BackupStore {
    /// Create a store rooted at `root`. Nothing is created on disk.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Backup location for the file at `relative`.
    #[must_use]
    pub fn path_for(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }

    /// Whether a backup for `relative` exists (a dangling symlink counts).
    #[must_use]
    pub fn contains(&self, relative: &Path) -> bool {
        std::fs::symlink_metadata(self.path_for(relative)).is_ok()
    }

    /// Move `original` into the store. Never overwrites an existing backup.
    ///
    /// # Errors
    ///
    /// Returns [`ApplyError::BackupExists`] if a backup is already present, or
    /// an I/O variant if the move fails.
    pub fn store(
        &self,
        ops: &dyn FileSystemOps,
        relative: &Path,
        original: &Path,
    ) -> Result<PathBuf, ApplyError> {
        let dest = self.path_for(relative);
        if self.contains(relative) {
            return Err(ApplyError::BackupExists(dest));
        }
        if let Some(parent) = dest.parent() {
            ops.create_dir_all(parent)
                .map_err(|source| ApplyError::CreateParent {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        ops.rename(original, &dest)
            .map_err(|source| ApplyError::Backup {
                from: original.to_path_buf(),
                to: dest.clone(),
                source,
            })?;
        Ok(dest)
    }

    /// Move the backup of `relative` back to `original`.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent of `original` cannot be created or the
    /// move fails.
    pub fn restore(
        &self,
        ops: &dyn FileSystemOps,
        relative: &Path,
        original: &Path,
    ) -> Result<PathBuf, ApplyError> {
        let from = self.path_for(relative);
        if let Some(parent) = original.parent() {
            ops.create_dir_all(parent)
                .map_err(|source| ApplyError::CreateParent {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        ops.rename(&from, original)
            .map_err(|source| ApplyError::Restore {
                from: from.clone(),
                to: original.to_path_buf(),
                source,
            })?;
        Ok(from)
    }

    /// Remove empty directories in the store, deepest first, then the root
    /// itself if it ended up empty. Returns the directories removed.
    ///
    /// `restored` lists the relative paths moved out of the store during this
    /// pass; they count as gone even when `ops` did not move them, so a
    /// dry-run reports the same directories a real run removes. Directories
    /// that still hold other files are left alone; a missing store is not an
    /// error.
    #[must_use]
    pub fn prune(&self, ops: &dyn FileSystemOps, restored: &[PathBuf]) -> Vec<PathBuf> {
        let mut gone: HashSet<PathBuf> =
            restored.iter().map(|rel| self.path_for(rel)).collect();
        let mut removed = Vec::new();
        for entry in WalkDir::new(&self.root)
            .follow_links(false)
            .contents_first(true)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_dir())
        {
            let is_empty = std::fs::read_dir(entry.path())
                .map(|mut rd| {
                    rd.all(|child| child.is_ok_and(|c| gone.contains(&c.path())))
                })
                .unwrap_or(false);
            if is_empty && ops.remove_dir(entry.path()).is_ok() {
                gone.insert(entry.path().to_path_buf());
                removed.push(entry.path().to_path_buf());
            }
        }
        removed
    }
}

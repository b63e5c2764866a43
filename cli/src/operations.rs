//! Filesystem mutation abstractions for dependency injection.
//!
//! Every change tilde makes to the target tree goes through the
//! [`FileSystemOps`] trait. Production code uses [`SystemFileSystemOps`];
//! dry-run swaps in [`DryRunFileSystemOps`], whose methods succeed without
//! touching the disk, so the classification and reporting code paths are
//! identical in both modes. Read-only queries (stat, hashing) use
//! [`std::fs`] directly.

use std::io;
use std::path::Path;

/// Abstraction over the mutating filesystem primitives used by tasks.
pub trait FileSystemOps: Send + Sync + std::fmt::Debug {
    /// Create `path` and all missing parents.
    ///
    /// # Errors
    ///
    /// Returns an error if a component cannot be created.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Create a symbolic link at `link` whose contents are `contents`.
    ///
    /// # Errors
    ///
    /// Returns an error if `link` already exists or cannot be created.
    fn symlink(&self, contents: &Path, link: &Path) -> io::Result<()>;

    /// Move `from` to `to`, replacing a non-directory at `to`.
    ///
    /// # Errors
    ///
    /// Returns an error if the move fails.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Remove a file or symlink.
    ///
    /// # Errors
    ///
    /// Returns an error if removal fails.
    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Remove an empty directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory is not empty or removal fails.
    fn remove_dir(&self, path: &Path) -> io::Result<()>;
}

/// Production [`FileSystemOps`] implementation that delegates to [`std::fs`].
#[derive(Debug, Default)]
pub struct SystemFileSystemOps;

impl FileSystemOps for SystemFileSystemOps {
    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn symlink(&self, contents: &Path, link: &Path) -> io::Result<()> {
        #[cfg(unix)]
        {
            std::os::unix::fs::symlink(contents, link)
        }
        #[cfg(windows)]
        {
            // A symlinked directory in the source is emitted as a leaf; match its kind.
            let resolved = link
                .parent()
                .map_or_else(|| contents.to_path_buf(), |p| p.join(contents));
            if std::fs::metadata(resolved).is_ok_and(|m| m.is_dir()) {
                std::os::windows::fs::symlink_dir(contents, link)
            } else {
                std::os::windows::fs::symlink_file(contents, link)
            }
        }
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        match std::fs::rename(from, to) {
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => copy_then_remove(from, to),
            other => other,
        }
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_dir(path)
    }
}

/// Fallback for [`SystemFileSystemOps::rename`] across filesystems.
///
/// Symlinks are recreated rather than followed; directories are copied
/// recursively.
fn copy_then_remove(from: &Path, to: &Path) -> io::Result<()> {
    let meta = std::fs::symlink_metadata(from)?;
    if meta.file_type().is_symlink() {
        let contents = std::fs::read_link(from)?;
        SystemFileSystemOps.symlink(&contents, to)?;
        return std::fs::remove_file(from);
    }
    if meta.is_dir() {
        for entry in walkdir::WalkDir::new(from).follow_links(false) {
            let entry = entry.map_err(io::Error::other)?;
            let rel = entry
                .path()
                .strip_prefix(from)
                .map_err(io::Error::other)?;
            let dest = to.join(rel);
            let ft = entry.file_type();
            if ft.is_dir() {
                std::fs::create_dir_all(&dest)?;
            } else if ft.is_symlink() {
                SystemFileSystemOps.symlink(&std::fs::read_link(entry.path())?, &dest)?;
            } else {
                std::fs::copy(entry.path(), &dest)?;
            }
        }
        return std::fs::remove_dir_all(from);
    }
    std::fs::copy(from, to)?;
    std::fs::remove_file(from)
}

/// [`FileSystemOps`] for dry-run: every primitive succeeds and changes nothing.
#[derive(Debug, Default)]
pub struct DryRunFileSystemOps;

impl FileSystemOps for DryRunFileSystemOps {
    fn create_dir_all(&self, _path: &Path) -> io::Result<()> {
        Ok(())
    }

    fn symlink(&self, _contents: &Path, _link: &Path) -> io::Result<()> {
        Ok(())
    }

    fn rename(&self, _from: &Path, _to: &Path) -> io::Result<()> {
        Ok(())
    }

    fn remove_file(&self, _path: &Path) -> io::Result<()> {
        Ok(())
    }

    fn remove_dir(&self, _path: &Path) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn system_create_dir_all_creates_nested() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b/c");
        SystemFileSystemOps.create_dir_all(&nested).unwrap();
        assert!(nested.is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn system_symlink_writes_given_contents() {
        let dir = tempfile::tempdir().unwrap();
        let link = dir.path().join("link");
        SystemFileSystemOps
            .symlink(Path::new("../somewhere/file"), &link)
            .unwrap();
        assert_eq!(
            fs::read_link(&link).unwrap(),
            Path::new("../somewhere/file")
        );
    }

    #[cfg(unix)]
    #[test]
    fn system_rename_replaces_existing_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("target");
        let tmp = dir.path().join(".target.tmp");
        SystemFileSystemOps.symlink(Path::new("old"), &old).unwrap();
        SystemFileSystemOps.symlink(Path::new("new"), &tmp).unwrap();
        SystemFileSystemOps.rename(&tmp, &old).unwrap();
        assert_eq!(fs::read_link(&old).unwrap(), Path::new("new"));
        assert!(fs::symlink_metadata(&tmp).is_err());
    }

    #[cfg(windows)]
    #[test]
    fn system_symlink_to_directory_is_traversable() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("real")).unwrap();
        fs::write(dir.path().join("real/file"), "data").unwrap();
        let link = dir.path().join("alias");
        SystemFileSystemOps.symlink(Path::new("real"), &link).unwrap();
        assert!(fs::symlink_metadata(&link).unwrap().is_symlink());
        assert_eq!(fs::read_to_string(link.join("file")).unwrap(), "data");
    }

    #[test]
    fn copy_then_remove_moves_directory_tree() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("from");
        fs::create_dir_all(from.join("sub")).unwrap();
        fs::write(from.join("sub/file"), "data").unwrap();
        let to = dir.path().join("to");
        copy_then_remove(&from, &to).unwrap();
        assert!(!from.exists());
        assert_eq!(fs::read_to_string(to.join("sub/file")).unwrap(), "data");
    }

    #[test]
    fn copy_then_remove_moves_file() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("a");
        let to = dir.path().join("b");
        fs::write(&from, "content").unwrap();
        copy_then_remove(&from, &to).unwrap();
        assert!(!from.exists());
        assert_eq!(fs::read_to_string(&to).unwrap(), "content");
    }

    #[test]
    fn dry_run_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("keep");
        fs::write(&file, "x").unwrap();
        let ops = DryRunFileSystemOps;
        ops.create_dir_all(&dir.path().join("new")).unwrap();
        ops.symlink(Path::new("keep"), &dir.path().join("link")).unwrap();
        ops.rename(&file, &dir.path().join("moved")).unwrap();
        ops.remove_file(&file).unwrap();
        assert!(file.exists());
        assert!(!dir.path().join("new").exists());
        assert!(fs::symlink_metadata(dir.path().join("link")).is_err());
        assert!(!dir.path().join("moved").exists());
    }
}

//! Classify a link target and apply the minimal safe action.
use std::io;
use std::path::{Path, PathBuf};

use super::backup::BackupStore;
use super::fs::{compute_sha256, relative_path};
use super::{ConflictAction, Outcome, TargetState};
use crate::error::{ApplyError, ClassifyError};
use crate::inventory::SourceFile;
use crate::operations::FileSystemOps;

/// One source file paired with its link location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSpec {
    /// Path relative to both roots.
    pub relative: PathBuf,
    /// Absolute source file.
    pub source: PathBuf,
    /// Absolute link location.
    pub target: PathBuf,
}

impl LinkSpec {
    /// Pair `file` with its location under `target_root`.
    #[must_use]
    pub fn new(file: &SourceFile, source_root: &Path, target_root: &Path) -> Self {
        Self {
            relative: file.relative().to_path_buf(),
            source: file.source_path(source_root),
            target: file.target_path(target_root),
        }
    }

    /// Inspect the target without following it.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError`] if the target exists but cannot be inspected
    /// or a regular file cannot be hashed. Callers treat this as a conflict.
    pub fn try_classify(&self) -> Result<TargetState, ClassifyError> {
        let meta = match std::fs::symlink_metadata(&self.target) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(TargetState::Absent),
            Err(source) => return Err(self.unreadable(&self.target, source)),
        };

        let file_type = meta.file_type();
        if file_type.is_symlink() {
            let resolved = dunce::canonicalize(&self.target);
            let wanted = dunce::canonicalize(&self.source);
            return Ok(match (resolved, wanted) {
                (Ok(a), Ok(b)) if a == b => TargetState::CorrectSymlink,
                _ => TargetState::StaleSymlink,
            });
        }

        if file_type.is_file() {
            let target_hash =
                compute_sha256(&self.target).map_err(|e| self.unreadable(&self.target, e))?;
            let source_hash =
                compute_sha256(&self.source).map_err(|e| self.unreadable(&self.source, e))?;
            return Ok(if target_hash == source_hash {
                TargetState::IdenticalFile
            } else {
                TargetState::ConflictingFile
            });
        }

        Ok(TargetState::ConflictingFile)
    }

    fn unreadable(&self, path: &Path, source: io::Error) -> ClassifyError {
        ClassifyError::Unreadable {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Relative link contents: the canonical source as seen from the
    /// canonical directory that will contain the link.
    ///
    /// # Errors
    ///
    /// Returns [`ApplyError::RelativePath`] if either side cannot be resolved.
    pub fn link_contents(&self) -> Result<PathBuf, ApplyError> {
        let err = || ApplyError::RelativePath {
            from: self.target.parent().map(Path::to_path_buf).unwrap_or_default(),
            to: self.source.clone(),
        };
        let parent = self.target.parent().ok_or_else(err)?;
        let from = canonicalize_lenient(parent).ok_or_else(err)?;
        let to = dunce::canonicalize(&self.source).map_err(|_| err())?;
        relative_path(&from, &to).ok_or_else(err)
    }
}

/// Canonicalize `path`, tolerating missing trailing components.
///
/// The deepest existing ancestor is resolved and the rest appended, so a
/// link directory that dry-run never created still gets a stable answer.
fn canonicalize_lenient(path: &Path) -> Option<PathBuf> {
    let mut existing = path;
    let mut rest = Vec::new();
    loop {
        if let Ok(canonical) = dunce::canonicalize(existing) {
            let mut out = canonical;
            for part in rest.iter().rev() {
                out.push(part);
            }
            return Some(out);
        }
        rest.push(existing.file_name()?.to_os_string());
        existing = existing.parent()?;
    }
}

/// Performs the per-state action through [`FileSystemOps`].
#[derive(Debug)]
pub struct Applier<'a> {
    ops: &'a dyn FileSystemOps,
    backups: &'a BackupStore,
}

impl<'a> Applier<'a> {
    /// Create an applier writing through `ops` and backing up into `backups`.
    #[must_use]
    pub const fn new(ops: &'a dyn FileSystemOps, backups: &'a BackupStore) -> Self {
        Self { ops, backups }
    }

    /// Apply `state` for `link`. `action` only matters for conflicts.
    ///
    /// # Errors
    ///
    /// Returns [`ApplyError`] if a primitive fails. A failed link after a
    /// backup moves the original back before returning; if that also fails
    /// the error is [`ApplyError::Stranded`] and names the backup location.
    pub fn apply(
        &self,
        link: &LinkSpec,
        state: TargetState,
        action: ConflictAction,
    ) -> Result<Outcome, ApplyError> {
        match state {
            TargetState::Absent => self.place_link(link).map(|()| Outcome::Linked),
            TargetState::CorrectSymlink => Ok(Outcome::AlreadyLinked),
            TargetState::StaleSymlink => self.place_link(link).map(|()| Outcome::Relinked),
            TargetState::IdenticalFile => Ok(Outcome::SkippedIdentical),
            TargetState::ConflictingFile => match action {
                ConflictAction::Skip => Ok(Outcome::SkippedByPolicy),
                ConflictAction::Replace => self.replace(link),
                ConflictAction::Backup => self.backup_and_link(link),
            },
        }
    }

    fn replace(&self, link: &LinkSpec) -> Result<Outcome, ApplyError> {
        let is_dir = std::fs::symlink_metadata(&link.target).is_ok_and(|m| m.is_dir());
        if is_dir {
            return Err(ApplyError::RefuseDirectory(link.target.clone()));
        }
        self.place_link(link)?;
        Ok(Outcome::Replaced)
    }

    fn backup_and_link(&self, link: &LinkSpec) -> Result<Outcome, ApplyError> {
        let backup = self.backups.store(self.ops, &link.relative, &link.target)?;
        if let Err(e) = self.place_link(link) {
            return Err(
                match self.backups.restore(self.ops, &link.relative, &link.target) {
                    Ok(_) => e,
                    Err(restore) => ApplyError::Stranded {
                        link: link.target.clone(),
                        backup,
                        source: Box::new(e),
                        restore: Box::new(restore),
                    },
                },
            );
        }
        Ok(Outcome::BackedUpAndLinked { backup })
    }

    /// Create the link under a temporary sibling name and rename it over the
    /// target, so the target is never observed missing.
    fn place_link(&self, link: &LinkSpec) -> Result<(), ApplyError> {
        let parent = link
            .target
            .parent()
            .ok_or_else(|| ApplyError::RelativePath {
                from: link.target.clone(),
                to: link.source.clone(),
            })?;
        self.ops
            .create_dir_all(parent)
            .map_err(|source| ApplyError::CreateParent {
                path: parent.to_path_buf(),
                source,
            })?;

        let contents = link.link_contents()?;
        let tmp = temp_sibling(&link.target);
        if std::fs::symlink_metadata(&tmp).is_ok() {
            self.ops
                .remove_file(&tmp)
                .map_err(|source| ApplyError::Remove {
                    path: tmp.clone(),
                    source,
                })?;
        }
        self.ops
            .symlink(&contents, &tmp)
            .map_err(|source| ApplyError::Link {
                link: tmp.clone(),
                source,
            })?;
        if let Err(source) = self.ops.rename(&tmp, &link.target) {
            self.ops.remove_file(&tmp).ok();
            return Err(ApplyError::Link {
                link: link.target.clone(),
                source,
            });
        }
        Ok(())
    }
}

/// `dir/.name.tilde-tmp` next to `target`.
fn temp_sibling(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
    target.with_file_name(format!(".{name}.tilde-tmp"))
}

#[cfg(all(test, unix))]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::operations::{DryRunFileSystemOps, SystemFileSystemOps};
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::os::unix::fs::symlink;

    struct Sandbox {
        _dir: tempfile::TempDir,
        source: PathBuf,
        target: PathBuf,
        backups: BackupStore,
    }

    impl Sandbox {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let root = dunce::canonicalize(dir.path()).unwrap();
            let source = root.join("repo");
            let target = root.join("home");
            fs::create_dir_all(&source).unwrap();
            fs::create_dir_all(&target).unwrap();
            let backups = BackupStore::new(target.join(".tilde-backup"));
            Self {
                _dir: dir,
                source,
                target,
                backups,
            }
        }

        fn source_file(&self, rel: &str, content: &str) -> LinkSpec {
            let path = self.source.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, content).unwrap();
            LinkSpec::new(&SourceFile::new(rel), &self.source, &self.target)
        }

        fn apply(&self, link: &LinkSpec, action: ConflictAction) -> Result<Outcome, ApplyError> {
            let state = link.try_classify().unwrap();
            Applier::new(&SystemFileSystemOps, &self.backups).apply(link, state, action)
        }
    }

    #[test]
    fn classify_absent() {
        let sb = Sandbox::new();
        let link = sb.source_file(".vimrc", "set nu");
        assert_eq!(link.try_classify().unwrap(), TargetState::Absent);
    }

    #[test]
    fn classify_identical_and_conflicting_files() {
        let sb = Sandbox::new();
        let link = sb.source_file(".vimrc", "set nu");
        fs::write(&link.target, "set nu").unwrap();
        assert_eq!(link.try_classify().unwrap(), TargetState::IdenticalFile);
        fs::write(&link.target, "set nonu").unwrap();
        assert_eq!(link.try_classify().unwrap(), TargetState::ConflictingFile);
    }

    #[test]
    fn classify_directory_is_conflict() {
        let sb = Sandbox::new();
        let link = sb.source_file(".config", "x");
        fs::create_dir_all(&link.target).unwrap();
        assert_eq!(link.try_classify().unwrap(), TargetState::ConflictingFile);
    }

    #[test]
    fn classify_symlinks() {
        let sb = Sandbox::new();
        let link = sb.source_file(".vimrc", "x");
        symlink(&link.source, &link.target).unwrap();
        assert_eq!(link.try_classify().unwrap(), TargetState::CorrectSymlink);

        fs::remove_file(&link.target).unwrap();
        symlink("/nonexistent/dangling", &link.target).unwrap();
        assert_eq!(link.try_classify().unwrap(), TargetState::StaleSymlink);

        fs::remove_file(&link.target).unwrap();
        let other = sb.source_file("other", "y");
        symlink(&other.source, &link.target).unwrap();
        assert_eq!(link.try_classify().unwrap(), TargetState::StaleSymlink);
    }

    #[test]
    fn absent_gets_relative_link_with_parents() {
        let sb = Sandbox::new();
        let link = sb.source_file(".config/nvim/init.vim", "x");
        assert_eq!(
            sb.apply(&link, ConflictAction::Skip).unwrap(),
            Outcome::Linked
        );
        let contents = fs::read_link(&link.target).unwrap();
        assert!(contents.is_relative());
        assert_eq!(
            contents,
            PathBuf::from("../../../repo/.config/nvim/init.vim")
        );
        assert_eq!(link.try_classify().unwrap(), TargetState::CorrectSymlink);
        assert!(fs::symlink_metadata(temp_sibling(&link.target)).is_err());
    }

    #[test]
    fn stale_symlink_is_relinked_without_backup() {
        let sb = Sandbox::new();
        let link = sb.source_file(".vimrc", "x");
        symlink("/nowhere", &link.target).unwrap();
        assert_eq!(
            sb.apply(&link, ConflictAction::Skip).unwrap(),
            Outcome::Relinked
        );
        assert_eq!(link.try_classify().unwrap(), TargetState::CorrectSymlink);
        assert!(!sb.backups.root().exists());
    }

    #[test]
    fn identical_file_is_untouched() {
        let sb = Sandbox::new();
        let link = sb.source_file(".vimrc", "same");
        fs::write(&link.target, "same").unwrap();
        assert_eq!(
            sb.apply(&link, ConflictAction::Backup).unwrap(),
            Outcome::SkippedIdentical
        );
        assert!(!fs::symlink_metadata(&link.target).unwrap().is_symlink());
    }

    #[test]
    fn conflict_backup_then_link() {
        let sb = Sandbox::new();
        let link = sb.source_file(".bashrc", "repo");
        fs::write(&link.target, "mine").unwrap();
        let outcome = sb.apply(&link, ConflictAction::Backup).unwrap();
        let Outcome::BackedUpAndLinked { backup } = outcome else {
            panic!("expected backup outcome, got {outcome:?}");
        };
        assert_eq!(fs::read_to_string(backup).unwrap(), "mine");
        assert_eq!(link.try_classify().unwrap(), TargetState::CorrectSymlink);
    }

    #[test]
    fn conflict_replace_deletes_original() {
        let sb = Sandbox::new();
        let link = sb.source_file(".bashrc", "repo");
        fs::write(&link.target, "mine").unwrap();
        assert_eq!(
            sb.apply(&link, ConflictAction::Replace).unwrap(),
            Outcome::Replaced
        );
        assert_eq!(fs::read_to_string(&link.target).unwrap(), "repo");
        assert!(!sb.backups.root().exists());
    }

    #[test]
    fn conflict_skip_leaves_original() {
        let sb = Sandbox::new();
        let link = sb.source_file(".bashrc", "repo");
        fs::write(&link.target, "mine").unwrap();
        assert_eq!(
            sb.apply(&link, ConflictAction::Skip).unwrap(),
            Outcome::SkippedByPolicy
        );
        assert_eq!(fs::read_to_string(&link.target).unwrap(), "mine");
    }

    #[test]
    fn replace_refuses_directory() {
        let sb = Sandbox::new();
        let link = sb.source_file(".config", "x");
        fs::create_dir_all(link.target.join("keep")).unwrap();
        let err = sb.apply(&link, ConflictAction::Replace).unwrap_err();
        assert!(matches!(err, ApplyError::RefuseDirectory(_)));
        assert!(link.target.join("keep").is_dir());
    }

    #[test]
    fn backup_moves_directory_aside() {
        let sb = Sandbox::new();
        let link = sb.source_file(".config", "x");
        fs::create_dir_all(link.target.join("keep")).unwrap();
        sb.apply(&link, ConflictAction::Backup).unwrap();
        assert!(sb.backups.path_for(Path::new(".config/keep")).is_dir());
        assert_eq!(link.try_classify().unwrap(), TargetState::CorrectSymlink);
    }

    #[test]
    fn existing_backup_blocks_and_keeps_file() {
        let sb = Sandbox::new();
        let link = sb.source_file(".bashrc", "repo");
        fs::write(&link.target, "mine").unwrap();
        fs::create_dir_all(sb.backups.root()).unwrap();
        fs::write(sb.backups.path_for(Path::new(".bashrc")), "old backup").unwrap();
        let err = sb.apply(&link, ConflictAction::Backup).unwrap_err();
        assert!(matches!(err, ApplyError::BackupExists(_)));
        assert_eq!(fs::read_to_string(&link.target).unwrap(), "mine");
    }

    #[derive(Debug)]
    struct FailingSymlinkOps;

    impl FileSystemOps for FailingSymlinkOps {
        fn create_dir_all(&self, path: &Path) -> io::Result<()> {
            SystemFileSystemOps.create_dir_all(path)
        }
        fn symlink(&self, _: &Path, _: &Path) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "no links"))
        }
        fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
            SystemFileSystemOps.rename(from, to)
        }
        fn remove_file(&self, path: &Path) -> io::Result<()> {
            SystemFileSystemOps.remove_file(path)
        }
        fn remove_dir(&self, path: &Path) -> io::Result<()> {
            SystemFileSystemOps.remove_dir(path)
        }
    }

    #[test]
    fn failed_link_rolls_back_backup() {
        let sb = Sandbox::new();
        let link = sb.source_file(".bashrc", "repo");
        fs::write(&link.target, "mine").unwrap();
        let err = Applier::new(&FailingSymlinkOps, &sb.backups)
            .apply(&link, TargetState::ConflictingFile, ConflictAction::Backup)
            .unwrap_err();
        assert!(matches!(err, ApplyError::Link { .. }));
        assert_eq!(fs::read_to_string(&link.target).unwrap(), "mine");
        assert!(!sb.backups.contains(Path::new(".bashrc")));
    }

    #[test]
    fn dry_run_reports_same_outcome_without_mutation() {
        let sb = Sandbox::new();
        let link = sb.source_file(".config/git/config", "repo");
        let conflict = sb.source_file(".bashrc", "repo");
        fs::write(&conflict.target, "mine").unwrap();
        let applier = Applier::new(&DryRunFileSystemOps, &sb.backups);

        let state = link.try_classify().unwrap();
        assert_eq!(
            applier.apply(&link, state, ConflictAction::Skip).unwrap(),
            Outcome::Linked
        );
        assert!(!sb.target.join(".config").exists());

        let state = conflict.try_classify().unwrap();
        let outcome = applier.apply(&conflict, state, ConflictAction::Backup).unwrap();
        assert!(matches!(outcome, Outcome::BackedUpAndLinked { .. }));
        assert_eq!(fs::read_to_string(&conflict.target).unwrap(), "mine");
        assert!(!sb.backups.root().exists());
    }

    #[test]
    fn lenient_canonicalize_appends_missing_parts() {
        let sb = Sandbox::new();
        let missing = sb.target.join("a/b");
        assert_eq!(canonicalize_lenient(&missing).unwrap(), missing);
    }

    #[test]
    fn temp_sibling_is_hidden_next_to_target() {
        assert_eq!(
            temp_sibling(Path::new("/home/u/.vimrc")),
            PathBuf::from("/home/u/..vimrc.tilde-tmp")
        );
    }

    /// Real filesystem, except that links can never be created and, with
    /// `fail_restore`, only the first rename succeeds.
    #[derive(Debug)]
    struct LinkFailsOps {
        fail_restore: bool,
        renames: AtomicUsize,
    }

    impl LinkFailsOps {
        const fn new(fail_restore: bool) -> Self {
            Self {
                fail_restore,
                renames: AtomicUsize::new(0),
            }
        }
    }

    impl FileSystemOps for LinkFailsOps {
        fn create_dir_all(&self, path: &Path) -> io::Result<()> {
            SystemFileSystemOps.create_dir_all(path)
        }

        fn symlink(&self, _contents: &Path, _link: &Path) -> io::Result<()> {
            Err(io::Error::other("read-only filesystem"))
        }

        fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
            if self.fail_restore && self.renames.fetch_add(1, Ordering::SeqCst) > 0 {
                return Err(io::Error::other("device busy"));
            }
            SystemFileSystemOps.rename(from, to)
        }

        fn remove_file(&self, path: &Path) -> io::Result<()> {
            SystemFileSystemOps.remove_file(path)
        }

        fn remove_dir(&self, path: &Path) -> io::Result<()> {
            SystemFileSystemOps.remove_dir(path)
        }
    }

    #[test]
    fn failed_link_after_backup_restores_original() {
        let sb = Sandbox::new();
        let link = sb.source_file(".bashrc", "repo");
        fs::write(&link.target, "mine").unwrap();
        let ops = LinkFailsOps::new(false);

        let err = Applier::new(&ops, &sb.backups)
            .apply(&link, TargetState::ConflictingFile, ConflictAction::Backup)
            .unwrap_err();

        assert!(matches!(err, ApplyError::Link { .. }));
        assert_eq!(fs::read_to_string(&link.target).unwrap(), "mine");
        assert!(!sb.backups.contains(Path::new(".bashrc")));
    }

    #[test]
    fn failed_rollback_names_the_backup() {
        let sb = Sandbox::new();
        let link = sb.source_file(".bashrc", "repo");
        fs::write(&link.target, "mine").unwrap();
        let ops = LinkFailsOps::new(true);

        let err = Applier::new(&ops, &sb.backups)
            .apply(&link, TargetState::ConflictingFile, ConflictAction::Backup)
            .unwrap_err();

        let backup = sb.backups.path_for(Path::new(".bashrc"));
        assert!(matches!(&err, ApplyError::Stranded { backup: b, .. } if *b == backup));
        assert!(err.to_string().contains(&backup.display().to_string()));
        assert!(err.to_string().contains("device busy"));
        assert_eq!(fs::read_to_string(&backup).unwrap(), "mine");
    }
}

//! Link primitives: target classification, backups, and the check + apply
//! step for a single file.
pub mod backup;
pub mod fs;
pub mod symlink;

use std::fmt;
use std::path::PathBuf;

/// What currently occupies a link target.
///
/// # Examples
///
/// ```
/// use tilde_cli::resources::TargetState;
///
/// assert!(TargetState::ConflictingFile.is_conflict());
/// assert!(!TargetState::StaleSymlink.is_conflict());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetState {
    /// Nothing exists at the path.
    Absent,
    /// A symlink resolving to the source file.
    CorrectSymlink,
    /// A symlink resolving elsewhere, or dangling.
    StaleSymlink,
    /// A regular file with the same content as the source.
    IdenticalFile,
    /// A file with different content, a directory, or any other entity.
    ConflictingFile,
}

impl TargetState {
    /// Whether this state needs a conflict decision before linking.
    #[must_use]
    pub const fn is_conflict(self) -> bool {
        matches!(self, Self::ConflictingFile)
    }
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Absent => "absent",
            Self::CorrectSymlink => "linked",
            Self::StaleSymlink => "stale symlink",
            Self::IdenticalFile => "identical file",
            Self::ConflictingFile => "conflicting file",
        })
    }
}

/// What to do with a [`TargetState::ConflictingFile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictAction {
    /// Delete the existing file and link.
    Replace,
    /// Move the existing file into the backup store and link.
    Backup,
    /// Leave the existing file alone.
    Skip,
}

impl fmt::Display for ConflictAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Replace => "(r)eplace",
            Self::Backup => "(b)ackup, then replace",
            Self::Skip => "(s)kip",
        })
    }
}

/// Result of applying one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A new link was created where nothing existed.
    Linked,
    /// A stale symlink was replaced.
    Relinked,
    /// The original was moved to `backup` and the link created.
    BackedUpAndLinked {
        /// Where the original now lives.
        backup: PathBuf,
    },
    /// The original was deleted and the link created.
    Replaced,
    /// The link was already correct.
    AlreadyLinked,
    /// The target already has the source's content.
    SkippedIdentical,
    /// The conflict was left in place.
    SkippedByPolicy,
}

impl Outcome {
    /// Whether the target tree was (or would be) modified.
    #[must_use]
    pub const fn is_change(&self) -> bool {
        matches!(
            self,
            Self::Linked | Self::Relinked | Self::BackedUpAndLinked { .. } | Self::Replaced
        )
    }

    /// Short verb phrase for reports, phrased conditionally in dry-run.
    #[must_use]
    pub const fn describe(&self, dry_run: bool) -> &'static str {
        match (self, dry_run) {
            (Self::Linked, false) => "linked",
            (Self::Linked, true) => "would link",
            (Self::Relinked, false) => "relinked",
            (Self::Relinked, true) => "would relink",
            (Self::BackedUpAndLinked { .. }, false) => "backed up + linked",
            (Self::BackedUpAndLinked { .. }, true) => "would back up + link",
            (Self::Replaced, false) => "replaced",
            (Self::Replaced, true) => "would replace",
            (Self::AlreadyLinked, _) => "already linked",
            (Self::SkippedIdentical, false) => "skipped (identical)",
            (Self::SkippedIdentical, true) => "would skip (identical)",
            (Self::SkippedByPolicy, false) => "skipped",
            (Self::SkippedByPolicy, true) => "would skip",
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn only_conflicting_file_is_conflict() {
        for state in [
            TargetState::Absent,
            TargetState::CorrectSymlink,
            TargetState::StaleSymlink,
            TargetState::IdenticalFile,
        ] {
            assert!(!state.is_conflict(), "{state} is not a conflict");
        }
        assert!(TargetState::ConflictingFile.is_conflict());
    }

    #[test]
    fn changes_are_flagged() {
        assert!(Outcome::Linked.is_change());
        assert!(Outcome::Relinked.is_change());
        assert!(Outcome::Replaced.is_change());
        assert!(
            Outcome::BackedUpAndLinked {
                backup: PathBuf::from("/b")
            }
            .is_change()
        );
        assert!(!Outcome::AlreadyLinked.is_change());
        assert!(!Outcome::SkippedIdentical.is_change());
        assert!(!Outcome::SkippedByPolicy.is_change());
    }

    #[test]
    fn dry_run_descriptions_are_conditional() {
        assert_eq!(Outcome::Linked.describe(true), "would link");
        assert_eq!(Outcome::Relinked.describe(true), "would relink");
        assert_eq!(Outcome::SkippedIdentical.describe(true), "would skip (identical)");
        assert_eq!(
            Outcome::BackedUpAndLinked {
                backup: PathBuf::new()
            }
            .describe(true),
            "would back up + link"
        );
        assert_eq!(Outcome::Replaced.describe(true), "would replace");
        assert_eq!(Outcome::SkippedByPolicy.describe(true), "would skip");
        assert_eq!(Outcome::Linked.describe(false), "linked");
    }

    #[test]
    fn conflict_action_labels_show_shortcut_letters() {
        assert!(ConflictAction::Replace.to_string().starts_with("(r)"));
        assert!(ConflictAction::Backup.to_string().starts_with("(b)"));
        assert!(ConflictAction::Skip.to_string().starts_with("(s)"));
    }
}

//! Link the inventory into the target root, and undo it.
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use super::{Context, Task, TaskResult, TaskStats};
use crate::error::TildeError;
use crate::inventory::Inventory;
use crate::resources::symlink::{Applier, LinkSpec};
use crate::resources::{ConflictAction, Outcome, TargetState};

/// How conflicting files are resolved while linking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Back up every conflict. Used after the batch confirmation was accepted.
    BackupAll,
    /// Ask for each conflicting file.
    PerFile,
}

/// Per-file results of a link or unlink pass.
#[derive(Debug, Default)]
pub struct LinkReport {
    /// Successful outcomes in inventory order.
    pub outcomes: Vec<(PathBuf, Outcome)>,
    /// Files whose step failed, with the warning that was logged.
    pub failures: Vec<(PathBuf, String)>,
    /// Aggregate counters.
    pub stats: TaskStats,
}

/// Classify `link`, degrading an unreadable target to a conflict.
pub fn classify(ctx: &Context, link: &LinkSpec) -> TargetState {
    link.try_classify().unwrap_or_else(|e| {
        ctx.log
            .warn(&format!("{e}; treating {} as a conflict", link.relative.display()));
        TargetState::ConflictingFile
    })
}

/// Pair every inventory file with its location under the target root.
#[must_use]
pub fn link_specs(ctx: &Context, inventory: &Inventory) -> Vec<LinkSpec> {
    inventory
        .files()
        .iter()
        .map(|f| LinkSpec::new(f, ctx.source(), ctx.target()))
        .collect()
}

/// Classify everything up front and return the conflicting files.
#[must_use]
pub fn find_conflicts(ctx: &Context, inventory: &Inventory) -> Vec<LinkSpec> {
    link_specs(ctx, inventory)
        .into_iter()
        .filter(|link| classify(ctx, link).is_conflict())
        .collect()
}

/// Batch mode: list every conflict and ask once before anything changes.
///
/// # Errors
///
/// Returns [`TildeError::UserAbort`] when the user declines. Prompt failures
/// are treated as a decline.
pub fn confirm_conflicts(ctx: &Context, inventory: &Inventory) -> Result<(), TildeError> {
    let conflicts = find_conflicts(ctx, inventory);
    if conflicts.is_empty() {
        return Ok(());
    }

    ctx.log.warn(&format!(
        "{} file(s) already exist in {} and differ from the source:",
        conflicts.len(),
        ctx.target().display()
    ));
    for link in &conflicts {
        ctx.log.info(&link.relative.display().to_string());
    }
    let question = format!(
        "Move them to {} and link the repository versions?",
        ctx.backup_store().root().display()
    );
    let accepted = ctx.prompt.confirm(&question, false).unwrap_or_else(|e| {
        ctx.log.warn(&format!("cannot read answer: {e:#}"));
        false
    });
    if accepted {
        Ok(())
    } else {
        Err(TildeError::UserAbort {
            conflicts: conflicts.len(),
        })
    }
}

/// Classify and apply each file in turn.
///
/// Each file is classified immediately before its own apply step. Per-file
/// failures are logged as warnings and counted; they never stop the pass.
///
/// # Errors
///
/// Returns an error only if a per-file prompt cannot be answered.
pub fn link_all(
    ctx: &Context,
    inventory: &Inventory,
    policy: ConflictPolicy,
) -> Result<LinkReport> {
    let store = ctx.backup_store();
    let applier = Applier::new(ctx.fs_ops.as_ref(), &store);
    let mut report = LinkReport::default();

    for link in link_specs(ctx, inventory) {
        let rel = link.relative.display().to_string();
        let state = classify(ctx, &link);
        ctx.log.debug(&format!("{rel}: {state}"));

        let action = match (state, policy) {
            (TargetState::ConflictingFile, ConflictPolicy::BackupAll) => ConflictAction::Backup,
            (TargetState::ConflictingFile, ConflictPolicy::PerFile) => {
                ctx.prompt.choose_conflict_action(&rel)?
            }
            _ => ConflictAction::Skip,
        };

        match applier.apply(&link, state, action) {
            Ok(outcome) => {
                report_outcome(ctx, &rel, &outcome);
                match &outcome {
                    o if o.is_change() => report.stats.changed += 1,
                    Outcome::AlreadyLinked => report.stats.already_ok += 1,
                    _ => report.stats.skipped += 1,
                }
                report.outcomes.push((link.relative, outcome));
            }
            Err(e) => {
                let msg = format!("{rel}: {e}");
                ctx.log.warn(&msg);
                report.stats.failed += 1;
                report.failures.push((link.relative, msg));
            }
        }
    }
    Ok(report)
}

fn report_outcome(ctx: &Context, rel: &str, outcome: &Outcome) {
    let verb = outcome.describe(ctx.dry_run);
    match outcome {
        Outcome::AlreadyLinked => ctx.log.debug(&format!("{verb}: {rel}")),
        Outcome::BackedUpAndLinked { backup } if !ctx.dry_run => ctx
            .log
            .info(&format!("{verb}: {rel} (original at {})", backup.display())),
        _ if ctx.dry_run => ctx.log.dry_run(&format!("{verb}: {rel}")),
        _ => ctx.log.info(&format!("{verb}: {rel}")),
    }
}

/// What uninstall did with one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlinkOutcome {
    /// Our link was removed; nothing to restore.
    Removed,
    /// Our link was removed and the backup moved back.
    RemovedAndRestored,
    /// The target was absent and the backup moved back.
    Restored,
    /// Nothing at the target and no backup.
    NothingToDo,
    /// Something other than our link is there; left alone.
    LeftAlone,
}

impl UnlinkOutcome {
    const fn describe(self, dry_run: bool) -> &'static str {
        match (self, dry_run) {
            (Self::Removed, false) => "removed link",
            (Self::Removed, true) => "would remove link",
            (Self::RemovedAndRestored, false) => "removed link, restored original",
            (Self::RemovedAndRestored, true) => "would remove link and restore original",
            (Self::Restored, false) => "restored original",
            (Self::Restored, true) => "would restore original",
            (Self::NothingToDo, _) => "not installed",
            (Self::LeftAlone, _) => "not a tilde link, leaving it",
        }
    }
}

/// Remove our links, restore backups, then prune the backup store.
#[must_use]
pub fn unlink_all(ctx: &Context, inventory: &Inventory) -> TaskStats {
    let store = ctx.backup_store();
    let ops = ctx.fs_ops.as_ref();
    let mut stats = TaskStats::new();
    let mut restored = Vec::new();

    for link in link_specs(ctx, inventory) {
        let rel = link.relative.display().to_string();
        let has_backup = store.contains(&link.relative);

        let step = match link.try_classify() {
            Err(e) => Err(e.to_string()),
            Ok(TargetState::CorrectSymlink) => ops
                .remove_file(&link.target)
                .map_err(|e| format!("cannot remove {}: {e}", link.target.display()))
                .and_then(|()| {
                    if has_backup {
                        store
                            .restore(ops, &link.relative, &link.target)
                            .map(|_| UnlinkOutcome::RemovedAndRestored)
                            .map_err(|e| e.to_string())
                    } else {
                        Ok(UnlinkOutcome::Removed)
                    }
                }),
            Ok(TargetState::Absent) if has_backup => store
                .restore(ops, &link.relative, &link.target)
                .map(|_| UnlinkOutcome::Restored)
                .map_err(|e| e.to_string()),
            Ok(TargetState::Absent) => Ok(UnlinkOutcome::NothingToDo),
            Ok(_) => Ok(UnlinkOutcome::LeftAlone),
        };
        if matches!(
            step,
            Ok(UnlinkOutcome::RemovedAndRestored | UnlinkOutcome::Restored)
        ) {
            restored.push(link.relative.clone());
        }

        match step {
            Ok(outcome @ UnlinkOutcome::NothingToDo) => {
                ctx.log.debug(&format!("{}: {rel}", outcome.describe(ctx.dry_run)));
                stats.already_ok += 1;
            }
            Ok(outcome @ UnlinkOutcome::LeftAlone) => {
                ctx.log.warn(&format!("{rel}: {}", outcome.describe(ctx.dry_run)));
                stats.skipped += 1;
            }
            Ok(outcome) => {
                let msg = format!("{}: {rel}", outcome.describe(ctx.dry_run));
                if ctx.dry_run {
                    ctx.log.dry_run(&msg);
                } else {
                    ctx.log.info(&msg);
                }
                stats.changed += 1;
            }
            Err(msg) => {
                ctx.log.warn(&format!("{rel}: {msg}"));
                stats.failed += 1;
            }
        }
    }

    for dir in store.prune(ops, &restored) {
        if ctx.dry_run {
            ctx.log
                .dry_run(&format!("would remove empty directory {}", dir.display()));
        } else {
            ctx.log
                .debug(&format!("removed empty directory {}", dir.display()));
        }
    }
    stats
}

/// Link every inventory file into the target root.
#[derive(Debug)]
pub struct InstallSymlinks {
    inventory: Arc<Inventory>,
    policy: ConflictPolicy,
}

impl InstallSymlinks {
    /// Create the task for `inventory`.
    #[must_use]
    pub const fn new(inventory: Arc<Inventory>, policy: ConflictPolicy) -> Self {
        Self { inventory, policy }
    }
}

impl Task for InstallSymlinks {
    fn name(&self) -> &str {
        "Install symlinks"
    }

    fn should_run(&self, _ctx: &Context) -> bool {
        true
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        if self.inventory.is_empty() {
            return Ok(TaskResult::Skipped("no files to link".to_string()));
        }
        let report = link_all(ctx, &self.inventory, self.policy)?;
        Ok(report.stats.finish(ctx))
    }
}

/// Remove links created by [`InstallSymlinks`] and restore backups.
#[derive(Debug)]
pub struct UninstallSymlinks {
    inventory: Arc<Inventory>,
}

impl UninstallSymlinks {
    /// Create the task for `inventory`.
    #[must_use]
    pub const fn new(inventory: Arc<Inventory>) -> Self {
        Self { inventory }
    }
}

impl Task for UninstallSymlinks {
    fn name(&self) -> &str {
        "Remove symlinks"
    }

    fn should_run(&self, _ctx: &Context) -> bool {
        true
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        Ok(unlink_all(ctx, &self.inventory).finish(ctx))
    }
}

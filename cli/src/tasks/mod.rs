//! Named tasks that make up the install and uninstall commands.
mod context;
mod processing;
pub mod symlinks;
pub mod vim;

pub use context::Context;
#[allow(unused_imports)] // TaskStats is used by doc-tests via the lib crate
pub use processing::{TaskResult, TaskStats};

use std::sync::Arc;

use anyhow::Result;

use crate::inventory::Inventory;
use crate::logging::TaskStatus;
use symlinks::ConflictPolicy;

/// A named, executable task.
pub trait Task: Send + Sync {
    /// Human-readable task name.
    fn name(&self) -> &str;

    /// Whether this task applies to the current run.
    fn should_run(&self, ctx: &Context) -> bool;

    /// Execute the task.
    ///
    /// # Errors
    ///
    /// Returns an error if the task cannot make progress at all. Per-file
    /// failures are counted in [`TaskStats`] instead.
    fn run(&self, ctx: &Context) -> Result<TaskResult>;
}

/// The tasks run by the uninstall command.
#[must_use]
pub fn all_uninstall_tasks(inventory: Arc<Inventory>) -> Vec<Box<dyn Task>> {
    vec![Box::new(symlinks::UninstallSymlinks::new(inventory))]
}

/// The tasks run by the install command, in execution order.
///
/// The vim tasks come after linking so that a linked `.vimrc` is picked up
/// by `+PlugInstall`.
#[must_use]
pub fn all_install_tasks(inventory: Arc<Inventory>, policy: ConflictPolicy) -> Vec<Box<dyn Task>> {
    vec![
        Box::new(symlinks::InstallSymlinks::new(inventory, policy)),
        Box::new(vim::InstallVimPlug),
        Box::new(vim::InstallVimPlugins),
    ]
}

/// Execute a task, recording the result in the logger.
pub fn execute(task: &dyn Task, ctx: &Context) {
    if !task.should_run(ctx) {
        ctx.log
            .debug(&format!("skipping task: {} (not applicable)", task.name()));
        ctx.log
            .record_task(task.name(), TaskStatus::NotApplicable, None);
        return;
    }

    ctx.log.stage(task.name());

    match task.run(ctx) {
        Ok(TaskResult::Ok) => {
            ctx.log.record_task(task.name(), TaskStatus::Ok, None);
        }
        Ok(TaskResult::Skipped(reason)) => {
            ctx.log.info(&format!("skipped: {reason}"));
            ctx.log
                .record_task(task.name(), TaskStatus::Skipped, Some(&reason));
        }
        Ok(TaskResult::DryRun) => {
            ctx.log.record_task(task.name(), TaskStatus::DryRun, None);
        }
        Err(e) => {
            ctx.log.error(&format!("{}: {e:#}", task.name()));
            ctx.log
                .record_task(task.name(), TaskStatus::Failed, Some(&format!("{e:#}")));
        }
    }
}


#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use test_helpers::TestContext;

    /// A mock task for testing `execute()`.
    struct MockTask {
        name: &'static str,
        should_run: bool,
        result: Result<TaskResult, String>,
    }

    impl Task for MockTask {
        fn name(&self) -> &str {
            self.name
        }
        fn should_run(&self, _ctx: &Context) -> bool {
            self.should_run
        }
        fn run(&self, _ctx: &Context) -> Result<TaskResult> {
            self.result.clone().map_err(|s| anyhow::anyhow!("{s}"))
        }
    }

    fn run_one(task: &MockTask) -> Vec<crate::logging::TaskEntry> {
        let tc = TestContext::new();
        execute(task, &tc.ctx());
        tc.log().task_entries()
    }

    #[test]
    fn execute_skips_non_applicable_task() {
        let entries = run_one(&MockTask {
            name: "test-task",
            should_run: false,
            result: Ok(TaskResult::Ok),
        });
        assert_eq!(entries[0].status, TaskStatus::NotApplicable);
    }

    #[test]
    fn execute_records_ok_task() {
        let entries = run_one(&MockTask {
            name: "ok-task",
            should_run: true,
            result: Ok(TaskResult::Ok),
        });
        assert_eq!(entries[0].name, "ok-task");
        assert_eq!(entries[0].status, TaskStatus::Ok);
    }

    #[test]
    fn execute_records_failed_task() {
        let tc = TestContext::new();
        let task = MockTask {
            name: "fail-task",
            should_run: true,
            result: Err("kaboom".to_string()),
        };
        execute(&task, &tc.ctx());
        assert_eq!(tc.log().failure_count(), 1);
        assert_eq!(
            tc.log().task_entries()[0].message.as_deref(),
            Some("kaboom")
        );
    }

    #[test]
    fn execute_records_skipped_task() {
        let entries = run_one(&MockTask {
            name: "skip-task",
            should_run: true,
            result: Ok(TaskResult::Skipped("not needed".to_string())),
        });
        assert_eq!(entries[0].status, TaskStatus::Skipped);
        assert_eq!(entries[0].message.as_deref(), Some("not needed"));
    }

    #[test]
    fn execute_records_dry_run_task() {
        let entries = run_one(&MockTask {
            name: "dry-task",
            should_run: true,
            result: Ok(TaskResult::DryRun),
        });
        assert_eq!(entries[0].status, TaskStatus::DryRun);
    }

    #[test]
    fn install_task_order() {
        let tc = TestContext::new();
        let names: Vec<String> =
            all_install_tasks(Arc::new(tc.inventory()), ConflictPolicy::BackupAll)
                .iter()
                .map(|t| t.name().to_string())
                .collect();
        assert_eq!(
            names,
            vec!["Install symlinks", "Install vim-plug", "Install vim plugins"]
        );
    }

    #[test]
    fn uninstall_task_names() {
        let tc = TestContext::new();
        let names: Vec<String> = all_uninstall_tasks(Arc::new(tc.inventory()))
            .iter()
            .map(|t| t.name().to_string())
            .collect();
        assert_eq!(names, vec!["Remove symlinks"]);
    }
}

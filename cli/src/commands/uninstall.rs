//! Uninstall command implementation.
use anyhow::Result;
use std::sync::Arc;

use super::{CommandRunner, CommandSetup};
use crate::cli::{GlobalOpts, UninstallOpts};
use crate::exec::{Executor, SystemExecutor};
use crate::logging::Logger;
use crate::prompt::InquirePrompt;
use crate::tasks;

/// Run the uninstall command.
///
/// # Errors
///
/// Returns an error if setup fails or a task fails.
pub fn run(global: &GlobalOpts, _opts: &UninstallOpts, log: &Arc<Logger>) -> Result<()> {
    run_with(global, log, Arc::new(SystemExecutor))
}

/// Run the uninstall command with an explicit executor.
///
/// # Errors
///
/// Same as [`run`].
pub fn run_with(global: &GlobalOpts, log: &Arc<Logger>, executor: Arc<dyn Executor>) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    let runner = CommandRunner::with_executor(
        &setup,
        log,
        global.dry_run,
        Arc::new(InquirePrompt),
        executor,
    );
    let tasks = tasks::all_uninstall_tasks(Arc::clone(&setup.inventory));
    runner.run(tasks.iter().map(Box::as_ref))
}

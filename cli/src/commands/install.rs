//! Install command implementation.
use anyhow::Result;
use std::sync::Arc;

use super::{CommandRunner, CommandSetup, resolve_source, resolve_target, version};
use crate::cli::{ConflictMode, GlobalOpts, InstallOpts};
use crate::exec::{Executor, SystemExecutor};
use crate::logging::Logger;
use crate::prompt::{AssumeYesPrompt, InquirePrompt, Prompt};
use crate::tasks::{self, symlinks};

/// Run the install command.
///
/// # Errors
///
/// Returns an error if setup fails, the user declines the conflict prompt,
/// or a task fails.
pub fn run(global: &GlobalOpts, opts: &InstallOpts, log: &Arc<Logger>) -> Result<()> {
    let prompt: Arc<dyn Prompt> = if opts.yes {
        Arc::new(AssumeYesPrompt)
    } else {
        Arc::new(InquirePrompt)
    };
    run_with(global, opts, log, prompt, Arc::new(SystemExecutor))
}

/// Run the install command with explicit prompt and executor.
///
/// # Errors
///
/// Same as [`run`].
pub fn run_with(
    global: &GlobalOpts,
    opts: &InstallOpts,
    log: &Arc<Logger>,
    prompt: Arc<dyn Prompt>,
    executor: Arc<dyn Executor>,
) -> Result<()> {
    log.info(&format!("tilde {}", version::version()));

    let setup = CommandSetup::init_with(
        resolve_source(global)?,
        &resolve_target(global)?,
        global.dry_run,
        log,
        |file| {
            if opts.no_plugins {
                file.plugins.enabled = false;
            }
        },
    )?;
    let runner = CommandRunner::with_executor(&setup, log, global.dry_run, prompt, executor);

    let policy = match opts.conflicts {
        ConflictMode::Batch => {
            symlinks::confirm_conflicts(runner.context(), &setup.inventory)?;
            symlinks::ConflictPolicy::BackupAll
        }
        ConflictMode::Interactive => symlinks::ConflictPolicy::PerFile,
    };

    let tasks = tasks::all_install_tasks(Arc::clone(&setup.inventory), policy);
    runner.run(tasks.iter().map(Box::as_ref))
}

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::wildcard_imports,
    clippy::indexing_slicing
)]
//! Integration tests for the `install` command.
//!
//! These tests run [`install::run_with`] end to end against temporary source
//! and target directories and check the resulting target tree.

mod common;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use common::*;
use tilde_cli::config::ignore::IgnoreSet;
use tilde_cli::error::{TildeError, ValidationError};
use tilde_cli::inventory::Inventory;
use tilde_cli::resources::ConflictAction;
use tilde_cli::tasks::{self, symlinks::ConflictPolicy};

// ---------------------------------------------------------------------------
// Snapshot: full install task list
// ---------------------------------------------------------------------------

/// Snapshot of all install task names in their declared order.
///
/// Any addition, removal, or rename of an install task will cause this test
/// to fail, prompting a deliberate snapshot update.
#[test]
fn install_task_names() {
    let dir = tempfile::tempdir().unwrap();
    let inventory = Inventory::scan(dir.path(), &IgnoreSet::default()).unwrap();
    let all_tasks = tasks::all_install_tasks(Arc::new(inventory), ConflictPolicy::BackupAll);
    let task_names: Vec<&str> = all_tasks.iter().map(|t| t.name()).collect();
    insta::assert_snapshot!("install_task_names", task_names.join("\n"));
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn absent_file_is_linked_relatively() {
    let env = TestEnv::new();
    env.write_source(".vimrc", "set number");

    env.install(false, ScriptedPrompt::confirming(false)).unwrap();

    assert!(env.is_linked(".vimrc"));
    let contents = fs::read_link(env.target().join(".vimrc")).unwrap();
    assert!(contents.is_relative(), "link should be relative: {contents:?}");
    assert_eq!(env.read_target(".vimrc"), "set number");
}

#[test]
fn no_conflicts_means_no_prompt() {
    let env = TestEnv::new();
    env.write_source(".vimrc", "set number");
    let prompt = Arc::new(ScriptedPrompt::confirming(false));

    tilde_cli::commands::install::run_with(
        &env.global(false),
        &batch(),
        &Arc::new(tilde_cli::logging::Logger::with_log_file(None)),
        Arc::clone(&prompt) as Arc<dyn tilde_cli::prompt::Prompt>,
        Arc::new(NoToolsExecutor),
    )
    .unwrap();

    assert!(prompt.asked().is_empty());
}

#[test]
fn nested_files_get_parent_directories() {
    let env = TestEnv::new();
    env.write_source(".config/nvim/init.vim", "x");

    env.install(false, ScriptedPrompt::confirming(false)).unwrap();

    assert!(env.target().join(".config/nvim").is_dir());
    assert!(
        !fs::symlink_metadata(env.target().join(".config"))
            .unwrap()
            .file_type()
            .is_symlink(),
        "directories are created, not linked"
    );
    assert!(env.is_linked(".config/nvim/init.vim"));
}

#[test]
fn identical_file_is_left_as_a_plain_file() {
    let env = TestEnv::new();
    env.write_source(".bashrc", "same");
    env.write_target(".bashrc", "same");

    env.install(false, ScriptedPrompt::confirming(false)).unwrap();

    let meta = fs::symlink_metadata(env.target().join(".bashrc")).unwrap();
    assert!(meta.file_type().is_file());
    assert!(!env.target().join(".tilde-backup").exists());
}

#[test]
fn accepted_conflict_is_backed_up_and_linked() {
    let env = TestEnv::new();
    env.write_source(".bashrc", "repo");
    env.write_target(".bashrc", "mine");

    env.install(false, ScriptedPrompt::confirming(true)).unwrap();

    assert!(env.is_linked(".bashrc"));
    assert_eq!(
        fs::read_to_string(env.target().join(".tilde-backup/.bashrc")).unwrap(),
        "mine"
    );
}

#[test]
fn declined_conflict_aborts_without_mutation() {
    let env = TestEnv::new();
    env.write_source(".bashrc", "repo");
    env.write_source(".vimrc", "repo");
    env.write_target(".bashrc", "mine");
    let before = env.snapshot();

    let err = env
        .install(false, ScriptedPrompt::confirming(false))
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<TildeError>(),
        Some(TildeError::UserAbort { conflicts: 1 })
    ));
    assert_eq!(env.snapshot(), before, "nothing may change after a decline");
}

#[test]
fn stale_symlink_is_replaced_without_backup() {
    let env = TestEnv::new();
    env.write_source(".vimrc", "repo");
    #[cfg(unix)]
    std::os::unix::fs::symlink("/nonexistent/vimrc", env.target().join(".vimrc")).unwrap();
    #[cfg(windows)]
    std::os::windows::fs::symlink_file("C:\\nonexistent\\vimrc", env.target().join(".vimrc"))
        .unwrap();

    // No prompt: a stale link is not a conflict.
    env.install(false, ScriptedPrompt::confirming(false)).unwrap();

    assert!(env.is_linked(".vimrc"));
    assert!(!env.target().join(".tilde-backup").exists());
}

#[test]
fn second_install_changes_nothing() {
    let env = TestEnv::new();
    env.write_source(".vimrc", "a");
    env.write_source(".config/git/config", "b");
    env.write_target(".config/git/config", "mine");

    env.install(false, ScriptedPrompt::confirming(true)).unwrap();
    let after_first = env.snapshot();
    env.install(false, ScriptedPrompt::confirming(false)).unwrap();

    assert_eq!(env.snapshot(), after_first);
}

#[test]
fn dry_run_leaves_target_identical() {
    let env = TestEnv::new();
    env.write_source(".vimrc", "repo");
    env.write_source(".bashrc", "repo");
    env.write_source(".profile", "same");
    env.write_source(".config/nvim/init.vim", "repo");
    env.write_target(".bashrc", "mine");
    env.write_target(".profile", "same");
    let before = env.snapshot();

    env.install(true, ScriptedPrompt::confirming(true)).unwrap();

    assert_eq!(env.snapshot(), before);
}

#[test]
fn dry_run_does_not_create_missing_target() {
    let env = TestEnv::new();
    env.write_source(".vimrc", "repo");
    let missing = env.target().join("new-home");
    let global = tilde_cli::cli::GlobalOpts {
        target: Some(missing.clone()),
        ..env.global(true)
    };

    tilde_cli::commands::install::run_with(
        &global,
        &batch(),
        &Arc::new(tilde_cli::logging::Logger::with_log_file(None)),
        Arc::new(ScriptedPrompt::confirming(false)),
        Arc::new(NoToolsExecutor),
    )
    .unwrap();

    assert!(!missing.exists());
}

#[test]
fn ignored_files_are_not_linked() {
    let env = TestEnv::new();
    env.write_source(".vimrc", "x");
    env.write_source("README.md", "docs");
    env.write_source(".git/config", "[core]");
    env.write_source(".gitignore", "target");
    env.write_source("notes/secret.txt", "s");
    env.write_source("tilde.toml", "ignore = [\"secret\"]\n");

    env.install(false, ScriptedPrompt::confirming(false)).unwrap();

    let linked: Vec<_> = env.snapshot().into_keys().collect();
    assert_eq!(linked, vec![Path::new(".vimrc").to_path_buf()]);
}

#[test]
fn interactive_mode_asks_per_conflict() {
    let env = TestEnv::new();
    env.write_source("a", "repo");
    env.write_source("b", "repo");
    env.write_source("c", "repo");
    env.write_target("a", "mine-a");
    env.write_target("b", "mine-b");
    env.write_target("c", "mine-c");
    let prompt = ScriptedPrompt::choosing([
        ConflictAction::Replace,
        ConflictAction::Backup,
        ConflictAction::Skip,
    ]);

    env.install_with(false, &interactive(), prompt).unwrap();

    assert!(env.is_linked("a"));
    assert!(!env.target().join(".tilde-backup/a").exists());
    assert!(env.is_linked("b"));
    assert_eq!(
        fs::read_to_string(env.target().join(".tilde-backup/b")).unwrap(),
        "mine-b"
    );
    assert_eq!(env.read_target("c"), "mine-c");
}

#[test]
fn existing_backup_is_never_overwritten() {
    let env = TestEnv::new();
    env.write_source(".bashrc", "repo");
    env.write_target(".bashrc", "mine");
    env.write_target(".tilde-backup/.bashrc", "older");

    env.install(false, ScriptedPrompt::confirming(true)).unwrap();

    assert_eq!(env.read_target(".bashrc"), "mine");
    assert_eq!(env.read_target(".tilde-backup/.bashrc"), "older");
}

#[test]
fn file_as_target_is_rejected() {
    let env = TestEnv::new();
    env.write_source(".vimrc", "x");
    env.write_target("not-a-dir", "x");
    let global = tilde_cli::cli::GlobalOpts {
        target: Some(env.target().join("not-a-dir")),
        ..env.global(false)
    };

    let err = tilde_cli::commands::install::run_with(
        &global,
        &batch(),
        &Arc::new(tilde_cli::logging::Logger::with_log_file(None)),
        Arc::new(ScriptedPrompt::confirming(true)),
        Arc::new(NoToolsExecutor),
    )
    .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<TildeError>(),
        Some(TildeError::Validation(ValidationError::NotADirectory(_)))
    ));
}

#[test]
fn missing_tools_only_skip_plugin_tasks() {
    let env = TestEnv::new();
    env.write_source(".vimrc", "x");
    let opts = tilde_cli::cli::InstallOpts {
        no_plugins: false,
        ..batch()
    };

    env.install_with(false, &opts, ScriptedPrompt::confirming(false))
        .unwrap();

    assert!(env.is_linked(".vimrc"));
    assert!(!env.target().join(".vim/autoload/plug.vim").exists());
    assert_eq!(env.log().failure_count(), 0);
}

#[test]
fn current_dir_backup_dir_still_links_dotfiles() {
    let env = TestEnv::new();
    env.write_source("tilde.toml", "backup_dir = \".\"\n");
    env.write_source(".bashrc", "repo");
    env.write_source("vimrc", "repo");
    env.write_target(".bashrc", "mine");

    env.install(false, ScriptedPrompt::confirming(true)).unwrap();

    assert!(env.is_linked(".bashrc"));
    assert!(env.is_linked("vimrc"));
    assert_eq!(env.read_target(".tilde-backup/.bashrc"), "mine");
}

#[test]
fn unreadable_target_is_never_treated_as_absent() {
    let env = TestEnv::new();
    env.write_source(".config/nvim/init.vim", "repo");
    env.write_target(".config", "plain file");
    let prompt = Arc::new(ScriptedPrompt::confirming(true));

    tilde_cli::commands::install::run_with(
        &env.global(false),
        &batch(),
        &Arc::new(tilde_cli::logging::Logger::with_log_file(None)),
        Arc::clone(&prompt) as Arc<dyn tilde_cli::prompt::Prompt>,
        Arc::new(NoToolsExecutor),
    )
    .unwrap();

    assert_eq!(prompt.asked().len(), 1);
    assert_eq!(env.read_target(".config"), "plain file");
    assert!(!env.is_linked(".config/nvim/init.vim"));
}

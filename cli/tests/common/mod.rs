// Shared helpers for integration tests.
//
// Provides a pair of temporary source/target directories, scripted prompt
// answers, and a snapshot of the target tree so each integration test can
// run a command end to end without touching the real home directory.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Result, bail};
use tilde_cli::cli::{ConflictMode, GlobalOpts, InstallOpts};
use tilde_cli::commands::{install, uninstall};
use tilde_cli::exec::{ExecResult, Executor};
use tilde_cli::logging::Logger;
use tilde_cli::prompt::Prompt;
use tilde_cli::resources::ConflictAction;

/// One entry of a target tree snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// A directory.
    Dir,
    /// A regular file and its content.
    File(Vec<u8>),
    /// A symlink and its literal target.
    Symlink(PathBuf),
}

/// Answers prompts from a script and records what was asked.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    confirm: bool,
    actions: Mutex<VecDeque<ConflictAction>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompt {
    /// Answer the batch confirmation with `answer`.
    pub fn confirming(answer: bool) -> Self {
        Self {
            confirm: answer,
            ..Self::default()
        }
    }

    /// Answer per-file prompts in order; unanswered files are skipped.
    pub fn choosing(actions: impl IntoIterator<Item = ConflictAction>) -> Self {
        Self {
            actions: Mutex::new(actions.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Every prompt message or file name presented so far.
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

impl Prompt for ScriptedPrompt {
    fn confirm(&self, message: &str, _default: bool) -> Result<bool> {
        self.asked.lock().unwrap().push(message.to_string());
        Ok(self.confirm)
    }

    fn choose_conflict_action(&self, relative: &str) -> Result<ConflictAction> {
        self.asked.lock().unwrap().push(relative.to_string());
        Ok(self
            .actions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ConflictAction::Skip))
    }
}

/// Executor for a machine without curl, wget, vim or docker.
#[derive(Debug, Default)]
pub struct NoToolsExecutor;

impl Executor for NoToolsExecutor {
    fn run(&self, program: &str, _: &[&str]) -> Result<ExecResult> {
        bail!("{program} is not installed")
    }

    fn run_in(&self, _: &Path, program: &str, _: &[&str]) -> Result<ExecResult> {
        bail!("{program} is not installed")
    }

    fn run_in_with_env(
        &self,
        _: &Path,
        program: &str,
        _: &[&str],
        _: &[(&str, &str)],
    ) -> Result<ExecResult> {
        bail!("{program} is not installed")
    }

    fn run_unchecked(&self, program: &str, _: &[&str]) -> Result<ExecResult> {
        bail!("{program} is not installed")
    }

    fn run_interactive(&self, program: &str, _: &[&str]) -> Result<ExecResult> {
        bail!("{program} is not installed")
    }

    fn which(&self, _: &str) -> bool {
        false
    }
}

/// An isolated source tree and target directory.
pub struct TestEnv {
    source: tempfile::TempDir,
    target: tempfile::TempDir,
    log: Arc<Logger>,
}

impl TestEnv {
    /// Empty source and target directories.
    pub fn new() -> Self {
        Self {
            source: tempfile::tempdir().expect("create source dir"),
            target: tempfile::tempdir().expect("create target dir"),
            log: Arc::new(Logger::with_log_file(None)),
        }
    }

    /// Canonical source root.
    pub fn source(&self) -> PathBuf {
        fs::canonicalize(self.source.path()).expect("canonical source")
    }

    /// Canonical target root.
    pub fn target(&self) -> PathBuf {
        fs::canonicalize(self.target.path()).expect("canonical target")
    }

    /// Write `content` to `relative` below the source root.
    pub fn write_source(&self, relative: &str, content: &str) -> &Self {
        write(&self.source().join(relative), content);
        self
    }

    /// Write `content` to `relative` below the target root.
    pub fn write_target(&self, relative: &str, content: &str) -> &Self {
        write(&self.target().join(relative), content);
        self
    }

    /// Global options pointing at both roots.
    pub fn global(&self, dry_run: bool) -> GlobalOpts {
        GlobalOpts {
            dry_run,
            target: Some(self.target()),
            source: Some(self.source()),
        }
    }

    /// Install in batch mode without plugins.
    pub fn install(&self, dry_run: bool, prompt: ScriptedPrompt) -> Result<()> {
        self.install_with(dry_run, &batch(), prompt)
    }

    /// Install with explicit options.
    pub fn install_with(
        &self,
        dry_run: bool,
        opts: &InstallOpts,
        prompt: ScriptedPrompt,
    ) -> Result<()> {
        install::run_with(
            &self.global(dry_run),
            opts,
            &self.log,
            Arc::new(prompt),
            Arc::new(NoToolsExecutor),
        )
    }

    /// Uninstall.
    pub fn uninstall(&self, dry_run: bool) -> Result<()> {
        uninstall::run_with(&self.global(dry_run), &self.log, Arc::new(NoToolsExecutor))
    }

    /// Logger shared by every command run in this environment.
    pub fn log(&self) -> &Logger {
        &self.log
    }

    /// Every entry below the target root, keyed by relative path.
    pub fn snapshot(&self) -> BTreeMap<PathBuf, Entry> {
        let root = self.target();
        walkdir::WalkDir::new(&root)
            .min_depth(1)
            .follow_links(false)
            .into_iter()
            .map(|entry| {
                let entry = entry.expect("walk target");
                let rel = entry.path().strip_prefix(&root).unwrap().to_path_buf();
                let kind = entry.file_type();
                let value = if kind.is_symlink() {
                    Entry::Symlink(fs::read_link(entry.path()).unwrap())
                } else if kind.is_dir() {
                    Entry::Dir
                } else {
                    Entry::File(fs::read(entry.path()).unwrap())
                };
                (rel, value)
            })
            .collect()
    }

    /// Whether `relative` is a symlink resolving to the source file.
    pub fn is_linked(&self, relative: &str) -> bool {
        let link = self.target().join(relative);
        let is_symlink = fs::symlink_metadata(&link).is_ok_and(|m| m.file_type().is_symlink());
        is_symlink
            && fs::canonicalize(&link).ok() == fs::canonicalize(self.source().join(relative)).ok()
    }

    /// Content of `relative` below the target root.
    pub fn read_target(&self, relative: &str) -> String {
        fs::read_to_string(self.target().join(relative)).expect("read target file")
    }
}

/// Batch mode without plugins.
pub fn batch() -> InstallOpts {
    InstallOpts {
        conflicts: ConflictMode::Batch,
        yes: false,
        no_plugins: true,
    }
}

/// Interactive mode without plugins.
pub fn interactive() -> InstallOpts {
    InstallOpts {
        conflicts: ConflictMode::Interactive,
        ..batch()
    }
}

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(path, content).expect("write file");
}

use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::exec::Executor;
use crate::logging::Log;
use crate::operations::{DryRunFileSystemOps, FileSystemOps, SystemFileSystemOps};
use crate::prompt::Prompt;
use crate::resources::backup::BackupStore;

/// Shared context for task execution.
pub struct Context {
    /// Resolved configuration for this run.
    pub config: Arc<Config>,
    /// Logger for output and task recording.
    pub log: Arc<dyn Log>,
    /// Whether to perform a dry run (preview changes without applying).
    pub dry_run: bool,
    /// Command executor (for testing or real system calls).
    pub executor: Arc<dyn Executor>,
    /// Filesystem mutation primitives; a no-op implementation in dry-run.
    pub fs_ops: Arc<dyn FileSystemOps>,
    /// Answers for conflict prompts.
    pub prompt: Arc<dyn Prompt>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("config", &self.config)
            .field("log", &"<dyn Log>")
            .field("dry_run", &self.dry_run)
            .field("executor", &self.executor)
            .field("fs_ops", &self.fs_ops)
            .field("prompt", &"<dyn Prompt>")
            .finish()
    }
}

impl Context {
    /// Creates a new context for task execution.
    ///
    /// The filesystem capability is fixed here: [`DryRunFileSystemOps`] when
    /// `dry_run` is set, [`SystemFileSystemOps`] otherwise.
    #[must_use]
    pub fn new(
        config: Arc<Config>,
        log: Arc<dyn Log>,
        dry_run: bool,
        executor: Arc<dyn Executor>,
        prompt: Arc<dyn Prompt>,
    ) -> Self {
        let fs_ops: Arc<dyn FileSystemOps> = if dry_run {
            Arc::new(DryRunFileSystemOps)
        } else {
            Arc::new(SystemFileSystemOps)
        };
        Self {
            config,
            log,
            dry_run,
            executor,
            fs_ops,
            prompt,
        }
    }

    /// Source root.
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.config.source
    }

    /// Target root.
    #[must_use]
    pub fn target(&self) -> &Path {
        &self.config.target
    }

    /// Backup store below the target root.
    #[must_use]
    pub fn backup_store(&self) -> BackupStore {
        BackupStore::new(self.config.backup_root())
    }

    /// Create a copy of this context with a different [`FileSystemOps`] implementation.
    #[cfg(test)]
    #[must_use]
    pub fn with_fs_ops(mut self, fs_ops: Arc<dyn FileSystemOps>) -> Self {
        self.fs_ops = fs_ops;
        self
    }
}

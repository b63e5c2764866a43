//! Top-level subcommand orchestration.
pub mod container;
pub mod install;
pub mod uninstall;
pub mod version;

use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cli::GlobalOpts;
use crate::config::validation::{validate_config_file, validate_target_root};
use crate::config::{CONFIG_FILE_NAME, Config, ConfigFile};
use crate::error::TildeError;
use crate::exec::Executor;
use crate::inventory::Inventory;
use crate::logging::{Log, Logger};
use crate::prompt::Prompt;
use crate::tasks::{self, Context, Task};

/// Environment variable naming the source root.
pub const ROOT_ENV: &str = "TILDE_ROOT";

/// Shared state produced by the common command setup sequence.
///
/// Resolves both roots, loads `tilde.toml`, scans the source tree and
/// validates the target. Every fatal check happens here, before any task
/// runs, and the scan comes first so a missing source never leaves a newly
/// created target behind.
#[derive(Debug)]
pub struct CommandSetup {
    /// Resolved configuration.
    pub config: Arc<Config>,
    /// Files to link.
    pub inventory: Arc<Inventory>,
}

impl CommandSetup {
    /// Resolve roots from the global options, then run [`init_with`](Self::init_with).
    ///
    /// # Errors
    ///
    /// Returns an error if a root cannot be determined or setup fails.
    pub fn init(global: &GlobalOpts, log: &Logger) -> Result<Self> {
        let source = resolve_source(global)?;
        let target = resolve_target(global)?;
        Self::init_with(source, &target, global.dry_run, log, |_| {})
    }

    /// Load configuration, scan the source and validate the target, with a
    /// hook to adjust the parsed config file before it is resolved.
    ///
    /// # Errors
    ///
    /// Returns an error if `tilde.toml` is malformed, the source tree cannot
    /// be read, or the target is unusable.
    pub fn init_with(
        source: PathBuf,
        target: &Path,
        dry_run: bool,
        log: &Logger,
        adjust: impl FnOnce(&mut ConfigFile),
    ) -> Result<Self> {
        log.stage("Loading configuration");
        log.debug(&format!("source: {}", source.display()));
        let mut file = ConfigFile::load(&source).map_err(TildeError::from)?;
        let warnings = validate_config_file(&file);
        if !warnings.is_empty() {
            log.warn(&format!(
                "found {} configuration warning(s):",
                warnings.len()
            ));
            for warning in &warnings {
                log.warn(&format!("  {warning}"));
            }
        }
        adjust(&mut file);

        let mut config = Config::resolve(source, target.to_path_buf(), file);

        log.stage("Scanning source");
        let inventory =
            Inventory::scan(&config.source, &config.ignore).map_err(TildeError::from)?;
        log.info(&format!(
            "{} file(s) in {}",
            inventory.len(),
            config.source.display()
        ));
        log.debug(&format!("ignoring: {}", config.ignore.patterns().join(", ")));

        log.stage("Validating target");
        config.target = validate_target_root(target, dry_run).map_err(TildeError::from)?;
        log.info(&format!("target: {}", config.target.display()));

        Ok(Self {
            config: Arc::new(config),
            inventory: Arc::new(inventory),
        })
    }
}

/// Owns a task [`Context`] and runs tasks to completion.
#[derive(Debug)]
pub struct CommandRunner {
    ctx: Context,
    log: Arc<Logger>,
}

impl CommandRunner {
    /// Create a runner with an explicit executor.
    #[must_use]
    pub fn with_executor(
        setup: &CommandSetup,
        log: &Arc<Logger>,
        dry_run: bool,
        prompt: Arc<dyn Prompt>,
        executor: Arc<dyn Executor>,
    ) -> Self {
        let ctx = Context::new(
            Arc::clone(&setup.config),
            Arc::clone(log) as Arc<dyn Log>,
            dry_run,
            executor,
            prompt,
        );
        Self {
            ctx,
            log: Arc::clone(log),
        }
    }

    /// Task context shared by every task.
    #[must_use]
    pub const fn context(&self) -> &Context {
        &self.ctx
    }

    /// Execute every task in order, print the summary, and bail if any task
    /// failed.
    ///
    /// # Errors
    ///
    /// Returns an error if one or more tasks recorded a failure.
    pub fn run<'a>(&self, tasks: impl IntoIterator<Item = &'a dyn Task>) -> Result<()> {
        for task in tasks {
            tasks::execute(task, &self.ctx);
        }

        self.log.print_summary();

        let count = self.log.failure_count();
        if count > 0 {
            anyhow::bail!("{count} task(s) failed");
        }
        Ok(())
    }
}

/// Resolve the source root from `--source`, `$TILDE_ROOT`, the binary's
/// repository, or the current directory, in that order.
///
/// # Errors
///
/// Returns an error if the current directory cannot be read.
pub fn resolve_source(global: &GlobalOpts) -> Result<PathBuf> {
    if let Some(ref source) = global.source {
        return Ok(source.clone());
    }

    if let Some(root) = std::env::var_os(ROOT_ENV).filter(|r| !r.is_empty()) {
        return Ok(PathBuf::from(root));
    }

    if let Ok(exe) = std::env::current_exe()
        && let Some(parent) = exe.parent()
    {
        let candidates = [
            parent.join("../../.."), // cli/target/release/ → repo root
            parent.join(".."),       // bin/ → repo root
        ];
        for candidate in &candidates {
            if candidate.join(CONFIG_FILE_NAME).is_file() {
                return Ok(dunce::canonicalize(candidate)?);
            }
        }
    }

    std::env::current_dir().context("cannot determine the source directory; use --source")
}

/// Resolve the target root from `--target`, else the home directory.
///
/// # Errors
///
/// Returns an error if no target was given and the home directory is unknown.
pub fn resolve_target(global: &GlobalOpts) -> Result<PathBuf> {
    if let Some(ref target) = global.target {
        return Ok(target.clone());
    }
    home_dir().ok_or_else(|| {
        anyhow::anyhow!("cannot determine the home directory; use --target")
    })
}

/// The user's home directory from `HOME` (or `USERPROFILE` on Windows).
#[must_use]
pub fn home_dir() -> Option<PathBuf> {
    let vars: &[&str] = if cfg!(target_os = "windows") {
        &["USERPROFILE", "HOME"]
    } else {
        &["HOME"]
    };
    vars.iter()
        .filter_map(std::env::var_os)
        .find(|v| !v.is_empty())
        .map(PathBuf::from)
}

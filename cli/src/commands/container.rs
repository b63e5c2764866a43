//! Container command implementation: build the image, then run it with the
//! requested directories mounted and attach an editor or shell.
use anyhow::{Context as _, Result, bail};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{home_dir, resolve_source};
use crate::cli::{ContainerBuildOpts, ContainerRunOpts, GlobalOpts};
use crate::config::{ConfigFile, ContainerSettings};
use crate::config::validation::validate_config_file;
use crate::container::{
    self, Attach, RunPlan, attach_args, build_args, config_mount, env_files,
    forwarded_env, host_config_dir, image_query_args, plugin_init_args, remove_args, run_args,
    split_paths, start_dir, work_mounts,
};
use crate::error::{ContainerError, TildeError};
use crate::exec::{Executor, SystemExecutor};
use crate::logging::Logger;

/// Host state that `container run` reads.
#[derive(Debug, Clone, Default)]
pub struct HostEnv {
    /// Directory relative paths are resolved against.
    pub cwd: PathBuf,
    /// Environment variables considered for forwarding.
    pub vars: Vec<(String, String)>,
    /// `$XDG_CONFIG_HOME`, if set.
    pub config_home: Option<PathBuf>,
    /// The user's home directory, if known.
    pub home: Option<PathBuf>,
}

impl HostEnv {
    /// Snapshot the current process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the current directory cannot be read.
    pub fn current() -> Result<Self> {
        Ok(Self {
            cwd: std::env::current_dir().context("cannot read the current directory")?,
            vars: std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
            config_home: std::env::var_os("XDG_CONFIG_HOME")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            home: home_dir(),
        })
    }
}

/// Run `container build`.
///
/// # Errors
///
/// Returns an error if the source has no `Dockerfile` or the build fails.
pub fn build(global: &GlobalOpts, opts: &ContainerBuildOpts, log: &Arc<Logger>) -> Result<()> {
    build_with(global, opts, log, &SystemExecutor)
}

/// Run `container build` with an explicit executor.
///
/// # Errors
///
/// Same as [`build`].
pub fn build_with(
    global: &GlobalOpts,
    opts: &ContainerBuildOpts,
    log: &Logger,
    executor: &dyn Executor,
) -> Result<()> {
    let source = resolve_source(global)?;
    let settings = load_settings(&source, log)?;
    let runtime = Runtime {
        settings: &settings,
        executor,
        log,
        dry_run: global.dry_run,
    };
    runtime.build_image(&source, !opts.no_plugins)
}

/// Run `container run`.
///
/// # Errors
///
/// Returns an error if a path is not a directory, an env file is missing,
/// or the container cannot be started.
pub fn run(global: &GlobalOpts, opts: &ContainerRunOpts, log: &Arc<Logger>) -> Result<()> {
    run_with(global, opts, log, &SystemExecutor, &HostEnv::current()?)
}

/// Run `container run` against an explicit executor and host snapshot.
///
/// Every argument is resolved before the runtime is first called.
///
/// # Errors
///
/// Same as [`run`].
pub fn run_with(
    global: &GlobalOpts,
    opts: &ContainerRunOpts,
    log: &Logger,
    executor: &dyn Executor,
    host: &HostEnv,
) -> Result<()> {
    let source = resolve_source(global)?;
    let settings = load_settings(&source, log)?;

    log.stage("Preparing container");
    let (dirs, file) = split_paths(&opts.paths, !opts.shell, &host.cwd);
    let (plan, start) = plan_run(&settings, opts, host, &dirs)?;
    for mount in &plan.mounts {
        log.info(&format!("mount {}", mount.volume()));
    }
    log.debug(&format!("{} environment variable(s)", plan.env.len()));

    let runtime = Runtime {
        settings: &settings,
        executor,
        log,
        dry_run: global.dry_run,
    };
    runtime.ensure_available()?;
    runtime.ensure_image(&source)?;

    log.stage("Starting container");
    runtime.best_effort(&remove_args(&settings));
    runtime.checked(&run_args(&settings, &plan))?;

    log.stage("Installing plugins");
    runtime.best_effort(&plugin_init_args(&settings));

    let attach = if opts.shell {
        Attach::Shell
    } else {
        Attach::Editor { file }
    };
    log.stage("Attaching");
    runtime.interactive(&attach_args(&settings, &attach, &start));
    Ok(())
}

/// Resolve mounts and environment for `container run`.
fn plan_run(
    settings: &ContainerSettings,
    opts: &ContainerRunOpts,
    host: &HostEnv,
    dirs: &[PathBuf],
) -> Result<(RunPlan, String), ContainerError> {
    let work = work_mounts(dirs)?;
    let start = start_dir(&work);
    let files = env_files(&opts.env_files, &work, opts.auto_env, &host.cwd)?;

    let mut mounts = work;
    if !opts.no_config_mount
        && let Some(dir) = host_config_dir(
            opts.config_path.as_deref(),
            host.config_home.as_deref(),
            host.home.as_deref(),
        )
        && let Some(mount) = config_mount(settings, &dir)
    {
        mounts.push(mount);
    }

    let mut env = if opts.no_env_all {
        Vec::new()
    } else {
        forwarded_env(host.vars.iter().cloned(), &opts.env_exclude)
    };
    env.extend(opts.env.iter().cloned());

    Ok((
        RunPlan {
            mounts,
            env,
            env_files: files,
        },
        start,
    ))
}

fn load_settings(source: &Path, log: &Logger) -> Result<ContainerSettings> {
    let file = ConfigFile::load(source).map_err(TildeError::from)?;
    for warning in validate_config_file(&file) {
        log.warn(&warning.to_string());
    }
    Ok(file.container)
}

/// Render runtime arguments for logs, showing only the names of `-e` values.
fn display_args(args: &[String]) -> String {
    let mut out = Vec::with_capacity(args.len());
    let mut after_env = false;
    for arg in args {
        if after_env {
            out.push(arg.split_once('=').map_or(arg.as_str(), |(key, _)| key).to_string());
        } else if arg.contains(char::is_whitespace) {
            out.push(container::shell_quote(arg));
        } else {
            out.push(arg.clone());
        }
        after_env = arg == "-e";
    }
    out.join(" ")
}

/// Invokes the container runtime, or logs the invocation in dry-run.
struct Runtime<'a> {
    settings: &'a ContainerSettings,
    executor: &'a dyn Executor,
    log: &'a Logger,
    dry_run: bool,
}

impl Runtime<'_> {
    fn program(&self) -> &str {
        &self.settings.runtime
    }

    fn describe(&self, args: &[String]) -> String {
        format!("{} {}", self.program(), display_args(args))
    }

    fn ensure_available(&self) -> Result<()> {
        if self.executor.which(self.program()) {
            return Ok(());
        }
        if self.dry_run {
            self.log
                .warn(&format!("{} not found on PATH", self.program()));
            return Ok(());
        }
        bail!("{} not found on PATH", self.program())
    }

    fn build_image(&self, context: &Path, plugins: bool) -> Result<()> {
        if !context.join("Dockerfile").is_file() {
            return Err(ContainerError::MissingDockerfile(context.to_path_buf()).into());
        }
        self.ensure_available()?;
        self.log
            .stage(&format!("Building image {}", self.settings.image));
        let args = build_args(self.settings, context, plugins);
        if self.dry_run {
            self.log
                .dry_run(&format!("would run: {}", self.describe(&args)));
            return Ok(());
        }
        let result = self
            .executor
            .run_interactive(self.program(), &as_strs(&args))?;
        if !result.success {
            bail!(
                "image build failed (exit {})",
                result.code.unwrap_or(-1)
            );
        }
        Ok(())
    }

    fn ensure_image(&self, context: &Path) -> Result<()> {
        if self.dry_run {
            self.log.dry_run(&format!(
                "would build {} if the image is missing",
                self.settings.image
            ));
            return Ok(());
        }
        let found = self
            .executor
            .run(self.program(), &as_strs(&image_query_args(self.settings)))?;
        if found.stdout.trim().is_empty() {
            self.log
                .info(&format!("image {} not found", self.settings.image));
            self.build_image(context, true)?;
        }
        Ok(())
    }

    fn checked(&self, args: &[String]) -> Result<()> {
        if self.dry_run {
            self.log
                .dry_run(&format!("would run: {}", self.describe(args)));
            return Ok(());
        }
        let result = self.executor.run(self.program(), &as_strs(args))?;
        self.log.debug(result.stdout.trim());
        Ok(())
    }

    fn best_effort(&self, args: &[String]) {
        if self.dry_run {
            self.log
                .dry_run(&format!("would run: {}", self.describe(args)));
            return;
        }
        match self.executor.run_unchecked(self.program(), &as_strs(args)) {
            Ok(result) if !result.success => self
                .log
                .debug(&format!("{} exited with {:?}", self.describe(args), result.code)),
            Ok(_) => {}
            Err(e) => self.log.warn(&format!("{e:#}")),
        }
    }

    fn interactive(&self, args: &[String]) {
        if self.dry_run {
            self.log
                .dry_run(&format!("would run: {}", self.describe(args)));
            return;
        }
        match self.executor.run_interactive(self.program(), &as_strs(args)) {
            Ok(result) => self
                .log
                .debug(&format!("session ended with {:?}", result.code)),
            Err(e) => self.log.warn(&format!("{e:#}")),
        }
    }
}

fn as_strs(args: &[String]) -> Vec<&str> {
    args.iter().map(String::as_str).collect()
}

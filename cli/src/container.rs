//! Argument builders for the development container.
//!
//! Everything here is pure apart from path checks: mounts and env files are
//! resolved against the filesystem, and the resulting argument vectors are
//! handed to an [`Executor`](crate::exec::Executor) by the `container`
//! command.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::ContainerSettings;
use crate::error::ContainerError;

/// Host variables that are never forwarded into the container.
pub const ENV_DENY_LIST: &[&str] = &["PATH", "PWD", "OLDPWD", "SHLVL", "_", "HOME"];

/// Directory inside the container under which host directories are mounted.
pub const WORK_DIR: &str = "/work";

/// A bind mount from the host into the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    /// Canonical host directory.
    pub host: PathBuf,
    /// Absolute path inside the container.
    pub container: String,
}

impl Mount {
    /// Mount `dir` at `/work/<basename>`.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::NotADirectory`] if `dir` does not name an
    /// existing directory.
    pub fn work(dir: &Path) -> Result<Self, ContainerError> {
        let host = existing_dir(dir)?;
        let name = host
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            host,
            container: format!("{WORK_DIR}/{name}"),
        })
    }

    /// Mount `dir` at an explicit container path.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::NotADirectory`] if `dir` does not name an
    /// existing directory.
    pub fn at(dir: &Path, container: impl Into<String>) -> Result<Self, ContainerError> {
        Ok(Self {
            host: existing_dir(dir)?,
            container: container.into(),
        })
    }

    /// The `host:container` value passed to `-v`.
    #[must_use]
    pub fn volume(&self) -> String {
        format!("{}:{}", self.host.display(), self.container)
    }
}

fn existing_dir(dir: &Path) -> Result<PathBuf, ContainerError> {
    match dunce::canonicalize(dir) {
        Ok(path) if path.is_dir() => Ok(path),
        _ => Err(ContainerError::NotADirectory(dir.to_path_buf())),
    }
}

/// What to attach to once the container is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attach {
    /// Open `vim`, optionally on a file.
    Editor {
        /// File to open, relative to the start directory.
        file: Option<String>,
    },
    /// Open an interactive shell.
    Shell,
}

/// Split positional arguments into directories to mount and an optional
/// file for the editor.
///
/// With the editor requested, a last argument that is not a directory is
/// the file to open. Relative paths are resolved against `cwd`. With no
/// directory left, `cwd` itself is mounted.
#[must_use]
pub fn split_paths(args: &[String], editor: bool, cwd: &Path) -> (Vec<PathBuf>, Option<String>) {
    let mut dirs = Vec::new();
    let mut file = None;
    for (i, arg) in args.iter().enumerate() {
        let path = cwd.join(arg);
        if editor && i + 1 == args.len() && !path.is_dir() {
            file = Some(arg.clone());
            break;
        }
        dirs.push(path);
    }
    if dirs.is_empty() {
        dirs.push(cwd.to_path_buf());
    }
    (dirs, file)
}

/// Resolve every directory into a `/work` mount.
///
/// # Errors
///
/// Returns the first [`ContainerError::NotADirectory`].
pub fn work_mounts(dirs: &[PathBuf]) -> Result<Vec<Mount>, ContainerError> {
    dirs.iter().map(|d| Mount::work(d)).collect()
}

/// Pick the host configuration directory to mount.
///
/// An explicit path wins, then `$XDG_CONFIG_HOME`, then `~/.config`.
#[must_use]
pub fn host_config_dir(
    explicit: Option<&Path>,
    xdg_config: Option<&Path>,
    home: Option<&Path>,
) -> Option<PathBuf> {
    explicit
        .or(xdg_config.filter(|p| !p.as_os_str().is_empty()))
        .map(Path::to_path_buf)
        .or_else(|| home.map(|h| h.join(".config")))
}

/// Mount for the host configuration directory, if it exists.
#[must_use]
pub fn config_mount(settings: &ContainerSettings, host_dir: &Path) -> Option<Mount> {
    Mount::at(host_dir, format!("{}/.config", settings.home.trim_end_matches('/'))).ok()
}

/// `KEY=VALUE` pairs for every host variable not on the deny-list or in
/// `exclude`, sorted by name.
#[must_use]
pub fn forwarded_env<I>(host: I, exclude: &[String]) -> Vec<String>
where
    I: IntoIterator<Item = (String, String)>,
{
    host.into_iter()
        .filter(|(key, _)| {
            !key.is_empty()
                && !ENV_DENY_LIST.contains(&key.as_str())
                && !exclude.iter().any(|e| e == key)
        })
        .collect::<BTreeMap<_, _>>()
        .into_iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect()
}

/// Resolve `--env-file` paths, followed by each mount's `.env` when
/// `auto_env` is set.
///
/// # Errors
///
/// Returns [`ContainerError::EnvFileNotFound`] if an explicit path is not a
/// file. Missing `.env` files are ignored.
pub fn env_files(
    explicit: &[PathBuf],
    mounts: &[Mount],
    auto_env: bool,
    cwd: &Path,
) -> Result<Vec<PathBuf>, ContainerError> {
    let mut files = Vec::with_capacity(explicit.len());
    for file in explicit {
        let path = cwd.join(file);
        if !path.is_file() {
            return Err(ContainerError::EnvFileNotFound(file.clone()));
        }
        files.push(path);
    }
    if auto_env {
        files.extend(
            mounts
                .iter()
                .map(|m| m.host.join(".env"))
                .filter(|p| p.is_file()),
        );
    }
    Ok(files)
}

/// Everything `container run` passes to the runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunPlan {
    /// Bind mounts, work directories first.
    pub mounts: Vec<Mount>,
    /// `-e` values: forwarded host variables, then explicit `--env` entries.
    pub env: Vec<String>,
    /// `--env-file` paths.
    pub env_files: Vec<PathBuf>,
}

/// `build -t <image> [--build-arg INSTALL_PLUGINS=1] <context>`
#[must_use]
pub fn build_args(settings: &ContainerSettings, context: &Path, plugins: bool) -> Vec<String> {
    let mut args = vec!["build".to_string(), "-t".to_string(), settings.image.clone()];
    if plugins {
        args.push("--build-arg".to_string());
        args.push("INSTALL_PLUGINS=1".to_string());
    }
    args.push(context.to_string_lossy().into_owned());
    args
}

/// `images -q <image>`; empty output means the image is missing.
#[must_use]
pub fn image_query_args(settings: &ContainerSettings) -> Vec<String> {
    vec!["images".to_string(), "-q".to_string(), settings.image.clone()]
}

/// `rm -f <name>`
#[must_use]
pub fn remove_args(settings: &ContainerSettings) -> Vec<String> {
    vec!["rm".to_string(), "-f".to_string(), settings.name.clone()]
}

/// `run --name <name> -d <mounts> <env> <image> sleep infinity`
#[must_use]
pub fn run_args(settings: &ContainerSettings, plan: &RunPlan) -> Vec<String> {
    let mut args = vec![
        "run".to_string(),
        "--name".to_string(),
        settings.name.clone(),
        "-d".to_string(),
    ];
    for mount in &plan.mounts {
        args.push("-v".to_string());
        args.push(mount.volume());
    }
    for env in &plan.env {
        args.push("-e".to_string());
        args.push(env.clone());
    }
    for file in &plan.env_files {
        args.push("--env-file".to_string());
        args.push(file.to_string_lossy().into_owned());
    }
    args.extend([
        settings.image.clone(),
        "sleep".to_string(),
        "infinity".to_string(),
    ]);
    args
}

/// Shell script that installs vim plugins on first start.
#[must_use]
pub fn plugin_init_script(home: &str) -> String {
    format!(
        r#"set -e
export HOME={home}
if [ ! -d "$HOME/.vim/plugged" ] || [ -z "$(ls -A "$HOME/.vim/plugged" 2>/dev/null)" ]; then
  echo 'Installing vim plugins (first run)...'
  vim -E -s -u "$HOME/.vimrc" +'PlugInstall --sync' +qall || true
fi"#,
        home = shell_quote(home)
    )
}

/// `exec <name> bash -lc <plugin init script>`
#[must_use]
pub fn plugin_init_args(settings: &ContainerSettings) -> Vec<String> {
    vec![
        "exec".to_string(),
        settings.name.clone(),
        "bash".to_string(),
        "-lc".to_string(),
        plugin_init_script(&settings.home),
    ]
}

/// Directory to start in: the single mount, or [`WORK_DIR`].
#[must_use]
pub fn start_dir(mounts: &[Mount]) -> String {
    match mounts {
        [only] => only.container.clone(),
        _ => WORK_DIR.to_string(),
    }
}

/// Interactive `exec` into the running container.
#[must_use]
pub fn attach_args(settings: &ContainerSettings, attach: &Attach, start_dir: &str) -> Vec<String> {
    let mut args = vec!["exec".to_string(), "-it".to_string()];
    match attach {
        Attach::Editor { file } => {
            let mut script = format!("cd {} && vim", shell_quote(start_dir));
            if let Some(file) = file {
                script.push(' ');
                script.push_str(&shell_quote(file));
            }
            args.extend([
                settings.name.clone(),
                "bash".to_string(),
                "-lc".to_string(),
                script,
            ]);
        }
        Attach::Shell => {
            args.extend([
                "-w".to_string(),
                start_dir.to_string(),
                settings.name.clone(),
                "bash".to_string(),
            ]);
        }
    }
    args
}

/// Quote `s` for `bash -c` when it contains anything beyond a safe set.
#[must_use]
pub fn shell_quote(s: &str) -> String {
    if s.is_empty() {
        return "''".to_string();
    }
    let safe = s
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "/._-+=:@,%".contains(c));
    if safe {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}

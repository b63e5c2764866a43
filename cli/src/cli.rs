use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Top-level CLI entry point for tilde.
#[derive(Parser, Debug)]
#[command(
    name = "tilde",
    about = "Symlink a dotfiles tree into your home directory",
    version
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Options shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Preview changes without applying
    #[arg(short = 'd', long, global = true)]
    pub dry_run: bool,

    /// Directory to install into (default: your home directory)
    #[arg(long, visible_alias = "prefix", global = true, value_name = "DIR")]
    pub target: Option<PathBuf>,

    /// Dotfiles source tree (default: $TILDE_ROOT, the binary's repository, or the current directory)
    #[arg(long, global = true, value_name = "DIR")]
    pub source: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Link the source tree into the target directory
    Install(InstallOpts),
    /// Remove links and restore backed up files
    Uninstall(UninstallOpts),
    /// Build or run the development container
    #[command(subcommand)]
    Container(ContainerCommand),
    /// Print shell completions to stdout
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
    /// Print version information
    Version,
}

/// How conflicting files are confirmed during install.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConflictMode {
    /// Ask once for all conflicts, then back them all up
    #[default]
    Batch,
    /// Ask for each conflicting file
    Interactive,
}

/// Options for the `install` subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct InstallOpts {
    /// How to confirm conflicting files
    #[arg(long, value_enum, default_value_t = ConflictMode::Batch)]
    pub conflicts: ConflictMode,

    /// Back up every conflicting file without asking
    #[arg(short, long)]
    pub yes: bool,

    /// Skip vim-plug and plugin installation
    #[arg(long)]
    pub no_plugins: bool,
}

/// Options for the `uninstall` subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct UninstallOpts {}

/// `container` subcommands.
#[derive(Subcommand, Debug)]
pub enum ContainerCommand {
    /// Build or update the container image from the source tree
    Build(ContainerBuildOpts),
    /// Start the container with the given directories mounted under /work
    Run(ContainerRunOpts),
}

/// Options for `container build`.
#[derive(Parser, Debug, Clone, Default)]
pub struct ContainerBuildOpts {
    /// Do not install vim plugins at image build time
    #[arg(long)]
    pub no_plugins: bool,
}

/// Options for `container run`.
#[derive(Parser, Debug, Clone, Default)]
pub struct ContainerRunOpts {
    /// Directories to mount; with the editor, a trailing file is opened
    #[arg(value_name = "PATH")]
    pub paths: Vec<String>,

    /// Open a shell instead of vim
    #[arg(long)]
    pub shell: bool,

    /// Pass an environment variable (repeatable)
    #[arg(long = "env", value_name = "KEY[=VALUE]")]
    pub env: Vec<String>,

    /// Load variables from an env file (repeatable)
    #[arg(long = "env-file", value_name = "PATH")]
    pub env_files: Vec<PathBuf>,

    /// Load the .env file of each mounted directory
    #[arg(long)]
    pub auto_env: bool,

    /// Do not forward host environment variables
    #[arg(long)]
    pub no_env_all: bool,

    /// Do not forward this host variable (repeatable)
    #[arg(long = "env-exclude", value_name = "KEY")]
    pub env_exclude: Vec<String>,

    /// Do not mount the host config directory
    #[arg(long)]
    pub no_config_mount: bool,

    /// Host config directory to mount (default: $XDG_CONFIG_HOME or ~/.config)
    #[arg(long, value_name = "DIR")]
    pub config_path: Option<PathBuf>,
}

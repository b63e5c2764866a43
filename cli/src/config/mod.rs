//! Configuration: the optional `tilde.toml` file and the resolved run settings.
pub mod ignore;
pub mod toml_loader;
pub mod validation;

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use ignore::IgnoreSet;

/// Name of the configuration file looked up at the source root.
pub const CONFIG_FILE_NAME: &str = "tilde.toml";

/// Default name of the backup directory below the target root.
pub const DEFAULT_BACKUP_DIR: &str = ".tilde-backup";

/// Default vim-plug download location.
pub const DEFAULT_PLUG_URL: &str =
    "https://raw.githubusercontent.com/junegunn/vim-plug/master/plug.vim";

/// Raw contents of `tilde.toml`, exactly as written by the user.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// Backup directory relative to the target root.
    pub backup_dir: Option<String>,
    /// Extra ignore patterns.
    pub ignore: Vec<String>,
    /// Use only `ignore` instead of appending it to the defaults.
    pub replace_default_ignore: bool,
    /// Editor plugin bootstrap settings.
    pub plugins: PluginSettings,
    /// Container environment settings.
    pub container: ContainerSettings,
}

impl ConfigFile {
    /// Load `<source>/tilde.toml`; a missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but is unreadable or malformed.
    pub fn load(source: &Path) -> Result<Self, ConfigError> {
        toml_loader::load_config(&source.join(CONFIG_FILE_NAME))
    }
}

/// vim-plug and plugin installation settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PluginSettings {
    /// Whether plugin tasks run at all.
    pub enabled: bool,
    /// URL of `plug.vim`.
    pub url: String,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            url: DEFAULT_PLUG_URL.to_string(),
        }
    }
}

/// Container runtime settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContainerSettings {
    /// Container CLI binary.
    pub runtime: String,
    /// Image tag.
    pub image: String,
    /// Container name.
    pub name: String,
    /// Home directory of the user inside the image.
    pub home: String,
}

impl Default for ContainerSettings {
    fn default() -> Self {
        Self {
            runtime: "docker".to_string(),
            image: "tilde".to_string(),
            name: "tilde".to_string(),
            home: "/home/node".to_string(),
        }
    }
}

/// Resolved settings for one run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Source root holding the files to link.
    pub source: PathBuf,
    /// Target root receiving the links.
    pub target: PathBuf,
    /// Backup directory relative to `target`.
    pub backup_dir: PathBuf,
    /// Paths excluded from the inventory.
    pub ignore: IgnoreSet,
    /// Editor plugin settings.
    pub plugins: PluginSettings,
    /// Container settings.
    pub container: ContainerSettings,
}

impl Config {
    /// Combine roots with a parsed config file.
    ///
    /// Invalid values are replaced by defaults here; report them to the user
    /// with [`validation::validate_config_file`]. The backup directory name is
    /// always added to the ignore set so a source tree that contains one is
    /// never linked into itself.
    #[must_use]
    pub fn resolve(source: PathBuf, target: PathBuf, file: ConfigFile) -> Self {
        let backup_dir = file
            .backup_dir
            .as_deref()
            .filter(|d| validation::is_valid_backup_dir(d))
            .unwrap_or(DEFAULT_BACKUP_DIR)
            .split(['/', '\\'])
            .filter(|part| !part.is_empty() && *part != ".")
            .collect::<Vec<_>>()
            .join("/");

        let mut ignore = if file.replace_default_ignore {
            IgnoreSet::new(Vec::<String>::new())
        } else {
            IgnoreSet::default()
        };
        ignore.extend(file.ignore);
        ignore.extend([backup_dir.as_str()]);

        Self {
            source,
            target,
            backup_dir: PathBuf::from(backup_dir),
            ignore,
            plugins: file.plugins,
            container: file.container,
        }
    }

    /// Absolute path of the backup store.
    #[must_use]
    pub fn backup_root(&self) -> PathBuf {
        self.target.join(&self.backup_dir)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
pub(crate) mod test_helpers {
    use super::*;

    /// Config with default settings for the given roots.
    pub fn config_for(source: &Path, target: &Path) -> Config {
        Config::resolve(
            source.to_path_buf(),
            target.to_path_buf(),
            ConfigFile::default(),
        )
    }

    /// Parse a config file body.
    pub fn parse(body: &str) -> ConfigFile {
        toml::from_str(body).expect("valid tilde.toml")
    }
}

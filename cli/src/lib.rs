//! tilde: symlink a dotfiles tree into a home directory.
//!
//! Every file under the source root is linked to the same relative path
//! under the target root. Existing files are classified first so that
//! identical copies are left alone, stale links are replaced, and real
//! conflicts are backed up (or skipped) before anything is overwritten.
//! Uninstall removes the links and restores the backups.
//!
//! The public API is organised into layers:
//!
//! - **[`config`]**: `tilde.toml`, the ignore set and target validation
//! - **[`inventory`]**: enumerate the source tree
//! - **[`resources`]**: classify one target and apply one link or backup
//! - **[`tasks`]**: named units of work over the whole inventory
//! - **[`commands`]**: top-level subcommand orchestration
//! - **[`container`]**: argument builders for the development container
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod container;
pub mod error;
pub mod exec;
pub mod inventory;
pub mod logging;
pub mod operations;
pub mod prompt;
pub mod resources;
pub mod tasks;

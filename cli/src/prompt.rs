//! User prompts for conflict handling.
use anyhow::{Context as _, Result};
use inquire::{Confirm, InquireError, Select};

use crate::resources::ConflictAction;

/// Source of answers for the conflict prompts.
///
/// Production uses [`InquirePrompt`]; `--yes` uses [`AssumeYesPrompt`];
/// tests script their answers.
#[cfg_attr(test, mockall::automock)]
pub trait Prompt: Send + Sync {
    /// Ask a yes/no question.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be read.
    fn confirm(&self, message: &str, default: bool) -> Result<bool>;

    /// Ask what to do with the conflicting file at `relative`.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be read.
    fn choose_conflict_action(&self, relative: &str) -> Result<ConflictAction>;
}

/// Terminal prompts via `inquire`.
///
/// Escape or Ctrl-C answers the safe way: decline, or skip the file.
#[derive(Debug, Default, Clone, Copy)]
pub struct InquirePrompt;

impl Prompt for InquirePrompt {
    fn confirm(&self, message: &str, default: bool) -> Result<bool> {
        match Confirm::new(message).with_default(default).prompt() {
            Ok(answer) => Ok(answer),
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(false),
            Err(e) => Err(e).context("failed to read confirmation"),
        }
    }

    fn choose_conflict_action(&self, relative: &str) -> Result<ConflictAction> {
        let options = vec![
            ConflictAction::Replace,
            ConflictAction::Backup,
            ConflictAction::Skip,
        ];
        let skip_index = options.len() - 1;
        match Select::new(&format!("{relative} already exists. What should happen?"), options)
            .with_starting_cursor(skip_index)
            .with_help_message("replace deletes the file; backup moves it aside")
            .prompt()
        {
            Ok(action) => Ok(action),
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => {
                Ok(ConflictAction::Skip)
            }
            Err(e) => Err(e).context("failed to read conflict action"),
        }
    }
}

/// Non-interactive answers for `--yes`: accept every confirmation and back up
/// every conflict.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeYesPrompt;

impl Prompt for AssumeYesPrompt {
    fn confirm(&self, _message: &str, _default: bool) -> Result<bool> {
        Ok(true)
    }

    fn choose_conflict_action(&self, _relative: &str) -> Result<ConflictAction> {
        Ok(ConflictAction::Backup)
    }
}

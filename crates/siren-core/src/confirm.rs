//! Confirmation of destructive reconciliation steps.
//!
//! Dropping a live index or altering a live table is never done silently;
//! the reconciler asks a [`ConfirmationSink`] first. Interactive processes
//! use [`StdinConfirmation`]; services and tests pick a policy sink.

use async_trait::async_trait;
use siren_commons::{Result, SirenError};
use tokio::task;

const POSSIBLE_YES: &[&str] = &["y", "yes", "yeah", "sure", "ok"];

/// Answers yes/no questions raised during schema reconciliation.
#[async_trait]
pub trait ConfirmationSink: Send + Sync {
    /// Returns `true` when the described action should be taken.
    async fn confirm(&self, prompt: &str) -> Result<bool>;
}

/// Prompts on stdin and accepts the usual spellings of yes.
pub struct StdinConfirmation;

#[async_trait]
impl ConfirmationSink for StdinConfirmation {
    async fn confirm(&self, prompt: &str) -> Result<bool> {
        let prompt = format!("{prompt} [y/n] ");
        let answer = task::spawn_blocking(move || {
            use std::io::{BufRead, Write};
            let mut stdout = std::io::stdout();
            stdout
                .write_all(prompt.as_bytes())
                .and_then(|()| stdout.flush())
                .map_err(|e| SirenError::config(format!("Failed to prompt: {e}")))?;
            let mut line = String::new();
            std::io::stdin()
                .lock()
                .read_line(&mut line)
                .map_err(|e| SirenError::config(format!("Failed to read answer: {e}")))?;
            Ok::<String, SirenError>(line)
        })
        .await
        .map_err(|e| SirenError::config(format!("Confirmation task failed: {e}")))??;
        Ok(POSSIBLE_YES.contains(&answer.trim().to_lowercase().as_str()))
    }
}

/// Approves everything. For migrations run from trusted tooling.
pub struct AlwaysYes;

#[async_trait]
impl ConfirmationSink for AlwaysYes {
    async fn confirm(&self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Declines everything, leaving the live schema untouched.
pub struct AlwaysNo;

#[async_trait]
impl ConfirmationSink for AlwaysNo {
    async fn confirm(&self, prompt: &str) -> Result<bool> {
        log::warn!("Declined schema change: {prompt}");
        Ok(false)
    }
}

/// Turns any confirmation request into an error. For services that must
/// never start against a drifted schema.
pub struct FailFast;

#[async_trait]
impl ConfirmationSink for FailFast {
    async fn confirm(&self, prompt: &str) -> Result<bool> {
        Err(SirenError::config(format!(
            "Schema change requires confirmation but none is allowed: {prompt}"
        )))
    }
}

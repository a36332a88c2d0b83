//! The seam to whatever produces revisions.
//!
//! The engine hands a [`ModelClient`] a fully rendered prompt and takes back
//! raw text. Protocol, provider and timeouts belong to the implementor; any
//! error it returns only costs the current unit.

use crate::error::ModelError;

/// Strategy object selected once per run and called once per submitted unit.
pub trait ModelClient: std::fmt::Debug {
    /// Sends `prompt` and returns the raw response text.
    ///
    /// # Errors
    ///
    /// Any failure (spawn, transport, timeout, unusable response). The
    /// engine records it as a warning and keeps the unit's original text.
    fn complete(&self, prompt: &str) -> Result<String, ModelError>;

    /// Short name used in log messages.
    fn name(&self) -> &str {
        "model"
    }
}

impl<M: ModelClient + ?Sized> ModelClient for Box<M> {
    fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        (**self).complete(prompt)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Answers every prompt with the no-change sentinel.
///
/// Useful for dry runs: every unit is segmented and shielded, nothing is
/// proposed and nothing is written.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoChangeModel;

impl ModelClient for NoChangeModel {
    fn complete(&self, _prompt: &str) -> Result<String, ModelError> {
        Ok(crate::prompt::NO_CHANGE_SENTINEL.to_string())
    }

    fn name(&self) -> &str {
        "no-change"
    }
}

//! Script source lookup results.

use serde::{Deserialize, Serialize};

/// Outcome of a provider lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
  /// Script text was found.
  Found,
  /// No script exists for the method. Recoverable through a default body.
  NotFound,
  /// The lookup itself failed (I/O, permissions, ...).
  Failure,
}

/// Script text for one call, as returned by a provider.
///
/// Never cached: the text may change between calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptSource {
  text: Option<String>,
  status: SourceStatus,
  error: Option<String>,
}

impl ScriptSource {
  pub fn found(text: impl Into<String>) -> Self {
    Self {
      text: Some(text.into()),
      status: SourceStatus::Found,
      error: None,
    }
  }

  pub fn not_found() -> Self {
    Self {
      text: None,
      status: SourceStatus::NotFound,
      error: None,
    }
  }

  /// Not found, with a note on where the provider looked.
  pub fn not_found_because(reason: impl Into<String>) -> Self {
    Self {
      text: None,
      status: SourceStatus::NotFound,
      error: Some(reason.into()),
    }
  }

  pub fn failure(message: impl Into<String>) -> Self {
    Self {
      text: None,
      status: SourceStatus::Failure,
      error: Some(message.into()),
    }
  }

  pub fn status(&self) -> SourceStatus {
    self.status
  }

  pub fn text(&self) -> Option<&str> {
    self.text.as_deref()
  }

  pub fn error(&self) -> Option<&str> {
    self.error.as_deref()
  }

  pub fn into_text(self) -> Option<String> {
    self.text
  }
}

use serde::{Deserialize, Serialize};

/// Provider name used when a [`ScriptMarker`] does not name one.
pub const DEFAULT_PROVIDER: &str = "fs-provider";

/// Evaluator name used when a [`ScriptMarker`] does not name one.
pub const DEFAULT_EVALUATOR: &str = "lua-evaluator";

/// Marker kind recorded for methods configured by a direct [`ScriptMarker`].
pub const SCRIPT_MARKER_KIND: &str = "script";

/// The built-in scripted-method marker.
///
/// Applied directly to a method, or used as the meta-marker of a
/// [`Marker::Composed`] alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptMarker {
  /// Registry name of the script provider.
  #[serde(default = "default_provider")]
  pub provider: String,
  /// Registry name of the script evaluator.
  #[serde(default = "default_evaluator")]
  pub evaluator: String,
  /// Timeout in milliseconds. Absent or non-positive means unbounded.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub timeout_ms: Option<i64>,
  /// Free-form description, used when documenting scripted extensions.
  #[serde(default)]
  pub description: String,
}

impl ScriptMarker {
  pub fn new(provider: impl Into<String>, evaluator: impl Into<String>) -> Self {
    Self {
      provider: provider.into(),
      evaluator: evaluator.into(),
      timeout_ms: None,
      description: String::new(),
    }
  }

  pub fn with_timeout(mut self, timeout_ms: i64) -> Self {
    self.timeout_ms = Some(timeout_ms);
    self
  }

  pub fn with_description(mut self, description: impl Into<String>) -> Self {
    self.description = description.into();
    self
  }
}

impl Default for ScriptMarker {
  fn default() -> Self {
    Self::new(DEFAULT_PROVIDER, DEFAULT_EVALUATOR)
  }
}

fn default_provider() -> String {
  DEFAULT_PROVIDER.to_string()
}

fn default_evaluator() -> String {
  DEFAULT_EVALUATOR.to_string()
}

/// A marker attached to a method declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Marker {
  /// The built-in script marker, applied directly.
  Script(ScriptMarker),

  /// A named alias that is itself marked with a [`ScriptMarker`].
  Composed {
    kind: String,
    /// Timeout declared on the method through the alias.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timeout_ms: Option<i64>,
    /// The meta-level script marker carried by the alias.
    #[serde(default)]
    meta: ScriptMarker,
  },

  /// A named script marker configured through the external mapping.
  Custom {
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timeout_ms: Option<i64>,
  },
}

impl Marker {
  pub fn composed(kind: impl Into<String>, meta: ScriptMarker) -> Self {
    Marker::Composed {
      kind: kind.into(),
      timeout_ms: None,
      meta,
    }
  }

  pub fn custom(kind: impl Into<String>) -> Self {
    Marker::Custom {
      kind: kind.into(),
      timeout_ms: None,
    }
  }

  /// Set the timeout declared on the method for this marker.
  pub fn with_timeout(self, timeout: i64) -> Self {
    match self {
      Marker::Script(marker) => Marker::Script(marker.with_timeout(timeout)),
      Marker::Composed { kind, meta, .. } => Marker::Composed {
        kind,
        timeout_ms: Some(timeout),
        meta,
      },
      Marker::Custom { kind, .. } => Marker::Custom {
        kind,
        timeout_ms: Some(timeout),
      },
    }
  }

  /// The marker kind name.
  pub fn kind(&self) -> &str {
    match self {
      Marker::Script(_) => SCRIPT_MARKER_KIND,
      Marker::Composed { kind, .. } | Marker::Custom { kind, .. } => kind,
    }
  }

  /// Timeout declared at the method, as opposed to a meta or mapping default.
  pub fn declared_timeout(&self) -> Option<i64> {
    match self {
      Marker::Script(marker) => marker.timeout_ms,
      Marker::Composed { timeout_ms, .. } | Marker::Custom { timeout_ms, .. } => *timeout_ms,
    }
  }
}

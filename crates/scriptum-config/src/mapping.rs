use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Default configuration registered for a custom marker kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerMapping {
  /// Marker kind this mapping applies to.
  pub kind: String,
  /// Registry name of the script provider.
  pub provider: String,
  /// Registry name of the script evaluator.
  pub evaluator: String,
  /// Default timeout in milliseconds.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub timeout_ms: Option<i64>,
  #[serde(default)]
  pub description: String,
}

impl MarkerMapping {
  pub fn new(
    kind: impl Into<String>,
    provider: impl Into<String>,
    evaluator: impl Into<String>,
  ) -> Self {
    Self {
      kind: kind.into(),
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
}

/// Externally registered marker kind → default config table.
#[derive(Debug, Clone, Default)]
pub struct MarkerMappings {
  entries: HashMap<String, MarkerMapping>,
}

impl MarkerMappings {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a mapping, returning the one it replaced.
  pub fn insert(&mut self, mapping: MarkerMapping) -> Option<MarkerMapping> {
    self.entries.insert(mapping.kind.clone(), mapping)
  }

  pub fn get(&self, kind: &str) -> Option<&MarkerMapping> {
    self.entries.get(kind)
  }

  pub fn contains(&self, kind: &str) -> bool {
    self.entries.contains_key(kind)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

impl FromIterator<MarkerMapping> for MarkerMappings {
  fn from_iter<I: IntoIterator<Item = MarkerMapping>>(iter: I) -> Self {
    let mut mappings = Self::new();
    for mapping in iter {
      mappings.insert(mapping);
    }
    mappings
  }
}

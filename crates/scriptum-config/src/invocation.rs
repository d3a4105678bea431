use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Resolved configuration of one scripted method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationConfig {
  /// Kind of the marker the configuration was taken from.
  pub marker_kind: String,
  /// Registry name of the script provider.
  pub provider_name: String,
  /// Registry name of the script evaluator.
  pub evaluator_name: String,
  /// Time bound in milliseconds; `None` means unbounded.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub timeout_ms: Option<u64>,
  pub description: String,
}

impl InvocationConfig {
  pub fn timeout(&self) -> Option<Duration> {
    self.timeout_ms.map(Duration::from_millis)
  }
}

//! Script provider contract and an in-memory provider.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use scriptum_config::MethodDescriptor;
use tracing::trace;

use crate::source::ScriptSource;

/// Supplies script text for interface methods.
#[async_trait]
pub trait ScriptProvider: Send + Sync {
  /// Look up the script for `method`.
  ///
  /// Absence is reported as [`SourceStatus::NotFound`](crate::SourceStatus),
  /// any other problem as [`SourceStatus::Failure`](crate::SourceStatus).
  async fn get_script(&self, method: &MethodDescriptor) -> ScriptSource;

  /// Release resources held for an in-flight lookup.
  ///
  /// Only called on per-call instances. Best-effort.
  fn cancel(&self) {}
}

/// Provider serving scripts registered in memory, keyed by interface and
/// method name.
#[derive(Debug, Default)]
pub struct StaticScriptProvider {
  scripts: RwLock<HashMap<(String, String), String>>,
}

impl StaticScriptProvider {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_script(
    self,
    interface: impl Into<String>,
    method: impl Into<String>,
    text: impl Into<String>,
  ) -> Self {
    self.set_script(interface, method, text);
    self
  }

  /// Register or replace a script.
  pub fn set_script(
    &self,
    interface: impl Into<String>,
    method: impl Into<String>,
    text: impl Into<String>,
  ) {
    let mut scripts = self.scripts.write().unwrap_or_else(|e| e.into_inner());
    scripts.insert((interface.into(), method.into()), text.into());
  }

  /// Remove a script, returning its text.
  pub fn remove_script(&self, interface: &str, method: &str) -> Option<String> {
    let mut scripts = self.scripts.write().unwrap_or_else(|e| e.into_inner());
    scripts.remove(&(interface.to_string(), method.to_string()))
  }
}

#[async_trait]
impl ScriptProvider for StaticScriptProvider {
  async fn get_script(&self, method: &MethodDescriptor) -> ScriptSource {
    let scripts = self.scripts.read().unwrap_or_else(|e| e.into_inner());
    match scripts.get(&(method.interface.clone(), method.name.clone())) {
      Some(text) => {
        trace!(method = %method, text = %text, "script found");
        ScriptSource::found(text.clone())
      }
      None => ScriptSource::not_found(),
    }
  }
}

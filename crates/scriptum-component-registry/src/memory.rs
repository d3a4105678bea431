use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use scriptum_runtime::{ScriptEvaluator, ScriptProvider};
use tracing::debug;

use crate::error::RegistryError;
use crate::registry::{Component, ComponentRegistry, Scope};

enum Entry {
  Provider(Component<dyn ScriptProvider>),
  Evaluator(Component<dyn ScriptEvaluator>),
}

impl Entry {
  fn kind(&self) -> &'static str {
    match self {
      Entry::Provider(_) => "provider",
      Entry::Evaluator(_) => "evaluator",
    }
  }

  fn scope(&self) -> Scope {
    match self {
      Entry::Provider(c) => c.scope(),
      Entry::Evaluator(c) => c.scope(),
    }
  }
}

/// In-memory component registry.
///
/// Providers and evaluators share one namespace, so a name identifies
/// exactly one component.
#[derive(Default)]
pub struct MemoryComponentRegistry {
  entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryComponentRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn register_provider(
    &self,
    name: impl Into<String>,
    component: Component<dyn ScriptProvider>,
  ) -> Result<(), RegistryError> {
    self.insert(name.into(), Entry::Provider(component))
  }

  pub fn register_evaluator(
    &self,
    name: impl Into<String>,
    component: Component<dyn ScriptEvaluator>,
  ) -> Result<(), RegistryError> {
    self.insert(name.into(), Entry::Evaluator(component))
  }

  /// Register one provider instance shared by all calls.
  pub fn register_shared_provider<P>(
    &self,
    name: impl Into<String>,
    provider: Arc<P>,
  ) -> Result<(), RegistryError>
  where
    P: ScriptProvider + 'static,
  {
    let provider: Arc<dyn ScriptProvider> = provider;
    self.register_provider(name, Component::shared(provider))
  }

  /// Register a provider built fresh for every call.
  pub fn register_per_call_provider<P, F>(
    &self,
    name: impl Into<String>,
    factory: F,
  ) -> Result<(), RegistryError>
  where
    P: ScriptProvider + 'static,
    F: Fn() -> P + Send + Sync + 'static,
  {
    self.register_provider(
      name,
      Component::per_call(move || Arc::new(factory()) as Arc<dyn ScriptProvider>),
    )
  }

  /// Register one evaluator instance shared by all calls.
  pub fn register_shared_evaluator<E>(
    &self,
    name: impl Into<String>,
    evaluator: Arc<E>,
  ) -> Result<(), RegistryError>
  where
    E: ScriptEvaluator + 'static,
  {
    let evaluator: Arc<dyn ScriptEvaluator> = evaluator;
    self.register_evaluator(name, Component::shared(evaluator))
  }

  /// Register an evaluator built fresh for every call.
  pub fn register_per_call_evaluator<E, F>(
    &self,
    name: impl Into<String>,
    factory: F,
  ) -> Result<(), RegistryError>
  where
    E: ScriptEvaluator + 'static,
    F: Fn() -> E + Send + Sync + 'static,
  {
    self.register_evaluator(
      name,
      Component::per_call(move || Arc::new(factory()) as Arc<dyn ScriptEvaluator>),
    )
  }

  /// Remove a component, whatever its kind.
  pub fn remove(&self, name: &str) -> Result<(), RegistryError> {
    let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
    match entries.remove(name) {
      Some(_) => Ok(()),
      None => Err(RegistryError::NotFound {
        name: name.to_string(),
      }),
    }
  }

  /// Names of all registered components.
  pub fn names(&self) -> Vec<String> {
    let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
    let mut names: Vec<String> = entries.keys().cloned().collect();
    names.sort();
    names
  }

  fn insert(&self, name: String, entry: Entry) -> Result<(), RegistryError> {
    let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
    if entries.contains_key(&name) {
      return Err(RegistryError::AlreadyExists { name });
    }
    debug!(name = %name, kind = entry.kind(), scope = ?entry.scope(), "component registered");
    entries.insert(name, entry);
    Ok(())
  }
}

impl ComponentRegistry for MemoryComponentRegistry {
  fn resolve_provider(&self, name: &str) -> Result<Component<dyn ScriptProvider>, RegistryError> {
    let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
    match entries.get(name) {
      Some(Entry::Provider(component)) => Ok(component.clone()),
      Some(other) => Err(RegistryError::WrongKind {
        name: name.to_string(),
        expected: "provider",
        actual: other.kind(),
      }),
      None => Err(RegistryError::NotFound {
        name: name.to_string(),
      }),
    }
  }

  fn resolve_evaluator(
    &self,
    name: &str,
  ) -> Result<Component<dyn ScriptEvaluator>, RegistryError> {
    let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
    match entries.get(name) {
      Some(Entry::Evaluator(component)) => Ok(component.clone()),
      Some(other) => Err(RegistryError::WrongKind {
        name: name.to_string(),
        expected: "evaluator",
        actual: other.kind(),
      }),
      None => Err(RegistryError::NotFound {
        name: name.to_string(),
      }),
    }
  }

  fn is_per_call_scoped(&self, name: &str) -> bool {
    let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
    entries
      .get(name)
      .map(|entry| entry.scope() == Scope::PerCall)
      .unwrap_or(false)
  }
}

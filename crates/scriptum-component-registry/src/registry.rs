use std::fmt;
use std::sync::Arc;

use scriptum_runtime::{ScriptEvaluator, ScriptProvider};

use crate::error::RegistryError;

/// Lifetime of the instances a registered component hands out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
  /// One long-lived instance shared by every call.
  Shared,
  /// A fresh instance for every call.
  PerCall,
}

/// A registered component: one shared instance or a per-call factory.
pub enum Component<T: ?Sized> {
  Shared(Arc<T>),
  PerCall(Arc<dyn Fn() -> Arc<T> + Send + Sync>),
}

impl<T: ?Sized> Component<T> {
  pub fn shared(instance: Arc<T>) -> Self {
    Component::Shared(instance)
  }

  pub fn per_call<F>(factory: F) -> Self
  where
    F: Fn() -> Arc<T> + Send + Sync + 'static,
  {
    Component::PerCall(Arc::new(factory))
  }

  /// The instance to use for one call.
  ///
  /// Shared components return the same instance every time; per-call
  /// components build a new one.
  pub fn instance(&self) -> Arc<T> {
    match self {
      Component::Shared(instance) => Arc::clone(instance),
      Component::PerCall(factory) => factory(),
    }
  }

  pub fn scope(&self) -> Scope {
    match self {
      Component::Shared(_) => Scope::Shared,
      Component::PerCall(_) => Scope::PerCall,
    }
  }
}

impl<T: ?Sized> Clone for Component<T> {
  fn clone(&self) -> Self {
    match self {
      Component::Shared(instance) => Component::Shared(Arc::clone(instance)),
      Component::PerCall(factory) => Component::PerCall(Arc::clone(factory)),
    }
  }
}

impl<T: ?Sized> fmt::Debug for Component<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("Component").field(&self.scope()).finish()
  }
}

/// Name-based lookup of script providers and evaluators.
pub trait ComponentRegistry: Send + Sync {
  /// Resolve a provider by name.
  fn resolve_provider(&self, name: &str) -> Result<Component<dyn ScriptProvider>, RegistryError>;

  /// Resolve an evaluator by name.
  fn resolve_evaluator(&self, name: &str)
  -> Result<Component<dyn ScriptEvaluator>, RegistryError>;

  /// Whether the named component hands out a fresh instance per call.
  ///
  /// Only per-call instances are ever cancelled by the engine.
  fn is_per_call_scoped(&self, name: &str) -> bool;
}

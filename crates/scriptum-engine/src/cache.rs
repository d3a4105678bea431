//! Invocation descriptor caching.
//!
//! A method's markers are resolved into an [`InvocationConfig`] and its
//! provider and evaluator are looked up in the registry once, on the first
//! call. The result is kept for the lifetime of the engine: there is no
//! automatic invalidation, and [`InvocationCache::clear`] exists for tests.
//!
//! Resolution failures are not cached; the next call tries again.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use scriptum_component_registry::{Component, ComponentRegistry};
use scriptum_config::{ConfigResolver, InvocationConfig, Marker, MethodDescriptor};
use scriptum_runtime::{ScriptEvaluator, ScriptProvider};
use tokio::sync::OnceCell;
use tracing::debug;

use crate::error::DispatchError;

/// Everything needed to run one scripted method, resolved once.
#[derive(Debug)]
pub struct InvocationDescriptor {
  config: InvocationConfig,
  provider: Component<dyn ScriptProvider>,
  evaluator: Component<dyn ScriptEvaluator>,
  provider_per_call: bool,
  evaluator_per_call: bool,
}

impl InvocationDescriptor {
  pub fn config(&self) -> &InvocationConfig {
    &self.config
  }

  pub fn provider(&self) -> &Component<dyn ScriptProvider> {
    &self.provider
  }

  pub fn evaluator(&self) -> &Component<dyn ScriptEvaluator> {
    &self.evaluator
  }

  pub fn provider_per_call(&self) -> bool {
    self.provider_per_call
  }

  pub fn evaluator_per_call(&self) -> bool {
    self.evaluator_per_call
  }
}

type Slot = Arc<OnceCell<Arc<InvocationDescriptor>>>;

/// Compute-once cache of [`InvocationDescriptor`]s keyed by method.
///
/// Concurrent first calls for one method converge on a single resolution;
/// the losers wait for and share the winner's descriptor.
pub struct InvocationCache {
  resolver: ConfigResolver,
  registry: Arc<dyn ComponentRegistry>,
  slots: Mutex<HashMap<MethodDescriptor, Slot>>,
}

impl InvocationCache {
  pub fn new(resolver: ConfigResolver, registry: Arc<dyn ComponentRegistry>) -> Self {
    Self {
      resolver,
      registry,
      slots: Mutex::new(HashMap::new()),
    }
  }

  pub fn resolver(&self) -> &ConfigResolver {
    &self.resolver
  }

  /// Get the descriptor for a scripted method, resolving it on first use.
  pub async fn get_or_resolve(
    &self,
    descriptor: &MethodDescriptor,
    markers: &[Marker],
  ) -> Result<Arc<InvocationDescriptor>, DispatchError> {
    let slot = self.slot(descriptor);

    if let Some(resolved) = slot.get() {
      debug!(method = %descriptor, "invocation cache hit");
      return Ok(Arc::clone(resolved));
    }

    let resolved = slot
      .get_or_try_init(|| async { self.resolve(descriptor, markers).map(Arc::new) })
      .await?;
    Ok(Arc::clone(resolved))
  }

  /// Whether a descriptor has been resolved for this method.
  pub fn contains(&self, descriptor: &MethodDescriptor) -> bool {
    let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
    slots
      .get(descriptor)
      .map(|slot| slot.initialized())
      .unwrap_or(false)
  }

  /// Number of resolved descriptors.
  pub fn len(&self) -> usize {
    let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
    slots.values().filter(|slot| slot.initialized()).count()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Clear the cache.
  pub fn clear(&self) {
    let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
    slots.clear();
  }

  fn slot(&self, descriptor: &MethodDescriptor) -> Slot {
    let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
    Arc::clone(slots.entry(descriptor.clone()).or_default())
  }

  fn resolve(
    &self,
    descriptor: &MethodDescriptor,
    markers: &[Marker],
  ) -> Result<InvocationDescriptor, DispatchError> {
    debug!(method = %descriptor, "invocation cache miss");

    let configuration_error = |message: String| DispatchError::Configuration {
      method: descriptor.to_string(),
      message,
    };

    let config = self
      .resolver
      .resolve(descriptor, markers)
      .map_err(|e| configuration_error(e.to_string()))?
      .ok_or_else(|| configuration_error("method is not scripted".to_string()))?;

    let provider = self
      .registry
      .resolve_provider(&config.provider_name)
      .map_err(|e| configuration_error(e.to_string()))?;
    let evaluator = self
      .registry
      .resolve_evaluator(&config.evaluator_name)
      .map_err(|e| configuration_error(e.to_string()))?;

    let provider_per_call = self.registry.is_per_call_scoped(&config.provider_name);
    let evaluator_per_call = self.registry.is_per_call_scoped(&config.evaluator_name);

    debug!(
      method = %descriptor,
      provider = %config.provider_name,
      evaluator = %config.evaluator_name,
      provider_per_call,
      evaluator_per_call,
      "invocation descriptor resolved"
    );

    Ok(InvocationDescriptor {
      config,
      provider,
      evaluator,
      provider_per_call,
      evaluator_per_call,
    })
  }
}

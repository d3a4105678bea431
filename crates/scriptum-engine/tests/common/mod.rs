//! Shared fixtures for engine integration tests.
//!
//! The test evaluator understands a handful of commands instead of a real
//! language:
//!
//! - `add` returns the sum of the `x` and `y` bindings
//! - `sleep:<ms>` sleeps, stopping early once the call is cancelled
//! - `block:<ms>` sleeps and ignores cancellation
//! - `fail` raises an error
//! - anything else is returned as a string

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use scriptum_component_registry::{
  Component, ComponentRegistry, MemoryComponentRegistry, RegistryError,
};
use scriptum_config::{MarkerMapping, MarkerMappings, MethodDescriptor};
use scriptum_engine::{EngineConfig, ScriptEngine};
use scriptum_runtime::{
  EvalContext, ParameterBindings, ScriptError, ScriptEvaluator, ScriptProvider, ScriptSource,
  StaticScriptProvider,
};
use serde_json::{Value, json};

pub const SCRIPTS: &str = "scripts";
pub const FAILING: &str = "failing";
pub const SHARED_EVAL: &str = "shared-eval";
pub const PER_CALL_EVAL: &str = "per-call-eval";

/// Call counters shared by every fixture component.
#[derive(Default)]
pub struct Counters {
  pub get_script: AtomicUsize,
  pub evaluate: AtomicUsize,
  pub evaluator_cancel: AtomicUsize,
  pub provider_cancel: AtomicUsize,
  pub resolve_provider: AtomicUsize,
  pub resolve_evaluator: AtomicUsize,
}

impl Counters {
  pub fn get(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
  }
}

pub struct CountingProvider {
  inner: Arc<StaticScriptProvider>,
  counters: Arc<Counters>,
}

#[async_trait]
impl ScriptProvider for CountingProvider {
  async fn get_script(&self, method: &MethodDescriptor) -> ScriptSource {
    self.counters.get_script.fetch_add(1, Ordering::SeqCst);
    self.inner.get_script(method).await
  }

  fn cancel(&self) {
    self.counters.provider_cancel.fetch_add(1, Ordering::SeqCst);
  }
}

pub struct FailingProvider;

#[async_trait]
impl ScriptProvider for FailingProvider {
  async fn get_script(&self, _method: &MethodDescriptor) -> ScriptSource {
    ScriptSource::failure("permission denied on script store")
  }
}

pub struct TestEvaluator {
  counters: Arc<Counters>,
}

impl TestEvaluator {
  fn sleep(&self, ms: u64, ctx: &EvalContext, cooperative: bool) {
    let deadline = Instant::now() + Duration::from_millis(ms);
    while Instant::now() < deadline {
      if cooperative && ctx.cancel.is_cancelled() {
        return;
      }
      std::thread::sleep(Duration::from_millis(5));
    }
  }
}

impl ScriptEvaluator for TestEvaluator {
  fn evaluate(
    &self,
    source: &str,
    bindings: &ParameterBindings,
    ctx: &EvalContext,
  ) -> Result<Value, ScriptError> {
    self.counters.evaluate.fetch_add(1, Ordering::SeqCst);

    if source == "add" {
      let x = bindings.get("x").and_then(Value::as_i64).unwrap_or(0);
      let y = bindings.get("y").and_then(Value::as_i64).unwrap_or(0);
      return Ok(json!(x + y));
    }
    if source == "fail" {
      return Err(ScriptError::runtime("script failed on purpose"));
    }
    if let Some(ms) = source.strip_prefix("sleep:") {
      self.sleep(ms.parse().unwrap_or(0), ctx, true);
      if ctx.cancel.is_cancelled() {
        return Err(ScriptError::Cancelled);
      }
      return Ok(json!("slept"));
    }
    if let Some(ms) = source.strip_prefix("block:") {
      self.sleep(ms.parse().unwrap_or(0), ctx, false);
      return Ok(json!("blocked"));
    }
    Ok(json!(source))
  }

  fn cancel(&self) {
    self.counters.evaluator_cancel.fetch_add(1, Ordering::SeqCst);
  }
}

/// Registry wrapper counting lookups.
pub struct CountingRegistry {
  inner: MemoryComponentRegistry,
  counters: Arc<Counters>,
}

impl ComponentRegistry for CountingRegistry {
  fn resolve_provider(&self, name: &str) -> Result<Component<dyn ScriptProvider>, RegistryError> {
    self.counters.resolve_provider.fetch_add(1, Ordering::SeqCst);
    // Widen the race window for concurrent first calls.
    std::thread::sleep(Duration::from_millis(20));
    self.inner.resolve_provider(name)
  }

  fn resolve_evaluator(
    &self,
    name: &str,
  ) -> Result<Component<dyn ScriptEvaluator>, RegistryError> {
    self.counters.resolve_evaluator.fetch_add(1, Ordering::SeqCst);
    self.inner.resolve_evaluator(name)
  }

  fn is_per_call_scoped(&self, name: &str) -> bool {
    self.inner.is_per_call_scoped(name)
  }
}

pub struct Fixture {
  pub engine: Arc<ScriptEngine>,
  pub scripts: Arc<StaticScriptProvider>,
  pub counters: Arc<Counters>,
}

/// Marker kinds registered in the fixture's mapping:
///
/// - `TestScript`: scripts provider, shared evaluator
/// - `PerCallScript`: scripts provider, per-call evaluator
/// - `BrokenSource`: failing provider, shared evaluator
/// - `SlowByDefault`: like `TestScript` with a 10 s default timeout
/// - `MissingEvaluator`: names an evaluator that is not registered
pub fn fixture(max_workers: usize) -> Fixture {
  let counters = Arc::new(Counters::default());
  let scripts = Arc::new(StaticScriptProvider::new());

  let registry = MemoryComponentRegistry::new();
  registry
    .register_shared_provider(
      SCRIPTS,
      Arc::new(CountingProvider {
        inner: Arc::clone(&scripts),
        counters: Arc::clone(&counters),
      }),
    )
    .unwrap();
  registry
    .register_shared_provider(FAILING, Arc::new(FailingProvider))
    .unwrap();
  registry
    .register_shared_evaluator(
      SHARED_EVAL,
      Arc::new(TestEvaluator {
        counters: Arc::clone(&counters),
      }),
    )
    .unwrap();
  let factory_counters = Arc::clone(&counters);
  registry
    .register_per_call_evaluator(PER_CALL_EVAL, move || TestEvaluator {
      counters: Arc::clone(&factory_counters),
    })
    .unwrap();

  let mappings: MarkerMappings = [
    MarkerMapping::new("TestScript", SCRIPTS, SHARED_EVAL),
    MarkerMapping::new("PerCallScript", SCRIPTS, PER_CALL_EVAL),
    MarkerMapping::new("BrokenSource", FAILING, SHARED_EVAL),
    MarkerMapping::new("SlowByDefault", SCRIPTS, SHARED_EVAL).with_timeout(10_000),
    MarkerMapping::new("MissingEvaluator", SCRIPTS, "nowhere"),
  ]
  .into_iter()
  .collect();

  let registry = CountingRegistry {
    inner: registry,
    counters: Arc::clone(&counters),
  };

  let engine = ScriptEngine::with_mappings(
    EngineConfig { max_workers },
    mappings,
    Arc::new(registry),
  );

  Fixture {
    engine: Arc::new(engine),
    scripts,
    counters,
  }
}

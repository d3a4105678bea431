//! Script dispatch engine.
//!
//! The [`ScriptEngine`] is the main entry point. Given a [`Repository`] and a
//! method name it classifies the method, resolves (once) the invocation
//! descriptor, binds the arguments, and runs the unit of work (source lookup
//! plus evaluation) on the bounded worker pool under the method's timeout.

use std::sync::Arc;
use std::time::Duration;

use scriptum_component_registry::ComponentRegistry;
use scriptum_config::{
  ConfigResolver, InvocationConfig, MarkerMappings, MethodDescriptor, ReturnKind,
};
use scriptum_runtime::{
  EvalContext, ParameterBindings, ScriptError, ScriptEvaluator, ScriptProvider, SourceStatus,
};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::binder;
use crate::cache::{InvocationCache, InvocationDescriptor};
use crate::cancel::{CallScope, CancellationCoordinator};
use crate::error::{DispatchError, EvaluationError};
use crate::pool::WorkerPool;
use crate::repository::{DefaultBody, DefaultReceiver, MethodEntry, Repository};
use crate::result::{ExecutionResult, Outcome};

/// Configuration for the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
  /// Number of units of work that may run at once.
  pub max_workers: usize,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      max_workers: std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1),
    }
  }
}

/// How a unit of work failed.
///
/// Evaluation failures are subject to result wrapping; dispatch errors are
/// always returned as errors.
#[derive(Debug)]
enum UnitFailure {
  Dispatch(DispatchError),
  Evaluation(EvaluationError),
}

/// Dispatches repository method calls to scripts.
pub struct ScriptEngine {
  cache: InvocationCache,
  pool: WorkerPool,
  coordinator: CancellationCoordinator,
}

impl ScriptEngine {
  /// Create an engine resolving markers through `resolver` and components
  /// through `registry`.
  pub fn new(
    config: EngineConfig,
    resolver: ConfigResolver,
    registry: Arc<dyn ComponentRegistry>,
  ) -> Self {
    info!(max_workers = config.max_workers, "script engine created");
    Self {
      cache: InvocationCache::new(resolver, registry),
      pool: WorkerPool::new(config.max_workers),
      coordinator: CancellationCoordinator::new(),
    }
  }

  /// Create an engine with the standard resolver chain over `mappings`.
  pub fn with_mappings(
    config: EngineConfig,
    mappings: MarkerMappings,
    registry: Arc<dyn ComponentRegistry>,
  ) -> Self {
    Self::new(config, ConfigResolver::new(mappings), registry)
  }

  pub fn cache(&self) -> &InvocationCache {
    &self.cache
  }

  pub fn pool(&self) -> &WorkerPool {
    &self.pool
  }

  /// Bind this engine to one repository.
  pub fn handle(self: &Arc<Self>, repository: Repository) -> RepositoryHandle {
    RepositoryHandle {
      engine: Arc::clone(self),
      repository,
    }
  }

  /// Stop accepting work. Calls already running finish; later scripted
  /// calls fail with [`DispatchError::Rejected`].
  pub fn shutdown(&self) {
    info!("script engine shutting down");
    self.pool.close();
  }

  /// The configuration a method would be invoked with.
  ///
  /// `Ok(None)` for methods that are not scripted. Does not touch the
  /// registry or the cache.
  pub fn describe(
    &self,
    repository: &Repository,
    method: &str,
  ) -> Result<Option<InvocationConfig>, DispatchError> {
    let entry = lookup(repository, method)?;
    self
      .cache
      .resolver()
      .resolve(entry.descriptor(), &entry.def().markers)
      .map_err(|e| DispatchError::Configuration {
        method: entry.descriptor().to_string(),
        message: e.to_string(),
      })
  }

  /// Invoke `method` on `repository` with `args`.
  ///
  /// Returns [`Outcome::Wrapped`] for methods declared with a wrapped return
  /// kind and [`Outcome::Value`] otherwise.
  #[instrument(
    name = "script_invoke",
    skip(self, repository, args),
    fields(
      interface = %repository.name(),
      method = %method,
    )
  )]
  pub async fn invoke(
    &self,
    repository: &Repository,
    method: &str,
    args: Vec<Value>,
  ) -> Result<Outcome, DispatchError> {
    let entry = lookup(repository, method)?;

    info!(method = %entry.descriptor(), args = args.len(), "invoke_started");

    let result = self.dispatch(repository, &entry, args).await;

    match &result {
      Ok(Outcome::Wrapped(wrapped)) if !wrapped.is_success() => {
        let error = wrapped.error().map(ToString::to_string).unwrap_or_default();
        warn!(method = %entry.descriptor(), error = %error, "invoke_completed (wrapped failure)");
      }
      Ok(_) => {
        info!(method = %entry.descriptor(), "invoke_completed");
      }
      Err(e) => {
        error!(method = %entry.descriptor(), error = %e, "invoke_failed");
      }
    }

    result
  }

  /// Invoke and return the plain value.
  ///
  /// A wrapped failure is returned as [`DispatchError::Evaluation`].
  pub async fn invoke_value(
    &self,
    repository: &Repository,
    method: &str,
    args: Vec<Value>,
  ) -> Result<Value, DispatchError> {
    let outcome = self.invoke(repository, method, args).await?;
    Ok(outcome.into_value()?)
  }

  /// Invoke and return the wrapped result.
  ///
  /// A plain value is wrapped as a success. Errors that are never wrapped
  /// (arity, configuration, unsupported operation, ...) stay errors.
  pub async fn invoke_wrapped(
    &self,
    repository: &Repository,
    method: &str,
    args: Vec<Value>,
  ) -> Result<ExecutionResult, DispatchError> {
    match self.invoke(repository, method, args).await {
      Ok(outcome) => Ok(outcome.into_wrapped()),
      Err(DispatchError::Evaluation { cause }) => Ok(ExecutionResult::failure(cause)),
      Err(e) => Err(e),
    }
  }

  async fn dispatch(
    &self,
    repository: &Repository,
    entry: &Arc<MethodEntry>,
    args: Vec<Value>,
  ) -> Result<Outcome, DispatchError> {
    let returns = entry.def().returns;

    if !ConfigResolver::is_scripted(&entry.def().markers) {
      debug!(method = %entry.descriptor(), "method is not scripted");
      let result = self.run_default_directly(repository, entry, &args);
      return finish(returns, result);
    }

    let invocation = self
      .cache
      .get_or_resolve(entry.descriptor(), &entry.def().markers)
      .await?;

    let bindings = binder::bind(entry, &args)?;

    let result = self
      .execute(repository, entry, &invocation, bindings, args)
      .await;
    finish(returns, result)
  }

  /// Default dispatch for methods that are not scripted.
  fn run_default_directly(
    &self,
    repository: &Repository,
    entry: &MethodEntry,
    args: &[Value],
  ) -> Result<Value, UnitFailure> {
    binder::check_arity(entry, args).map_err(UnitFailure::Dispatch)?;

    let body = entry.default_body().ok_or_else(|| {
      UnitFailure::Dispatch(DispatchError::UnsupportedOperation {
        method: entry.descriptor().to_string(),
        reason: "method is not scripted and has no default body".to_string(),
      })
    })?;

    body(&repository.default_receiver(), args).map_err(|source| {
      UnitFailure::Evaluation(EvaluationError::DefaultMethod {
        method: entry.descriptor().to_string(),
        source,
      })
    })
  }

  /// Run the scripted unit of work under the method's time bound.
  async fn execute(
    &self,
    repository: &Repository,
    entry: &MethodEntry,
    invocation: &InvocationDescriptor,
    bindings: ParameterBindings,
    args: Vec<Value>,
  ) -> Result<Value, UnitFailure> {
    let method = entry.descriptor().clone();

    if self.pool.is_closed() {
      return Err(UnitFailure::Dispatch(DispatchError::Rejected {
        method: method.to_string(),
      }));
    }

    let scope = CallScope::new(method.clone(), invocation);

    // Stop a detached unit from starting evaluation once nobody waits for it.
    let _abandon = scope.token().clone().drop_guard();

    let unit = UnitOfWork {
      method: method.clone(),
      provider: Arc::clone(scope.provider()),
      evaluator: Arc::clone(scope.evaluator()),
      bindings,
      args,
      default_body: entry.default_body().cloned(),
      receiver: repository.default_receiver(),
      pool: self.pool.clone(),
      cancel: scope.token().clone(),
    };

    let handle = tokio::spawn(unit.run());

    let joined = match invocation.config().timeout() {
      Some(limit) => match tokio::time::timeout(limit, handle).await {
        Ok(joined) => joined,
        Err(_) => {
          warn!(method = %method, timeout_ms = millis(limit), "invoke_timed_out");
          self.coordinator.cancel(&scope);
          return Err(UnitFailure::Evaluation(EvaluationError::Timeout {
            method: method.to_string(),
            timeout_ms: millis(limit),
          }));
        }
      },
      None => handle.await,
    };

    let result = joined.unwrap_or_else(|e| {
      Err(UnitFailure::Evaluation(EvaluationError::Worker {
        method: method.to_string(),
        message: e.to_string(),
      }))
    });

    if result.is_err() {
      self.coordinator.cancel(&scope);
    }
    result
  }
}

fn lookup(repository: &Repository, method: &str) -> Result<Arc<MethodEntry>, DispatchError> {
  repository
    .get(method)
    .cloned()
    .ok_or_else(|| DispatchError::UnknownMethod {
      interface: repository.name().to_string(),
      method: method.to_string(),
    })
}

fn millis(duration: Duration) -> u64 {
  u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Apply the result-wrapping policy.
fn finish(returns: ReturnKind, result: Result<Value, UnitFailure>) -> Result<Outcome, DispatchError> {
  match (returns, result) {
    (ReturnKind::Plain, Ok(value)) => Ok(Outcome::Value(value)),
    (ReturnKind::Wrapped, Ok(value)) => Ok(Outcome::Wrapped(ExecutionResult::success(value))),
    (ReturnKind::Plain, Err(UnitFailure::Evaluation(cause))) => {
      Err(DispatchError::Evaluation { cause })
    }
    (ReturnKind::Wrapped, Err(UnitFailure::Evaluation(cause))) => {
      Ok(Outcome::Wrapped(ExecutionResult::failure(cause)))
    }
    (_, Err(UnitFailure::Dispatch(e))) => Err(e),
  }
}

/// Source resolution plus evaluation for one call, run on a worker.
struct UnitOfWork {
  method: MethodDescriptor,
  provider: Arc<dyn ScriptProvider>,
  evaluator: Arc<dyn ScriptEvaluator>,
  bindings: ParameterBindings,
  args: Vec<Value>,
  default_body: Option<DefaultBody>,
  receiver: DefaultReceiver,
  pool: WorkerPool,
  cancel: CancellationToken,
}

impl UnitOfWork {
  async fn run(self) -> Result<Value, UnitFailure> {
    // An abandoned unit must leave the worker queue instead of waiting on.
    let _permit = tokio::select! {
      acquired = self.pool.acquire() => acquired.map_err(|_| {
        UnitFailure::Dispatch(DispatchError::Rejected {
          method: self.method.to_string(),
        })
      })?,
      _ = self.cancel.cancelled() => return Err(self.abandoned("waiting for a worker")),
    };

    self.check_cancelled()?;

    let source = tokio::select! {
      source = self.provider.get_script(&self.method) => source,
      _ = self.cancel.cancelled() => return Err(self.abandoned("resolving its source")),
    };
    match source.status() {
      SourceStatus::Found => {
        let text = source.into_text().unwrap_or_default();
        self.evaluate(text).await
      }
      SourceStatus::NotFound => {
        debug!(
          method = %self.method,
          reason = source.error().unwrap_or("no script"),
          "script not found, falling back to default body"
        );
        self.fall_back().await
      }
      SourceStatus::Failure => Err(UnitFailure::Evaluation(EvaluationError::SourceResolution {
        method: self.method.to_string(),
        message: source.error().unwrap_or("unknown provider failure").to_string(),
      })),
    }
  }

  fn check_cancelled(&self) -> Result<(), UnitFailure> {
    if self.cancel.is_cancelled() {
      return Err(self.abandoned("before evaluation"));
    }
    Ok(())
  }

  fn abandoned(&self, stage: &'static str) -> UnitFailure {
    debug!(method = %self.method, stage, "unit of work abandoned");
    UnitFailure::Evaluation(EvaluationError::Script {
      method: self.method.to_string(),
      source: ScriptError::Cancelled,
    })
  }

  async fn evaluate(self, text: String) -> Result<Value, UnitFailure> {
    self.check_cancelled()?;
    trace!(method = %self.method, source = %text, "evaluating script");

    let method = self.method.to_string();
    let evaluator = self.evaluator;
    let bindings = self.bindings;
    let ctx = EvalContext::new(self.method, self.cancel);

    let joined =
      tokio::task::spawn_blocking(move || evaluator.evaluate(&text, &bindings, &ctx)).await;

    match joined {
      Ok(Ok(value)) => Ok(value),
      Ok(Err(source)) => Err(UnitFailure::Evaluation(EvaluationError::Script {
        method,
        source,
      })),
      Err(e) => Err(UnitFailure::Evaluation(EvaluationError::Worker {
        method,
        message: e.to_string(),
      })),
    }
  }

  async fn fall_back(self) -> Result<Value, UnitFailure> {
    let method = self.method.to_string();
    let Some(body) = self.default_body else {
      return Err(UnitFailure::Dispatch(DispatchError::UnsupportedOperation {
        method,
        reason: "no script found and no default body".to_string(),
      }));
    };

    let receiver = self.receiver;
    let args = self.args;
    let joined = tokio::task::spawn_blocking(move || body(&receiver, &args)).await;

    match joined {
      Ok(Ok(value)) => Ok(value),
      Ok(Err(source)) => Err(UnitFailure::Evaluation(EvaluationError::DefaultMethod {
        method,
        source,
      })),
      Err(e) => Err(UnitFailure::Evaluation(EvaluationError::Worker {
        method,
        message: e.to_string(),
      })),
    }
  }
}

/// An engine bound to one repository.
///
/// The static replacement for a generated interface implementation: callers
/// hold a handle and invoke methods by name.
#[derive(Clone)]
pub struct RepositoryHandle {
  engine: Arc<ScriptEngine>,
  repository: Repository,
}

impl RepositoryHandle {
  pub fn repository(&self) -> &Repository {
    &self.repository
  }

  pub fn engine(&self) -> &Arc<ScriptEngine> {
    &self.engine
  }

  pub async fn invoke(&self, method: &str, args: Vec<Value>) -> Result<Outcome, DispatchError> {
    self.engine.invoke(&self.repository, method, args).await
  }

  pub async fn invoke_value(&self, method: &str, args: Vec<Value>) -> Result<Value, DispatchError> {
    self
      .engine
      .invoke_value(&self.repository, method, args)
      .await
  }

  pub async fn invoke_wrapped(
    &self,
    method: &str,
    args: Vec<Value>,
  ) -> Result<ExecutionResult, DispatchError> {
    self
      .engine
      .invoke_wrapped(&self.repository, method, args)
      .await
  }
}

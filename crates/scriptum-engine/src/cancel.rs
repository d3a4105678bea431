//! Best-effort cancellation of a call's collaborators.

use std::sync::Arc;

use scriptum_config::MethodDescriptor;
use scriptum_runtime::{ScriptEvaluator, ScriptProvider};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cache::InvocationDescriptor;

/// The provider and evaluator instances serving one call.
///
/// Per-call components get a fresh instance here; shared components hand
/// out their single instance.
pub struct CallScope {
  method: MethodDescriptor,
  provider: Arc<dyn ScriptProvider>,
  evaluator: Arc<dyn ScriptEvaluator>,
  provider_per_call: bool,
  evaluator_per_call: bool,
  token: CancellationToken,
}

impl CallScope {
  pub fn new(method: MethodDescriptor, invocation: &InvocationDescriptor) -> Self {
    Self {
      method,
      provider: invocation.provider().instance(),
      evaluator: invocation.evaluator().instance(),
      provider_per_call: invocation.provider_per_call(),
      evaluator_per_call: invocation.evaluator_per_call(),
      token: CancellationToken::new(),
    }
  }

  pub fn provider(&self) -> &Arc<dyn ScriptProvider> {
    &self.provider
  }

  pub fn evaluator(&self) -> &Arc<dyn ScriptEvaluator> {
    &self.evaluator
  }

  /// Cancelled once the caller stops waiting for the call.
  pub fn token(&self) -> &CancellationToken {
    &self.token
  }
}

/// Signals a call's collaborators to release resources after a timeout or
/// failure.
///
/// Only per-call instances are cancelled; a shared instance serves other
/// calls too. Cancellation is a request: nothing here waits for, or
/// guarantees, the evaluation to stop.
#[derive(Debug, Default, Clone, Copy)]
pub struct CancellationCoordinator;

impl CancellationCoordinator {
  pub fn new() -> Self {
    Self
  }

  pub fn cancel(&self, scope: &CallScope) {
    scope.token.cancel();

    if scope.provider_per_call {
      debug!(method = %scope.method, "cancelling per-call provider");
      scope.provider.cancel();
    }
    if scope.evaluator_per_call {
      debug!(method = %scope.method, "cancelling per-call evaluator");
      scope.evaluator.cancel();
    }
  }
}

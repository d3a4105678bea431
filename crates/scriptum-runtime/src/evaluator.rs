//! Script evaluator contract.

use scriptum_config::MethodDescriptor;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::bindings::ParameterBindings;
use crate::error::ScriptError;

/// Per-call context handed to an evaluator.
#[derive(Debug, Clone)]
pub struct EvalContext {
  /// The method being evaluated.
  pub method: MethodDescriptor,
  /// Cancelled when the caller stops waiting (timeout or failure).
  ///
  /// Evaluators may poll it; nothing forces them to.
  pub cancel: CancellationToken,
}

impl EvalContext {
  pub fn new(method: MethodDescriptor, cancel: CancellationToken) -> Self {
    Self { method, cancel }
  }
}

/// Executes script text against named parameter bindings.
///
/// Evaluation is synchronous and treated as opaque: it may be slow and it
/// may ignore cancellation. The engine runs it on a blocking worker.
pub trait ScriptEvaluator: Send + Sync {
  /// Evaluate `source` with `bindings` and return the script's result.
  fn evaluate(
    &self,
    source: &str,
    bindings: &ParameterBindings,
    ctx: &EvalContext,
  ) -> Result<Value, ScriptError>;

  /// Release resources held for an in-flight evaluation.
  ///
  /// Only called on per-call instances. Best-effort.
  fn cancel(&self) {}
}

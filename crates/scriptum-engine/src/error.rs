//! Dispatch error types.

use scriptum_runtime::ScriptError;

/// Why a scripted unit of work failed.
///
/// These are the failures a method with a wrapped return kind reports inside
/// its [`ExecutionResult`](crate::ExecutionResult) instead of as an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvaluationError {
  /// The provider failed to look up the script.
  #[error("script source for {method} could not be resolved: {message}")]
  SourceResolution { method: String, message: String },

  /// The evaluator reported an error.
  #[error("script for {method} failed: {source}")]
  Script {
    method: String,
    #[source]
    source: ScriptError,
  },

  /// The unit of work did not finish within the method's time bound.
  #[error("{method} timed out after {timeout_ms}ms")]
  Timeout { method: String, timeout_ms: u64 },

  /// The default body the call fell back to failed.
  #[error("default body of {method} failed: {source}")]
  DefaultMethod {
    method: String,
    #[source]
    source: ScriptError,
  },

  /// The worker running the unit of work panicked or was shut down.
  #[error("worker running {method} failed: {message}")]
  Worker { method: String, message: String },
}

impl EvaluationError {
  pub fn is_timeout(&self) -> bool {
    matches!(self, EvaluationError::Timeout { .. })
  }
}

/// Errors returned by [`ScriptEngine::invoke`](crate::ScriptEngine::invoke).
///
/// Only [`DispatchError::Evaluation`] is subject to result wrapping; every
/// other variant is returned as an error whatever the method's return kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
  /// The repository declares no method with this name.
  #[error("interface '{interface}' has no method '{method}'")]
  UnknownMethod { interface: String, method: String },

  /// Neither a script nor a default body can serve the call.
  #[error("unsupported operation {method}: {reason}")]
  UnsupportedOperation { method: String, reason: String },

  /// The argument count differs from the declared parameter count.
  #[error("{method} expects {expected} argument(s), got {actual}")]
  ArityMismatch {
    method: String,
    expected: usize,
    actual: usize,
  },

  /// A declared parameter has neither a name nor a script name.
  #[error("parameter {index} of {method} has no name")]
  MissingParameterName { method: String, index: usize },

  /// Two parameters are bound under the same name.
  #[error("parameter name '{name}' is bound more than once in {method}")]
  DuplicateParameterName { method: String, name: String },

  /// Markers, provider or evaluator could not be resolved.
  #[error("configuration error for {method}: {message}")]
  Configuration { method: String, message: String },

  /// The worker pool is shut down and takes no more work.
  #[error("worker pool rejected {method}: pool is closed")]
  Rejected { method: String },

  /// The scripted unit of work failed.
  #[error(transparent)]
  Evaluation {
    #[from]
    cause: EvaluationError,
  },
}

impl DispatchError {
  /// The evaluation failure behind this error, if it is one.
  pub fn evaluation(&self) -> Option<&EvaluationError> {
    match self {
      DispatchError::Evaluation { cause } => Some(cause),
      _ => None,
    }
  }
}

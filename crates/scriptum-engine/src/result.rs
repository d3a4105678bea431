//! Invocation result types.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::EvaluationError;

/// Status of a wrapped execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
  Success,
  Failure,
}

/// Wrapped outcome of a method whose return kind is
/// [`ReturnKind::Wrapped`](scriptum_config::ReturnKind).
///
/// A success carries the value and no error; a failure carries the error and
/// no value. Serializes as `{"value", "status", "error"}`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult<T = Value> {
  outcome: Result<T, EvaluationError>,
}

impl<T> ExecutionResult<T> {
  pub fn success(value: T) -> Self {
    Self { outcome: Ok(value) }
  }

  pub fn failure(error: EvaluationError) -> Self {
    Self {
      outcome: Err(error),
    }
  }

  pub fn status(&self) -> ExecutionStatus {
    match self.outcome {
      Ok(_) => ExecutionStatus::Success,
      Err(_) => ExecutionStatus::Failure,
    }
  }

  pub fn is_success(&self) -> bool {
    self.outcome.is_ok()
  }

  pub fn value(&self) -> Option<&T> {
    self.outcome.as_ref().ok()
  }

  pub fn error(&self) -> Option<&EvaluationError> {
    self.outcome.as_ref().err()
  }

  /// Unwrap into a plain result.
  pub fn into_result(self) -> Result<T, EvaluationError> {
    self.outcome
  }
}

impl<T: Serialize> Serialize for ExecutionResult<T> {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut state = serializer.serialize_struct("ExecutionResult", 3)?;
    state.serialize_field("value", &self.value())?;
    state.serialize_field("status", &self.status())?;
    state.serialize_field("error", &self.error().map(ToString::to_string))?;
    state.end()
  }
}

/// What a call returns: the plain value, or the wrapped result for methods
/// declared with a wrapped return kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Outcome {
  Value(Value),
  Wrapped(ExecutionResult),
}

impl Outcome {
  /// The plain value, unwrapping a wrapped result.
  pub fn into_value(self) -> Result<Value, EvaluationError> {
    match self {
      Outcome::Value(value) => Ok(value),
      Outcome::Wrapped(result) => result.into_result(),
    }
  }

  /// The result wrapped, wrapping a plain value as a success.
  pub fn into_wrapped(self) -> ExecutionResult {
    match self {
      Outcome::Value(value) => ExecutionResult::success(value),
      Outcome::Wrapped(result) => result,
    }
  }
}

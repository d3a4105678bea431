//! Script evaluation errors.

/// Errors an evaluator (or a default method body) can report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScriptError {
  /// The script text could not be compiled.
  #[error("script compilation failed: {message}")]
  Compile { message: String },

  /// The script raised an error while running.
  #[error("script raised an error: {message}")]
  Runtime { message: String },

  /// A binding or the script's result could not be converted.
  #[error("value conversion failed: {message}")]
  Conversion { message: String },

  /// The evaluation observed its cancellation signal and stopped.
  #[error("evaluation cancelled")]
  Cancelled,
}

impl ScriptError {
  pub fn runtime(message: impl Into<String>) -> Self {
    ScriptError::Runtime {
      message: message.into(),
    }
  }
}

use thiserror::Error;

/// Errors raised while loading declarations or resolving invocation config.
#[derive(Debug, Error)]
pub enum ConfigError {
  /// The method carries custom script markers, but none of them is registered.
  #[error("method {method} is marked for scripting with [{kinds}] but no mapping is registered for them")]
  UnmappedMarker { method: String, kinds: String },

  /// Two methods with the same name were declared on one interface.
  #[error("duplicate method '{method}' on interface '{interface}'")]
  DuplicateMethod { interface: String, method: String },

  /// Two interfaces with the same name were declared in one manifest.
  #[error("duplicate interface '{interface}'")]
  DuplicateInterface { interface: String },

  /// The manifest could not be parsed.
  #[error("invalid repository manifest: {0}")]
  Manifest(#[from] serde_json::Error),
}

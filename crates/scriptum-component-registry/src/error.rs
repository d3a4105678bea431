use thiserror::Error;

/// Errors that can occur when working with the component registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
  /// No component is registered under the name.
  #[error("component not found: {name}")]
  NotFound { name: String },

  /// A component is registered under the name, but of another kind.
  #[error("component '{name}' is a {actual}, expected a {expected}")]
  WrongKind {
    name: String,
    expected: &'static str,
    actual: &'static str,
  },

  /// A component is already registered under the name.
  #[error("component already exists: {name}")]
  AlreadyExists { name: String },
}

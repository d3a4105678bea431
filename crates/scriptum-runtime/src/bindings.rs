//! Named parameter bindings for one call.

use serde_json::Value;

/// Ordered parameter name → argument value pairs.
///
/// Built fresh for every call, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterBindings {
  entries: Vec<(String, Value)>,
}

impl ParameterBindings {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      entries: Vec::with_capacity(capacity),
    }
  }

  /// Append a binding. Returns `false` if the name is already bound.
  pub fn insert(&mut self, name: impl Into<String>, value: Value) -> bool {
    let name = name.into();
    if self.contains(&name) {
      return false;
    }
    self.entries.push((name, value));
    true
  }

  pub fn get(&self, name: &str) -> Option<&Value> {
    self
      .entries
      .iter()
      .find(|(n, _)| n == name)
      .map(|(_, v)| v)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.entries.iter().any(|(n, _)| n == name)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.entries.iter().map(|(n, _)| n.as_str())
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
    self.entries.iter().map(|(n, v)| (n.as_str(), v))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_insert_keeps_declaration_order() {
    let mut bindings = ParameterBindings::new();
    assert!(bindings.insert("y", json!(2)));
    assert!(bindings.insert("x", json!(1)));

    assert_eq!(bindings.names().collect::<Vec<_>>(), vec!["y", "x"]);
    assert_eq!(bindings.get("x"), Some(&json!(1)));
    assert_eq!(bindings.len(), 2);
  }

  #[test]
  fn test_duplicate_name_rejected() {
    let mut bindings = ParameterBindings::new();
    assert!(bindings.insert("x", json!(1)));
    assert!(!bindings.insert("x", json!(2)));
    assert_eq!(bindings.get("x"), Some(&json!(1)));
    assert_eq!(bindings.len(), 1);
  }
}

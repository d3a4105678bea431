use std::fmt;

use serde::{Deserialize, Serialize};

use crate::marker::Marker;

/// Identity of a declared interface method.
///
/// Used as the cache key for resolved invocation state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodDescriptor {
  /// Owning interface name.
  pub interface: String,
  /// Method name.
  pub name: String,
  /// Declared parameter types, in order.
  pub param_types: Vec<String>,
}

impl MethodDescriptor {
  pub fn new(
    interface: impl Into<String>,
    name: impl Into<String>,
    param_types: Vec<String>,
  ) -> Self {
    Self {
      interface: interface.into(),
      name: name.into(),
      param_types,
    }
  }
}

impl fmt::Display for MethodDescriptor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{}.{}({})",
      self.interface,
      self.name,
      self.param_types.join(", ")
    )
  }
}

/// A declared method parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDef {
  /// Declared parameter name.
  #[serde(default)]
  pub name: String,
  /// Declared parameter type.
  #[serde(rename = "type", default = "default_param_type")]
  pub param_type: String,
  /// Name exposed to the script instead of `name`.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub script_name: Option<String>,
}

fn default_param_type() -> String {
  "any".to_string()
}

impl ParamDef {
  pub fn new(name: impl Into<String>, param_type: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      param_type: param_type.into(),
      script_name: None,
    }
  }

  /// Override the name the script sees for this parameter.
  pub fn renamed(mut self, script_name: impl Into<String>) -> Self {
    self.script_name = Some(script_name.into());
    self
  }

  /// The name this parameter is bound under, if one was declared.
  pub fn binding_name(&self) -> Option<&str> {
    match self.script_name.as_deref() {
      Some(name) if !name.is_empty() => Some(name),
      _ if !self.name.is_empty() => Some(self.name.as_str()),
      _ => None,
    }
  }
}

/// How a method reports its outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnKind {
  /// Return the value directly and report failures as errors.
  #[default]
  Plain,
  /// Return an execution result carrying value, status and error.
  Wrapped,
}

/// Declaration of one interface method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDef {
  pub name: String,
  #[serde(default)]
  pub params: Vec<ParamDef>,
  #[serde(default)]
  pub markers: Vec<Marker>,
  #[serde(default)]
  pub returns: ReturnKind,
  /// Constant default body for manifest-declared methods.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub default_value: Option<serde_json::Value>,
}

impl MethodDef {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      params: Vec::new(),
      markers: Vec::new(),
      returns: ReturnKind::Plain,
      default_value: None,
    }
  }

  pub fn param(mut self, param: ParamDef) -> Self {
    self.params.push(param);
    self
  }

  pub fn marker(mut self, marker: Marker) -> Self {
    self.markers.push(marker);
    self
  }

  pub fn wrapped(mut self) -> Self {
    self.returns = ReturnKind::Wrapped;
    self
  }

  pub fn default_value(mut self, value: serde_json::Value) -> Self {
    self.default_value = Some(value);
    self
  }

  /// Number of declared parameters.
  pub fn arity(&self) -> usize {
    self.params.len()
  }

  /// Build the identity of this method on the given interface.
  pub fn descriptor(&self, interface: &str) -> MethodDescriptor {
    MethodDescriptor::new(
      interface,
      self.name.clone(),
      self
        .params
        .iter()
        .map(|p| p.param_type.clone())
        .collect(),
    )
  }
}

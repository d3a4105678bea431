use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::mapping::{MarkerMapping, MarkerMappings};
use crate::method::MethodDef;

/// A script repository interface: a named set of method declarations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceDef {
  pub name: String,
  #[serde(default)]
  pub methods: Vec<MethodDef>,
}

impl InterfaceDef {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      methods: Vec::new(),
    }
  }

  pub fn method(mut self, method: MethodDef) -> Self {
    self.methods.push(method);
    self
  }

  pub fn get_method(&self, name: &str) -> Option<&MethodDef> {
    self.methods.iter().find(|m| m.name == name)
  }

  /// Check that method names are unique within the interface.
  pub fn validate(&self) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for method in &self.methods {
      if !seen.insert(method.name.as_str()) {
        return Err(ConfigError::DuplicateMethod {
          interface: self.name.clone(),
          method: method.name.clone(),
        });
      }
    }
    Ok(())
  }
}

/// A repository manifest: interfaces plus the external marker mappings.
///
/// ```json
/// {
///   "interfaces": [
///     {
///       "name": "Calculator",
///       "methods": [
///         {
///           "name": "add",
///           "params": [{"name": "x", "type": "i64"}, {"name": "y", "type": "i64"}],
///           "markers": [{"type": "custom", "kind": "LuaScript"}]
///         }
///       ]
///     }
///   ],
///   "mappings": [
///     {"kind": "LuaScript", "provider": "fs-provider", "evaluator": "lua-evaluator"}
///   ]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepositoryDef {
  #[serde(default)]
  pub interfaces: Vec<InterfaceDef>,
  #[serde(default)]
  pub mappings: Vec<MarkerMapping>,
}

impl RepositoryDef {
  /// Parse and validate a JSON manifest.
  pub fn from_json(content: &str) -> Result<Self, ConfigError> {
    let def: RepositoryDef = serde_json::from_str(content)?;
    def.validate()?;
    Ok(def)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for interface in &self.interfaces {
      if !seen.insert(interface.name.as_str()) {
        return Err(ConfigError::DuplicateInterface {
          interface: interface.name.clone(),
        });
      }
      interface.validate()?;
    }
    Ok(())
  }

  pub fn interface(&self, name: &str) -> Option<&InterfaceDef> {
    self.interfaces.iter().find(|i| i.name == name)
  }

  /// The manifest's mappings as a lookup table.
  pub fn marker_mappings(&self) -> MarkerMappings {
    self.mappings.iter().cloned().collect()
  }
}

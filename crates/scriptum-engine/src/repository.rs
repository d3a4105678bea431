//! Static dispatch tables for script repository interfaces.
//!
//! A [`Repository`] is the declared surface of one interface: its methods,
//! their markers and parameter declarations, and the default bodies some of
//! them carry. The engine dispatches calls against it by method name.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use scriptum_config::{ConfigError, InterfaceDef, MethodDef, MethodDescriptor};
use scriptum_runtime::ScriptError;
use serde_json::Value;

/// A method's default body.
///
/// Receives a [`DefaultReceiver`] for the owning interface and the call's
/// arguments.
pub type DefaultBody =
  Arc<dyn Fn(&DefaultReceiver, &[Value]) -> Result<Value, ScriptError> + Send + Sync>;

/// One declared method with its descriptor and optional default body.
pub struct MethodEntry {
  def: MethodDef,
  descriptor: MethodDescriptor,
  default_body: Option<DefaultBody>,
}

impl MethodEntry {
  fn new(interface: &str, def: MethodDef, default_body: Option<DefaultBody>) -> Self {
    let descriptor = def.descriptor(interface);
    Self {
      def,
      descriptor,
      default_body,
    }
  }

  pub fn def(&self) -> &MethodDef {
    &self.def
  }

  pub fn name(&self) -> &str {
    &self.def.name
  }

  pub fn descriptor(&self) -> &MethodDescriptor {
    &self.descriptor
  }

  pub fn default_body(&self) -> Option<&DefaultBody> {
    self.default_body.as_ref()
  }

  pub fn has_default(&self) -> bool {
    self.default_body.is_some()
  }
}

impl fmt::Debug for MethodEntry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("MethodEntry")
      .field("descriptor", &self.descriptor)
      .field("markers", &self.def.markers)
      .field("has_default", &self.has_default())
      .finish()
  }
}

struct RepositoryInner {
  name: String,
  methods: Vec<Arc<MethodEntry>>,
  index: HashMap<String, usize>,
}

/// Declared methods of one interface, looked up by name.
///
/// Cheap to clone; clones share the same table.
#[derive(Clone)]
pub struct Repository {
  inner: Arc<RepositoryInner>,
}

impl Repository {
  pub fn builder(name: impl Into<String>) -> RepositoryBuilder {
    RepositoryBuilder {
      name: name.into(),
      methods: Vec::new(),
    }
  }

  /// Build a repository from a manifest declaration.
  ///
  /// A method's `default_value` becomes a default body returning that value.
  pub fn from_def(def: &InterfaceDef) -> Result<Self, ConfigError> {
    let mut builder = Repository::builder(def.name.clone());
    for method in &def.methods {
      builder = match method.default_value.clone() {
        Some(value) => {
          builder.method_with_default(method.clone(), move |_: &DefaultReceiver, _: &[Value]| {
            Ok(value.clone())
          })
        }
        None => builder.method(method.clone()),
      };
    }
    builder.build()
  }

  /// Interface name.
  pub fn name(&self) -> &str {
    &self.inner.name
  }

  pub fn get(&self, method: &str) -> Option<&Arc<MethodEntry>> {
    self
      .inner
      .index
      .get(method)
      .map(|&position| &self.inner.methods[position])
  }

  /// Declared methods, in declaration order.
  pub fn methods(&self) -> impl Iterator<Item = &Arc<MethodEntry>> {
    self.inner.methods.iter()
  }

  pub fn len(&self) -> usize {
    self.inner.methods.len()
  }

  pub fn is_empty(&self) -> bool {
    self.inner.methods.is_empty()
  }

  /// A receiver exposing only this interface's default bodies.
  pub fn default_receiver(&self) -> DefaultReceiver {
    DefaultReceiver {
      repository: self.clone(),
    }
  }
}

impl fmt::Debug for Repository {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Repository")
      .field("name", &self.inner.name)
      .field("methods", &self.inner.methods)
      .finish()
  }
}

/// Builder for [`Repository`].
pub struct RepositoryBuilder {
  name: String,
  methods: Vec<(MethodDef, Option<DefaultBody>)>,
}

impl RepositoryBuilder {
  /// Declare a method without a default body.
  pub fn method(mut self, def: MethodDef) -> Self {
    self.methods.push((def, None));
    self
  }

  /// Declare a method with a default body.
  pub fn method_with_default<F>(mut self, def: MethodDef, body: F) -> Self
  where
    F: Fn(&DefaultReceiver, &[Value]) -> Result<Value, ScriptError> + Send + Sync + 'static,
  {
    self.methods.push((def, Some(Arc::new(body))));
    self
  }

  /// Finish the table. Method names must be unique.
  pub fn build(self) -> Result<Repository, ConfigError> {
    let mut methods = Vec::with_capacity(self.methods.len());
    let mut index = HashMap::with_capacity(self.methods.len());

    for (def, body) in self.methods {
      if index.contains_key(&def.name) {
        return Err(ConfigError::DuplicateMethod {
          interface: self.name,
          method: def.name,
        });
      }
      index.insert(def.name.clone(), methods.len());
      methods.push(Arc::new(MethodEntry::new(&self.name, def, body)));
    }

    Ok(Repository {
      inner: Arc::new(RepositoryInner {
        name: self.name,
        methods,
        index,
      }),
    })
  }
}

/// Receiver handed to default bodies.
///
/// Exposes the interface's default logic only: calls made through it run
/// other methods' default bodies directly and never reach the dispatch
/// engine, so a default body cannot re-enter script evaluation.
#[derive(Clone, Debug)]
pub struct DefaultReceiver {
  repository: Repository,
}

impl DefaultReceiver {
  /// Name of the interface the receiver belongs to.
  pub fn interface(&self) -> &str {
    self.repository.name()
  }

  pub fn has_default(&self, method: &str) -> bool {
    self
      .repository
      .get(method)
      .map(|entry| entry.has_default())
      .unwrap_or(false)
  }

  /// Run `method`'s default body with `args`.
  pub fn call(&self, method: &str, args: &[Value]) -> Result<Value, ScriptError> {
    let entry = self.repository.get(method).ok_or_else(|| {
      ScriptError::runtime(format!(
        "interface '{}' has no method '{}'",
        self.repository.name(),
        method
      ))
    })?;

    let body = entry.default_body().ok_or_else(|| {
      ScriptError::runtime(format!("{} has no default body", entry.descriptor()))
    })?;

    body(self, args)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use scriptum_config::{Marker, ParamDef};
  use serde_json::json;

  fn greeter() -> Repository {
    Repository::builder("Greeter")
      .method_with_default(
        MethodDef::new("greet").param(ParamDef::new("name", "string")),
        |_, args| Ok(json!(format!("hello {}", args[0].as_str().unwrap_or("?")))),
      )
      .method_with_default(
        MethodDef::new("greetTwice").param(ParamDef::new("name", "string")),
        |receiver, args| {
          let once = receiver.call("greet", args)?;
          Ok(json!([once.clone(), once]))
        },
      )
      .method(MethodDef::new("scripted").marker(Marker::custom("LuaScript")))
      .build()
      .unwrap()
  }

  #[test]
  fn test_lookup_by_name() {
    let repository = greeter();
    assert_eq!(repository.name(), "Greeter");
    assert_eq!(repository.len(), 3);

    let entry = repository.get("greet").unwrap();
    assert_eq!(entry.descriptor().to_string(), "Greeter.greet(string)");
    assert!(entry.has_default());
    assert!(!repository.get("scripted").unwrap().has_default());
    assert!(repository.get("missing").is_none());
  }

  #[test]
  fn test_methods_keep_declaration_order() {
    let names: Vec<_> = greeter().methods().map(|m| m.name().to_string()).collect();
    assert_eq!(names, vec!["greet", "greetTwice", "scripted"]);
  }

  #[test]
  fn test_duplicate_method_rejected() {
    let err = Repository::builder("Greeter")
      .method(MethodDef::new("greet"))
      .method(MethodDef::new("greet"))
      .build()
      .unwrap_err();
    assert!(matches!(err, ConfigError::DuplicateMethod { .. }));
  }

  #[test]
  fn test_receiver_calls_other_defaults() {
    let receiver = greeter().default_receiver();
    assert_eq!(receiver.interface(), "Greeter");
    assert_eq!(
      receiver.call("greetTwice", &[json!("Ada")]).unwrap(),
      json!(["hello Ada", "hello Ada"])
    );
  }

  #[test]
  fn test_receiver_without_default_body() {
    let receiver = greeter().default_receiver();
    assert!(!receiver.has_default("scripted"));
    assert!(matches!(
      receiver.call("scripted", &[]),
      Err(ScriptError::Runtime { .. })
    ));
    assert!(receiver.call("missing", &[]).is_err());
  }

  #[test]
  fn test_from_def_turns_default_value_into_body() {
    let def = InterfaceDef::new("Settings")
      .method(MethodDef::new("region").default_value(json!("eu-west-1")))
      .method(MethodDef::new("lookup").marker(Marker::custom("LuaScript")));

    let repository = Repository::from_def(&def).unwrap();
    let receiver = repository.default_receiver();
    assert_eq!(receiver.call("region", &[]).unwrap(), json!("eu-west-1"));
    assert!(!repository.get("lookup").unwrap().has_default());
  }
}

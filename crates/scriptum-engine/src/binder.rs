//! Parameter binding.

use scriptum_runtime::ParameterBindings;
use serde_json::Value;
use tracing::trace;

use crate::error::DispatchError;
use crate::repository::MethodEntry;

/// Check the argument count against the declared parameter count.
pub(crate) fn check_arity(entry: &MethodEntry, args: &[Value]) -> Result<(), DispatchError> {
  let expected = entry.def().arity();
  if args.len() != expected {
    return Err(DispatchError::ArityMismatch {
      method: entry.descriptor().to_string(),
      expected,
      actual: args.len(),
    });
  }
  Ok(())
}

/// Bind `args` to the method's parameter names, in declaration order.
///
/// Each parameter is bound under its script name if it declares one, else
/// under its declared name.
pub fn bind(entry: &MethodEntry, args: &[Value]) -> Result<ParameterBindings, DispatchError> {
  check_arity(entry, args)?;

  let mut bindings = ParameterBindings::with_capacity(args.len());
  for (index, (param, value)) in entry.def().params.iter().zip(args).enumerate() {
    let name = param
      .binding_name()
      .ok_or_else(|| DispatchError::MissingParameterName {
        method: entry.descriptor().to_string(),
        index,
      })?;

    if !bindings.insert(name, value.clone()) {
      return Err(DispatchError::DuplicateParameterName {
        method: entry.descriptor().to_string(),
        name: name.to_string(),
      });
    }
  }

  trace!(method = %entry.descriptor(), bindings = ?bindings, "parameters bound");
  Ok(bindings)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::repository::Repository;
  use scriptum_config::{MethodDef, ParamDef};
  use serde_json::json;

  fn repository() -> Repository {
    Repository::builder("CustomerRepository")
      .method(
        MethodDef::new("rename")
          .param(ParamDef::new("id", "uuid").renamed("customerId"))
          .param(ParamDef::new("newName", "string")),
      )
      .method(MethodDef::new("anonymous").param(ParamDef::new("", "string")))
      .method(
        MethodDef::new("clash")
          .param(ParamDef::new("a", "string").renamed("x"))
          .param(ParamDef::new("x", "string")),
      )
      .build()
      .unwrap()
  }

  #[test]
  fn test_bind_uses_overrides_then_declared_names() {
    let repository = repository();
    let bindings = bind(
      repository.get("rename").unwrap(),
      &[json!("c-1"), json!("Ada")],
    )
    .unwrap();

    assert_eq!(
      bindings.names().collect::<Vec<_>>(),
      vec!["customerId", "newName"]
    );
    assert_eq!(bindings.get("customerId"), Some(&json!("c-1")));
    assert_eq!(bindings.get("newName"), Some(&json!("Ada")));
  }

  #[test]
  fn test_arity_mismatch() {
    let repository = repository();
    let err = bind(repository.get("rename").unwrap(), &[json!("c-1")]).unwrap_err();
    assert_eq!(
      err,
      DispatchError::ArityMismatch {
        method: "CustomerRepository.rename(uuid, string)".to_string(),
        expected: 2,
        actual: 1,
      }
    );
  }

  #[test]
  fn test_missing_parameter_name() {
    let repository = repository();
    let err = bind(repository.get("anonymous").unwrap(), &[json!("x")]).unwrap_err();
    assert!(matches!(
      err,
      DispatchError::MissingParameterName { index: 0, .. }
    ));
  }

  #[test]
  fn test_duplicate_binding_name() {
    let repository = repository();
    let err = bind(repository.get("clash").unwrap(), &[json!(1), json!(2)]).unwrap_err();
    assert!(matches!(err, DispatchError::DuplicateParameterName { name, .. } if name == "x"));
  }
}

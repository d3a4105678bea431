use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use mlua::{HookTriggers, Lua, LuaSerdeExt, SerializeOptions, VmState};
use scriptum_runtime::{EvalContext, ParameterBindings, ScriptError, ScriptEvaluator};
use serde_json::Value;
use tracing::{debug, info, trace};

/// Instructions executed between two cancellation checks.
const CANCEL_CHECK_INTERVAL: u32 = 1_000;

/// Evaluates Lua chunks.
///
/// Holds no Lua state between calls, so one instance can be shared. A running
/// chunk is aborted once the call's token is cancelled or, for per-call
/// instances, once [`ScriptEvaluator::cancel`] is called. Scripts can also
/// poll `cancelled()` to stop cleanly.
#[derive(Debug, Default)]
pub struct LuaEvaluator {
  cancelled: Arc<AtomicBool>,
  memory_limit: Option<usize>,
}

impl LuaEvaluator {
  pub fn new() -> Self {
    Self::default()
  }

  /// Cap the memory a single evaluation may allocate, in bytes.
  pub fn with_memory_limit(mut self, bytes: usize) -> Self {
    self.memory_limit = Some(bytes);
    self
  }

  pub fn is_cancelled(&self) -> bool {
    self.cancelled.load(Ordering::SeqCst)
  }

  fn create_state(&self, ctx: &EvalContext) -> mlua::Result<Lua> {
    let lua = Lua::new();
    if let Some(limit) = self.memory_limit {
      lua.set_memory_limit(limit)?;
    }

    let token = ctx.cancel.clone();
    let flag = Arc::clone(&self.cancelled);
    lua.set_hook(
      HookTriggers::new().every_nth_instruction(CANCEL_CHECK_INTERVAL),
      move |_lua, _debug| {
        if token.is_cancelled() || flag.load(Ordering::SeqCst) {
          return Err(mlua::Error::RuntimeError(
            "evaluation cancelled".to_string(),
          ));
        }
        Ok(VmState::Continue)
      },
    );

    let globals = lua.globals();

    let token = ctx.cancel.clone();
    let flag = Arc::clone(&self.cancelled);
    let cancelled_fn =
      lua.create_function(move |_, ()| Ok(token.is_cancelled() || flag.load(Ordering::SeqCst)))?;
    globals.set("cancelled", cancelled_fn)?;

    let method = ctx.method.to_string();
    let log_fn = lua.create_function(move |_, message: String| {
      info!(target: "scriptum::script", method = %method, "{}", message);
      Ok(())
    })?;
    globals.set("log", log_fn)?;

    Ok(lua)
  }

  fn bind(&self, lua: &Lua, bindings: &ParameterBindings) -> Result<(), ScriptError> {
    // JSON null becomes nil rather than a null sentinel.
    let options = SerializeOptions::new()
      .serialize_none_to_null(false)
      .serialize_unit_to_null(false);

    let globals = lua.globals();
    for (name, value) in bindings.iter() {
      let lua_value = lua
        .to_value_with(value, options)
        .map_err(|e| ScriptError::Conversion {
          message: format!("parameter '{}': {}", name, e),
        })?;
      globals
        .set(name, lua_value)
        .map_err(|e| ScriptError::Conversion {
          message: format!("parameter '{}': {}", name, e),
        })?;
    }
    Ok(())
  }

  fn was_cancelled(&self, ctx: &EvalContext) -> bool {
    ctx.cancel.is_cancelled() || self.is_cancelled()
  }
}

impl ScriptEvaluator for LuaEvaluator {
  fn evaluate(
    &self,
    source: &str,
    bindings: &ParameterBindings,
    ctx: &EvalContext,
  ) -> Result<Value, ScriptError> {
    if self.was_cancelled(ctx) {
      return Err(ScriptError::Cancelled);
    }

    debug!(method = %ctx.method, bindings = bindings.len(), "evaluating lua chunk");
    trace!(source = %source, "lua source");

    let lua = self.create_state(ctx).map_err(|e| ScriptError::Runtime {
      message: format!("failed to prepare lua state: {}", e),
    })?;
    self.bind(&lua, bindings)?;

    let function = lua
      .load(source)
      .set_name(format!("={}", ctx.method))
      .into_function()
      .map_err(|e| ScriptError::Compile {
        message: error_message(&e),
      })?;

    let result: mlua::Value = match function.call(()) {
      Ok(value) => value,
      Err(_) if self.was_cancelled(ctx) => return Err(ScriptError::Cancelled),
      Err(e) => {
        return Err(ScriptError::Runtime {
          message: error_message(&e),
        });
      }
    };

    lua
      .from_value::<Value>(result)
      .map_err(|e| ScriptError::Conversion {
        message: format!("script result: {}", e),
      })
  }

  fn cancel(&self) {
    debug!("lua evaluator cancelled");
    self.cancelled.store(true, Ordering::SeqCst);
  }
}

/// Innermost message of a Lua error, without callback wrapping.
fn error_message(error: &mlua::Error) -> String {
  match error {
    mlua::Error::RuntimeError(message) => message.clone(),
    mlua::Error::SyntaxError { message, .. } => message.clone(),
    mlua::Error::CallbackError { cause, .. } => error_message(cause),
    other => other.to_string(),
  }
}

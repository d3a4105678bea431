//! Runtime abstraction for scriptum.
//!
//! The dispatch engine never evaluates anything itself. It talks to two
//! collaborators, both resolved by name from a component registry:
//!
//! - [`ScriptProvider`] locates the script text for a method.
//! - [`ScriptEvaluator`] runs that text against the call's
//!   [`ParameterBindings`].
//!
//! Both may expose a `cancel` capability, which the engine only ever calls
//! on per-call instances after a timeout or failure.

mod bindings;
mod error;
mod evaluator;
mod provider;
mod source;

pub use bindings::ParameterBindings;
pub use error::ScriptError;
pub use evaluator::{EvalContext, ScriptEvaluator};
pub use provider::{ScriptProvider, StaticScriptProvider};
pub use source::{ScriptSource, SourceStatus};

pub use scriptum_config::MethodDescriptor;

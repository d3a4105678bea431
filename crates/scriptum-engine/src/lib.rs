//! Scriptum Engine
//!
//! Dispatches calls on declared script repository interfaces to externally
//! supplied scripts. For each call the engine:
//!
//! 1. classifies the method (scripted or default dispatch),
//! 2. resolves its [`InvocationDescriptor`] once and caches it,
//! 3. binds the arguments to the declared parameter names,
//! 4. runs source lookup and evaluation on a bounded [`WorkerPool`] under the
//!    method's timeout, falling back to the method's default body when no
//!    script exists,
//! 5. returns the value directly or wrapped in an [`ExecutionResult`].
//!
//! On timeout or failure the [`CancellationCoordinator`] asks per-call
//! providers and evaluators to release their resources.

mod binder;
mod cache;
mod cancel;
mod engine;
mod error;
mod pool;
mod repository;
mod result;

pub use binder::bind;
pub use cache::{InvocationCache, InvocationDescriptor};
pub use cancel::{CallScope, CancellationCoordinator};
pub use engine::{EngineConfig, RepositoryHandle, ScriptEngine};
pub use error::{DispatchError, EvaluationError};
pub use pool::{PoolClosed, WorkerPermit, WorkerPool};
pub use repository::{DefaultBody, DefaultReceiver, MethodEntry, Repository, RepositoryBuilder};
pub use result::{ExecutionResult, ExecutionStatus, Outcome};

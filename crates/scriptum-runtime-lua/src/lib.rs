//! Lua script evaluator for scriptum.
//!
//! Every evaluation gets a fresh Lua 5.4 state. Parameter bindings are
//! exposed as globals and the chunk's return value becomes the result:
//!
//! ```lua
//! -- Calculator/add.lua, bound with x and y
//! return x + y
//! ```
//!
//! Two helper globals are installed:
//!
//! - `cancelled()` returns `true` once the caller stopped waiting, so long
//!   running scripts can bail out early.
//! - `log(message)` writes `message` to the `tracing` log of the host.

mod evaluator;

pub use evaluator::LuaEvaluator;

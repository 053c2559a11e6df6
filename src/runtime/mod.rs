//! DICE Runtime
//!
//! Core runtime components: values, environments, task groups, and the
//! evaluator.

pub mod env;
pub mod eval;
pub mod task;
pub mod value;

pub use env::{Env, EnvRef, FuncDef};
pub use eval::{Evaluator, Sink};
pub use task::{TaskGroup, TaskInstance, TaskUnit};
pub use value::{ErrorKind, EvalError, Value};

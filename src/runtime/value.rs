//! DICE Runtime Values
//!
//! Core value types and evaluation errors.

use std::fmt;
use std::sync::Arc;

use crate::runtime::env::FuncDef;
use crate::runtime::task::{TaskGroup, TaskInstance, TaskUnit};

/// Runtime values
#[derive(Debug, Clone)]
pub enum Value {
    /// Number (IEEE-754 double)
    Number(f64),

    /// String
    Str(String),

    /// Boolean
    Bool(bool),

    /// User function (closure over its defining scope)
    Func(Arc<FuncDef>),

    /// Host-provided builtin
    Builtin(String),

    /// Task unit definition
    TaskUnit(Arc<TaskUnit>),

    /// Task unit instance
    TaskInstance(TaskInstance),

    /// Stepwise-synchronized group from parallelTasks(...)
    TaskGroup(TaskGroup),

    /// Unit (the result of statements)
    Unit,
}

// Primitives compare by value; functions, instances, and groups by
// object identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Func(a), Value::Func(b)) => Arc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            (Value::TaskUnit(a), Value::TaskUnit(b)) => Arc::ptr_eq(a, b),
            (Value::TaskInstance(a), Value::TaskInstance(b)) => a == b,
            (Value::TaskGroup(a), Value::TaskGroup(b)) => a == b,
            (Value::Unit, Value::Unit) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => {
                // Integral doubles print without the fraction: `3`, not `3.0`
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::Str(s) => write!(f, "{}", s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Func(func) => write!(f, "<func {}>", func.name),
            Value::Builtin(name) => write!(f, "<builtin {}>", name),
            Value::TaskUnit(unit) => write!(f, "<taskunit {}>", unit.name),
            Value::TaskInstance(instance) => write!(f, "<{} instance>", instance.unit.name),
            Value::TaskGroup(group) => write!(f, "<task group of {}>", group.len()),
            Value::Unit => write!(f, "()"),
        }
    }
}

/// Which class of fatal error a running program hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ErrorKind {
    /// Use of an unbound identifier
    Name,
    /// Everything else: type mismatches, arity, bad ranges, ...
    Runtime,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Name => write!(f, "NameError"),
            ErrorKind::Runtime => write!(f, "RuntimeError"),
        }
    }
}

/// Evaluation error
#[derive(Debug, Clone)]
pub struct EvalError {
    pub kind: ErrorKind,
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}:{}: {}", self.kind, self.line, self.column, self.message)
    }
}

impl EvalError {
    pub fn name(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            kind: ErrorKind::Name,
            message: message.into(),
            line,
            column,
        }
    }

    pub fn runtime(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            kind: ErrorKind::Runtime,
            message: message.into(),
            line,
            column,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_display() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(-2.0).to_string(), "-2");
        assert_eq!(Value::Number(3.5).to_string(), "3.5");
        assert_eq!(Value::Number(0.0).to_string(), "0");
    }

    #[test]
    fn test_primitive_equality() {
        assert_eq!(Value::Number(1.0), Value::Number(1.0));
        assert_ne!(Value::Number(1.0), Value::Str("1".to_string()));
        assert_eq!(Value::Str("a".to_string()), Value::Str("a".to_string()));
        assert_eq!(Value::Unit, Value::Unit);
    }

    #[test]
    fn test_error_display() {
        let err = EvalError::name("name 'x' is not defined", 3, 7);
        assert_eq!(err.to_string(), "NameError at 3:7: name 'x' is not defined");

        let err = EvalError::runtime("type mismatch for '+'", 1, 1);
        assert!(err.to_string().starts_with("RuntimeError"));
    }
}

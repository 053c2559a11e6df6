//! DICE Built-in Functions
//!
//! Host-provided callables, reached through the uniform builtin
//! interface: a name in the global scope dispatching to
//! `call_builtin`. Builtins receive already-evaluated arguments and the
//! shared output sink, and must be safe to call from parallel branches.

use std::thread;
use std::time::Duration;

use rand::Rng;

use crate::runtime::eval::Sink;
use crate::runtime::task::{TaskGroup, TaskInstance};
use crate::runtime::value::{EvalError, Value};

/// Names seeded into the global scope
pub const NAMES: &[&str] = &["print", "wait", "sleep", "mock_sensor", "parallelTasks"];

/// Call a built-in function
pub fn call_builtin(
    name: &str,
    args: Vec<Value>,
    sink: &Sink,
    line: usize,
    col: usize,
) -> Result<Value, EvalError> {
    match name {
        "print" => {
            let text = args
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(" ");
            sink.write_line(&text);
            Ok(Value::Unit)
        }

        // `sleep` is an alias of `wait`
        "wait" | "sleep" => {
            check_arity(name, &args, 1, line, col)?;
            match &args[0] {
                Value::Number(secs) if *secs >= 0.0 => {
                    thread::sleep(Duration::from_secs_f64(*secs));
                    Ok(Value::Unit)
                }
                _ => Err(EvalError::runtime(
                    format!("{} expects a non-negative number of seconds", name),
                    line,
                    col,
                )),
            }
        }

        "mock_sensor" => {
            check_arity(name, &args, 2, line, col)?;
            match (&args[0], &args[1]) {
                (Value::Str(label), Value::Number(delay)) if *delay >= 0.0 => {
                    thread::sleep(Duration::from_secs_f64(*delay));
                    let value: f64 = rand::thread_rng().gen_range(0.0..100.0);
                    sink.write_line(&format!("[{}] センサー値: {:.2}", label, value));
                    Ok(Value::Unit)
                }
                _ => Err(EvalError::runtime(
                    "mock_sensor expects a label and a delay in seconds",
                    line,
                    col,
                )),
            }
        }

        "parallelTasks" => {
            if args.is_empty() {
                return Err(EvalError::runtime(
                    "parallelTasks expects at least one task unit",
                    line,
                    col,
                ));
            }
            let mut members = Vec::new();
            for arg in args {
                match arg {
                    // A bare definition is instantiated on the spot
                    Value::TaskUnit(unit) => members.push(TaskInstance::new(unit)),
                    Value::TaskInstance(instance) => members.push(instance),
                    other => {
                        return Err(EvalError::runtime(
                            format!("parallelTasks expects task units, got {}", other),
                            line,
                            col,
                        ));
                    }
                }
            }
            Ok(Value::TaskGroup(TaskGroup::new(members)))
        }

        _ => Err(EvalError::runtime(format!("unknown builtin '{}'", name), line, col)),
    }
}

fn check_arity(
    name: &str,
    args: &[Value],
    expected: usize,
    line: usize,
    col: usize,
) -> Result<(), EvalError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(EvalError::runtime(
            format!("{} expects {} argument(s), got {}", name, expected, args.len()),
            line,
            col,
        ))
    }
}

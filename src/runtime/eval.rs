//! DICE Evaluator
//!
//! Walks the AST: evaluates expressions, executes statements, and runs
//! the structured-parallelism constructs. Every `p { .. }` block,
//! `p loop`, and `group.next()` fans its branches out onto scoped
//! threads and joins them all before returning; a failing branch never
//! interrupts its siblings, and the first failure in join order wins.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Instant;

use crate::ast::{BinOp, Block, Expr, Loc, LoopRange, Node, Program, Stmt, UnaryOp};
use crate::builtin;
use crate::runtime::env::{Env, EnvRef, FuncDef};
use crate::runtime::task::{TaskGroup, TaskInstance, TaskUnit};
use crate::runtime::value::{EvalError, Value};

/// Shared output sink for `print` and `[TIMED: ..]` lines. Each write is
/// atomic at line granularity, so parallel branches never interleave
/// mid-line.
#[derive(Debug, Clone)]
pub enum Sink {
    Stdout,
    Buffer(Arc<Mutex<String>>),
}

impl Sink {
    /// A sink that captures output in memory
    pub fn buffer() -> Self {
        Sink::Buffer(Arc::new(Mutex::new(String::new())))
    }

    pub fn write_line(&self, line: &str) {
        match self {
            Sink::Stdout => println!("{}", line),
            Sink::Buffer(buf) => {
                let mut buf = buf.lock().unwrap();
                buf.push_str(line);
                buf.push('\n');
            }
        }
    }

    /// Everything written so far (empty for the stdout sink)
    pub fn contents(&self) -> String {
        match self {
            Sink::Stdout => String::new(),
            Sink::Buffer(buf) => buf.lock().unwrap().clone(),
        }
    }
}

/// One concurrent branch of a parallel construct
enum Branch<'a> {
    Stmt(&'a Node<Stmt>),
    Block(&'a Block),
}

/// Evaluator
pub struct Evaluator {
    env: EnvRef,
    sink: Sink,
}

impl Evaluator {
    /// Evaluator writing to stdout
    pub fn new() -> Self {
        Self::with_sink(Sink::Stdout)
    }

    /// Evaluator writing to the given sink, with builtins seeded into
    /// the global scope
    pub fn with_sink(sink: Sink) -> Self {
        let env = Env::new().wrap();
        {
            let mut e = env.lock().unwrap();
            for name in builtin::NAMES {
                e.define((*name).to_string(), Value::Builtin((*name).to_string()));
            }
        }
        Self { env, sink }
    }

    fn with_env(env: EnvRef, sink: Sink) -> Self {
        Self { env, sink }
    }

    /// Run a program: execute the top-level statements (binding
    /// functions and task units), then invoke `main`.
    pub fn eval_program(&self, program: &Program) -> Result<(), EvalError> {
        for stmt in &program.body.stmts {
            self.exec_stmt(stmt)?;
        }

        let main = self.env.lock().unwrap().get("main");
        match main {
            Some(Value::Func(func)) => {
                self.call_func(&func, Vec::new(), Loc::new(0, 0))?;
                Ok(())
            }
            Some(_) => Err(EvalError::runtime("'main' is not a function", 0, 0)),
            None => Err(EvalError::runtime("no 'main' function defined", 0, 0)),
        }
    }

    /// Execute a statement
    pub fn exec_stmt(&self, stmt: &Node<Stmt>) -> Result<(), EvalError> {
        match &stmt.node {
            Stmt::FuncDef(name, params, body) => {
                self.define_func(name, params, body, None);
                Ok(())
            }

            Stmt::TaskUnitDef(name, methods) => {
                let unit = TaskUnit::new(name.clone(), methods.clone(), self.env.clone());
                self.env
                    .lock()
                    .unwrap()
                    .define(name.clone(), Value::TaskUnit(Arc::new(unit)));
                Ok(())
            }

            Stmt::Assign(name, value) => {
                let value = self.eval_expr(value)?;
                let mut env = self.env.lock().unwrap();
                if !env.set(name, value.clone()) {
                    env.define(name.clone(), value);
                }
                Ok(())
            }

            Stmt::If(cond, then, otherwise) => {
                let value = self.eval_expr(cond)?;
                if self.expect_bool(value, "if condition", cond.loc)? {
                    self.exec_block(then)
                } else if let Some(otherwise) = otherwise {
                    self.exec_block(otherwise)
                } else {
                    Ok(())
                }
            }

            Stmt::Loop(var, range, body) => {
                let (lo, hi) = self.eval_range(range)?;
                for i in lo..hi {
                    let env = Env::with_parent(self.env.clone()).wrap();
                    env.lock().unwrap().define(var.clone(), Value::Number(i as f64));
                    Evaluator::with_env(env, self.sink.clone()).exec_block(body)?;
                }
                Ok(())
            }

            Stmt::ParallelLoop(var, range, body) => {
                let (lo, hi) = self.eval_range(range)?;
                let branches = (lo..hi)
                    .map(|i| {
                        let env = Env::with_parent(self.env.clone()).wrap();
                        env.lock().unwrap().define(var.clone(), Value::Number(i as f64));
                        (env, Branch::Block(body))
                    })
                    .collect();
                self.join_branches(branches)
            }

            Stmt::Parallel(body) => {
                let branches = body
                    .stmts
                    .iter()
                    .map(|child| {
                        let env = Env::with_parent(self.env.clone()).wrap();
                        (env, Branch::Stmt(child))
                    })
                    .collect();
                self.join_branches(branches)
            }

            Stmt::Block(body) => self.exec_block(body),

            Stmt::Sequence(head, tail) => {
                self.exec_stmt(head)?;
                self.exec_stmt(tail)
            }

            Stmt::Timed(label, target) => {
                // On a definition the label attaches to the function
                // value; each invocation is then timed.
                if let Stmt::FuncDef(name, params, body) = &target.node {
                    self.define_func(name, params, body, Some(label.clone()));
                    return Ok(());
                }

                let start = Instant::now();
                let result = self.exec_stmt(target);
                self.emit_timed(label, start);
                result
            }

            Stmt::Expr(expr) => {
                self.eval_expr(expr)?;
                Ok(())
            }
        }
    }

    /// Execute the statements of a block in the current scope
    fn exec_block(&self, block: &Block) -> Result<(), EvalError> {
        for stmt in &block.stmts {
            self.exec_stmt(stmt)?;
        }
        Ok(())
    }

    fn define_func(&self, name: &str, params: &[String], body: &Block, timed: Option<String>) {
        let func = FuncDef::new(
            name.to_string(),
            params.to_vec(),
            body.clone(),
            self.env.clone(),
            timed,
        );
        self.env
            .lock()
            .unwrap()
            .define(name.to_string(), Value::Func(Arc::new(func)));
    }

    /// Evaluate an expression
    pub fn eval_expr(&self, expr: &Node<Expr>) -> Result<Value, EvalError> {
        let loc = expr.loc;

        match &expr.node {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Bool(b) => Ok(Value::Bool(*b)),

            Expr::Ident(name) => self.env.lock().unwrap().get(name).ok_or_else(|| {
                EvalError::name(format!("name '{}' is not defined", name), loc.line, loc.column)
            }),

            Expr::Unary(op, operand) => {
                let value = self.eval_expr(operand)?;
                match op {
                    UnaryOp::Not => {
                        let b = self.expect_bool(value, "operand of '!'", operand.loc)?;
                        Ok(Value::Bool(!b))
                    }
                    UnaryOp::Neg => match value {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        other => Err(EvalError::runtime(
                            format!("cannot negate {}", other),
                            loc.line,
                            loc.column,
                        )),
                    },
                }
            }

            Expr::Binary(op, lhs, rhs) => match op {
                // Short-circuit operators
                BinOp::And | BinOp::Or => {
                    let lhs_val = self.eval_expr(lhs)?;
                    let lhs_bool = self.expect_bool(lhs_val, "operand of logical operator", lhs.loc)?;
                    match (op, lhs_bool) {
                        (BinOp::And, false) => Ok(Value::Bool(false)),
                        (BinOp::Or, true) => Ok(Value::Bool(true)),
                        _ => {
                            let rhs_val = self.eval_expr(rhs)?;
                            let rhs_bool =
                                self.expect_bool(rhs_val, "operand of logical operator", rhs.loc)?;
                            Ok(Value::Bool(rhs_bool))
                        }
                    }
                }
                _ => {
                    let lhs_val = self.eval_expr(lhs)?;
                    let rhs_val = self.eval_expr(rhs)?;
                    self.eval_binop(*op, lhs_val, rhs_val, loc.line, loc.column)
                }
            },

            Expr::Call(callee, args) => {
                let callee_val = self.eval_expr(callee)?;
                let mut arg_values = Vec::new();
                for arg in args {
                    arg_values.push(self.eval_expr(arg)?);
                }
                self.eval_call(callee_val, arg_values, loc)
            }

            Expr::MethodCall(receiver, name, args) => {
                let receiver_val = self.eval_expr(receiver)?;
                let mut arg_values = Vec::new();
                for arg in args {
                    arg_values.push(self.eval_expr(arg)?);
                }
                self.eval_method_call(receiver_val, name, arg_values, loc)
            }
        }
    }

    fn eval_call(&self, callee: Value, args: Vec<Value>, loc: Loc) -> Result<Value, EvalError> {
        match callee {
            Value::Func(func) => self.call_func(&func, args, loc),

            Value::Builtin(name) => {
                builtin::call_builtin(&name, args, &self.sink, loc.line, loc.column)
            }

            Value::TaskUnit(unit) => {
                if !args.is_empty() {
                    return Err(EvalError::runtime(
                        format!("taskunit constructor {} takes no arguments", unit.name),
                        loc.line,
                        loc.column,
                    ));
                }
                Ok(Value::TaskInstance(TaskInstance::new(unit)))
            }

            other => Err(EvalError::runtime(
                format!("{} is not callable", other),
                loc.line,
                loc.column,
            )),
        }
    }

    /// Invoke a user function in a child of its defining environment
    fn call_func(&self, func: &Arc<FuncDef>, args: Vec<Value>, loc: Loc) -> Result<Value, EvalError> {
        if args.len() != func.params.len() {
            return Err(EvalError::runtime(
                format!(
                    "{} expects {} argument(s), got {}",
                    func.name,
                    func.params.len(),
                    args.len()
                ),
                loc.line,
                loc.column,
            ));
        }

        let env = Env::with_parent(func.closure.clone()).wrap();
        {
            let mut e = env.lock().unwrap();
            for (param, arg) in func.params.iter().zip(args) {
                e.define(param.clone(), arg);
            }
        }
        let body_eval = Evaluator::with_env(env, self.sink.clone());

        if let Some(label) = &func.timed {
            let start = Instant::now();
            let result = body_eval.exec_block(&func.body);
            self.emit_timed(label, start);
            result?;
        } else {
            body_eval.exec_block(&func.body)?;
        }
        Ok(Value::Unit)
    }

    fn eval_method_call(
        &self,
        receiver: Value,
        name: &str,
        args: Vec<Value>,
        loc: Loc,
    ) -> Result<Value, EvalError> {
        match receiver {
            Value::TaskGroup(group) => match name {
                "next" => {
                    if !args.is_empty() {
                        return Err(EvalError::runtime(
                            "next() takes no arguments",
                            loc.line,
                            loc.column,
                        ));
                    }
                    self.group_next(&group, loc)
                }
                _ => Err(EvalError::runtime(
                    format!("task group has no method '{}'", name),
                    loc.line,
                    loc.column,
                )),
            },

            Value::TaskInstance(instance) => {
                if !args.is_empty() {
                    return Err(EvalError::runtime(
                        "taskunit methods take no arguments",
                        loc.line,
                        loc.column,
                    ));
                }
                match instance.unit.method(name) {
                    Some(body) => {
                        let env = Env::with_parent(instance.env.clone()).wrap();
                        Evaluator::with_env(env, self.sink.clone()).exec_block(body)?;
                        Ok(Value::Unit)
                    }
                    None => Err(EvalError::runtime(
                        format!("{} has no method '{}'", instance.unit.name, name),
                        loc.line,
                        loc.column,
                    )),
                }
            }

            other => Err(EvalError::runtime(
                format!("{} does not support method calls", other),
                loc.line,
                loc.column,
            )),
        }
    }

    /// Barrier step of a parallelTasks group: run every member's current
    /// `stepK` concurrently, join, advance the cursor.
    fn group_next(&self, group: &TaskGroup, loc: Loc) -> Result<Value, EvalError> {
        let step = group.step();

        let runnable: Vec<(&TaskInstance, &Block)> = group
            .members()
            .iter()
            .filter_map(|member| member.step_body(step).map(|body| (member, body)))
            .collect();

        if runnable.is_empty() {
            return Err(EvalError::runtime(
                format!("task group exhausted: no member defines step{}", step),
                loc.line,
                loc.column,
            ));
        }

        let branches = runnable
            .into_iter()
            .map(|(member, body)| {
                let env = Env::with_parent(member.env.clone()).wrap();
                (env, Branch::Block(body))
            })
            .collect();

        let result = self.join_branches(branches);
        group.advance();
        result.map(|_| Value::Unit)
    }

    /// Run branches on scoped threads and wait for all of them. Every
    /// branch runs to completion even when a sibling fails; the first
    /// error in join order is propagated.
    fn join_branches(&self, branches: Vec<(EnvRef, Branch<'_>)>) -> Result<(), EvalError> {
        let results: Vec<Result<(), EvalError>> = thread::scope(|scope| {
            let handles: Vec<_> = branches
                .into_iter()
                .map(|(env, branch)| {
                    let eval = Evaluator::with_env(env, self.sink.clone());
                    scope.spawn(move || match branch {
                        Branch::Stmt(stmt) => eval.exec_stmt(stmt),
                        Branch::Block(block) => eval.exec_block(block),
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|_| Err(EvalError::runtime("parallel branch panicked", 0, 0)))
                })
                .collect()
        });

        for result in results {
            result?;
        }
        Ok(())
    }

    fn eval_range(&self, range: &LoopRange) -> Result<(i64, i64), EvalError> {
        let lo = self.range_bound(&range.lo)?;
        let hi = self.range_bound(&range.hi)?;
        if lo > hi {
            return Err(EvalError::runtime(
                format!("invalid range: {} > {}", lo, hi),
                range.lo.loc.line,
                range.lo.loc.column,
            ));
        }
        Ok((lo, if range.inclusive { hi + 1 } else { hi }))
    }

    fn range_bound(&self, expr: &Node<Expr>) -> Result<i64, EvalError> {
        match self.eval_expr(expr)? {
            Value::Number(n) if n.fract() == 0.0 => Ok(n as i64),
            other => Err(EvalError::runtime(
                format!("loop bounds must be integers, got {}", other),
                expr.loc.line,
                expr.loc.column,
            )),
        }
    }

    fn expect_bool(&self, value: Value, what: &str, loc: Loc) -> Result<bool, EvalError> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(EvalError::runtime(
                format!("{} must be a boolean, got {}", what, other),
                loc.line,
                loc.column,
            )),
        }
    }

    fn eval_binop(
        &self,
        op: BinOp,
        lhs: Value,
        rhs: Value,
        line: usize,
        col: usize,
    ) -> Result<Value, EvalError> {
        match op {
            BinOp::Add => match (lhs, rhs) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b)),
                _ => Err(EvalError::runtime("type mismatch for '+'", line, col)),
            },
            BinOp::Sub => match (lhs, rhs) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),
                _ => Err(EvalError::runtime("type mismatch for '-'", line, col)),
            },
            BinOp::Mul => match (lhs, rhs) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),
                _ => Err(EvalError::runtime("type mismatch for '*'", line, col)),
            },
            BinOp::Div => match (lhs, rhs) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a / b)),
                _ => Err(EvalError::runtime("type mismatch for '/'", line, col)),
            },
            BinOp::Eq => Ok(Value::Bool(lhs == rhs)),
            BinOp::Neq => Ok(Value::Bool(lhs != rhs)),
            BinOp::Lt => match (lhs, rhs) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a < b)),
                (Value::Str(a), Value::Str(b)) => Ok(Value::Bool(a < b)),
                _ => Err(EvalError::runtime("type mismatch for '<'", line, col)),
            },
            BinOp::Gt => match (lhs, rhs) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a > b)),
                (Value::Str(a), Value::Str(b)) => Ok(Value::Bool(a > b)),
                _ => Err(EvalError::runtime("type mismatch for '>'", line, col)),
            },
            BinOp::Le => match (lhs, rhs) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a <= b)),
                (Value::Str(a), Value::Str(b)) => Ok(Value::Bool(a <= b)),
                _ => Err(EvalError::runtime("type mismatch for '<='", line, col)),
            },
            BinOp::Ge => match (lhs, rhs) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a >= b)),
                (Value::Str(a), Value::Str(b)) => Ok(Value::Bool(a >= b)),
                _ => Err(EvalError::runtime("type mismatch for '>='", line, col)),
            },
            // Handled in eval_expr so they can short-circuit
            BinOp::And | BinOp::Or => {
                Err(EvalError::runtime("logical operators require booleans", line, col))
            }
        }
    }

    fn emit_timed(&self, label: &str, start: Instant) {
        self.sink
            .write_line(&format!("[TIMED: {}] {:.4}s", label, start.elapsed().as_secs_f64()));
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

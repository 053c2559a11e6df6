//! DICE - a small imperative language with structured parallelism
//!
//! Programs compose `parallel` and sequential fragments freely with the
//! `->` operator, nest them arbitrarily, and attach `@timed` annotations
//! to measure the wall-clock duration of any fragment.

pub mod ast;
pub mod builtin;
pub mod lexer;
pub mod parser;
pub mod report;
pub mod runtime;

// Re-export for public API
pub use runtime::{Env, EvalError, Evaluator, FuncDef, Value};

use ast::Program;
use lexer::Lexer;
use parser::Parser;
use runtime::Sink;

/// Result type for DICE operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for DICE operations
#[derive(Debug, Clone)]
pub enum Error {
    Lex(String),
    Parse(String),
    Eval(String),
    Io(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Lex(msg) => write!(f, "LexError: {}", msg),
            Error::Parse(msg) => write!(f, "ParseError: {}", msg),
            // EvalError messages already name their kind
            Error::Eval(msg) => write!(f, "{}", msg),
            Error::Io(msg) => write!(f, "IOError: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

/// Output captured from running DICE code
#[derive(Debug, Clone, Default)]
pub struct Output {
    pub stdout: String,
}

/// Run DICE source code and capture its output
pub fn run_code(code: &str) -> Result<Output> {
    let program = parse(code)?;

    let sink = Sink::buffer();
    let evaluator = Evaluator::with_sink(sink.clone());
    evaluator
        .eval_program(&program)
        .map_err(|e| Error::Eval(e.to_string()))?;
    Ok(Output { stdout: sink.contents() })
}

/// Run a DICE file and capture its output
pub fn run_file(path: &str) -> Result<Output> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Io(format!("cannot open '{}': {}", path, e)))?;
    run_code(&content)
}

/// Run code writing straight to stdout (for CLI use)
pub fn run_code_direct(code: &str) -> Result<()> {
    let program = parse(code)?;
    Evaluator::new()
        .eval_program(&program)
        .map_err(|e| Error::Eval(e.to_string()))
}

/// Check syntax without executing
pub fn check_syntax(code: &str) -> Result<()> {
    parse(code).map(|_| ())
}

fn parse(code: &str) -> Result<Program> {
    let tokens = Lexer::new(code)
        .tokenize()
        .map_err(|e| Error::Lex(e.to_string()))?;
    Parser::new(tokens)
        .parse_program()
        .map_err(|e| Error::Parse(e.to_string()))
}

//! DICE Abstract Syntax Tree
//!
//! Defines the structure of parsed DICE programs. Nodes are immutable
//! after parsing; all mutable state lives in the runtime.

use std::fmt;

/// Source location for error reporting
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Loc {
    pub line: usize,
    pub column: usize,
}

impl Loc {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// AST node with location
#[derive(Debug, Clone, PartialEq)]
pub struct Node<T> {
    pub node: T,
    pub loc: Loc,
}

impl<T> Node<T> {
    pub fn new(node: T, loc: Loc) -> Self {
        Self { node, loc }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinOp {
    Add, // +
    Sub, // -
    Mul, // *
    Div, // /

    Eq,  // ==
    Neq, // !=
    Lt,  // <
    Gt,  // >
    Le,  // <=
    Ge,  // >=

    And, // &&
    Or,  // ||
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    Not, // !
    Neg, // -
}

/// Expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Number literal (IEEE-754 double)
    Number(f64),

    /// String literal
    Str(String),

    /// Boolean literal
    Bool(bool),

    /// Name reference
    Ident(String),

    /// Binary operation: a + b
    Binary(BinOp, Box<Node<Expr>>, Box<Node<Expr>>),

    /// Unary operation: !cond, -n
    Unary(UnaryOp, Box<Node<Expr>>),

    /// Call: callee(args)
    Call(Box<Node<Expr>>, Vec<Node<Expr>>),

    /// Method call: receiver.name(args)
    MethodCall(Box<Node<Expr>>, String, Vec<Node<Expr>>),
}

/// An ordered list of statements, as found between `{` and `}`
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Node<Stmt>>,
}

impl Block {
    pub fn new(stmts: Vec<Node<Stmt>>) -> Self {
        Self { stmts }
    }
}

/// Bounds of a `loop`/`p loop` iteration: `lo..hi` or `lo..=hi`
#[derive(Debug, Clone, PartialEq)]
pub struct LoopRange {
    pub lo: Node<Expr>,
    pub hi: Node<Expr>,
    pub inclusive: bool,
}

/// Statement
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Function definition: func name(params) { body }
    FuncDef(String, Vec<String>, Block),

    /// Task unit definition: taskunit Name { step1() {..} step2() {..} }
    /// Methods are zero-arg and kept in declaration order.
    TaskUnitDef(String, Vec<(String, Block)>),

    /// Assignment: name = expr
    Assign(String, Node<Expr>),

    /// Conditional: if (cond) { then } else { otherwise }
    If(Node<Expr>, Block, Option<Block>),

    /// Sequential loop: loop v in lo..hi { body }
    Loop(String, LoopRange, Block),

    /// Parallel loop: p loop v in lo..hi { body }, one branch per value
    ParallelLoop(String, LoopRange, Block),

    /// Parallel block: p { ... }, one branch per immediate child
    Parallel(Block),

    /// Plain block used as a sequence unit: { ... }
    Block(Block),

    /// Sequencing: head -> tail (right-leaning chains)
    Sequence(Box<Node<Stmt>>, Box<Node<Stmt>>),

    /// Timed annotation: @timed("label") target
    Timed(String, Box<Node<Stmt>>),

    /// Expression statement (usually a call)
    Expr(Node<Expr>),
}

/// A complete DICE program
#[derive(Debug, Clone)]
pub struct Program {
    pub body: Block,
}

impl Program {
    pub fn new(body: Block) -> Self {
        Self { body }
    }
}

//! DICE Parser
//!
//! Parses tokens into an Abstract Syntax Tree.
//!
//! The grammar is layered: `->` is not an expression operator. It lives
//! at the statement layer, where it chains sequence units — plain calls,
//! assignments, and block expressions (`{..}`, `p {..}`, `if (..) {..}`,
//! `loop .. {..}`, `p loop .. {..}`).

use crate::ast::*;
use crate::lexer::{Lexer, SpannedToken, Token};

/// Parser error
#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error at {}:{}: {}", self.line, self.column, self.message)
    }
}

impl ParseError {
    fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            line,
            column,
        }
    }
}

/// Parser for DICE
pub struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<SpannedToken>) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Parse from source code
    pub fn parse_source(source: &str) -> Result<Program, ParseError> {
        let mut lexer = Lexer::new(source);
        let tokens = lexer
            .tokenize()
            .map_err(|e| ParseError::new(e.message, e.span.line, e.span.column))?;

        let mut parser = Parser::new(tokens);
        parser.parse_program()
    }

    /// Get current token (cloned to avoid borrow issues)
    fn current(&self) -> Token {
        self.tokens
            .get(self.pos)
            .map(|t| t.token.clone())
            .unwrap_or(Token::Eof)
    }

    /// Look ahead of the current token
    fn peek_at(&self, offset: usize) -> Token {
        self.tokens
            .get(self.pos + offset)
            .map(|t| t.token.clone())
            .unwrap_or(Token::Eof)
    }

    /// Get current location
    fn current_loc(&self) -> Loc {
        self.tokens
            .get(self.pos)
            .map(|t| Loc::new(t.span.line, t.span.column))
            .unwrap_or_else(|| Loc::new(0, 0))
    }

    /// Advance to next token
    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    /// Check if current token matches
    fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(&self.current()) == std::mem::discriminant(token)
    }

    /// Consume token if it matches, error otherwise
    fn expect(&mut self, expected: &Token) -> Result<(), ParseError> {
        if self.check(expected) {
            self.advance();
            Ok(())
        } else {
            let loc = self.current_loc();
            Err(ParseError::new(
                format!("expected {:?}, got {:?}", expected, self.current()),
                loc.line,
                loc.column,
            ))
        }
    }

    /// Consume an identifier and return its name
    fn expect_ident(&mut self) -> Result<String, ParseError> {
        match self.current() {
            Token::Ident(name) => {
                self.advance();
                Ok(name)
            }
            other => {
                let loc = self.current_loc();
                Err(ParseError::new(
                    format!("expected identifier, got {:?}", other),
                    loc.line,
                    loc.column,
                ))
            }
        }
    }

    /// Parse a complete program
    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut stmts = Vec::new();

        while !self.check(&Token::Eof) {
            stmts.push(self.parse_stmt()?);
        }

        Ok(Program::new(Block::new(stmts)))
    }

    /// Parse a statement, discarding an optional trailing `;`
    fn parse_stmt(&mut self) -> Result<Node<Stmt>, ParseError> {
        let stmt = match self.current() {
            Token::Func => self.parse_func_def()?,
            Token::TaskUnit => self.parse_task_unit_def()?,
            Token::At => self.parse_annotated()?,
            _ => self.parse_seq_stmt()?,
        };

        if self.check(&Token::Semicolon) {
            self.advance();
        }

        Ok(stmt)
    }

    /// Function definition: func name(params) { body }
    fn parse_func_def(&mut self) -> Result<Node<Stmt>, ParseError> {
        let loc = self.current_loc();
        self.expect(&Token::Func)?;
        let name = self.expect_ident()?;

        self.expect(&Token::LParen)?;
        let mut params = Vec::new();
        if !self.check(&Token::RParen) {
            params.push(self.expect_ident()?);
            while self.check(&Token::Comma) {
                self.advance();
                params.push(self.expect_ident()?);
            }
        }
        self.expect(&Token::RParen)?;

        let body = self.parse_block()?;
        Ok(Node::new(Stmt::FuncDef(name, params, body), loc))
    }

    /// Task unit definition: taskunit Name { step1() {..} step2() {..} }
    fn parse_task_unit_def(&mut self) -> Result<Node<Stmt>, ParseError> {
        let loc = self.current_loc();
        self.expect(&Token::TaskUnit)?;
        let name = self.expect_ident()?;
        self.expect(&Token::LBrace)?;

        let mut methods = Vec::new();
        while !self.check(&Token::RBrace) && !self.check(&Token::Eof) {
            let method = self.expect_ident()?;
            self.expect(&Token::LParen)?;
            self.expect(&Token::RParen)?;
            let body = self.parse_block()?;
            methods.push((method, body));
        }

        self.expect(&Token::RBrace)?;
        Ok(Node::new(Stmt::TaskUnitDef(name, methods), loc))
    }

    /// Annotated statement: @timed("label")? stmt
    fn parse_annotated(&mut self) -> Result<Node<Stmt>, ParseError> {
        let loc = self.current_loc();
        self.expect(&Token::At)?;

        match self.current() {
            Token::Ident(name) if name == "timed" => self.advance(),
            other => {
                let at = self.current_loc();
                return Err(ParseError::new(
                    format!("expected 'timed' after '@', got {:?}", other),
                    at.line,
                    at.column,
                ));
            }
        }

        let mut label = None;
        if self.check(&Token::LParen) {
            self.advance();
            match self.current() {
                Token::Str(s) => {
                    self.advance();
                    label = Some(s);
                }
                other => {
                    let at = self.current_loc();
                    return Err(ParseError::new(
                        format!("expected string label in @timed(...), got {:?}", other),
                        at.line,
                        at.column,
                    ));
                }
            }
            self.expect(&Token::RParen)?;
        }

        let target = self.parse_stmt()?;
        if matches!(target.node, Stmt::Timed(..)) {
            return Err(ParseError::new(
                "@timed may not wrap another @timed",
                target.loc.line,
                target.loc.column,
            ));
        }

        let label = label.unwrap_or_else(|| derive_timed_label(&target.node));
        Ok(Node::new(Stmt::Timed(label, Box::new(target)), loc))
    }

    /// Sequence statement: unit ('->' unit)*, folded into a
    /// right-leaning chain
    fn parse_seq_stmt(&mut self) -> Result<Node<Stmt>, ParseError> {
        let mut units = vec![self.parse_seq_unit()?];
        while self.check(&Token::Arrow) {
            self.advance();
            units.push(self.parse_seq_unit()?);
        }

        let mut rev = units.into_iter().rev();
        let mut node = match rev.next() {
            Some(n) => n,
            None => unreachable!("sequence always has at least one unit"),
        };
        for unit in rev {
            let loc = unit.loc;
            node = Node::new(Stmt::Sequence(Box::new(unit), Box::new(node)), loc);
        }
        Ok(node)
    }

    /// One operand of `->`: a block expression, an assignment, or an
    /// ordinary expression
    fn parse_seq_unit(&mut self) -> Result<Node<Stmt>, ParseError> {
        let loc = self.current_loc();

        match self.current() {
            Token::Parallel => {
                self.advance();
                match self.current() {
                    Token::Loop => self.parse_loop_tail(true, loc),
                    Token::LBrace => {
                        let body = self.parse_block()?;
                        Ok(Node::new(Stmt::Parallel(body), loc))
                    }
                    other => Err(ParseError::new(
                        format!("expected 'loop' or '{{' after 'parallel', got {:?}", other),
                        loc.line,
                        loc.column,
                    )),
                }
            }

            Token::Loop => self.parse_loop_tail(false, loc),

            Token::If => self.parse_if(),

            Token::LBrace => {
                let body = self.parse_block()?;
                Ok(Node::new(Stmt::Block(body), loc))
            }

            // Assignment needs two tokens of lookahead: `x = ...` vs `x(...)`
            Token::Ident(name) if self.peek_at(1) == Token::Assign => {
                self.advance();
                self.advance();
                let value = self.parse_expr()?;
                Ok(Node::new(Stmt::Assign(name, value), loc))
            }

            _ => {
                let expr = self.parse_expr()?;
                Ok(Node::new(Stmt::Expr(expr), loc))
            }
        }
    }

    /// Loop tail, after the `p` (if any) has been consumed:
    /// loop v in lo..hi { body }
    fn parse_loop_tail(&mut self, parallel: bool, loc: Loc) -> Result<Node<Stmt>, ParseError> {
        self.expect(&Token::Loop)?;
        let var = self.expect_ident()?;
        self.expect(&Token::In)?;
        let lo = self.parse_expr()?;

        let inclusive = match self.current() {
            Token::DotDot => {
                self.advance();
                false
            }
            Token::DotDotEq => {
                self.advance();
                true
            }
            other => {
                let at = self.current_loc();
                return Err(ParseError::new(
                    format!("expected '..' or '..=' in loop range, got {:?}", other),
                    at.line,
                    at.column,
                ));
            }
        };

        let hi = self.parse_expr()?;
        let body = self.parse_block()?;
        let range = LoopRange { lo, hi, inclusive };

        let stmt = if parallel {
            Stmt::ParallelLoop(var, range, body)
        } else {
            Stmt::Loop(var, range, body)
        };
        Ok(Node::new(stmt, loc))
    }

    /// if (cond) { then } else { otherwise }
    fn parse_if(&mut self) -> Result<Node<Stmt>, ParseError> {
        let loc = self.current_loc();
        self.expect(&Token::If)?;
        self.expect(&Token::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(&Token::RParen)?;
        let then = self.parse_block()?;

        let otherwise = if self.check(&Token::Else) {
            self.advance();
            Some(self.parse_block()?)
        } else {
            None
        };

        Ok(Node::new(Stmt::If(cond, then, otherwise), loc))
    }

    /// { stmt* }
    fn parse_block(&mut self) -> Result<Block, ParseError> {
        self.expect(&Token::LBrace)?;
        let mut stmts = Vec::new();
        while !self.check(&Token::RBrace) && !self.check(&Token::Eof) {
            stmts.push(self.parse_stmt()?);
        }
        self.expect(&Token::RBrace)?;
        Ok(Block::new(stmts))
    }

    // --- Expressions (classic precedence climbing) ---

    fn parse_expr(&mut self) -> Result<Node<Expr>, ParseError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Node<Expr>, ParseError> {
        let mut node = self.parse_and()?;
        while self.check(&Token::OrOr) {
            let loc = node.loc;
            self.advance();
            let rhs = self.parse_and()?;
            node = Node::new(Expr::Binary(BinOp::Or, Box::new(node), Box::new(rhs)), loc);
        }
        Ok(node)
    }

    fn parse_and(&mut self) -> Result<Node<Expr>, ParseError> {
        let mut node = self.parse_equality()?;
        while self.check(&Token::AndAnd) {
            let loc = node.loc;
            self.advance();
            let rhs = self.parse_equality()?;
            node = Node::new(Expr::Binary(BinOp::And, Box::new(node), Box::new(rhs)), loc);
        }
        Ok(node)
    }

    fn parse_equality(&mut self) -> Result<Node<Expr>, ParseError> {
        let mut node = self.parse_comparison()?;
        loop {
            let op = match self.current() {
                Token::EqEq => BinOp::Eq,
                Token::NotEq => BinOp::Neq,
                _ => break,
            };
            let loc = node.loc;
            self.advance();
            let rhs = self.parse_comparison()?;
            node = Node::new(Expr::Binary(op, Box::new(node), Box::new(rhs)), loc);
        }
        Ok(node)
    }

    fn parse_comparison(&mut self) -> Result<Node<Expr>, ParseError> {
        let mut node = self.parse_term()?;
        loop {
            let op = match self.current() {
                Token::Lt => BinOp::Lt,
                Token::Le => BinOp::Le,
                Token::Gt => BinOp::Gt,
                Token::Ge => BinOp::Ge,
                _ => break,
            };
            let loc = node.loc;
            self.advance();
            let rhs = self.parse_term()?;
            node = Node::new(Expr::Binary(op, Box::new(node), Box::new(rhs)), loc);
        }
        Ok(node)
    }

    fn parse_term(&mut self) -> Result<Node<Expr>, ParseError> {
        let mut node = self.parse_factor()?;
        loop {
            let op = match self.current() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break,
            };
            let loc = node.loc;
            self.advance();
            let rhs = self.parse_factor()?;
            node = Node::new(Expr::Binary(op, Box::new(node), Box::new(rhs)), loc);
        }
        Ok(node)
    }

    fn parse_factor(&mut self) -> Result<Node<Expr>, ParseError> {
        let mut node = self.parse_unary()?;
        loop {
            let op = match self.current() {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                _ => break,
            };
            let loc = node.loc;
            self.advance();
            let rhs = self.parse_unary()?;
            node = Node::new(Expr::Binary(op, Box::new(node), Box::new(rhs)), loc);
        }
        Ok(node)
    }

    fn parse_unary(&mut self) -> Result<Node<Expr>, ParseError> {
        let loc = self.current_loc();
        let op = match self.current() {
            Token::Bang => UnaryOp::Not,
            Token::Minus => UnaryOp::Neg,
            _ => return self.parse_postfix(),
        };
        self.advance();
        let operand = self.parse_unary()?;
        Ok(Node::new(Expr::Unary(op, Box::new(operand)), loc))
    }

    /// Postfix: calls and method calls
    fn parse_postfix(&mut self) -> Result<Node<Expr>, ParseError> {
        let mut node = self.parse_primary()?;

        loop {
            match self.current() {
                Token::LParen => {
                    let loc = node.loc;
                    let args = self.parse_args()?;
                    node = Node::new(Expr::Call(Box::new(node), args), loc);
                }
                Token::Dot => {
                    let loc = node.loc;
                    self.advance();
                    let name = self.expect_ident()?;
                    if !self.check(&Token::LParen) {
                        let at = self.current_loc();
                        return Err(ParseError::new(
                            format!("expected '(' after '.{}', got {:?}", name, self.current()),
                            at.line,
                            at.column,
                        ));
                    }
                    let args = self.parse_args()?;
                    node = Node::new(Expr::MethodCall(Box::new(node), name, args), loc);
                }
                _ => break,
            }
        }

        Ok(node)
    }

    fn parse_args(&mut self) -> Result<Vec<Node<Expr>>, ParseError> {
        self.expect(&Token::LParen)?;
        let mut args = Vec::new();
        if !self.check(&Token::RParen) {
            args.push(self.parse_expr()?);
            while self.check(&Token::Comma) {
                self.advance();
                args.push(self.parse_expr()?);
            }
        }
        self.expect(&Token::RParen)?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Node<Expr>, ParseError> {
        let loc = self.current_loc();

        match self.current() {
            Token::Number(n) => {
                self.advance();
                Ok(Node::new(Expr::Number(n), loc))
            }
            Token::Str(s) => {
                self.advance();
                Ok(Node::new(Expr::Str(s), loc))
            }
            Token::True => {
                self.advance();
                Ok(Node::new(Expr::Bool(true), loc))
            }
            Token::False => {
                self.advance();
                Ok(Node::new(Expr::Bool(false), loc))
            }
            Token::Ident(name) => {
                self.advance();
                Ok(Node::new(Expr::Ident(name), loc))
            }
            Token::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(expr)
            }
            other => Err(ParseError::new(
                format!("expected expression, got {:?}", other),
                loc.line,
                loc.column,
            )),
        }
    }
}

/// Default label for `@timed` without an argument
fn derive_timed_label(stmt: &Stmt) -> String {
    match stmt {
        Stmt::FuncDef(..) => "function".to_string(),
        Stmt::Parallel(_) | Stmt::ParallelLoop(..) => "parallel".to_string(),
        Stmt::Block(_) => "block".to_string(),
        Stmt::If(..) => "if".to_string(),
        Stmt::Loop(..) => "loop".to_string(),
        Stmt::Sequence(..) => "sequence".to_string(),
        Stmt::Assign(..) => "assign".to_string(),
        Stmt::TaskUnitDef(..) => "taskunit".to_string(),
        Stmt::Timed(..) => "timed".to_string(),
        Stmt::Expr(expr) => match &expr.node {
            Expr::Call(callee, _) => match &callee.node {
                Expr::Ident(name) => name.clone(),
                _ => "expr".to_string(),
            },
            Expr::MethodCall(_, name, _) => name.clone(),
            _ => "expr".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Program {
        Parser::parse_source(source).unwrap_or_else(|e| panic!("parse failed for {:?}: {}", source, e))
    }

    fn parse_err(source: &str) -> ParseError {
        Parser::parse_source(source).unwrap_err()
    }

    /// First statement of the parsed program
    fn first_stmt(source: &str) -> Stmt {
        let program = parse(source);
        program.body.stmts.into_iter().next().expect("empty program").node
    }

    #[test]
    fn test_empty_func_def() {
        match first_stmt("func main() { }") {
            Stmt::FuncDef(name, params, body) => {
                assert_eq!(name, "main");
                assert!(params.is_empty());
                assert!(body.stmts.is_empty());
            }
            other => panic!("expected FuncDef, got {:?}", other),
        }
    }

    #[test]
    fn test_func_def_params() {
        match first_stmt("func add(a, b) { }") {
            Stmt::FuncDef(_, params, _) => assert_eq!(params, vec!["a", "b"]),
            other => panic!("expected FuncDef, got {:?}", other),
        }
    }

    #[test]
    fn test_sequence_is_right_leaning() {
        match first_stmt("a() -> b() -> c();") {
            Stmt::Sequence(head, tail) => {
                assert!(matches!(head.node, Stmt::Expr(_)));
                match tail.node {
                    Stmt::Sequence(inner_head, inner_tail) => {
                        assert!(matches!(inner_head.node, Stmt::Expr(_)));
                        assert!(matches!(inner_tail.node, Stmt::Expr(_)));
                    }
                    other => panic!("expected nested Sequence, got {:?}", other),
                }
            }
            other => panic!("expected Sequence, got {:?}", other),
        }
    }

    #[test]
    fn test_parallel_block() {
        match first_stmt("p { a(); b(); }") {
            Stmt::Parallel(body) => assert_eq!(body.stmts.len(), 2),
            other => panic!("expected Parallel, got {:?}", other),
        }
    }

    #[test]
    fn test_parallel_keyword_synonym() {
        assert_eq!(first_stmt("p { }"), first_stmt("parallel { }"));
    }

    #[test]
    fn test_parallel_block_chained() {
        match first_stmt("p { a(); } -> b();") {
            Stmt::Sequence(head, tail) => {
                assert!(matches!(head.node, Stmt::Parallel(_)));
                assert!(matches!(tail.node, Stmt::Expr(_)));
            }
            other => panic!("expected Sequence, got {:?}", other),
        }
    }

    #[test]
    fn test_plain_block_chained() {
        match first_stmt("{ a(); } -> b();") {
            Stmt::Sequence(head, _) => assert!(matches!(head.node, Stmt::Block(_))),
            other => panic!("expected Sequence, got {:?}", other),
        }
    }

    #[test]
    fn test_loop() {
        match first_stmt("loop i in 0..3 { print(i); }") {
            Stmt::Loop(var, range, body) => {
                assert_eq!(var, "i");
                assert!(!range.inclusive);
                assert_eq!(body.stmts.len(), 1);
            }
            other => panic!("expected Loop, got {:?}", other),
        }
    }

    #[test]
    fn test_inclusive_loop() {
        match first_stmt("loop i in 0..=3 { }") {
            Stmt::Loop(_, range, _) => assert!(range.inclusive),
            other => panic!("expected Loop, got {:?}", other),
        }
    }

    #[test]
    fn test_parallel_loop() {
        match first_stmt("p loop i in 0..4 { }") {
            Stmt::ParallelLoop(var, range, _) => {
                assert_eq!(var, "i");
                assert!(!range.inclusive);
            }
            other => panic!("expected ParallelLoop, got {:?}", other),
        }
    }

    #[test]
    fn test_if_else() {
        match first_stmt("if (x > 1) { a(); } else { b(); }") {
            Stmt::If(cond, then, otherwise) => {
                assert!(matches!(cond.node, Expr::Binary(BinOp::Gt, _, _)));
                assert_eq!(then.stmts.len(), 1);
                assert!(otherwise.is_some());
            }
            other => panic!("expected If, got {:?}", other),
        }
    }

    #[test]
    fn test_if_without_else() {
        match first_stmt("if (true) { }") {
            Stmt::If(_, _, otherwise) => assert!(otherwise.is_none()),
            other => panic!("expected If, got {:?}", other),
        }
    }

    #[test]
    fn test_assignment() {
        match first_stmt("x = 1 + 2;") {
            Stmt::Assign(name, value) => {
                assert_eq!(name, "x");
                assert!(matches!(value.node, Expr::Binary(BinOp::Add, _, _)));
            }
            other => panic!("expected Assign, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence() {
        match first_stmt("x = 1 + 2 * 3;") {
            Stmt::Assign(_, value) => match value.node {
                Expr::Binary(BinOp::Add, lhs, rhs) => {
                    assert_eq!(lhs.node, Expr::Number(1.0));
                    assert!(matches!(rhs.node, Expr::Binary(BinOp::Mul, _, _)));
                }
                other => panic!("expected Add at the top, got {:?}", other),
            },
            other => panic!("expected Assign, got {:?}", other),
        }
    }

    #[test]
    fn test_unary() {
        match first_stmt("x = !true;") {
            Stmt::Assign(_, value) => assert!(matches!(value.node, Expr::Unary(UnaryOp::Not, _))),
            other => panic!("expected Assign, got {:?}", other),
        }
        match first_stmt("x = -5;") {
            Stmt::Assign(_, value) => assert!(matches!(value.node, Expr::Unary(UnaryOp::Neg, _))),
            other => panic!("expected Assign, got {:?}", other),
        }
    }

    #[test]
    fn test_grouping() {
        match first_stmt("x = (1 + 2) * 3;") {
            Stmt::Assign(_, value) => match value.node {
                Expr::Binary(BinOp::Mul, lhs, _) => {
                    assert!(matches!(lhs.node, Expr::Binary(BinOp::Add, _, _)));
                }
                other => panic!("expected Mul at the top, got {:?}", other),
            },
            other => panic!("expected Assign, got {:?}", other),
        }
    }

    #[test]
    fn test_call_args() {
        match first_stmt("print(\"a\", 1, x);") {
            Stmt::Expr(expr) => match expr.node {
                Expr::Call(callee, args) => {
                    assert_eq!(callee.node, Expr::Ident("print".to_string()));
                    assert_eq!(args.len(), 3);
                }
                other => panic!("expected Call, got {:?}", other),
            },
            other => panic!("expected Expr, got {:?}", other),
        }
    }

    #[test]
    fn test_method_call() {
        match first_stmt("group.next();") {
            Stmt::Expr(expr) => match expr.node {
                Expr::MethodCall(receiver, name, args) => {
                    assert_eq!(receiver.node, Expr::Ident("group".to_string()));
                    assert_eq!(name, "next");
                    assert!(args.is_empty());
                }
                other => panic!("expected MethodCall, got {:?}", other),
            },
            other => panic!("expected Expr, got {:?}", other),
        }
    }

    #[test]
    fn test_member_without_call_rejected() {
        let err = parse_err("group.next;");
        assert!(err.message.contains("expected '('"));
    }

    #[test]
    fn test_task_unit_def() {
        let src = "taskunit DeviceA { step1() { a(); } step2() { b(); } }";
        match first_stmt(src) {
            Stmt::TaskUnitDef(name, methods) => {
                assert_eq!(name, "DeviceA");
                let names: Vec<&str> = methods.iter().map(|(n, _)| n.as_str()).collect();
                assert_eq!(names, vec!["step1", "step2"]);
            }
            other => panic!("expected TaskUnitDef, got {:?}", other),
        }
    }

    #[test]
    fn test_timed_default_labels() {
        let cases = [
            ("@timed { wait(1); }", "block"),
            ("@timed p { }", "parallel"),
            ("@timed p loop i in 0..1 { }", "parallel"),
            ("@timed loop i in 0..1 { }", "loop"),
            ("@timed if (true) { }", "if"),
            ("@timed func f() { }", "function"),
            ("@timed my_func();", "my_func"),
            ("@timed group.next();", "next"),
            ("@timed x = 1;", "assign"),
            ("@timed a() -> b();", "sequence"),
        ];
        for (src, expected) in cases {
            match first_stmt(src) {
                Stmt::Timed(label, _) => assert_eq!(label, expected, "for {:?}", src),
                other => panic!("expected Timed for {:?}, got {:?}", src, other),
            }
        }
    }

    #[test]
    fn test_timed_custom_label() {
        match first_stmt("@timed(\"startup\") { }") {
            Stmt::Timed(label, target) => {
                assert_eq!(label, "startup");
                assert!(matches!(target.node, Stmt::Block(_)));
            }
            other => panic!("expected Timed, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_timed_rejected() {
        let err = parse_err("@timed @timed { }");
        assert!(err.message.contains("may not wrap"));
    }

    #[test]
    fn test_unknown_annotation_rejected() {
        let err = parse_err("@inline f();");
        assert!(err.message.contains("timed"));
    }

    #[test]
    fn test_missing_in_keyword() {
        let err = parse_err("loop i 0..3 { }");
        assert!(err.message.contains("expected"));
    }

    #[test]
    fn test_unexpected_token_reports_position() {
        let err = parse_err("func main() { ) }");
        assert_eq!(err.line, 1);
        assert!(err.column > 1);
        assert!(err.message.contains("expected"));
    }

    #[test]
    fn test_semicolons_are_optional_at_block_end() {
        // Last statement without `;`, earlier one with.
        let program = parse("func main() { a(); b() }");
        assert_eq!(program.body.stmts.len(), 1);
    }

    #[test]
    fn test_timed_applies_to_whole_chain() {
        match first_stmt("@timed(\"chain\") a() -> b();") {
            Stmt::Timed(_, target) => assert!(matches!(target.node, Stmt::Sequence(..))),
            other => panic!("expected Timed, got {:?}", other),
        }
    }
}

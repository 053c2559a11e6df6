//! DICE Lexer
//!
//! Tokenizes DICE source code into a stream of tokens.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

/// Token types for DICE
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Keywords
    Func,
    If,
    Else,
    Loop,
    In,
    Parallel, // `parallel` and its alias `p`
    TaskUnit,
    True,
    False,

    // Literals and names
    Ident(String),
    Number(f64),
    Str(String),

    // Punctuation
    LBrace,    // {
    RBrace,    // }
    LParen,    // (
    RParen,    // )
    Comma,     // ,
    Semicolon, // ;
    Dot,       // .
    DotDot,    // ..
    DotDotEq,  // ..=

    // Operators
    Assign, // =
    Arrow,  // ->
    Plus,   // +
    Minus,  // -
    Star,   // *
    Slash,  // /
    EqEq,   // ==
    NotEq,  // !=
    Lt,     // <
    Le,     // <=
    Gt,     // >
    Ge,     // >=
    AndAnd, // &&
    OrOr,   // ||
    Bang,   // !

    // Annotation sigil
    At, // @

    // Special
    Eof,
}

/// Span information for error reporting
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Span {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self { line, column, offset }
    }
}

/// Token with span information
#[derive(Debug, Clone)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}

/// Lexer error
#[derive(Debug, Clone)]
pub struct LexerError {
    pub message: String,
    pub span: Span,
}

impl fmt::Display for LexerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Lexer error at {}:{}: {}", self.span.line, self.span.column, self.message)
    }
}

/// Lexer for DICE
pub struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
    line: usize,
    column: usize,
    offset: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input: input.chars().peekable(),
            line: 1,
            column: 1,
            offset: 0,
        }
    }

    fn current_span(&self) -> Span {
        Span::new(self.line, self.column, self.offset)
    }

    fn peek(&mut self) -> Option<&char> {
        self.input.peek()
    }

    /// Peek one character past the current one
    fn peek_second(&self) -> Option<char> {
        let mut ahead = self.input.clone();
        ahead.next();
        ahead.next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.input.next()?;
        self.offset += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while let Some(&c) = self.peek() {
            if c.is_ascii_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn skip_comment(&mut self) {
        while let Some(&c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }

    /// Read a double-quoted string. The opening quote is already consumed.
    fn read_string(&mut self) -> Result<String, LexerError> {
        let start_span = self.current_span();
        let mut result = String::new();

        loop {
            match self.advance() {
                Some('"') => break,
                Some('\\') => match self.advance() {
                    Some('"') => result.push('"'),
                    Some('\\') => result.push('\\'),
                    Some(c) => {
                        return Err(LexerError {
                            message: format!("Invalid escape sequence: \\{}", c),
                            span: self.current_span(),
                        });
                    }
                    None => {
                        return Err(LexerError {
                            message: "Unterminated string".to_string(),
                            span: start_span,
                        });
                    }
                },
                Some(c) => result.push(c),
                None => {
                    return Err(LexerError {
                        message: "Unterminated string".to_string(),
                        span: start_span,
                    });
                }
            }
        }

        Ok(result)
    }

    fn read_number(&mut self, first: char) -> Result<Token, LexerError> {
        let mut num_str = String::new();
        num_str.push(first);

        while let Some(&c) = self.peek() {
            if c.is_ascii_digit() {
                num_str.push(c);
                self.advance();
            } else {
                break;
            }
        }

        // A '.' only belongs to the number when a digit follows; `0..3`
        // leaves the range operator untouched.
        if self.peek() == Some(&'.') {
            if let Some(second) = self.peek_second() {
                if second.is_ascii_digit() {
                    num_str.push('.');
                    self.advance();
                    while let Some(&c) = self.peek() {
                        if c.is_ascii_digit() {
                            num_str.push(c);
                            self.advance();
                        } else {
                            break;
                        }
                    }
                }
            }
        }

        let value: f64 = num_str.parse().map_err(|_| LexerError {
            message: format!("Invalid number: {}", num_str),
            span: self.current_span(),
        })?;
        Ok(Token::Number(value))
    }

    fn read_identifier(&mut self, first: char) -> Token {
        let mut ident = String::new();
        ident.push(first);

        while let Some(&c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                ident.push(c);
                self.advance();
            } else {
                break;
            }
        }

        // Reserved words
        match ident.as_str() {
            "func" => Token::Func,
            "if" => Token::If,
            "else" => Token::Else,
            "loop" => Token::Loop,
            "in" => Token::In,
            "parallel" | "p" => Token::Parallel,
            "taskunit" => Token::TaskUnit,
            "true" => Token::True,
            "false" => Token::False,
            _ => Token::Ident(ident),
        }
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Result<SpannedToken, LexerError> {
        self.skip_whitespace();

        let span = self.current_span();

        let c = match self.advance() {
            Some(c) => c,
            None => return Ok(SpannedToken { token: Token::Eof, span }),
        };

        let token = match c {
            '/' => match self.peek() {
                Some('/') => {
                    self.skip_comment();
                    return self.next_token();
                }
                _ => Token::Slash,
            },

            '-' => match self.peek() {
                Some('>') => {
                    self.advance();
                    Token::Arrow
                }
                _ => Token::Minus,
            },

            '.' => match self.peek() {
                Some('.') => {
                    self.advance();
                    if self.peek() == Some(&'=') {
                        self.advance();
                        Token::DotDotEq
                    } else {
                        Token::DotDot
                    }
                }
                _ => Token::Dot,
            },

            '=' => match self.peek() {
                Some('=') => {
                    self.advance();
                    Token::EqEq
                }
                _ => Token::Assign,
            },

            '!' => match self.peek() {
                Some('=') => {
                    self.advance();
                    Token::NotEq
                }
                _ => Token::Bang,
            },

            '<' => match self.peek() {
                Some('=') => {
                    self.advance();
                    Token::Le
                }
                _ => Token::Lt,
            },

            '>' => match self.peek() {
                Some('=') => {
                    self.advance();
                    Token::Ge
                }
                _ => Token::Gt,
            },

            '&' => match self.peek() {
                Some('&') => {
                    self.advance();
                    Token::AndAnd
                }
                _ => {
                    return Err(LexerError {
                        message: "Unexpected character: '&' (did you mean '&&'?)".to_string(),
                        span,
                    });
                }
            },

            '|' => match self.peek() {
                Some('|') => {
                    self.advance();
                    Token::OrOr
                }
                _ => {
                    return Err(LexerError {
                        message: "Unexpected character: '|' (did you mean '||'?)".to_string(),
                        span,
                    });
                }
            },

            '+' => Token::Plus,
            '*' => Token::Star,
            '@' => Token::At,

            '{' => Token::LBrace,
            '}' => Token::RBrace,
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            ';' => Token::Semicolon,

            '"' => Token::Str(self.read_string()?),

            c if c.is_ascii_digit() => self.read_number(c)?,

            c if c.is_ascii_alphabetic() || c == '_' => self.read_identifier(c),

            c => {
                return Err(LexerError {
                    message: format!("Unexpected character: '{}'", c),
                    span,
                });
            }
        };

        Ok(SpannedToken { token, span })
    }

    /// Tokenize entire input
    pub fn tokenize(&mut self) -> Result<Vec<SpannedToken>, LexerError> {
        let mut tokens = Vec::new();

        loop {
            let spanned = self.next_token()?;
            let is_eof = spanned.token == Token::Eof;
            tokens.push(spanned);

            if is_eof {
                break;
            }
        }

        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(input: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(input);
        lexer
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|st| st.token)
            .filter(|t| *t != Token::Eof)
            .collect()
    }

    fn tokenize_err(input: &str) -> LexerError {
        let mut lexer = Lexer::new(input);
        lexer.tokenize().unwrap_err()
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            tokenize("func if else loop in parallel taskunit true false"),
            vec![
                Token::Func,
                Token::If,
                Token::Else,
                Token::Loop,
                Token::In,
                Token::Parallel,
                Token::TaskUnit,
                Token::True,
                Token::False,
            ]
        );
    }

    #[test]
    fn test_p_is_parallel() {
        assert_eq!(tokenize("p"), vec![Token::Parallel]);
    }

    #[test]
    fn test_p_prefix_is_identifier() {
        assert_eq!(tokenize("print"), vec![Token::Ident("print".to_string())]);
    }

    #[test]
    fn test_identifier() {
        assert_eq!(tokenize("foo_bar2"), vec![Token::Ident("foo_bar2".to_string())]);
        assert_eq!(tokenize("_x"), vec![Token::Ident("_x".to_string())]);
    }

    #[test]
    fn test_integer() {
        assert_eq!(tokenize("42"), vec![Token::Number(42.0)]);
    }

    #[test]
    fn test_float() {
        assert_eq!(tokenize("3.14"), vec![Token::Number(3.14)]);
    }

    #[test]
    fn test_number_then_range() {
        assert_eq!(
            tokenize("0..3"),
            vec![Token::Number(0.0), Token::DotDot, Token::Number(3.0)]
        );
    }

    #[test]
    fn test_inclusive_range() {
        assert_eq!(
            tokenize("0..=3"),
            vec![Token::Number(0.0), Token::DotDotEq, Token::Number(3.0)]
        );
    }

    #[test]
    fn test_dot() {
        assert_eq!(
            tokenize("group.next"),
            vec![
                Token::Ident("group".to_string()),
                Token::Dot,
                Token::Ident("next".to_string()),
            ]
        );
    }

    #[test]
    fn test_string() {
        assert_eq!(tokenize("\"hello world\""), vec![Token::Str("hello world".to_string())]);
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(tokenize("\"say \\\"hi\\\"\""), vec![Token::Str("say \"hi\"".to_string())]);
        assert_eq!(tokenize("\"a\\\\b\""), vec![Token::Str("a\\b".to_string())]);
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize_err("\"oops");
        assert!(err.message.contains("Unterminated"));
    }

    #[test]
    fn test_invalid_escape() {
        let err = tokenize_err("\"a\\nb\"");
        assert!(err.message.contains("escape"));
    }

    #[test]
    fn test_arrow_vs_minus() {
        assert_eq!(tokenize("->"), vec![Token::Arrow]);
        assert_eq!(
            tokenize("a - b"),
            vec![
                Token::Ident("a".to_string()),
                Token::Minus,
                Token::Ident("b".to_string()),
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            tokenize("= == != < <= > >= && || ! + - * /"),
            vec![
                Token::Assign,
                Token::EqEq,
                Token::NotEq,
                Token::Lt,
                Token::Le,
                Token::Gt,
                Token::Ge,
                Token::AndAnd,
                Token::OrOr,
                Token::Bang,
                Token::Plus,
                Token::Minus,
                Token::Star,
                Token::Slash,
            ]
        );
    }

    #[test]
    fn test_punctuation() {
        assert_eq!(
            tokenize("{ } ( ) , ; @"),
            vec![
                Token::LBrace,
                Token::RBrace,
                Token::LParen,
                Token::RParen,
                Token::Comma,
                Token::Semicolon,
                Token::At,
            ]
        );
    }

    #[test]
    fn test_comment() {
        assert_eq!(tokenize("42 // the answer"), vec![Token::Number(42.0)]);
        assert_eq!(tokenize("// a line\n7"), vec![Token::Number(7.0)]);
    }

    #[test]
    fn test_single_ampersand_rejected() {
        let err = tokenize_err("a & b");
        assert!(err.message.contains("&&"));
    }

    #[test]
    fn test_unexpected_character() {
        let err = tokenize_err("#");
        assert!(err.message.contains("Unexpected character"));
        assert_eq!(err.span.line, 1);
        assert_eq!(err.span.column, 1);
    }

    #[test]
    fn test_spans_track_lines() {
        let mut lexer = Lexer::new("a\n  b");
        let tokens = lexer.tokenize().unwrap();
        assert_eq!(tokens[0].span.line, 1);
        assert_eq!(tokens[0].span.column, 1);
        assert_eq!(tokens[1].span.line, 2);
        assert_eq!(tokens[1].span.column, 3);
    }

    #[test]
    fn test_crlf_source() {
        assert_eq!(
            tokenize("a\r\nb"),
            vec![Token::Ident("a".to_string()), Token::Ident("b".to_string())]
        );
    }
}

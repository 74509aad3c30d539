//! Expression parser for cell formulas.
//!
//! This module implements a recursive descent parser that turns a cell's
//! formula text into an [`Expr`] tree. Evaluation lives in
//! [`services`](super::services); the parser never touches the sheet.
//!
//! # Grammar
//!
//! ```bnf
//! Formula        ::= "=" Formula | Comparison
//! Comparison     ::= Addition ( ( "<" | ">" | "=" ) Addition )*
//! Addition       ::= Multiplication ( ( "+" | "-" ) Multiplication )*
//! Multiplication ::= Power ( ( "*" | "/" ) Power )*
//! Power          ::= Unary ( "^" Power )?
//! Unary          ::= ( "+" | "-" ) Unary | Primary
//! Primary        ::= Number | CellRef | Call | "(" Comparison ")"
//! Call           ::= ( "inc" | "dec" | "not" ) "(" Comparison ")"
//! CellRef        ::= [A-Za-z]+ [0-9]+
//! Number         ::= [0-9]+ ( ( "." | "," ) [0-9]+ )?
//! ```
//!
//! A `=` at the start of the formula is a cosmetic marker and is kept in the
//! tree as [`Expr::Formula`]; anywhere else it is the equality comparison.
//! Function keywords are lower case only.

use super::errors::{ParseError, ParseResult};

/// Represents a token in the expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Number(String),
    CellRef(String),
    Identifier(String),

    // Function keywords
    Inc,
    Dec,
    Not,

    // Operators
    Plus,
    Minus,
    Multiply,
    Divide,
    Power,

    // Comparison operators
    Less,
    Greater,
    Equal,

    // Delimiters
    LeftParen,
    RightParen,

    // End of input
    Eof,
}

/// Abstract syntax tree for a cell formula.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal as written, with either `.` or `,` as separator.
    Number(String),
    /// Upper-cased cell name.
    CellRef(String),

    Unary {
        operator: UnaryOp,
        operand: Box<Expr>,
    },

    Binary {
        left: Box<Expr>,
        operator: BinaryOp,
        right: Box<Expr>,
    },

    Call {
        function: Function,
        argument: Box<Expr>,
    },

    /// Leading `=` marker.
    Formula(Box<Expr>),
}

impl Expr {
    /// Skips any number of leading `=` markers.
    pub fn strip_formula_markers(&self) -> &Expr {
        let mut expr = self;
        while let Expr::Formula(inner) = expr {
            expr = inner;
        }
        expr
    }

    /// Literal numbers and bare references.
    pub fn is_primitive(&self) -> bool {
        matches!(self, Expr::Number(_) | Expr::CellRef(_))
    }

    /// The referenced name, if this is exactly one bare cell reference once
    /// leading `=` markers are removed.
    pub fn as_single_reference(&self) -> Option<&str> {
        match self.strip_formula_markers() {
            Expr::CellRef(name) => Some(name),
            _ => None,
        }
    }
}

/// Infix operators. Comparisons yield logical results.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOp {
    // Comparison
    Equal,
    Less,
    Greater,

    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
}

/// Prefix sign operators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    Plus,
    Minus,
}

/// Built-in unary functions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Function {
    Inc,
    Dec,
    Not,
}

/// Lexical analyzer for tokenizing expressions.
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    current_char: Option<char>,
}

impl Lexer {
    /// Creates a lexer positioned at the first character of `input`.
    pub fn new(input: &str) -> Self {
        let chars: Vec<char> = input.chars().collect();
        let current_char = chars.first().copied();

        Self {
            input: chars,
            position: 0,
            current_char,
        }
    }

    /// Character offset of the next unread character.
    pub fn position(&self) -> usize {
        self.position
    }

    fn advance(&mut self) {
        self.position += 1;
        self.current_char = self.input.get(self.position).copied();
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_digits(&mut self, buffer: &mut String) {
        while let Some(ch) = self.current_char {
            if ch.is_ascii_digit() {
                buffer.push(ch);
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Reads an integer or decimal literal, keeping its original separator.
    fn read_number(&mut self) -> ParseResult<String> {
        let mut number = String::new();
        self.read_digits(&mut number);

        if let Some(separator @ ('.' | ',')) = self.current_char {
            number.push(separator);
            self.advance();

            let before = number.len();
            self.read_digits(&mut number);
            if number.len() == before {
                return Err(ParseError::new(
                    format!("Expected digits after '{}'", separator),
                    self.position,
                ));
            }
        }

        Ok(number)
    }

    fn read_identifier(&mut self) -> String {
        let mut identifier = String::new();

        while let Some(ch) = self.current_char {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                identifier.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        identifier
    }

    /// Keywords match exactly; cell names are letters followed by digits.
    fn classify_identifier(identifier: String) -> Token {
        match identifier.as_str() {
            "inc" => return Token::Inc,
            "dec" => return Token::Dec,
            "not" => return Token::Not,
            _ => {}
        }

        let letters = identifier
            .chars()
            .take_while(|ch| ch.is_ascii_alphabetic())
            .count();
        let rest = &identifier[letters..];

        if letters > 0 && !rest.is_empty() && rest.chars().all(|ch| ch.is_ascii_digit()) {
            Token::CellRef(identifier.to_ascii_uppercase())
        } else {
            Token::Identifier(identifier)
        }
    }

    /// Gets the next token from the input.
    pub fn next_token(&mut self) -> ParseResult<Token> {
        self.skip_whitespace();

        let Some(ch) = self.current_char else {
            return Ok(Token::Eof);
        };

        let token = match ch {
            '0'..='9' => return self.read_number().map(Token::Number),
            'A'..='Z' | 'a'..='z' => {
                let identifier = self.read_identifier();
                return Ok(Self::classify_identifier(identifier));
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Multiply,
            '/' => Token::Divide,
            '^' => Token::Power,
            '<' => Token::Less,
            '>' => Token::Greater,
            '=' => Token::Equal,
            '(' => Token::LeftParen,
            ')' => Token::RightParen,
            _ => {
                return Err(ParseError::new(
                    format!("Unexpected character: '{}'", ch),
                    self.position,
                ));
            }
        };

        self.advance();
        Ok(token)
    }
}

/// Recursive descent parser for cell formulas.
pub struct Parser {
    lexer: Lexer,
    current_token: Token,
    token_start: usize,
}

impl Parser {
    /// Creates a parser and reads the first token.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] if the first token is malformed.
    pub fn new(input: &str) -> ParseResult<Self> {
        let mut lexer = Lexer::new(input);
        lexer.skip_whitespace();
        let token_start = lexer.position();
        let current_token = lexer.next_token()?;

        Ok(Self {
            lexer,
            current_token,
            token_start,
        })
    }

    fn advance(&mut self) -> ParseResult<()> {
        self.lexer.skip_whitespace();
        self.token_start = self.lexer.position();
        self.current_token = self.lexer.next_token()?;
        Ok(())
    }

    fn error(&self, message: String) -> ParseError {
        ParseError::new(message, self.token_start)
    }

    fn expect(&mut self, expected: Token) -> ParseResult<()> {
        if self.current_token == expected {
            self.advance()
        } else {
            Err(self.error(format!(
                "Expected {:?}, found {:?}",
                expected, self.current_token
            )))
        }
    }

    /// Parses the whole input as one formula.
    pub fn parse(&mut self) -> ParseResult<Expr> {
        let expr = self.parse_formula()?;

        if self.current_token != Token::Eof {
            return Err(self.error(format!(
                "Unexpected token at end: {:?}",
                self.current_token
            )));
        }

        Ok(expr)
    }

    fn parse_formula(&mut self) -> ParseResult<Expr> {
        if self.current_token == Token::Equal {
            self.advance()?;
            let inner = self.parse_formula()?;
            Ok(Expr::Formula(Box::new(inner)))
        } else {
            self.parse_comparison()
        }
    }

    fn parse_comparison(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_addition()?;

        loop {
            let operator = match self.current_token {
                Token::Less => BinaryOp::Less,
                Token::Greater => BinaryOp::Greater,
                Token::Equal => BinaryOp::Equal,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_addition()?;
            left = Expr::Binary {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_addition(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_multiplication()?;

        loop {
            let operator = match self.current_token {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Subtract,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_multiplication()?;
            left = Expr::Binary {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_multiplication(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_power()?;

        loop {
            let operator = match self.current_token {
                Token::Multiply => BinaryOp::Multiply,
                Token::Divide => BinaryOp::Divide,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_power()?;
            left = Expr::Binary {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Right-associative.
    fn parse_power(&mut self) -> ParseResult<Expr> {
        let left = self.parse_unary()?;

        if self.current_token == Token::Power {
            self.advance()?;
            let right = self.parse_power()?;
            Ok(Expr::Binary {
                left: Box::new(left),
                operator: BinaryOp::Power,
                right: Box::new(right),
            })
        } else {
            Ok(left)
        }
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let operator = match self.current_token {
            Token::Plus => UnaryOp::Plus,
            Token::Minus => UnaryOp::Minus,
            _ => return self.parse_primary(),
        };
        self.advance()?;
        let operand = self.parse_unary()?;
        Ok(Expr::Unary {
            operator,
            operand: Box::new(operand),
        })
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        match &self.current_token {
            Token::Number(text) => {
                let text = text.clone();
                self.advance()?;
                Ok(Expr::Number(text))
            }

            Token::CellRef(name) => {
                let name = name.clone();
                self.advance()?;
                Ok(Expr::CellRef(name))
            }

            Token::Inc | Token::Dec | Token::Not => {
                let function = match self.current_token {
                    Token::Inc => Function::Inc,
                    Token::Dec => Function::Dec,
                    _ => Function::Not,
                };
                self.advance()?;
                self.expect(Token::LeftParen)?;
                let argument = self.parse_comparison()?;
                self.expect(Token::RightParen)?;
                Ok(Expr::Call {
                    function,
                    argument: Box::new(argument),
                })
            }

            Token::LeftParen => {
                self.advance()?;
                let expr = self.parse_comparison()?;
                self.expect(Token::RightParen)?;
                Ok(expr)
            }

            Token::Identifier(name) => Err(self.error(format!("Unknown identifier: {}", name))),

            _ => Err(self.error(format!("Unexpected token: {:?}", self.current_token))),
        }
    }
}

/// Parses formula text into an expression tree.
///
/// # Examples
///
/// ```
/// use cellsheet::domain::{parse_formula, Expr};
///
/// let expr = parse_formula("=B2").unwrap();
/// assert_eq!(expr.as_single_reference(), Some("B2"));
/// assert!(parse_formula("hello").is_err());
/// ```
pub fn parse_formula(text: &str) -> ParseResult<Expr> {
    Parser::new(text)?.parse()
}

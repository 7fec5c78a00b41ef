use std::collections::HashMap;
use std::mem;
use std::rc::Rc;

use tracing::debug;

use crate::ast::{
    BinaryOperator, BlockStatement, Expression, ExpressionKind, FunctionLiteral, Identifier, Program,
    Statement, StatementKind, UnaryOperator,
};
use crate::error::ParseError;
use crate::lexer::Lexer;
use crate::stack::ensure_sufficient_stack;
use crate::token::{Token, TokenKind};

pub type ParseResult<T> = Result<T, ParseError>;

pub type PrefixParseFn<I> = fn(&mut Parser<I>) -> ParseResult<Expression>;
pub type InfixParseFn<I> = fn(&mut Parser<I>, Expression) -> ParseResult<Expression>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    Lowest,
    Equals,
    LessGreater,
    Sum,
    Product,
    Prefix,
    Call,
}

impl Precedence {
    fn of(kind: TokenKind) -> Precedence {
        match kind {
            TokenKind::EqualEqual | TokenKind::BangEqual => Precedence::Equals,
            TokenKind::Less | TokenKind::Greater => Precedence::LessGreater,
            TokenKind::Plus | TokenKind::Minus => Precedence::Sum,
            TokenKind::Asterisk | TokenKind::Slash => Precedence::Product,
            TokenKind::LeftParen | TokenKind::LeftBracket => Precedence::Call,
            _ => Precedence::Lowest,
        }
    }
}

fn binary_operator(kind: TokenKind) -> Option<BinaryOperator> {
    match kind {
        TokenKind::Plus => Some(BinaryOperator::Add),
        TokenKind::Minus => Some(BinaryOperator::Subtract),
        TokenKind::Asterisk => Some(BinaryOperator::Multiply),
        TokenKind::Slash => Some(BinaryOperator::Divide),
        TokenKind::Less => Some(BinaryOperator::Less),
        TokenKind::Greater => Some(BinaryOperator::Greater),
        TokenKind::EqualEqual => Some(BinaryOperator::Equal),
        TokenKind::BangEqual => Some(BinaryOperator::NotEqual),
        _ => None,
    }
}

/// Lexes and parses `source` in one go.
pub fn parse(source: &str) -> (Program, Vec<ParseError>) {
    let mut parser = Parser::new(Lexer::new(source));
    let program = parser.parse_program();
    (program, parser.into_errors())
}

/// Pratt parser over a token stream with one token of lookahead.
///
/// Each token kind has at most one prefix and one infix handler registered.
/// Errors never abort the parse: a failed top-level statement is recorded and
/// parsing resumes one token further on.
pub struct Parser<I> {
    tokens: I,
    current: Token,
    peek: Token,
    errors: Vec<ParseError>,
    prefix_parse_fns: HashMap<TokenKind, PrefixParseFn<I>>,
    infix_parse_fns: HashMap<TokenKind, InfixParseFn<I>>,
}

impl<I: Iterator<Item = Token>> Parser<I> {
    pub fn new<T>(tokens: T) -> Self
    where
        T: IntoIterator<Item = Token, IntoIter = I>,
    {
        let mut parser = Parser {
            tokens: tokens.into_iter(),
            current: Token::eof(0),
            peek: Token::eof(0),
            errors: Vec::new(),
            prefix_parse_fns: HashMap::new(),
            infix_parse_fns: HashMap::new(),
        };

        parser.register_prefix(TokenKind::Identifier, Self::parse_identifier);
        parser.register_prefix(TokenKind::Integer, Self::parse_integer);
        parser.register_prefix(TokenKind::String, Self::parse_string);
        parser.register_prefix(TokenKind::True, Self::parse_boolean);
        parser.register_prefix(TokenKind::False, Self::parse_boolean);
        parser.register_prefix(TokenKind::Bang, Self::parse_unary);
        parser.register_prefix(TokenKind::Minus, Self::parse_unary);
        parser.register_prefix(TokenKind::LeftParen, Self::parse_grouped);
        parser.register_prefix(TokenKind::If, Self::parse_if);
        parser.register_prefix(TokenKind::Function, Self::parse_function);
        parser.register_prefix(TokenKind::LeftBracket, Self::parse_array);
        parser.register_prefix(TokenKind::LeftBrace, Self::parse_hash);

        for kind in [
            TokenKind::Plus,
            TokenKind::Minus,
            TokenKind::Asterisk,
            TokenKind::Slash,
            TokenKind::Less,
            TokenKind::Greater,
            TokenKind::EqualEqual,
            TokenKind::BangEqual,
        ] {
            parser.register_infix(kind, Self::parse_binary);
        }
        parser.register_infix(TokenKind::LeftParen, Self::parse_call);
        parser.register_infix(TokenKind::LeftBracket, Self::parse_index);

        parser.next_token();
        parser.next_token();
        parser
    }

    pub fn register_prefix(&mut self, kind: TokenKind, parse_fn: PrefixParseFn<I>) {
        self.prefix_parse_fns.insert(kind, parse_fn);
    }

    pub fn register_infix(&mut self, kind: TokenKind, parse_fn: InfixParseFn<I>) {
        self.infix_parse_fns.insert(kind, parse_fn);
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ParseError> {
        self.errors
    }

    pub fn parse_program(&mut self) -> Program {
        let mut program = Program::default();

        while !self.current_is(TokenKind::Eof) {
            match self.parse_statement() {
                Ok(statement) => program.statements.push(statement),
                Err(error) => {
                    debug!(span = %error.span(), "{}", error);
                    self.errors.push(error);
                }
            }
            self.next_token();
        }

        program
    }

    fn next_token(&mut self) {
        let end = self.peek.span.1;
        let next = self.tokens.next().unwrap_or_else(|| Token::eof(end));
        self.current = mem::replace(&mut self.peek, next);
    }

    fn current_is(&self, kind: TokenKind) -> bool {
        self.current.is(kind)
    }

    fn peek_is(&self, kind: TokenKind) -> bool {
        self.peek.is(kind)
    }

    fn expect_peek(&mut self, kind: TokenKind) -> ParseResult<()> {
        if !self.peek_is(kind) {
            return Err(ParseError::UnexpectedToken {
                expected: kind,
                found: self.peek.kind,
                span: self.peek.span,
            });
        }

        self.next_token();
        Ok(())
    }

    fn skip_semicolon(&mut self) {
        if self.peek_is(TokenKind::Semicolon) {
            self.next_token();
        }
    }

    fn parse_statement(&mut self) -> ParseResult<Statement> {
        match self.current.kind {
            TokenKind::Let => self.parse_let_statement(),
            TokenKind::Return => self.parse_return_statement(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_let_statement(&mut self) -> ParseResult<Statement> {
        let span = self.current.span;

        self.expect_peek(TokenKind::Identifier)?;
        let name = Identifier {
            name: self.current.text.clone(),
            span: self.current.span,
        };

        self.expect_peek(TokenKind::Assign)?;
        self.next_token();
        let value = self.parse_expression(Precedence::Lowest)?;
        self.skip_semicolon();

        Ok(Statement::new(StatementKind::Let { name, value }, span))
    }

    fn parse_return_statement(&mut self) -> ParseResult<Statement> {
        let span = self.current.span;

        let value = match self.peek.kind {
            TokenKind::Semicolon | TokenKind::RightBrace | TokenKind::Eof => None,
            _ => {
                self.next_token();
                Some(self.parse_expression(Precedence::Lowest)?)
            }
        };
        self.skip_semicolon();

        Ok(Statement::new(StatementKind::Return(value), span))
    }

    fn parse_expression_statement(&mut self) -> ParseResult<Statement> {
        let span = self.current.span;
        let expression = self.parse_expression(Precedence::Lowest)?;
        self.skip_semicolon();

        Ok(Statement::new(StatementKind::Expression(expression), span))
    }

    fn parse_block(&mut self) -> ParseResult<BlockStatement> {
        let span = self.current.span;
        let mut statements = Vec::new();

        self.next_token();
        while !self.current_is(TokenKind::RightBrace) {
            if self.current_is(TokenKind::Eof) {
                return Err(ParseError::UnexpectedToken {
                    expected: TokenKind::RightBrace,
                    found: TokenKind::Eof,
                    span: self.current.span,
                });
            }

            statements.push(self.parse_statement()?);
            self.next_token();
        }

        Ok(BlockStatement { statements, span })
    }

    fn parse_expression(&mut self, precedence: Precedence) -> ParseResult<Expression> {
        ensure_sufficient_stack(|| {
            let prefix = self
                .prefix_parse_fns
                .get(&self.current.kind)
                .copied()
                .ok_or(ParseError::NoPrefixParseFn {
                    kind: self.current.kind,
                    span: self.current.span,
                })?;
            let mut left = prefix(self)?;

            while !self.peek_is(TokenKind::Semicolon) && precedence < Precedence::of(self.peek.kind) {
                let infix = self
                    .infix_parse_fns
                    .get(&self.peek.kind)
                    .copied()
                    .ok_or(ParseError::NoInfixParseFn {
                        kind: self.peek.kind,
                        span: self.peek.span,
                    })?;
                self.next_token();
                left = infix(self, left)?;
            }

            Ok(left)
        })
    }

    fn parse_identifier(&mut self) -> ParseResult<Expression> {
        Ok(Expression::new(
            ExpressionKind::Identifier(self.current.text.clone()),
            self.current.span,
        ))
    }

    fn parse_integer(&mut self) -> ParseResult<Expression> {
        let value = self
            .current
            .text
            .parse::<i64>()
            .map_err(|_| ParseError::InvalidInteger {
                text: self.current.text.clone(),
                span: self.current.span,
            })?;

        Ok(Expression::new(ExpressionKind::Integer(value), self.current.span))
    }

    fn parse_string(&mut self) -> ParseResult<Expression> {
        Ok(Expression::new(
            ExpressionKind::String(self.current.text.clone()),
            self.current.span,
        ))
    }

    fn parse_boolean(&mut self) -> ParseResult<Expression> {
        Ok(Expression::new(
            ExpressionKind::Boolean(self.current_is(TokenKind::True)),
            self.current.span,
        ))
    }

    fn parse_unary(&mut self) -> ParseResult<Expression> {
        let span = self.current.span;
        let operator = match self.current.kind {
            TokenKind::Bang => UnaryOperator::Not,
            _ => UnaryOperator::Negate,
        };

        self.next_token();
        let operand = self.parse_expression(Precedence::Prefix)?;

        Ok(Expression::new(
            ExpressionKind::Unary {
                operator,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    fn parse_grouped(&mut self) -> ParseResult<Expression> {
        self.next_token();
        let expression = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(TokenKind::RightParen)?;
        Ok(expression)
    }

    fn parse_if(&mut self) -> ParseResult<Expression> {
        let span = self.current.span;

        self.expect_peek(TokenKind::LeftParen)?;
        self.next_token();
        let condition = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(TokenKind::RightParen)?;

        self.expect_peek(TokenKind::LeftBrace)?;
        let consequence = self.parse_block()?;

        let alternative = if self.peek_is(TokenKind::Else) {
            self.next_token();
            self.expect_peek(TokenKind::LeftBrace)?;
            Some(self.parse_block()?)
        } else {
            None
        };

        Ok(Expression::new(
            ExpressionKind::If {
                condition: Box::new(condition),
                consequence,
                alternative,
            },
            span,
        ))
    }

    fn parse_function(&mut self) -> ParseResult<Expression> {
        let span = self.current.span;

        self.expect_peek(TokenKind::LeftParen)?;
        let parameters = self.parse_parameters()?;
        self.expect_peek(TokenKind::LeftBrace)?;
        let body = self.parse_block()?;

        Ok(Expression::new(
            ExpressionKind::Function(Rc::new(FunctionLiteral { parameters, body })),
            span,
        ))
    }

    fn parse_parameters(&mut self) -> ParseResult<Vec<Identifier>> {
        let mut parameters = Vec::new();

        if self.peek_is(TokenKind::RightParen) {
            self.next_token();
            return Ok(parameters);
        }

        loop {
            self.expect_peek(TokenKind::Identifier)?;
            parameters.push(Identifier {
                name: self.current.text.clone(),
                span: self.current.span,
            });

            if !self.peek_is(TokenKind::Comma) {
                break;
            }
            self.next_token();
        }

        self.expect_peek(TokenKind::RightParen)?;
        Ok(parameters)
    }

    fn parse_expression_list(&mut self, end: TokenKind) -> ParseResult<Vec<Expression>> {
        let mut list = Vec::new();

        if self.peek_is(end) {
            self.next_token();
            return Ok(list);
        }

        self.next_token();
        list.push(self.parse_expression(Precedence::Lowest)?);

        while self.peek_is(TokenKind::Comma) {
            self.next_token();
            self.next_token();
            list.push(self.parse_expression(Precedence::Lowest)?);
        }

        self.expect_peek(end)?;
        Ok(list)
    }

    fn parse_array(&mut self) -> ParseResult<Expression> {
        let span = self.current.span;
        let elements = self.parse_expression_list(TokenKind::RightBracket)?;
        Ok(Expression::new(ExpressionKind::Array(elements), span))
    }

    fn parse_hash(&mut self) -> ParseResult<Expression> {
        let span = self.current.span;
        let mut pairs = Vec::new();

        while !self.peek_is(TokenKind::RightBrace) {
            self.next_token();
            let key = self.parse_expression(Precedence::Lowest)?;

            self.expect_peek(TokenKind::Colon)?;
            self.next_token();
            let value = self.parse_expression(Precedence::Lowest)?;

            pairs.push((key, value));

            if !self.peek_is(TokenKind::RightBrace) {
                self.expect_peek(TokenKind::Comma)?;
            }
        }

        self.expect_peek(TokenKind::RightBrace)?;
        Ok(Expression::new(ExpressionKind::Hash(pairs), span))
    }

    fn parse_binary(&mut self, left: Expression) -> ParseResult<Expression> {
        let span = self.current.span;
        let operator = binary_operator(self.current.kind).ok_or(ParseError::NoInfixParseFn {
            kind: self.current.kind,
            span,
        })?;
        let precedence = Precedence::of(self.current.kind);

        self.next_token();
        let right = self.parse_expression(precedence)?;

        Ok(Expression::new(
            ExpressionKind::Binary {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            },
            span,
        ))
    }

    fn parse_call(&mut self, function: Expression) -> ParseResult<Expression> {
        let span = self.current.span;
        let arguments = self.parse_expression_list(TokenKind::RightParen)?;

        Ok(Expression::new(
            ExpressionKind::Call {
                function: Box::new(function),
                arguments,
            },
            span,
        ))
    }

    fn parse_index(&mut self, left: Expression) -> ParseResult<Expression> {
        let span = self.current.span;

        self.next_token();
        let index = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(TokenKind::RightBracket)?;

        Ok(Expression::new(
            ExpressionKind::Index {
                left: Box::new(left),
                index: Box::new(index),
            },
            span,
        ))
    }
}

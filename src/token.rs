use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
  Illegal,
  Eof,

  Identifier,
  Integer,
  String,

  Assign,
  Plus,
  Minus,
  Asterisk,
  Slash,
  Bang,
  Less,
  Greater,
  EqualEqual,
  BangEqual,

  Comma,
  Semicolon,
  Colon,
  LeftParen,
  RightParen,
  LeftBrace,
  RightBrace,
  LeftBracket,
  RightBracket,

  Function,
  Let,
  True,
  False,
  If,
  Else,
  Return,
}

impl TokenKind {
  pub fn keyword(ident: &str) -> Option<TokenKind> {
    match ident {
      "fn" => Some(TokenKind::Function),
      "let" => Some(TokenKind::Let),
      "true" => Some(TokenKind::True),
      "false" => Some(TokenKind::False),
      "if" => Some(TokenKind::If),
      "else" => Some(TokenKind::Else),
      "return" => Some(TokenKind::Return),
      _ => None,
    }
  }

  /// The name used for this kind in parse error messages.
  pub fn name(&self) -> &'static str {
    match self {
      TokenKind::Illegal => "ILLEGAL",
      TokenKind::Eof => "EOF",
      TokenKind::Identifier => "IDENT",
      TokenKind::Integer => "INT",
      TokenKind::String => "STRING",
      TokenKind::Assign => "=",
      TokenKind::Plus => "+",
      TokenKind::Minus => "-",
      TokenKind::Asterisk => "*",
      TokenKind::Slash => "/",
      TokenKind::Bang => "!",
      TokenKind::Less => "<",
      TokenKind::Greater => ">",
      TokenKind::EqualEqual => "==",
      TokenKind::BangEqual => "!=",
      TokenKind::Comma => ",",
      TokenKind::Semicolon => ";",
      TokenKind::Colon => ":",
      TokenKind::LeftParen => "(",
      TokenKind::RightParen => ")",
      TokenKind::LeftBrace => "{",
      TokenKind::RightBrace => "}",
      TokenKind::LeftBracket => "[",
      TokenKind::RightBracket => "]",
      TokenKind::Function => "FUNCTION",
      TokenKind::Let => "LET",
      TokenKind::True => "TRUE",
      TokenKind::False => "FALSE",
      TokenKind::If => "IF",
      TokenKind::Else => "ELSE",
      TokenKind::Return => "RETURN",
    }
  }
}

impl fmt::Display for TokenKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// Byte offsets `[start, end)` into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span(pub usize, pub usize);

impl fmt::Display for Span {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}..{}", self.0, self.1)
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
  pub kind: TokenKind,
  pub text: String,
  pub span: Span,
}

impl Token {
  pub fn new(kind: TokenKind, text: impl Into<String>, span: Span) -> Token {
    Token {
      kind,
      text: text.into(),
      span,
    }
  }

  pub fn eof(at: usize) -> Token {
    Token::new(TokenKind::Eof, "", Span(at, at))
  }

  pub fn is(&self, kind: TokenKind) -> bool {
    self.kind == kind
  }
}

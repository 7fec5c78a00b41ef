use std::path::PathBuf;

use thiserror::Error;

use crate::token::{Span, TokenKind};

/// A syntax error recorded while parsing one top-level statement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
  #[error("Parsing error. Expected Token Type = \"{expected}\", but got \"{found}\"")]
  UnexpectedToken {
    expected: TokenKind,
    found: TokenKind,
    span: Span,
  },
  #[error("no prefix parse function for {kind}")]
  NoPrefixParseFn { kind: TokenKind, span: Span },
  #[error("no infix parse function for {kind}")]
  NoInfixParseFn { kind: TokenKind, span: Span },
  #[error("could not parse \"{text}\" as integer")]
  InvalidInteger { text: String, span: Span },
}

impl ParseError {
  pub fn span(&self) -> Span {
    match self {
      ParseError::UnexpectedToken { span, .. }
      | ParseError::NoPrefixParseFn { span, .. }
      | ParseError::NoInfixParseFn { span, .. }
      | ParseError::InvalidInteger { span, .. } => *span,
    }
  }
}

/// Failures surfaced to a host running whole scripts.
#[derive(Debug, Error)]
pub enum Error {
  #[error("failed to read {}: {source}", .path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("{}", render_parse_errors(.0))]
  Parse(Vec<ParseError>),
  #[error("Error: {0}")]
  Runtime(String),
}

fn render_parse_errors(errors: &[ParseError]) -> String {
  errors
    .iter()
    .map(|e| e.to_string())
    .collect::<Vec<_>>()
    .join("\n")
}

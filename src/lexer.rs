use std::sync::OnceLock;

use regex::Regex;

use crate::token::{Span, Token, TokenKind};

const PATTERN: &str = r#"(?xs)
    ^(?:
        (?P<space>\s+)
      | (?P<ident>[A-Za-z_][A-Za-z0-9_]*)
      | (?P<int>[0-9]+)
      | (?P<string>"(?:[^"\\]|\\.)*")
      | (?P<unterminated>"(?:[^"\\]|\\.)*\\?)
      | (?P<op>==|!=|[-=+*/<>!,;:(){}\[\]])
    )"#;

fn pattern() -> &'static Regex {
    static PATTERN_RE: OnceLock<Regex> = OnceLock::new();
    PATTERN_RE.get_or_init(|| Regex::new(PATTERN).expect("lexer pattern is a valid regex"))
}

fn unescape_string(input: &str) -> String {
    let mut result = String::new();
    let mut chars = input.chars();

    chars.next();
    chars.next_back();

    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                match escaped {
                    'n' => result.push('\n'),
                    't' => result.push('\t'),
                    'r' => result.push('\r'),
                    '"' => result.push('"'),
                    '\\' => result.push('\\'),
                    other => result.push(other),
                }
            }
        } else {
            result.push(c);
        }
    }

    result
}

fn operator(op: &str) -> TokenKind {
    match op {
        "==" => TokenKind::EqualEqual,
        "!=" => TokenKind::BangEqual,
        "=" => TokenKind::Assign,
        "+" => TokenKind::Plus,
        "-" => TokenKind::Minus,
        "*" => TokenKind::Asterisk,
        "/" => TokenKind::Slash,
        "<" => TokenKind::Less,
        ">" => TokenKind::Greater,
        "!" => TokenKind::Bang,
        "," => TokenKind::Comma,
        ";" => TokenKind::Semicolon,
        ":" => TokenKind::Colon,
        "(" => TokenKind::LeftParen,
        ")" => TokenKind::RightParen,
        "{" => TokenKind::LeftBrace,
        "}" => TokenKind::RightBrace,
        "[" => TokenKind::LeftBracket,
        "]" => TokenKind::RightBracket,
        _ => TokenKind::Illegal,
    }
}

/// Scans source text into tokens, ending with a single `EOF` token.
///
/// Never fails: anything it cannot make sense of comes out as an `ILLEGAL`
/// token and is left for the parser to report.
pub struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    finished: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer {
            source,
            pos: 0,
            finished: false,
        }
    }

    pub fn lex(self) -> Vec<Token> {
        self.collect()
    }

    fn scan(&mut self) -> Option<Token> {
        let rest = &self.source[self.pos..];
        let start = self.pos;

        let Some(caps) = pattern().captures(rest) else {
            let c = rest.chars().next()?;
            self.pos += c.len_utf8();
            return Some(Token::new(TokenKind::Illegal, c.to_string(), Span(start, self.pos)));
        };

        let whole = caps.get(0)?.as_str();
        self.pos += whole.len();
        let span = Span(start, self.pos);

        if caps.name("space").is_some() {
            return None;
        }

        let token = if let Some(m) = caps.name("ident") {
            let kind = TokenKind::keyword(m.as_str()).unwrap_or(TokenKind::Identifier);
            Token::new(kind, m.as_str(), span)
        } else if let Some(m) = caps.name("int") {
            Token::new(TokenKind::Integer, m.as_str(), span)
        } else if let Some(m) = caps.name("string") {
            Token::new(TokenKind::String, unescape_string(m.as_str()), span)
        } else if let Some(m) = caps.name("unterminated") {
            Token::new(TokenKind::Illegal, m.as_str(), span)
        } else {
            Token::new(operator(whole), whole, span)
        };

        Some(token)
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        while !self.finished {
            if self.pos >= self.source.len() {
                self.finished = true;
                return Some(Token::eof(self.pos));
            }

            if let Some(token) = self.scan() {
                return Some(token);
            }
        }

        None
    }
}

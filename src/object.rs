use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::FunctionLiteral;
use crate::env::EnvId;

pub const NULL: Object = Object::Null;
pub const TRUE: Object = Object::Boolean(true);
pub const FALSE: Object = Object::Boolean(false);

pub type BuiltinFn = fn(Vec<Object>) -> Object;

#[derive(Debug, Clone, Copy)]
pub struct Builtin {
  pub name: &'static str,
  pub func: BuiltinFn,
}

impl PartialEq for Builtin {
  fn eq(&self, other: &Self) -> bool {
    self.name == other.name
  }
}

/// A user function closed over the scope it was defined in.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
  pub literal: Rc<FunctionLiteral>,
  pub env: EnvId,
}

/// The hashable subset of values. Keys compare and hash by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HashKey {
  Integer(i64),
  Boolean(bool),
  String(String),
}

pub type HashPairs = BTreeMap<HashKey, Object>;

#[derive(Debug, Clone, PartialEq)]
pub enum Object {
  Null,
  Integer(i64),
  Boolean(bool),
  String(String),
  Array(Rc<Vec<Object>>),
  Hash(Rc<HashPairs>),
  Function(Rc<Function>),
  Builtin(Builtin),
  Error(String),
  /// Carries a `return` value up to the enclosing call. Never observed by
  /// user code.
  Return(Box<Object>),
}

impl Object {
  pub fn error(message: impl Into<String>) -> Object {
    Object::Error(message.into())
  }

  pub fn array(elements: Vec<Object>) -> Object {
    Object::Array(Rc::new(elements))
  }

  pub fn type_name(&self) -> &'static str {
    match self {
      Object::Null => "NULL",
      Object::Integer(_) => "INTEGER",
      Object::Boolean(_) => "BOOLEAN",
      Object::String(_) => "STRING",
      Object::Array(_) => "ARRAY",
      Object::Hash(_) => "HASH",
      Object::Function(_) => "FUNCTION",
      Object::Builtin(_) => "BUILTIN",
      Object::Error(_) => "ERROR",
      Object::Return(_) => "RETURN_VALUE",
    }
  }

  pub fn is_error(&self) -> bool {
    matches!(self, Object::Error(_))
  }

  /// True for values that unwind evaluation: errors and pending returns.
  pub fn is_signal(&self) -> bool {
    matches!(self, Object::Error(_) | Object::Return(_))
  }

  /// Everything except `null` and `false` counts as true in a condition.
  pub fn is_truthy(&self) -> bool {
    !matches!(self, Object::Null | Object::Boolean(false))
  }

  pub fn hash_key(&self) -> Option<HashKey> {
    match self {
      Object::Integer(value) => Some(HashKey::Integer(*value)),
      Object::Boolean(value) => Some(HashKey::Boolean(*value)),
      Object::String(value) => Some(HashKey::String(value.clone())),
      _ => None,
    }
  }
}

impl From<bool> for Object {
  fn from(value: bool) -> Self {
    if value {
      TRUE
    } else {
      FALSE
    }
  }
}

impl fmt::Display for HashKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      HashKey::Integer(value) => write!(f, "{}", value),
      HashKey::Boolean(value) => write!(f, "{}", value),
      HashKey::String(value) => write!(f, "{:?}", value),
    }
  }
}

impl fmt::Display for Object {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Object::Null => f.write_str("null"),
      Object::Integer(value) => write!(f, "{}", value),
      Object::Boolean(value) => write!(f, "{}", value),
      Object::String(value) => f.write_str(value),
      Object::Array(elements) => {
        f.write_str("[")?;
        for (i, element) in elements.iter().enumerate() {
          if i > 0 {
            f.write_str(", ")?;
          }
          write!(f, "{}", element)?;
        }
        f.write_str("]")
      }
      Object::Hash(pairs) => {
        f.write_str("{")?;
        for (i, (key, value)) in pairs.iter().enumerate() {
          if i > 0 {
            f.write_str(", ")?;
          }
          write!(f, "{}: {}", key, value)?;
        }
        f.write_str("}")
      }
      Object::Function(function) => write!(f, "{}", function.literal),
      Object::Builtin(builtin) => write!(f, "{}() {{ [native code] }}", builtin.name),
      Object::Error(message) => write!(f, "Error: {}", message),
      Object::Return(value) => write!(f, "{}", value),
    }
  }
}

use std::collections::HashMap;

use crate::object::{Builtin, BuiltinFn, Object};

pub fn builtins() -> HashMap<String, Object> {
  let entries: [(&'static str, BuiltinFn); 5] = [
    ("len", builtin_len),
    ("first", builtin_first),
    ("last", builtin_last),
    ("rest", builtin_rest),
    ("push", builtin_push),
  ];

  entries
    .into_iter()
    .map(|(name, func)| (name.to_owned(), Object::Builtin(Builtin { name, func })))
    .collect()
}

fn wrong_arguments(got: usize, want: usize) -> Object {
  Object::error(format!("wrong number of arguments. got={}, want={}", got, want))
}

fn expect_array<'a>(name: &str, args: &'a [Object], want: usize) -> Result<&'a [Object], Object> {
  if args.len() != want {
    return Err(wrong_arguments(args.len(), want));
  }

  match &args[0] {
    Object::Array(elements) => Ok(elements.as_slice()),
    other => Err(Object::error(format!(
      "argument to `{}` must be ARRAY, got {}",
      name,
      other.type_name()
    ))),
  }
}

fn builtin_len(args: Vec<Object>) -> Object {
  if args.len() != 1 {
    return Object::error(format!(
      "len function takes only 1 argument, but {} were given",
      args.len()
    ));
  }

  match &args[0] {
    Object::String(value) => Object::Integer(value.chars().count() as i64),
    Object::Array(elements) => Object::Integer(elements.len() as i64),
    other => Object::error(format!("cannot find len of {} type object", other.type_name())),
  }
}

fn builtin_first(args: Vec<Object>) -> Object {
  match expect_array("first", &args, 1) {
    Ok(elements) => match elements.first() {
      Some(first) => first.clone(),
      None => Object::error("first called on empty ARRAY"),
    },
    Err(error) => error,
  }
}

fn builtin_last(args: Vec<Object>) -> Object {
  match expect_array("last", &args, 1) {
    Ok(elements) => match elements.last() {
      Some(last) => last.clone(),
      None => Object::error("last called on empty ARRAY"),
    },
    Err(error) => error,
  }
}

fn builtin_rest(args: Vec<Object>) -> Object {
  match expect_array("rest", &args, 1) {
    Ok(elements) => Object::array(elements.iter().skip(1).cloned().collect()),
    Err(error) => error,
  }
}

fn builtin_push(args: Vec<Object>) -> Object {
  match expect_array("push", &args, 2) {
    Ok(elements) => {
      let mut pushed = elements.to_vec();
      pushed.push(args[1].clone());
      Object::array(pushed)
    }
    Err(error) => error,
  }
}

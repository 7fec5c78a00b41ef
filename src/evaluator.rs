use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::ast::{
  BinaryOperator, BlockStatement, Expression, ExpressionKind, Program, Statement, StatementKind,
  UnaryOperator,
};
use crate::builtin::builtins;
use crate::env::{Env, EnvId, Heap};
use crate::object::{Function, HashPairs, Object, FALSE, NULL, TRUE};
use crate::stack::ensure_sufficient_stack;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluatorConfig {
  /// Live scope count that triggers a collection between top-level
  /// statements. The trigger point doubles with the surviving set.
  pub gc_threshold: usize,
}

impl Default for EvaluatorConfig {
  fn default() -> Self {
    EvaluatorConfig { gc_threshold: 4096 }
  }
}

#[derive(Debug)]
pub struct Evaluator {
  heap: Heap,
  builtins: HashMap<String, Object>,
  config: EvaluatorConfig,
  next_collection: usize,
}

impl Default for Evaluator {
  fn default() -> Self {
    Evaluator::new()
  }
}

impl Evaluator {
  pub fn new() -> Self {
    Evaluator::with_config(EvaluatorConfig::default())
  }

  pub fn with_config(config: EvaluatorConfig) -> Self {
    Evaluator::with_builtins(config, builtins())
  }

  pub fn with_builtins(config: EvaluatorConfig, builtins: HashMap<String, Object>) -> Self {
    Evaluator {
      heap: Heap::new(),
      builtins,
      config,
      next_collection: config.gc_threshold,
    }
  }

  /// A fresh top-level environment. Reuse it across `eval` calls to keep
  /// bindings between them.
  pub fn new_env(&mut self) -> Env {
    self.heap.root()
  }

  pub fn heap(&self) -> &Heap {
    &self.heap
  }

  /// Reads `name` as an identifier evaluated in `env` would.
  pub fn get(&self, env: &Env, name: &str) -> Option<Object> {
    self
      .heap
      .get(env.id(), name)
      .or_else(|| self.builtins.get(name).cloned())
  }

  /// Frees every scope unreachable from a live `Env` or from `keep`.
  pub fn collect(&mut self, keep: &[Object]) -> usize {
    self.heap.collect(keep)
  }

  pub fn eval(&mut self, program: &Program, env: &Env) -> Object {
    let mut result = NULL;

    for statement in &program.statements {
      result = self.eval_statement(statement, env.id());

      match result {
        Object::Return(value) => return *value,
        Object::Error(_) => return result,
        _ => {}
      }

      self.maybe_collect(&result);
    }

    result
  }

  fn maybe_collect(&mut self, result: &Object) {
    if self.heap.len() < self.next_collection {
      return;
    }

    let freed = self.heap.collect([result]);
    self.next_collection = self.config.gc_threshold.max(self.heap.len() * 2);
    debug!(freed, next = self.next_collection, "scheduled next collection");
  }

  fn eval_block(&mut self, block: &BlockStatement, env: EnvId) -> Object {
    let mut result = NULL;

    for statement in &block.statements {
      result = self.eval_statement(statement, env);

      if matches!(result, Object::Return(_) | Object::Error(_)) {
        return result;
      }
    }

    result
  }

  fn eval_statement(&mut self, statement: &Statement, env: EnvId) -> Object {
    trace!(span = %statement.span, "eval statement");

    match &statement.kind {
      StatementKind::Let { name, value } => {
        let value = self.eval_expression(value, env);
        if value.is_signal() {
          return value;
        }

        if !self.heap.set(env, name.name.clone(), value) {
          return stale_environment();
        }
        NULL
      }
      StatementKind::Return(value) => {
        let value = match value {
          Some(expression) => self.eval_expression(expression, env),
          None => NULL,
        };
        if value.is_signal() {
          return value;
        }

        Object::Return(Box::new(value))
      }
      StatementKind::Expression(expression) => self.eval_expression(expression, env),
    }
  }

  fn eval_expression(&mut self, expression: &Expression, env: EnvId) -> Object {
    ensure_sufficient_stack(|| match &expression.kind {
      ExpressionKind::Identifier(name) => self.eval_identifier(name, env),
      ExpressionKind::Integer(value) => Object::Integer(*value),
      ExpressionKind::String(value) => Object::String(value.clone()),
      ExpressionKind::Boolean(value) => Object::from(*value),
      ExpressionKind::Unary { operator, operand } => {
        let operand = self.eval_expression(operand, env);
        if operand.is_signal() {
          return operand;
        }

        eval_unary_expression(*operator, operand)
      }
      ExpressionKind::Binary { left, operator, right } => {
        let left = self.eval_expression(left, env);
        if left.is_signal() {
          return left;
        }

        let right = self.eval_expression(right, env);
        if right.is_signal() {
          return right;
        }

        eval_binary_expression(left, *operator, right)
      }
      ExpressionKind::If { condition, consequence, alternative } => {
        let condition = self.eval_expression(condition, env);
        if condition.is_signal() {
          return condition;
        }

        if condition.is_truthy() {
          self.eval_block(consequence, env)
        } else if let Some(alternative) = alternative {
          self.eval_block(alternative, env)
        } else {
          NULL
        }
      }
      ExpressionKind::Function(literal) => {
        self.heap.capture(env);
        Object::Function(Rc::new(Function {
          literal: Rc::clone(literal),
          env,
        }))
      }
      ExpressionKind::Call { function, arguments } => {
        let function = self.eval_expression(function, env);
        if function.is_signal() {
          return function;
        }

        match self.eval_expressions(arguments, env) {
          Ok(arguments) => self.apply_function(function, arguments),
          Err(signal) => signal,
        }
      }
      ExpressionKind::Array(elements) => match self.eval_expressions(elements, env) {
        Ok(elements) => Object::array(elements),
        Err(signal) => signal,
      },
      ExpressionKind::Index { left, index } => self.eval_index_expression(left, index, env),
      ExpressionKind::Hash(pairs) => self.eval_hash_literal(pairs, env),
    })
  }

  fn eval_expressions(&mut self, expressions: &[Expression], env: EnvId) -> Result<Vec<Object>, Object> {
    let mut objects = Vec::with_capacity(expressions.len());

    for expression in expressions {
      let object = self.eval_expression(expression, env);
      if object.is_signal() {
        return Err(object);
      }
      objects.push(object);
    }

    Ok(objects)
  }

  fn eval_identifier(&self, name: &str, env: EnvId) -> Object {
    match self.heap.get(env, name) {
      Some(object) => object,
      None => match self.builtins.get(name) {
        Some(builtin) => builtin.clone(),
        None => Object::error(format!("identifier not found: {}", name)),
      },
    }
  }

  fn apply_function(&mut self, function: Object, arguments: Vec<Object>) -> Object {
    match function {
      Object::Function(function) => {
        let parameters = &function.literal.parameters;
        if arguments.len() != parameters.len() {
          return Object::error(format!(
            "len of args dont match len of parameters: {} != {}",
            arguments.len(),
            parameters.len()
          ));
        }

        if !self.heap.contains(function.env) {
          return stale_environment();
        }

        let frame = self.heap.alloc(Some(function.env));
        for (parameter, argument) in parameters.iter().zip(arguments) {
          self.heap.set(frame, parameter.name.clone(), argument);
        }
        trace!(arity = parameters.len(), live = self.heap.len(), "apply function");

        let result = self.eval_block(&function.literal.body, frame);
        self.heap.release(frame);

        match result {
          Object::Return(value) => *value,
          result => result,
        }
      }
      Object::Builtin(builtin) => {
        trace!(name = builtin.name, "apply builtin");
        (builtin.func)(arguments)
      }
      other => Object::error(format!("not a function: {}", other.type_name())),
    }
  }

  fn eval_index_expression(&mut self, left: &Expression, index: &Expression, env: EnvId) -> Object {
    let left = self.eval_expression(left, env);
    if left.is_signal() {
      return left;
    }
    if !matches!(left, Object::Array(_) | Object::Hash(_)) {
      return Object::error(format!("index operator not supported: {}", left.type_name()));
    }

    let index = self.eval_expression(index, env);
    if index.is_signal() {
      return index;
    }

    match (&left, &index) {
      (Object::Array(elements), Object::Integer(i)) => {
        if *i < 0 {
          return Object::error(format!("negative index not supported: {}", i));
        }
        match elements.get(*i as usize) {
          Some(element) => element.clone(),
          None => Object::error(format!("index out of range: {}", i)),
        }
      }
      (Object::Array(_), other) => Object::error(format!(
        "index operator not supported: ARRAY[{}]",
        other.type_name()
      )),
      (Object::Hash(pairs), key) => match key.hash_key() {
        Some(key) => match pairs.get(&key) {
          Some(value) => value.clone(),
          None => Object::error("key not found"),
        },
        None => Object::error(format!("unusable as hash key: {}", key.type_name())),
      },
      _ => Object::error(format!("index operator not supported: {}", left.type_name())),
    }
  }

  fn eval_hash_literal(&mut self, pairs: &[(Expression, Expression)], env: EnvId) -> Object {
    let mut hash = HashPairs::new();

    for (key, value) in pairs {
      let key = self.eval_expression(key, env);
      if key.is_signal() {
        return key;
      }
      let Some(hash_key) = key.hash_key() else {
        return Object::error(format!("unusable as hash key: {}", key.type_name()));
      };

      let value = self.eval_expression(value, env);
      if value.is_signal() {
        return value;
      }

      hash.insert(hash_key, value);
    }

    Object::Hash(Rc::new(hash))
  }
}

fn stale_environment() -> Object {
  Object::error("environment has been reclaimed")
}

fn eval_unary_expression(operator: UnaryOperator, operand: Object) -> Object {
  match operator {
    UnaryOperator::Not => match operand {
      Object::Null => TRUE,
      Object::Boolean(value) => Object::from(!value),
      Object::Integer(value) => Object::from(value == 0),
      _ => FALSE,
    },
    UnaryOperator::Negate => match operand {
      Object::Integer(value) => match value.checked_neg() {
        Some(negated) => Object::Integer(negated),
        None => Object::error(format!("integer overflow: -{}", value)),
      },
      other => Object::error(format!("unknown operator: -{}", other.type_name())),
    },
  }
}

fn eval_binary_expression(left: Object, operator: BinaryOperator, right: Object) -> Object {
  match (&left, &right) {
    (Object::Integer(l), Object::Integer(r)) => eval_integer_binary_expression(*l, operator, *r),
    (Object::Boolean(l), Object::Boolean(r)) => match operator {
      BinaryOperator::Equal => Object::from(l == r),
      BinaryOperator::NotEqual => Object::from(l != r),
      _ => unknown_operator(&left, operator, &right),
    },
    (Object::String(l), Object::String(r)) => match operator {
      BinaryOperator::Add => Object::String(format!("{}{}", l, r)),
      _ => unknown_operator(&left, operator, &right),
    },
    _ if left.type_name() != right.type_name() => Object::error(format!(
      "type mismatch: {} {} {}",
      left.type_name(),
      operator,
      right.type_name()
    )),
    _ => unknown_operator(&left, operator, &right),
  }
}

fn unknown_operator(left: &Object, operator: BinaryOperator, right: &Object) -> Object {
  Object::error(format!(
    "unknown operator: {} {} {}",
    left.type_name(),
    operator,
    right.type_name()
  ))
}

fn eval_integer_binary_expression(left: i64, operator: BinaryOperator, right: i64) -> Object {
  let checked = match operator {
    BinaryOperator::Add => left.checked_add(right),
    BinaryOperator::Subtract => left.checked_sub(right),
    BinaryOperator::Multiply => left.checked_mul(right),
    BinaryOperator::Divide => {
      if right == 0 {
        return Object::error("division by zero");
      }
      floor_div(left, right)
    }
    BinaryOperator::Less => return Object::from(left < right),
    BinaryOperator::Greater => return Object::from(left > right),
    BinaryOperator::Equal => return Object::from(left == right),
    BinaryOperator::NotEqual => return Object::from(left != right),
  };

  match checked {
    Some(value) => Object::Integer(value),
    None => Object::error(format!("integer overflow: {} {} {}", left, operator, right)),
  }
}

/// Division rounding toward negative infinity. `None` on overflow.
fn floor_div(left: i64, right: i64) -> Option<i64> {
  let quotient = left.checked_div(right)?;
  if left % right != 0 && (left < 0) != (right < 0) {
    Some(quotient - 1)
  } else {
    Some(quotient)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::parser::parse;
  use pretty_assertions::assert_eq;

  fn eval(input: &str) -> Object {
    let (program, errors) = parse(input);
    assert!(errors.is_empty(), "parse errors for {:?}: {:?}", input, errors);

    let mut evaluator = Evaluator::new();
    let env = evaluator.new_env();
    evaluator.eval(&program, &env)
  }

  fn assert_evals(tests: &[(&str, Object)]) {
    for (input, expected) in tests {
      assert_eq!(&eval(input), expected, "input: {}", input);
    }
  }

  fn int(value: i64) -> Object {
    Object::Integer(value)
  }

  fn error(message: &str) -> Object {
    Object::error(message)
  }

  #[test]
  fn test_integer_expressions() {
    assert_evals(&[
      ("5", int(5)),
      ("-10", int(-10)),
      ("5 + 5 + 5 + 5 - 10", int(10)),
      ("2 * 2 * 2 * 2 * 2", int(32)),
      ("-50 + 100 + -50", int(0)),
      ("20 + 2 * -10", int(0)),
      ("50 / 2 * 2 + 10", int(60)),
      ("3 * (3 * 3) + 10", int(37)),
      ("(5 + 10 * 2 + 15 / 3) * 2 + -10", int(50)),
    ]);
  }

  #[test]
  fn test_division_floors() {
    assert_evals(&[
      ("7 / 2", int(3)),
      ("-7 / 2", int(-4)),
      ("7 / -2", int(-4)),
      ("-7 / -2", int(3)),
      ("6 / -3", int(-2)),
      ("0 / 5", int(0)),
    ]);
  }

  #[test]
  fn test_division_by_zero() {
    assert_evals(&[
      ("1 / 0", error("division by zero")),
      ("0 / 0", error("division by zero")),
      ("let x = 10; x / (x - 10)", error("division by zero")),
    ]);
  }

  #[test]
  fn test_integer_overflow() {
    assert_evals(&[
      ("9223372036854775807 + 1", error("integer overflow: 9223372036854775807 + 1")),
      ("-9223372036854775807 - 2", error("integer overflow: -9223372036854775807 - 2")),
      ("(-9223372036854775807 - 1) / -1", error("integer overflow: -9223372036854775808 / -1")),
      ("-(-9223372036854775807 - 1)", error("integer overflow: --9223372036854775808")),
    ]);
  }

  #[test]
  fn test_boolean_expressions() {
    assert_evals(&[
      ("true", TRUE),
      ("false", FALSE),
      ("1 < 2", TRUE),
      ("1 > 2", FALSE),
      ("1 == 1", TRUE),
      ("1 != 1", FALSE),
      ("true == true", TRUE),
      ("true != false", TRUE),
      ("(1 < 2) == true", TRUE),
      ("(1 > 2) == true", FALSE),
    ]);
  }

  #[test]
  fn test_bang_operator() {
    assert_evals(&[
      ("!true", FALSE),
      ("!false", TRUE),
      ("!5", FALSE),
      ("!0", TRUE),
      ("!!true", TRUE),
      ("!!5", TRUE),
      ("!\"\"", FALSE),
      ("!if (false) { 1 }", TRUE),
    ]);
  }

  #[test]
  fn test_if_else_expressions() {
    assert_evals(&[
      ("if (true) { 10 }", int(10)),
      ("if (false) { 10 }", NULL),
      ("if (1) { 10 }", int(10)),
      ("if (0) { 10 } else { 20 }", int(10)),
      ("if (1 < 2) { 10 }", int(10)),
      ("if (1 > 2) { 10 } else { 20 }", int(20)),
      ("if (if (false) { 1 }) { 10 } else { 20 }", int(20)),
    ]);
  }

  #[test]
  fn test_return_statements() {
    assert_evals(&[
      ("return 10;", int(10)),
      ("return 10; 9;", int(10)),
      ("return 2 * 5; 9;", int(10)),
      ("9; return 2 * 5; 9;", int(10)),
      ("return; 9;", NULL),
      ("if (10 > 1) { if (10 > 1) { return 10; } return 1; }", int(10)),
      (
        "let max = fn(x, y) { if (x > y) { x; return 1000000000; } else { y } }; max(10, 5);",
        int(1_000_000_000),
      ),
      ("let f = fn() { return; 5 }; f()", NULL),
    ]);
  }

  #[test]
  fn test_error_handling() {
    assert_evals(&[
      ("5 + true;", error("type mismatch: INTEGER + BOOLEAN")),
      ("5 + true; 5;", error("type mismatch: INTEGER + BOOLEAN")),
      ("-true", error("unknown operator: -BOOLEAN")),
      ("true + false;", error("unknown operator: BOOLEAN + BOOLEAN")),
      ("5; true + false; 5", error("unknown operator: BOOLEAN + BOOLEAN")),
      ("if (10 > 1) { true + false; }", error("unknown operator: BOOLEAN + BOOLEAN")),
      (
        "if (10 > 1) { if (10 > 1) { return true + false; } return 1; }",
        error("unknown operator: BOOLEAN + BOOLEAN"),
      ),
      ("foobar", error("identifier not found: foobar")),
      ("\"Hello\" - \"World\"", error("unknown operator: STRING - STRING")),
      ("\"a\" == \"a\"", error("unknown operator: STRING == STRING")),
      ("true < false", error("unknown operator: BOOLEAN < BOOLEAN")),
      ("[1] + [2]", error("unknown operator: ARRAY + ARRAY")),
      ("\"a\" + 1", error("type mismatch: STRING + INTEGER")),
      ("let x = foo; x", error("identifier not found: foo")),
    ]);
  }

  #[test]
  fn test_error_short_circuits_left_to_right() {
    assert_evals(&[
      ("a + b", error("identifier not found: a")),
      ("1 + b", error("identifier not found: b")),
      ("len(a, b)", error("identifier not found: a")),
      ("[1, b, c]", error("identifier not found: b")),
      ("{a: 1}", error("identifier not found: a")),
      ("{1: b}", error("identifier not found: b")),
    ]);
  }

  #[test]
  fn test_let_statements() {
    assert_evals(&[
      ("let a = 5; a;", int(5)),
      ("let a = 5 * 5; a;", int(25)),
      ("let a = 5; let b = a; b;", int(5)),
      ("let a = 5; let b = a; let c = a + b + 5; c;", int(15)),
      ("let a = 5;", NULL),
      ("let a = 1; let a = 2; a", int(2)),
    ]);
  }

  #[test]
  fn test_function_object() {
    match eval("fn(x) { x + 2; };") {
      Object::Function(function) => {
        assert_eq!(function.literal.parameters.len(), 1);
        assert_eq!(function.literal.parameters[0].name, "x");
        assert_eq!(function.literal.body.to_string(), "{ (x + 2); }");
      }
      other => panic!("expected function, got {:?}", other),
    }
  }

  #[test]
  fn test_function_application() {
    assert_evals(&[
      ("let identity = fn(x) { x; }; identity(5);", int(5)),
      ("let identity = fn(x) { return x; }; identity(5);", int(5)),
      ("let double = fn(x) { x * 2; }; double(5);", int(10)),
      ("let add = fn(x, y) { x + y; }; add(5, 5);", int(10)),
      ("let add = fn(x, y) { x + y; }; add(5 + 5, add(5, 5));", int(20)),
      ("fn(x) { x; }(5)", int(5)),
      ("fn() { }()", NULL),
    ]);
  }

  #[test]
  fn test_arity_mismatch() {
    assert_evals(&[
      (
        "let add = fn(x, y) { x + y }; add(1)",
        error("len of args dont match len of parameters: 1 != 2"),
      ),
      ("fn() { 1 }(1, 2)", error("len of args dont match len of parameters: 2 != 0")),
    ]);
  }

  #[test]
  fn test_not_a_function() {
    assert_evals(&[
      ("5()", error("not a function: INTEGER")),
      ("let x = \"f\"; x(1)", error("not a function: STRING")),
    ]);
  }

  #[test]
  fn test_closures() {
    assert_evals(&[
      (
        "let newAdder = fn(x) { fn(n) { x + n } }; let addTwo = newAdder(2); addTwo(3);",
        int(5),
      ),
      (
        "let x = 1; let f = fn() { x }; let x = 2; f()",
        int(2),
      ),
      (
        "let compose = fn(f, g) { fn(x) { g(f(x)) } }; let inc = fn(x) { x + 1 }; compose(inc, inc)(1)",
        int(3),
      ),
    ]);
  }

  #[test]
  fn test_parameters_shadow_outer_bindings() {
    assert_evals(&[
      ("let x = 10; let f = fn(x) { x }; f(1) + x", int(11)),
      ("let x = 10; let f = fn() { let x = 1; x }; f() + x", int(11)),
    ]);
  }

  #[test]
  fn test_recursion() {
    assert_evals(&[
      (
        "let factorial = fn(n) { if (n == 0) { 1 } else { n * factorial(n - 1) } }; factorial(5);",
        int(120),
      ),
      (
        "let fib = fn(n) { if (n < 2) { n } else { fib(n - 1) + fib(n - 2) } }; fib(15)",
        int(610),
      ),
    ]);
  }

  #[test]
  fn test_deep_recursion_does_not_overflow() {
    assert_evals(&[(
      "let count = fn(n) { if (n == 0) { 0 } else { 1 + count(n - 1) } }; count(20000)",
      int(20000),
    )]);
  }

  #[test]
  fn test_strings() {
    assert_evals(&[
      ("\"Hello World!\"", Object::String("Hello World!".to_owned())),
      ("\"Hello\" + \" \" + \"World!\"", Object::String("Hello World!".to_owned())),
    ]);
  }

  #[test]
  fn test_builtin_functions() {
    assert_evals(&[
      ("len(\"\")", int(0)),
      ("len(\"four\")", int(4)),
      ("len(\"hello world\")", int(11)),
      ("len([1, 2, 3])", int(3)),
      ("len(1)", error("cannot find len of INTEGER type object")),
      ("first([1, 2, 3])", int(1)),
      ("last([1, 2, 3])", int(3)),
      ("rest([1, 2, 3])", Object::array(vec![int(2), int(3)])),
      ("push([], 1)", Object::array(vec![int(1)])),
      ("first(1)", error("argument to `first` must be ARRAY, got INTEGER")),
    ]);
  }

  #[test]
  fn test_push_does_not_mutate_binding() {
    assert_evals(&[
      ("let a = [1, 2]; let b = push(a, 3); a", Object::array(vec![int(1), int(2)])),
      ("let a = [1, 2]; let b = push(a, 3); b", Object::array(vec![int(1), int(2), int(3)])),
    ]);
  }

  #[test]
  fn test_bindings_shadow_builtins() {
    assert_evals(&[("let len = fn(x) { 42 }; len(\"abc\")", int(42))]);
  }

  #[test]
  fn test_array_literals_and_indexing() {
    assert_evals(&[
      ("[1, 2 * 2, 3 + 3]", Object::array(vec![int(1), int(4), int(6)])),
      ("[1, 2, 3][0]", int(1)),
      ("[1, 2, 3][1]", int(2)),
      ("let i = 0; [1][i];", int(1)),
      ("[1, 2, 3][1 + 1];", int(3)),
      ("let myArray = [1, 2, 3]; myArray[2];", int(3)),
      ("let myArray = [1, 2, 3]; myArray[0] + myArray[1] + myArray[2];", int(6)),
      ("[1, 2, 3][3]", error("index out of range: 3")),
      ("[1, 2, 3][-1]", error("negative index not supported: -1")),
      ("[1, 2, 3][true]", error("index operator not supported: ARRAY[BOOLEAN]")),
      ("1[0]", error("index operator not supported: INTEGER")),
    ]);
  }

  #[test]
  fn test_hash_literals() {
    let result = eval(
      r#"let two = "two";
      {
        "one": 10 - 9,
        two: 1 + 1,
        "thr" + "ee": 6 / 2,
        4: 4,
        true: 5,
        false: 6
      }"#,
    );

    let mut expected = HashPairs::new();
    expected.insert(crate::object::HashKey::String("one".to_owned()), int(1));
    expected.insert(crate::object::HashKey::String("two".to_owned()), int(2));
    expected.insert(crate::object::HashKey::String("three".to_owned()), int(3));
    expected.insert(crate::object::HashKey::Integer(4), int(4));
    expected.insert(crate::object::HashKey::Boolean(true), int(5));
    expected.insert(crate::object::HashKey::Boolean(false), int(6));

    assert_eq!(result, Object::Hash(Rc::new(expected)));
  }

  #[test]
  fn test_hash_indexing() {
    assert_evals(&[
      ("{\"foo\": 5}[\"foo\"]", int(5)),
      ("{\"foo\": 5}[\"bar\"]", error("key not found")),
      ("let key = \"foo\"; {\"foo\": 5}[key]", int(5)),
      ("{}[\"foo\"]", error("key not found")),
      ("{5: 5}[5]", int(5)),
      ("{true: 5}[true]", int(5)),
      ("{false: 5}[false]", int(5)),
      ("{1: \"a\", 1: \"b\"}[1]", Object::String("b".to_owned())),
      ("{\"name\": \"Monkey\"}[fn(x) { x }];", error("unusable as hash key: FUNCTION")),
      ("{[1]: 2}", error("unusable as hash key: ARRAY")),
    ]);
  }

  #[test]
  fn test_program_state_persists_across_evaluations() {
    let mut evaluator = Evaluator::new();
    let env = evaluator.new_env();

    let (first, _) = parse("let a = 5; let f = fn(x) { x * a };");
    assert_eq!(evaluator.eval(&first, &env), NULL);

    let (second, _) = parse("f(2)");
    assert_eq!(evaluator.eval(&second, &env), int(10));
    assert_eq!(evaluator.get(&env, "a"), Some(int(5)));
  }

  #[test]
  fn test_call_frames_are_collected() {
    let mut evaluator = Evaluator::with_config(EvaluatorConfig { gc_threshold: 8 });
    let env = evaluator.new_env();

    let (program, _) = parse(
      "let wrap = fn(n) { fn() { n } }; let count = fn(n) { if (n == 0) { 0 } else { wrap(n); 1 + count(n - 1) } }; count(100); 1",
    );
    assert_eq!(evaluator.eval(&program, &env), int(1));
    assert!(evaluator.heap().len() < 100, "live scopes: {}", evaluator.heap().len());
  }

  #[test]
  fn test_uncaptured_frames_are_freed_on_return() {
    let mut evaluator = Evaluator::with_config(EvaluatorConfig { gc_threshold: usize::MAX });
    let env = evaluator.new_env();

    let (program, _) = parse(
      "let fib = fn(n) { if (n < 2) { n } else { fib(n - 1) + fib(n - 2) } }; fib(22)",
    );
    assert_eq!(evaluator.eval(&program, &env), int(17711));
    assert_eq!(evaluator.heap().len(), 1);
  }

  #[test]
  fn test_captured_frames_wait_for_collection() {
    let mut evaluator = Evaluator::with_config(EvaluatorConfig { gc_threshold: usize::MAX });
    let env = evaluator.new_env();

    let (program, _) = parse("let wrap = fn(n) { fn() { n } }; wrap(1); wrap(2); 0");
    assert_eq!(evaluator.eval(&program, &env), int(0));
    assert_eq!(evaluator.heap().len(), 3);

    assert_eq!(evaluator.collect(&[]), 2);
    assert_eq!(evaluator.heap().len(), 1);
  }

  #[test]
  fn test_return_inside_expression_unwinds_to_call() {
    assert_evals(&[
      ("let f = fn() { let x = if (true) { return 5; }; 10 }; f()", int(5)),
      ("let x = if (true) { return 5; }; x + 1", int(5)),
      ("fn() { [if (true) { return 5; }] }()", int(5)),
      ("fn() { 1 + if (true) { return 2; } }()", int(2)),
      ("fn() { -if (true) { return 3; } }()", int(3)),
      ("fn() { {if (true) { return 4; }: 1} }()", int(4)),
      ("fn() { [1][if (true) { return 6; }] }()", int(6)),
      ("fn() { len(if (true) { return 7; }) }()", int(7)),
    ]);
  }

  #[test]
  fn test_returned_closure_survives_collection() {
    let mut evaluator = Evaluator::with_config(EvaluatorConfig { gc_threshold: 1 });
    let env = evaluator.new_env();

    let (program, _) = parse("let newAdder = fn(x) { fn(n) { x + n } }; newAdder(40)");
    let add = evaluator.eval(&program, &env);
    assert!(matches!(add, Object::Function(_)));

    evaluator.collect(&[add.clone()]);
    assert_eq!(evaluator.apply_function(add.clone(), vec![int(2)]), int(42));

    evaluator.collect(&[]);
    assert_eq!(
      evaluator.apply_function(add, vec![int(2)]),
      error("environment has been reclaimed")
    );
  }

  #[test]
  fn test_self_referential_closure_is_reclaimed() {
    let mut evaluator = Evaluator::new();
    let env = evaluator.new_env();
    let (program, _) = parse("let f = fn() { f }; f");
    evaluator.eval(&program, &env);

    drop(env);
    evaluator.collect(&[]);
    assert!(evaluator.heap().is_empty());
  }
}

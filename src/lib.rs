pub mod ast;
pub mod token;
pub mod lexer;
pub mod parser;
pub mod object;
pub mod evaluator;
pub mod env;
pub mod builtin;
pub mod error;
pub mod repl;
mod stack;

pub use env::Env;
pub use error::{Error, ParseError};
pub use evaluator::{Evaluator, EvaluatorConfig};
pub use object::Object;

/// Parses and evaluates `source` in `env`, turning parse errors and a
/// final runtime error into [`Error`].
///
/// The returned value is not rooted. A function in it that is not also
/// bound in a live [`Env`] may have its closure scope reclaimed by a later
/// evaluation on the same `evaluator`, after which calling it yields
/// `Error: environment has been reclaimed`. Bind it with `let` or pass it to
/// [`Evaluator::collect`] as `keep` to hold on to it.
pub fn run(evaluator: &mut Evaluator, env: &Env, source: &str) -> Result<Object, Error> {
    let (program, errors) = parser::parse(source);
    if !errors.is_empty() {
        return Err(Error::Parse(errors));
    }

    match evaluator.eval(&program, env) {
        Object::Error(message) => Err(Error::Runtime(message)),
        object => Ok(object),
    }
}

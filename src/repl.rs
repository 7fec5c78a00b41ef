use std::io::{self, BufRead, Write};

use crate::evaluator::Evaluator;
use crate::lexer::Lexer;
use crate::parser::Parser;

pub const PROMPT: &str = ">> ";

#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    /// Print every token of a line before parsing it.
    pub dump_tokens: bool,
    /// Print the parsed program instead of evaluating it.
    pub print_ast: bool,
}

/// Reads lines from `input` until end of input, evaluating each one in a
/// single top-level environment.
pub fn start<R: BufRead, W: Write>(
    mut input: R,
    mut output: W,
    evaluator: &mut Evaluator,
    options: &Options,
) -> io::Result<()> {
    let env = evaluator.new_env();
    let mut line = String::new();

    loop {
        write!(output, "{}", PROMPT)?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            writeln!(output)?;
            return Ok(());
        }
        if line.trim().is_empty() {
            continue;
        }

        let tokens = Lexer::new(&line).lex();
        if options.dump_tokens {
            for token in &tokens {
                writeln!(output, "{}\t{}\t{:?}", token.span, token.kind, token.text)?;
            }
        }

        let mut parser = Parser::new(tokens);
        let program = parser.parse_program();
        let errors = parser.into_errors();
        if !errors.is_empty() {
            for error in &errors {
                writeln!(output, "\t{}", error)?;
            }
            continue;
        }

        if options.print_ast {
            writeln!(output, "{}", program)?;
            continue;
        }

        let result = evaluator.eval(&program, &env);
        writeln!(output, "{}", result)?;
    }
}

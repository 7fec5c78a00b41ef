use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use monkey::lexer::Lexer;
use monkey::repl::{self, Options};
use monkey::{Error, Evaluator, EvaluatorConfig};

/// A tree-walking interpreter for the Monkey programming language.
#[derive(Parser, Debug)]
#[clap(version, about, long_about = None)]
struct Args {
    /// Script to run. Starts the REPL when omitted.
    file: Option<PathBuf>,

    /// Print the token stream before parsing.
    #[clap(long)]
    tokens: bool,

    /// Print the parsed program instead of evaluating it.
    #[clap(long)]
    ast: bool,

    /// Log parser and collector activity at debug level.
    #[clap(short, long)]
    verbose: bool,

    /// Live scope count that triggers a collection.
    #[clap(long, value_parser, default_value_t = EvaluatorConfig::default().gc_threshold)]
    gc_threshold: usize,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("monkey=debug")
    } else if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        return;
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(true).with_level(true))
        .with(filter)
        .init();
}

fn run_file(path: &Path, evaluator: &mut Evaluator, options: &Options) -> Result<(), Error> {
    let source = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_owned(),
        source,
    })?;

    if options.dump_tokens {
        for token in Lexer::new(&source) {
            println!("{}\t{}\t{:?}", token.span, token.kind, token.text);
        }
    }

    if options.print_ast {
        let (program, errors) = monkey::parser::parse(&source);
        if !errors.is_empty() {
            return Err(Error::Parse(errors));
        }
        println!("{}", program);
        return Ok(());
    }

    let env = evaluator.new_env();
    let result = monkey::run(evaluator, &env, &source)?;
    println!("{}", result);
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut evaluator = Evaluator::with_config(EvaluatorConfig {
        gc_threshold: args.gc_threshold,
    });
    let options = Options {
        dump_tokens: args.tokens,
        print_ast: args.ast,
    };

    match args.file {
        Some(path) => match run_file(&path, &mut evaluator, &options) {
            Ok(()) => ExitCode::SUCCESS,
            Err(error) => {
                eprintln!("{}", error);
                ExitCode::FAILURE
            }
        },
        None => {
            println!("Hello! This is the Monkey programming language!");
            println!("Feel free to type in commands");

            let stdin = io::stdin();
            match repl::start(stdin.lock(), io::stdout(), &mut evaluator, &options) {
                Ok(()) => ExitCode::SUCCESS,
                Err(error) => {
                    eprintln!("{}", error);
                    ExitCode::FAILURE
                }
            }
        }
    }
}

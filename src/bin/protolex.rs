use std::{path::PathBuf, process::ExitCode};

use clap::{Parser, Subcommand};

use protolex::{ExecutionContext, Interpreter, Outcome, ProtolexError, Repl, DEFAULT_MAX_CALL_DEPTH};

#[derive(Parser)]
#[command(author, version, about = "Protolex language interpreter")]
struct Args {
    /// Interpreted call depth at which calls throw "stack overflow"
    #[arg(long, global = true, env = "PROTOLEX_MAX_CALL_DEPTH", default_value_t = DEFAULT_MAX_CALL_DEPTH)]
    max_call_depth: usize,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a Protolex script file
    Run {
        script: PathBuf,
        /// Arguments exposed to the script through `sys.args`
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Start an interactive REPL session
    Repl,
    /// Evaluate a snippet of Protolex code
    Eval { source: String },
}

fn main() -> ExitCode {
    protolex::init_tracing();
    let args = Args::parse();
    let result = match args.command.unwrap_or(Command::Repl) {
        Command::Run { script, args: script_args } => {
            let context = ExecutionContext::for_script(script.clone(), script_args)
                .with_max_call_depth(args.max_call_depth);
            Interpreter::with_context(context).run_file(&script).map(Some)
        }
        Command::Eval { source } => {
            let context = ExecutionContext::default().with_max_call_depth(args.max_call_depth);
            Interpreter::with_context(context).eval_source(&source).map(Some)
        }
        Command::Repl => {
            let context = ExecutionContext::default().with_max_call_depth(args.max_call_depth);
            Repl::with_context(context).run().map(|()| None)
        }
    };
    match result {
        Ok(None | Some(Outcome::Normal(_))) => ExitCode::SUCCESS,
        Ok(Some(Outcome::Thrown(value))) => {
            eprintln!("uncaught exception: {value}");
            ExitCode::FAILURE
        }
        Err(ProtolexError::Exit(code)) => {
            u8::try_from(code).map_or(ExitCode::FAILURE, ExitCode::from)
        }
        Err(err) => {
            eprintln!("fatal: {err}");
            ExitCode::FAILURE
        }
    }
}

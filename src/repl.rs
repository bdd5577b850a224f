use rustyline::{error::ReadlineError, DefaultEditor};

use crate::{
    config::ExecutionContext,
    diagnostics::{ProtolexError, Result},
    runtime::{Interpreter, Outcome},
};

/// Line-oriented session over one persistent interpreter.
pub struct Repl {
    interpreter: Interpreter,
}

impl Default for Repl {
    fn default() -> Self {
        Self::new()
    }
}

impl Repl {
    pub fn new() -> Self {
        Self::with_context(ExecutionContext::default())
    }

    pub fn with_context(context: ExecutionContext) -> Self {
        Self {
            interpreter: Interpreter::with_context(context),
        }
    }

    pub fn run(&mut self) -> Result<()> {
        let mut editor = DefaultEditor::new().map_err(readline_error)?;
        loop {
            match editor.readline(">> ") {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed == ":quit" || trimmed == ":exit" {
                        break;
                    }
                    if trimmed.is_empty() {
                        continue;
                    }
                    editor.add_history_entry(trimmed).ok();
                    match self.interpreter.eval_source(trimmed) {
                        Ok(Outcome::Normal(value)) => println!("{value}"),
                        Ok(Outcome::Thrown(value)) => eprintln!("uncaught exception: {value}"),
                        Err(ProtolexError::Exit(code)) => {
                            return Err(ProtolexError::Exit(code));
                        }
                        Err(err) => eprintln!("fatal: {err}"),
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(err) => return Err(readline_error(err)),
            }
        }
        Ok(())
    }
}

fn readline_error(err: ReadlineError) -> ProtolexError {
    ProtolexError::from(std::io::Error::new(std::io::ErrorKind::Other, err))
}

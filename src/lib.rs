//! Protolex: a tree-walking interpreter for a small prototype-based
//! scripting language with frozen tables, `mutate` scopes and
//! try/catch/finally.
//!
//! Source flows through [`lexer::lex`], [`parser::parse`] and the
//! [`Interpreter`]. Fatal conditions surface as [`ProtolexError`]; language
//! exceptions travel as [`Outcome::Thrown`].

pub mod ast;
pub mod config;
pub mod diagnostics;
pub mod environment;
pub mod lexer;
pub mod parser;
pub mod repl;
pub mod runtime;
mod stack;
pub mod stdlib;
pub mod table;
pub mod value;

use std::sync::Once;

pub use config::{ExecutionContext, DEFAULT_MAX_CALL_DEPTH};
pub use diagnostics::{Diagnostic, DiagnosticKind, ProtolexError, Result, SourcePos};
pub use repl::Repl;
pub use runtime::{Interpreter, Outcome};
pub use table::{Table, TableError, TableRef};
pub use value::Value;

static TRACING_INIT: Once = Once::new();

/// Installs a stderr `tracing` subscriber when `PROTOLEX_LOG` (or, failing
/// that, `RUST_LOG`) is set. Safe to call more than once.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        let directives = std::env::var("PROTOLEX_LOG").or_else(|_| std::env::var("RUST_LOG"));
        if let Ok(directives) = directives {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
                .with(EnvFilter::new(directives))
                .init();
        }
    });
}

use std::{fmt, path::PathBuf};

use thiserror::Error;

/// Line/column position within a source file, both 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourcePos {
    pub line: u32,
    pub col: u32,
}

impl SourcePos {
    pub const fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }
}

impl fmt::Display for SourcePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// Classification of a diagnostic event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    Lexer,
    Parser,
    Runtime,
}

/// A fatal condition surfaced to the host. Never visible to `try`/`catch`.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub pos: Option<SourcePos>,
    pub file: Option<PathBuf>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            pos: None,
            file: None,
        }
    }

    pub fn lexer(message: impl Into<String>, pos: SourcePos) -> Self {
        Self::new(DiagnosticKind::Lexer, message).with_pos(pos)
    }

    pub fn parser(message: impl Into<String>, pos: SourcePos) -> Self {
        Self::new(DiagnosticKind::Parser, message).with_pos(pos)
    }

    pub fn runtime(message: impl Into<String>, pos: SourcePos) -> Self {
        Self::new(DiagnosticKind::Runtime, message).with_pos(pos)
    }

    pub fn with_pos(mut self, pos: SourcePos) -> Self {
        self.pos = Some(pos);
        self
    }

    /// Attaches a file name unless one was already recorded closer to the
    /// failure (a nested import keeps its own file).
    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        if self.file.is_none() {
            self.file = Some(file.into());
        }
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        match (&self.file, self.pos) {
            (Some(file), Some(pos)) => write!(f, " at {}:{pos}", file.display()),
            (None, Some(pos)) => write!(f, " at {pos}"),
            (Some(file), None) => write!(f, " in {}", file.display()),
            (None, None) => Ok(()),
        }
    }
}

impl std::error::Error for Diagnostic {}

/// Fatal error channel of the toolchain.
#[derive(Debug, Error)]
pub enum ProtolexError {
    #[error("{0}")]
    Diagnostic(#[from] Diagnostic),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("script requested exit with status {0}")]
    Exit(i32),
}

impl ProtolexError {
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            ProtolexError::Diagnostic(diag) => Some(diag),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProtolexError>;

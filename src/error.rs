//! Centralised error hierarchy for the interpreter.
//!
//! All subsystems (scanner, parser, resolver, runtime, CLI) convert their
//! internal failure modes into one of the variants defined here.  This enables a
//! uniform `Result<T>` alias throughout the crate and ergonomic inter‑operation
//! with `anyhow`, while still preserving rich diagnostic detail.
//!
//! At the embedding boundary errors are flattened into [`Diagnostic`]s and a
//! [`RunResult`], both serialisable so a host can ship them across a message
//! channel.
//!
//! The module **does not** print diagnostics itself.

use std::fmt;
use std::io;

use log::info;
use serde::Serialize;
use thiserror::Error;

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Lexical (scanner) error with source position.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human‑readable description.
        message: String,

        /// 1‑based line where the error occurred.
        line: usize,

        /// 1‑based byte column where the offending lexeme starts.
        column: usize,
    },

    /// Syntactic (parser) error.
    #[error("[line {line}] Error at {location}: {message}")]
    Parse {
        message: String,
        /// Quoted offending lexeme, or `end`.
        location: String,
        line: usize,
        column: usize,
    },

    /// Static‑analysis or resolution failure (e.g. `this` outside a class).
    #[error("[line {line}] Error at {location}: {message}")]
    Resolve {
        message: String,
        location: String,
        line: usize,
        column: usize,
    },

    /// Runtime evaluation error.
    #[error("[line {line}] Runtime error: {message}")]
    Runtime { message: String, line: usize },

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl LoxError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, column: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        LoxError::Lex {
            message,
            line,
            column,
        }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(line: usize, column: usize, location: String, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", line, message);

        LoxError::Parse {
            message,
            location,
            line,
            column,
        }
    }

    /// Helper constructor for the **resolver**.
    pub fn resolve<S: Into<String>>(line: usize, column: usize, name: &str, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Resolve error: line={}, msg={}", line, message);

        LoxError::Resolve {
            message,
            location: format!("'{}'", name),
            line,
            column,
        }
    }

    /// Helper constructor for the **evaluator**.
    pub fn runtime<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Runtime error: line={}, msg={}", line, message);

        LoxError::Runtime { message, line }
    }

    /// Which taxonomy this error belongs to.
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            LoxError::Lex { .. } => DiagnosticKind::Lexical,
            LoxError::Parse { .. } => DiagnosticKind::Syntax,
            LoxError::Resolve { .. } => DiagnosticKind::Resolution,
            LoxError::Runtime { .. } | LoxError::Io(_) => DiagnosticKind::Runtime,
        }
    }

    /// Source line, when the error has one.
    pub fn line(&self) -> usize {
        match self {
            LoxError::Lex { line, .. }
            | LoxError::Parse { line, .. }
            | LoxError::Resolve { line, .. }
            | LoxError::Runtime { line, .. } => *line,
            LoxError::Io(_) => 0,
        }
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;

/// The four failure classes an embedding can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    Lexical,
    Syntax,
    Resolution,
    Runtime,
}

/// A flattened, host‑facing view of a [`LoxError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    pub message: String,
}

impl From<&LoxError> for Diagnostic {
    fn from(error: &LoxError) -> Self {
        let (column, message) = match error {
            LoxError::Lex {
                message, column, ..
            } => (Some(*column), message.clone()),
            LoxError::Parse {
                message,
                location,
                column,
                ..
            }
            | LoxError::Resolve {
                message,
                location,
                column,
                ..
            } => (Some(*column), format!("at {}: {}", location, message)),
            LoxError::Runtime { message, .. } => (None, message.clone()),
            LoxError::Io(e) => (None, e.to_string()),
        };

        Diagnostic {
            kind: error.kind(),
            line: error.line(),
            column,
            message,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            DiagnosticKind::Runtime => {
                write!(f, "[line {}] Runtime error: {}", self.line, self.message)
            }
            DiagnosticKind::Lexical => write!(f, "[line {}] Error: {}", self.line, self.message),
            DiagnosticKind::Syntax | DiagnosticKind::Resolution => {
                write!(f, "[line {}] Error {}", self.line, self.message)
            }
        }
    }
}

/// Outcome of one `interpret` call.
///
/// Static problems (lexical, syntax and resolution) are all collected and
/// reported together under `SyntaxErrors`; each entry keeps its own
/// [`DiagnosticKind`].  A runtime error stops the run at the first failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum RunResult {
    Success,
    SyntaxErrors(Vec<Diagnostic>),
    RuntimeError(Diagnostic),
}

impl RunResult {
    pub fn is_success(&self) -> bool {
        matches!(self, RunResult::Success)
    }

    /// Every diagnostic carried by this result, in report order.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            RunResult::Success => &[],
            RunResult::SyntaxErrors(errors) => errors,
            RunResult::RuntimeError(error) => std::slice::from_ref(error),
        }
    }
}

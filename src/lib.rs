//! An interpreter for Lox, built to be embedded.
//!
//! [`Lox`] is the session a host talks to: it runs source text through the
//! scanner, parser, resolver and evaluator and answers with a [`RunResult`].
//! Global declarations persist between runs until [`Lox::reset`].
//!
//! ```
//! use rox::{Lox, RunResult};
//!
//! let mut lox = Lox::new();
//! assert_eq!(lox.interpret("var a = 1 + 2;"), RunResult::Success);
//! assert_eq!(lox.interpret("print a;"), RunResult::Success);
//! assert_eq!(lox.out(), "3\n");
//! ```

pub mod ast;
pub mod ast_printer;
pub mod config;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod natives;
pub mod output;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod stack;
pub mod token;
pub mod value;

use std::rc::Rc;

use log::{debug, info};

pub use crate::config::{Config, DiagnosticsPolicy};
pub use crate::error::{Diagnostic, DiagnosticKind, LoxError, RunResult};
pub use crate::output::{OutputSink, WriterSink};

use crate::interpreter::Interpreter;
use crate::natives::{Clock, MonotonicClock};
use crate::output::Transcript;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;
use crate::value::Value;

/// A reusable interpreter session.
pub struct Lox {
    config: Config,
    clock: Rc<dyn Clock>,
    interpreter: Interpreter,
    /// First `ExprId` the next run may hand out.
    next_expr_id: usize,
}

impl Default for Lox {
    fn default() -> Self {
        Self::new()
    }
}

impl Lox {
    pub fn new() -> Self {
        let config = Config::default();
        let clock: Rc<dyn Clock> = Rc::new(MonotonicClock::new());

        Self {
            interpreter: Interpreter::new(config.clone(), Transcript::new(), Rc::clone(&clock)),
            config,
            clock,
            next_expr_id: 0,
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self.rebuild()
    }

    /// Forward every chunk of output to `sink`.  It is also kept for
    /// [`out`](Self::out) unless [`Config::keep_transcript`] is off.
    pub fn with_sink(self, sink: Box<dyn OutputSink>) -> Self {
        self.rebuild_with(Transcript::with_sink(sink))
    }

    /// Replace the time source behind `clock()`.
    pub fn with_clock(mut self, clock: Rc<dyn Clock>) -> Self {
        self.clock = clock;
        self.rebuild()
    }

    /// Fresh interpreter, same transcript.
    fn rebuild(mut self) -> Self {
        let output = std::mem::take(self.interpreter.output_mut());
        self.rebuild_with(output)
    }

    fn rebuild_with(self, output: Transcript) -> Self {
        debug!("Rebuilding interpreter with {:?}", self.config);

        let output = output.keeping(self.config.keep_transcript);

        Self {
            interpreter: Interpreter::new(self.config.clone(), output, Rc::clone(&self.clock)),
            ..self
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Scan, parse, resolve and run `source` against the session's globals.
    pub fn interpret(&mut self, source: &str) -> RunResult {
        info!("Interpreting {} bytes of source", source.len());

        let mut parser = Parser::new(Scanner::new(source)).starting_at(self.next_expr_id);
        let parsed = parser.parse();
        self.next_expr_id = parser.next_expr_id();

        let statements = match parsed {
            Ok(statements) => statements,
            Err(errors) => return self.static_failure(&errors),
        };

        let locals = match Resolver::new().resolve(&statements) {
            Ok(locals) => locals,
            Err(errors) => return self.static_failure(&errors),
        };

        self.interpreter.resolve(locals);

        match self.interpreter.interpret(&statements) {
            Ok(()) => RunResult::Success,
            Err(error) => {
                info!("Run failed: {}", error);
                self.report(std::slice::from_ref(&error));
                RunResult::RuntimeError(Diagnostic::from(&error))
            }
        }
    }

    fn static_failure(&mut self, errors: &[LoxError]) -> RunResult {
        info!("Run rejected with {} static error(s)", errors.len());

        self.report(errors);
        RunResult::SyntaxErrors(errors.iter().map(Diagnostic::from).collect())
    }

    /// Under [`DiagnosticsPolicy::Sink`], echo `errors` into the output.
    fn report(&mut self, errors: &[LoxError]) {
        if self.config.diagnostics != DiagnosticsPolicy::Sink {
            return;
        }

        let output = self.interpreter.output_mut();
        let written = errors
            .iter()
            .try_for_each(|error| output.write(&format!("{}\n", error)))
            .and_then(|()| output.flush());

        if let Err(e) = written {
            debug!("Could not write diagnostics to the output sink: {}", e);
        }
    }

    /// Everything printed since the last [`clear`](Self::clear).
    pub fn out(&self) -> String {
        self.interpreter.output().contents()
    }

    pub fn clear(&mut self) {
        self.interpreter.output_mut().clear();
    }

    /// Forget every global declared by earlier runs.
    pub fn reset(&mut self) {
        info!("Resetting session");
        self.interpreter.reset();
    }

    /// Current value of the global `name`.
    pub fn global(&self, name: &str) -> Option<Value> {
        self.interpreter.global(name)
    }
}

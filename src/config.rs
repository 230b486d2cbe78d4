//! Embedding configuration.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Whether diagnostics are written to the output sink as well as returned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticsPolicy {
    /// Only in the returned `RunResult`.
    #[default]
    Structured,

    /// Also written, one per line, to the program's output.
    Sink,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub diagnostics: DiagnosticsPolicy,

    /// Deepest allowed nesting of user function calls before the run fails
    /// with `Stack overflow.`
    pub max_call_depth: usize,

    /// Keep printed output for `out()`.  A host that only reads what its
    /// sink receives can turn this off so long runs do not hold every line.
    pub keep_transcript: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            diagnostics: DiagnosticsPolicy::Structured,
            max_call_depth: 200,
            keep_transcript: true,
        }
    }
}

impl Config {
    /// Parse a JSON object; missing keys keep their defaults.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

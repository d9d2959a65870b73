//! Reporting of malformed markup.
//!
//! Diagnostics are observational: the tokenizer recovers from every [`ParseError`] the same way
//! no matter who listens. The only exception is a [`Severity::Fatal`] diagnostic, after which
//! the tokenizer stops parsing.
use crate::ParseError;

/// How bad a [`Diagnostic`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Sloppy but common markup.
    Warning,
    /// Markup the tokenizer had to guess about.
    Error,
    /// Tokenization stops after this diagnostic.
    Fatal,
}

/// One report about malformed markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Diagnostic {
    /// What went wrong.
    pub error: ParseError,
    /// How bad it is.
    pub severity: Severity,
    /// 1-based line of the character the tokenizer was looking at.
    pub line: u32,
    /// 1-based column of the character the tokenizer was looking at.
    pub column: u32,
}

/// Receives [`Diagnostic`]s.
pub trait Diagnostics {
    /// Called once per diagnostic, in document order.
    fn report(&mut self, diagnostic: &Diagnostic);
}

/// Forwards diagnostics to the [`log`] crate. This is the default.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn report(&mut self, diagnostic: &Diagnostic) {
        match diagnostic.severity {
            Severity::Warning => log::debug!(
                "{}:{}: {}",
                diagnostic.line,
                diagnostic.column,
                diagnostic.error
            ),
            Severity::Error => log::warn!(
                "{}:{}: {}",
                diagnostic.line,
                diagnostic.column,
                diagnostic.error
            ),
            Severity::Fatal => log::error!(
                "{}:{}: {}",
                diagnostic.line,
                diagnostic.column,
                diagnostic.error
            ),
        }
    }
}

/// Drops all diagnostics.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDiagnostics;

impl Diagnostics for NoDiagnostics {
    fn report(&mut self, _diagnostic: &Diagnostic) {}
}

impl Diagnostics for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: &Diagnostic) {
        self.push(*diagnostic);
    }
}

#![deny(missing_docs)]
// This is an HTML parser. HTML can be untrusted input from the internet.
#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

mod arrayvec;
mod config;
mod diagnostics;
mod doctype;
mod entities;
mod error;
mod raw_text;
mod script;
mod sink;
mod source;
mod state;
mod tag;
mod token;
mod tokenizer;
mod utils;

#[doc(hidden)]
pub mod testutils;

pub use config::TokenizerConfig;
pub use diagnostics::{Diagnostic, Diagnostics, LogDiagnostics, NoDiagnostics, Severity};
pub use error::{FetchError, GateError, ParseError};
pub use script::{DocumentWriter, Fetch, NoScripting, ScriptHost, ScriptId};
pub use sink::{DefaultSink, EndTag, Output, ScriptEvent, StartTag, TreeSink};
pub use source::{CharSource, LineCounter};
pub use token::{Attribute, Doctype, Token, TokenKind};
pub use tokenizer::{Progress, Tokenizer};

//! [`TreeSink`] is where the tokenizer sends its output.
//!
//! The tokenizer does not build a tree. It hands every finished [`Token`] to a sink, and the
//! sink's answer for start tags decides whether the tokenizer treats the element as live: the
//! raw-text handling of `<script>`, `<style>`, `<title>` and friends only kicks in when the sink
//! returns a handle for the start tag.
//!
//! * [`DefaultSink`] collects owned [`Output`] values, if you only want convenience.
//! * Implementing your own [`TreeSink`] lets you feed a DOM directly.
use std::collections::BTreeMap;

use crate::{Doctype, Token, TokenKind};

/// What happened to an external script after its fetch settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptEvent {
    /// The script was fetched (and executed, if it is JavaScript).
    Load,
    /// The fetch failed. The script did not run.
    Error,
}

/// The consumer of tokens, usually a tree builder.
pub trait TreeSink {
    /// Identifies an element the sink created.
    type Handle;

    /// Consume a token. Return a handle if the token created an element.
    ///
    /// The token is reset after this call, so copy anything you want to keep.
    fn process_token(&mut self, token: &Token) -> Option<Self::Handle>;

    /// Consume a doctype.
    fn process_doctype(&mut self, doctype: &Doctype);

    /// Whether content is currently being discarded (e.g. after a `<frameset>`). Scripts
    /// encountered while this returns `true` are neither run nor fetched.
    fn in_skip_mode(&self) -> bool {
        false
    }

    /// The fetch for the external script `script` settled.
    fn script_event(&mut self, script: &Self::Handle, event: ScriptEvent) {
        let _ = (script, event);
    }

    /// The document ended. Called exactly once.
    fn finish(&mut self) {}
}

/// A HTML start tag, such as `<p>` or `<a>`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StartTag {
    /// Whether this tag is self-closing. Only `<script/>` is treated as such.
    pub self_closing: bool,

    /// The start tag's name, such as `"p"` or `"a"`.
    pub name: String,

    /// A mapping for any HTML attributes this start tag may have.
    ///
    /// Duplicate attributes are ignored after the first one.
    pub attributes: BTreeMap<String, String>,
}

/// A HTML end/close tag, such as `</p>` or `</a>`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EndTag {
    /// The ending tag's name, such as `"p"` or `"a"`.
    pub name: String,
}

/// The owned token type collected by [`DefaultSink`].
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Output {
    /// A HTML start tag.
    StartTag(StartTag),
    /// A HTML end tag.
    EndTag(EndTag),
    /// A literal string.
    Text(String),
    /// A HTML comment.
    Comment(String),
    /// A HTML doctype declaration.
    Doctype(Doctype),
}

impl From<&Token> for Output {
    fn from(token: &Token) -> Self {
        match token.kind {
            TokenKind::StartTag => Output::StartTag(StartTag {
                self_closing: token.self_closing,
                name: token.name.clone(),
                attributes: token
                    .attributes
                    .iter()
                    .map(|attr| (attr.name.clone(), attr.value.clone()))
                    .collect(),
            }),
            TokenKind::EndTag => Output::EndTag(EndTag {
                name: token.name.clone(),
            }),
            TokenKind::Text => Output::Text(token.text.clone()),
            TokenKind::Comment => Output::Comment(token.text.clone()),
        }
    }
}

/// A sink that keeps every token. Start tags are treated as live elements; their handle is the
/// index of the token in [`DefaultSink::tokens`].
#[derive(Debug, Default)]
pub struct DefaultSink {
    tokens: Vec<Output>,
    script_events: Vec<(usize, ScriptEvent)>,
    finished: bool,
}

impl DefaultSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        DefaultSink::default()
    }

    /// Everything collected so far.
    #[must_use]
    pub fn tokens(&self) -> &[Output] {
        &self.tokens
    }

    /// Take everything collected so far. Handles given out earlier keep pointing at the old
    /// positions.
    pub fn take_tokens(&mut self) -> Vec<Output> {
        std::mem::take(&mut self.tokens)
    }

    /// Settled external scripts, as `(start tag index, event)` pairs.
    #[must_use]
    pub fn script_events(&self) -> &[(usize, ScriptEvent)] {
        &self.script_events
    }

    /// Whether [`TreeSink::finish`] was called.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl TreeSink for DefaultSink {
    type Handle = usize;

    fn process_token(&mut self, token: &Token) -> Option<usize> {
        crate::utils::trace_log!("token: {:?}", token);
        let index = self.tokens.len();
        self.tokens.push(Output::from(token));
        match token.kind {
            TokenKind::StartTag => Some(index),
            _ => None,
        }
    }

    fn process_doctype(&mut self, doctype: &Doctype) {
        crate::utils::trace_log!("doctype: {:?}", doctype);
        self.tokens.push(Output::Doctype(doctype.clone()));
    }

    fn script_event(&mut self, script: &usize, event: ScriptEvent) {
        self.script_events.push((*script, event));
    }

    fn finish(&mut self) {
        debug_assert!(!self.finished);
        self.finished = true;
    }
}

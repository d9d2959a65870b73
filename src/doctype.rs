//! The `<!DOCTYPE ...>` grammar.
//!
//! Anything the grammar does not expect sends the scanner into the bogus state, which skips to
//! the next `>` and hands the doctype over with `force_quirks` set.
use crate::diagnostics::Diagnostics;
use crate::script::ScriptHost;
use crate::sink::TreeSink;
use crate::state::{DoctypeState, Markup, Quote};
use crate::tokenizer::Tokenizer;
use crate::utils::{is_space, trace_log};
use crate::{Doctype, ParseError};

const PUBLIC: [char; 6] = ['p', 'u', 'b', 'l', 'i', 'c'];
const SYSTEM: [char; 6] = ['s', 'y', 's', 't', 'e', 'm'];

#[derive(Debug, Default)]
pub(crate) struct DoctypeBuffer {
    token: Doctype,
    /// Keyword characters seen after the name.
    keyword_len: usize,
    public_match: usize,
    system_match: usize,
}

impl DoctypeBuffer {
    fn reset(&mut self) {
        self.token.reset();
        self.reset_keyword();
    }

    fn reset_keyword(&mut self) {
        self.keyword_len = 0;
        self.public_match = 0;
        self.system_match = 0;
    }
}

impl<S: TreeSink, H: ScriptHost, D: Diagnostics> Tokenizer<S, H, D> {
    /// `<!doctype` was matched.
    pub(crate) fn begin_doctype(&mut self) {
        self.flush_text();
        self.token.reset();
        self.doctype.reset();
        self.state.markup = Some(Markup::Doctype);
        self.state.doctype = DoctypeState::Begin;
        self.state.quote = None;
    }

    pub(crate) fn parse_doctype(&mut self) {
        while let Some(c) = self.src.peek() {
            match self.state.doctype {
                DoctypeState::Begin => {
                    self.state.doctype = DoctypeState::BeforeName;
                    if is_space(c) {
                        self.src.advance(&mut self.lines);
                    }
                }
                DoctypeState::BeforeName => {
                    if c == '>' {
                        // <!DOCTYPE>
                        self.src.advance_keeping_newline_count(&mut self.lines);
                        self.emit_doctype(true);
                        return;
                    } else if is_space(c) {
                        self.src.advance(&mut self.lines);
                    } else {
                        self.state.doctype = DoctypeState::Name;
                    }
                }
                DoctypeState::Name => {
                    if c == '>' {
                        self.src.advance_keeping_newline_count(&mut self.lines);
                        self.emit_doctype(false);
                        return;
                    } else if is_space(c) {
                        self.state.doctype = DoctypeState::AfterName;
                        self.doctype.reset_keyword();
                        self.src.advance(&mut self.lines);
                    } else {
                        self.doctype.token.name.push(c.to_ascii_lowercase());
                        self.src.advance(&mut self.lines);
                    }
                }
                DoctypeState::AfterName => {
                    if c == '>' {
                        self.src.advance_keeping_newline_count(&mut self.lines);
                        let partial_keyword = self.doctype.keyword_len > 0;
                        self.emit_doctype(partial_keyword);
                        return;
                    }
                    if is_space(c) && self.doctype.keyword_len == 0 {
                        self.src.advance(&mut self.lines);
                        continue;
                    }
                    self.match_keyword(c);
                }
                DoctypeState::BeforePublicId => {
                    if is_space(c) {
                        self.src.advance(&mut self.lines);
                    } else if let Some(quote) = Quote::for_char(c) {
                        self.state.quote = Some(quote);
                        self.doctype.token.public_identifier = Some(String::new());
                        self.state.doctype = DoctypeState::PublicId;
                        self.src.advance_keeping_newline_count(&mut self.lines);
                    } else {
                        self.state.doctype = DoctypeState::Bogus;
                    }
                }
                DoctypeState::PublicId => {
                    if !self.read_identifier(c, true) {
                        return;
                    }
                    if self.state.quote.is_none() {
                        self.state.doctype = DoctypeState::AfterPublicId;
                    }
                }
                DoctypeState::AfterPublicId => {
                    if c == '>' {
                        self.src.advance_keeping_newline_count(&mut self.lines);
                        self.emit_doctype(false);
                        return;
                    } else if is_space(c) {
                        self.src.advance(&mut self.lines);
                    } else if Quote::for_char(c).is_some() {
                        self.state.doctype = DoctypeState::BeforeSystemId;
                    } else {
                        self.state.doctype = DoctypeState::Bogus;
                    }
                }
                DoctypeState::BeforeSystemId => {
                    if is_space(c) {
                        self.src.advance(&mut self.lines);
                    } else if let Some(quote) = Quote::for_char(c) {
                        self.state.quote = Some(quote);
                        self.doctype.token.system_identifier = Some(String::new());
                        self.state.doctype = DoctypeState::SystemId;
                        self.src.advance_keeping_newline_count(&mut self.lines);
                    } else {
                        self.state.doctype = DoctypeState::Bogus;
                    }
                }
                DoctypeState::SystemId => {
                    if !self.read_identifier(c, false) {
                        return;
                    }
                    if self.state.quote.is_none() {
                        self.state.doctype = DoctypeState::AfterSystemId;
                    }
                }
                DoctypeState::AfterSystemId => {
                    if c == '>' {
                        self.src.advance_keeping_newline_count(&mut self.lines);
                        self.emit_doctype(false);
                        return;
                    } else if is_space(c) {
                        self.src.advance(&mut self.lines);
                    } else {
                        self.state.doctype = DoctypeState::Bogus;
                    }
                }
                DoctypeState::Bogus => {
                    if c == '>' {
                        self.src.advance_keeping_newline_count(&mut self.lines);
                        self.emit_doctype(true);
                        return;
                    }
                    self.src.advance(&mut self.lines);
                }
            }
        }
    }

    /// Match `PUBLIC` and `SYSTEM` in parallel, ignoring case.
    fn match_keyword(&mut self, c: char) {
        let c = c.to_ascii_lowercase();
        let position = self.doctype.keyword_len;
        let mut matched = false;

        if self.doctype.public_match == position && PUBLIC.get(position) == Some(&c) {
            self.doctype.public_match += 1;
            matched = true;
        }
        if self.doctype.system_match == position && SYSTEM.get(position) == Some(&c) {
            self.doctype.system_match += 1;
            matched = true;
        }

        if !matched {
            self.state.doctype = DoctypeState::Bogus;
            return;
        }

        self.doctype.keyword_len += 1;
        self.src.advance_keeping_newline_count(&mut self.lines);
        if self.doctype.public_match == PUBLIC.len() {
            self.state.doctype = DoctypeState::BeforePublicId;
        } else if self.doctype.system_match == SYSTEM.len() {
            self.state.doctype = DoctypeState::BeforeSystemId;
        }
    }

    /// Consume one character of a quoted identifier. The closing quote clears `state.quote`. A
    /// `>` ends the whole doctype as bogus, in which case this returns `false`.
    fn read_identifier(&mut self, c: char, public: bool) -> bool {
        if c == '>' {
            self.src.advance_keeping_newline_count(&mut self.lines);
            self.state.quote = None;
            self.emit_doctype(true);
            return false;
        }

        if Quote::for_char(c).is_some() && Quote::for_char(c) == self.state.quote {
            self.state.quote = None;
            self.src.advance_keeping_newline_count(&mut self.lines);
            return true;
        }

        let identifier = if public {
            &mut self.doctype.token.public_identifier
        } else {
            &mut self.doctype.token.system_identifier
        };
        identifier.get_or_insert_with(String::new).push(c);
        self.src.advance(&mut self.lines);
        true
    }

    fn emit_doctype(&mut self, bogus: bool) {
        if bogus || self.doctype.token.name.is_empty() {
            self.report(ParseError::BogusDoctype);
            self.doctype.token.force_quirks = true;
        }
        trace_log!("doctype: {:?}", self.doctype.token);
        self.state.markup = None;
        self.state.quote = None;
        self.state.doctype = DoctypeState::Begin;
        self.sink.process_doctype(&self.doctype.token);
        self.doctype.reset();
    }
}

//! Tags and their attributes.
//!
//! The scanner is deliberately forgiving: quotes where a name is expected are skipped, a `<`
//! ends the tag early, and names that are too long are cut into several pieces instead of
//! failing.
use crate::diagnostics::Diagnostics;
use crate::script::ScriptHost;
use crate::sink::TreeSink;
use crate::state::{Markup, Quote, RawText, TagState};
use crate::tokenizer::Tokenizer;
use crate::utils::{is_space, trace_log};
use crate::{ParseError, TokenKind};

/// Longest tag or attribute name kept in one piece.
const NAME_CAP: usize = 1024;

const COMMENT_START: [char; 4] = ['<', '!', '-', '-'];
const DOCTYPE_START: [char; 9] = ['<', '!', 'd', 'o', 'c', 't', 'y', 'p', 'e'];

#[derive(Debug, Default)]
pub(crate) struct TagBuffer {
    name: String,
    name_len: usize,
    attribute_name: String,
    attribute_name_len: usize,
    /// Also the target of character references inside attribute values.
    pub value: String,
    /// How much of [`COMMENT_START`] the tag has matched so far.
    comment_search: usize,
    /// How much of [`DOCTYPE_START`] the tag has matched so far.
    doctype_search: usize,
    last_is_slash: bool,
    /// The name turned out to be something a sink should see.
    known: bool,
    pub start_line: u32,
}

impl TagBuffer {
    fn clear(&mut self) {
        self.name.clear();
        self.name_len = 0;
        self.attribute_name.clear();
        self.attribute_name_len = 0;
        self.value.clear();
        self.last_is_slash = false;
        self.known = false;
    }
}

impl<S: TreeSink, H: ScriptHost, D: Diagnostics> Tokenizer<S, H, D> {
    /// Decide what the `<` that was just consumed opens.
    pub(crate) fn parse_tag_open(&mut self) {
        let c = match self.src.peek() {
            Some(c) => c,
            None => return,
        };
        self.state.start_tag = false;

        match c {
            '/' => (),
            '!' => {
                self.tag.comment_search = 1;
                self.tag.doctype_search = 1;
            }
            '?' => {
                trace_log!("processing instruction");
                self.state.markup = Some(Markup::ProcessingInstruction);
                self.state.quote = None;
                self.raw.previous = None;
                return;
            }
            '%' if !self.raw.broken_server => {
                trace_log!("server include");
                self.state.markup = Some(Markup::ServerInclude);
                self.state.quote = None;
                self.raw.scratch.clear();
                return;
            }
            c if c.is_ascii_alphabetic() => (),
            _ => {
                self.report(ParseError::InvalidFirstCharacterOfTagName);
                self.text.push('<');
                return;
            }
        }

        self.flush_text();
        self.token.reset();
        self.tag.clear();
        self.state.tag = Some(TagState::TagName);
    }

    pub(crate) fn parse_tag(&mut self) {
        while let Some(c) = self.src.peek() {
            let state = match self.state.tag {
                Some(state) => state,
                None => return,
            };

            match state {
                TagState::TagName => {
                    if self.tag.comment_search > 0 {
                        if c == COMMENT_START[self.tag.comment_search] {
                            self.tag.comment_search += 1;
                            if self.tag.comment_search == 2 {
                                self.tag.doctype_search += 1;
                            } else {
                                self.tag.doctype_search = 0;
                            }
                            self.push_name_char(c);
                            if self.tag.comment_search == COMMENT_START.len() {
                                trace_log!("comment");
                                self.tag.comment_search = 0;
                                self.state.tag = None;
                                self.state.markup = Some(Markup::Comment);
                                self.raw.scratch.clear();
                                return;
                            }
                            continue;
                        }
                        self.tag.comment_search = 0;
                    }

                    if self.tag.doctype_search > 0 {
                        if c.to_ascii_lowercase() == DOCTYPE_START[self.tag.doctype_search] {
                            self.tag.doctype_search += 1;
                            self.push_name_char(c);
                            if self.tag.doctype_search == DOCTYPE_START.len() {
                                trace_log!("doctype");
                                self.tag.doctype_search = 0;
                                self.state.tag = None;
                                self.begin_doctype();
                                return;
                            }
                            continue;
                        }
                        self.tag.doctype_search = 0;
                    }

                    if is_space(c) || c == '>' || c == '<' {
                        self.finish_tag_name();
                        continue;
                    }
                    if self.tag.name_len == NAME_CAP {
                        self.report(ParseError::TagNameTooLong);
                        self.finish_tag_name();
                        continue;
                    }
                    self.push_name_char(c);
                }

                TagState::SearchAttribute => {
                    if !is_space(c) && c != '\'' && c != '"' {
                        self.tag.attribute_name.clear();
                        self.tag.attribute_name_len = 0;
                        self.state.tag = Some(if c == '<' || c == '>' {
                            TagState::SearchEnd
                        } else {
                            TagState::AttributeName
                        });
                        continue;
                    }
                    self.src.advance(&mut self.lines);
                }

                TagState::AttributeName => {
                    if c <= '>' && (c >= '<' || is_space(c) || c == '/') {
                        self.end_attribute_name();
                        continue;
                    }
                    if self.tag.attribute_name_len == NAME_CAP {
                        self.report(ParseError::AttributeNameTooLong);
                        self.end_attribute_name();
                        continue;
                    }
                    let c = if self.config.view_source {
                        c
                    } else {
                        c.to_ascii_lowercase()
                    };
                    self.tag.attribute_name.push(c);
                    self.tag.attribute_name_len += 1;
                    self.src.advance(&mut self.lines);
                }

                TagState::SearchEqual => {
                    if self.tag.last_is_slash && c == '>' {
                        // <script src="..."/> closes the element, other `/>` are ignored
                        if self.token.name == "script" {
                            self.token.self_closing = true;
                        }
                        self.token.broken_xml_style = true;
                    }
                    if !is_space(c) && c != '\'' && c != '"' && c != '/' {
                        if c == '=' {
                            self.state.tag = Some(TagState::SearchValue);
                            self.src.advance_keeping_newline_count(&mut self.lines);
                        } else {
                            // valueless attribute
                            let name = std::mem::take(&mut self.tag.attribute_name);
                            self.token.add_attribute(&name, String::new());
                            self.tag.attribute_name = name;
                            self.tag.last_is_slash = false;
                            self.state.tag = Some(TagState::SearchAttribute);
                        }
                        continue;
                    }
                    self.tag.last_is_slash = c == '/';
                    self.src.advance(&mut self.lines);
                }

                TagState::SearchValue => {
                    if !is_space(c) {
                        match Quote::for_char(c) {
                            Some(quote) => {
                                self.state.quote = Some(quote);
                                self.state.tag = Some(TagState::QuotedValue);
                                self.src.advance_keeping_newline_count(&mut self.lines);
                            }
                            None => self.state.tag = Some(TagState::Value),
                        }
                        continue;
                    }
                    self.src.advance(&mut self.lines);
                }

                TagState::QuotedValue => {
                    if c <= '>' {
                        if c == '>' && self.tag.attribute_name.is_empty() {
                            // <img ='> and similar: give up on the value and close the tag
                            self.tag.value.clear();
                            self.state.quote = None;
                            self.state.tag = Some(TagState::SearchAttribute);
                            continue;
                        }
                        if c == '&' {
                            self.src.advance_keeping_newline_count(&mut self.lines);
                            self.entity.begin(&mut self.state.entity);
                            return;
                        }
                        if Quote::for_char(c).is_some() && Quote::for_char(c) == self.state.quote {
                            let trimmed = self
                                .tag
                                .value
                                .trim_end_matches(|x| x == '\r' || x == '\n')
                                .len();
                            self.tag.value.truncate(trimmed);
                            self.add_attribute();
                            self.state.quote = None;
                            self.state.tag = Some(TagState::SearchAttribute);
                            self.src.advance_keeping_newline_count(&mut self.lines);
                            continue;
                        }
                    }
                    self.tag.value.push(c);
                    self.src.advance(&mut self.lines);
                }

                TagState::Value => {
                    if c <= '>' {
                        if c == '&' {
                            self.src.advance_keeping_newline_count(&mut self.lines);
                            self.entity.begin(&mut self.state.entity);
                            return;
                        }
                        if is_space(c) || c == '>' {
                            self.add_attribute();
                            self.state.tag = Some(TagState::SearchAttribute);
                            continue;
                        }
                    }
                    self.tag.value.push(c);
                    self.src.advance(&mut self.lines);
                }

                TagState::SearchEnd => {
                    self.state.tag = None;
                    self.state.quote = None;
                    self.tag.comment_search = 0;
                    self.tag.doctype_search = 0;
                    // a `<` is left for the next tag
                    if c == '>' {
                        self.src.advance_keeping_newline_count(&mut self.lines);
                    }
                    self.emit_tag();
                    return;
                }
            }
        }
    }

    fn push_name_char(&mut self, c: char) {
        let c = if self.config.view_source {
            c
        } else {
            c.to_ascii_lowercase()
        };
        self.tag.name.push(c);
        self.tag.name_len += 1;
        self.src.advance_keeping_newline_count(&mut self.lines);
    }

    fn finish_tag_name(&mut self) {
        let view_source = self.config.view_source;
        let mut name = std::mem::take(&mut self.tag.name);
        let begin = !name.starts_with('/');
        if !begin {
            name.remove(0);
        }
        if name.len() > 1 && name.ends_with('/') && !view_source {
            name.pop();
        }

        self.tag.known = !name.is_empty() && (!name.starts_with('!') || view_source);
        if self.tag.known {
            self.token.kind = if begin {
                TokenKind::StartTag
            } else {
                TokenKind::EndTag
            };
            self.token.name.push_str(&name);
            self.token.line = self.tag.start_line;
        }

        name.clear();
        self.tag.name = name;
        self.tag.name_len = 0;
        self.tag.comment_search = 0;
        self.tag.doctype_search = 0;
        self.state.tag = Some(TagState::SearchAttribute);
    }

    fn end_attribute_name(&mut self) {
        self.tag.value.clear();
        self.tag.last_is_slash = false;
        self.state.tag = Some(TagState::SearchEqual);
    }

    fn add_attribute(&mut self) {
        let value = std::mem::take(&mut self.tag.value);
        self.token.add_attribute(&self.tag.attribute_name, value);
    }

    /// Hand the finished tag to the sink, then switch modes if the sink made it a live element.
    fn emit_tag(&mut self) {
        if !self.tag.known {
            trace_log!("dropping unknown tag");
            self.token.reset();
            return;
        }

        let begin = self.token.kind == TokenKind::StartTag;
        let self_closing_script = self.token.self_closing && self.token.is_start_tag("script");
        let name = self.token.name.clone();
        if self.token.is_start_tag("script") {
            self.gate.open(&self.token, self.lines.line());
        }

        trace_log!("tag: {:?}", self.token);
        let element = self.sink.process_token(&self.token);
        self.token.reset();

        if let Some(element) = element {
            if name == "pre" || name == "listing" {
                if begin {
                    self.state.discard_lf = true;
                }
            } else if name == "script" {
                if self_closing_script {
                    self.gate.set_element(element);
                    self.state.raw_text = Some(RawText::Script);
                    self.close_script();
                } else if begin {
                    self.gate.set_element(element);
                    self.enter_raw_text(RawText::Script);
                }
            } else if let Some(region) = RawText::for_tag_name(&name) {
                if begin {
                    self.enter_raw_text(region);
                }
            }
        }

        if name == "plaintext" {
            self.state.plain_text = begin;
        }
    }
}

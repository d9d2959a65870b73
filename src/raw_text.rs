//! Raw-text regions (`<script>`, `<style>`, `<textarea>`, `<title>`, `<xmp>`, `<iframe>`) and
//! the other constructs that are scanned into the shared scratch buffer: comments, server-side
//! includes and processing instructions.
use crate::diagnostics::Diagnostics;
use crate::script::ScriptHost;
use crate::sink::TreeSink;
use crate::source::LineCounter;
use crate::state::{Markup, Quote, RawText, State};
use crate::tokenizer::Tokenizer;
use crate::utils::{ends_with_ignore_case, is_space, normalize_line_breaks, trace_log};

#[derive(Debug, Default)]
pub(crate) struct RawTextBuffer {
    /// Raw characters of the current region, comment or server include.
    pub scratch: String,
    /// Byte offset in `scratch` of an end tag that matched and now waits for its `>`.
    pub resync: Option<usize>,
    /// `scratch` up to here may contain decoded character references.
    pub last_decoded_end: usize,
    /// An unterminated comment was seen. Comments now end at the first `>`.
    pub broken_comments: bool,
    /// An unterminated server include was seen. `<%` is now plain text.
    pub broken_server: bool,
    /// Last character of a processing instruction.
    pub previous: Option<char>,
}

impl RawTextBuffer {
    pub(crate) fn reset(&mut self) {
        self.scratch.clear();
        self.resync = None;
        self.last_decoded_end = 0;
        self.previous = None;
    }
}

/// Where to go back to if a `<title>` never closes.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TitleSnapshot {
    pub state: State,
    pub lines: LineCounter,
}

impl<S: TreeSink, H: ScriptHost, D: Diagnostics> Tokenizer<S, H, D> {
    pub(crate) fn enter_raw_text(&mut self, region: RawText) {
        trace_log!("entering {:?}", region);
        self.raw.reset();
        if region == RawText::Title {
            self.title = Some(TitleSnapshot {
                state: self.state,
                lines: self.lines,
            });
            self.src.start_recording();
        }
        self.state.raw_text = Some(region);
        self.state.quote = None;
        self.state.escaped = false;
    }

    pub(crate) fn parse_raw_text(&mut self) {
        let region = match self.state.raw_text {
            Some(region) => region,
            None => return,
        };

        if self.state.markup == Some(Markup::Comment) {
            self.parse_comment();
            if self.state.markup.is_some() {
                return;
            }
        }

        if self.state.entity.is_some() && !self.decode_into_scratch() {
            return;
        }

        let end_tag = region.end_tag();
        while let Some(c) = self.src.peek() {
            let len = self.raw.scratch.len();

            if self.raw.resync.is_none()
                && !self.raw.broken_comments
                && region.allows_comments()
                && c == '-'
                && self.raw.scratch.ends_with("<!-")
                && len - 3 >= self.raw.last_decoded_end
            {
                trace_log!("comment inside {:?}", region);
                self.state.markup = Some(Markup::Comment);
                self.parse_comment();
                if self.state.markup.is_some() {
                    return;
                }
                continue;
            }

            if let Some(resync) = self.raw.resync {
                if self.state.quote.is_none() && c == '>' {
                    self.src.advance_keeping_newline_count(&mut self.lines);
                    self.raw.scratch.truncate(resync);
                    self.close_raw_text(region);
                    return;
                }
            }

            if self.raw.resync.is_none()
                && !self.state.escaped
                && (c == '>' || c == '/' || is_space(c))
                && ends_with_ignore_case(&self.raw.scratch, end_tag)
                && len - end_tag.len() >= self.raw.last_decoded_end
            {
                self.raw.resync = Some(len - end_tag.len());
                self.state.quote = None;
                continue;
            }

            if self.raw.resync.is_some() && !self.state.escaped {
                // the rest of the end tag may hide a `>` in quotes
                self.state.quote = match (c, self.state.quote) {
                    ('"', None) => Some(Quote::Double),
                    ('"', Some(Quote::Double)) => None,
                    ('\'', None) => Some(Quote::Single),
                    ('\'', Some(Quote::Single)) => None,
                    ('\r', _) | ('\n', _) => None,
                    (_, quote) => quote,
                };
            }
            self.state.escaped = !self.state.escaped && c == '\\';

            if self.raw.resync.is_none() && region.decodes_entities() && c == '&' {
                self.src.advance_keeping_newline_count(&mut self.lines);
                self.entity.begin(&mut self.state.entity);
                if !self.decode_into_scratch() {
                    return;
                }
            } else {
                self.raw.scratch.push(c);
                self.src.advance(&mut self.lines);
            }
        }
    }

    fn decode_into_scratch(&mut self) -> bool {
        let done = self.entity.run(
            &mut self.state.entity,
            &mut self.src,
            &mut self.lines,
            &mut self.raw.scratch,
            false,
            self.config.view_source,
        );
        if done {
            self.raw.last_decoded_end = self.raw.scratch.len();
        }
        done
    }

    fn close_raw_text(&mut self, region: RawText) {
        trace_log!("leaving {:?}", region);
        if region == RawText::Script {
            self.close_script();
            return;
        }

        if region == RawText::Title {
            self.title = None;
            self.src.stop_recording();
        }

        let raw = std::mem::take(&mut self.raw.scratch);
        let text = normalize_line_breaks(&raw);
        self.emit_text(&text);
        self.emit_end_tag(region.tag_name());
        self.state.raw_text = None;
        self.state.quote = None;
        self.raw.reset();
    }

    /// Scan a comment. Inside a raw-text region the comment stays part of the region's text,
    /// otherwise it becomes a comment token.
    pub(crate) fn parse_comment(&mut self) {
        while let Some(c) = self.src.peek() {
            self.raw.scratch.push(c);
            if c == '>' {
                let broken = self.raw.broken_comments
                    && !self.state.in_raw_text(RawText::Script)
                    && !self.state.in_raw_text(RawText::Style);
                let scratch = &self.raw.scratch;
                let end_len = if scratch.len() > 2 && scratch.ends_with("-->") {
                    3
                } else if scratch.len() > 3 && scratch.ends_with("--!>") {
                    4
                } else {
                    1
                };

                if broken || end_len > 1 {
                    self.src.advance_keeping_newline_count(&mut self.lines);
                    self.state.markup = None;
                    if self.state.raw_text.is_none() {
                        let mut raw = std::mem::take(&mut self.raw.scratch);
                        raw.truncate(raw.len() - end_len);
                        let comment = normalize_line_breaks(&raw);
                        self.emit_comment(&comment);
                    }
                    return;
                }
            }
            self.src.advance(&mut self.lines);
        }
    }

    /// `<% ... %>` is dropped.
    pub(crate) fn parse_server_include(&mut self) {
        while let Some(c) = self.src.peek() {
            self.raw.scratch.push(c);
            self.src.advance(&mut self.lines);
            if c == '>' && self.raw.scratch.len() > 1 && self.raw.scratch.ends_with("%>") {
                trace_log!("end of server include");
                self.state.markup = None;
                self.raw.scratch.clear();
                return;
            }
        }
    }

    /// `<? ... ?>` is dropped. Sloppy documents omit the `?`, so any `>` outside quotes ends it
    /// too.
    pub(crate) fn parse_processing_instruction(&mut self) {
        while let Some(c) = self.src.peek() {
            if let Some(quote) = Quote::for_char(c) {
                self.state.quote = if self.state.quote == Some(quote) {
                    None
                } else {
                    Some(quote)
                };
            } else if c == '>' && (self.state.quote.is_none() || self.raw.previous == Some('?')) {
                trace_log!("end of processing instruction");
                self.src.advance(&mut self.lines);
                self.state.markup = None;
                self.state.quote = None;
                self.state.discard_lf = true;
                self.raw.previous = None;
                return;
            }
            self.src.advance(&mut self.lines);
            self.raw.previous = Some(c);
        }
    }
}

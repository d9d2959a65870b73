use std::time::Instant;

use crate::diagnostics::{Diagnostic, Diagnostics, LogDiagnostics, Severity};
use crate::doctype::DoctypeBuffer;
use crate::entities::EntityDecoder;
use crate::raw_text::{RawTextBuffer, TitleSnapshot};
use crate::script::{NoScripting, ScriptGate, ScriptHost};
use crate::sink::TreeSink;
use crate::source::{CharSource, LineCounter};
use crate::state::{Markup, RawText, State};
use crate::tag::TagBuffer;
use crate::utils::{normalize_line_breaks, trace_log};
use crate::{ParseError, Token, TokenKind, TokenizerConfig};

/// What a call into the tokenizer left behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// All input written so far has been tokenized. Write more or call
    /// [`Tokenizer::finish`].
    Done,
    /// The time budget ran out. Call [`Tokenizer::resume`] soon, e.g. from a zero-delay timer.
    /// Input written in the meantime is queued.
    Yielded,
    /// Tokenization waits for an external script. Report its source through
    /// [`Tokenizer::script_fetched`]. Input written in the meantime is queued.
    Blocked,
    /// The document ended and the sink was told so.
    Finished,
    /// [`Tokenizer::stop_parsing`] was called. Nothing will happen anymore.
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Yielded,
    Finished,
    Stopped,
}

/// A streaming HTML tokenizer. See crate-level docs for basic usage.
///
/// Input arrives through [`Tokenizer::write`] in chunks of any size. The tokenizer keeps all of
/// its state between calls, so the tokens a document produces do not depend on how it was
/// chunked, on where the tokenizer yielded, or on where it waited for scripts.
pub struct Tokenizer<S: TreeSink, H: ScriptHost = NoScripting, D: Diagnostics = LogDiagnostics> {
    pub(crate) config: TokenizerConfig,
    pub(crate) state: State,
    pub(crate) src: CharSource,
    /// Input held back while an external script loads.
    pub(crate) pending_src: CharSource,
    /// One buffer per running script, collecting what it writes.
    ///
    /// Hosts cannot call back into the tokenizer, so this holds at most one buffer: a script
    /// that writes another `<script>` only runs it once that markup is tokenized, after the
    /// writing script has returned. Nesting happens in sequence, not on the call stack.
    pub(crate) prepending: Vec<CharSource>,
    pub(crate) lines: LineCounter,
    pub(crate) token: Token,
    pub(crate) text: String,
    pub(crate) tag: TagBuffer,
    pub(crate) doctype: DoctypeBuffer,
    pub(crate) entity: EntityDecoder,
    pub(crate) raw: RawTextBuffer,
    pub(crate) title: Option<TitleSnapshot>,
    pub(crate) gate: ScriptGate<S::Handle>,
    phase: Phase,
    no_more_data: bool,
    pub(crate) sink: S,
    pub(crate) host: H,
    diagnostics: D,
}

impl<S: TreeSink> Tokenizer<S> {
    /// Create a new tokenizer that sends its tokens to `sink`. Scripts are recognized but never
    /// run.
    ///
    /// ```
    /// use htmlfeed::{DefaultSink, Output, Tokenizer};
    ///
    /// let mut tokenizer = Tokenizer::new(DefaultSink::new());
    /// tokenizer.write("<p>hello", true);
    /// tokenizer.write(" world", true);
    /// tokenizer.finish();
    ///
    /// let tokens = tokenizer.sink().tokens();
    /// assert_eq!(tokens[1], Output::Text("hello world".to_owned()));
    /// ```
    pub fn new(sink: S) -> Self {
        Tokenizer::new_with_parts(TokenizerConfig::default(), sink, NoScripting, LogDiagnostics)
    }
}

impl<S: TreeSink, H: ScriptHost> Tokenizer<S, H> {
    /// Create a new tokenizer that runs scripts through `host`.
    pub fn new_with_host(sink: S, host: H) -> Self {
        Tokenizer::new_with_parts(TokenizerConfig::default(), sink, host, LogDiagnostics)
    }
}

impl<S: TreeSink, H: ScriptHost, D: Diagnostics> Tokenizer<S, H, D> {
    /// Create a new tokenizer from all of its collaborators.
    pub fn new_with_parts(config: TokenizerConfig, sink: S, host: H, diagnostics: D) -> Self {
        Tokenizer {
            config,
            state: State::default(),
            src: CharSource::new(),
            pending_src: CharSource::new(),
            prepending: Vec::new(),
            lines: LineCounter::default(),
            token: Token::default(),
            text: String::new(),
            tag: TagBuffer::default(),
            doctype: DoctypeBuffer::default(),
            entity: EntityDecoder::default(),
            raw: RawTextBuffer::default(),
            title: None,
            gate: ScriptGate::default(),
            phase: Phase::Idle,
            no_more_data: false,
            sink,
            host,
            diagnostics,
        }
    }

    /// Replace the configuration. Only meaningful before the first write.
    #[must_use]
    pub fn with_config(mut self, config: TokenizerConfig) -> Self {
        self.config = config;
        self
    }

    /// Feed more characters.
    ///
    /// `is_append` is `true` for document input (e.g. from the network) and `false` for markup a
    /// script inserted on its own schedule; the latter does not move the line counter.
    ///
    /// While an external script is loading, or while a yielded write still has to be resumed,
    /// the characters are only queued.
    pub fn write(&mut self, chars: &str, is_append: bool) -> Progress {
        match self.phase {
            Phase::Stopped => return Progress::Stopped,
            Phase::Finished => return Progress::Finished,
            Phase::Idle | Phase::Yielded => (),
        }

        let mut source = CharSource::from(chars);
        if !is_append {
            source.set_exclude_line_numbers();
        }

        if self.state.loading_external_script {
            self.pending_src.append(source);
            return Progress::Blocked;
        }

        self.src.append(source);
        if self.phase == Phase::Yielded {
            return Progress::Yielded;
        }
        self.pump()
    }

    /// Continue after [`Progress::Yielded`].
    pub fn resume(&mut self) -> Progress {
        match self.phase {
            Phase::Yielded => self.pump(),
            Phase::Stopped => Progress::Stopped,
            Phase::Finished => Progress::Finished,
            Phase::Idle if self.state.loading_external_script => Progress::Blocked,
            Phase::Idle => Progress::Done,
        }
    }

    /// Declare the end of input.
    ///
    /// Unterminated constructs are flushed as well as they can be, the last text token is
    /// emitted and [`TreeSink::finish`] is called. If the tokenizer is yielded or blocked, that
    /// happens once it gets there. Calling this again has no further effect.
    pub fn finish(&mut self) -> Progress {
        match self.phase {
            Phase::Stopped => return Progress::Stopped,
            Phase::Finished => return Progress::Finished,
            Phase::Yielded => {
                self.no_more_data = true;
                return Progress::Yielded;
            }
            Phase::Idle => (),
        }

        self.no_more_data = true;
        if self.state.loading_external_script {
            return Progress::Blocked;
        }
        self.pump()
    }

    /// Stop for good. Pending input, scripts and continuations are abandoned.
    pub fn stop_parsing(&mut self) {
        if matches!(self.phase, Phase::Stopped | Phase::Finished) {
            return;
        }
        log::debug!("parsing stopped at line {}", self.lines.line());
        self.phase = Phase::Stopped;
    }

    /// Never yield, no matter how long a write takes. Used for fragments and other callers
    /// that need all tokens before `write` returns.
    pub fn set_force_synchronous(&mut self, yes: bool) {
        self.state.force_synchronous = yes;
    }

    /// The 1-based line of the next character to be tokenized.
    #[must_use]
    pub fn line_number(&self) -> u32 {
        self.lines.line()
    }

    /// Whether the document ended.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// Whether [`Tokenizer::stop_parsing`] was called.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.phase == Phase::Stopped
    }

    /// Whether a yielded write waits for [`Tokenizer::resume`].
    #[must_use]
    pub fn has_pending_continuation(&self) -> bool {
        self.phase == Phase::Yielded
    }

    /// Whether tokenization waits for an external script.
    #[must_use]
    pub fn is_blocked_on_script(&self) -> bool {
        self.state.loading_external_script
    }

    /// The sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// The sink.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// The script host.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// The script host.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// The diagnostics collaborator.
    pub fn diagnostics(&self) -> &D {
        &self.diagnostics
    }

    /// Take the tokenizer apart.
    pub fn into_parts(self) -> (S, H, D) {
        (self.sink, self.host, self.diagnostics)
    }

    /// Tokenize until the input runs dry, the time budget runs out, a script blocks or the
    /// document ends.
    pub(crate) fn pump(&mut self) -> Progress {
        let start = Instant::now();
        let mut processed = 0;
        self.phase = Phase::Idle;

        loop {
            while !self.src.is_empty() {
                if self.phase == Phase::Stopped {
                    return Progress::Stopped;
                }
                if !self.continue_processing(&mut processed, start) {
                    log::debug!("yielding at line {}", self.lines.line());
                    self.phase = Phase::Yielded;
                    return Progress::Yielded;
                }
                self.step();
            }

            if self.phase == Phase::Stopped {
                return Progress::Stopped;
            }
            if self.state.loading_external_script {
                return Progress::Blocked;
            }
            if !self.no_more_data {
                return Progress::Done;
            }
            if self.drain_at_eof() {
                continue;
            }
            if self.phase == Phase::Stopped {
                return Progress::Stopped;
            }

            self.end();
            return Progress::Finished;
        }
    }

    fn continue_processing(&mut self, processed: &mut usize, start: Instant) -> bool {
        // only look at the clock every so often
        let allowed_yield = std::mem::take(&mut self.state.allow_yield);
        if !self.state.loading_external_script
            && !self.state.force_synchronous
            && self.gate.executing == 0
            && (*processed > self.config.chunk_size || allowed_yield)
        {
            *processed = 0;
            if start.elapsed() >= self.config.time_budget {
                return false;
            }
        }
        *processed += 1;
        true
    }

    /// Hand the input to whichever sub-machine owns the current state.
    fn step(&mut self) {
        match self.state.markup {
            Some(Markup::Comment) if self.state.raw_text.is_none() => self.parse_comment(),
            Some(Markup::ServerInclude) => self.parse_server_include(),
            Some(Markup::ProcessingInstruction) => self.parse_processing_instruction(),
            Some(Markup::Doctype) => self.parse_doctype(),
            _ if self.state.raw_text.is_some() => self.parse_raw_text(),
            _ if self.state.entity.is_some() => self.resume_entity(),
            _ if self.state.plain_text => self.parse_plain_text(),
            _ if self.state.tag.is_some() => self.parse_tag(),
            _ if self.state.start_tag => self.parse_tag_open(),
            _ => self.parse_text(),
        }
    }

    fn parse_text(&mut self) {
        while let Some(c) = self.src.peek() {
            if self.state.skip_lf {
                self.state.skip_lf = false;
                if c == '\n' {
                    self.src.advance(&mut self.lines);
                    continue;
                }
            }

            match c {
                '<' => {
                    self.tag.start_line = self.lines.line();
                    self.src.advance_keeping_newline_count(&mut self.lines);
                    self.state.start_tag = true;
                    self.state.discard_lf = false;
                    return;
                }
                '&' => {
                    self.src.advance_keeping_newline_count(&mut self.lines);
                    self.entity.begin(&mut self.state.entity);
                    return;
                }
                '\n' | '\r' => {
                    if self.state.discard_lf {
                        self.state.discard_lf = false;
                    } else {
                        self.text.push('\n');
                    }
                    if c == '\r' {
                        self.state.skip_lf = true;
                    }
                    self.src.advance(&mut self.lines);
                }
                _ => {
                    self.state.discard_lf = false;
                    self.src
                        .read_until(b"<&\r", &mut self.lines, &mut self.text);
                    return;
                }
            }
        }
    }

    /// After `<plaintext>` there is no markup anymore.
    fn parse_plain_text(&mut self) {
        while let Some(c) = self.src.peek() {
            if self.state.skip_lf {
                self.state.skip_lf = false;
                if c == '\n' {
                    self.src.advance(&mut self.lines);
                    continue;
                }
            }

            if c == '\r' {
                self.state.skip_lf = true;
                self.text.push('\n');
                self.src.advance(&mut self.lines);
            } else {
                self.src.read_until(b"\r", &mut self.lines, &mut self.text);
            }
        }
    }

    fn resume_entity(&mut self) {
        let in_tag = self.state.tag.is_some();
        let out = if in_tag {
            &mut self.tag.value
        } else {
            &mut self.text
        };
        self.entity.run(
            &mut self.state.entity,
            &mut self.src,
            &mut self.lines,
            out,
            in_tag,
            self.config.view_source,
        );
    }

    /// Emit the text collected so far, if any.
    pub(crate) fn flush_text(&mut self) {
        if self.text.is_empty() {
            return;
        }
        std::mem::swap(&mut self.token.text, &mut self.text);
        self.token.kind = TokenKind::Text;
        self.token.line = self.lines.line();
        self.sink.process_token(&self.token);
        self.token.reset();
    }

    pub(crate) fn emit_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.token.kind = TokenKind::Text;
        self.token.text.push_str(text);
        self.token.line = self.lines.line();
        self.sink.process_token(&self.token);
        self.token.reset();
    }

    pub(crate) fn emit_comment(&mut self, text: &str) {
        trace_log!("comment: {:?}", text);
        self.token.kind = TokenKind::Comment;
        self.token.text.push_str(text);
        self.token.line = self.lines.line();
        self.sink.process_token(&self.token);
        self.token.reset();
    }

    pub(crate) fn emit_end_tag(&mut self, name: &str) {
        self.token.kind = TokenKind::EndTag;
        self.token.name.push_str(name);
        self.token.line = self.lines.line();
        self.sink.process_token(&self.token);
        self.token.reset();
    }

    pub(crate) fn report(&mut self, error: ParseError) {
        let severity = if self.config.strict {
            Severity::Fatal
        } else {
            error.severity()
        };
        let diagnostic = Diagnostic {
            error,
            severity,
            line: self.lines.line(),
            column: self.lines.column(),
        };
        trace_log!("diagnostic: {:?}", diagnostic);
        self.diagnostics.report(&diagnostic);
        if severity == Severity::Fatal {
            self.stop_parsing();
        }
    }

    /// Deal with whatever construct the end of input cut off. Returns `true` if text was put
    /// back into the source to be tokenized again.
    fn drain_at_eof(&mut self) -> bool {
        if self.state.entity.is_some() {
            let in_tag = self.state.tag.is_some();
            let out = if in_tag {
                &mut self.tag.value
            } else if self.state.raw_text.is_some() {
                &mut self.raw.scratch
            } else {
                &mut self.text
            };
            self.entity
                .finish(&mut self.state.entity, out, in_tag, self.config.view_source);
        }

        if self.state.start_tag {
            self.state.start_tag = false;
            self.report(ParseError::EofBeforeTagName);
            self.text.push('<');
        }

        match self.state.markup.take() {
            Some(Markup::Comment) => {
                self.report(ParseError::EofInComment);
                self.raw.broken_comments = true;
                let scratch = std::mem::take(&mut self.raw.scratch);

                if self.state.raw_text.is_some() {
                    // rescan the region without looking for comments
                    self.src
                        .prepend(CharSource::excluding_line_numbers(scratch));
                    return true;
                }

                let (comment, rest) = match scratch.find('>') {
                    Some(i) => (&scratch[..i], &scratch[i + 1..]),
                    None => (&scratch[..], ""),
                };
                let comment = normalize_line_breaks(comment);
                self.emit_comment(&comment);
                if !rest.is_empty() {
                    self.src.prepend(CharSource::excluding_line_numbers(rest));
                    return true;
                }
            }
            Some(Markup::ServerInclude) => {
                self.report(ParseError::EofInServerInclude);
                self.raw.broken_server = true;
                let mut food = String::from("<");
                food.push_str(&std::mem::take(&mut self.raw.scratch));
                self.src.prepend(CharSource::excluding_line_numbers(food));
                return true;
            }
            Some(Markup::ProcessingInstruction) => {
                self.report(ParseError::EofInProcessingInstruction);
                self.state.quote = None;
            }
            Some(Markup::Doctype) => {
                self.report(ParseError::EofInDoctype);
                self.state.quote = None;
            }
            None => (),
        }

        if self.state.tag.take().is_some() {
            self.report(ParseError::EofInTag);
            self.token.reset();
            self.tag.value.clear();
        }

        if let Some(region) = self.state.raw_text {
            if region == RawText::Title {
                if let Some(snapshot) = self.title.take() {
                    self.report(ParseError::MissingTitleEndTag);
                    log::debug!("no </title> before end of input, tokenizing title as markup");
                    let raw = self.src.stop_recording();
                    let force_synchronous = self.state.force_synchronous;
                    self.state = snapshot.state;
                    self.state.force_synchronous = force_synchronous;
                    self.lines = snapshot.lines;
                    self.raw.reset();
                    self.src.prepend(CharSource::from(raw));
                    return true;
                }
            }

            self.report(ParseError::EofInRawText);
            let raw = std::mem::take(&mut self.raw.scratch);
            let text = normalize_line_breaks(&raw);
            self.emit_text(&text);
            self.state.raw_text = None;
            self.raw.reset();
            self.gate.forget_element();
        }

        false
    }

    fn end(&mut self) {
        self.flush_text();
        self.phase = Phase::Finished;
        log::debug!("finished at line {}", self.lines.line());
        self.sink.finish();
    }
}

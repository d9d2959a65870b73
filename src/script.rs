//! Script execution and the bookkeeping that keeps tokenization correct around it.
//!
//! When a `</script>` closes, everything the tokenizer has not consumed yet is set aside. An
//! inline script then runs right away; whatever it passes to [`DocumentWriter::write`] is
//! tokenized before the input that was set aside. An external script is requested from the
//! [`ScriptHost`], and until it arrives all further input is queued without being tokenized.
use std::collections::VecDeque;
use std::fmt;

use crate::diagnostics::Diagnostics;
use crate::error::{FetchError, GateError};
use crate::sink::{ScriptEvent, TreeSink};
use crate::source::CharSource;
use crate::tokenizer::{Progress, Tokenizer};
use crate::utils::{normalize_line_breaks, trace_log};
use crate::{ParseError, Token};

/// Identifies an external script request, so that its result can be reported later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScriptId(pub u64);

impl fmt::Display for ScriptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A [`ScriptHost`]'s answer to a script request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetch {
    /// The result will be reported through [`Tokenizer::script_fetched`]. Tokenization blocks
    /// until then.
    Pending,
    /// The result is already available, e.g. from a cache.
    Ready(Result<String, FetchError>),
    /// The host will not load this script. Tokenization continues as if the element had no
    /// `src`.
    Refused,
}

/// Runs scripts on behalf of the tokenizer.
pub trait ScriptHost {
    /// Run `source`. `url` is `None` for inline scripts, and `base_line` is the line the source
    /// starts on in its document.
    ///
    /// Markup passed to `document` is tokenized right after the `</script>`, before any input
    /// that followed it.
    fn execute_script(
        &mut self,
        url: Option<&str>,
        base_line: u32,
        source: &str,
        document: &mut DocumentWriter<'_>,
    );

    /// Start loading the external script at `url`.
    fn request_script(&mut self, id: ScriptId, url: &str, charset: Option<&str>) -> Fetch;
}

/// A [`ScriptHost`] for documents without scripting. Nothing runs and nothing is fetched.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoScripting;

impl ScriptHost for NoScripting {
    fn execute_script(&mut self, _: Option<&str>, _: u32, _: &str, _: &mut DocumentWriter<'_>) {}

    fn request_script(&mut self, _: ScriptId, _: &str, _: Option<&str>) -> Fetch {
        Fetch::Refused
    }
}

/// The `document.write` entry point handed to a running script.
#[derive(Debug)]
pub struct DocumentWriter<'a> {
    buffer: &'a mut CharSource,
}

impl DocumentWriter<'_> {
    /// Insert markup at the current parse position.
    ///
    /// Written markup does not count towards line numbers.
    pub fn write(&mut self, markup: &str) {
        self.buffer
            .append(CharSource::excluding_line_numbers(markup));
    }

    /// Insert markup followed by a line break.
    pub fn writeln(&mut self, markup: &str) {
        self.write(markup);
        self.write("\n");
    }
}

#[derive(Debug)]
struct PendingScript<Handle> {
    id: ScriptId,
    url: String,
    element: Handle,
    javascript: bool,
    result: Option<Result<String, FetchError>>,
}

/// A settled script taken off the front of the queue.
#[derive(Debug)]
pub(crate) struct ReadyScript<Handle> {
    pub url: String,
    pub element: Handle,
    pub javascript: bool,
    pub result: Result<String, FetchError>,
}

/// External scripts in document order. Only the front script may run, no matter which fetch
/// finishes first.
#[derive(Debug)]
pub(crate) struct ScriptQueue<Handle> {
    scripts: VecDeque<PendingScript<Handle>>,
}

impl<Handle> Default for ScriptQueue<Handle> {
    fn default() -> Self {
        ScriptQueue {
            scripts: VecDeque::new(),
        }
    }
}

impl<Handle> ScriptQueue<Handle> {
    pub(crate) fn push(
        &mut self,
        id: ScriptId,
        url: String,
        element: Handle,
        javascript: bool,
        result: Option<Result<String, FetchError>>,
    ) {
        self.scripts.push_back(PendingScript {
            id,
            url,
            element,
            javascript,
            result,
        });
    }

    /// Record the result for `id`.
    pub(crate) fn complete(
        &mut self,
        id: ScriptId,
        result: Result<String, FetchError>,
    ) -> Result<(), GateError> {
        let script = self
            .scripts
            .iter_mut()
            .find(|script| script.id == id)
            .ok_or(GateError::UnknownScript(id))?;
        if script.result.is_some() {
            return Err(GateError::AlreadyCompleted(id));
        }
        script.result = Some(result);
        Ok(())
    }

    /// Take the front script if its result is in.
    pub(crate) fn pop_ready(&mut self) -> Option<ReadyScript<Handle>> {
        if self.scripts.front()?.result.is_none() {
            return None;
        }
        let script = self.scripts.pop_front()?;
        Some(ReadyScript {
            url: script.url,
            element: script.element,
            javascript: script.javascript,
            result: script.result?,
        })
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.scripts.len()
    }
}

/// What the tokenizer knows about scripts: the element currently being scanned, the queue of
/// external scripts and how deep script execution is nested.
#[derive(Debug)]
pub(crate) struct ScriptGate<Handle> {
    pub queue: ScriptQueue<Handle>,
    pub executing: u32,
    next_id: u64,
    element: Option<Handle>,
    url: Option<String>,
    charset: Option<String>,
    javascript: bool,
    start_line: u32,
}

impl<Handle> Default for ScriptGate<Handle> {
    fn default() -> Self {
        ScriptGate {
            queue: ScriptQueue::default(),
            executing: 0,
            next_id: 0,
            element: None,
            url: None,
            charset: None,
            javascript: true,
            start_line: 0,
        }
    }
}

impl<Handle> ScriptGate<Handle> {
    /// Remember what the `<script>` start tag in `token` says about its source.
    pub(crate) fn open(&mut self, token: &Token, line: u32) {
        fn non_empty(value: Option<&str>) -> Option<String> {
            value
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_owned)
        }

        self.element = None;
        self.url = non_empty(token.attribute("src"));
        self.charset = non_empty(token.attribute("charset"));
        self.javascript = is_javascript(token);
        self.start_line = line;
    }

    pub(crate) fn set_element(&mut self, element: Handle) {
        self.element = Some(element);
    }

    /// Drop the script element without running it.
    pub(crate) fn forget_element(&mut self) {
        self.element = None;
        self.url = None;
        self.charset = None;
    }

    fn next_id(&mut self) -> ScriptId {
        self.next_id += 1;
        ScriptId(self.next_id)
    }
}

const JAVASCRIPT_MIME_TYPES: &[&str] = &[
    "text/javascript",
    "text/ecmascript",
    "application/javascript",
    "application/ecmascript",
    "application/x-javascript",
    "text/javascript1.0",
    "text/javascript1.1",
    "text/javascript1.2",
    "text/javascript1.3",
    "text/javascript1.4",
    "text/javascript1.5",
    "text/jscript",
    "text/livescript",
    "text/x-javascript",
    "text/x-ecmascript",
];

/// Whether the `type` and `language` attributes of a script start tag allow running it.
fn is_javascript(token: &Token) -> bool {
    let script_type = token.attribute("type").unwrap_or("").trim();
    if !script_type.is_empty() {
        let mime = script_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        return JAVASCRIPT_MIME_TYPES.contains(&mime.as_str());
    }

    let language = token.attribute("language").unwrap_or("").trim();
    if !language.is_empty() {
        let language = language.to_ascii_lowercase();
        return ["javascript", "jscript", "livescript", "ecmascript"]
            .iter()
            .any(|prefix| language.starts_with(prefix));
    }

    true
}

impl<S: TreeSink, H: ScriptHost, D: Diagnostics> Tokenizer<S, H, D> {
    /// Report the result of a script request that was answered with [`Fetch::Pending`].
    ///
    /// Scripts run in document order: a result for a script behind one that is still loading
    /// is kept until that one settles. Once no script is loading anymore, tokenization
    /// continues with the queued input.
    pub fn script_fetched(
        &mut self,
        id: ScriptId,
        result: Result<String, FetchError>,
    ) -> Result<Progress, GateError> {
        if self.is_stopped() {
            return Ok(Progress::Stopped);
        }

        log::debug!("script {} settled ({} still queued)", id, self.gate.queue.len());
        self.gate.queue.complete(id, result)?;
        self.run_ready_scripts();

        if self.state.loading_external_script {
            Ok(Progress::Blocked)
        } else {
            Ok(self.pump())
        }
    }

    /// `</script>` was seen (or `<script .../>`). Emit the script's text and end tag, then run
    /// or request the script.
    pub(crate) fn close_script(&mut self) {
        let element = self.gate.element.take();
        let url = self.gate.url.take();
        let charset = self.gate.charset.take();

        let raw = std::mem::take(&mut self.raw.scratch);
        let source = normalize_line_breaks(&raw);
        self.emit_text(&source);
        self.emit_end_tag("script");
        self.state.raw_text = None;
        self.raw.reset();

        let element = match element {
            Some(element) if self.config.may_run_scripts() && !self.sink.in_skip_mode() => {
                element
            }
            _ => return,
        };

        match url {
            Some(url) => {
                self.hold_back_input();
                let id = self.gate.next_id();
                log::debug!("requesting script {} from {}", id, url);
                let javascript = self.gate.javascript;
                match self.host.request_script(id, &url, charset.as_deref()) {
                    Fetch::Refused => trace_log!("script {} refused", id),
                    Fetch::Pending => self.gate.queue.push(id, url, element, javascript, None),
                    Fetch::Ready(result) => {
                        self.gate
                            .queue
                            .push(id, url, element, javascript, Some(result))
                    }
                }
                self.state.loading_external_script = !self.gate.queue.is_empty();
                self.run_ready_scripts();
            }
            None if self.gate.javascript && !source.is_empty() => {
                self.hold_back_input();
                let line = self.gate.start_line;
                self.execute_script(None, line, &source);
                self.run_ready_scripts();
            }
            None => (),
        }
    }

    /// Move unconsumed input behind whatever a script is about to write.
    fn hold_back_input(&mut self) {
        let rest = self.src.take();
        self.pending_src.prepend(rest);
    }

    fn execute_script(&mut self, url: Option<&str>, base_line: u32, source: &str) {
        log::debug!(
            "executing {} script from line {}",
            url.unwrap_or("inline"),
            base_line
        );

        self.gate.executing += 1;
        self.prepending.push(CharSource::new());
        if let Some(buffer) = self.prepending.last_mut() {
            let mut document = DocumentWriter { buffer };
            self.host
                .execute_script(url, base_line, source, &mut document);
        }
        let written = self.prepending.pop().unwrap_or_else(CharSource::new);
        self.gate.executing -= 1;
        self.state.allow_yield = true;

        match self.prepending.last_mut() {
            Some(outer) => outer.append(written),
            None => self.pending_src.prepend(written),
        }
    }

    /// Run scripts off the front of the queue for as long as their results are in. Once
    /// nothing is loading, the held-back input becomes current again.
    fn run_ready_scripts(&mut self) {
        while let Some(script) = self.gate.queue.pop_ready() {
            match script.result {
                Ok(source) => {
                    if script.javascript {
                        self.execute_script(Some(&script.url), 1, &source);
                    }
                    self.sink.script_event(&script.element, ScriptEvent::Load);
                }
                Err(error) => {
                    log::debug!("script {} failed to load: {}", script.url, error);
                    self.report(ParseError::ScriptFetchFailed);
                    self.sink.script_event(&script.element, ScriptEvent::Error);
                }
            }
        }

        if self.gate.queue.is_empty() {
            self.state.loading_external_script = false;
        }
        if !self.state.loading_external_script {
            let pending = self.pending_src.take();
            self.src.append(pending);
        }
    }
}

//! The character source the tokenizer reads from.
//!
//! A [`CharSource`] is a queue of text segments. Network input is appended at the back, while
//! script-generated markup and rescanned text is prepended at the front. Consumers only ever
//! look at one character at a time through [`CharSource::peek`] and [`CharSource::advance`], so
//! a segment boundary is invisible to them.
use std::collections::VecDeque;

/// Tracks the line and column of the next character to be consumed.
///
/// `\r`, `\n` and `\r\n` each count as a single line break, even when the `\r` and the `\n` arrive
/// in different writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineCounter {
    line: u32,
    column: u32,
    after_cr: bool,
}

impl Default for LineCounter {
    fn default() -> Self {
        LineCounter {
            line: 1,
            column: 1,
            after_cr: false,
        }
    }
}

impl LineCounter {
    /// The 1-based line number.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    /// The 1-based column within the current line, counted in characters.
    #[must_use]
    pub fn column(&self) -> u32 {
        self.column
    }

    fn consume(&mut self, c: char) {
        match c {
            '\r' => {
                self.newline();
                self.after_cr = true;
            }
            '\n' if self.after_cr => self.after_cr = false,
            '\n' => self.newline(),
            _ => {
                self.after_cr = false;
                self.column += 1;
            }
        }
    }

    fn consume_str(&mut self, s: &str) {
        for c in s.chars() {
            self.consume(c);
        }
    }

    fn newline(&mut self) {
        self.line += 1;
        self.column = 1;
    }
}

#[derive(Debug, Clone)]
struct Segment {
    text: String,
    // byte offset of the next unread character
    pos: usize,
    count_lines: bool,
}

impl Segment {
    fn rest(&self) -> &str {
        &self.text[self.pos..]
    }
}

/// A segmented, appendable and prependable stream of characters.
#[derive(Debug, Clone, Default)]
pub struct CharSource {
    segments: VecDeque<Segment>,
    // characters left across all segments
    len: usize,
    recording: Option<String>,
}

impl From<&str> for CharSource {
    fn from(text: &str) -> Self {
        CharSource::from(text.to_owned())
    }
}

impl From<String> for CharSource {
    fn from(text: String) -> Self {
        let mut source = CharSource::default();
        source.push_segment(text, true);
        source
    }
}

impl CharSource {
    /// Create an empty source.
    #[must_use]
    pub fn new() -> Self {
        CharSource::default()
    }

    /// Create a source whose characters never move the line counter. Used for text that was
    /// generated by scripts or that is being rescanned.
    #[must_use]
    pub fn excluding_line_numbers(text: impl Into<String>) -> Self {
        let mut source = CharSource::default();
        source.push_segment(text.into(), false);
        source
    }

    /// Stop every remaining character of this source from moving the line counter.
    pub fn set_exclude_line_numbers(&mut self) {
        for segment in &mut self.segments {
            segment.count_lines = false;
        }
    }

    fn push_segment(&mut self, text: String, count_lines: bool) {
        if text.is_empty() {
            return;
        }
        self.len += text.chars().count();
        self.segments.push_back(Segment {
            text,
            pos: 0,
            count_lines,
        });
    }

    /// The number of characters left to read.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether there is nothing left to read.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The next character, without consuming it.
    #[must_use]
    pub fn peek(&self) -> Option<char> {
        self.segments.front()?.rest().chars().next()
    }

    /// Consume the next character, feeding it to `lines` unless its segment is excluded from
    /// line counting.
    pub fn advance(&mut self, lines: &mut LineCounter) {
        if let Some((c, count_lines)) = self.pop_char() {
            if count_lines {
                lines.consume(c);
            }
        }
    }

    /// Consume the next character, which the caller knows not to be a line break. Only the
    /// column moves.
    pub fn advance_keeping_newline_count(&mut self, lines: &mut LineCounter) {
        if let Some((c, count_lines)) = self.pop_char() {
            debug_assert!(c != '\n' && c != '\r');
            if count_lines {
                lines.column += 1;
                lines.after_cr = false;
            }
        }
    }

    fn pop_char(&mut self) -> Option<(char, bool)> {
        let segment = self.segments.front_mut()?;
        let c = segment.rest().chars().next()?;
        let count_lines = segment.count_lines;
        segment.pos += c.len_utf8();
        if segment.pos == segment.text.len() {
            self.segments.pop_front();
        }
        self.len -= 1;
        if let Some(ref mut recording) = self.recording {
            recording.push(c);
        }
        Some((c, count_lines))
    }

    /// Consume characters up to, but excluding, the next occurrence of any of `needles` (or the
    /// end of the current segment) and append them to `out`. Returns how many characters were
    /// consumed.
    pub(crate) fn read_until(
        &mut self,
        needles: &[u8],
        lines: &mut LineCounter,
        out: &mut String,
    ) -> usize {
        let segment = match self.segments.front_mut() {
            Some(segment) => segment,
            None => return 0,
        };
        let rest = segment.rest();
        let end = fast_find(needles, rest.as_bytes()).unwrap_or(rest.len());
        if end == 0 {
            return 0;
        }

        // needles are ASCII, so `end` always falls on a character boundary
        let run = &rest[..end];
        let consumed = run.chars().count();
        out.push_str(run);
        if segment.count_lines {
            lines.consume_str(run);
        }
        if let Some(ref mut recording) = self.recording {
            recording.push_str(run);
        }
        segment.pos += end;
        if segment.pos == segment.text.len() {
            self.segments.pop_front();
        }
        self.len -= consumed;
        consumed
    }

    /// Add `other` after the last character of this source.
    pub fn append(&mut self, other: CharSource) {
        self.len += other.len;
        self.segments.extend(other.segments);
    }

    /// Add `other` before the next character of this source.
    pub fn prepend(&mut self, other: CharSource) {
        self.len += other.len;
        for segment in other.segments.into_iter().rev() {
            self.segments.push_front(segment);
        }
    }

    /// Move everything out of this source, leaving it empty. An active recording stays here.
    pub fn take(&mut self) -> CharSource {
        CharSource {
            segments: std::mem::take(&mut self.segments),
            len: std::mem::replace(&mut self.len, 0),
            recording: None,
        }
    }

    /// Turn the remaining characters back into a string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.segments.iter().map(Segment::rest).collect()
    }

    /// Start keeping a copy of every character consumed from now on.
    pub(crate) fn start_recording(&mut self) {
        self.recording = Some(String::new());
    }

    /// Stop recording and hand back what was consumed since [`CharSource::start_recording`].
    pub(crate) fn stop_recording(&mut self) -> String {
        self.recording.take().unwrap_or_default()
    }
}

fn fast_find(needle: &[u8], haystack: &[u8]) -> Option<usize> {
    #[cfg(feature = "memchr")]
    if needle.iter().all(|x| x.is_ascii()) {
        if needle.len() == 3 {
            return memchr::memchr3(needle[0], needle[1], needle[2], haystack);
        } else if needle.len() == 2 {
            return memchr::memchr2(needle[0], needle[1], haystack);
        } else if needle.len() == 1 {
            return memchr::memchr(needle[0], haystack);
        }
    }

    let (i, _) = haystack
        .iter()
        .enumerate()
        .find(|(_, &b)| needle.contains(&b))?;
    Some(i)
}

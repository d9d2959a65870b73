//! Module of helper functions for integration tests.
//!
//! Those tests should only test public API surface in general, with some exceptions as provided by
//! this module.
use std::cell::Cell;

use crate::{Diagnostics, Progress, ScriptHost, Tokenizer, TreeSink};

thread_local! {
    /// Buffer of all debugging output logged internally by htmlfeed.
    pub static OUTPUT: Cell<String> = Cell::default();
}

/// Simple debug logger for tests.
///
/// The test harness used by `tests/fixtures.rs` cannot capture stdout, see [libtest-mimic
/// issue #9](https://github.com/LukasKalbertodt/libtest-mimic/issues/9) -- this is much more performant
/// than println anyway though.
///
/// A noop version for release builds is implemented in src/utils.rs
pub fn trace_log(msg: &str) {
    OUTPUT.with(|cell| {
        let mut buf = cell.take();
        buf.push_str(msg);
        buf.push('\n');

        if buf.len() > 20 * 1024 * 1024 {
            buf.clear();
            buf.push_str("[truncated output]\n");
        }

        cell.set(buf);
    });
}

/// Feed `input` to the tokenizer `chunk_chars` characters at a time, calling
/// [`Tokenizer::resume`] whenever it yields, then finish the document.
///
/// Chunks written while the tokenizer is blocked on an external script are queued as usual. The
/// returned [`Progress`] is [`Progress::Blocked`] if the document still waits for a script.
pub fn write_in_chunks<S, H, D>(
    tokenizer: &mut Tokenizer<S, H, D>,
    input: &str,
    chunk_chars: usize,
) -> Progress
where
    S: TreeSink,
    H: ScriptHost,
    D: Diagnostics,
{
    let chars: Vec<char> = input.chars().collect();
    for chunk in chars.chunks(chunk_chars.max(1)) {
        let chunk: String = chunk.iter().collect();
        match drive(tokenizer, |t| t.write(&chunk, true)) {
            progress @ Progress::Stopped | progress @ Progress::Finished => return progress,
            _ => (),
        }
    }
    drive(tokenizer, Tokenizer::finish)
}

/// Run `f`, then keep resuming for as long as the tokenizer yields.
pub fn drive<S, H, D>(
    tokenizer: &mut Tokenizer<S, H, D>,
    f: impl FnOnce(&mut Tokenizer<S, H, D>) -> Progress,
) -> Progress
where
    S: TreeSink,
    H: ScriptHost,
    D: Diagnostics,
{
    let mut progress = f(tokenizer);
    while progress == Progress::Yielded {
        progress = tokenizer.resume();
    }
    progress
}

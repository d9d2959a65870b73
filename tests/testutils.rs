use std::backtrace::{Backtrace, BacktraceStatus};
use std::cell::Cell;
use std::fmt::Debug;
use std::panic::{self, UnwindSafe};
use std::sync::Once;

use libtest_mimic::Failed;

use htmlfeed::testutils::{trace_log, OUTPUT};
use htmlfeed::{Diagnostics, ScriptHost, Tokenizer, TreeSink};

thread_local! {
    /// The line the tokenizer of the running case got to.
    static REACHED_LINE: Cell<Option<u32>> = Cell::new(None);
}

/// Remember how far `tokenizer` got, for the failure message of the running case.
pub fn note_position<S, H, D>(tokenizer: &Tokenizer<S, H, D>)
where
    S: TreeSink,
    H: ScriptHost,
    D: Diagnostics,
{
    REACHED_LINE.with(|cell| cell.set(Some(tokenizer.line_number())));
}

/// Run one fixture case and turn a panic into a failure message.
///
/// Custom test harnesses cannot capture stdout, so the message carries everything needed to
/// debug the case: the `trace_log!` buffer (one line per state change, compiled out in release
/// mode), how the input was fed, the line the tokenizer reached and the panic itself.
pub fn catch_unwind_and_report(
    feed: impl Debug,
    f: impl FnOnce() + UnwindSafe,
) -> Result<(), Failed> {
    static PANIC_HOOK: Once = Once::new();
    PANIC_HOOK.call_once(|| {
        panic::set_hook(Box::new(|info| {
            let backtrace = Backtrace::capture();
            if backtrace.status() == BacktraceStatus::Captured {
                trace_log(&format!("{}\n{}", info, backtrace));
            } else {
                trace_log(&format!("{} (set RUST_BACKTRACE=1 for a backtrace)", info));
            }
        }));
    });

    REACHED_LINE.with(|cell| cell.set(None));
    let result = panic::catch_unwind(f);
    let log = OUTPUT.with(Cell::take);

    let payload = match result {
        Ok(()) => return Ok(()),
        Err(payload) => payload,
    };
    let message = payload
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| payload.downcast_ref::<&'static str>().copied())
        .unwrap_or("(no message)");
    let reached = match REACHED_LINE.with(Cell::get) {
        Some(line) => format!("line {}", line),
        None => "no line (panicked while feeding input)".to_owned(),
    };

    Err(format!(
        "{}\nFEED: {:?}, tokenizer reached {}\nPANIC: {}",
        log, feed, reached, message
    )
    .into())
}

macro_rules! surrogate_pat {
    () => {
        0xd800..=0xdfff
    };
}

pub(crate) use surrogate_pat;

/// Whitespace as far as tag and doctype syntax is concerned.
pub(crate) fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\x0B' | '\x0C' | '\r')
}

/// Compare the tail of `haystack` against an ASCII `needle`, ignoring ASCII case.
pub(crate) fn ends_with_ignore_case(haystack: &str, needle: &str) -> bool {
    let haystack = haystack.as_bytes();
    haystack.len() >= needle.len()
        && haystack[haystack.len() - needle.len()..].eq_ignore_ascii_case(needle.as_bytes())
}

/// Turn `\r` and `\r\n` into `\n` in the content of a raw-text region or comment. The content
/// is complete, so a trailing `\r` has no effect on what follows it.
pub(crate) fn normalize_line_breaks(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut after_cr = false;
    for c in raw.chars() {
        match c {
            '\r' => out.push('\n'),
            '\n' if after_cr => (),
            c => out.push(c),
        }
        after_cr = c == '\r';
    }
    out
}

// having this be a macro is performance critical. rustc appears to be unable to optimize away code
// like this:
//
// ```rust
// fn noop(s: &str) {}
//
// noop(&format!("foo"));
// ```
//
// format!() + its string allocation still exists in resulting code
macro_rules! trace_log {
    ($($tt:tt)*) => {{
        #[cfg(debug_assertions)]
        crate::testutils::trace_log(&format!($($tt)*));
        ::log::trace!($($tt)*);
    }};
}

pub(crate) use trace_log;

use std::collections::HashMap;
use std::time::Duration;

use pretty_assertions::assert_eq;

use htmlfeed::testutils::{drive, write_in_chunks};
use htmlfeed::{
    DefaultSink, Diagnostic, DocumentWriter, EndTag, Fetch, FetchError, GateError, NoDiagnostics,
    NoScripting, Output, ParseError, Progress, ScriptEvent, ScriptHost, ScriptId, Severity,
    StartTag, Token, TokenKind, Tokenizer, TokenizerConfig, TreeSink,
};

/// Runs scripts of the form `write:<markup>` by writing `<markup>` into the document.
#[derive(Debug, Default)]
struct Host {
    executed: Vec<(Option<String>, u32, String)>,
    requested: Vec<(ScriptId, String, Option<String>)>,
    cached: HashMap<String, Result<String, FetchError>>,
}

impl Host {
    fn with_cached(url: &str, result: Result<&str, FetchError>) -> Self {
        let mut host = Host::default();
        host.cached
            .insert(url.to_owned(), result.map(str::to_owned));
        host
    }

    fn executed_sources(&self) -> Vec<&str> {
        self.executed.iter().map(|(_, _, s)| s.as_str()).collect()
    }
}

impl ScriptHost for Host {
    fn execute_script(
        &mut self,
        url: Option<&str>,
        base_line: u32,
        source: &str,
        document: &mut DocumentWriter<'_>,
    ) {
        self.executed
            .push((url.map(str::to_owned), base_line, source.to_owned()));
        if let Some(markup) = source.strip_prefix("write:") {
            document.write(markup);
        }
    }

    fn request_script(&mut self, id: ScriptId, url: &str, charset: Option<&str>) -> Fetch {
        self.requested
            .push((id, url.to_owned(), charset.map(str::to_owned)));
        match self.cached.get(url) {
            Some(result) => Fetch::Ready(result.clone()),
            None => Fetch::Pending,
        }
    }
}

fn start(name: &str, attributes: &[(&str, &str)]) -> Output {
    Output::StartTag(StartTag {
        self_closing: false,
        name: name.to_owned(),
        attributes: attributes
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect(),
    })
}

fn end(name: &str) -> Output {
    Output::EndTag(EndTag {
        name: name.to_owned(),
    })
}

fn text(s: &str) -> Output {
    Output::Text(s.to_owned())
}

fn tokenize(input: &str) -> Vec<Output> {
    let mut tokenizer = Tokenizer::new(DefaultSink::new());
    assert_eq!(write_in_chunks(&mut tokenizer, input, usize::MAX), Progress::Finished);
    tokenizer.sink_mut().take_tokens()
}

fn yield_everywhere() -> TokenizerConfig {
    TokenizerConfig {
        chunk_size: 0,
        time_budget: Duration::ZERO,
        ..TokenizerConfig::default()
    }
}

const DOCUMENT: &str = "<!DOCTYPE html>\r\n<html><head><title>T &amp; t</title>\
<style>p > a { color: red }</style>\
<script>if (a < b) x = \"</div>\";</script></head>\
<body class=\"main\" data-x=1><!-- comment --><pre>\n  pre</pre>\
<p>caf&eacute; &#233; &unknown; <a href='/?a=1&amp;b=2'>link</a>\
<textarea>&lt;/textarea&gt;</textarea><?pi?><% asp %>\
<br/><img src=x /></body></html>\n";

#[test]
fn chunking_does_not_change_tokens() {
    let expected = tokenize(DOCUMENT);
    assert!(expected.len() > 20);

    for chunk_chars in 1..=13 {
        let mut tokenizer = Tokenizer::new(DefaultSink::new());
        assert_eq!(
            write_in_chunks(&mut tokenizer, DOCUMENT, chunk_chars),
            Progress::Finished
        );
        assert_eq!(tokenizer.sink().tokens(), &expected[..], "chunks of {}", chunk_chars);
    }
}

#[test]
fn yielding_does_not_change_tokens() {
    let expected = tokenize(DOCUMENT);

    let mut tokenizer = Tokenizer::new(DefaultSink::new()).with_config(yield_everywhere());
    assert_eq!(tokenizer.write(DOCUMENT, true), Progress::Yielded);
    assert!(tokenizer.has_pending_continuation());

    // input written while yielded is only queued
    assert_eq!(tokenizer.write("<p>more", true), Progress::Yielded);
    assert_eq!(tokenizer.finish(), Progress::Yielded);
    assert!(!tokenizer.is_finished());

    let mut resumes = 0;
    while tokenizer.resume() == Progress::Yielded {
        resumes += 1;
    }
    assert!(resumes > 10);
    assert!(tokenizer.is_finished());
    assert!(!tokenizer.has_pending_continuation());

    let mut expected = expected;
    expected.push(start("p", &[]));
    expected.push(text("more"));
    assert_eq!(tokenizer.sink().tokens(), &expected[..]);
}

#[test]
fn forced_synchronous_writes_never_yield() {
    let mut tokenizer = Tokenizer::new(DefaultSink::new()).with_config(yield_everywhere());
    tokenizer.set_force_synchronous(true);
    assert_eq!(tokenizer.write(DOCUMENT, true), Progress::Done);
    assert_eq!(tokenizer.finish(), Progress::Finished);
    assert_eq!(tokenizer.sink().tokens(), &tokenize(DOCUMENT)[..]);
}

#[test]
fn resume_without_a_yield_does_nothing() {
    let mut tokenizer = Tokenizer::new(DefaultSink::new());
    assert_eq!(tokenizer.resume(), Progress::Done);
    tokenizer.write("<p>", true);
    assert_eq!(tokenizer.resume(), Progress::Done);
    assert_eq!(tokenizer.sink().tokens(), &[start("p", &[])]);
}

#[test]
fn finish_is_idempotent() {
    let mut tokenizer = Tokenizer::new(DefaultSink::new());
    tokenizer.write("<p>x", true);
    assert_eq!(tokenizer.finish(), Progress::Finished);
    assert_eq!(tokenizer.finish(), Progress::Finished);
    assert_eq!(tokenizer.write("<b>", true), Progress::Finished);
    assert!(tokenizer.sink().is_finished());
    assert_eq!(tokenizer.sink().tokens(), &[start("p", &[]), text("x")]);
}

#[test]
fn empty_document() {
    let mut tokenizer = Tokenizer::new(DefaultSink::new());
    assert_eq!(tokenizer.finish(), Progress::Finished);
    assert!(tokenizer.sink().tokens().is_empty());
    assert!(tokenizer.sink().is_finished());
}

#[test]
fn stop_parsing_is_terminal() {
    let mut tokenizer = Tokenizer::new(DefaultSink::new());
    tokenizer.write("<p>x", true);
    tokenizer.stop_parsing();
    assert!(tokenizer.is_stopped());
    assert_eq!(tokenizer.write("<b>", true), Progress::Stopped);
    assert_eq!(tokenizer.resume(), Progress::Stopped);
    assert_eq!(tokenizer.finish(), Progress::Stopped);
    assert!(!tokenizer.sink().is_finished());
    assert_eq!(tokenizer.sink().tokens(), &[start("p", &[])]);
}

#[test]
fn strict_mode_stops_at_the_first_diagnostic() {
    let config = TokenizerConfig {
        strict: true,
        ..TokenizerConfig::default()
    };
    let mut tokenizer = Tokenizer::new_with_parts(
        config,
        DefaultSink::new(),
        NoScripting,
        Vec::<Diagnostic>::new(),
    );
    assert_eq!(tokenizer.write("<p>a < b<i>", true), Progress::Stopped);
    assert!(tokenizer.is_stopped());

    let (sink, _, diagnostics) = tokenizer.into_parts();
    assert_eq!(sink.tokens(), &[start("p", &[])]);
    assert_eq!(
        diagnostics,
        vec![Diagnostic {
            error: ParseError::InvalidFirstCharacterOfTagName,
            severity: Severity::Fatal,
            line: 1,
            column: 7,
        }]
    );
}

#[test]
fn diagnostics_carry_positions() {
    let mut tokenizer = Tokenizer::new_with_parts(
        TokenizerConfig::default(),
        DefaultSink::new(),
        NoScripting,
        Vec::<Diagnostic>::new(),
    );
    tokenizer.write("a\r\nb\n<", true);
    tokenizer.finish();
    let (sink, _, diagnostics) = tokenizer.into_parts();
    assert!(sink.is_finished());
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].error, ParseError::EofBeforeTagName);
    assert_eq!(diagnostics[0].severity, Severity::Warning);
    assert_eq!(diagnostics[0].line, 3);
    assert_eq!(diagnostics[0].error.to_string(), "eof-before-tag-name");
    assert_eq!(
        "eof-before-tag-name".parse::<ParseError>(),
        Ok(ParseError::EofBeforeTagName)
    );
}

#[test]
fn line_numbers() {
    let mut tokenizer = Tokenizer::new(DefaultSink::new());
    tokenizer.write("a\r", true);
    tokenizer.write("\nb\nc", true);
    assert_eq!(tokenizer.line_number(), 3);

    // script-inserted text does not count
    tokenizer.write("\n\n\n", false);
    assert_eq!(tokenizer.line_number(), 3);
    tokenizer.write("\n", true);
    assert_eq!(tokenizer.line_number(), 4);
}

#[test]
fn inline_script_output_comes_before_the_rest_of_the_input() {
    let mut tokenizer = Tokenizer::new_with_host(DefaultSink::new(), Host::default());
    let progress = write_in_chunks(
        &mut tokenizer,
        "\n\n<script>write:<b>hi</b></script><i>",
        3,
    );
    assert_eq!(progress, Progress::Finished);
    assert_eq!(
        tokenizer.sink().tokens(),
        &[
            text("\n\n"),
            start("script", &[]),
            text("write:<b>hi</b>"),
            end("script"),
            start("b", &[]),
            text("hi"),
            end("b"),
            start("i", &[]),
        ]
    );
    assert_eq!(
        tokenizer.host().executed,
        vec![(None, 3, "write:<b>hi</b>".to_owned())]
    );
    assert_eq!(tokenizer.line_number(), 3);
}

#[test]
fn script_output_with_line_breaks_does_not_move_the_line_counter() {
    let mut tokenizer = Tokenizer::new_with_host(DefaultSink::new(), Host::default());
    tokenizer.write("<script>write:a\nb\nc</script>\nx", true);
    tokenizer.finish();
    assert_eq!(tokenizer.line_number(), 4);
    assert_eq!(&tokenizer.sink().tokens()[3..], &[text("a\nb\nc\nx")]);
}

#[test]
fn scripts_are_not_run_when_they_may_not_be() {
    let input = "<script>write:<b></script><script type=text/template>write:<i></script>\
                 <script language=vbscript>write:<u></script><script></script>";

    for config in &[
        TokenizerConfig {
            scripting_enabled: false,
            ..TokenizerConfig::default()
        },
        TokenizerConfig {
            fragment: true,
            ..TokenizerConfig::default()
        },
        TokenizerConfig {
            view_source: true,
            ..TokenizerConfig::default()
        },
    ] {
        let mut tokenizer = Tokenizer::new_with_parts(
            config.clone(),
            DefaultSink::new(),
            Host::default(),
            NoDiagnostics,
        );
        write_in_chunks(&mut tokenizer, input, 5);
        assert!(tokenizer.host().executed.is_empty());
    }

    let mut tokenizer = Tokenizer::new_with_host(DefaultSink::new(), Host::default());
    write_in_chunks(&mut tokenizer, input, 5);
    // only the first one is JavaScript, and the empty one has nothing to run
    assert_eq!(tokenizer.host().executed_sources(), vec!["write:<b>"]);
}

#[test]
fn nested_document_writes() {
    let host = Host::with_cached("nested.js", Ok("write:<script>write:<u></script><p>"));
    let mut tokenizer = Tokenizer::new_with_host(DefaultSink::new(), host);
    let progress = write_in_chunks(&mut tokenizer, "<script src=nested.js></script>rest", 4);
    assert_eq!(progress, Progress::Finished);
    assert_eq!(
        tokenizer.sink().tokens(),
        &[
            start("script", &[("src", "nested.js")]),
            end("script"),
            start("script", &[]),
            text("write:<u>"),
            end("script"),
            start("u", &[]),
            start("p", &[]),
            text("rest"),
        ]
    );
    assert_eq!(
        tokenizer.host().executed_sources(),
        vec!["write:<script>write:<u></script><p>", "write:<u>"]
    );
    assert_eq!(tokenizer.host().executed[0].0.as_deref(), Some("nested.js"));
    assert_eq!(tokenizer.host().executed[0].1, 1);
    assert_eq!(tokenizer.sink().script_events(), &[(0, ScriptEvent::Load)]);
}

#[test]
fn external_script_blocks_until_fetched() {
    let mut tokenizer = Tokenizer::new_with_host(DefaultSink::new(), Host::default());
    assert_eq!(
        tokenizer.write("<script src=\"a.js\" charset=utf-8></script>after", true),
        Progress::Blocked
    );
    assert!(tokenizer.is_blocked_on_script());
    assert_eq!(tokenizer.write("<p>", true), Progress::Blocked);
    assert_eq!(tokenizer.finish(), Progress::Blocked);
    assert_eq!(tokenizer.resume(), Progress::Blocked);
    assert!(!tokenizer.is_finished());
    assert_eq!(
        tokenizer.sink().tokens(),
        &[start("script", &[("charset", "utf-8"), ("src", "a.js")]), end("script")]
    );

    let (id, url, charset) = tokenizer.host().requested[0].clone();
    assert_eq!(url, "a.js");
    assert_eq!(charset.as_deref(), Some("utf-8"));

    assert_eq!(
        tokenizer.script_fetched(id, Ok("write:<b>".to_owned())),
        Ok(Progress::Finished)
    );
    assert!(!tokenizer.is_blocked_on_script());
    assert_eq!(
        &tokenizer.sink().tokens()[2..],
        &[start("b", &[]), text("after"), start("p", &[])]
    );
    assert_eq!(tokenizer.sink().script_events(), &[(0, ScriptEvent::Load)]);
    assert!(tokenizer.sink().is_finished());
}

/// Each external script blocks until it is fetched, so only one is ever in flight here.
/// Completion out of request order is covered by the `ScriptQueue` unit tests.
#[test]
fn external_scripts_run_in_document_order() {
    let mut tokenizer = Tokenizer::new_with_host(DefaultSink::new(), Host::default());
    let input = "<script src=a.js></script>x<script src=b.js></script>y";
    assert_eq!(tokenizer.write(input, true), Progress::Blocked);
    assert_eq!(tokenizer.finish(), Progress::Blocked);
    assert_eq!(tokenizer.host().requested.len(), 1);

    let a = tokenizer.host().requested[0].0;
    assert_eq!(
        tokenizer.script_fetched(a, Ok("a".to_owned())),
        Ok(Progress::Blocked)
    );
    assert_eq!(tokenizer.host().requested.len(), 2);

    let b = tokenizer.host().requested[1].0;
    assert_ne!(a, b);
    assert_eq!(
        tokenizer.script_fetched(a, Ok("again".to_owned())),
        Err(GateError::UnknownScript(a))
    );
    assert_eq!(
        tokenizer.script_fetched(b, Ok("b".to_owned())),
        Ok(Progress::Finished)
    );

    assert_eq!(tokenizer.host().executed_sources(), vec!["a", "b"]);
    assert_eq!(
        tokenizer.sink().script_events(),
        &[(0, ScriptEvent::Load), (3, ScriptEvent::Load)]
    );
    assert_eq!(tokenizer.sink().tokens()[2], text("x"));
    assert_eq!(tokenizer.sink().tokens()[5], text("y"));
}

#[test]
fn unknown_script_ids_are_rejected() {
    let mut tokenizer = Tokenizer::new_with_host(DefaultSink::new(), Host::default());
    tokenizer.write("<script src=a.js></script>", true);
    assert_eq!(
        tokenizer.script_fetched(ScriptId(1234), Ok(String::new())),
        Err(GateError::UnknownScript(ScriptId(1234)))
    );
    assert!(tokenizer.is_blocked_on_script());
}

#[test]
fn failed_fetch_fires_error_event_and_continues() {
    let mut tokenizer = Tokenizer::new_with_parts(
        TokenizerConfig::default(),
        DefaultSink::new(),
        Host::default(),
        Vec::<Diagnostic>::new(),
    );
    tokenizer.write("<script src=gone.js></script>x", true);
    let id = tokenizer.host().requested[0].0;
    assert_eq!(
        tokenizer.script_fetched(id, Err(FetchError::new("404 Not Found"))),
        Ok(Progress::Done)
    );
    assert_eq!(tokenizer.finish(), Progress::Finished);

    let (sink, host, diagnostics) = tokenizer.into_parts();
    assert!(host.executed.is_empty());
    assert_eq!(sink.script_events(), &[(0, ScriptEvent::Error)]);
    assert_eq!(sink.tokens()[2], text("x"));
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].error, ParseError::ScriptFetchFailed);
}

#[test]
fn cached_scripts_do_not_block() {
    let host = Host::with_cached("cached.js", Ok("write:<b>"));
    let mut tokenizer = Tokenizer::new_with_host(DefaultSink::new(), host);
    assert_eq!(
        tokenizer.write("<script src=cached.js></script>x", true),
        Progress::Done
    );
    assert_eq!(&tokenizer.sink().tokens()[2..], &[start("b", &[])]);
    assert_eq!(tokenizer.finish(), Progress::Finished);
    assert_eq!(tokenizer.sink().tokens()[3], text("x"));
}

#[test]
fn refused_scripts_are_skipped() {
    let mut tokenizer = Tokenizer::new(DefaultSink::new());
    assert_eq!(
        tokenizer.write("<script src=a.js></script>x", true),
        Progress::Done
    );
    assert_eq!(tokenizer.finish(), Progress::Finished);
    assert_eq!(tokenizer.sink().tokens()[2], text("x"));
    assert!(tokenizer.sink().script_events().is_empty());
}

#[test]
fn self_closing_script_is_requested() {
    let mut tokenizer = Tokenizer::new_with_host(DefaultSink::new(), Host::default());
    assert_eq!(
        tokenizer.write("<script src=\"a.js\"/><p>", true),
        Progress::Blocked
    );
    assert_eq!(
        tokenizer.sink().tokens(),
        &[
            Output::StartTag(StartTag {
                self_closing: true,
                name: "script".to_owned(),
                attributes: vec![("src".to_owned(), "a.js".to_owned())]
                    .into_iter()
                    .collect(),
            }),
            end("script"),
        ]
    );
}

#[test]
fn yielding_while_a_script_writes() {
    let config = yield_everywhere();
    let mut tokenizer = Tokenizer::new_with_parts(
        config,
        DefaultSink::new(),
        Host::with_cached("a.js", Ok("write:<b>x</b>")),
        NoDiagnostics,
    );
    let progress = drive(&mut tokenizer, |t| {
        t.write("<script>write:<i></script><script src=a.js></script>y", true)
    });
    assert_eq!(progress, Progress::Done);
    assert_eq!(drive(&mut tokenizer, Tokenizer::finish), Progress::Finished);
    assert_eq!(
        &tokenizer.sink().tokens()[3..],
        &[
            start("i", &[]),
            start("script", &[("src", "a.js")]),
            end("script"),
            start("b", &[]),
            text("x"),
            end("b"),
            text("y"),
        ]
    );
}

/// Only treats some elements as live.
struct Selective {
    tokens: Vec<Output>,
    live: fn(&Token) -> bool,
    skipping: bool,
}

impl Selective {
    fn new(live: fn(&Token) -> bool) -> Self {
        Selective {
            tokens: Vec::new(),
            live,
            skipping: false,
        }
    }
}

impl TreeSink for Selective {
    type Handle = ();

    fn process_token(&mut self, token: &Token) -> Option<()> {
        self.tokens.push(Output::from(token));
        if token.kind == TokenKind::StartTag && (self.live)(token) {
            Some(())
        } else {
            None
        }
    }

    fn process_doctype(&mut self, _: &htmlfeed::Doctype) {}

    fn in_skip_mode(&self) -> bool {
        self.skipping
    }
}

#[test]
fn raw_text_needs_a_live_element() {
    let mut tokenizer = Tokenizer::new(Selective::new(|_| false));
    write_in_chunks(&mut tokenizer, "<script><b></script><pre>\nx", 2);
    assert_eq!(
        tokenizer.sink().tokens,
        vec![
            start("script", &[]),
            start("b", &[]),
            end("script"),
            start("pre", &[]),
            text("\nx"),
        ]
    );
}

#[test]
fn scripts_do_not_run_in_skip_mode() {
    let mut sink = Selective::new(|_| true);
    sink.skipping = true;
    let mut tokenizer = Tokenizer::new_with_host(sink, Host::default());
    write_in_chunks(&mut tokenizer, "<script>write:<b></script><script src=a.js></script>", 100);
    assert!(tokenizer.is_finished());
    assert!(tokenizer.host().executed.is_empty());
    assert!(tokenizer.host().requested.is_empty());
}

#[test]
fn title_rollback_restores_line_numbers() {
    let mut tokenizer = Tokenizer::new(DefaultSink::new());
    write_in_chunks(&mut tokenizer, "<title>\n\n<p>x", 3);
    assert_eq!(
        tokenizer.sink().tokens(),
        &[start("title", &[]), text("\n\n"), start("p", &[]), text("x")]
    );
    assert_eq!(tokenizer.line_number(), 3);
}

#[test]
fn tokens_carry_their_start_line() {
    struct Lines(Vec<(TokenKind, u32)>);

    impl TreeSink for Lines {
        type Handle = ();

        fn process_token(&mut self, token: &Token) -> Option<()> {
            self.0.push((token.kind, token.line));
            None
        }

        fn process_doctype(&mut self, _: &htmlfeed::Doctype) {}
    }

    let mut tokenizer = Tokenizer::new(Lines(Vec::new()));
    tokenizer.write("<a\nhref=x>\n<!--\n-->", true);
    tokenizer.finish();
    let lines = &tokenizer.sink().0;
    assert_eq!(lines[0], (TokenKind::StartTag, 1));
    assert_eq!(lines[1].0, TokenKind::Text);
    assert_eq!(lines[2], (TokenKind::Comment, 4));
}

fn tokenize_with_diagnostics(
    input: &str,
    chunk_chars: usize,
) -> (Vec<Output>, Vec<Diagnostic>) {
    let mut tokenizer = Tokenizer::new_with_parts(
        TokenizerConfig::default(),
        DefaultSink::new(),
        NoScripting,
        Vec::<Diagnostic>::new(),
    );
    assert_eq!(
        write_in_chunks(&mut tokenizer, input, chunk_chars),
        Progress::Finished
    );
    let (mut sink, _, diagnostics) = tokenizer.into_parts();
    (sink.take_tokens(), diagnostics)
}

#[test]
fn overlong_tag_names_are_cut() {
    let name = "a".repeat(2000);
    let input = format!("<{}>x", name);
    let head = &name[..1024];
    let tail = &name[1024..];

    for &chunk_chars in &[1, 7, usize::MAX] {
        let (tokens, diagnostics) = tokenize_with_diagnostics(&input, chunk_chars);
        assert_eq!(tokens, vec![start(head, &[(tail, "")]), text("x")]);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].error, ParseError::TagNameTooLong);
        assert_eq!(diagnostics[0].severity, Severity::Warning);
        assert_eq!((diagnostics[0].line, diagnostics[0].column), (1, 1026));
    }
}

#[test]
fn overlong_attribute_names_are_cut() {
    let name = "b".repeat(2000);
    let input = format!("<p {}>x", name);
    let head = &name[..1024];
    let tail = &name[1024..];
    assert_eq!(tail.len(), 976);

    for &chunk_chars in &[1, 7, usize::MAX] {
        let (tokens, diagnostics) = tokenize_with_diagnostics(&input, chunk_chars);
        assert_eq!(tokens, vec![start("p", &[(head, ""), (tail, "")]), text("x")]);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].error, ParseError::AttributeNameTooLong);
        assert_eq!((diagnostics[0].line, diagnostics[0].column), (1, 1028));
    }
}

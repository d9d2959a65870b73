//! Let's you easily try out the tokenizer with e.g.
//! printf '<h1>Hello world!</h1>' | cargo run --example=tokenize
use std::io::Read;

use htmlfeed::{DefaultSink, Progress, Tokenizer};

fn main() {
    let mut input = String::new();
    std::io::stdin()
        .lock()
        .read_to_string(&mut input)
        .expect("stdin is not UTF-8");

    let mut tokenizer = Tokenizer::new(DefaultSink::new());
    let mut progress = tokenizer.write(&input, true);
    while progress == Progress::Yielded {
        progress = tokenizer.resume();
    }
    tokenizer.finish();
    while tokenizer.has_pending_continuation() {
        tokenizer.resume();
    }

    for token in tokenizer.sink().tokens() {
        println!("{:?}", token);
    }
}

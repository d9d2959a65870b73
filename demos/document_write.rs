//! Shows how scripts take part in tokenization. The "scripts" here only understand
//! `document.write("...")`, one call per line.
//!
//! cargo run --example=document_write
use htmlfeed::{
    DefaultSink, DocumentWriter, Fetch, FetchError, Progress, ScriptHost, ScriptId, Tokenizer,
};

#[derive(Default)]
struct ToyHost {
    requested: Vec<(ScriptId, String)>,
}

impl ScriptHost for ToyHost {
    fn execute_script(
        &mut self,
        url: Option<&str>,
        base_line: u32,
        source: &str,
        document: &mut DocumentWriter<'_>,
    ) {
        println!(
            "running {} (line {})",
            url.unwrap_or("inline script"),
            base_line
        );
        for line in source.lines() {
            let markup = line
                .trim()
                .strip_prefix("document.write(\"")
                .and_then(|rest| rest.strip_suffix("\");"));
            if let Some(markup) = markup {
                document.write(markup);
            }
        }
    }

    fn request_script(&mut self, id: ScriptId, url: &str, _charset: Option<&str>) -> Fetch {
        println!("fetching {} as {}", url, id);
        self.requested.push((id, url.to_owned()));
        Fetch::Pending
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut tokenizer = Tokenizer::new_with_host(DefaultSink::new(), ToyHost::default());

    tokenizer.write(
        "<p>before</p>\n<script>\ndocument.write(\"<b>inline</b>\");\n</script><p>after</p>\n",
        true,
    );

    let progress = tokenizer.write("<script src=ads.js></script><p>last</p>", true);
    println!("after the external script: {:?}", progress);

    let requested = std::mem::take(&mut tokenizer.host_mut().requested);
    for (id, url) in requested {
        let result = if url == "ads.js" {
            Ok("document.write(\"<i>from ads.js</i>\");".to_owned())
        } else {
            Err(FetchError::new("not found"))
        };
        let progress = tokenizer.script_fetched(id, result)?;
        println!("after {} arrived: {:?}", url, progress);
    }

    if tokenizer.finish() == Progress::Finished {
        for token in tokenizer.sink().tokens() {
            println!("{:?}", token);
        }
    }
    Ok(())
}

/// Implementation of `pbp inspect`.
///
/// Decodes a whole text and prints one line per segment that is not
/// prose.
///
/// # Output format
///
/// ```text
/// Block 0: FILE path="src/main.rs" version=2 part=1 lang=rust [120..245] (58 bytes)
/// Block 1: FILE path="src/main.rs" version=2 end [245..380]
/// Block 2: SNIPPET lang=bash [402..480] (9 bytes)
/// Rejected: unparseable file block at bytes 500..560
/// Open: FILE at byte 600, header complete, 31 bytes so far
/// ---
/// 3 blocks, 1 rejected, 1 open, 212 bytes of prose
/// ```
///
/// With `--json` every block becomes a JSON object on its own line.
use std::fs;
use std::ops::Range;

use anyhow::{Context, Result};
use pbp_decoder::{BlockDecoder, Segment};
use pbp_types::Block;
use serde_json::json;

use crate::InspectArgs;

/// Run the `pbp inspect` command.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn run(args: &InspectArgs) -> Result<()> {
    let text = fs::read_to_string(&args.file).with_context(|| format!("cannot read {}", args.file.display()))?;
    let decoded = BlockDecoder::decode(&text);

    let mut blocks = 0usize;
    let mut rejected = 0usize;
    let mut prose = 0usize;
    for segment in &decoded.segments {
        match segment {
            Segment::Prose { text, .. } => prose += text.len(),
            Segment::Block { block, span } => {
                if args.json {
                    println!("{}", block_json(block, span));
                } else {
                    println!("Block {blocks}: {}", block_line(block, span));
                    if args.show_body {
                        println!("         Body:    {}", preview(block.content()));
                    }
                }
                blocks += 1;
            }
            Segment::Rejected { error, span } => {
                rejected += 1;
                if args.json {
                    println!("{}", json!({ "rejected": error.to_string(), "start": span.start, "end": span.end }));
                } else {
                    println!("Rejected: {error}");
                }
            }
        }
    }

    if let Some(open) = &decoded.open {
        if args.json {
            println!(
                "{}",
                json!({ "open": open.kind.label(), "start": open.offset, "header_closed": open.header_closed, "content_bytes": open.content.len() })
            );
        } else {
            println!(
                "Open: {} at byte {}, header {}, {} bytes so far",
                open.kind.label().to_uppercase(),
                open.offset,
                if open.header_closed { "complete" } else { "incomplete" },
                open.content.len()
            );
        }
    }

    if !args.json {
        println!("---");
        println!(
            "{blocks} block{}, {rejected} rejected, {} open, {prose} bytes of prose",
            if blocks == 1 { "" } else { "s" },
            usize::from(decoded.open.is_some())
        );
    }
    Ok(())
}

fn block_line(block: &Block, span: &Range<usize>) -> String {
    let detail = match block {
        Block::File(file) => {
            let part = if file.is_terminator() {
                "end".to_string()
            } else {
                format!("part={}", file.part)
            };
            let lang = file
                .language
                .as_deref()
                .map(|l| format!(" lang={l}"))
                .unwrap_or_default();
            format!("FILE path={:?} version={} {part}{lang}", file.path, file.version)
        }
        Block::Snippet(snippet) => match &snippet.language {
            Some(lang) => format!("SNIPPET lang={lang}"),
            None => "SNIPPET".to_string(),
        },
        Block::TerminalLog(log) => format!("TERMINAL-LOG name={:?}", log.path),
    };
    let size = block.content().len();
    if size == 0 {
        format!("{detail} [{}..{}]", span.start, span.end)
    } else {
        format!("{detail} [{}..{}] ({size} bytes)", span.start, span.end)
    }
}

fn block_json(block: &Block, span: &Range<usize>) -> serde_json::Value {
    let mut value = json!({
        "kind": block.kind().label(),
        "start": span.start,
        "end": span.end,
        "bytes": block.content().len(),
    });
    match block {
        Block::File(file) => {
            value["path"] = json!(file.path);
            value["version"] = json!(file.version);
            value["part"] = json!(file.part);
            value["terminator"] = json!(file.is_terminator());
            value["language"] = json!(file.language);
        }
        Block::Snippet(snippet) => value["language"] = json!(snippet.language),
        Block::TerminalLog(log) => value["name"] = json!(log.path),
    }
    value
}

/// First 80 characters, newlines shown as `⏎`.
fn preview(content: &str) -> String {
    let shown: String = content.chars().take(80).map(|c| if c == '\n' { '⏎' } else { c }).collect();
    if content.chars().count() > 80 {
        format!("{shown}…")
    } else {
        shown
    }
}

#[cfg(test)]
mod tests {
    use pbp_types::{FileBlock, SnippetBlock};

    use super::*;

    #[test]
    fn file_lines_show_part_or_end() {
        let part: Block = FileBlock::part("a.py", 2, 1, "x = 1\n").with_language("python").into();
        assert_eq!(
            block_line(&part, &(0..10)),
            "FILE path=\"a.py\" version=2 part=1 lang=python [0..10] (6 bytes)"
        );
        let end: Block = FileBlock::terminator("a.py", 2).into();
        assert_eq!(block_line(&end, &(10..20)), "FILE path=\"a.py\" version=2 end [10..20]");
    }

    #[test]
    fn json_carries_file_identity() {
        let block: Block = FileBlock::part("src/lib.rs", 3, 2, "fn f() {}").into();
        let value = block_json(&block, &(5..50));
        assert_eq!(value["kind"], "file");
        assert_eq!(value["path"], "src/lib.rs");
        assert_eq!(value["version"], 3);
        assert_eq!(value["part"], 2);
        assert_eq!(value["terminator"], false);
    }

    #[test]
    fn preview_is_one_line_and_bounded() {
        let block: Block = SnippetBlock::new(None, "a\nb").into();
        assert_eq!(preview(block.content()), "a⏎b");
        let long = "x".repeat(100);
        assert_eq!(preview(&long).chars().count(), 81);
    }
}

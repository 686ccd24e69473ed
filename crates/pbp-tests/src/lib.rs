//! Shared helpers for the integration tests and benchmarks.
//!
//! Golden fixtures live in `tests/golden/` as plain model responses and
//! conversations. [`outline`] turns a decoded text into one line per
//! segment so that tests can snapshot the decoder's view of a fixture
//! without depending on byte offsets.

#![warn(clippy::pedantic)]

use std::path::Path;

use pbp_decoder::{DecodeError, DecodedText, Emission, IncrementalDecoder, Segment};
use pbp_encoder::ContextEncoder;
use pbp_types::Block;

/// Read `tests/golden/<name>`.
///
/// # Panics
///
/// When the fixture is missing.
pub fn golden(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/golden")
        .join(name);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read golden fixture {}: {e}", path.display()))
}

/// One line per segment. Whitespace-only prose is left out.
///
/// ```text
/// prose "Adding a greeting module."
/// file src/greet.py v1 part 1 [python] (2 lines)
/// file src/greet.py v1 end [python]
/// snippet [bash] (1 lines)
/// rejected file: file block is missing required field Path
/// open file, header complete (4 lines so far)
/// ```
pub fn outline(decoded: &DecodedText) -> String {
    let mut lines = Vec::new();
    for segment in &decoded.segments {
        match segment {
            Segment::Prose { text, .. } => {
                let text = text.trim();
                if !text.is_empty() {
                    lines.push(format!("prose {text:?}"));
                }
            }
            Segment::Block { block, .. } => lines.push(block_line(block)),
            Segment::Rejected { error, .. } => lines.push(rejected_line(error)),
        }
    }
    if let Some(open) = &decoded.open {
        lines.push(format!(
            "open {}, header {} ({} lines so far)",
            open.kind,
            if open.header_closed { "complete" } else { "incomplete" },
            open.content.lines().count()
        ));
    }
    lines.join("\n")
}

fn block_line(block: &Block) -> String {
    let lines = block.content().lines().count();
    match block {
        Block::File(file) => {
            let mut line = format!("file {} v{}", file.path, file.version);
            if file.is_terminator() {
                line.push_str(" end");
            } else {
                line.push_str(&format!(" part {}", file.part));
            }
            if let Some(language) = &file.language {
                line.push_str(&format!(" [{language}]"));
            }
            if !file.is_terminator() {
                line.push_str(&format!(" ({lines} lines)"));
            }
            line
        }
        Block::Snippet(snippet) => match &snippet.language {
            Some(language) => format!("snippet [{language}] ({lines} lines)"),
            None => format!("snippet ({lines} lines)"),
        },
        Block::TerminalLog(log) => format!("terminal-log {} ({lines} lines)", log.path),
    }
}

fn rejected_line(error: &DecodeError) -> String {
    match error {
        DecodeError::Unparseable { kind, source, .. } => format!("rejected {kind}: {source}"),
        DecodeError::Unterminated { kind, .. } => format!("unterminated {kind}"),
    }
}

/// What a decoder produced, with the parts that must not depend on how
/// the input was split.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Collected {
    pub prose: String,
    pub blocks: Vec<Block>,
    pub rejected: usize,
}

impl Collected {
    pub fn extend(&mut self, emissions: Vec<Emission>) {
        for emission in emissions {
            match emission {
                Emission::Prose(text) => self.prose.push_str(&text),
                Emission::Block { block, .. } => self.blocks.push(block),
                Emission::Rejected { .. } => self.rejected += 1,
                Emission::StatusHint { .. } => {}
            }
        }
    }
}

/// Feed `text` to a fresh decoder cut at the given byte offsets (rounded
/// down to character boundaries), then finish.
pub fn decode_split(text: &str, cuts: &[usize]) -> Collected {
    let mut decoder = IncrementalDecoder::new();
    let mut collected = Collected::default();
    let mut start = 0;
    for &cut in cuts {
        let mut cut = cut.min(text.len());
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        if cut <= start {
            continue;
        }
        collected.extend(decoder.feed(&text[start..cut]));
        start = cut;
    }
    collected.extend(decoder.feed(&text[start..]));
    collected.extend(decoder.finish());
    collected
}

/// Feed `text` in fragments of `size` bytes.
pub fn decode_chunked(text: &str, size: usize) -> Collected {
    let cuts: Vec<usize> = (size..text.len()).step_by(size.max(1)).collect();
    decode_split(text, &cuts)
}

/// A synthetic model response: prose between `files` multi-part files of
/// `lines` lines each, plus a snippet.
///
/// # Panics
///
/// Never for the generated content, which holds no delimiter tokens.
pub fn synthetic_response(files: usize, lines: usize) -> String {
    let body: String = (0..lines)
        .map(|n| format!("    value_{n} = compute({n})  # keep going\n"))
        .collect();
    let mut encoder = ContextEncoder::new();
    encoder.split_parts_at(4096).expect("non-zero part limit");
    for idx in 0..files {
        encoder.add_text(&format!("Here is module {idx}, rewritten.\n\n"));
        encoder
            .add_file(&format!("src/module_{idx}.py"), 2, &format!("def run():\n{body}"))
            .expect("generated file encodes");
    }
    encoder
        .add_snippet(Some("bash"), "python -m pytest\n")
        .expect("generated snippet encodes");
    encoder.add_text("That is all.\n");
    encoder.finish()
}

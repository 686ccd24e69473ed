#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use pbp_decoder::{BlockDecoder, PartBuffer};
use pbp_encoder::ContextEncoder;
use pbp_types::{Block, FileIdentity};

#[derive(Debug, Arbitrary)]
enum FuzzBlock {
    File { version: u8, content: String },
    Snippet { bash: bool, content: String },
    TerminalLog { content: String },
}

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    blocks: Vec<FuzzBlock>,
    part_limit: Option<u16>,
}

/// The encoder closes an unterminated last line before the terminator.
fn with_final_newline(content: &str) -> String {
    if content.is_empty() || content.ends_with('\n') {
        content.to_string()
    } else {
        format!("{content}\n")
    }
}

// Fuzz target: encoder output must decode back to what was encoded.
//
// Builds a context from arbitrary file, snippet and terminal-log bodies,
// skipping bodies the encoder refuses (embedded terminators), then
// decodes it and reassembles every file.
// Catches bugs in:
// - Framing newlines added or lost around content
// - Part splitting that drops or duplicates bytes
// - Content that looks like a different block kind's delimiters
fuzz_target!(|input: FuzzInput| {
    let mut encoder = ContextEncoder::new();
    if let Some(limit) = input.part_limit {
        let _ = encoder.split_parts_at(usize::from(limit));
    }

    let mut files = Vec::new();
    let mut others = Vec::new();
    for (idx, block) in input.blocks.iter().enumerate() {
        match block {
            FuzzBlock::File { version, content } => {
                let path = format!("f{idx}.txt");
                let version = u32::from(*version).max(1);
                if encoder.add_file(&path, version, content).is_ok() {
                    files.push((FileIdentity::new(path, version), with_final_newline(content)));
                }
            }
            FuzzBlock::Snippet { bash, content } => {
                let language = bash.then_some("bash");
                if encoder.add_snippet(language, content).is_ok() {
                    others.push(with_final_newline(content));
                }
            }
            FuzzBlock::TerminalLog { content } => {
                if encoder.add_terminal_log("shell", content).is_ok() {
                    others.push(with_final_newline(content));
                }
            }
        }
    }

    let text = encoder.finish();
    let decoded = BlockDecoder::decode(&text);
    assert!(decoded.problems().is_empty());
    assert!(decoded.open.is_none());

    let mut parts = PartBuffer::new();
    let mut assembled = Vec::new();
    let mut decoded_others = Vec::new();
    for (block, _) in decoded.blocks() {
        match block {
            Block::File(file) => {
                parts.add_block(file);
                if let Some(content) = parts.assemble(&file.identity()) {
                    assembled.push((file.identity(), content));
                }
            }
            other => decoded_others.push(other.content().to_string()),
        }
    }
    assert_eq!(assembled, files);
    assert_eq!(decoded_others, others);
});

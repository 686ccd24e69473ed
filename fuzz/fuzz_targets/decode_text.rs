#![no_main]

use libfuzzer_sys::fuzz_target;
use pbp_decoder::{BlockDecoder, PartBuffer};

// Fuzz target: whole-text decoder entry point.
//
// Decodes arbitrary (lossily converted) text and routes every file block
// through part reassembly.
// Catches bugs in:
// - Start token search and partial-token retention
// - Header/content framing (missing metadata end, stray newlines)
// - Byte offsets that land inside multi-byte characters
// - Segment spans that fail to tile the input
fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let decoded = BlockDecoder::decode(&text);

    let mut cursor = 0;
    for segment in &decoded.segments {
        assert_eq!(segment.span().start, cursor);
        cursor = segment.span().end;
    }
    match &decoded.open {
        Some(open) => assert_eq!(open.offset, cursor),
        None => assert_eq!(cursor, text.len()),
    }

    let mut parts = PartBuffer::new();
    for (file, _) in decoded.files() {
        parts.add_block(file);
        let _ = parts.assemble(&file.identity());
    }
});

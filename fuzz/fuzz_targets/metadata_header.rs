#![no_main]

use libfuzzer_sys::fuzz_target;
use pbp_types::{Block, BlockKind};
use pbp_wire::MetadataHeader;

// Fuzz target: metadata header parsing and block typing.
//
// Parses arbitrary header text and types it as every block kind.
// Catches bugs in:
// - Key/value splitting (empty keys, repeated colons, whitespace)
// - Integer fields that overflow or are negative
// - Case handling of the NoMoreParts flag
// - Re-encoding a typed block whose header came from untrusted text
fuzz_target!(|data: &str| {
    let header = MetadataHeader::parse(data);
    for kind in BlockKind::ALL {
        if let Ok(block) = Block::from_header(kind, &header, "") {
            let mut out = String::new();
            let _ = block.encode(&mut out);
        }
    }
});

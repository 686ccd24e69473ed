#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use pbp_decoder::{Emission, IncrementalDecoder};
use pbp_types::Block;

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    text: String,
    cuts: Vec<u16>,
}

#[derive(Debug, Default, PartialEq)]
struct Output {
    prose: String,
    blocks: Vec<Block>,
    rejected: usize,
}

fn collect(out: &mut Output, emissions: Vec<Emission>) {
    for emission in emissions {
        match emission {
            Emission::Prose(text) => out.prose.push_str(&text),
            Emission::Block { block, .. } => out.blocks.push(block),
            Emission::Rejected { .. } => out.rejected += 1,
            Emission::StatusHint { .. } => {}
        }
    }
}

fn decode(text: &str, cuts: &[usize]) -> (Output, Option<usize>) {
    let mut decoder = IncrementalDecoder::new();
    let mut out = Output::default();
    let mut start = 0;
    for &cut in cuts {
        collect(&mut out, decoder.feed(&text[start..cut]));
        start = cut;
    }
    collect(&mut out, decoder.feed(&text[start..]));
    collect(&mut out, decoder.finish());
    let open = decoder.open_block().map(|open| open.offset);
    (out, open)
}

// Fuzz target: fragmentation invariance of the incremental decoder.
//
// Decodes the same text whole and cut at arbitrary character boundaries.
// Catches bugs in:
// - Tokens split across fragments
// - Resumed searches that skip or re-read bytes
// - Prose held back at the end of a fragment
// - Dangling block offsets
fuzz_target!(|input: FuzzInput| {
    let text = input.text.as_str();
    let mut cuts: Vec<usize> = input
        .cuts
        .iter()
        .map(|&c| usize::from(c) % (text.len() + 1))
        .filter(|&c| text.is_char_boundary(c))
        .collect();
    cuts.sort_unstable();
    cuts.dedup();

    let whole = decode(text, &[]);
    let split = decode(text, &cuts);
    assert_eq!(whole, split, "cuts {cuts:?}");
});

use std::ops::Range;

use pbp_types::{Block, FileBlock};

use crate::error::DecodeError;
use crate::incremental::{Emission, IncrementalDecoder, OpenBlock};

/// One piece of a decoded text, with its byte range in the input.
#[derive(Debug)]
pub enum Segment {
    Prose { text: String, span: Range<usize> },
    Block { block: Block, span: Range<usize> },
    Rejected { error: DecodeError, span: Range<usize> },
}

impl Segment {
    pub fn span(&self) -> &Range<usize> {
        match self {
            Self::Prose { span, .. } | Self::Block { span, .. } | Self::Rejected { span, .. } => span,
        }
    }
}

/// The result of decoding a complete text.
///
/// ```text
/// ┌──────────────────────────────────────────────────────────┐
/// │ DecodedText                                              │
/// │   segments: Vec<Segment>   ← prose / blocks, in order    │
/// │   open: Option<OpenBlock>  ← block cut off by the end    │
/// └──────────────────────────────────────────────────────────┘
/// ```
///
/// Segment spans tile the input: each starts where the previous one
/// ended. A dangling block, if any, covers the rest of the input.
#[derive(Debug, Default)]
pub struct DecodedText {
    pub segments: Vec<Segment>,
    pub open: Option<OpenBlock>,
}

impl DecodedText {
    pub fn blocks(&self) -> impl Iterator<Item = (&Block, &Range<usize>)> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Block { block, span } => Some((block, span)),
            _ => None,
        })
    }

    pub fn files(&self) -> impl Iterator<Item = (&FileBlock, &Range<usize>)> {
        self.blocks().filter_map(|(block, span)| match block {
            Block::File(file) => Some((file, span)),
            _ => None,
        })
    }

    /// All prose, concatenated.
    pub fn prose(&self) -> String {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Prose { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Errors of the rejected blocks, in order. The dangling block is
    /// reported separately by [`unterminated`](Self::unterminated).
    pub fn problems(&self) -> Vec<&DecodeError> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Rejected { error, .. } => Some(error),
                _ => None,
            })
            .collect()
    }

    /// The error describing the dangling block, if any.
    pub fn unterminated(&self) -> Option<DecodeError> {
        self.open.as_ref().map(|open| DecodeError::Unterminated {
            kind: open.kind,
            offset: open.offset,
        })
    }
}

/// Whole-text decoder.
///
/// Runs the incremental engine over a complete string. Used where the
/// whole text is already at hand: compaction, the CLI inspection
/// commands and tests.
///
/// # Example
///
/// ```rust
/// use pbp_decoder::BlockDecoder;
///
/// let text = "Intro\n{{{START FILE METADATA}}}\nPath: a.py\n{{{END FILE METADATA}}}\nx = 1\n{{{END OF FILE}}}\n";
/// let decoded = BlockDecoder::decode(text);
/// assert_eq!(decoded.files().count(), 1);
/// assert_eq!(decoded.prose(), "Intro\n\n");
/// ```
pub struct BlockDecoder;

impl BlockDecoder {
    pub fn decode(text: &str) -> DecodedText {
        let mut decoder = IncrementalDecoder::new();
        let mut emissions = decoder.feed(text);
        emissions.extend(decoder.finish());

        let mut decoded = DecodedText::default();
        let mut cursor = 0;
        for emission in emissions {
            match emission {
                Emission::Prose(text) => {
                    let end = cursor + text.len();
                    match decoded.segments.last_mut() {
                        Some(Segment::Prose { text: prev, span }) => {
                            prev.push_str(&text);
                            span.end = end;
                        }
                        _ => decoded.segments.push(Segment::Prose {
                            text,
                            span: cursor..end,
                        }),
                    }
                    cursor = end;
                }
                Emission::Block { block, span } => {
                    cursor = span.end;
                    decoded.segments.push(Segment::Block { block, span });
                }
                Emission::Rejected { error, span, .. } => {
                    cursor = span.end;
                    decoded.segments.push(Segment::Rejected { error, span });
                }
                Emission::StatusHint { .. } => {}
            }
        }
        decoded.open = decoder.open_block();
        decoded
    }
}

#[cfg(test)]
mod tests {
    use pbp_types::BlockKind;

    use super::*;

    #[test]
    fn spans_tile_the_input() {
        let text = "a\n{{{START CODE SNIPPET METADATA}}}\nLanguage: sh\n{{{END CODE SNIPPET METADATA}}}\nls\n{{{END OF CODE SNIPPET}}}\nb\nc";
        let decoded = BlockDecoder::decode(text);
        assert_eq!(decoded.segments.len(), 3);
        let mut cursor = 0;
        for segment in &decoded.segments {
            assert_eq!(segment.span().start, cursor);
            cursor = segment.span().end;
        }
        assert_eq!(cursor, text.len());
        assert_eq!(decoded.prose(), "a\n\nb\nc");
        assert!(decoded.open.is_none());
    }

    #[test]
    fn reports_rejected_and_dangling_blocks() {
        let text = "{{{START FILE METADATA}}}\n{{{END FILE METADATA}}}\n{{{END OF FILE}}}\n\
                    {{{START FILE METADATA}}}\nPath: a.py\n{{{END FILE METADATA}}}\nprint(1)";
        let decoded = BlockDecoder::decode(text);
        assert_eq!(decoded.problems().len(), 1);
        let open = decoded.open.as_ref().unwrap();
        assert_eq!(open.kind, BlockKind::File);
        assert_eq!(open.content, "print(1)");
        assert!(matches!(
            decoded.unterminated(),
            Some(DecodeError::Unterminated { kind: BlockKind::File, .. })
        ));
    }

    #[test]
    fn empty_text_decodes_to_nothing() {
        let decoded = BlockDecoder::decode("");
        assert!(decoded.segments.is_empty());
        assert!(decoded.open.is_none());
    }
}

use std::ops::Range;

use pbp_types::{BlockKind, TypeError};

/// Problems found while decoding model output.
///
/// None of these stop decoding. The incremental decoder reports them
/// alongside the text it keeps producing, and the whole-text decoder
/// collects them for the `validate` command.
///
/// ```text
///   DecodeError
///   ├── Unparseable     ← block delimited correctly but its header is unusable
///   └── Unterminated    ← input ended inside a block
/// ```
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// A complete block whose header could not be turned into a typed
    /// block, e.g. a file block without `Path`.
    #[error("unparseable {kind} block at bytes {}..{}", span.start, span.end)]
    Unparseable {
        kind: BlockKind,
        span: Range<usize>,
        #[source]
        source: TypeError,
    },

    /// The input ended before the block's terminator arrived.
    #[error("{kind} block starting at byte {offset} has no terminator")]
    Unterminated { kind: BlockKind, offset: usize },
}

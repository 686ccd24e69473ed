use std::ops::Range;

use pbp_types::{Block, BlockKind};
use pbp_wire::metadata::{field, MetadataHeader};
use pbp_wire::{frame, scan, token};

use crate::error::DecodeError;

/// Output of [`IncrementalDecoder::feed`], in stream order.
///
/// ```text
///   feed("Sure.\n{{{START FILE METADATA}}}\nPath: a.py\n")
///     → Prose("Sure.\n")
///     → StatusHint { File, Some("a.py") }
///   feed("{{{END FILE METADATA}}}\nx = 1\n{{{END OF FILE}}}\nDone")
///     → Block { File(a.py, part 1), 6..90 }
///   finish()
///     → Prose("\nDone")
/// ```
#[derive(Debug)]
pub enum Emission {
    /// Text outside any block. Safe to render as soon as it arrives.
    Prose(String),

    /// A complete, well-formed block and the byte range it occupied in
    /// the stream, delimiters included.
    Block { block: Block, span: Range<usize> },

    /// A block has started. `label` is the path (or snippet language)
    /// when the header had already arrived; otherwise a second hint
    /// follows once the header is complete.
    StatusHint {
        kind: BlockKind,
        label: Option<String>,
    },

    /// A complete block that could not be typed. Dropped, but reported.
    Rejected {
        kind: BlockKind,
        span: Range<usize>,
        error: DecodeError,
    },
}

/// The block the decoder is currently inside, as far as it has arrived.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpenBlock {
    pub kind: BlockKind,
    /// Stream offset of the block's start token.
    pub offset: usize,
    /// Raw header text. Only complete when `header_closed` is set.
    pub header: String,
    pub header_closed: bool,
    /// Content received so far, without the framing newline after the
    /// metadata end token. May end in a partial line or a partial
    /// terminator token.
    pub content: String,
}

impl OpenBlock {
    pub fn metadata(&self) -> MetadataHeader {
        MetadataHeader::parse(&self.header)
    }
}

#[derive(Clone, Copy, Debug)]
struct OpenState {
    kind: BlockKind,
    offset: usize,
    /// Buffer index of the metadata end token, once seen.
    meta_end: Option<usize>,
    meta_scan: usize,
    term_scan: usize,
    hinted: bool,
    labelled: bool,
}

/// Streaming block decoder.
///
/// Text is appended with [`feed`](Self::feed) in fragments of any size;
/// fragments may split tokens, header lines or multi-byte characters'
/// surrounding text anywhere. The decoder keeps only the unconsumed tail
/// of the stream:
///
/// ```text
///            consumed                 buf
///   ┌────────────────────────┬─────────────────────────┐
///   │ emitted prose / blocks │ open block or last line │
///   └────────────────────────┴─────────────────────────┘
///   0                       base                   position()
/// ```
///
/// Every search resumes where the previous one gave up, minus the
/// token's length, so the work per fragment is proportional to the new
/// text rather than to everything buffered.
///
/// Emissions do not depend on how the stream was split: any split of
/// the same text yields the same blocks, and the concatenated prose is
/// identical.
#[derive(Debug, Default)]
pub struct IncrementalDecoder {
    buf: String,
    base: usize,
    scan: usize,
    open: Option<OpenState>,
}

impl IncrementalDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment and return everything it made decodable.
    pub fn feed(&mut self, fragment: &str) -> Vec<Emission> {
        self.buf.push_str(fragment);
        let mut out = Vec::new();
        while self.step(&mut out) {}
        out
    }

    /// Flush a retained partial prose line. Does nothing while inside a
    /// block; the open block stays available through
    /// [`open_block`](Self::open_block).
    pub fn finish(&mut self) -> Vec<Emission> {
        let mut out = Vec::new();
        if self.open.is_none() && !self.buf.is_empty() {
            let len = self.buf.len();
            out.push(Emission::Prose(self.consume(len)));
            self.scan = 0;
        }
        out
    }

    pub fn is_inside_block(&self) -> bool {
        self.open.is_some()
    }

    /// Total bytes fed since the last reset, counted from the reset
    /// position.
    pub fn position(&self) -> usize {
        self.base + self.buf.len()
    }

    /// The dangling block, if the stream currently ends inside one.
    pub fn open_block(&self) -> Option<OpenBlock> {
        let open = self.open.as_ref()?;
        let delims = open.kind.delimiters();
        let start_len = delims.start.len();
        let block = match open.meta_end {
            Some(pos) => OpenBlock {
                kind: open.kind,
                offset: open.offset,
                header: self.buf[start_len..pos].to_string(),
                header_closed: true,
                content: frame::unframe(&self.buf[pos + delims.metadata_end.len()..]).to_string(),
            },
            None => OpenBlock {
                kind: open.kind,
                offset: open.offset,
                header: self.buf[start_len..].to_string(),
                header_closed: false,
                content: String::new(),
            },
        };
        Some(block)
    }

    /// Remove the dangling block. The stream position rewinds to the
    /// block's start offset.
    pub fn take_open_block(&mut self) -> Option<OpenBlock> {
        let block = self.open_block()?;
        self.open = None;
        self.buf.clear();
        self.base = block.offset;
        self.scan = 0;
        Some(block)
    }

    /// Drop all state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Drop all state and count further input from `position`.
    pub fn reset_at(&mut self, position: usize) {
        self.reset();
        self.base = position;
    }

    fn step(&mut self, out: &mut Vec<Emission>) -> bool {
        if self.open.is_some() {
            self.step_inside(out)
        } else {
            self.step_outside(out)
        }
    }

    fn step_outside(&mut self, out: &mut Vec<Emission>) -> bool {
        let Some((pos, idx)) = scan::find_earliest(&self.buf, self.scan, &token::START_TOKENS) else {
            // Start tokens never contain a newline, so a partial token can
            // only sit on the last line.
            let line_end = scan::last_line_end(&self.buf);
            if line_end > 0 {
                out.push(Emission::Prose(self.consume(line_end)));
            }
            self.scan = scan::resume_offset(&self.buf, 0, token::MAX_START_LEN);
            return false;
        };

        if pos > 0 {
            out.push(Emission::Prose(self.consume(pos)));
        }
        let kind = BlockKind::ALL[idx];
        let start_len = kind.delimiters().start.len();
        tracing::trace!(%kind, offset = self.base, "block opened");
        self.open = Some(OpenState {
            kind,
            offset: self.base,
            meta_end: None,
            meta_scan: start_len,
            term_scan: start_len,
            hinted: false,
            labelled: false,
        });
        self.scan = 0;
        true
    }

    fn step_inside(&mut self, out: &mut Vec<Emission>) -> bool {
        let Some(open) = self.open.as_mut() else {
            return false;
        };
        let kind = open.kind;
        let delims = kind.delimiters();
        let start_len = delims.start.len();

        if open.meta_end.is_none() {
            match scan::find_from(&self.buf, open.meta_scan, delims.metadata_end) {
                Some(pos) => open.meta_end = Some(pos),
                None => {
                    open.meta_scan = scan::resume_offset(&self.buf, open.meta_scan, delims.metadata_end.len());
                }
            }
        }

        let Some(term) = scan::find_from(&self.buf, open.term_scan, delims.terminator) else {
            open.term_scan = scan::resume_offset(&self.buf, open.term_scan, delims.terminator.len());
            if !open.hinted {
                let label = label_of(kind, header_so_far(&self.buf, start_len, open.meta_end));
                open.hinted = true;
                open.labelled = label.is_some();
                out.push(Emission::StatusHint { kind, label });
            } else if !open.labelled && open.meta_end.is_some() {
                let label = label_of(kind, header_so_far(&self.buf, start_len, open.meta_end));
                open.labelled = true;
                out.push(Emission::StatusHint { kind, label });
            }
            return false;
        };

        let hinted = open.hinted;
        let end = term + delims.terminator.len();
        let span = self.base..self.base + end;
        let result = Block::from_body(kind, &self.buf[start_len..term]);
        if !hinted {
            let label = match &result {
                Ok(block) => block.label().map(str::to_string),
                Err(_) => None,
            };
            out.push(Emission::StatusHint { kind, label });
        }

        self.open = None;
        self.consume(end);
        self.scan = 0;

        match result {
            Ok(block) => {
                tracing::debug!(%kind, label = block.label(), start = span.start, end = span.end, "block decoded");
                out.push(Emission::Block { block, span });
            }
            Err(source) => {
                tracing::warn!(%kind, start = span.start, end = span.end, error = %source, "dropping unparseable block");
                out.push(Emission::Rejected {
                    kind,
                    span: span.clone(),
                    error: DecodeError::Unparseable { kind, span, source },
                });
            }
        }
        true
    }

    fn consume(&mut self, len: usize) -> String {
        let taken: String = self.buf.drain(..len).collect();
        self.base += len;
        taken
    }
}

/// Header text usable so far: everything up to the metadata end token
/// when it has arrived, else only the complete lines.
fn header_so_far(buf: &str, start_len: usize, meta_end: Option<usize>) -> &str {
    match meta_end {
        Some(pos) => &buf[start_len..pos],
        None => {
            let rest = &buf[start_len..];
            &rest[..scan::last_line_end(rest)]
        }
    }
}

fn label_of(kind: BlockKind, header: &str) -> Option<String> {
    let header = MetadataHeader::parse(header);
    let label = match kind {
        BlockKind::File => header.text(field::PATH),
        BlockKind::Snippet => header.text(field::LANGUAGE),
        BlockKind::TerminalLog => [field::PATH, field::NAME, field::SESSION]
            .into_iter()
            .find_map(|key| header.text(key)),
    };
    label.map(str::to_string)
}

use pbp_wire::{MetadataHeader, TextFrame};

use crate::error::TypeError;
use crate::file::FileBlock;
use crate::kind::BlockKind;
use crate::snippet::SnippetBlock;
use crate::terminal_log::TerminalLogBlock;

/// A decoded block.
///
/// Blocks are immutable once produced. The decoder hands them to the
/// caller, which routes file parts into reassembly and renders snippets
/// and terminal logs directly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Block {
    File(FileBlock),
    Snippet(SnippetBlock),
    TerminalLog(TerminalLogBlock),
}

impl Block {
    /// Build a typed block from a parsed header and framed content.
    ///
    /// # Errors
    ///
    /// [`TypeError::MissingRequiredField`] for a file header without a
    /// `Path`. Snippet and terminal-log headers always succeed.
    pub fn from_header(kind: BlockKind, header: &MetadataHeader, content: &str) -> Result<Self, TypeError> {
        Ok(match kind {
            BlockKind::File => Self::File(FileBlock::from_header(header, content)?),
            BlockKind::Snippet => Self::Snippet(SnippetBlock::from_header(header, content)),
            BlockKind::TerminalLog => {
                Self::TerminalLog(TerminalLogBlock::from_header(header, content))
            }
        })
    }

    /// Decode the text between a start token and its terminator.
    ///
    /// # Errors
    ///
    /// Same as [`Block::from_header`].
    pub fn from_body(kind: BlockKind, body: &str) -> Result<Self, TypeError> {
        let frame = TextFrame::split(body, kind.delimiters());
        let header = MetadataHeader::parse(frame.header);
        Self::from_header(kind, &header, frame.content)
    }

    pub fn kind(&self) -> BlockKind {
        match self {
            Self::File(_) => BlockKind::File,
            Self::Snippet(_) => BlockKind::Snippet,
            Self::TerminalLog(_) => BlockKind::TerminalLog,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Self::File(b) => &b.content,
            Self::Snippet(b) => &b.content,
            Self::TerminalLog(b) => &b.content,
        }
    }

    /// Short human label: the path for files and logs, the language for
    /// snippets.
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::File(b) => Some(&b.path),
            Self::Snippet(b) => b.language.as_deref(),
            Self::TerminalLog(b) => Some(&b.path),
        }
    }

    /// Append the wire form of this block to `out`.
    ///
    /// # Errors
    ///
    /// Whatever the variant's own `encode` reports.
    pub fn encode(&self, out: &mut String) -> Result<(), TypeError> {
        match self {
            Self::File(b) => b.encode(out),
            Self::Snippet(b) => b.encode(out),
            Self::TerminalLog(b) => b.encode(out),
        }
    }
}

impl From<FileBlock> for Block {
    fn from(block: FileBlock) -> Self {
        Self::File(block)
    }
}

impl From<SnippetBlock> for Block {
    fn from(block: SnippetBlock) -> Self {
        Self::Snippet(block)
    }
}

impl From<TerminalLogBlock> for Block {
    fn from(block: TerminalLogBlock) -> Self {
        Self::TerminalLog(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_body_of_each_kind() {
        let file = Block::from_body(
            BlockKind::File,
            "\nPath: a.py\nVersion: 2\n{{{END FILE METADATA}}}\nprint(1)\n",
        )
        .unwrap();
        assert_eq!(file.kind(), BlockKind::File);
        assert_eq!(file.content(), "print(1)\n");
        assert_eq!(file.label(), Some("a.py"));

        let snippet = Block::from_body(
            BlockKind::Snippet,
            "\nLanguage: rust\n{{{END CODE SNIPPET METADATA}}}\nlet x = 1;\n",
        )
        .unwrap();
        assert_eq!(snippet.label(), Some("rust"));

        let log = Block::from_body(
            BlockKind::TerminalLog,
            "\nName: build\n{{{END TERMINAL METADATA}}}\n$ make\n",
        )
        .unwrap();
        assert_eq!(log, Block::TerminalLog(TerminalLogBlock::new("build", "$ make\n")));
    }

    #[test]
    fn terminator_before_metadata_end_is_header_only() {
        let block = Block::from_body(BlockKind::File, "\nPath: a.py\nNoMoreParts: True\n").unwrap();
        let Block::File(file) = block else {
            panic!("expected a file block");
        };
        assert!(file.is_terminator());
        assert_eq!(file.content, "");
    }

    #[test]
    fn encode_then_decode_body() {
        let block: Block = FileBlock::part("src/lib.rs", 3, 2, "pub fn f() {}\n").into();
        let mut out = String::new();
        block.encode(&mut out).unwrap();
        let delims = BlockKind::File.delimiters();
        let body = &out[delims.start.len()..out.rfind(delims.terminator).unwrap()];
        assert_eq!(Block::from_body(BlockKind::File, body).unwrap(), block);
    }
}

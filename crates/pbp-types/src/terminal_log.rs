use pbp_wire::metadata::{field, MetadataHeader};
use pbp_wire::TextFrame;

use crate::error::TypeError;
use crate::kind::BlockKind;

/// Fallback label for logs whose header names nothing.
pub const DEFAULT_PATH: &str = "terminal";

/// Captured terminal output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TerminalLogBlock {
    pub path: String,
    pub content: String,
}

impl TerminalLogBlock {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    /// The path comes from `Path`, then `Name`, then `Session`, then
    /// [`DEFAULT_PATH`].
    pub fn from_header(header: &MetadataHeader, content: &str) -> Self {
        let path = [field::PATH, field::NAME, field::SESSION]
            .into_iter()
            .find_map(|key| header.text(key))
            .unwrap_or(DEFAULT_PATH);
        Self::new(path, content)
    }

    /// Append the wire form of this block to `out`, labelled with `Name`.
    ///
    /// # Errors
    ///
    /// [`TypeError::ReservedTokenInContent`] when the content holds the
    /// terminal-log terminator.
    pub fn encode(&self, out: &mut String) -> Result<(), TypeError> {
        let delims = BlockKind::TerminalLog.delimiters();
        if self.content.contains(delims.terminator) {
            return Err(TypeError::ReservedTokenInContent {
                kind: BlockKind::TerminalLog,
            });
        }
        let mut header = MetadataHeader::new();
        header.push(field::NAME, self.path.as_str())?;
        TextFrame::write(out, delims, &header, &self.content);
        Ok(())
    }
}

use pbp_wire::metadata::{field, MetadataHeader};
use pbp_wire::TextFrame;

use crate::error::TypeError;
use crate::kind::BlockKind;

/// A standalone code snippet. Never written to disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnippetBlock {
    pub language: Option<String>,
    pub content: String,
}

impl SnippetBlock {
    pub fn new(language: Option<String>, content: impl Into<String>) -> Self {
        Self {
            language,
            content: content.into(),
        }
    }

    pub fn from_header(header: &MetadataHeader, content: &str) -> Self {
        Self {
            language: header.text(field::LANGUAGE).map(str::to_string),
            content: content.to_string(),
        }
    }

    /// Append the wire form of this block to `out`.
    ///
    /// # Errors
    ///
    /// [`TypeError::ReservedTokenInContent`] when the content holds the
    /// snippet terminator.
    pub fn encode(&self, out: &mut String) -> Result<(), TypeError> {
        let delims = BlockKind::Snippet.delimiters();
        if self.content.contains(delims.terminator) {
            return Err(TypeError::ReservedTokenInContent {
                kind: BlockKind::Snippet,
            });
        }
        let mut header = MetadataHeader::new();
        if let Some(language) = &self.language {
            header.push(field::LANGUAGE, language.as_str())?;
        }
        TextFrame::write(out, delims, &header, &self.content);
        Ok(())
    }
}

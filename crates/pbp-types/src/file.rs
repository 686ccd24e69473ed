use pbp_wire::metadata::{field, MetadataHeader};
use pbp_wire::TextFrame;

use crate::error::TypeError;
use crate::identity::FileIdentity;
use crate::kind::BlockKind;

/// One part of a file transfer, or the terminator closing it.
///
/// ```text
/// ┌───────────────┬─────────────────────────────────────────────┐
/// │ Field         │ Decoding rule                               │
/// ├───────────────┼─────────────────────────────────────────────┤
/// │ path          │ `Path`, required                            │
/// │ language      │ `Language`, optional hint                   │
/// │ version       │ `Version`, default 1, 0 raised to 1         │
/// │ part          │ `Part`, default 1, forced to 0 when         │
/// │               │ `NoMoreParts` is present at all             │
/// │ no_more_parts │ `NoMoreParts`, case-insensitive, default    │
/// │               │ false                                       │
/// │ content       │ framed body, empty for terminators          │
/// └───────────────┴─────────────────────────────────────────────┘
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileBlock {
    pub path: String,
    pub language: Option<String>,
    pub version: u32,
    pub part: u32,
    pub no_more_parts: bool,
    pub content: String,
}

impl FileBlock {
    /// A content part.
    pub fn part(path: impl Into<String>, version: u32, part: u32, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            language: None,
            version,
            part,
            no_more_parts: false,
            content: content.into(),
        }
    }

    /// The terminator block announcing that every part has been sent.
    pub fn terminator(path: impl Into<String>, version: u32) -> Self {
        Self {
            path: path.into(),
            language: None,
            version,
            part: 0,
            no_more_parts: true,
            content: String::new(),
        }
    }

    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Build a block from a parsed header and its framed content.
    ///
    /// # Errors
    ///
    /// [`TypeError::MissingRequiredField`] when the header has no usable
    /// `Path`.
    pub fn from_header(header: &MetadataHeader, content: &str) -> Result<Self, TypeError> {
        let path = header
            .text(field::PATH)
            .ok_or(TypeError::MissingRequiredField {
                kind: BlockKind::File,
                field: field::PATH,
            })?;

        let mut version = header.int_or(field::VERSION, 1);
        if version == 0 {
            tracing::debug!(path, "file version 0 raised to 1");
            version = 1;
        }

        let (part, no_more_parts) = match header.flag(field::NO_MORE_PARTS) {
            Some(flag) => (0, flag),
            None => (header.int_or(field::PART, 1), false),
        };

        Ok(Self {
            path: path.to_string(),
            language: header.text(field::LANGUAGE).map(str::to_string),
            version,
            part,
            no_more_parts,
            content: content.to_string(),
        })
    }

    pub fn identity(&self) -> FileIdentity {
        FileIdentity::new(self.path.clone(), self.version)
    }

    /// Whether this block closes its transfer.
    pub fn is_terminator(&self) -> bool {
        self.no_more_parts
    }

    /// The header this block would be written with.
    ///
    /// # Errors
    ///
    /// Propagates [`pbp_wire::WireError`] for paths or language hints that
    /// span lines or embed a delimiter.
    pub fn header(&self) -> Result<MetadataHeader, TypeError> {
        let mut header = MetadataHeader::new();
        header.push(field::PATH, self.path.as_str())?;
        if let Some(language) = &self.language {
            header.push(field::LANGUAGE, language.as_str())?;
        }
        header.push(field::VERSION, self.version.to_string())?;
        if self.no_more_parts {
            header.push(field::NO_MORE_PARTS, "True")?;
        } else {
            header.push(field::PART, self.part.to_string())?;
        }
        Ok(header)
    }

    /// Append the wire form of this block to `out`.
    ///
    /// # Errors
    ///
    /// [`TypeError::ReservedTokenInContent`] when the content holds the
    /// file terminator, or a header error from [`FileBlock::header`].
    pub fn encode(&self, out: &mut String) -> Result<(), TypeError> {
        let delims = BlockKind::File.delimiters();
        if self.content.contains(delims.terminator) {
            return Err(TypeError::ReservedTokenInContent {
                kind: BlockKind::File,
            });
        }
        let header = self.header()?;
        TextFrame::write(out, delims, &header, &self.content);
        Ok(())
    }
}

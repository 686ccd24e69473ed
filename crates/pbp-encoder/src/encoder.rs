use pbp_types::{Block, FileBlock, Lang, SnippetBlock, TerminalLogBlock};
use pbp_wire::token;

use crate::error::EncodeError;

/// Builds the textual context sent to the model.
///
/// Methods append blocks in call order. A file is always written as its
/// content part(s) followed by a terminator block, the same shape the
/// model is asked to answer in:
///
/// ```text
/// {{{START FILE METADATA}}}
/// Path: src/main.rs
/// Language: rust
/// Version: 1
/// Part: 1
/// {{{END FILE METADATA}}}
/// fn main() {}
/// {{{END OF FILE}}}
/// {{{START FILE METADATA}}}
/// Path: src/main.rs
/// Language: rust
/// Version: 1
/// NoMoreParts: True
/// {{{END FILE METADATA}}}
/// {{{END OF FILE}}}
/// ```
///
/// A failed `add_*` call leaves the output untouched.
///
/// # Usage
///
/// ```rust
/// use pbp_encoder::ContextEncoder;
///
/// let mut encoder = ContextEncoder::new();
/// encoder
///     .add_file("src/main.rs", 1, "fn main() {}\n")
///     .unwrap()
///     .add_snippet(Some("bash"), "cargo run")
///     .unwrap();
/// let text = encoder.finish();
/// assert!(text.starts_with("{{{START FILE METADATA}}}"));
/// ```
#[derive(Clone, Debug, Default)]
pub struct ContextEncoder {
    out: String,
    part_limit: Option<usize>,
}

impl ContextEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Split file content into parts of at most `max_bytes`, breaking only
    /// between lines. A single line longer than the limit becomes a part
    /// of its own.
    ///
    /// # Errors
    ///
    /// [`EncodeError::ZeroPartLimit`] for a zero limit.
    pub fn split_parts_at(&mut self, max_bytes: usize) -> Result<&mut Self, EncodeError> {
        if max_bytes == 0 {
            return Err(EncodeError::ZeroPartLimit);
        }
        self.part_limit = Some(max_bytes);
        Ok(self)
    }

    /// Append a whole file at `version`, with its language inferred from
    /// the path (or a shebang for extensionless paths).
    ///
    /// # Errors
    ///
    /// [`EncodeError::Type`] when the content contains the file
    /// terminator or the path cannot be written as a header value.
    pub fn add_file(&mut self, path: &str, version: u32, content: &str) -> Result<&mut Self, EncodeError> {
        let language = Lang::infer(path, content.lines().next()).as_str();
        let parts = match self.part_limit {
            Some(limit) => split_lines(content, limit),
            None => vec![content],
        };

        let mut out = String::new();
        for (idx, part) in parts.into_iter().enumerate() {
            let number = u32::try_from(idx + 1).unwrap_or(u32::MAX);
            FileBlock::part(path, version, number, part)
                .with_language(language)
                .encode(&mut out)?;
        }
        FileBlock::terminator(path, version)
            .with_language(language)
            .encode(&mut out)?;

        tracing::debug!(path, version, bytes = content.len(), "file added to context");
        self.out.push_str(&out);
        Ok(self)
    }

    /// # Errors
    ///
    /// [`EncodeError::Type`] when the content contains the snippet
    /// terminator.
    pub fn add_snippet(&mut self, language: Option<&str>, content: &str) -> Result<&mut Self, EncodeError> {
        self.add_block(&SnippetBlock::new(language.map(str::to_string), content).into())
    }

    /// # Errors
    ///
    /// [`EncodeError::Type`] when the content contains the terminal-log
    /// terminator.
    pub fn add_terminal_log(&mut self, name: &str, content: &str) -> Result<&mut Self, EncodeError> {
        self.add_block(&TerminalLogBlock::new(name, content).into())
    }

    /// Append any block as-is.
    ///
    /// # Errors
    ///
    /// Whatever [`Block::encode`] reports.
    pub fn add_block(&mut self, block: &Block) -> Result<&mut Self, EncodeError> {
        let mut out = String::new();
        block.encode(&mut out)?;
        self.out.push_str(&out);
        Ok(self)
    }

    /// Append free text verbatim.
    pub fn add_text(&mut self, text: &str) -> &mut Self {
        self.out.push_str(text);
        self
    }

    /// Append the marker separating project context from conversation.
    pub fn begin_conversation(&mut self) -> &mut Self {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
        self.out.push_str(token::CONVERSATION_START);
        self.out.push('\n');
        self
    }

    pub fn as_str(&self) -> &str {
        &self.out
    }

    pub fn finish(self) -> String {
        self.out
    }
}

/// Split `content` into chunks of at most `limit` bytes at line
/// boundaries. Concatenating the chunks gives back `content`.
fn split_lines(content: &str, limit: usize) -> Vec<&str> {
    if content.is_empty() {
        return vec![content];
    }
    let mut parts = Vec::new();
    let mut start = 0;
    let mut end = 0;
    for line in content.split_inclusive('\n') {
        if end > start && end - start + line.len() > limit {
            parts.push(&content[start..end]);
            start = end;
        }
        end += line.len();
    }
    parts.push(&content[start..end]);
    parts
}

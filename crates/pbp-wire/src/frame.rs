use crate::metadata::MetadataHeader;
use crate::token::Delimiters;

/// The two halves of a block once its start and terminator tokens have
/// been located.
///
/// ```text
/// {{{START FILE METADATA}}}      ← start (not part of the frame)
/// Path: a.py                     ┐
/// Version: 1                     ┘ header
/// {{{END FILE METADATA}}}
/// print(1)                       ← content
/// {{{END OF FILE}}}              ← terminator (not part of the frame)
/// ```
///
/// One `\n` directly after the metadata end token belongs to the framing.
/// Everything after it up to the terminator is content, including the
/// newline that ends its last line, so consecutive parts of a file join
/// without losing line breaks. A body with no metadata end token at all
/// is treated as header-only with empty content.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextFrame<'a> {
    pub header: &'a str,
    pub content: &'a str,
    /// `false` when the metadata end token was missing.
    pub header_closed: bool,
}

impl<'a> TextFrame<'a> {
    /// Split the text found strictly between a start token and its
    /// terminator.
    pub fn split(body: &'a str, delims: &Delimiters) -> Self {
        match body.find(delims.metadata_end) {
            Some(pos) => Self {
                header: &body[..pos],
                content: unframe(&body[pos + delims.metadata_end.len()..]),
                header_closed: true,
            },
            None => Self {
                header: body,
                content: "",
                header_closed: false,
            },
        }
    }

    /// Serialize a complete block, including a trailing newline after the
    /// terminator. A `\n` is added before the terminator only when
    /// non-empty content does not already end with one.
    ///
    /// The caller is responsible for making sure `content` does not contain
    /// `delims.terminator`.
    pub fn write(out: &mut String, delims: &Delimiters, header: &MetadataHeader, content: &str) {
        out.push_str(delims.start);
        out.push('\n');
        header.write_to(out);
        out.push_str(delims.metadata_end);
        out.push('\n');
        if !content.is_empty() {
            out.push_str(content);
            if !content.ends_with('\n') {
                out.push('\n');
            }
        }
        out.push_str(delims.terminator);
        out.push('\n');
    }
}

/// Text following a metadata end token, with the leading framing newline
/// removed. Also used for a block whose terminator has not arrived yet.
pub fn unframe(raw: &str) -> &str {
    raw.strip_prefix('\n').unwrap_or(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::FILE;

    fn body_of(block: &str) -> &str {
        let start = block.find(FILE.start).unwrap() + FILE.start.len();
        let end = block.rfind(FILE.terminator).unwrap();
        &block[start..end]
    }

    #[test]
    fn split_strips_only_the_newline_after_metadata() {
        let frame = TextFrame::split("\nPath: a\n{{{END FILE METADATA}}}\nx\ny\n", &FILE);
        assert_eq!(frame.header, "\nPath: a\n");
        assert_eq!(frame.content, "x\ny\n");
        assert!(frame.header_closed);
    }

    #[test]
    fn content_without_final_newline_is_kept_as_is() {
        let frame = TextFrame::split("\nPath: a\n{{{END FILE METADATA}}}\nx", &FILE);
        assert_eq!(frame.content, "x");
    }

    #[test]
    fn split_without_metadata_end_is_header_only() {
        let frame = TextFrame::split("\nPath: a\nNoMoreParts: True\n", &FILE);
        assert_eq!(frame.content, "");
        assert!(!frame.header_closed);
    }

    #[test]
    fn write_produces_parseable_block() {
        let mut header = MetadataHeader::new();
        header.push("Path", "a.py").unwrap();
        let mut out = String::new();
        TextFrame::write(&mut out, &FILE, &header, "print(1)\n");
        assert_eq!(
            out,
            "{{{START FILE METADATA}}}\nPath: a.py\n{{{END FILE METADATA}}}\nprint(1)\n{{{END OF FILE}}}\n"
        );
        let frame = TextFrame::split(body_of(&out), &FILE);
        assert_eq!(frame.content, "print(1)\n");
        assert_eq!(MetadataHeader::parse(frame.header), header);
    }

    #[test]
    fn write_closes_an_unterminated_last_line() {
        let mut out = String::new();
        TextFrame::write(&mut out, &FILE, &MetadataHeader::new(), "x = 1");
        assert_eq!(
            out,
            "{{{START FILE METADATA}}}\n{{{END FILE METADATA}}}\nx = 1\n{{{END OF FILE}}}\n"
        );
        assert_eq!(TextFrame::split(body_of(&out), &FILE).content, "x = 1\n");
    }

    #[test]
    fn empty_content_writes_no_body_line() {
        let mut out = String::new();
        TextFrame::write(&mut out, &FILE, &MetadataHeader::new(), "");
        assert_eq!(
            out,
            "{{{START FILE METADATA}}}\n{{{END FILE METADATA}}}\n{{{END OF FILE}}}\n"
        );
        assert_eq!(TextFrame::split(body_of(&out), &FILE).content, "");
    }
}

use std::collections::BTreeMap;

use pbp_decoder::BlockDecoder;
use pbp_wire::token::CONVERSATION_START;

/// Drop superseded file versions from a conversation.
///
/// Every file block after the conversation start marker whose version is
/// lower than the newest version of the same path is removed, parts and
/// terminator alike, together with one newline directly after it.
/// Everything before the marker is kept as is; without a marker the
/// whole text counts as conversation.
///
/// ```text
///   preamble ─ a.py v1 ─┐            preamble ─ a.py v1
///   {{{CONVERSATION...}}}│  compact   {{{CONVERSATION...}}}
///   a.py v1 (part, end)  │ ───────▶   a.py v2 (part, end)
///   a.py v2 (part, end) ─┘
/// ```
pub fn compact(context: &str) -> String {
    let start = context
        .find(CONVERSATION_START)
        .map_or(0, |pos| pos + CONVERSATION_START.len());
    let (head, conversation) = context.split_at(start);

    let decoded = BlockDecoder::decode(conversation);
    let mut latest: BTreeMap<&str, u32> = BTreeMap::new();
    for (file, _) in decoded.files() {
        let newest = latest.entry(file.path.as_str()).or_insert(file.version);
        *newest = (*newest).max(file.version);
    }

    let mut out = String::with_capacity(context.len());
    out.push_str(head);
    let mut cursor = 0;
    let mut removed = 0usize;
    for (file, span) in decoded.files() {
        if latest.get(file.path.as_str()).is_some_and(|&newest| file.version < newest) {
            out.push_str(&conversation[cursor..span.start]);
            cursor = span.end;
            if conversation[cursor..].starts_with('\n') {
                cursor += 1;
            }
            removed += 1;
        }
    }
    out.push_str(&conversation[cursor..]);

    tracing::info!(removed, before = context.len(), after = out.len(), "context compacted");
    out
}

#[cfg(test)]
mod tests {
    use pbp_encoder::ContextEncoder;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn removes_older_versions_after_the_marker() {
        let mut encoder = ContextEncoder::new();
        encoder.add_text("Files:\n");
        encoder.add_file("a.py", 1, "old = True\n").unwrap();
        encoder.begin_conversation();
        encoder.add_text("**user:**\n\nchange it\n");
        encoder.add_file("a.py", 1, "old = True\n").unwrap();
        encoder.add_text("**partner:**\n\ndone\n");
        encoder.add_file("a.py", 2, "old = False\n").unwrap();
        let context = encoder.finish();

        let compacted = compact(&context);
        insta::assert_snapshot!(compacted, @r"
        Files:
        {{{START FILE METADATA}}}
        Path: a.py
        Language: python
        Version: 1
        Part: 1
        {{{END FILE METADATA}}}
        old = True
        {{{END OF FILE}}}
        {{{START FILE METADATA}}}
        Path: a.py
        Language: python
        Version: 1
        NoMoreParts: True
        {{{END FILE METADATA}}}
        {{{END OF FILE}}}
        {{{CONVERSATION_HISTORY START}}}
        **user:**

        change it
        **partner:**

        done
        {{{START FILE METADATA}}}
        Path: a.py
        Language: python
        Version: 2
        Part: 1
        {{{END FILE METADATA}}}
        old = False
        {{{END OF FILE}}}
        {{{START FILE METADATA}}}
        Path: a.py
        Language: python
        Version: 2
        NoMoreParts: True
        {{{END FILE METADATA}}}
        {{{END OF FILE}}}
        ");
    }

    #[test]
    fn keeps_latest_of_each_path_and_other_blocks() {
        let mut encoder = ContextEncoder::new();
        encoder.begin_conversation();
        encoder.add_file("a.py", 3, "a3\n").unwrap();
        encoder.add_file("b.py", 1, "b1\n").unwrap();
        encoder.add_snippet(Some("bash"), "python a.py").unwrap();
        encoder.add_file("a.py", 4, "a4\n").unwrap();
        let compacted = compact(&encoder.finish());

        let decoded = BlockDecoder::decode(&compacted);
        let kept: Vec<(String, u32)> = decoded
            .files()
            .map(|(f, _)| (f.path.clone(), f.version))
            .collect();
        assert_eq!(
            kept,
            vec![
                ("b.py".to_string(), 1),
                ("b.py".to_string(), 1),
                ("a.py".to_string(), 4),
                ("a.py".to_string(), 4),
            ]
        );
        assert!(compacted.contains("python a.py"));
    }

    #[test]
    fn without_marker_everything_is_conversation() {
        let mut encoder = ContextEncoder::new();
        encoder.add_file("x.rs", 1, "v1\n").unwrap();
        encoder.add_file("x.rs", 2, "v2\n").unwrap();
        let compacted = compact(&encoder.finish());
        assert!(!compacted.contains("v1"));
        assert!(compacted.contains("v2"));
    }

    #[test]
    fn nothing_to_remove_is_identity() {
        let text = "intro\n{{{CONVERSATION_HISTORY START}}}\n**user:**\n\nhi\n";
        assert_eq!(compact(text), text);
    }
}

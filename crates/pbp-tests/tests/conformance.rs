//! Conformance tests: golden responses decoded and summarised to insta
//! snapshots.
//!
//! Each fixture under `tests/golden/` is a model response (or a saved
//! conversation) exactly as it would arrive on the wire. The tests decode
//! it with [`BlockDecoder`], reassemble files with [`PartBuffer`] and
//! render them the way the console does. A snapshot diff signals either
//! a deliberate format change (accept via `cargo insta review`) or a
//! regression.

use pbp_decoder::{BlockDecoder, PartBuffer};
use pbp_driver::render_markdown::MarkdownRenderer;
use pbp_driver::{present, DriverConfig, MemoryStorage};
use pbp_session::compact;
use pbp_tests::{golden, outline};
use pbp_types::FileIdentity;
use pbp_wire::token::CONVERSATION_START;
use insta::assert_snapshot;
use pretty_assertions::assert_eq;

fn assemble_all(text: &str) -> (Vec<(FileIdentity, String)>, Vec<FileIdentity>) {
    let decoded = BlockDecoder::decode(text);
    let mut parts = PartBuffer::new();
    let mut done = Vec::new();
    for (file, _) in decoded.files() {
        parts.add_block(file);
        if file.is_terminator() {
            let identity = file.identity();
            if let Some(content) = parts.assemble(&identity) {
                done.push((identity, content));
            }
        }
    }
    (done, parts.pending())
}

// ── Complete responses ────────────────────────────────────────────────────────

#[test]
fn single_file_outline() {
    let decoded = BlockDecoder::decode(&golden("single_file.txt"));
    assert_snapshot!(outline(&decoded), @r#"
    prose "Adding a greeting module."
    file src/greet.py v1 part 1 [python] (2 lines)
    file src/greet.py v1 part 2 [python] (2 lines)
    file src/greet.py v1 end [python]
    prose "Run it with:"
    snippet [bash] (1 lines)
    "#);
    assert!(decoded.problems().is_empty());
    assert!(decoded.unterminated().is_none());
}

#[test]
fn single_file_reassembles_in_part_order() {
    let (files, pending) = assemble_all(&golden("single_file.txt"));
    assert!(pending.is_empty());
    assert_eq!(files.len(), 1);
    let (identity, content) = &files[0];
    assert_eq!(identity, &FileIdentity::new("src/greet.py", 1));
    assert_eq!(
        content,
        "def greet(name):\n    return f\"hello {name}\"\nif __name__ == \"__main__\":\n    print(greet(\"world\"))\n"
    );
}

#[test]
fn new_file_is_rendered_in_full() {
    let (files, _) = assemble_all(&golden("single_file.txt"));
    let (identity, content) = &files[0];
    let shown = present(&identity.path, content, &MemoryStorage::new(), &DriverConfig::default());
    assert!(!shown.is_diff);
    assert_snapshot!(MarkdownRenderer::render_file(&identity.to_string(), &shown), @r#"
    #### src/greet.py (v1)

    ```python
    def greet(name):
        return f"hello {name}"
    if __name__ == "__main__":
        print(greet("world"))
    ```
    "#);
}

#[test]
fn multi_file_outline() {
    let decoded = BlockDecoder::decode(&golden("multi_file.txt"));
    assert_snapshot!(outline(&decoded), @r#"
    prose "Updating both files."
    file app.py v2 part 1 (1 lines)
    file notes.md v1 part 1 (1 lines)
    file app.py v2 end
    file notes.md v1 end
    prose "The test run:"
    terminal-log pytest (1 lines)
    "#);
}

#[test]
fn interleaved_files_complete_independently() {
    let (files, pending) = assemble_all(&golden("multi_file.txt"));
    assert!(pending.is_empty());
    assert_eq!(
        files,
        vec![
            (FileIdentity::new("app.py", 2), "print(\"v2\")\n".to_string()),
            (FileIdentity::new("notes.md", 1), "# Notes\n".to_string()),
        ]
    );
}

#[test]
fn existing_file_is_shown_as_diff() {
    let (files, _) = assemble_all(&golden("multi_file.txt"));
    let storage = MemoryStorage::new().with_file("app.py", "print(\"v1\")\n");
    let config = DriverConfig::default();

    let (identity, content) = &files[0];
    let shown = present(&identity.path, content, &storage, &config);
    assert!(shown.is_diff);
    assert_eq!(shown.language, "diff");
    assert!(shown.body.starts_with("--- app.py (disk)\n+++ app.py (context)\n"));
    assert!(shown.body.contains("-print(\"v1\")\n"));
    assert!(shown.body.contains("+print(\"v2\")\n"));

    // Not on disk: shown whole.
    let (identity, content) = &files[1];
    let shown = present(&identity.path, content, &storage, &config);
    assert!(!shown.is_diff);
    assert_eq!(shown.body, "# Notes\n");
}

// ── Damaged responses ─────────────────────────────────────────────────────────

#[test]
fn truncated_outline() {
    let decoded = BlockDecoder::decode(&golden("truncated.txt"));
    assert_snapshot!(outline(&decoded), @r#"
    prose "Here is the module."
    open file, header complete (5 lines so far)
    "#);
    let open = decoded.open.as_ref().unwrap();
    assert_eq!(open.offset, "Here is the module.\n".len());
    assert!(open.content.ends_with("    return a -"));
    assert!(decoded.unterminated().is_some());
}

#[test]
fn malformed_blocks_are_skipped_or_normalised() {
    let decoded = BlockDecoder::decode(&golden("malformed.txt"));
    assert_snapshot!(outline(&decoded), @r#"
    prose "Three odd blocks follow."
    rejected file: file block is missing required field Path
    file ok.py v1 part 1 (1 lines)
    file ok.py v1 part 0 (0 lines)
    "#);
    assert_eq!(decoded.problems().len(), 1);
}

#[test]
fn false_sentinel_never_completes_the_file() {
    let (files, pending) = assemble_all(&golden("malformed.txt"));
    assert!(files.is_empty());
    assert_eq!(pending, vec![FileIdentity::new("ok.py", 1)]);
}

// ── Conversations ─────────────────────────────────────────────────────────────

#[test]
fn compaction_keeps_preamble_and_latest_version() {
    let conversation = golden("conversation.txt");
    let compacted = compact(&conversation);

    let marker = conversation.find(CONVERSATION_START).unwrap();
    assert_eq!(&compacted[..marker], &conversation[..marker]);

    let tail = compacted[marker + CONVERSATION_START.len()..].trim_start();
    assert_snapshot!(tail, @r#"
    **user:**

    make it print v2 @app.py

    **partner:**

    Done.
    {{{START FILE METADATA}}}
    Path: app.py
    Version: 2
    Part: 1
    {{{END FILE METADATA}}}
    print("v2")
    {{{END OF FILE}}}
    {{{START FILE METADATA}}}
    Path: app.py
    Version: 2
    NoMoreParts: True
    {{{END FILE METADATA}}}
    {{{END OF FILE}}}
    "#);
    assert_eq!(compact(&compacted), compacted);
}

#[test]
fn recap_shows_conversation_only() {
    let recap = MarkdownRenderer::recap(&golden("conversation.txt"));
    assert!(!recap.contains("You are a pair programmer."));
    assert!(recap.contains("**partner:**"));
    assert!(recap.contains("print(\"v2\")"));
    assert!(!recap.contains("NoMoreParts"));
}

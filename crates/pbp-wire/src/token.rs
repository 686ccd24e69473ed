/// Delimiter vocabulary for the textual block grammar.
///
/// Every block on the wire has the same three-token shape:
///
/// ```text
/// ┌──────────────────────────────────────────────┐
/// │ start token          {{{START FILE METADATA}}} │
/// │ Key: Value lines     Path: src/main.rs         │
/// │ metadata end token   {{{END FILE METADATA}}}   │
/// │ content (optional)   fn main() {}              │
/// │ terminator token     {{{END OF FILE}}}         │
/// └──────────────────────────────────────────────┘
/// ```
///
/// All tokens are pure ASCII, so any byte offset returned by a token
/// search is also a valid `char` boundary in the surrounding text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Delimiters {
    pub start: &'static str,
    pub metadata_end: &'static str,
    pub terminator: &'static str,
}

pub const FILE_METADATA_START: &str = "{{{START FILE METADATA}}}";
pub const FILE_METADATA_END: &str = "{{{END FILE METADATA}}}";
pub const END_OF_FILE: &str = "{{{END OF FILE}}}";

pub const SNIPPET_METADATA_START: &str = "{{{START CODE SNIPPET METADATA}}}";
pub const SNIPPET_METADATA_END: &str = "{{{END CODE SNIPPET METADATA}}}";
pub const END_OF_SNIPPET: &str = "{{{END OF CODE SNIPPET}}}";

pub const TERMINAL_METADATA_START: &str = "{{{START TERMINAL METADATA}}}";
pub const TERMINAL_METADATA_END: &str = "{{{END TERMINAL METADATA}}}";
pub const END_OF_TERMINAL_LOG: &str = "{{{END OF TERMINAL LOG}}}";

/// Marks the end of the preamble and the start of the conversation.
/// Everything before it is project context and is never compacted.
pub const CONVERSATION_START: &str = "{{{CONVERSATION_HISTORY START}}}";

/// Appended after the conversation on every request.
pub const CONVERSATION_END: &str = "{{{CONVERSATION_HISTORY END}}}";

/// Preamble template placeholder replaced by the project tree listing.
pub const FILE_TREE_PLACEHOLDER: &str = "{{{FILE_TREE_JSON}}}";

/// Preamble template placeholder replaced by the injected file blocks.
pub const FILES_PLACEHOLDER: &str = "{{{FILE_REFERENCES}}}";

pub const FILE: Delimiters = Delimiters {
    start: FILE_METADATA_START,
    metadata_end: FILE_METADATA_END,
    terminator: END_OF_FILE,
};

pub const SNIPPET: Delimiters = Delimiters {
    start: SNIPPET_METADATA_START,
    metadata_end: SNIPPET_METADATA_END,
    terminator: END_OF_SNIPPET,
};

pub const TERMINAL_LOG: Delimiters = Delimiters {
    start: TERMINAL_METADATA_START,
    metadata_end: TERMINAL_METADATA_END,
    terminator: END_OF_TERMINAL_LOG,
};

/// All start tokens, in the order the decoder probes them.
pub const START_TOKENS: [&str; 3] = [
    FILE_METADATA_START,
    SNIPPET_METADATA_START,
    TERMINAL_METADATA_START,
];

/// Every reserved token. Used by the encoder to refuse content that
/// would close a block early.
pub const RESERVED: [&str; 9] = [
    FILE_METADATA_START,
    FILE_METADATA_END,
    END_OF_FILE,
    SNIPPET_METADATA_START,
    SNIPPET_METADATA_END,
    END_OF_SNIPPET,
    TERMINAL_METADATA_START,
    TERMINAL_METADATA_END,
    END_OF_TERMINAL_LOG,
];

/// Length of the longest start token, in bytes.
pub const MAX_START_LEN: usize = SNIPPET_METADATA_START.len();

use std::fmt;

use pbp_wire::token::{self, Delimiters};

/// The three block kinds of the grammar.
///
/// ```text
/// ┌─────────────┬─────────────────────────────────┬─────────────────────────┐
/// │ Kind        │ Start token                     │ Terminator              │
/// ├─────────────┼─────────────────────────────────┼─────────────────────────┤
/// │ File        │ {{{START FILE METADATA}}}       │ {{{END OF FILE}}}       │
/// │ Snippet     │ {{{START CODE SNIPPET METADATA}}}│ {{{END OF CODE SNIPPET}}}│
/// │ TerminalLog │ {{{START TERMINAL METADATA}}}   │ {{{END OF TERMINAL LOG}}}│
/// └─────────────┴─────────────────────────────────┴─────────────────────────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BlockKind {
    File,
    Snippet,
    TerminalLog,
}

impl BlockKind {
    /// All kinds, indexed the same way as [`token::START_TOKENS`].
    pub const ALL: [Self; 3] = [Self::File, Self::Snippet, Self::TerminalLog];

    pub fn delimiters(self) -> &'static Delimiters {
        match self {
            Self::File => &token::FILE,
            Self::Snippet => &token::SNIPPET,
            Self::TerminalLog => &token::TERMINAL_LOG,
        }
    }

    /// Map an index into [`token::START_TOKENS`] back to its kind.
    pub fn from_start_index(idx: usize) -> Option<Self> {
        Self::ALL.get(idx).copied()
    }

    /// Lowercase label used in logs and CLI output.
    pub fn label(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Snippet => "snippet",
            Self::TerminalLog => "terminal-log",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

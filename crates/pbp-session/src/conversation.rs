use pbp_wire::token::{CONVERSATION_END, CONVERSATION_START};

use crate::compaction::compact;
use crate::config::SessionConfig;

/// Size of the context, reported after each turn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ContextStats {
    pub lines: usize,
    pub characters: usize,
}

/// The running context: preamble, start marker, then speaker-labelled
/// entries.
///
/// ```text
///   <preamble>
///   {{{CONVERSATION_HISTORY START}}}
///
///   **user:**
///
///   add a test for @src/lib.rs
///   {{{START FILE METADATA}}} ... src/lib.rs v2 ...
///
///   **partner:**
///
///   Here it is. ...
/// ```
///
/// A request is this text followed by the end marker. A model turn is
/// appended only once it is complete.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Conversation {
    text: String,
    user: String,
    partner: String,
}

impl Conversation {
    /// Start from a rendered preamble (which ends with the start marker).
    pub fn new(preamble: impl Into<String>, config: &SessionConfig) -> Self {
        Self {
            text: preamble.into(),
            user: config.user_name.clone(),
            partner: config.partner_name.clone(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn push_user(&mut self, input: &str) {
        push_entry(&mut self.text, &self.user, input);
    }

    pub fn push_partner(&mut self, response: &str) {
        push_entry(&mut self.text, &self.partner, response);
    }

    /// Append text without a speaker label, e.g. injected file blocks.
    pub fn push_raw(&mut self, text: &str) {
        self.text.push_str(text);
    }

    /// The request for a new turn.
    pub fn request_text(&self) -> String {
        format!("{}\n{CONVERSATION_END}\n", self.text)
    }

    /// The request that asks the model to carry on from `partial`, the
    /// response received so far for the current turn. The partial text
    /// follows the conversation without a speaker label.
    pub fn continuation_text(&self, partial: &str) -> String {
        format!("{}\n\n{partial}\n{CONVERSATION_END}\n", self.text)
    }

    /// Remove superseded file versions from the conversation.
    pub fn compact(&mut self) {
        self.text = compact(&self.text);
    }

    /// Swap the preamble, keeping the conversation after the start
    /// marker.
    pub fn replace_preamble(&mut self, preamble: &str) {
        let entries = match self.text.find(CONVERSATION_START) {
            Some(pos) => self.text[pos + CONVERSATION_START.len()..].to_string(),
            None => format!("\n{}", self.text),
        };
        let mut text = match preamble.find(CONVERSATION_START) {
            Some(pos) => preamble[..pos + CONVERSATION_START.len()].to_string(),
            None => {
                let mut text = preamble.to_string();
                if !text.is_empty() && !text.ends_with('\n') {
                    text.push('\n');
                }
                text.push_str(CONVERSATION_START);
                text
            }
        };
        text.push_str(&entries);
        self.text = text;
    }

    pub fn stats(&self) -> ContextStats {
        ContextStats {
            lines: self.text.lines().count(),
            characters: self.text.chars().count(),
        }
    }
}

fn push_entry(text: &mut String, speaker: &str, body: &str) {
    text.push_str(&format!("\n**{speaker}:**\n\n{body}\n"));
}

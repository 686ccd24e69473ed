/// Limits and labels for a chat session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Continuation requests issued automatically for one turn before it
    /// is reported as stuck.
    pub max_continuations: usize,
    /// Speaker label for user entries in the conversation.
    pub user_name: String,
    /// Speaker label for model entries.
    pub partner_name: String,
    /// Split injected files into parts of at most this many bytes.
    pub part_limit: Option<usize>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_continuations: 5,
            user_name: "user".to_string(),
            partner_name: "partner".to_string(),
            part_limit: None,
        }
    }
}

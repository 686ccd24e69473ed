/// Errors raised while writing the textual block grammar.
///
/// Reading never fails at this layer: malformed header lines are skipped
/// and malformed values fall back to defaults. Only the writer side can
/// refuse input, because a key or value that smuggles a newline or a
/// delimiter token would corrupt every block that follows it.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// A metadata key was empty or contained `:` / a line break.
    #[error("invalid metadata key {key:?}")]
    InvalidKey { key: String },

    /// A metadata value contained a line break.
    #[error("metadata value for {key} spans multiple lines")]
    MultilineValue { key: String },

    /// A header value or body contained a reserved delimiter token.
    #[error("text contains reserved delimiter {token}")]
    ReservedToken { token: &'static str },
}

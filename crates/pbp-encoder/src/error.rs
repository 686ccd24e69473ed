use pbp_types::TypeError;

/// Errors that can occur while building request context.
///
/// ```text
///   EncodeError
///   ├── ZeroPartLimit      ← split_parts_at(0)
///   ├── Type(TypeError)    ← content holds its own terminator, bad path
///   └── Json               ← file tree serialization
/// ```
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("part size limit must be at least one byte")]
    ZeroPartLimit,

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error("failed to serialize file tree: {0}")]
    Json(#[from] serde_json::Error),
}

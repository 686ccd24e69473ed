use pbp_wire::WireError;

use crate::kind::BlockKind;

/// Errors raised while turning a parsed header into a typed block, or a
/// typed block back into text.
///
/// ```text
/// ┌─────────────────────────────────────────────────────┐
/// │ TypeError (this crate)                              │
/// │   ├── MissingRequiredField for unusable headers     │
/// │   ├── ReservedTokenInContent for unencodable bodies │
/// │   └── wraps WireError for header write failures     │
/// └─────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, thiserror::Error)]
pub enum TypeError {
  /// A header lacked a field the block kind cannot do without. Only
  /// `Path` on file blocks is required today.
  #[error("{kind} block is missing required field {field}")]
  MissingRequiredField { kind: BlockKind, field: &'static str },

  /// The block content contains its own terminator token and would
  /// close early if written.
  #[error("{kind} content contains its terminator token")]
  ReservedTokenInContent { kind: BlockKind },

  #[error(transparent)]
  Wire(#[from] WireError),
}

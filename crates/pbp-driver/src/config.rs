use crate::diff::DEFAULT_CONTEXT_RADIUS;

/// How reassembled files are shown and whether they are written.
///
/// ```text
/// ┌──────────────┬───────────────────────────────────────────────┐
/// │ Field        │ Purpose                                       │
/// ├──────────────┼───────────────────────────────────────────────┤
/// │ diff_context │ Unchanged lines shown around each diff hunk   │
/// │ apply        │ Write completed files back to storage         │
/// └──────────────┴───────────────────────────────────────────────┘
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DriverConfig {
    pub diff_context: usize,
    pub apply: bool,
}

impl Default for DriverConfig {
    /// Five lines of diff context, read-only.
    fn default() -> Self {
        Self {
            diff_context: DEFAULT_CONTEXT_RADIUS,
            apply: false,
        }
    }
}

use similar::TextDiff;

/// Unchanged lines shown around each hunk.
pub const DEFAULT_CONTEXT_RADIUS: usize = 5;

/// Unified diff from the on-disk text to the text in context.
///
/// Headers name both sides after the same path:
///
/// ```text
/// --- src/app.py (disk)
/// +++ src/app.py (context)
/// @@ -1,3 +1,3 @@
/// ```
///
/// Returns an empty string when the texts are equal.
pub fn unified_diff(path: &str, disk: &str, context: &str, radius: usize) -> String {
  let diff = TextDiff::from_lines(disk, context);
  if diff.ops().iter().all(|op| op.tag() == similar::DiffTag::Equal) {
    return String::new();
  }
  diff
    .unified_diff()
    .context_radius(radius)
    .header(&format!("{path} (disk)"), &format!("{path} (context)"))
    .to_string()
}

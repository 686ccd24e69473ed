use std::collections::BTreeMap;

use pbp_types::{FileBlock, FileIdentity};

/// Parts received so far for one `(path, version)`.
#[derive(Clone, Debug, Default)]
struct PartAccumulator {
  parts: BTreeMap<u32, String>,
  complete: bool,
}

/// Reassembles multi-part file transfers.
///
/// Each identity collects numbered parts until its terminator block
/// arrives. Parts may arrive in any order and are joined by ascending
/// part number; a repeated part number replaces the earlier content.
///
/// ```text
///   add(a.py v2, part 2, "b\n")
///   add(a.py v2, part 1, "a\n")
///   add(a.py v2, terminator)      ← is_complete() from here on
///   assemble(a.py v2) → "a\nb\n"  ← accumulator removed
/// ```
#[derive(Clone, Debug, Default)]
pub struct PartBuffer {
  files: BTreeMap<FileIdentity, PartAccumulator>,
}

impl PartBuffer {
  pub fn new() -> Self {
    Self::default()
  }

  /// Record a part, or completion when `is_terminator` is set. A
  /// terminator's content is ignored.
  pub fn add(&mut self, identity: FileIdentity, part: u32, content: &str, is_terminator: bool) {
    let entry = self.files.entry(identity).or_default();
    if is_terminator {
      entry.complete = true;
    } else if entry.parts.insert(part, content.to_string()).is_some() {
      tracing::debug!(part, "replacing previously received part");
    }
  }

  /// Route a decoded file block.
  pub fn add_block(&mut self, block: &FileBlock) {
    tracing::debug!(
      path = %block.path,
      version = block.version,
      part = block.part,
      terminator = block.is_terminator(),
      "file part received"
    );
    self.add(block.identity(), block.part, &block.content, block.is_terminator());
  }

  pub fn is_complete(&self, identity: &FileIdentity) -> bool {
    self.files.get(identity).is_some_and(|acc| acc.complete)
  }

  /// Join the parts of a completed transfer and forget it.
  ///
  /// Returns `None` until the terminator has been seen. Missing part
  /// numbers are skipped; the result is still produced.
  pub fn assemble(&mut self, identity: &FileIdentity) -> Option<String> {
    if !self.is_complete(identity) {
      return None;
    }
    let acc = self.files.remove(identity)?;

    let mut expected = acc.parts.keys().next().map_or(1, |&first| first.min(1));
    for &part in acc.parts.keys() {
      if part > expected {
        tracing::warn!(%identity, missing_from = expected, missing_to = part - 1, "file parts missing, assembling anyway");
      }
      expected = part.saturating_add(1);
    }

    Some(acc.parts.into_values().collect())
  }

  /// Identities holding content but no terminator yet, in identity
  /// order.
  pub fn pending(&self) -> Vec<FileIdentity> {
    self
      .files
      .iter()
      .filter(|(_, acc)| !acc.complete && !acc.parts.is_empty())
      .map(|(id, _)| id.clone())
      .collect()
  }

  pub fn is_empty(&self) -> bool {
    self.files.is_empty()
  }

  /// Drop every in-flight transfer.
  pub fn clear(&mut self) {
    self.files.clear();
  }
}

use pbp_decoder::{BlockDecoder, Segment};
use pbp_types::{Block, Lang};
use pbp_wire::token::CONVERSATION_START;

use crate::present::{normalize, Presentation};

/// Markdown rendering for the console.
///
/// Every artifact becomes a `####` heading followed by a fenced block:
///
/// ````text
///   #### src/app.py
///
///   ```python
///   print("hi")
///   ```
/// ````
///
/// The fence is lengthened when the body itself contains backticks.
pub struct MarkdownRenderer;

impl MarkdownRenderer {
  /// A reassembled file, as decided by [`crate::present`].
  pub fn render_file(path: &str, shown: &Presentation) -> String {
    fenced(path, &shown.language, &shown.body)
  }

  /// Snippets and terminal logs. File parts are not rendered one by one;
  /// they are shown once their file is complete.
  pub fn render_block(block: &Block) -> Option<String> {
    match block {
      Block::File(_) => None,
      Block::Snippet(snippet) => {
        let language = snippet.language.as_deref().unwrap_or(Lang::Text.as_str());
        Some(fenced(language, language, &snippet.content))
      }
      Block::TerminalLog(log) => Some(fenced(&log.path, Lang::Text.as_str(), &log.content)),
    }
  }

  /// Re-render a saved conversation for display on resume.
  ///
  /// Only the text after the conversation start marker is shown. File
  /// parts are shown as their content, terminators and unparseable
  /// blocks are left out.
  pub fn recap(history: &str) -> String {
    let conversation = history
      .find(CONVERSATION_START)
      .map_or(history, |pos| &history[pos + CONVERSATION_START.len()..]);

    let decoded = BlockDecoder::decode(conversation);
    let mut out = String::new();
    for segment in &decoded.segments {
      match segment {
        Segment::Prose { text, .. } => out.push_str(text),
        Segment::Block {
          block: Block::File(file),
          ..
        } => {
          if !file.is_terminator() {
            let language = Lang::infer(&file.path, file.content.lines().next());
            out.push_str(&fenced(&file.path, language.as_str(), &file.content));
          }
        }
        Segment::Block { block, .. } => {
          if let Some(text) = Self::render_block(block) {
            out.push_str(&text);
          }
        }
        Segment::Rejected { .. } => {}
      }
    }
    out
  }
}

fn fenced(title: &str, language: &str, body: &str) -> String {
  let body = normalize(body);
  let fence = fence_for(&body);
  format!("#### {title}\n\n{fence}{language}\n{body}{fence}\n")
}

/// A backtick fence longer than any backtick run in `body`.
fn fence_for(body: &str) -> String {
  let mut longest = 0;
  let mut run = 0;
  for c in body.chars() {
    if c == '`' {
      run += 1;
      longest = longest.max(run);
    } else {
      run = 0;
    }
  }
  "`".repeat(longest.max(2) + 1)
}

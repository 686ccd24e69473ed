use pbp_wire::token::{CONVERSATION_START, FILES_PLACEHOLDER, FILE_TREE_PLACEHOLDER};

/// Preamble used when no template file is configured.
///
/// Describes the block grammar to the model so that it answers in the
/// same format it is given files in.
pub const DEFAULT_TEMPLATE: &str = "\
You are a senior engineer pair programming with the user. The project files you can see are listed below.

Project structure:
{{{FILE_TREE_JSON}}}

Project files:
{{{FILE_REFERENCES}}}

When you create or change a file, always output the complete file, never a fragment or a diff, using exactly this format:

{{{START FILE METADATA}}}
Path: <path relative to the project root>
Language: <language>
Version: <the file's latest version plus one>
Part: 1
{{{END FILE METADATA}}}
<file content>
{{{END OF FILE}}}
{{{START FILE METADATA}}}
Path: <same path>
Language: <language>
Version: <same version>
NoMoreParts: True
{{{END FILE METADATA}}}
{{{END OF FILE}}}

If you run out of room, stop at the end of a line. You will be asked to continue; continue with the next part number.

Commands and short examples that are not files go in snippets:

{{{START CODE SNIPPET METADATA}}}
Language: <language>
{{{END CODE SNIPPET METADATA}}}
<code>
{{{END OF CODE SNIPPET}}}

";

/// Project context placed before the conversation.
///
/// ```text
/// ┌─────────────────────────────┐
/// │ template text               │
/// │   {{{FILE_TREE_JSON}}}   ←── tree
/// │   {{{FILE_REFERENCES}}}  ←── encoded file blocks
/// ├─────────────────────────────┤
/// │ {{{CONVERSATION_HISTORY START}}}
/// └─────────────────────────────┘
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Preamble {
  template: String,
}

impl Default for Preamble {
  fn default() -> Self {
    Self::new(DEFAULT_TEMPLATE)
  }
}

impl Preamble {
  pub fn new(template: impl Into<String>) -> Self {
    Self {
      template: template.into(),
    }
  }

  /// Substitute the placeholders and close with the conversation start
  /// marker. Empty substitutions remove the placeholder entirely.
  pub fn render(&self, tree: &str, files: &str) -> String {
    let mut text = self
      .template
      .replace(FILE_TREE_PLACEHOLDER, &surround(tree))
      .replace(FILES_PLACEHOLDER, &surround(files));
    if !text.contains(CONVERSATION_START) {
      if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
      }
      text.push_str(CONVERSATION_START);
      text.push('\n');
    }
    text
  }
}

fn surround(text: &str) -> String {
  if text.is_empty() {
    String::new()
  } else {
    format!("\n{}\n", text.trim_end_matches('\n'))
  }
}

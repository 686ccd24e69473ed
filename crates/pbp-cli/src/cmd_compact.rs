/// Implementation of `pbp compact`.
///
/// Rewrites a saved conversation keeping only the newest version of each
/// file after the conversation start marker. The preamble is not touched.
/// Sizes before and after go to stderr.
use std::fs;

use anyhow::{Context, Result};
use pbp_session::compact;

use crate::CompactArgs;

/// Run the `pbp compact` command.
///
/// # Errors
///
/// Returns an error if the input cannot be read or the output cannot be
/// written.
pub fn run(args: &CompactArgs) -> Result<()> {
    let text = fs::read_to_string(&args.file).with_context(|| format!("cannot read {}", args.file.display()))?;
    let compacted = compact(&text);

    match &args.output {
        Some(path) => fs::write(path, &compacted).with_context(|| format!("cannot write {}", path.display()))?,
        None => print!("{compacted}"),
    }

    eprintln!(
        "{} → {} characters ({} lines → {} lines)",
        text.chars().count(),
        compacted.chars().count(),
        text.lines().count(),
        compacted.lines().count()
    );
    Ok(())
}

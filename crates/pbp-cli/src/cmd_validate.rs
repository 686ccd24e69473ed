/// Implementation of `pbp validate`.
///
/// Decodes a whole text and checks that every block is well formed and
/// every file transfer is finished. Prints a `✓` line per passing check
/// and a `✗` line per problem; any problem makes the command fail.
///
/// # Success output
///
/// ```text
/// ✓ Blocks: 6 blocks decoded
/// ✓ Files: 2 files complete
/// ✓ End: text does not end inside a block
/// ```
///
/// # Failure output
///
/// ```text
/// ✗ Rejected: unparseable file block at bytes 120..188: file block is missing required field Path
/// ✗ Unfinished: a.py (v2) has parts but no terminator block
/// ✗ End: file block starting at byte 640 has no terminator
/// ```
use std::fs;

use anyhow::{anyhow, Context, Result};
use pbp_decoder::{BlockDecoder, DecodedText, PartBuffer};
use pbp_types::FileIdentity;

use crate::ValidateArgs;

/// Run the `pbp validate` command.
///
/// # Errors
///
/// Returns an error if the file cannot be read or any check fails.
pub fn run(args: &ValidateArgs) -> Result<()> {
    let text = fs::read_to_string(&args.file).with_context(|| format!("cannot read {}", args.file.display()))?;
    let report = check(&BlockDecoder::decode(&text));
    for line in &report.lines {
        println!("{line}");
    }
    if report.failed {
        Err(anyhow!("validation failed"))
    } else {
        Ok(())
    }
}

struct Report {
    lines: Vec<String>,
    failed: bool,
}

fn check(decoded: &DecodedText) -> Report {
    let mut lines = Vec::new();

    let problems = decoded.problems();
    let blocks = decoded.blocks().count();
    if problems.is_empty() {
        lines.push(format!("✓ Blocks: {blocks} block{} decoded", plural(blocks)));
    }
    for problem in &problems {
        lines.push(format!("✗ Rejected: {}", chain(*problem)));
    }

    let (complete, unfinished) = transfers(decoded);
    if unfinished.is_empty() {
        lines.push(format!("✓ Files: {complete} file{} complete", plural(complete)));
    }
    for identity in &unfinished {
        lines.push(format!("✗ Unfinished: {identity} has parts but no terminator block"));
    }

    let dangling = decoded.unterminated();
    match &dangling {
        Some(error) => lines.push(format!("✗ End: {error}")),
        None => lines.push("✓ End: text does not end inside a block".to_string()),
    }

    Report {
        failed: !problems.is_empty() || !unfinished.is_empty() || dangling.is_some(),
        lines,
    }
}

/// Completed transfers, and identities with parts but no terminator.
fn transfers(decoded: &DecodedText) -> (usize, Vec<FileIdentity>) {
    let mut parts = PartBuffer::new();
    let mut complete = 0;
    for (file, _) in decoded.files() {
        parts.add_block(file);
        if file.is_terminator() && parts.assemble(&file.identity()).is_some() {
            complete += 1;
        }
    }
    (complete, parts.pending())
}

fn chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

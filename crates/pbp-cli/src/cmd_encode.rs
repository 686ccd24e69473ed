/// Implementation of `pbp encode`.
///
/// Frames files from the working directory as file blocks, the same way
/// the chat session sends them. With `--preamble` the blocks are placed
/// into the default preamble together with a JSON file tree.
///
/// ```text
/// $ pbp encode src/main.rs --version 2
/// {{{START FILE METADATA}}}
/// Path: src/main.rs
/// Language: rust
/// Version: 2
/// Part: 1
/// {{{END FILE METADATA}}}
/// ...
/// ```
use std::fs;

use anyhow::{Context, Result};
use pbp_driver::{DiskStorage, Storage};
use pbp_encoder::tree::file_tree_json;
use pbp_encoder::{ContextEncoder, Preamble};

use crate::config::Settings;
use crate::EncodeArgs;

/// Run the `pbp encode` command.
///
/// # Errors
///
/// Returns an error if a file is missing, unreadable or contains a
/// block terminator, or if the output cannot be written.
pub fn run(args: &EncodeArgs, settings: &Settings) -> Result<()> {
    let root = std::env::current_dir().context("cannot determine working directory")?;
    let storage = DiskStorage::new(root);

    let mut encoder = ContextEncoder::new();
    if let Some(limit) = args.part_limit.or(settings.part_limit) {
        encoder.split_parts_at(limit)?;
    }
    for path in &args.files {
        let content = storage
            .read(path)
            .with_context(|| format!("cannot read {path}"))?
            .with_context(|| format!("{path} does not exist"))?;
        encoder
            .add_file(path, args.version, &content)
            .with_context(|| format!("cannot encode {path}"))?;
    }

    let text = if args.preamble {
        let tree = file_tree_json(args.files.iter().map(String::as_str))?;
        Preamble::default().render(&tree, encoder.as_str())
    } else {
        encoder.finish()
    };

    match &args.output {
        Some(path) => fs::write(path, &text).with_context(|| format!("cannot write {}", path.display()))?,
        None => print!("{text}"),
    }
    Ok(())
}

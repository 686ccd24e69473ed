/// Implementation of `pbp decode`.
///
/// Replays a saved model response through the same pipeline as a live
/// turn (fragmented decoding, part reassembly, presentation) without a
/// model. Completed files are shown as diffs against the working
/// directory, or written with `--apply`.
///
/// # Output
///
/// ````text
/// Here is the fix.                     ← prose, stdout
/// [receiving file src/app.py]          ← progress, stderr
///
/// #### src/app.py (v2)
///
/// ```diff
/// --- src/app.py (disk)
/// +++ src/app.py (context)
/// ...
/// ```
/// ````
///
/// A response that ends inside a block or with an unfinished file is
/// reported as truncated and the command fails.
use std::fs;

use anyhow::{anyhow, Context, Result};
use pbp_driver::{write_all, DiskStorage};
use pbp_session::{ContinuationController, Conversation, ScriptedBackend, TurnOutcome};

use crate::config::Settings;
use crate::console::ConsoleObserver;
use crate::DecodeArgs;

/// Run the `pbp decode` command.
///
/// # Errors
///
/// Returns an error if the file cannot be read, the response is
/// truncated, or any file cannot be written in apply mode.
pub fn run(args: &DecodeArgs, settings: &Settings) -> Result<()> {
    let response =
        fs::read_to_string(&args.file).with_context(|| format!("cannot read {}", args.file.display()))?;
    let root = std::env::current_dir().context("cannot determine working directory")?;
    let mut storage = DiskStorage::new(root);
    let driver = settings.driver_config(args.apply);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("cannot start async runtime")?;

    let mut backend = ScriptedBackend::new([response]).with_chunk(args.chunk);
    let conversation = Conversation::new(String::new(), &settings.session_config());
    let mut controller = ContinuationController::new(0);
    let outcome = {
        let mut observer = ConsoleObserver::new(&storage, &driver);
        runtime.block_on(controller.run_turn(&mut backend, &conversation, &mut observer))
    };

    let turn = match outcome {
        TurnOutcome::Done(turn) => turn,
        TurnOutcome::Stuck { .. } => {
            let partial = controller.partial_response().len();
            return Err(anyhow!("response is truncated after {partial} bytes"));
        }
        TurnOutcome::Failed(e) => return Err(e).context("decode failed"),
    };

    if !turn.full_text.ends_with('\n') {
        println!();
    }
    if driver.apply {
        let failures = write_all(&turn.assembled_files, &mut storage);
        for failure in &failures {
            eprintln!("error: {failure}");
        }
        if !failures.is_empty() {
            return Err(anyhow!("{} of {} files could not be written", failures.len(), turn.assembled_files.len()));
        }
        for identity in turn.assembled_files.keys() {
            eprintln!("[wrote {}]", identity.path);
        }
    }
    Ok(())
}

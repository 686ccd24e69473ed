//! Terminal output for decoded turns.

use std::io::{self, Write};

use pbp_decoder::DecodeError;
use pbp_driver::render_markdown::MarkdownRenderer;
use pbp_driver::{present, DriverConfig, Storage};
use pbp_session::{SessionError, TurnObserver, TurnReport, TurnOutcome};
use pbp_types::{Block, BlockKind, FileIdentity};

/// Streams prose to stdout as it arrives and shows each block once it
/// is complete: files as diffs against disk (or in full when new),
/// snippets and terminal logs fenced. Progress notes go to stderr.
pub struct ConsoleObserver<'a, S: ?Sized> {
    storage: &'a S,
    driver: &'a DriverConfig,
}

impl<'a, S: Storage + ?Sized> ConsoleObserver<'a, S> {
    pub fn new(storage: &'a S, driver: &'a DriverConfig) -> Self {
        Self { storage, driver }
    }
}

impl<S: Storage + ?Sized> TurnObserver for ConsoleObserver<'_, S> {
    fn on_prose(&mut self, text: &str) {
        let mut out = io::stdout().lock();
        // A closed pipe is not worth aborting the turn for.
        let _ = out.write_all(text.as_bytes());
        let _ = out.flush();
    }

    fn on_status(&mut self, kind: BlockKind, label: Option<&str>) {
        match label {
            Some(label) => eprintln!("[receiving {kind} {label}]"),
            None => eprintln!("[receiving {kind}]"),
        }
    }

    fn on_block(&mut self, block: &Block) {
        if let Some(text) = MarkdownRenderer::render_block(block) {
            println!("\n{text}");
        }
    }

    fn on_file(&mut self, identity: &FileIdentity, content: &str) {
        let shown = present(&identity.path, content, self.storage, self.driver);
        println!("\n{}", MarkdownRenderer::render_file(&identity.to_string(), &shown));
    }

    fn on_rejected(&mut self, error: &DecodeError) {
        eprintln!("[skipped block: {error}]");
    }

    fn on_continue(&mut self, attempt: usize, max: usize) {
        eprintln!("[response cut off, continuing {attempt}/{max}]");
    }
}

/// Print what a finished, stuck or failed turn left to report.
pub fn print_report(report: &TurnReport) {
    match &report.outcome {
        TurnOutcome::Done(turn) => {
            if !turn.full_text.ends_with('\n') {
                println!();
            }
            for path in &report.written {
                eprintln!("[wrote {path}]");
            }
        }
        TurnOutcome::Stuck { .. } => {
            eprintln!("[type $continue to keep going]");
        }
        TurnOutcome::Failed(error) => print_error(error),
    }
    for problem in &report.problems {
        print_error(problem);
    }
}

pub fn print_error(error: &SessionError) {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    eprintln!("error: {message}");
}

/// Implementation of `pbp chat`.
///
/// A line-oriented REPL over a [`Session`]. Each line is a user message;
/// lines starting with `$` are commands:
///
/// ```text
/// ┌────────────┬──────────────────────────────────────────────────────┐
/// │ Command    │ Effect                                               │
/// ├────────────┼──────────────────────────────────────────────────────┤
/// │ $exit      │ Leave (the conversation stays saved)                 │
/// │ $reset     │ Start over from the preamble                         │
/// │ $refresh   │ Re-read the --file files into the preamble           │
/// │ $continue  │ Retry a turn that got stuck or failed                │
/// │ $compact   │ Drop superseded file versions from the conversation  │
/// └────────────┴──────────────────────────────────────────────────────┘
/// ```
///
/// Ctrl-C during a turn discards the turn and returns to the prompt.
use std::fs;
use std::io::Write;

use anyhow::{bail, Context, Result};
use pbp_driver::render_markdown::MarkdownRenderer;
use pbp_driver::{DiskStorage, DriverConfig};
use pbp_encoder::Preamble;
use pbp_session::{Backend, CommandBackend, HistoryStore, ScriptedBackend, Session};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::Settings;
use crate::console::{print_error, print_report, ConsoleObserver};
use crate::ChatArgs;

/// Run the `pbp chat` command.
///
/// # Errors
///
/// Returns an error if no backend is configured, the template or a
/// replay file cannot be read, or the saved conversation cannot be
/// loaded. Errors during the session are reported and the session goes
/// on.
pub fn run(args: &ChatArgs, settings: &Settings) -> Result<()> {
    let root = std::env::current_dir().context("cannot determine working directory")?;
    let storage = DiskStorage::new(&root);
    let driver = settings.driver_config(args.apply);

    let preamble = match args.template.as_ref().or(settings.template.as_ref()) {
        Some(path) => Preamble::new(
            fs::read_to_string(path).with_context(|| format!("cannot read template {}", path.display()))?,
        ),
        None => Preamble::default(),
    };
    let mut seeds = settings.files.clone();
    seeds.extend(args.files.iter().cloned());
    let history = HistoryStore::for_project(&settings.history_dir(), &root);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("cannot start async runtime")?;

    if !args.replay.is_empty() {
        let responses = args
            .replay
            .iter()
            .map(|path| fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display())))
            .collect::<Result<Vec<_>>>()?;
        let session = Session::new(settings.session_config(), driver, ScriptedBackend::new(responses), storage)
            .with_preamble(preamble, seeds)?
            .with_history(history);
        return runtime.block_on(repl(session, args.resume));
    }

    let Some(command_line) = args.backend_cmd.as_ref().or(settings.backend_cmd.as_ref()) else {
        bail!("no backend configured: pass --backend-cmd, set PBP_BACKEND_CMD or backend_cmd in pbp.toml");
    };
    let Some(mut backend) = CommandBackend::parse(command_line) else {
        bail!("backend command is empty");
    };
    if let Some(model) = args.model.as_ref().or(settings.model.as_ref()) {
        backend = backend.env("PBP_MODEL", model);
    }
    let session = Session::new(settings.session_config(), driver, backend, storage)
        .with_preamble(preamble, seeds)?
        .with_history(history);
    runtime.block_on(repl(session, args.resume))
}

enum Turn {
    New,
    Continue,
}

async fn repl<B: Backend>(mut session: Session<B, DiskStorage>, resume: bool) -> Result<()> {
    if resume {
        if session.resume()? {
            let recap = MarkdownRenderer::recap(session.conversation().text());
            println!("{}", recap.trim_end());
        } else {
            eprintln!("[no saved conversation for this directory, starting fresh]");
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt();
        let Some(line) = lines.next_line().await.context("cannot read input")? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let turn = match input {
            "$exit" => break,
            "$reset" => {
                report_result(session.reset(), "conversation reset");
                continue;
            }
            "$refresh" => {
                report_result(session.refresh(), "preamble refreshed");
                continue;
            }
            "$compact" => {
                match session.compact() {
                    Ok(stats) => eprintln!("[compacted: {} lines, {} characters]", stats.lines, stats.characters),
                    Err(e) => print_error(&e),
                }
                continue;
            }
            "$continue" => Turn::Continue,
            command if command.starts_with('$') => {
                eprintln!("[unknown command {command}]");
                continue;
            }
            message => {
                match session.submit(message) {
                    Ok(injected) => {
                        for identity in injected {
                            eprintln!("[sending {identity}]");
                        }
                    }
                    Err(e) => {
                        print_error(&e);
                        continue;
                    }
                }
                Turn::New
            }
        };

        run_turn(&mut session, turn).await;
    }

    session.save()?;
    Ok(())
}

/// One turn, abandoned on Ctrl-C.
async fn run_turn<B: Backend>(session: &mut Session<B, DiskStorage>, turn: Turn) {
    // The observer reads from its own handle so the session stays free
    // to write.
    let storage = DiskStorage::new(session.storage().root());
    let driver: DriverConfig = session.driver_config().clone();
    let mut observer = ConsoleObserver::new(&storage, &driver);

    let work = async {
        match turn {
            Turn::New => session.run_turn(&mut observer).await,
            Turn::Continue => session.continue_turn(&mut observer).await,
        }
    };
    let report = tokio::select! {
        report = work => Some(report),
        _ = tokio::signal::ctrl_c() => None,
    };

    match report {
        Some(report) => {
            print_report(&report);
            let stats = session.stats();
            eprintln!("[context: {} lines, {} characters]", stats.lines, stats.characters);
        }
        None => {
            session.cancel();
            eprintln!("\n[interrupted]");
        }
    }
}

fn prompt() {
    let mut out = std::io::stdout().lock();
    let _ = write!(out, "\n> ");
    let _ = out.flush();
}

fn report_result(result: Result<(), pbp_session::SessionError>, done: &str) {
    match result {
        Ok(()) => eprintln!("[{done}]"),
        Err(e) => print_error(&e),
    }
}

/// pbp command-line tool: chat with a model that answers in file blocks,
/// and inspect, validate, compact or produce block text offline.
///
/// # Command overview
///
/// ```text
/// pbp <COMMAND> [OPTIONS]
///
/// Commands:
///   chat       Interactive pair programming session
///   decode     Run a saved model response through the decoder
///   inspect    List every block in a text
///   validate   Check a text for rejected, dangling or unfinished blocks
///   compact    Drop superseded file versions from a saved conversation
///   encode     Frame files as file blocks
///   help       Print help information
///
/// Global options:
///   -v, --verbose    More logging on stderr (-v info, -vv debug)
///   --config <PATH>  Settings file (default: ./pbp.toml when present)
///   -h, --help       Print help
///   -V, --version    Print version
/// ```
///
/// # Exit codes
///
/// | Code | Meaning                                   |
/// |------|-------------------------------------------|
/// | 0    | Success                                   |
/// | 1    | Error (I/O failure, validation problem)   |
///
/// Logs and error details go to stderr so stdout can be piped cleanly.
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd_chat;
mod cmd_compact;
mod cmd_decode;
mod cmd_encode;
mod cmd_inspect;
mod cmd_validate;
mod config;
mod console;

// ── CLI root ──────────────────────────────────────────────────────────────────

/// Pair programming over a plain-text block protocol.
#[derive(Parser)]
#[command(name = "pbp", version, about = "Pair block protocol CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// More log output on stderr. Repeat for more detail.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Settings file. Defaults to `pbp.toml` in the working directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

// ── Sub-commands ──────────────────────────────────────────────────────────────

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive session in the working directory.
    Chat(ChatArgs),
    /// Decode a saved model response and show the files it contains.
    Decode(DecodeArgs),
    /// List every block in a text with its metadata and byte span.
    Inspect(InspectArgs),
    /// Report rejected blocks, dangling blocks and unfinished files.
    Validate(ValidateArgs),
    /// Remove superseded file versions from a saved conversation.
    Compact(CompactArgs),
    /// Frame files as file blocks.
    Encode(EncodeArgs),
}

// ── Argument structs ──────────────────────────────────────────────────────────

/// Arguments for `pbp chat`.
///
/// Every option can also be set in the settings file; flags win.
///
/// ```text
/// ┌──────────────────┬──────────────────────────────────────────────────┐
/// │ Flag             │ Effect                                           │
/// ├──────────────────┼──────────────────────────────────────────────────┤
/// │ --resume         │ Continue the saved conversation of this dir      │
/// │ --apply          │ Write completed files to disk                    │
/// │ --backend-cmd    │ Command that answers a context on stdin/stdout   │
/// │ --replay FILE    │ Answer with saved responses instead (repeatable) │
/// │ --file PATH      │ Put a project file into the preamble (repeatable)│
/// │ --template PATH  │ Preamble template                                │
/// └──────────────────┴──────────────────────────────────────────────────┘
/// ```
///
/// In-session commands: `$exit`, `$reset`, `$refresh`, `$continue`,
/// `$compact`. Ctrl-C interrupts the running turn.
#[derive(clap::Args)]
pub struct ChatArgs {
    /// Continue the conversation saved for this directory.
    #[arg(long)]
    pub resume: bool,

    /// Write every completed file to disk.
    #[arg(long)]
    pub apply: bool,

    /// Backend command line, e.g. `llm -m fast`.
    #[arg(long, env = "PBP_BACKEND_CMD")]
    pub backend_cmd: Option<String>,

    /// Model name passed to the backend command as `PBP_MODEL`.
    #[arg(long, env = "PBP_MODEL")]
    pub model: Option<String>,

    /// Answer with the contents of these files, one per request.
    #[arg(long)]
    pub replay: Vec<PathBuf>,

    /// Project files to include in the preamble.
    #[arg(long = "file")]
    pub files: Vec<String>,

    /// Preamble template with `{{{FILE_TREE_JSON}}}` and
    /// `{{{FILE_REFERENCES}}}` placeholders.
    #[arg(long)]
    pub template: Option<PathBuf>,
}

/// Arguments for `pbp decode`.
///
/// The response is replayed in `--chunk`-byte fragments through the same
/// pipeline a live turn uses. A truncated response is reported, not
/// continued.
#[derive(clap::Args)]
pub struct DecodeArgs {
    /// File holding the model response.
    pub file: PathBuf,

    /// Fragment size in bytes.
    #[arg(long, default_value_t = 64)]
    pub chunk: usize,

    /// Write completed files to disk instead of only showing them.
    #[arg(long)]
    pub apply: bool,
}

/// Arguments for `pbp inspect`.
#[derive(clap::Args)]
pub struct InspectArgs {
    /// Text to inspect (a response or a saved conversation).
    pub file: PathBuf,

    /// Show the first 80 characters of each block's content.
    #[arg(long)]
    pub show_body: bool,

    /// Print one JSON object per block instead of text.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `pbp validate`.
#[derive(clap::Args)]
pub struct ValidateArgs {
    /// Text to validate.
    pub file: PathBuf,
}

/// Arguments for `pbp compact`.
#[derive(clap::Args)]
pub struct CompactArgs {
    /// Saved conversation.
    pub file: PathBuf,

    /// Write here instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for `pbp encode`.
#[derive(clap::Args)]
pub struct EncodeArgs {
    /// Files to frame, relative to the working directory.
    #[arg(required = true)]
    pub files: Vec<String>,

    /// Version written into every block.
    #[arg(long, default_value_t = 1)]
    pub version: u32,

    /// Split files into parts of at most this many bytes.
    #[arg(long)]
    pub part_limit: Option<usize>,

    /// Render the full preamble (template, file tree, files).
    #[arg(long)]
    pub preamble: bool,

    /// Write here instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = config::load(cli.config.as_deref()).and_then(|settings| match cli.command {
        Commands::Chat(args) => cmd_chat::run(&args, &settings),
        Commands::Decode(args) => cmd_decode::run(&args, &settings),
        Commands::Inspect(args) => cmd_inspect::run(&args),
        Commands::Validate(args) => cmd_validate::run(&args),
        Commands::Compact(args) => cmd_compact::run(&args),
        Commands::Encode(args) => cmd_encode::run(&args, &settings),
    });

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

/// Logs go to stderr. `PBP_LOG` takes precedence over `-v`.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env("PBP_LOG").unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

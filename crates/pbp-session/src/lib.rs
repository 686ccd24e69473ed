#![warn(clippy::pedantic)]

pub mod backend;
pub mod compaction;
pub mod config;
pub mod controller;
pub mod conversation;
pub mod error;
pub mod history_store;
pub mod references;
pub mod session;

pub use backend::{Backend, CommandBackend, ScriptedBackend};
pub use compaction::compact;
pub use config::SessionConfig;
pub use controller::{ContinuationController, ControllerState, FinalizedTurn, TurnObserver, TurnOutcome};
pub use conversation::{ContextStats, Conversation};
pub use error::{BackendError, SessionError};
pub use history_store::HistoryStore;
pub use references::{find_references, next_version};
pub use session::{Session, TurnReport};

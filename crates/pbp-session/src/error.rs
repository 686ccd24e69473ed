use std::path::PathBuf;

use pbp_driver::DriverError;
use pbp_encoder::EncodeError;

/// Failures talking to the model backend.
///
/// ```text
///   BackendError
///   ├── Spawn       ← the backend command could not be started
///   ├── Io          ← reading its output or writing the request failed
///   ├── Exit        ← it finished with a non-zero status
///   └── Exhausted   ← a scripted backend ran out of responses
/// ```
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("failed to start backend `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("backend I/O failed")]
    Io(#[from] std::io::Error),

    #[error("backend exited with {status}: {stderr}")]
    Exit { status: String, stderr: String },

    #[error("no scripted response left for request {request}")]
    Exhausted { request: usize },
}

/// Errors surfaced by a chat session. None of them end the session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Every allowed continuation ended truncated again.
    #[error("model appears stuck: response still incomplete after {attempts} continuations")]
    Stuck { attempts: usize },

    #[error("there is no interrupted turn to continue")]
    NoPendingTurn,

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error("history file {path}")]
    History {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

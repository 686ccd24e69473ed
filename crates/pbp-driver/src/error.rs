use std::path::PathBuf;

/// Errors from reading or writing project files.
///
/// ```text
/// ┌────────────────┬──────────────────────────────────────────────┐
/// │ Variant        │ Cause                                        │
/// ├────────────────┼──────────────────────────────────────────────┤
/// │ Read           │ Existing file could not be read              │
/// │ Write          │ File or its parent directories not writable  │
/// │ OutsideRoot    │ Path is absolute or climbs out with `..`     │
/// └────────────────┴──────────────────────────────────────────────┘
/// ```
///
/// Read failures are never fatal to presentation: the file is shown as
/// new. Write failures are reported per file.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("refusing to touch {path}: not inside the project root")]
    OutsideRoot { path: String },
}

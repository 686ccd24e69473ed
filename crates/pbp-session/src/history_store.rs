use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::SessionError;

/// The saved conversation of one working directory.
///
/// Each project directory gets its own file under a shared history
/// directory, named from the directory's last component and a BLAKE3
/// hash of its absolute path:
///
/// ```text
///   /home/ana/code/shop  ──▶  <history dir>/shop-3f9a1c0d2b7e4a61.txt
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The history file for `project_dir` inside `history_dir`.
    pub fn for_project(history_dir: &Path, project_dir: &Path) -> Self {
        let absolute = std::path::absolute(project_dir).unwrap_or_else(|_| project_dir.to_path_buf());
        let hash = blake3::hash(absolute.to_string_lossy().as_bytes());
        let hex = hash.to_hex();
        let name = absolute
            .file_name()
            .map_or_else(|| "root".to_string(), |n| n.to_string_lossy().into_owned());
        Self::new(history_dir.join(format!("{name}-{}.txt", &hex.as_str()[..16])))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The saved text, `None` when nothing has been saved yet.
    ///
    /// # Errors
    ///
    /// [`SessionError::History`] when the file exists but cannot be read.
    pub fn load(&self) -> Result<Option<String>, SessionError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(self.error(source)),
        }
    }

    /// Replace the saved text. A crash mid-save leaves the previous file
    /// in place.
    ///
    /// # Errors
    ///
    /// [`SessionError::History`] on any I/O failure.
    pub fn save(&self, text: &str) -> Result<(), SessionError> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| self.error(e))?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| self.error(e))?;
        tmp.write_all(text.as_bytes()).map_err(|e| self.error(e))?;
        tmp.persist(&self.path).map_err(|e| self.error(e.error))?;
        tracing::debug!(path = %self.path.display(), bytes = text.len(), "history saved");
        Ok(())
    }

    /// Delete the saved text, if any.
    ///
    /// # Errors
    ///
    /// [`SessionError::History`] when the file exists but cannot be
    /// removed.
    pub fn remove(&self) -> Result<(), SessionError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(self.error(source)),
        }
    }

    fn error(&self, source: std::io::Error) -> SessionError {
        SessionError::History {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_is_stable_per_directory() {
        let history = Path::new("/tmp/pbp-history");
        let a = HistoryStore::for_project(history, Path::new("/work/shop"));
        let again = HistoryStore::for_project(history, Path::new("/work/shop"));
        let other = HistoryStore::for_project(history, Path::new("/other/shop"));

        assert_eq!(a, again);
        assert_ne!(a, other);
        let name = a.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("shop-"), "{name}");
        assert!(name.ends_with(".txt"));
        assert_eq!(name.len(), "shop-".len() + 16 + ".txt".len());
    }

    #[test]
    fn save_load_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::for_project(&dir.path().join("nested"), Path::new("/work/app"));
        assert_eq!(store.load().unwrap(), None);

        store.save("first").unwrap();
        store.save("second").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("second"));

        store.remove().unwrap();
        assert_eq!(store.load().unwrap(), None);
        store.remove().unwrap();
    }
}

use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use crate::error::DriverError;

/// Where project files live.
///
/// Paths are the relative paths found in file blocks. Implementations
/// decide how they map to real locations.
pub trait Storage {
    /// Current text of `path`, `None` when it does not exist.
    ///
    /// # Errors
    ///
    /// [`DriverError::Read`] when the file exists but cannot be read as
    /// UTF-8 text, [`DriverError::OutsideRoot`] for paths escaping the
    /// project.
    fn read(&self, path: &str) -> Result<Option<String>, DriverError>;

    fn exists(&self, path: &str) -> bool;

    /// Replace `path` with `text`, creating parent directories.
    ///
    /// # Errors
    ///
    /// [`DriverError::Write`] or [`DriverError::OutsideRoot`].
    fn write(&mut self, path: &str, text: &str) -> Result<(), DriverError>;
}

/// Files under a root directory on disk.
///
/// Writes go to a temporary file in the target directory that is then
/// renamed over the target, so a reader never sees half a file.
#[derive(Clone, Debug)]
pub struct DiskStorage {
    root: PathBuf,
}

impl DiskStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Join a relative block path onto the root.
    ///
    /// # Errors
    ///
    /// [`DriverError::OutsideRoot`] for absolute paths and paths with
    /// `..` components.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, DriverError> {
        let relative = Path::new(path);
        let escapes = relative.components().any(|c| {
            matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_))
        });
        if escapes || path.is_empty() {
            return Err(DriverError::OutsideRoot {
                path: path.to_string(),
            });
        }
        Ok(self.root.join(relative))
    }
}

impl Storage for DiskStorage {
    fn read(&self, path: &str) -> Result<Option<String>, DriverError> {
        let full = self.resolve(path)?;
        match std::fs::read_to_string(&full) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(DriverError::Read { path: full, source }),
        }
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_ok_and(|full| full.is_file())
    }

    fn write(&mut self, path: &str, text: &str) -> Result<(), DriverError> {
        let full = self.resolve(path)?;
        let parent = full.parent().unwrap_or(&self.root).to_path_buf();
        let write_err = |source| DriverError::Write {
            path: full.clone(),
            source,
        };

        std::fs::create_dir_all(&parent).map_err(write_err)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(write_err)?;
        tmp.write_all(text.as_bytes()).map_err(write_err)?;
        tmp.persist(&full).map_err(|e| write_err(e.error))?;
        tracing::info!(path = %full.display(), bytes = text.len(), "file written");
        Ok(())
    }
}

/// In-memory files, for tests and dry runs.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    files: BTreeMap<String, String>,
    read_only: BTreeSet<String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_file(mut self, path: &str, text: &str) -> Self {
        self.files.insert(path.to_string(), text.to_string());
        self
    }

    /// Make writes to `path` fail with a permission error.
    #[must_use]
    pub fn with_read_only(mut self, path: &str) -> Self {
        self.read_only.insert(path.to_string());
        self
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn files(&self) -> &BTreeMap<String, String> {
        &self.files
    }
}

impl Storage for MemoryStorage {
    fn read(&self, path: &str) -> Result<Option<String>, DriverError> {
        Ok(self.files.get(path).cloned())
    }

    fn exists(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    fn write(&mut self, path: &str, text: &str) -> Result<(), DriverError> {
        if self.read_only.contains(path) {
            return Err(DriverError::Write {
                path: PathBuf::from(path),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "read-only"),
            });
        }
        self.files.insert(path.to_string(), text.to_string());
        Ok(())
    }
}

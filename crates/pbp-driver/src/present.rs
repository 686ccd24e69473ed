use std::borrow::Cow;
use std::collections::BTreeMap;

use pbp_types::{FileIdentity, Lang};

use crate::config::DriverConfig;
use crate::diff::unified_diff;
use crate::error::DriverError;
use crate::storage::Storage;

/// How a reassembled file is shown to the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Presentation {
    pub body: String,
    /// Fence tag: `diff` for diffs, otherwise the file's language.
    pub language: String,
    pub is_diff: bool,
}

/// Give non-empty text a trailing newline.
pub fn normalize(content: &str) -> Cow<'_, str> {
    if content.is_empty() || content.ends_with('\n') {
        Cow::Borrowed(content)
    } else {
        Cow::Owned(format!("{content}\n"))
    }
}

/// Decide how to show `content` for `path`.
///
/// ```text
///   path exists in storage ──yes──▶ diff disk → content
///          │                           │
///          no / read error        non-empty? ──yes──▶ diff
///          │                           │
///          ▼                           no
///   full content, language ◀───────────┘
///   from extension / shebang
/// ```
pub fn present<S: Storage + ?Sized>(path: &str, content: &str, storage: &S, config: &DriverConfig) -> Presentation {
    let content = normalize(content);

    let disk = if storage.exists(path) {
        storage.read(path).unwrap_or_else(|e| {
            tracing::warn!(path, error = %e, "could not read existing file, showing it as new");
            None
        })
    } else {
        None
    };

    if let Some(disk) = disk {
        let diff = unified_diff(path, &disk, &content, config.diff_context);
        if !diff.is_empty() {
            return Presentation {
                body: diff,
                language: Lang::Diff.as_str().to_string(),
                is_diff: true,
            };
        }
    }

    Presentation {
        language: Lang::infer(path, content.lines().next()).as_str().to_string(),
        body: content.into_owned(),
        is_diff: false,
    }
}

/// Write the full (never diffed) content of `path`.
///
/// # Errors
///
/// Whatever [`Storage::write`] reports.
pub fn write_back<S: Storage + ?Sized>(path: &str, content: &str, storage: &mut S) -> Result<(), DriverError> {
    storage.write(path, &normalize(content))
}

/// Write every file, continuing past failures. Returns the failures.
pub fn write_all<S: Storage + ?Sized>(files: &BTreeMap<FileIdentity, String>, storage: &mut S) -> Vec<DriverError> {
    let mut failures = Vec::new();
    for (identity, content) in files {
        if let Err(e) = write_back(&identity.path, content, storage) {
            tracing::error!(%identity, error = %e, "write failed");
            failures.push(e);
        }
    }
    failures
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::storage::MemoryStorage;

    fn config() -> DriverConfig {
        DriverConfig::default()
    }

    #[test]
    fn new_file_is_shown_verbatim() {
        let shown = present("new.py", "x=1", &MemoryStorage::new(), &config());
        assert_eq!(
            shown,
            Presentation {
                body: "x=1\n".to_string(),
                language: "python".to_string(),
                is_diff: false,
            }
        );
    }

    #[test]
    fn extensionless_new_file_uses_shebang() {
        let shown = present("run", "#!/bin/bash\necho hi\n", &MemoryStorage::new(), &config());
        assert_eq!(shown.language, "bash");
        let shown = present("README", "plain words", &MemoryStorage::new(), &config());
        assert_eq!(shown.language, "text");
    }

    #[test]
    fn changed_file_is_shown_as_diff() {
        let storage = MemoryStorage::new().with_file("a.py", "x = 1\ny = 2\n");
        let shown = present("a.py", "x = 1\ny = 3", &storage, &config());
        assert!(shown.is_diff);
        assert_eq!(shown.language, "diff");
        assert_eq!(
            shown.body,
            "--- a.py (disk)\n+++ a.py (context)\n@@ -1,2 +1,2 @@\n x = 1\n-y = 2\n+y = 3\n"
        );
    }

    #[test]
    fn unchanged_file_is_shown_in_full() {
        let storage = MemoryStorage::new().with_file("a.rs", "fn a() {}\n");
        let shown = present("a.rs", "fn a() {}", &storage, &config());
        assert!(!shown.is_diff);
        assert_eq!(shown.language, "rust");
        assert_eq!(shown.body, "fn a() {}\n");
    }

    #[test]
    fn write_back_writes_full_normalized_content() {
        let mut storage = MemoryStorage::new().with_file("a.py", "old\n");
        write_back("a.py", "new", &mut storage).unwrap();
        assert_eq!(storage.get("a.py"), Some("new\n"));
        write_back("empty.py", "", &mut storage).unwrap();
        assert_eq!(storage.get("empty.py"), Some(""));
    }

    #[test]
    fn write_all_continues_past_failures() {
        let mut storage = MemoryStorage::new().with_read_only("locked.py");
        let files = BTreeMap::from([
            (FileIdentity::new("locked.py", 1), "a".to_string()),
            (FileIdentity::new("open.py", 1), "b".to_string()),
        ]);
        let failures = write_all(&files, &mut storage);
        assert_eq!(failures.len(), 1);
        assert_eq!(storage.get("open.py"), Some("b\n"));
    }

    #[test]
    fn unreadable_file_is_treated_as_new() {
        struct Broken;
        impl Storage for Broken {
            fn read(&self, path: &str) -> Result<Option<String>, DriverError> {
                Err(DriverError::OutsideRoot { path: path.to_string() })
            }
            fn exists(&self, _: &str) -> bool {
                true
            }
            fn write(&mut self, _: &str, _: &str) -> Result<(), DriverError> {
                Ok(())
            }
        }
        let shown = present("pkg.py", "x = 1\n", &Broken, &config());
        assert!(!shown.is_diff);
        assert_eq!(shown.body, "x = 1\n");
    }
}

use std::fmt;

/// Key of one file transfer: a path at a specific version.
///
/// Versions are assigned by whoever injects file content into the
/// context. Decoding only compares and orders them. Ordering is by path
/// first, then version, so a `BTreeMap<FileIdentity, _>` groups every
/// version of a path together, lowest first.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileIdentity {
    pub path: String,
    pub version: u32,
}

impl FileIdentity {
    pub fn new(path: impl Into<String>, version: u32) -> Self {
        Self {
            path: path.into(),
            version,
        }
    }
}

impl fmt::Display for FileIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (v{})", self.path, self.version)
    }
}

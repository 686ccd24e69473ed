use crate::error::WireError;
use crate::token::RESERVED;

/// Field names understood by the block grammar.
pub mod field {
    pub const PATH: &str = "Path";
    pub const LANGUAGE: &str = "Language";
    pub const VERSION: &str = "Version";
    pub const PART: &str = "Part";
    pub const NO_MORE_PARTS: &str = "NoMoreParts";
    pub const NAME: &str = "Name";
    pub const SESSION: &str = "Session";
}

/// A block's metadata header: the `Key: Value` lines between a start
/// token and its metadata end token.
///
/// Parsing is lenient. Each line is matched against
/// `^\s*(Key)\s*:\s*(Value)\s*$`; lines without a colon or with an empty
/// key are skipped, and nothing here ever fails. Typed coercion (integer
/// and boolean fields) also falls back to defaults instead of erroring, so
/// a sloppy header degrades to default metadata rather than a lost block.
///
/// Field order is preserved for writing. When a key repeats, lookups see
/// the last occurrence.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetadataHeader {
    fields: Vec<(String, String)>,
}

impl MetadataHeader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a raw header block.
    pub fn parse(raw: &str) -> Self {
        let mut fields = Vec::new();
        for line in raw.lines() {
            let Some((key, value)) = line.split_once(':') else {
                if !line.trim().is_empty() {
                    tracing::debug!(line, "skipping metadata line without a key");
                }
                continue;
            };
            let key = key.trim();
            if key.is_empty() {
                tracing::debug!(line, "skipping metadata line with an empty key");
                continue;
            }
            fields.push((key.to_string(), value.trim().to_string()));
        }
        Self { fields }
    }

    /// Look up a field's raw value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Non-empty value of a field, if any.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    /// Integer value of a field, or `default` when the field is absent or
    /// does not parse as an unsigned integer.
    pub fn int_or(&self, key: &str, default: u32) -> u32 {
        match self.get(key) {
            None => default,
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::debug!(key, raw, default, "malformed integer metadata, using default");
                default
            }),
        }
    }

    /// Boolean value of a field, case-insensitive. `None` when absent;
    /// anything other than `true` reads as `false`.
    pub fn flag(&self, key: &str) -> Option<bool> {
        self.get(key).map(|v| v.eq_ignore_ascii_case("true"))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Append a field for writing.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::InvalidKey`] for empty keys or keys containing
    /// `:` or a line break, [`WireError::MultilineValue`] for values with a
    /// line break, and [`WireError::ReservedToken`] when either side would
    /// embed a delimiter token.
    pub fn push(&mut self, key: &str, value: impl Into<String>) -> Result<&mut Self, WireError> {
        let value = value.into();
        if key.trim().is_empty() || key.contains([':', '\n', '\r']) {
            return Err(WireError::InvalidKey {
                key: key.to_string(),
            });
        }
        if value.contains(['\n', '\r']) {
            return Err(WireError::MultilineValue {
                key: key.to_string(),
            });
        }
        if let Some(token) = find_reserved(&value) {
            return Err(WireError::ReservedToken { token });
        }
        self.fields.push((key.to_string(), value));
        Ok(self)
    }

    /// Write the header lines, one `Key: Value` per line, each terminated
    /// by `\n`.
    pub fn write_to(&self, out: &mut String) {
        for (key, value) in &self.fields {
            out.push_str(key);
            out.push_str(": ");
            out.push_str(value);
            out.push('\n');
        }
    }
}

/// First reserved delimiter token contained in `text`, if any.
pub fn find_reserved(text: &str) -> Option<&'static str> {
    RESERVED.into_iter().find(|token| text.contains(token))
}

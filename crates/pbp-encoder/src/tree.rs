//! JSON listing of the files placed in context.
//!
//! Only the paths handed in are listed; nothing here walks the file
//! system.

use serde_json::{Map, Value};

use crate::error::EncodeError;

/// Nest `paths` into a JSON object: directories become objects, files
/// become `null`.
///
/// ```text
///   ["src/main.rs", "src/lib.rs", "Cargo.toml"]
///     → {"Cargo.toml":null,"src":{"lib.rs":null,"main.rs":null}}
/// ```
///
/// # Errors
///
/// [`EncodeError::Json`] if serialization fails.
pub fn file_tree_json<'a>(paths: impl IntoIterator<Item = &'a str>) -> Result<String, EncodeError> {
    let mut root = Map::new();
    for path in paths {
        let mut components: Vec<&str> = path.split('/').filter(|c| !c.is_empty() && *c != ".").collect();
        let Some(file) = components.pop() else {
            continue;
        };
        insert(&mut root, &components, file);
    }
    Ok(serde_json::to_string(&Value::Object(root))?)
}

/// A path seen first as a file and later as a directory becomes a
/// directory.
fn insert(dir: &mut Map<String, Value>, components: &[&str], file: &str) {
    match components.split_first() {
        None => {
            dir.entry(file).or_insert(Value::Null);
        }
        Some((head, rest)) => {
            let entry = dir.entry(*head).or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(child) = entry {
                insert(child, rest, file);
            }
        }
    }
}

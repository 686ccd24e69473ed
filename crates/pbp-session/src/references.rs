//! `@path` mentions in user input.

use pbp_decoder::BlockDecoder;

/// Paths mentioned as `@path` in `input`, in first-mention order.
///
/// A mention runs from the `@` to the end of the word. Trailing
/// punctuation is not part of the path, so `see @src/main.rs.` refers to
/// `src/main.rs`.
pub fn find_references(input: &str) -> Vec<String> {
    let mut paths: Vec<String> = Vec::new();
    for word in input.split_whitespace() {
        let Some(at) = word.find('@') else {
            continue;
        };
        let path = word[at + 1..].trim_end_matches(|c: char| !(c.is_alphanumeric() || c == '_'));
        if !path.is_empty() && !paths.iter().any(|p| p == path) {
            paths.push(path.to_string());
        }
    }
    paths
}

/// Version to give `path` when it is added to `context` again: one past
/// the highest version any file block in the text carries, or 1.
pub fn next_version(context: &str, path: &str) -> u32 {
    BlockDecoder::decode(context)
        .files()
        .filter(|(file, _)| file.path == path)
        .map(|(file, _)| file.version)
        .max()
        .map_or(1, |latest| latest.saturating_add(1))
}

#[cfg(test)]
mod tests {
    use pbp_encoder::ContextEncoder;

    use super::*;

    #[test]
    fn mentions_are_trimmed_and_deduplicated() {
        let refs = find_references("look at @src/main.rs, then @lib/util.py. And @src/main.rs again (@notes_)");
        assert_eq!(refs, ["src/main.rs", "lib/util.py", "notes_"]);
    }

    #[test]
    fn bare_at_signs_are_ignored() {
        assert!(find_references("email me @ noon, or @!?").is_empty());
    }

    #[test]
    fn next_version_follows_history() {
        let mut encoder = ContextEncoder::new();
        encoder.add_file("a.py", 1, "x\n").unwrap();
        encoder.add_file("a.py", 3, "y\n").unwrap();
        encoder.add_file("b.py", 7, "z\n").unwrap();
        let context = encoder.finish();
        assert_eq!(next_version(&context, "a.py"), 4);
        assert_eq!(next_version(&context, "c.py"), 1);
    }
}

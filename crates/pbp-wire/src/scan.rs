//! Token search helpers shared by the incremental and whole-text decoders.
//!
//! The decoders never re-scan text they have already ruled out. After an
//! unsuccessful search they remember how far they got, backing off by
//! `token.len() - 1` bytes so a token split across two fragments is still
//! found once the second half arrives.

/// Find the earliest occurrence of any needle in `haystack[from..]`.
///
/// Returns the absolute byte offset of the match and the index of the
/// needle that matched. Ties cannot happen for the grammar's start tokens
/// (none is a prefix of another), but the lowest index wins if they do.
pub fn find_earliest(haystack: &str, from: usize, needles: &[&str]) -> Option<(usize, usize)> {
    let from = floor_char_boundary(haystack, from);
    let tail = &haystack[from..];
    needles
        .iter()
        .enumerate()
        .filter_map(|(idx, needle)| tail.find(needle).map(|pos| (from + pos, idx)))
        .min_by_key(|&(pos, idx)| (pos, idx))
}

/// Find `needle` in `haystack[from..]`, returning an absolute offset.
pub fn find_from(haystack: &str, from: usize, needle: &str) -> Option<usize> {
    let from = floor_char_boundary(haystack, from);
    haystack[from..].find(needle).map(|pos| from + pos)
}

/// The offset a failed search for a token of `token_len` bytes should
/// resume from once more text has been appended.
pub fn resume_offset(haystack: &str, floor: usize, token_len: usize) -> usize {
    let candidate = haystack.len().saturating_sub(token_len.saturating_sub(1));
    floor_char_boundary(haystack, candidate.max(floor))
}

/// Largest `char` boundary in `s` that is `<= index`.
pub fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut idx = index;
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Byte offset just past the last `\n` in `s`, or `0` if there is none.
pub fn last_line_end(s: &str) -> usize {
    s.rfind('\n').map_or(0, |pos| pos + 1)
}

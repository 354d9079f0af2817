//! Relative path composition.

/// Join path segments with a single `/`.
///
/// Leading and trailing slashes are trimmed from each segment independently. Empty segments are
/// kept, so `join(&["a", "", "b"])` is `"a//b"`: a component that happens to be empty at a given
/// position is still a component.
pub fn join<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(|segment| segment.as_ref().trim_matches('/'))
        .collect::<Vec<_>>()
        .join("/")
}

/// Percent-escape a single path segment.
///
/// `.` and `..` come out unchanged, and URL resolution removes them (`%2E` is treated the same
/// way). Values that end up as a segment are checked with [is_dot_segment] first.
pub fn escape(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

/// Whether `segment` would be removed from a path, along with its parent for `..`, when the path
/// is resolved.
pub fn is_dot_segment(segment: &str) -> bool {
    matches!(segment, "." | "..")
}

//! Keyword matching for candidate file names.

/// Returns `true` iff any keyword is a contiguous substring of `filename`.
///
/// Matching is case-sensitive and applies no normalization. An empty keyword
/// list matches nothing.
pub fn matches<S: AsRef<str>>(filename: &str, keywords: &[S]) -> bool {
    keywords
        .iter()
        .any(|keyword| filename.contains(keyword.as_ref()))
}

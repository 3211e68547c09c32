//! Parameterised keyword matching tests for `spool-core`.

use std::path::Path;

use rstest::rstest;
use spool_core::config::DEFAULT_KEYWORDS;
use spool_core::matcher::matches;
use spool_core::KeywordSet;

// ---------------------------------------------------------------------------
// Default keyword set
// ---------------------------------------------------------------------------

#[rstest]
#[case("WorkConfirmation_2291.pdf", true)]
#[case("label_001.pdf", true)]
#[case("order_88_shipper.pdf", true)]
#[case("PackingList_7.pdf", true)]
#[case("notes.txt", false)]
#[case("packinglist_7.pdf", false)]
#[case("LABEL_001.pdf", false)]
#[case("label-001.pdf", false)]
#[case("", false)]
fn default_keywords(#[case] filename: &str, #[case] expected: bool) {
    assert_eq!(matches(filename, &DEFAULT_KEYWORDS), expected, "{filename}");
}

// ---------------------------------------------------------------------------
// Substring semantics
// ---------------------------------------------------------------------------

#[rstest]
#[case(&["label_"], "label_", true)]
#[case(&["label_"], "xxlabel_yy", true)]
#[case(&["abc"], "ab", false)]
#[case(&["*.pdf"], "label.pdf", false)]
#[case(&["a.c"], "abc", false)]
#[case(&["x", "y", "z"], "only_z", true)]
fn substring_not_pattern(#[case] keywords: &[&str], #[case] filename: &str, #[case] expected: bool) {
    assert_eq!(matches(filename, keywords), expected);
}

#[test]
fn empty_keyword_set_matches_nothing() {
    let keywords = KeywordSet::default();
    for name in ["", "label_001.pdf", "anything"] {
        assert!(!keywords.matches(name), "{name} should not match");
    }
}

#[test]
fn match_iff_some_keyword_is_contained() {
    let keywords = ["ab", "cd", "_x_"];
    let names = ["ab", "abcd", "xcdx", "a_x_b", "ba", "dc", "_x", "plain"];
    for name in names {
        let expected = keywords.iter().any(|k| name.contains(k));
        assert_eq!(matches(name, &keywords), expected, "{name}");
    }
}

#[test]
fn scenario_a_only_label_file_matches() {
    let keywords = KeywordSet::new(["label_"]);
    assert!(keywords.matches_path(Path::new("/inbox/label_001.pdf")));
    assert!(!keywords.matches_path(Path::new("/inbox/notes.txt")));
}

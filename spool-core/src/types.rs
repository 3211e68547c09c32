//! Domain types for spool.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem paths.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::matcher;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Printer identifier as understood by the print subsystem (a CUPS queue name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrinterTarget(pub String);

impl fmt::Display for PrinterTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for PrinterTarget {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PrinterTarget {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Ordered set of case-sensitive substrings; a file name matches if it
/// contains any member.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeywordSet(Vec<String>);

impl KeywordSet {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(keywords.into_iter().map(Into::into).collect())
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn matches(&self, filename: &str) -> bool {
        matcher::matches(filename, &self.0)
    }

    /// Match against the final path component only. Invalid UTF-8 in the
    /// name is replaced lossily, so keywords still match the valid parts.
    pub fn matches_path(&self, path: &Path) -> bool {
        path.file_name()
            .map(|name| self.matches(&name.to_string_lossy()))
            .unwrap_or(false)
    }
}

impl fmt::Display for KeywordSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(", "))
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which intake source drives the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IntakeMode {
    /// Subscribe to OS filesystem notifications.
    #[default]
    Events,
    /// List the directory on a fixed interval.
    Poll,
}

impl fmt::Display for IntakeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntakeMode::Events => write!(f, "events"),
            IntakeMode::Poll => write!(f, "poll"),
        }
    }
}

/// What the intake source knows about whether the writer is finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// A close-after-write was observed; the file is complete.
    Closed,
    /// The entry appeared (or changed); the writer may still be active.
    Appeared,
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// A filesystem entry observed by an intake source, not yet known to match
/// or to be fully written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub path: PathBuf,
    pub detected_at: DateTime<Utc>,
    pub readiness: Readiness,
}

impl CandidateFile {
    pub fn new(path: impl Into<PathBuf>, readiness: Readiness) -> Self {
        Self {
            path: path.into(),
            detected_at: Utc::now(),
            readiness,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn printer_target_display() {
        assert_eq!(PrinterTarget::from("HP_LaserJet").to_string(), "HP_LaserJet");
    }

    #[test]
    fn keyword_set_matches_file_name_not_directory() {
        let keywords = KeywordSet::new(["label_"]);
        assert!(keywords.matches_path(Path::new("/tmp/in/label_001.pdf")));
        assert!(!keywords.matches_path(Path::new("/tmp/label_dir/notes.txt")));
    }

    #[cfg(unix)]
    #[test]
    fn keyword_set_matches_non_utf8_file_name() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let name = OsStr::from_bytes(b"label_\xff\xfe.pdf");
        let path = Path::new("/tmp/in").join(name);
        assert!(path.file_name().and_then(|n| n.to_str()).is_none());
        assert!(KeywordSet::new(["label_"]).matches_path(&path));
        assert!(!KeywordSet::new(["PackingList"]).matches_path(&path));
    }

    #[test]
    fn keyword_set_serializes_as_plain_list() {
        let keywords = KeywordSet::new(["a", "b"]);
        let yaml = serde_yaml::to_string(&keywords).expect("serialize");
        let back: Vec<String> = serde_yaml::from_str(&yaml).expect("deserialize");
        assert_eq!(back, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn intake_mode_display() {
        assert_eq!(IntakeMode::Events.to_string(), "events");
        assert_eq!(IntakeMode::Poll.to_string(), "poll");
    }
}

//! spool core library — domain types, configuration, keyword matching.
//!
//! - [`types`] — newtypes and domain structs
//! - [`matcher`] — file name keyword predicate
//! - [`config`] — YAML configuration load / save / validate
//! - [`error`] — [`ConfigError`]

pub mod config;
pub mod error;
pub mod matcher;
pub mod types;

pub use config::SpoolConfig;
pub use error::ConfigError;
pub use types::{CandidateFile, IntakeMode, KeywordSet, PrinterTarget, Readiness};

//! Batch log reducer.
//!
//! Turns a raw, repetitive log into a deduplicated verdict report:
//!
//! - [`load`] - read and deduplicate log lines
//! - [`classify`] - map lines to severity, sort key, and payload
//! - [`report`] - group and order classified entries
//! - [`render`] - colorized text output
//!
//! # Example
//!
//! ```
//! use optfuzz_triage::{render, ColorMode, Dialect, LogLines, Report};
//!
//! let log = "fail: B (Construct: 10)\nfail: A (Construct: 2)\npass: alpha\npass: alpha\n";
//! let lines = LogLines::from_text(log);
//! let report = Report::build(&lines, Dialect::Tagged.classifier().as_ref()).unwrap();
//!
//! let mut out = Vec::new();
//! render(&report, &mut out, ColorMode::Plain).unwrap();
//! assert_eq!(
//!     String::from_utf8(out).unwrap(),
//!     "[pass] alpha\n[fail] A (Construct: 2)\n[fail] B (Construct: 10)\n"
//! );
//! ```

pub mod classify;
pub mod load;
pub mod render;
pub mod report;

pub use classify::{
    CheckerClassifier, Classified, Dialect, Layout, LineClassifier, MergePolicy, Severity,
    SortKey, TaggedClassifier,
};
pub use load::{load, LogLines};
pub use render::{render, ColorMode};
pub use report::Report;

use optfuzz_common::error::TriageError;
use std::path::Path;

/// Load `path` and reduce it with the classifier for `dialect`.
///
/// A missing file yields an empty report.
///
/// # Errors
///
/// Returns [`TriageError::Io`] if the file exists but cannot be read and
/// [`TriageError::MalformedFailLine`] for a fail line without a construct id.
pub fn reduce(path: &Path, dialect: Dialect) -> Result<Report, TriageError> {
    let lines = load(path)?;
    Report::build(&lines, dialect.classifier().as_ref())
}

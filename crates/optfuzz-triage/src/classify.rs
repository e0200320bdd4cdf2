//! Line classifiers for the supported log dialects.
//!
//! A classifier maps one raw line to a severity, a sort key, and the
//! payload to print, or reports that the line is not a verdict. The
//! report pipeline is the same for every dialect; classifiers also say
//! how repeated keys merge and how entries are laid out.

use optfuzz_common::error::TriageError;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Verdict severity, ordered the way reports print it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Check passed.
    Pass,
    /// Suspicious but not failing.
    Warn,
    /// Check failed.
    Fail,
}

impl Severity {
    /// All severities in report order.
    pub const ALL: [Severity; 3] = [Severity::Pass, Severity::Warn, Severity::Fail];

    /// Short lowercase label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Warn => "warn",
            Self::Fail => "fail",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Ordering key of a report entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SortKey {
    /// Numeric key (construct id, checker line number).
    Number(u64),
    /// Lexicographic key.
    Text(String),
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// A line recognised as a verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    /// Severity of the verdict.
    pub severity: Severity,
    /// Ordering key within its severity group.
    pub key: SortKey,
    /// Text printed for the entry.
    pub payload: String,
}

/// How payloads sharing a key combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Keep every distinct payload.
    Accumulate,
    /// The last payload seen replaces earlier ones.
    Replace,
}

/// How entries are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// One line per payload, key not shown.
    Flat,
    /// One line per key: `<key>: <payload>, <payload>`.
    Keyed,
}

/// Maps raw log lines to verdicts.
pub trait LineClassifier {
    /// Classify one line. `Ok(None)` means the line is not a verdict.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::MalformedFailLine`] when a line looks like a
    /// verdict but lacks its required sort key.
    fn classify(&self, line: &str) -> Result<Option<Classified>, TriageError>;

    /// Merge rule for a severity group.
    fn merge_policy(&self, _severity: Severity) -> MergePolicy {
        MergePolicy::Accumulate
    }

    /// Output layout.
    fn layout(&self) -> Layout {
        Layout::Flat
    }
}

fn construct_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"Construct: (\d+)").expect("construct pattern is valid"))
}

fn checker_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\[Checker\] (Pass|Fail)! (\d+) \((.*)\)").expect("checker pattern is valid")
    })
}

/// Lines tagged `pass: `, `warn: `, or `fail: `.
///
/// Pass and warn entries sort by their text. Fail entries sort by the
/// `Construct: <n>` id embedded anywhere in the line, which is mandatory.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaggedClassifier;

impl TaggedClassifier {
    const PASS: &'static str = "pass: ";
    const WARN: &'static str = "warn: ";
    const FAIL: &'static str = "fail: ";
}

impl LineClassifier for TaggedClassifier {
    fn classify(&self, line: &str) -> Result<Option<Classified>, TriageError> {
        if let Some(rest) = line.strip_prefix(Self::PASS) {
            return Ok(Some(Classified {
                severity: Severity::Pass,
                key: SortKey::Text(rest.to_owned()),
                payload: rest.to_owned(),
            }));
        }

        if let Some(rest) = line.strip_prefix(Self::WARN) {
            return Ok(Some(Classified {
                severity: Severity::Warn,
                key: SortKey::Text(rest.to_owned()),
                payload: rest.to_owned(),
            }));
        }

        if let Some(rest) = line.strip_prefix(Self::FAIL) {
            let construct = construct_pattern()
                .captures(line)
                .and_then(|caps| caps[1].parse::<u64>().ok())
                .ok_or_else(|| TriageError::MalformedFailLine {
                    line: line.to_owned(),
                })?;
            return Ok(Some(Classified {
                severity: Severity::Fail,
                key: SortKey::Number(construct),
                payload: rest.to_owned(),
            }));
        }

        Ok(None)
    }
}

/// Runtime checker lines: `[Checker] Pass! <line> (<message>)` and
/// `[Checker] Fail! <line> (<message>)`.
///
/// A passing line number keeps only its latest message; a failing line
/// number keeps every distinct message.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckerClassifier;

impl LineClassifier for CheckerClassifier {
    fn classify(&self, line: &str) -> Result<Option<Classified>, TriageError> {
        let Some(caps) = checker_pattern().captures(line) else {
            return Ok(None);
        };

        let Ok(line_number) = caps[2].parse::<u64>() else {
            tracing::debug!(line, "Checker line number out of range, ignored");
            return Ok(None);
        };

        let severity = if &caps[1] == "Pass" {
            Severity::Pass
        } else {
            Severity::Fail
        };

        Ok(Some(Classified {
            severity,
            key: SortKey::Number(line_number),
            // Update kinds are written space-terminated: `(kind1 kind2 )`
            payload: caps[3].trim().to_owned(),
        }))
    }

    fn merge_policy(&self, severity: Severity) -> MergePolicy {
        match severity {
            Severity::Pass => MergePolicy::Replace,
            Severity::Warn | Severity::Fail => MergePolicy::Accumulate,
        }
    }

    fn layout(&self) -> Layout {
        Layout::Keyed
    }
}

/// Supported log dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// `pass: ` / `warn: ` / `fail: ` tagged lines.
    #[default]
    Tagged,
    /// `[Checker] Pass!` / `[Checker] Fail!` lines.
    Checker,
}

impl Dialect {
    /// Classifier for this dialect.
    #[must_use]
    pub fn classifier(self) -> Box<dyn LineClassifier> {
        match self {
            Self::Tagged => Box::new(TaggedClassifier),
            Self::Checker => Box::new(CheckerClassifier),
        }
    }
}

//! Log file loading.

use optfuzz_common::error::TriageError;
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

/// Distinct log lines, each placed at its last appearance.
///
/// Keeping the last position means a classifier that replaces earlier
/// verdicts sees the same winner it would see in the raw log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogLines {
    lines: Vec<String>,
}

impl LogLines {
    /// Split `text` into lines, dropping exact duplicates.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        let mut seen = HashSet::new();
        let mut lines: Vec<String> = text
            .lines()
            .rev()
            .filter(|line| seen.insert(*line))
            .map(str::to_owned)
            .collect();
        lines.reverse();
        Self { lines }
    }

    /// Iterate over the distinct lines.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// True when the log had no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Read a log file. A missing file is an empty log.
///
/// # Errors
///
/// Returns [`TriageError::Io`] for any read failure other than the file
/// not existing, including invalid UTF-8.
pub fn load(path: &Path) -> Result<LogLines, TriageError> {
    match std::fs::read_to_string(path) {
        Ok(text) => {
            let lines = LogLines::from_text(&text);
            debug!(path = %path.display(), distinct = lines.len(), "Log loaded");
            Ok(lines)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "Log file absent, nothing to report");
            Ok(LogLines::default())
        }
        Err(source) => Err(TriageError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

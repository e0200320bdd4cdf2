//! Transient artifact cleanup.
//!
//! The source, IR, and binary paths are overwritten every iteration and
//! removed once when the campaign ends. Removal is best-effort: a file
//! that was never produced is not an error.

use optfuzz_common::config::ArtifactPaths;
use std::io::ErrorKind;
use tracing::{debug, warn};

/// Remove every artifact that exists. Returns how many files were removed.
pub fn remove_artifacts(paths: &ArtifactPaths) -> usize {
    let mut removed = 0;
    for path in paths.all() {
        match std::fs::remove_file(path) {
            Ok(()) => {
                debug!(path = %path.display(), "Removed artifact");
                removed += 1;
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove artifact"),
        }
    }
    removed
}

/// Removes the campaign artifacts when dropped.
///
/// Held for the duration of a campaign so that completion, a toolchain
/// abort, and a panic all leave the working directory clean.
#[derive(Debug)]
pub struct ArtifactGuard {
    paths: ArtifactPaths,
}

impl ArtifactGuard {
    /// Guard the given artifact paths.
    #[must_use]
    pub fn new(paths: ArtifactPaths) -> Self {
        Self { paths }
    }

    /// Paths under guard.
    #[must_use]
    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    /// Remove the artifacts now. Safe to call repeatedly.
    pub fn cleanup(&self) -> usize {
        remove_artifacts(&self.paths)
    }
}

impl Drop for ArtifactGuard {
    fn drop(&mut self) {
        self.cleanup();
    }
}

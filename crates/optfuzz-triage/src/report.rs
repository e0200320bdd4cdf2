//! Grouped, ordered verdict report.

use crate::classify::{Layout, LineClassifier, MergePolicy, Severity, SortKey};
use crate::load::LogLines;
use optfuzz_common::error::TriageError;
use std::collections::{BTreeMap, BTreeSet};

type Group = BTreeMap<SortKey, BTreeSet<String>>;

/// Classified log contents, ordered by severity then key.
///
/// Payloads under one key are kept sorted, so two builds from the same
/// lines are always identical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    groups: BTreeMap<Severity, Group>,
    layout: Layout,
}

impl Report {
    /// Classify every line and fold the verdicts into a report.
    ///
    /// Lines the classifier does not recognise are ignored.
    ///
    /// # Errors
    ///
    /// Stops at the first line the classifier rejects; no partial report
    /// is produced.
    pub fn build<C>(lines: &LogLines, classifier: &C) -> Result<Self, TriageError>
    where
        C: LineClassifier + ?Sized,
    {
        let mut groups: BTreeMap<Severity, Group> = BTreeMap::new();

        for line in lines.iter() {
            let Some(verdict) = classifier.classify(line)? else {
                continue;
            };

            let group = groups.entry(verdict.severity).or_default();
            match classifier.merge_policy(verdict.severity) {
                MergePolicy::Accumulate => {
                    group.entry(verdict.key).or_default().insert(verdict.payload);
                }
                MergePolicy::Replace => {
                    group.insert(verdict.key, BTreeSet::from([verdict.payload]));
                }
            }
        }

        Ok(Self {
            groups,
            layout: classifier.layout(),
        })
    }

    /// Entries of one severity in ascending key order.
    pub fn entries(
        &self,
        severity: Severity,
    ) -> impl Iterator<Item = (&SortKey, &BTreeSet<String>)> + '_ {
        self.groups.get(&severity).into_iter().flatten()
    }

    /// Number of keyed entries of one severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.groups.get(&severity).map_or(0, BTreeMap::len)
    }

    /// True when no line was recognised.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.values().all(BTreeMap::is_empty)
    }

    /// Layout requested by the classifier that built this report.
    #[must_use]
    pub fn layout(&self) -> Layout {
        self.layout
    }
}

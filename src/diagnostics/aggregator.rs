// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Thread-safe diagnostics aggregation

use super::entry::{DiagnosticsEntry, Severity};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::time::Duration;
use url::Url;

/// Sink analysis stages publish diagnostics into
///
/// Implementations must accept concurrent `publish` calls from any thread.
pub trait DiagnosticsSink: Send + Sync {
    /// Append `entry` to the sequence kept for `document`
    fn publish(&self, document: &Url, entry: DiagnosticsEntry);

    /// All entries across all documents; per-document order is publish order
    fn snapshot(&self) -> Vec<DiagnosticsEntry>;

    /// Entries published for `document`, in publish order
    fn for_document(&self, document: &Url) -> Vec<DiagnosticsEntry>;

    /// Batching interval a real publisher should consult
    fn publishing_delay(&self) -> Duration;
}

/// Summary statistics for collected diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiagnosticsSummary {
    /// Total number of diagnostics
    pub total_count: usize,
    /// Number of error diagnostics
    pub error_count: usize,
    /// Number of warning diagnostics
    pub warning_count: usize,
    /// Number of info diagnostics
    pub info_count: usize,
    /// Number of hint diagnostics
    pub hint_count: usize,
    /// Number of documents with at least one diagnostic
    pub document_count: usize,
}

impl DiagnosticsSummary {
    /// Highest severity present, if any
    pub fn overall_severity(&self) -> Option<Severity> {
        if self.error_count > 0 {
            Some(Severity::Error)
        } else if self.warning_count > 0 {
            Some(Severity::Warning)
        } else if self.info_count > 0 {
            Some(Severity::Information)
        } else if self.hint_count > 0 {
            Some(Severity::Hint)
        } else {
            None
        }
    }
}

/// Mutex-guarded map from document identity to its diagnostics
///
/// Every read copies the entries out under the lock, so a snapshot is never
/// affected by writers that publish after it was taken.
#[derive(Debug, Default)]
pub struct DiagnosticsAggregator {
    entries: Mutex<IndexMap<Url, Vec<DiagnosticsEntry>>>,
    publishing_delay: Duration,
}

impl DiagnosticsAggregator {
    /// Create an empty aggregator
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty aggregator carrying a publishing delay
    pub fn with_publishing_delay(publishing_delay: Duration) -> Self {
        Self {
            entries: Mutex::new(IndexMap::new()),
            publishing_delay,
        }
    }

    /// Documents with at least one entry
    pub fn documents(&self) -> Vec<Url> {
        self.entries.lock().keys().cloned().collect()
    }

    /// Total number of entries
    pub fn len(&self) -> usize {
        self.entries.lock().values().map(Vec::len).sum()
    }

    /// True when nothing was published
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all entries for `document`, returning how many were removed
    pub fn clear_document(&self, document: &Url) -> usize {
        self.entries
            .lock()
            .shift_remove(document)
            .map_or(0, |entries| entries.len())
    }

    /// Counts per severity
    pub fn summary(&self) -> DiagnosticsSummary {
        let entries = self.entries.lock();
        let mut summary = DiagnosticsSummary {
            document_count: entries.values().filter(|list| !list.is_empty()).count(),
            ..DiagnosticsSummary::default()
        };

        for entry in entries.values().flatten() {
            summary.total_count += 1;
            match entry.severity {
                Severity::Error => summary.error_count += 1,
                Severity::Warning => summary.warning_count += 1,
                Severity::Information => summary.info_count += 1,
                Severity::Hint => summary.hint_count += 1,
            }
        }

        summary
    }
}

impl DiagnosticsSink for DiagnosticsAggregator {
    fn publish(&self, document: &Url, entry: DiagnosticsEntry) {
        log::trace!("publishing diagnostic for {document}: {entry}");
        self.entries
            .lock()
            .entry(document.clone())
            .or_default()
            .push(entry);
    }

    fn snapshot(&self) -> Vec<DiagnosticsEntry> {
        self.entries.lock().values().flatten().cloned().collect()
    }

    fn for_document(&self, document: &Url) -> Vec<DiagnosticsEntry> {
        self.entries
            .lock()
            .get(document)
            .cloned()
            .unwrap_or_default()
    }

    fn publishing_delay(&self) -> Duration {
        self.publishing_delay
    }
}

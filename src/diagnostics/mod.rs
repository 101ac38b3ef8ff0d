//! Diagnostics collection for analysis runs
//!
//! Analysis stages publish [`DiagnosticsEntry`] values into a [`DiagnosticsSink`]
//! from arbitrary worker threads; consumers read a flattened snapshot.

pub mod aggregator;
pub mod entry;

pub use aggregator::{DiagnosticsAggregator, DiagnosticsSink, DiagnosticsSummary};
pub use entry::{DiagnosticsEntry, Severity};

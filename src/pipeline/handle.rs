//! Result of a completed run

use crate::analysis::Analysis;
use crate::diagnostics::DiagnosticsEntry;
use crate::document::Document;
use crate::registry::ServiceRegistry;
use crate::syntax::SyntaxTree;
use std::fmt;
use std::sync::Arc;
use url::Url;

/// Analysis of one run together with the services that produced it
#[derive(Clone)]
pub struct AnalysisHandle {
    registry: Arc<ServiceRegistry>,
    document: Arc<dyn Document>,
    syntax: Arc<SyntaxTree>,
    analysis: Arc<Analysis>,
}

impl AnalysisHandle {
    pub(crate) fn new(
        registry: Arc<ServiceRegistry>,
        document: Arc<dyn Document>,
        syntax: Arc<SyntaxTree>,
        analysis: Arc<Analysis>,
    ) -> Self {
        Self {
            registry,
            document,
            syntax,
            analysis,
        }
    }

    /// Registry the run was composed from
    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    /// Analysed document
    pub fn document(&self) -> &Arc<dyn Document> {
        &self.document
    }

    /// Identity of the analysed document
    pub fn uri(&self) -> &Url {
        self.document.uri()
    }

    /// Syntax tree of the document
    pub fn syntax_tree(&self) -> &Arc<SyntaxTree> {
        &self.syntax
    }

    /// Semantic analysis of the document
    pub fn analysis(&self) -> &Arc<Analysis> {
        &self.analysis
    }

    /// Snapshot of everything the run's diagnostics sink holds
    pub fn diagnostics(&self) -> Vec<DiagnosticsEntry> {
        self.registry
            .diagnostics()
            .map(|sink| sink.snapshot())
            .unwrap_or_default()
    }

    /// Diagnostics published for the analysed document
    pub fn document_diagnostics(&self) -> Vec<DiagnosticsEntry> {
        self.registry
            .diagnostics()
            .map(|sink| sink.for_document(self.uri()))
            .unwrap_or_default()
    }
}

impl fmt::Debug for AnalysisHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisHandle")
            .field("document", self.uri())
            .field("state", &self.document.state())
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

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

//! Documents under analysis
//!
//! A document is one unit of source text together with its lazily produced
//! syntax tree and semantic analysis. Both productions are single-flight and
//! memoized:
//!
//! ```text
//! Created -> SyntaxRequested -> SyntaxReady | SyntaxFailed
//!         -> AnalysisRequested -> AnalysisReady | AnalysisFailed
//! ```
//!
//! Requesting the analysis first implicitly awaits the syntax tree.

pub mod flight;
pub mod standalone;
pub mod table;

pub use flight::{FlightStatus, SingleFlight};
pub use standalone::StandaloneDocument;
pub use table::{DocumentTable, DocumentTableStats, InMemoryDocumentTable};

use crate::analysis::Analysis;
use crate::config::ModuleKind;
use crate::diagnostics::DiagnosticsSink;
use crate::engine::Analyzer;
use crate::error::{HarnessError, Result};
use crate::registry::ServiceRegistry;
use crate::resolver::DependencyResolver;
use crate::syntax::SyntaxTree;
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Identity and content of a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentInfo {
    /// Resource identifier, derived from the path
    pub uri: Url,
    /// File path of the document
    pub path: PathBuf,
    /// Module name
    pub module_name: String,
    /// Source text
    pub content: String,
    /// Module classification
    pub kind: ModuleKind,
}

impl DocumentInfo {
    /// Describe the document at an absolute `path`
    pub fn from_path(
        module_name: impl Into<String>,
        path: impl Into<PathBuf>,
        content: impl Into<String>,
        kind: ModuleKind,
    ) -> Result<Self> {
        let path = path.into();
        let uri = Url::from_file_path(&path)
            .map_err(|_| HarnessError::InvalidDocumentPath { path: path.clone() })?;

        Ok(Self {
            uri,
            path,
            module_name: module_name.into(),
            content: content.into(),
            kind,
        })
    }

    /// Number of lines in the source text
    pub fn line_count(&self) -> usize {
        self.content.lines().count()
    }
}

/// Lifecycle state of a document's productions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentState {
    /// Nothing requested yet
    Created,
    /// Syntax tree production in flight
    SyntaxRequested,
    /// Syntax tree cached
    SyntaxReady,
    /// Last syntax tree production failed
    SyntaxFailed,
    /// Analysis production in flight
    AnalysisRequested,
    /// Analysis cached
    AnalysisReady,
    /// Last analysis production failed
    AnalysisFailed,
}

impl DocumentState {
    /// Combine the status of the two productions
    pub fn from_flights(syntax: FlightStatus, analysis: FlightStatus) -> Self {
        match (analysis, syntax) {
            (FlightStatus::Ready, _) => DocumentState::AnalysisReady,
            (FlightStatus::Pending, _) => DocumentState::AnalysisRequested,
            (FlightStatus::Failed, _) => DocumentState::AnalysisFailed,
            (FlightStatus::Idle, FlightStatus::Ready) => DocumentState::SyntaxReady,
            (FlightStatus::Idle, FlightStatus::Pending) => DocumentState::SyntaxRequested,
            (FlightStatus::Idle, FlightStatus::Failed) => DocumentState::SyntaxFailed,
            (FlightStatus::Idle, FlightStatus::Idle) => DocumentState::Created,
        }
    }
}

/// One unit of source text under analysis
#[async_trait]
pub trait Document: Send + Sync {
    /// Identity and content
    fn info(&self) -> &Arc<DocumentInfo>;

    /// Resource identifier
    fn uri(&self) -> &Url {
        &self.info().uri
    }

    /// Current lifecycle state
    fn state(&self) -> DocumentState;

    /// Sink this document's analysis publishes into
    fn diagnostics_sink(&self) -> Option<&Arc<dyn DiagnosticsSink>> {
        None
    }

    /// Syntax tree, produced at most once concurrently and cached on success
    async fn syntax_tree(&self, cancel: &CancellationToken) -> Result<Arc<SyntaxTree>>;

    /// Semantic analysis; awaits the syntax tree first
    async fn analysis(&self, cancel: &CancellationToken) -> Result<Arc<Analysis>>;
}

/// Collaborators a document produces its results with
#[derive(Clone)]
pub struct DocumentServices {
    /// Syntax and analysis producer
    pub analyzer: Arc<dyn Analyzer>,
    /// Sink for published diagnostics
    pub diagnostics: Option<Arc<dyn DiagnosticsSink>>,
    /// Dependency resolver consulted during analysis
    pub resolver: Option<Arc<dyn DependencyResolver>>,
}

impl DocumentServices {
    /// Services with only an analyzer
    pub fn new(analyzer: Arc<dyn Analyzer>) -> Self {
        Self {
            analyzer,
            diagnostics: None,
            resolver: None,
        }
    }

    /// Attach a diagnostics sink
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticsSink>) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    /// Attach a dependency resolver
    pub fn with_resolver(mut self, resolver: Arc<dyn DependencyResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Take the services registered in `registry`; the analyzer is required
    pub fn from_registry(registry: &ServiceRegistry) -> Result<Self> {
        Ok(Self {
            analyzer: registry.require_analyzer()?,
            diagnostics: registry.diagnostics(),
            resolver: registry.resolver(),
        })
    }
}

impl fmt::Debug for DocumentServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentServices")
            .field("diagnostics", &self.diagnostics.is_some())
            .field("resolver", &self.resolver.is_some())
            .finish_non_exhaustive()
    }
}

//! Service-composition and async analysis-pipeline harness
//!
//! Assembles a per-run set of collaborating services, submits a block of source
//! text for two-stage analysis (syntax tree, then semantic analysis) and
//! collects the diagnostics published along the way.
//!
//! ```no_run
//! use analysis_harness::{HarnessConfig, run_analysis};
//!
//! # async fn example() -> analysis_harness::Result<()> {
//! let config = HarnessConfig::new().with_root_path("/workspace");
//! let handle = run_analysis("x = 1\nprint(y)", &config).await?;
//! for entry in handle.document_diagnostics() {
//!     println!("{entry}");
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod analysis;
pub mod config;
pub mod diagnostics;
pub mod document;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod registry;
pub mod resolver;
pub mod syntax;

// Re-export main types
pub use analysis::{Analysis, Definition};
pub use config::{HarnessConfig, InterpreterConfiguration, ModuleKind};
pub use diagnostics::{
    DiagnosticsAggregator, DiagnosticsEntry, DiagnosticsSink, DiagnosticsSummary, Severity,
};
pub use document::{
    Document, DocumentInfo, DocumentServices, DocumentState, DocumentTable,
    InMemoryDocumentTable, StandaloneDocument,
};
pub use engine::{Analyzer, AnalysisContext, Interpreter, ServiceFactory};
pub use error::{HarnessError, Result, Stage};
pub use pipeline::{AnalysisHandle, PipelineDriver, PipelineDriverBuilder, run_analysis};
pub use registry::{Capability, Service, ServiceRegistry};
pub use resolver::{DependencyChainNode, DependencyResolver, StubDependencyResolver};
pub use syntax::{Span, SyntaxTree};

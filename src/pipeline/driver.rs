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

//! Run orchestration

use super::AnalysisHandle;
use crate::analysis::Analysis;
use crate::config::{HarnessConfig, InterpreterConfiguration};
use crate::diagnostics::{DiagnosticsAggregator, DiagnosticsSink};
use crate::document::{Document, DocumentInfo, DocumentServices, DocumentTable, StandaloneDocument};
use crate::engine::{BuiltinServices, ServiceFactory};
use crate::error::{HarnessError, Result};
use crate::registry::{Service, ServiceRegistry};
use crate::resolver::{DependencyResolver, StubDependencyResolver};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Entry point running the two-stage pipeline on one block of source text
///
/// Every run builds its own [`ServiceRegistry`]. Services handed to the builder
/// are registered into each run's registry as they are; anything not supplied is
/// created fresh per run.
#[derive(Clone)]
pub struct PipelineDriver {
    factory: Arc<dyn ServiceFactory>,
    resolver: Option<Arc<dyn DependencyResolver>>,
    diagnostics: Option<Arc<dyn DiagnosticsSink>>,
    document_table: Option<Arc<dyn DocumentTable>>,
}

impl Default for PipelineDriver {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl fmt::Debug for PipelineDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineDriver")
            .field("resolver", &self.resolver.is_some())
            .field("diagnostics", &self.diagnostics.is_some())
            .field("document_table", &self.document_table.is_some())
            .finish_non_exhaustive()
    }
}

impl PipelineDriver {
    /// Driver using the built-in collaborators
    pub fn new() -> Self {
        Self::default()
    }

    /// Start configuring a driver
    pub fn builder() -> PipelineDriverBuilder {
        PipelineDriverBuilder::default()
    }

    /// Analyse `source` as the document described by `config`
    ///
    /// Setup failures abort before any document exists. A failed or empty
    /// production aborts the run; nothing is retried.
    pub async fn run(
        &self,
        source: &str,
        config: &HarnessConfig,
        cancel: &CancellationToken,
    ) -> Result<AnalysisHandle> {
        if cancel.is_cancelled() {
            return Err(HarnessError::Cancelled);
        }

        config.validate()?;
        if let Err(error) = config.interpreter.ensure_installed() {
            log::warn!("aborting run: {error}");
            return Err(error);
        }

        let interpreter = config.interpreter.clone().normalized(&config.root_path);
        let registry = Arc::new(self.build_registry(&interpreter, config, cancel).await?);
        log::debug!("registry ready with {:?}", registry.capabilities());

        let info = DocumentInfo::from_path(
            config.module_name.as_str(),
            config.document_path(),
            source,
            config.module_kind,
        )?;
        let document: Arc<dyn Document> = match registry.document_table() {
            Some(table) => cancellable(cancel, table.open_or_create(info, &registry)).await?,
            None => {
                log::debug!("creating standalone document {}", info.uri);
                let services = DocumentServices::from_registry(&registry)?;
                Arc::new(StandaloneDocument::new(info, services))
            }
        };

        let syntax = document.syntax_tree(cancel).await?;
        let analysis = document.analysis(cancel).await?;
        if let Some(sink) = registry.diagnostics() {
            republish(document.as_ref(), &analysis, &sink);
        }
        log::debug!(
            "run for {} finished with {} diagnostics",
            document.uri(),
            analysis.diagnostics.len()
        );

        Ok(AnalysisHandle::new(registry, document, syntax, analysis))
    }

    async fn build_registry(
        &self,
        interpreter_config: &InterpreterConfiguration,
        config: &HarnessConfig,
        cancel: &CancellationToken,
    ) -> Result<ServiceRegistry> {
        let mut registry = ServiceRegistry::new();

        let diagnostics = self.diagnostics.clone().unwrap_or_else(|| {
            Arc::new(DiagnosticsAggregator::with_publishing_delay(
                config.publishing_delay(),
            ))
        });
        registry.register(Service::Diagnostics(diagnostics));

        let resolver = self
            .resolver
            .clone()
            .unwrap_or_else(|| Arc::new(StubDependencyResolver));
        registry.register(Service::DependencyResolver(resolver));

        let root = config.root_path.as_path();
        let interpreter = cancellable(
            cancel,
            self.factory
                .create_interpreter(interpreter_config, root, &registry),
        )
        .await?;
        registry.register(Service::Interpreter(interpreter));

        let analyzer = cancellable(
            cancel,
            self.factory
                .create_analyzer(interpreter_config, root, &registry),
        )
        .await?;
        registry.register(Service::Analyzer(analyzer));

        if let Some(table) = &self.document_table {
            registry.register(Service::DocumentTable(Arc::clone(table)));
        }

        Ok(registry)
    }
}

/// Builder for [`PipelineDriver`]
#[derive(Default)]
pub struct PipelineDriverBuilder {
    factory: Option<Arc<dyn ServiceFactory>>,
    resolver: Option<Arc<dyn DependencyResolver>>,
    diagnostics: Option<Arc<dyn DiagnosticsSink>>,
    document_table: Option<Arc<dyn DocumentTable>>,
}

impl PipelineDriverBuilder {
    /// Construct the interpreter and analyzer with `factory`
    pub fn with_factory(mut self, factory: Arc<dyn ServiceFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Use `resolver` instead of the stub resolver
    pub fn with_resolver(mut self, resolver: Arc<dyn DependencyResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Publish diagnostics into `diagnostics` instead of a per-run aggregator
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticsSink>) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    /// Open documents through `table`
    pub fn with_document_table(mut self, table: Arc<dyn DocumentTable>) -> Self {
        self.document_table = Some(table);
        self
    }

    /// Build the driver
    pub fn build(self) -> PipelineDriver {
        PipelineDriver {
            factory: self.factory.unwrap_or_else(|| Arc::new(BuiltinServices)),
            resolver: self.resolver,
            diagnostics: self.diagnostics,
            document_table: self.document_table,
        }
    }
}

/// Run the pipeline once with the built-in collaborators and no deadline
pub async fn run_analysis(source: &str, config: &HarnessConfig) -> Result<AnalysisHandle> {
    PipelineDriver::new()
        .run(source, config, &CancellationToken::new())
        .await
}

/// Copy the analysis diagnostics into `sink` unless the document already
/// publishes there
///
/// A document reused through a table keeps the sink of the run that created it.
fn republish(document: &dyn Document, analysis: &Analysis, sink: &Arc<dyn DiagnosticsSink>) {
    if document
        .diagnostics_sink()
        .is_some_and(|own| Arc::ptr_eq(own, sink))
    {
        return;
    }
    log::debug!(
        "republishing {} diagnostics for {}",
        analysis.diagnostics.len(),
        document.uri()
    );
    for entry in &analysis.diagnostics {
        sink.publish(&entry.document, entry.clone());
    }
}

async fn cancellable<T>(
    cancel: &CancellationToken,
    future: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(HarnessError::Cancelled),
        result = future => result,
    }
}

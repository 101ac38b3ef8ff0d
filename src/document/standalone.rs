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

//! Document owned directly by its creator

use super::{Document, DocumentInfo, DocumentServices, DocumentState, SingleFlight};
use crate::analysis::Analysis;
use crate::diagnostics::DiagnosticsSink;
use crate::engine::AnalysisContext;
use crate::error::{Result, Stage};
use crate::syntax::SyntaxTree;
use async_trait::async_trait;
use futures::FutureExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Document produced with an explicit set of services
#[derive(Debug, Clone)]
pub struct StandaloneDocument {
    core: Arc<DocumentCore>,
}

#[derive(Debug)]
struct DocumentCore {
    info: Arc<DocumentInfo>,
    services: DocumentServices,
    syntax: SingleFlight<SyntaxTree>,
    analysis: SingleFlight<Analysis>,
}

impl StandaloneDocument {
    /// Create a document in the `Created` state
    pub fn new(info: DocumentInfo, services: DocumentServices) -> Self {
        Self {
            core: Arc::new(DocumentCore {
                info: Arc::new(info),
                services,
                syntax: SingleFlight::new(Stage::SyntaxTree),
                analysis: SingleFlight::new(Stage::Analysis),
            }),
        }
    }

    /// Number of syntax tree productions launched
    pub fn syntax_launches(&self) -> usize {
        self.core.syntax.launches()
    }

    /// Number of analysis productions launched
    pub fn analysis_launches(&self) -> usize {
        self.core.analysis.launches()
    }
}

impl DocumentCore {
    async fn syntax_tree(&self, cancel: &CancellationToken) -> Result<Arc<SyntaxTree>> {
        let info = Arc::clone(&self.info);
        let analyzer = Arc::clone(&self.services.analyzer);
        self.syntax
            .get_or_produce(cancel, move |flight| {
                async move { analyzer.parse(&info, &flight).await }.boxed()
            })
            .await
    }

    async fn analysis(self: &Arc<Self>, cancel: &CancellationToken) -> Result<Arc<Analysis>> {
        let core = Arc::clone(self);
        self.analysis
            .get_or_produce(cancel, move |flight| {
                async move {
                    let syntax = core.syntax_tree(&flight).await?;
                    let services = &core.services;
                    services
                        .analyzer
                        .analyze(AnalysisContext {
                            document: &core.info,
                            syntax: &syntax,
                            diagnostics: services.diagnostics.as_deref(),
                            resolver: services.resolver.as_deref(),
                            cancel: &flight,
                        })
                        .await
                }
                .boxed()
            })
            .await
    }
}

#[async_trait]
impl Document for StandaloneDocument {
    fn info(&self) -> &Arc<DocumentInfo> {
        &self.core.info
    }

    fn diagnostics_sink(&self) -> Option<&Arc<dyn DiagnosticsSink>> {
        self.core.services.diagnostics.as_ref()
    }

    fn state(&self) -> DocumentState {
        DocumentState::from_flights(self.core.syntax.status(), self.core.analysis.status())
    }

    async fn syntax_tree(&self, cancel: &CancellationToken) -> Result<Arc<SyntaxTree>> {
        self.core.syntax_tree(cancel).await
    }

    async fn analysis(&self, cancel: &CancellationToken) -> Result<Arc<Analysis>> {
        self.core.analysis(cancel).await
    }
}

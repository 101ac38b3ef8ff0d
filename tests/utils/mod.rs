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

//! Shared helpers for the integration tests

#![allow(dead_code)]

use analysis_harness::analysis::{Analysis, Definition};
use analysis_harness::config::InterpreterConfiguration;
use analysis_harness::engine::{BuiltinServices, parse_source};
use analysis_harness::*;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Initialise test logging once per test binary
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Configuration rooted at an absolute workspace path
pub fn workspace_config(module_name: &str) -> HarnessConfig {
    HarnessConfig::new()
        .with_root_path("/workspace")
        .with_module_name(module_name)
}

/// Analyzer whose parse step waits for a gate and can be told to misbehave
pub struct ScriptedAnalyzer {
    gate: watch::Sender<bool>,
    analysis_gate: watch::Sender<bool>,
    parse_failures: AtomicUsize,
    empty_analysis: bool,
    pub parse_calls: AtomicUsize,
    pub analyze_calls: AtomicUsize,
}

impl ScriptedAnalyzer {
    /// Parsing blocks until [`ScriptedAnalyzer::open_gate`] is called
    pub fn gated() -> Self {
        let (gate, _) = watch::channel(false);
        let (analysis_gate, _) = watch::channel(true);
        Self {
            gate,
            analysis_gate,
            parse_failures: AtomicUsize::new(0),
            empty_analysis: false,
            parse_calls: AtomicUsize::new(0),
            analyze_calls: AtomicUsize::new(0),
        }
    }

    /// Parsing proceeds immediately
    pub fn open() -> Self {
        let analyzer = Self::gated();
        analyzer.open_gate();
        analyzer
    }

    /// Fail the next `count` parses
    pub fn with_parse_failures(self, count: usize) -> Self {
        self.parse_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Return no analysis without reporting an error
    pub fn with_empty_analysis(mut self) -> Self {
        self.empty_analysis = true;
        self
    }

    /// Analysis blocks until [`ScriptedAnalyzer::open_analysis_gate`] is called
    pub fn with_gated_analysis(self) -> Self {
        self.analysis_gate.send_replace(false);
        self
    }

    pub fn open_analysis_gate(&self) {
        self.analysis_gate.send_replace(true);
    }

    pub fn open_gate(&self) {
        self.gate.send_replace(true);
    }

    pub fn parses(&self) -> usize {
        self.parse_calls.load(Ordering::SeqCst)
    }

    pub fn analyses(&self) -> usize {
        self.analyze_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Analyzer for ScriptedAnalyzer {
    async fn parse(
        &self,
        document: &DocumentInfo,
        cancel: &CancellationToken,
    ) -> Result<Option<SyntaxTree>> {
        self.parse_calls.fetch_add(1, Ordering::SeqCst);

        let mut gate = self.gate.subscribe();
        let closed = tokio::select! {
            _ = cancel.cancelled() => return Err(HarnessError::Cancelled),
            opened = gate.wait_for(|open| *open) => opened.is_err(),
        };
        if closed {
            return Err(HarnessError::production(Stage::SyntaxTree, "gate dropped"));
        }

        let failed = self
            .parse_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failed {
            return Err(HarnessError::production(
                Stage::SyntaxTree,
                "scripted parse failure",
            ));
        }

        Ok(Some(parse_source(&document.content)))
    }

    async fn analyze(&self, context: AnalysisContext<'_>) -> Result<Option<Analysis>> {
        self.analyze_calls.fetch_add(1, Ordering::SeqCst);

        let mut gate = self.analysis_gate.subscribe();
        let closed = tokio::select! {
            biased;
            _ = context.cancel.cancelled() => return Err(HarnessError::Cancelled),
            opened = gate.wait_for(|open| *open) => opened.is_err(),
        };
        if closed {
            return Err(HarnessError::production(Stage::Analysis, "gate dropped"));
        }
        if self.empty_analysis {
            return Ok(None);
        }

        let mut analysis = Analysis::for_document(context.document);
        for statement in context.syntax.statements() {
            if let Some(target) = statement.target() {
                analysis.definitions.push(Definition {
                    name: target.text.clone(),
                    span: target.span,
                });
            }
        }

        let uri = &context.document.uri;
        let entry = DiagnosticsEntry::new(
            uri.clone(),
            Severity::Information,
            "scripted",
            format!("{} statements", context.syntax.statements().len()),
        );
        if let Some(sink) = context.diagnostics {
            sink.publish(uri, entry.clone());
        }
        analysis.diagnostics.push(entry);

        Ok(Some(analysis))
    }
}

/// Standalone document produced by `analyzer`, publishing into `sink`
pub fn scripted_document(
    analyzer: &Arc<ScriptedAnalyzer>,
    content: &str,
    sink: Arc<DiagnosticsAggregator>,
) -> StandaloneDocument {
    let info = DocumentInfo::from_path("main", "/workspace/main.py", content, ModuleKind::User)
        .expect("absolute path");
    let services = DocumentServices::new(Arc::clone(analyzer) as Arc<dyn Analyzer>)
        .with_diagnostics(sink)
        .with_resolver(Arc::new(StubDependencyResolver));
    StandaloneDocument::new(info, services)
}

/// Built-in factory that counts constructions
#[derive(Default)]
pub struct CountingFactory {
    pub interpreters: AtomicUsize,
    pub analyzers: AtomicUsize,
}

impl CountingFactory {
    pub fn constructions(&self) -> usize {
        self.interpreters.load(Ordering::SeqCst) + self.analyzers.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ServiceFactory for CountingFactory {
    async fn create_interpreter(
        &self,
        configuration: &InterpreterConfiguration,
        root_path: &Path,
        registry: &ServiceRegistry,
    ) -> Result<Arc<dyn Interpreter>> {
        self.interpreters.fetch_add(1, Ordering::SeqCst);
        BuiltinServices
            .create_interpreter(configuration, root_path, registry)
            .await
    }

    async fn create_analyzer(
        &self,
        configuration: &InterpreterConfiguration,
        root_path: &Path,
        registry: &ServiceRegistry,
    ) -> Result<Arc<dyn Analyzer>> {
        self.analyzers.fetch_add(1, Ordering::SeqCst);
        BuiltinServices
            .create_analyzer(configuration, root_path, registry)
            .await
    }
}

/// Factory handing out a fixed analyzer on top of the built-in interpreter
pub struct FixedAnalyzerFactory(pub Arc<ScriptedAnalyzer>);

#[async_trait]
impl ServiceFactory for FixedAnalyzerFactory {
    async fn create_interpreter(
        &self,
        configuration: &InterpreterConfiguration,
        root_path: &Path,
        registry: &ServiceRegistry,
    ) -> Result<Arc<dyn Interpreter>> {
        BuiltinServices
            .create_interpreter(configuration, root_path, registry)
            .await
    }

    async fn create_analyzer(
        &self,
        _configuration: &InterpreterConfiguration,
        _root_path: &Path,
        _registry: &ServiceRegistry,
    ) -> Result<Arc<dyn Analyzer>> {
        Ok(Arc::clone(&self.0) as Arc<dyn Analyzer>)
    }
}

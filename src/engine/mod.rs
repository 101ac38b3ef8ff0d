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

//! Contracts for the analysis engine collaborators
//!
//! The harness treats the interpreter and the analyzer as opaque services. This
//! module declares what it needs from them, plus lightweight built-in stand-ins
//! so a run can complete without the external engine:
//!
//! - [`BuiltinInterpreter`] answers builtin-name queries from configuration
//! - [`BuiltinAnalyzer`] parses a line-oriented assignment language and reports
//!   undefined names
//! - [`BuiltinServices`] constructs both for the pipeline driver

pub mod analyzer;
pub mod interpreter;
pub mod parser;

pub use analyzer::BuiltinAnalyzer;
pub use interpreter::BuiltinInterpreter;
pub use parser::parse_source;

use crate::analysis::Analysis;
use crate::config::InterpreterConfiguration;
use crate::diagnostics::DiagnosticsSink;
use crate::document::DocumentInfo;
use crate::error::Result;
use crate::registry::ServiceRegistry;
use crate::resolver::DependencyResolver;
use crate::syntax::SyntaxTree;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Interpreter/runtime model
pub trait Interpreter: Send + Sync {
    /// Configuration the interpreter was constructed with
    fn configuration(&self) -> &InterpreterConfiguration;

    /// Workspace root the interpreter was constructed for
    fn root_path(&self) -> &Path;

    /// True if `name` resolves without a definition
    fn is_builtin(&self, name: &str) -> bool;
}

/// Everything the analyzer may consult while analysing one document
pub struct AnalysisContext<'a> {
    /// Document under analysis
    pub document: &'a Arc<DocumentInfo>,
    /// Ready syntax tree of the document
    pub syntax: &'a SyntaxTree,
    /// Sink for diagnostics, if one is registered
    pub diagnostics: Option<&'a dyn DiagnosticsSink>,
    /// Dependency resolver, if one is registered
    pub resolver: Option<&'a dyn DependencyResolver>,
    /// Cancellation signal of the production
    pub cancel: &'a CancellationToken,
}

/// Syntax tree and semantic analysis producer
///
/// Returning `Ok(None)` breaks the production contract; the harness reports it
/// as [`crate::HarnessError::ContractViolation`].
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Produce the syntax tree of `document`
    async fn parse(
        &self,
        document: &DocumentInfo,
        cancel: &CancellationToken,
    ) -> Result<Option<SyntaxTree>>;

    /// Produce the semantic analysis of a parsed document
    async fn analyze(&self, context: AnalysisContext<'_>) -> Result<Option<Analysis>>;
}

/// Asynchronous constructor for the interpreter and analyzer collaborators
#[async_trait]
pub trait ServiceFactory: Send + Sync {
    /// Construct the interpreter
    async fn create_interpreter(
        &self,
        configuration: &InterpreterConfiguration,
        root_path: &Path,
        registry: &ServiceRegistry,
    ) -> Result<Arc<dyn Interpreter>>;

    /// Construct the analyzer; the interpreter is already registered
    async fn create_analyzer(
        &self,
        configuration: &InterpreterConfiguration,
        root_path: &Path,
        registry: &ServiceRegistry,
    ) -> Result<Arc<dyn Analyzer>>;
}

/// Factory for the built-in stand-in collaborators
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinServices;

#[async_trait]
impl ServiceFactory for BuiltinServices {
    async fn create_interpreter(
        &self,
        configuration: &InterpreterConfiguration,
        root_path: &Path,
        _registry: &ServiceRegistry,
    ) -> Result<Arc<dyn Interpreter>> {
        Ok(Arc::new(BuiltinInterpreter::new(
            configuration.clone(),
            root_path,
        )))
    }

    async fn create_analyzer(
        &self,
        _configuration: &InterpreterConfiguration,
        _root_path: &Path,
        registry: &ServiceRegistry,
    ) -> Result<Arc<dyn Analyzer>> {
        let interpreter = registry.require_interpreter()?;
        Ok(Arc::new(BuiltinAnalyzer::new(interpreter)))
    }
}

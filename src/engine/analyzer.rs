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

//! Undefined-name analyzer built on the line parser

use super::{AnalysisContext, Analyzer, Interpreter, parser::parse_source};
use crate::analysis::{Analysis, Definition};
use crate::diagnostics::DiagnosticsEntry;
use crate::document::DocumentInfo;
use crate::error::{HarnessError, Result};
use crate::syntax::SyntaxTree;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Diagnostic code for syntax problems
pub const SYNTAX_ERROR: &str = "syntax-error";
/// Diagnostic code for references that resolve to nothing
pub const UNDEFINED_NAME: &str = "undefined-name";

/// Stand-in analyzer: statements are visited in order, a reference resolves if
/// an earlier statement bound it or the interpreter provides it.
pub struct BuiltinAnalyzer {
    interpreter: Arc<dyn Interpreter>,
}

impl BuiltinAnalyzer {
    /// Create an analyzer consulting `interpreter` for builtin names
    pub fn new(interpreter: Arc<dyn Interpreter>) -> Self {
        Self { interpreter }
    }

    fn collect(&self, document: &DocumentInfo, syntax: &SyntaxTree, analysis: &mut Analysis) {
        for error in syntax.errors() {
            analysis.diagnostics.push(
                DiagnosticsEntry::error(document.uri.clone(), SYNTAX_ERROR, error.message.clone())
                    .with_span(error.span),
            );
        }

        let mut defined: HashSet<&str> = HashSet::new();
        for statement in syntax.statements() {
            for reference in statement.references() {
                if defined.contains(reference.text.as_str())
                    || self.interpreter.is_builtin(&reference.text)
                {
                    continue;
                }

                analysis.unresolved.push(reference.clone());
                analysis.diagnostics.push(
                    DiagnosticsEntry::error(
                        document.uri.clone(),
                        UNDEFINED_NAME,
                        format!("\"{}\" is not defined", reference.text),
                    )
                    .with_span(reference.span),
                );
            }

            if let Some(target) = statement.target() {
                if defined.insert(target.text.as_str()) {
                    analysis.definitions.push(Definition {
                        name: target.text.clone(),
                        span: target.span,
                    });
                }
            }
        }
    }
}

#[async_trait]
impl Analyzer for BuiltinAnalyzer {
    async fn parse(
        &self,
        document: &DocumentInfo,
        cancel: &CancellationToken,
    ) -> Result<Option<SyntaxTree>> {
        if cancel.is_cancelled() {
            return Err(HarnessError::Cancelled);
        }
        Ok(Some(parse_source(&document.content)))
    }

    async fn analyze(&self, context: AnalysisContext<'_>) -> Result<Option<Analysis>> {
        let AnalysisContext {
            document,
            syntax,
            diagnostics,
            resolver,
            cancel,
        } = context;

        let dependency_chain = match resolver {
            Some(resolver) => Some(resolver.resolve_chain(document, cancel).await?),
            None => None,
        };

        // Nothing is published for a cancelled production
        if cancel.is_cancelled() {
            return Err(HarnessError::Cancelled);
        }

        let mut analysis = Analysis::for_document(document);
        analysis.dependency_chain = dependency_chain;
        self.collect(document, syntax, &mut analysis);

        if let Some(sink) = diagnostics {
            for entry in &analysis.diagnostics {
                sink.publish(&document.uri, entry.clone());
            }
        }

        log::debug!(
            "analysed {}: {} definitions, {} unresolved",
            document.uri,
            analysis.definitions.len(),
            analysis.unresolved.len()
        );
        Ok(Some(analysis))
    }
}

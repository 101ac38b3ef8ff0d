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

//! Semantic analysis result returned to harness callers

use crate::diagnostics::DiagnosticsEntry;
use crate::document::DocumentInfo;
use crate::resolver::DependencyChainNode;
use crate::syntax::{Name, Span};
use url::Url;

/// A name bound by the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    /// Bound identifier
    pub name: String,
    /// Location of the binding
    pub span: Span,
}

/// Result of analysing one document
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    /// Identity of the analysed document
    pub document: Option<Url>,
    /// Module name of the analysed document
    pub module_name: String,
    /// Names bound by the document, in binding order
    pub definitions: Vec<Definition>,
    /// References that resolved to no definition or builtin
    pub unresolved: Vec<Name>,
    /// Position of the document in the dependency ordering
    pub dependency_chain: Option<DependencyChainNode>,
    /// Diagnostics produced while analysing
    pub diagnostics: Vec<DiagnosticsEntry>,
}

impl Analysis {
    /// Empty analysis for `document`
    pub fn for_document(document: &DocumentInfo) -> Self {
        Self {
            document: Some(document.uri.clone()),
            module_name: document.module_name.clone(),
            ..Self::default()
        }
    }

    /// Look up a definition by name
    pub fn definition(&self, name: &str) -> Option<&Definition> {
        self.definitions.iter().find(|def| def.name == name)
    }

    /// True when every reference resolved
    pub fn is_clean(&self) -> bool {
        self.unresolved.is_empty() && self.diagnostics.is_empty()
    }
}

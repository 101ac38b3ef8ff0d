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

//! Dependency resolution between documents

use crate::document::DocumentInfo;
use crate::error::{HarnessError, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Weak};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Resolves the position of a document in the inter-document dependency ordering
///
/// Implementations must return acyclic chains whose dependency lists are in a
/// deterministic order.
#[async_trait]
pub trait DependencyResolver: Send + Sync {
    /// Build the dependency chain rooted at `document`
    async fn resolve_chain(
        &self,
        document: &Arc<DocumentInfo>,
        cancel: &CancellationToken,
    ) -> Result<DependencyChainNode>;
}

/// Node of a dependency chain
///
/// Holds the document only weakly; the chain identifies documents, it does not
/// keep them alive.
#[derive(Debug, Clone)]
pub struct DependencyChainNode {
    uri: Url,
    document: Weak<DocumentInfo>,
    dependencies: Vec<DependencyChainNode>,
}

impl DependencyChainNode {
    /// Node for a document that depends on nothing else
    pub fn leaf(document: &Arc<DocumentInfo>) -> Self {
        Self {
            uri: document.uri.clone(),
            document: Arc::downgrade(document),
            dependencies: Vec::new(),
        }
    }

    /// Node with dependencies, sorted and deduplicated by identity
    pub fn with_dependencies(
        document: &Arc<DocumentInfo>,
        mut dependencies: Vec<DependencyChainNode>,
    ) -> Self {
        dependencies.sort_by(|a, b| a.uri.as_str().cmp(b.uri.as_str()));
        dependencies.dedup_by(|a, b| a.uri == b.uri);
        Self {
            uri: document.uri.clone(),
            document: Arc::downgrade(document),
            dependencies,
        }
    }

    /// Identity of the owning document
    pub fn uri(&self) -> &Url {
        &self.uri
    }

    /// The owning document, if it is still alive
    pub fn document(&self) -> Option<Arc<DocumentInfo>> {
        self.document.upgrade()
    }

    /// Direct dependencies
    pub fn dependencies(&self) -> &[DependencyChainNode] {
        &self.dependencies
    }

    /// True when the node has no dependencies
    pub fn is_leaf(&self) -> bool {
        self.dependencies.is_empty()
    }

    /// Documents in analysis order: every dependency before its dependents,
    /// each document once
    pub fn analysis_order(&self) -> Result<Vec<Url>> {
        let mut order = Vec::new();
        let mut emitted = HashSet::new();
        let mut path = Vec::new();
        self.visit(&mut path, &mut emitted, &mut order)?;
        Ok(order)
    }

    fn visit<'a>(
        &'a self,
        path: &mut Vec<&'a Url>,
        emitted: &mut HashSet<&'a Url>,
        order: &mut Vec<Url>,
    ) -> Result<()> {
        if path.contains(&&self.uri) {
            return Err(HarnessError::DependencyCycle {
                uri: self.uri.clone(),
            });
        }
        if emitted.contains(&self.uri) {
            return Ok(());
        }

        path.push(&self.uri);
        for dependency in &self.dependencies {
            dependency.visit(path, emitted, order)?;
        }
        path.pop();

        emitted.insert(&self.uri);
        order.push(self.uri.clone());
        Ok(())
    }
}

/// Resolver that reports every document as depending on nothing else
#[derive(Debug, Clone, Copy, Default)]
pub struct StubDependencyResolver;

#[async_trait]
impl DependencyResolver for StubDependencyResolver {
    async fn resolve_chain(
        &self,
        document: &Arc<DocumentInfo>,
        cancel: &CancellationToken,
    ) -> Result<DependencyChainNode> {
        if cancel.is_cancelled() {
            return Err(HarnessError::Cancelled);
        }
        Ok(DependencyChainNode::leaf(document))
    }
}

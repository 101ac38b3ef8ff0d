//! Identity-keyed document table
//!
//! Tracks open documents by resource identifier so repeated opens of the same
//! content share one document and its cached productions.

use super::{Document, DocumentInfo, DocumentServices, StandaloneDocument};
use crate::error::Result;
use crate::registry::ServiceRegistry;
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use url::Url;

/// External registry that opens or creates documents by identity
#[async_trait]
pub trait DocumentTable: Send + Sync {
    /// Return the document for `info.uri`, creating it if needed
    ///
    /// New documents take their services from `registry`.
    async fn open_or_create(
        &self,
        info: DocumentInfo,
        registry: &ServiceRegistry,
    ) -> Result<Arc<dyn Document>>;
}

#[derive(Debug)]
struct TableEntry {
    document: Arc<StandaloneDocument>,
    version: u32,
}

/// Document table held in memory
#[derive(Debug, Default)]
pub struct InMemoryDocumentTable {
    documents: DashMap<Url, TableEntry>,
}

impl InMemoryDocumentTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Get an open document
    pub fn get(&self, uri: &Url) -> Option<Arc<dyn Document>> {
        self.documents
            .get(uri)
            .map(|entry| Arc::clone(&entry.document) as Arc<dyn Document>)
    }

    /// Version of an open document; bumped whenever its content is replaced
    pub fn version(&self, uri: &Url) -> Option<u32> {
        self.documents.get(uri).map(|entry| entry.version)
    }

    /// Close a document, returning whether it was open
    pub fn close(&self, uri: &Url) -> bool {
        self.documents.remove(uri).is_some()
    }

    /// Check if a document is open
    pub fn is_open(&self, uri: &Url) -> bool {
        self.documents.contains_key(uri)
    }

    /// Number of open documents
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// True when no document is open
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Identifiers of all open documents
    pub fn documents(&self) -> Vec<Url> {
        self.documents.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Get document statistics
    pub fn stats(&self) -> DocumentTableStats {
        let mut stats = DocumentTableStats::default();
        for entry in self.documents.iter() {
            let info = entry.document.info();
            stats.document_count += 1;
            stats.total_lines += info.line_count();
            stats.total_characters += info.content.chars().count();
        }
        stats
    }
}

#[async_trait]
impl DocumentTable for InMemoryDocumentTable {
    async fn open_or_create(
        &self,
        info: DocumentInfo,
        registry: &ServiceRegistry,
    ) -> Result<Arc<dyn Document>> {
        let services = DocumentServices::from_registry(registry)?;

        let document = match self.documents.entry(info.uri.clone()) {
            Entry::Occupied(mut entry) => {
                if **entry.get().document.info() == info {
                    log::debug!("reusing open document {} v{}", info.uri, entry.get().version);
                    Arc::clone(&entry.get().document)
                } else {
                    let version = entry.get().version + 1;
                    log::debug!("replacing document {} with v{version}", info.uri);
                    let document = Arc::new(StandaloneDocument::new(info, services));
                    entry.insert(TableEntry {
                        document: Arc::clone(&document),
                        version,
                    });
                    document
                }
            }
            Entry::Vacant(entry) => {
                log::debug!("opening document {}", info.uri);
                let document = Arc::new(StandaloneDocument::new(info, services));
                entry.insert(TableEntry {
                    document: Arc::clone(&document),
                    version: 1,
                });
                document
            }
        };

        Ok(document as Arc<dyn Document>)
    }
}

/// Statistics about the document table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocumentTableStats {
    /// Number of open documents
    pub document_count: usize,
    /// Total lines across all documents
    pub total_lines: usize,
    /// Total characters across all documents
    pub total_characters: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{InterpreterConfiguration, ModuleKind};
    use crate::engine::{BuiltinAnalyzer, BuiltinInterpreter};
    use crate::registry::Service;
    use pretty_assertions::assert_eq;
    use std::path::Path;
    use tokio_util::sync::CancellationToken;

    fn registry() -> ServiceRegistry {
        let interpreter =
            BuiltinInterpreter::new(InterpreterConfiguration::default(), Path::new("/workspace"));
        let mut registry = ServiceRegistry::new();
        registry.register(Service::Analyzer(Arc::new(BuiltinAnalyzer::new(Arc::new(
            interpreter,
        )))));
        registry
    }

    fn info(content: &str) -> DocumentInfo {
        DocumentInfo::from_path("main", "/workspace/main.py", content, ModuleKind::User).unwrap()
    }

    #[tokio::test]
    async fn test_identical_open_reuses_document() {
        let table = InMemoryDocumentTable::new();
        let registry = registry();

        let first = table.open_or_create(info("x = 1"), &registry).await.unwrap();
        first.syntax_tree(&CancellationToken::new()).await.unwrap();
        let second = table.open_or_create(info("x = 1"), &registry).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(table.len(), 1);
        assert_eq!(table.version(first.uri()), Some(1));
    }

    #[tokio::test]
    async fn test_changed_content_replaces_document() {
        let table = InMemoryDocumentTable::new();
        let registry = registry();

        let first = table.open_or_create(info("x = 1"), &registry).await.unwrap();
        let second = table.open_or_create(info("x = 2\ny = x"), &registry).await.unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(table.version(second.uri()), Some(2));
        assert_eq!(
            table.stats(),
            DocumentTableStats {
                document_count: 1,
                total_lines: 2,
                total_characters: 11,
            }
        );
    }

    #[tokio::test]
    async fn test_open_requires_analyzer() {
        let table = InMemoryDocumentTable::new();
        let result = table.open_or_create(info("x = 1"), &ServiceRegistry::new()).await;

        assert!(result.is_err());
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_close() {
        let table = InMemoryDocumentTable::new();
        let document = table.open_or_create(info("x = 1"), &registry()).await.unwrap();
        let uri = document.uri().clone();

        assert!(table.is_open(&uri));
        assert_eq!(table.documents(), vec![uri.clone()]);
        assert!(table.close(&uri));
        assert!(!table.close(&uri));
        assert!(table.get(&uri).is_none());
    }
}

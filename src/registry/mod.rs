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

//! Per-run service registry
//!
//! Known capabilities live in explicit slots tagged by [`Capability`]; anything
//! else can be stored in the typed extension map. A registry is populated during
//! synchronous setup and then shared read-only behind an `Arc`.

use crate::diagnostics::DiagnosticsSink;
use crate::document::DocumentTable;
use crate::engine::{Analyzer, Interpreter};
use crate::error::{HarnessError, Result};
use crate::resolver::DependencyResolver;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Service roles the harness knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Capability {
    /// Diagnostics sink
    Diagnostics,
    /// Dependency resolver
    DependencyResolver,
    /// Semantic analyzer
    Analyzer,
    /// Interpreter/runtime model
    Interpreter,
    /// External document table
    DocumentTable,
}

impl Capability {
    /// All known capabilities
    pub const ALL: [Capability; 5] = [
        Capability::Diagnostics,
        Capability::DependencyResolver,
        Capability::Analyzer,
        Capability::Interpreter,
        Capability::DocumentTable,
    ];
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::Diagnostics => "diagnostics",
            Capability::DependencyResolver => "dependency-resolver",
            Capability::Analyzer => "analyzer",
            Capability::Interpreter => "interpreter",
            Capability::DocumentTable => "document-table",
        };
        f.write_str(name)
    }
}

/// A registered service instance, tagged with its capability
#[derive(Clone)]
pub enum Service {
    /// Diagnostics sink
    Diagnostics(Arc<dyn DiagnosticsSink>),
    /// Dependency resolver
    DependencyResolver(Arc<dyn DependencyResolver>),
    /// Semantic analyzer
    Analyzer(Arc<dyn Analyzer>),
    /// Interpreter/runtime model
    Interpreter(Arc<dyn Interpreter>),
    /// External document table
    DocumentTable(Arc<dyn DocumentTable>),
}

impl Service {
    /// Capability this instance fulfills
    pub fn capability(&self) -> Capability {
        match self {
            Service::Diagnostics(_) => Capability::Diagnostics,
            Service::DependencyResolver(_) => Capability::DependencyResolver,
            Service::Analyzer(_) => Capability::Analyzer,
            Service::Interpreter(_) => Capability::Interpreter,
            Service::DocumentTable(_) => Capability::DocumentTable,
        }
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Service").field(&self.capability()).finish()
    }
}

/// Mapping from capability to a single owned instance
#[derive(Default)]
pub struct ServiceRegistry {
    services: HashMap<Capability, Service>,
    extensions: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("capabilities", &self.capabilities())
            .field("extension_count", &self.extensions.len())
            .finish()
    }
}

impl ServiceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service, replacing and returning any previous instance
    /// for the same capability
    pub fn register(&mut self, service: Service) -> Option<Service> {
        let capability = service.capability();
        let previous = self.services.insert(capability, service);
        if previous.is_some() {
            log::debug!("replaced registered {capability} service");
        }
        previous
    }

    /// Look up the instance registered for `capability`
    pub fn lookup(&self, capability: Capability) -> Option<&Service> {
        self.services.get(&capability)
    }

    /// True if `capability` has an instance
    pub fn contains(&self, capability: Capability) -> bool {
        self.services.contains_key(&capability)
    }

    /// Registered capabilities in declaration order
    pub fn capabilities(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|capability| self.contains(*capability))
            .collect()
    }

    /// Number of registered capability services
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// True when nothing is registered
    pub fn is_empty(&self) -> bool {
        self.services.is_empty() && self.extensions.is_empty()
    }

    /// Registered diagnostics sink
    pub fn diagnostics(&self) -> Option<Arc<dyn DiagnosticsSink>> {
        match self.lookup(Capability::Diagnostics)? {
            Service::Diagnostics(sink) => Some(Arc::clone(sink)),
            _ => None,
        }
    }

    /// Registered dependency resolver
    pub fn resolver(&self) -> Option<Arc<dyn DependencyResolver>> {
        match self.lookup(Capability::DependencyResolver)? {
            Service::DependencyResolver(resolver) => Some(Arc::clone(resolver)),
            _ => None,
        }
    }

    /// Registered analyzer
    pub fn analyzer(&self) -> Option<Arc<dyn Analyzer>> {
        match self.lookup(Capability::Analyzer)? {
            Service::Analyzer(analyzer) => Some(Arc::clone(analyzer)),
            _ => None,
        }
    }

    /// Registered interpreter
    pub fn interpreter(&self) -> Option<Arc<dyn Interpreter>> {
        match self.lookup(Capability::Interpreter)? {
            Service::Interpreter(interpreter) => Some(Arc::clone(interpreter)),
            _ => None,
        }
    }

    /// Registered document table
    pub fn document_table(&self) -> Option<Arc<dyn DocumentTable>> {
        match self.lookup(Capability::DocumentTable)? {
            Service::DocumentTable(table) => Some(Arc::clone(table)),
            _ => None,
        }
    }

    /// Registered analyzer, or `ServiceMissing`
    pub fn require_analyzer(&self) -> Result<Arc<dyn Analyzer>> {
        self.analyzer().ok_or(HarnessError::ServiceMissing {
            capability: Capability::Analyzer,
        })
    }

    /// Registered interpreter, or `ServiceMissing`
    pub fn require_interpreter(&self) -> Result<Arc<dyn Interpreter>> {
        self.interpreter().ok_or(HarnessError::ServiceMissing {
            capability: Capability::Interpreter,
        })
    }

    /// Store an extension instance keyed by its type, returning the previous one
    pub fn register_extension<T: Any + Send + Sync>(&mut self, instance: Arc<T>) -> Option<Arc<T>> {
        self.extensions
            .insert(TypeId::of::<T>(), instance)
            .and_then(|previous| previous.downcast::<T>().ok())
    }

    /// Extension instance of type `T`
    pub fn extension<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|instance| Arc::clone(instance).downcast::<T>().ok())
    }
}

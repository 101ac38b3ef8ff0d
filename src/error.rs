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

//! Error types for the analysis harness

use crate::registry::Capability;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

/// Result type for harness operations
pub type Result<T> = std::result::Result<T, HarnessError>;

/// Pipeline step an error or production belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Registry and collaborator construction
    Setup,
    /// Syntax tree production
    SyntaxTree,
    /// Semantic analysis production
    Analysis,
    /// Dependency chain resolution
    DependencyResolution,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Setup => "setup",
            Stage::SyntaxTree => "syntax tree",
            Stage::Analysis => "analysis",
            Stage::DependencyResolution => "dependency resolution",
        };
        f.write_str(name)
    }
}

/// Errors surfaced by the harness and its collaborators
///
/// The type is `Clone` because a single in-flight production hands the same
/// outcome to every caller waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HarnessError {
    /// The configured interpreter is not installed
    #[error("Interpreter unavailable at {}: {reason}", path.display())]
    InterpreterUnavailable {
        /// Configured executable path
        path: PathBuf,
        /// Why the check failed
        reason: String,
    },

    /// Configuration could not be loaded or is inconsistent
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration {
        /// Error message describing the problem
        message: String,
    },

    /// A document path could not be turned into a resource identifier
    #[error("Invalid document path: {}", path.display())]
    InvalidDocumentPath {
        /// Offending path
        path: PathBuf,
    },

    /// A capability the caller cannot proceed without is not registered
    #[error("Required service '{capability}' is not registered")]
    ServiceMissing {
        /// The absent capability
        capability: Capability,
    },

    /// A collaborator failed to produce a result
    #[error("{stage} production failed: {message}")]
    Production {
        /// Stage that failed
        stage: Stage,
        /// Error message reported by the collaborator
        message: String,
    },

    /// A collaborator returned no result without reporting a failure
    #[error("{stage} production returned no result")]
    ContractViolation {
        /// Stage whose collaborator misbehaved
        stage: Stage,
    },

    /// A dependency chain revisits a document on its own path
    #[error("Dependency cycle detected at {uri}")]
    DependencyCycle {
        /// Document that closes the cycle
        uri: Url,
    },

    /// The operation was cancelled before it completed
    #[error("Operation cancelled")]
    Cancelled,
}

impl HarnessError {
    /// Create a production failure for the given stage
    pub fn production(stage: Stage, message: impl Into<String>) -> Self {
        HarnessError::Production {
            stage,
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        HarnessError::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// True for [`HarnessError::Cancelled`]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, HarnessError::Cancelled)
    }

    /// True for errors that are fatal before any document work begins
    pub fn is_setup_failure(&self) -> bool {
        matches!(
            self,
            HarnessError::InterpreterUnavailable { .. }
                | HarnessError::InvalidConfiguration { .. }
                | HarnessError::InvalidDocumentPath { .. }
                | HarnessError::ServiceMissing { .. }
        )
    }

    /// True for failures a fresh request may recover from
    pub fn is_transient(&self) -> bool {
        matches!(self, HarnessError::Production { .. })
    }

    /// True when a collaborator broke the non-empty result contract
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, HarnessError::ContractViolation { .. })
    }

    /// Stage the error is attributed to, if any
    pub fn stage(&self) -> Option<Stage> {
        match self {
            HarnessError::Production { stage, .. } | HarnessError::ContractViolation { stage } => {
                Some(*stage)
            }
            HarnessError::DependencyCycle { .. } => Some(Stage::DependencyResolution),
            HarnessError::Cancelled => None,
            _ => Some(Stage::Setup),
        }
    }
}

impl From<serde_json::Error> for HarnessError {
    fn from(error: serde_json::Error) -> Self {
        HarnessError::invalid_configuration(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(HarnessError::Cancelled.is_cancelled());
        assert!(!HarnessError::Cancelled.is_transient());

        let failure = HarnessError::production(Stage::SyntaxTree, "lexer exploded");
        assert!(failure.is_transient());
        assert_eq!(failure.stage(), Some(Stage::SyntaxTree));
        assert_eq!(
            failure.to_string(),
            "syntax tree production failed: lexer exploded"
        );

        let violation = HarnessError::ContractViolation {
            stage: Stage::Analysis,
        };
        assert!(violation.is_contract_violation());
        assert!(!violation.is_setup_failure());

        let setup = HarnessError::InterpreterUnavailable {
            path: PathBuf::from("/opt/missing/python"),
            reason: "not found".to_string(),
        };
        assert!(setup.is_setup_failure());
        assert_eq!(setup.stage(), Some(Stage::Setup));
    }

    #[test]
    fn test_json_error_conversion() {
        let error: HarnessError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(error, HarnessError::InvalidConfiguration { .. }));
    }
}

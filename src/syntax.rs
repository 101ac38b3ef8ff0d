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

//! Syntax tree values handed between the parser collaborator and the analyzer
//!
//! The harness never inspects these beyond passing them along; the shapes are
//! what the built-in stand-in parser produces.

use serde::Serialize;
use std::fmt;

/// Byte range within a document's source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Span {
    /// Start byte offset (inclusive)
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
}

impl Span {
    /// Create a new span
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// True for zero-length spans
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shift the span by `offset` bytes
    pub fn offset(self, offset: usize) -> Self {
        Self::new(self.start + offset, self.end + offset)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Identifier occurrence
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Name {
    /// Identifier text
    pub text: String,
    /// Location in the source
    pub span: Span,
}

impl Name {
    /// Create a new name
    pub fn new(text: impl Into<String>, span: Span) -> Self {
        Self {
            text: text.into(),
            span,
        }
    }
}

/// Statement payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementKind {
    /// `target = value`
    Assignment {
        /// Bound name
        target: Name,
        /// Names referenced by the value expression
        references: Vec<Name>,
    },
    /// Bare expression
    Expression {
        /// Names referenced by the expression
        references: Vec<Name>,
    },
}

/// One statement of a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Statement payload
    pub kind: StatementKind,
    /// Location in the source
    pub span: Span,
}

impl Statement {
    /// Names referenced by the statement, in source order
    pub fn references(&self) -> &[Name] {
        match &self.kind {
            StatementKind::Assignment { references, .. } => references,
            StatementKind::Expression { references } => references,
        }
    }

    /// Name bound by the statement, if any
    pub fn target(&self) -> Option<&Name> {
        match &self.kind {
            StatementKind::Assignment { target, .. } => Some(target),
            StatementKind::Expression { .. } => None,
        }
    }
}

/// Recoverable syntax problem recorded in the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    /// Human-readable message
    pub message: String,
    /// Location in the source
    pub span: Span,
}

/// Parsed form of a document
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyntaxTree {
    statements: Vec<Statement>,
    errors: Vec<SyntaxError>,
    source_len: usize,
}

impl SyntaxTree {
    /// Create a tree from its parts
    pub fn new(statements: Vec<Statement>, errors: Vec<SyntaxError>, source_len: usize) -> Self {
        Self {
            statements,
            errors,
            source_len,
        }
    }

    /// Statements in source order
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Syntax errors in source order
    pub fn errors(&self) -> &[SyntaxError] {
        &self.errors
    }

    /// Length of the parsed source in bytes
    pub fn source_len(&self) -> usize {
        self.source_len
    }

    /// True when parsing recorded no errors
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

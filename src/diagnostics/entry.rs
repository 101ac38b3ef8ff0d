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

//! Diagnostic entries

use crate::syntax::Span;
use serde::Serialize;
use std::fmt;
use url::Url;

/// Severity levels for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Error that invalidates the analysed code
    Error,
    /// Warning about potential issues
    Warning,
    /// Informational message
    Information,
    /// Hint for improvements
    Hint,
}

impl Severity {
    /// LSP numeric severity
    pub fn lsp_code(self) -> u8 {
        match self {
            Severity::Error => 1,
            Severity::Warning => 2,
            Severity::Information => 3,
            Severity::Hint => 4,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Information => "info",
            Severity::Hint => "hint",
        };
        f.write_str(name)
    }
}

/// A single reported finding tied to a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticsEntry {
    /// Diagnostic severity
    pub severity: Severity,
    /// Diagnostic code (for categorization)
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Location the diagnostic applies to
    pub span: Option<Span>,
    /// Identity of the document the diagnostic belongs to
    pub document: Url,
}

impl DiagnosticsEntry {
    /// Create a new entry without a location
    pub fn new(
        document: Url,
        severity: Severity,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            code: code.into(),
            message: message.into(),
            span: None,
            document,
        }
    }

    /// Create an error entry
    pub fn error(document: Url, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(document, Severity::Error, code, message)
    }

    /// Create a warning entry
    pub fn warning(document: Url, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(document, Severity::Warning, code, message)
    }

    /// Attach a source location
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Convert to LSP diagnostic format, resolving the span against `source`
    pub fn to_lsp_json(&self, source: &str) -> serde_json::Value {
        let range = match self.span {
            Some(span) => {
                let (start_line, start_character) = offset_to_position(span.start, source);
                let (end_line, end_character) = offset_to_position(span.end, source);
                serde_json::json!({
                    "start": { "line": start_line, "character": start_character },
                    "end": { "line": end_line, "character": end_character },
                })
            }
            None => serde_json::json!({
                "start": { "line": 0, "character": 0 },
                "end": { "line": 0, "character": 0 },
            }),
        };

        serde_json::json!({
            "range": range,
            "severity": self.severity.lsp_code(),
            "code": self.code,
            "source": "analysis-harness",
            "message": self.message,
        })
    }
}

impl fmt::Display for DiagnosticsEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.severity, self.code, self.message)?;
        if let Some(span) = self.span {
            write!(f, " at {span}")?;
        }
        Ok(())
    }
}

/// Convert byte offset to a zero-based (line, UTF-16 character) position
fn offset_to_position(offset: usize, text: &str) -> (u32, u32) {
    let mut line = 0u32;
    let mut character = 0u32;

    for (i, ch) in text.char_indices() {
        if i >= offset {
            break;
        }

        if ch == '\n' {
            line += 1;
            character = 0;
        } else {
            character += ch.len_utf16() as u32;
        }
    }

    (line, character)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri() -> Url {
        Url::parse("file:///workspace/module.py").unwrap()
    }

    #[test]
    fn test_entry_display() {
        let entry = DiagnosticsEntry::error(uri(), "undefined-name", "\"y\" is not defined")
            .with_span(Span::new(4, 5));
        assert_eq!(
            entry.to_string(),
            "error[undefined-name]: \"y\" is not defined at 4..5"
        );
    }

    #[test]
    fn test_lsp_json_positions() {
        let source = "x = 1\nprint(y)\n";
        let entry = DiagnosticsEntry::error(uri(), "undefined-name", "\"y\" is not defined")
            .with_span(Span::new(12, 13));
        let json = entry.to_lsp_json(source);

        assert_eq!(json["severity"], 1);
        assert_eq!(json["range"]["start"]["line"], 1);
        assert_eq!(json["range"]["start"]["character"], 6);
        assert_eq!(json["range"]["end"]["character"], 7);
        assert_eq!(json["code"], "undefined-name");
    }

    #[test]
    fn test_lsp_positions_count_utf16_units() {
        let source = "s = '😀é'; print(y)";
        let start = source.find('y').unwrap();
        let entry = DiagnosticsEntry::error(uri(), "undefined-name", "\"y\" is not defined")
            .with_span(Span::new(start, start + 1));
        let json = entry.to_lsp_json(source);

        // the emoji is two UTF-16 units, the accented letter one
        assert_eq!(json["range"]["start"]["character"], 17);
        assert_eq!(json["range"]["end"]["character"], 18);
    }

    #[test]
    fn test_entry_serializes() {
        let entry = DiagnosticsEntry::warning(uri(), "shadowed", "x shadows a builtin")
            .with_span(Span::new(0, 1));
        let value = serde_json::to_value(&entry).unwrap();

        assert_eq!(
            value,
            serde_json::json!({
                "severity": "warning",
                "code": "shadowed",
                "message": "x shadows a builtin",
                "span": { "start": 0, "end": 1 },
                "document": "file:///workspace/module.py",
            })
        );
    }
}

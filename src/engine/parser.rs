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

//! Line-oriented parser for the built-in analyzer
//!
//! Every non-blank line is one statement: either `name = expression` or a bare
//! expression. Expressions are only scanned for the identifiers they reference;
//! string and numeric literals, attribute names after `.` and keywords are
//! skipped. Problems are recorded in the tree rather than failing the parse.

use crate::syntax::{Name, Span, Statement, StatementKind, SyntaxError, SyntaxTree};

const KEYWORDS: &[&str] = &["and", "or", "not", "in", "is", "if", "else", "lambda"];

const AUGMENTING: &[char] = &['+', '-', '*', '/', '%', '&', '|', '^', '@'];

/// Parse `source` into a syntax tree
pub fn parse_source(source: &str) -> SyntaxTree {
    let mut statements = Vec::new();
    let mut errors = Vec::new();
    let mut line_start = 0;

    for line in source.split_inclusive('\n') {
        let offset = line_start;
        line_start += line.len();

        let code = strip_comment(line.trim_end_matches(['\n', '\r']));
        if code.trim().is_empty() {
            continue;
        }

        let indent = code.len() - code.trim_start().len();
        let span = Span::new(offset + indent, offset + code.trim_end().len());

        let kind = match find_assignment(code) {
            Some(assignment) => {
                let raw_target = strip_annotation(&code[..assignment.target_end]);
                let target_text = raw_target.trim();
                if !is_identifier(target_text) {
                    errors.push(SyntaxError {
                        message: format!("cannot assign to '{target_text}'"),
                        span,
                    });
                    continue;
                }

                let target_start = offset + raw_target.len() - raw_target.trim_start().len();
                let target = Name::new(
                    target_text,
                    Span::new(0, target_text.len()).offset(target_start),
                );

                // `x += 1` reads `x` before binding it
                let mut references = Vec::new();
                if assignment.augmented {
                    references.push(target.clone());
                }
                references.extend(scan_names(
                    &code[assignment.value_start..],
                    offset + assignment.value_start,
                    &mut errors,
                ));
                StatementKind::Assignment { target, references }
            }
            None => StatementKind::Expression {
                references: scan_names(code, offset, &mut errors),
            },
        };

        statements.push(Statement { kind, span });
    }

    SyntaxTree::new(statements, errors, source.len())
}

/// Cut a trailing `#` comment that is not inside a string literal
fn strip_comment(line: &str) -> &str {
    let mut quote = None;
    for (i, c) in line.char_indices() {
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(open), _) if c == open => quote = None,
            (None, '#') => return &line[..i],
            _ => {}
        }
    }
    line
}

/// Location of a top-level binding `=` within a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Assignment {
    /// End of the target text, before any augmenting operator
    target_end: usize,
    /// Start of the value expression
    value_start: usize,
    /// `x += 1` and friends
    augmented: bool,
}

fn find_assignment(code: &str) -> Option<Assignment> {
    let bytes = code.as_bytes();
    let mut quote = None;
    let mut depth = 0usize;

    for (i, &b) in bytes.iter().enumerate() {
        match (quote, b) {
            (None, b'"' | b'\'') => quote = Some(b),
            (Some(open), _) if b == open => quote = None,
            (Some(_), _) => {}
            (None, b'(' | b'[' | b'{') => depth += 1,
            (None, b')' | b']' | b'}') => depth = depth.saturating_sub(1),
            (None, b'=') if depth == 0 => {
                if bytes.get(i + 1) == Some(&b'=') {
                    continue;
                }
                let head = &code[..i];
                let operator = if head.ends_with("<<") || head.ends_with(">>") {
                    2
                } else if head.ends_with(['=', '!', '<', '>']) {
                    continue;
                } else {
                    head.len() - head.trim_end_matches(AUGMENTING).len()
                };
                return Some(Assignment {
                    target_end: i - operator,
                    value_start: i + 1,
                    augmented: operator > 0,
                });
            }
            _ => {}
        }
    }
    None
}

/// Drop a `: annotation` from an assignment target
fn strip_annotation(target: &str) -> &str {
    target.split_once(':').map_or(target, |(name, _)| name)
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !KEYWORDS.contains(&text)
}

/// Collect identifiers referenced by an expression starting at byte `base`
fn scan_names(text: &str, base: usize, errors: &mut Vec<SyntaxError>) -> Vec<Name> {
    let bytes = text.as_bytes();
    let mut names = Vec::new();
    let mut after_dot = false;
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        if c == b'"' || c == b'\'' {
            match text[i + 1..].find(c as char) {
                Some(close) => i += close + 2,
                None => {
                    errors.push(SyntaxError {
                        message: "unterminated string literal".to_string(),
                        span: Span::new(i, text.len()).offset(base),
                    });
                    break;
                }
            }
            after_dot = false;
        } else if c.is_ascii_digit() {
            while i < bytes.len()
                && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'.' || bytes[i] == b'_')
            {
                i += 1;
            }
            after_dot = false;
        } else if c.is_ascii_alphabetic() || c == b'_' {
            let start = i;
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            let word = &text[start..i];
            if !after_dot && !KEYWORDS.contains(&word) {
                names.push(Name::new(word, Span::new(start, i).offset(base)));
            }
            after_dot = false;
        } else {
            if c == b'.' {
                after_dot = true;
            } else if !c.is_ascii_whitespace() {
                after_dot = false;
            }
            i += 1;
        }
    }

    names
}

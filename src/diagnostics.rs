// json-revisions keeps an append-only revision history for JSON documents
// Copyright (C) 2025  Peoples Grocers LLC
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
//
// To purchase a license under different terms contact admin@peoplesgrocers.com
// To request changes, report bugs, or give user feedback contact
// marxism@peoplesgrocers.com
//

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Fatal,
    Warning,
    Info,
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticLevel::Fatal => write!(f, "error"),
            DiagnosticLevel::Warning => write!(f, "warning"),
            DiagnosticLevel::Info => write!(f, "info"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticCode {
    MalformedDocument,

    InvalidPointerSyntax,
    PathNotFound,
    InvalidArrayIndex,

    ConflictingAdd,
    InvalidOperation,

    VersionNotFound,
    ConcurrentModification,
    InvalidRevision,

    StorageFailure,

    InvalidArgument,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::MalformedDocument => "E001",

            DiagnosticCode::InvalidPointerSyntax => "E010",
            DiagnosticCode::PathNotFound => "E011",
            DiagnosticCode::InvalidArrayIndex => "E012",

            DiagnosticCode::ConflictingAdd => "E020",
            DiagnosticCode::InvalidOperation => "E021",

            DiagnosticCode::VersionNotFound => "E030",
            DiagnosticCode::ConcurrentModification => "E031",
            DiagnosticCode::InvalidRevision => "E032",

            DiagnosticCode::StorageFailure => "E040",

            DiagnosticCode::InvalidArgument => "E050",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            DiagnosticCode::MalformedDocument => "Malformed document",

            DiagnosticCode::InvalidPointerSyntax => "Invalid JSON Pointer syntax",
            DiagnosticCode::PathNotFound => "Path not found",
            DiagnosticCode::InvalidArrayIndex => "Invalid array index",

            DiagnosticCode::ConflictingAdd => "Conflicting add",
            DiagnosticCode::InvalidOperation => "Invalid operation",

            DiagnosticCode::VersionNotFound => "Version not found",
            DiagnosticCode::ConcurrentModification => "Concurrent modification",
            DiagnosticCode::InvalidRevision => "Invalid revision",

            DiagnosticCode::StorageFailure => "Storage failure",

            DiagnosticCode::InvalidArgument => "Invalid argument",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub filename: Option<String>,
    pub line_number: Option<usize>,
    pub level: DiagnosticLevel,
    pub code: DiagnosticCode,
    pub description: String,
    pub code_snippet: Option<String>,
    pub advice: Option<String>,
}

impl Diagnostic {
    pub fn new(level: DiagnosticLevel, code: DiagnosticCode, description: String) -> Self {
        Self {
            filename: None,
            line_number: None,
            level,
            code,
            description,
            code_snippet: None,
            advice: None,
        }
    }

    /// Shorthand for the common case: every error the library returns is fatal
    /// to the operation that produced it.
    pub fn fatal(code: DiagnosticCode, description: String) -> Self {
        Self::new(DiagnosticLevel::Fatal, code, description)
    }

    pub fn with_location(mut self, filename: String, line_number: usize) -> Self {
        self.filename = Some(filename);
        self.line_number = Some(line_number);
        self
    }

    pub fn with_snippet(mut self, snippet: String) -> Self {
        self.code_snippet = Some(snippet);
        self
    }

    pub fn with_advice(mut self, advice: String) -> Self {
        self.advice = Some(advice);
        self
    }

    pub fn is_fatal(&self) -> bool {
        self.level == DiagnosticLevel::Fatal
    }

    /// A failed optimistic append. The caller should reload the head and try again.
    pub fn is_retryable(&self) -> bool {
        self.code == DiagnosticCode::ConcurrentModification
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let (Some(filename), Some(line)) = (&self.filename, self.line_number) {
            write!(f, "{}:{} - ", filename, line)?;
        }

        writeln!(
            f,
            "{} {}: {}",
            self.level,
            self.code.as_str(),
            self.code.title()
        )?;
        writeln!(f)?;
        writeln!(f, "{}", self.description)?;

        if let Some(snippet) = &self.code_snippet {
            writeln!(f)?;
            writeln!(f, "{}", snippet)?;
        }

        if let Some(advice) = &self.advice {
            writeln!(f)?;
            writeln!(f, "{}", advice)?;
        }

        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self {
            diagnostics: Vec::new(),
        }
    }

    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.diagnostics.extend(diagnostics);
    }

    pub fn has_fatal(&self) -> bool {
        self.diagnostics.iter().any(|d| d.is_fatal())
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

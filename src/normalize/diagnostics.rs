use std::fmt;
use tracing::{error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &str {
        match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// An out-of-band note about something the normalizer absorbed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// 0-based position of the row in its batch.
    pub row: Option<usize>,
    pub field: Option<&'static str>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            row: None,
            field: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(message)
        }
    }

    pub fn at_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }

    pub fn on_field(mut self, field: &'static str) -> Self {
        self.field = Some(field);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity.as_str(), self.message)?;
        if let Some(row) = self.row {
            write!(f, " (row {})", row)?;
        }
        if let Some(field) = self.field {
            write!(f, " [{}]", field)?;
        }
        Ok(())
    }
}

/// Write-only destination for diagnostics. Never blocks the normalizer.
pub trait DiagnosticSink {
    fn emit(&mut self, diagnostic: Diagnostic);
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn emit(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &mut S {
    fn emit(&mut self, diagnostic: Diagnostic) {
        (**self).emit(diagnostic);
    }
}

/// Forwards diagnostics to `tracing`, keeping a count per severity.
#[derive(Debug, Default)]
pub struct TracingSink {
    pub warnings: usize,
    pub errors: usize,
}

impl TracingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> usize {
        self.warnings + self.errors
    }
}

impl DiagnosticSink for TracingSink {
    fn emit(&mut self, d: Diagnostic) {
        match d.severity {
            Severity::Warning => {
                self.warnings += 1;
                warn!(row = ?d.row, field = ?d.field, "{}", d.message);
            }
            Severity::Error => {
                self.errors += 1;
                error!(row = ?d.row, field = ?d.field, "{}", d.message);
            }
        }
    }
}

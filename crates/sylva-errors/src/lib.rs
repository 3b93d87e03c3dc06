//! Diagnostics attached to syntax facts.
//!
//! A [`Diagnostic`] is positioned relative to the node that owns it; it only
//! gets an absolute [`TextRange`] once a positioned view resolves it into a
//! [`ResolvedDiagnostic`].

use std::fmt;

pub use annotate_snippets::Renderer;
use annotate_snippets::{Level, Snippet};
pub use text_size::{TextRange, TextSize};

/// How bad a diagnostic is.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    fn level(self) -> Level {
        match self {
            Severity::Info => Level::Info,
            Severity::Warning => Level::Warning,
            Severity::Error => Level::Error,
        }
    }
}

/// Numeric diagnostic code. Message text lives with whoever renders it.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct DiagnosticCode(pub u16);

impl DiagnosticCode {
    /// A required token could not be consumed.
    pub const EXPECTED_TOKEN: Self = Self(1);
    /// A token was found where none was allowed.
    pub const UNEXPECTED_TOKEN: Self = Self(2);
    /// Input was skipped during recovery.
    pub const SKIPPED_TEXT: Self = Self(3);
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.0)
    }
}

/// A diagnostic positioned relative to the span start of its owning node.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Diagnostic {
    code: DiagnosticCode,
    severity: Severity,
    offset: TextSize,
    width: TextSize,
}

impl Diagnostic {
    pub fn new(code: DiagnosticCode, severity: Severity, offset: TextSize, width: TextSize) -> Self {
        Self { code, severity, offset, width }
    }

    pub fn error(code: DiagnosticCode, offset: TextSize, width: TextSize) -> Self {
        Self::new(code, Severity::Error, offset, width)
    }

    pub fn warning(code: DiagnosticCode, offset: TextSize, width: TextSize) -> Self {
        Self::new(code, Severity::Warning, offset, width)
    }

    pub fn code(&self) -> DiagnosticCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Offset from the span start of the owning node.
    pub fn offset(&self) -> TextSize {
        self.offset
    }

    pub fn width(&self) -> TextSize {
        self.width
    }

    /// Returns the same diagnostic shifted to another relative offset.
    #[must_use]
    pub fn with_offset(self, offset: TextSize) -> Self {
        Self { offset, ..self }
    }

    /// Anchors the diagnostic at `span_start`, the absolute start of its owner.
    pub fn resolve(self, span_start: TextSize) -> ResolvedDiagnostic {
        let range = TextRange::at(span_start + self.offset, self.width);
        ResolvedDiagnostic { diagnostic: self, range }
    }
}

/// A diagnostic with an absolute source range.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ResolvedDiagnostic {
    diagnostic: Diagnostic,
    range: TextRange,
}

impl ResolvedDiagnostic {
    pub fn diagnostic(&self) -> Diagnostic {
        self.diagnostic
    }

    pub fn code(&self) -> DiagnosticCode {
        self.diagnostic.code
    }

    pub fn severity(&self) -> Severity {
        self.diagnostic.severity
    }

    pub fn range(&self) -> TextRange {
        self.range
    }

    pub fn render<'a>(
        &self,
        renderer: &'a Renderer,
        path: &'a str,
        text: &'a str,
        message: &'a str,
        code: &'a str,
    ) -> impl fmt::Display + 'a {
        let level = self.severity().level();
        let message = level.title(message).id(code).snippet(
            Snippet::source(text)
                .origin(path)
                .annotation(level.span(self.range.into()).label("here"))
                .fold(true),
        );
        renderer.render(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_display() {
        assert_eq!(DiagnosticCode::EXPECTED_TOKEN.to_string(), "E0001");
        assert_eq!(DiagnosticCode(420).to_string(), "E0420");
    }

    #[test]
    fn resolve_is_relative_to_owner() {
        let diagnostic =
            Diagnostic::error(DiagnosticCode::UNEXPECTED_TOKEN, 3.into(), 2.into());
        let resolved = diagnostic.resolve(10.into());
        assert_eq!(resolved.range(), TextRange::new(13.into(), 15.into()));
        assert_eq!(resolved.diagnostic(), diagnostic);
        assert_eq!(resolved.severity(), Severity::Error);
    }

    #[test]
    fn render_plain() {
        let text = "val x = ;\n";
        let diagnostic = Diagnostic::error(DiagnosticCode::EXPECTED_TOKEN, 0.into(), 1.into());
        let resolved = diagnostic.resolve(8.into());
        let code = resolved.code().to_string();

        let renderer = Renderer::plain();
        let rendered =
            resolved.render(&renderer, "main.sy", text, "expected an expression", &code).to_string();

        assert!(rendered.starts_with("error[E0001]: expected an expression"), "{rendered}");
        assert!(rendered.contains("main.sy:1:9"), "{rendered}");
    }
}

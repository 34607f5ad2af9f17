//! Diagnostic rendering for human-readable output.

use crate::diagnostic::Diagnostic;

/// Trait for rendering diagnostics into formatted output strings.
pub trait DiagnosticRenderer {
    /// Renders a single diagnostic into a formatted string.
    fn render(&self, diag: &Diagnostic) -> String;
}

/// Renders diagnostics in a rustc-style terminal format.
///
/// Produces output like:
/// ```text
/// warning[W101]: net not fully routed
///   --> net u_core/data[3] (SLICE_X2Y5/AQ -> SLICE_X40Y5/B2)
///    = note: ...
///    = help: ...
/// ```
pub struct TerminalRenderer {
    /// Whether to use ANSI color codes in output.
    pub color: bool,
}

impl TerminalRenderer {
    /// Creates a new terminal renderer.
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn header(&self, diag: &Diagnostic) -> String {
        let severity = format!("{}[{}]", diag.severity, diag.code);
        if !self.color {
            return severity;
        }
        let ansi = match diag.severity {
            crate::Severity::Error => "31",
            crate::Severity::Warning => "33",
        };
        format!("\x1b[1;{ansi}m{severity}\x1b[0m")
    }
}

impl DiagnosticRenderer for TerminalRenderer {
    fn render(&self, diag: &Diagnostic) -> String {
        let mut out = format!("{}: {}\n", self.header(diag), diag.message);

        if !diag.location.is_design() {
            out.push_str(&format!("  --> {}\n", diag.location));
        }
        for note in &diag.notes {
            out.push_str(&format!("   = note: {note}\n"));
        }
        for help in &diag.help {
            out.push_str(&format!("   = help: {help}\n"));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::DiagnosticCode;
    use crate::location::Location;

    #[test]
    fn render_warning_with_location() {
        let diag = Diagnostic::warning(
            DiagnosticCode::NET_NOT_FULLY_ROUTED,
            "net not fully routed",
            Location::connection("n1", "S0/AQ", "S1/A1"),
        );
        let output = TerminalRenderer::new(false).render(&diag);
        assert!(output.contains("warning[W101]: net not fully routed"));
        assert!(output.contains("--> net n1 (S0/AQ -> S1/A1)"));
    }

    #[test]
    fn render_notes_and_help() {
        let diag = Diagnostic::warning(
            DiagnosticCode::REPAIR_ABANDONED,
            "hold repair abandoned",
            Location::net("n1"),
        )
        .with_note("avoid set stopped growing")
        .with_help("lower hold.min_wirelength");
        let output = TerminalRenderer::new(false).render(&diag);
        assert!(output.contains("= note: avoid set stopped growing"));
        assert!(output.contains("= help: lower hold.min_wirelength"));
    }

    #[test]
    fn render_design_level_has_no_arrow() {
        let diag = Diagnostic::error(
            DiagnosticCode::MODEL_CORRUPTION,
            "device model inconsistent",
            Location::Design,
        );
        let output = TerminalRenderer::new(false).render(&diag);
        assert!(output.contains("error[E302]: device model inconsistent"));
        assert!(!output.contains("-->"));
    }

    #[test]
    fn render_color_wraps_header() {
        let diag = Diagnostic::error(DiagnosticCode::MODEL_CORRUPTION, "x", Location::Design);
        let output = TerminalRenderer::new(true).render(&diag);
        assert!(output.starts_with("\x1b[1;31m"));
    }
}

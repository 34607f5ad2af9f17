//! `holdfix report`: measurement and ranking of a routed snapshot.

use std::path::Path;

use holdfix_diagnostics::DiagnosticSink;
use holdfix_route::HoldFixer;

use crate::pipeline::{finish, load_config, load_snapshot, render_diagnostics};
use crate::{GlobalArgs, ReportArgs, ReportFormat};

/// Runs the `holdfix report` command.
///
/// Returns exit code 0 if no errors, 1 if a hard failure was diagnosed.
pub fn run(args: &ReportArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let config = load_config(global)?;
    let snapshot = load_snapshot(Path::new(&args.snapshot))?;

    if !global.quiet && args.format == ReportFormat::Text {
        eprintln!(
            "   Measuring {} ({} nets) on {}",
            snapshot.design.name,
            snapshot.design.net_count(),
            snapshot.device.name
        );
    }

    let sink = DiagnosticSink::new();
    let mut fixer = HoldFixer::new(&snapshot.device, config);
    let report = match fixer.report(&snapshot.design, &sink) {
        Ok(report) => Some(report),
        Err(err) => {
            sink.emit(err.to_diagnostic());
            None
        }
    };

    let diagnostics = sink.diagnostics();
    let rendered = render_diagnostics(&diagnostics, args.format, global);
    match args.format {
        ReportFormat::Text => {
            if let Some(ref report) = report {
                print!("{}", report.render_text());
            }
        }
        ReportFormat::Json => {
            let json = serde_json::json!({
                "report": report,
                "diagnostics": rendered,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }

    Ok(finish(&sink, args.format, global))
}

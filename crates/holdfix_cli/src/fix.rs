//! `holdfix fix`: hold repair of a routed snapshot.
//!
//! 1. Load config and snapshot
//! 2. Report the design as routed
//! 3. Repair hold-risk connections with the maze router
//! 4. Report again and write the updated snapshot

use std::path::Path;

use holdfix_diagnostics::DiagnosticSink;
use holdfix_route::report::render_summary;
use holdfix_route::{DesignReport, HoldFixer, MazeRouter, RepairError, RepairSummary};

use crate::pipeline::{finish, load_config, load_snapshot, render_diagnostics, save_snapshot, Snapshot};
use crate::{FixArgs, GlobalArgs, ReportFormat};

struct FixOutcome {
    before: DesignReport,
    summary: RepairSummary,
    after: DesignReport,
}

fn repair(
    snapshot: &mut Snapshot,
    router: &mut MazeRouter,
    fixer_config: holdfix_config::HoldfixConfig,
    sink: &DiagnosticSink,
) -> Result<FixOutcome, RepairError> {
    let mut fixer = HoldFixer::new(&snapshot.device, fixer_config);
    let before = fixer.report(&snapshot.design, sink)?;
    let summary = fixer.fix_hold_violations(&mut snapshot.design, router, sink)?;
    // Unrouted-sink warnings were already reported by the first pass.
    let after = fixer.report(&snapshot.design, &DiagnosticSink::new())?;
    Ok(FixOutcome {
        before,
        summary,
        after,
    })
}

/// Runs the `holdfix fix` command.
///
/// The output snapshot is written only when repair completes without a hard
/// failure. Returns exit code 0 on success, 1 otherwise.
pub fn run(args: &FixArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let config = load_config(global)?;
    let mut snapshot = load_snapshot(Path::new(&args.snapshot))?;
    let mut router = match args.expansion_limit {
        Some(limit) => MazeRouter::with_expansion_limit(limit),
        None => MazeRouter::new(),
    };

    if !global.quiet && args.format == ReportFormat::Text {
        eprintln!(
            "   Repairing {} (threshold {})",
            snapshot.design.name, config.hold.min_wirelength
        );
    }

    let sink = DiagnosticSink::new();
    let outcome = match repair(&mut snapshot, &mut router, config, &sink) {
        Ok(outcome) => {
            save_snapshot(Path::new(&args.output), &snapshot)?;
            tracing::info!(output = %args.output, "wrote repaired snapshot");
            Some(outcome)
        }
        Err(err) => {
            sink.emit(err.to_diagnostic());
            None
        }
    };

    let diagnostics = sink.diagnostics();
    let rendered = render_diagnostics(&diagnostics, args.format, global);
    match args.format {
        ReportFormat::Text => {
            if let Some(ref outcome) = outcome {
                print!("{}", outcome.before.render_text());
                println!();
                print!("{}", render_summary(&outcome.summary));
                println!();
                print!("{}", outcome.after.render_text());
            }
        }
        ReportFormat::Json => {
            let json = match outcome {
                Some(ref o) => serde_json::json!({
                    "before": o.before,
                    "summary": o.summary,
                    "after": o.after,
                    "diagnostics": rendered,
                }),
                None => serde_json::json!({ "diagnostics": rendered }),
            };
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }

    Ok(finish(&sink, args.format, global))
}

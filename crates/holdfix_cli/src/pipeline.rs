//! Shared pipeline helpers for CLI commands.
//!
//! Snapshot loading and saving, configuration lookup, and diagnostic
//! rendering, used by both `report` and `fix`.

use std::path::{Path, PathBuf};

use holdfix_config::{HoldfixConfig, CONFIG_FILE_NAME};
use holdfix_device::DeviceGraph;
use holdfix_diagnostics::{Diagnostic, DiagnosticRenderer, DiagnosticSink, TerminalRenderer};
use holdfix_route::RoutedDesign;
use serde::{Deserialize, Serialize};

use crate::{GlobalArgs, ReportFormat};

/// A routed design together with the device it is placed on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// The device's routing-resource graph.
    pub device: DeviceGraph,
    /// The placed and routed design.
    pub design: RoutedDesign,
}

impl Snapshot {
    /// Parses a snapshot from JSON and restores its lookup indices.
    pub fn from_json(text: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let mut snapshot: Snapshot = serde_json::from_str(text)?;
        snapshot.device.rebuild_indices();
        snapshot.device.validate()?;
        snapshot.design.rebuild_indices();
        Ok(snapshot)
    }
}

/// Reads a snapshot file.
pub fn load_snapshot(path: &Path) -> Result<Snapshot, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read snapshot {}: {e}", path.display()))?;
    let snapshot = Snapshot::from_json(&text)?;
    tracing::debug!(
        path = %path.display(),
        nets = snapshot.design.net_count(),
        nodes = snapshot.device.node_count(),
        "loaded snapshot"
    );
    Ok(snapshot)
}

/// Writes a snapshot file as pretty-printed JSON.
pub fn save_snapshot(path: &Path, snapshot: &Snapshot) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(snapshot)?;
    std::fs::write(path, json)
        .map_err(|e| format!("cannot write snapshot {}: {e}", path.display()))?;
    Ok(())
}

/// Resolves the configuration file to use, if any.
///
/// An explicit `--config` path wins; otherwise `holdfix.toml` in the current
/// directory is used when present.
pub fn resolve_config_path(global: &GlobalArgs) -> Option<PathBuf> {
    match global.config {
        Some(ref path) => Some(PathBuf::from(path)),
        None => {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            local.is_file().then_some(local)
        }
    }
}

/// Loads the configuration, falling back to defaults when no file is found.
pub fn load_config(global: &GlobalArgs) -> Result<HoldfixConfig, Box<dyn std::error::Error>> {
    match resolve_config_path(global) {
        Some(path) => Ok(holdfix_config::load_config(&path)?),
        None => Ok(HoldfixConfig::default()),
    }
}

/// Renders diagnostics in the requested format.
///
/// Text goes to stderr; JSON is returned for the caller to embed.
pub fn render_diagnostics(
    diagnostics: &[Diagnostic],
    format: ReportFormat,
    global: &GlobalArgs,
) -> serde_json::Value {
    match format {
        ReportFormat::Text => {
            let renderer = TerminalRenderer::new(global.color);
            for diag in diagnostics {
                eprintln!("{}", renderer.render(diag));
            }
            serde_json::Value::Null
        }
        ReportFormat::Json => {
            serde_json::to_value(diagnostics).unwrap_or(serde_json::Value::Array(Vec::new()))
        }
    }
}

/// Prints the error/warning tally and returns the exit code.
pub fn finish(sink: &DiagnosticSink, format: ReportFormat, global: &GlobalArgs) -> i32 {
    if !global.quiet && format == ReportFormat::Text {
        eprintln!(
            "   Result: {} error(s), {} warning(s)",
            sink.error_count(),
            sink.warning_count()
        );
    }
    if sink.has_errors() {
        1
    } else {
        0
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use holdfix_device::{ClockRegion, NodeKind, TileType};
    use holdfix_route::{NetKind, PhysNet, PinRole};
    use std::fs;
    use tempfile::TempDir;

    /// A one-net snapshot whose sink crosses into clock-region column 1
    /// over a 23-long route, with a 123-long detour available.
    pub(crate) fn sample_snapshot() -> Snapshot {
        let mut dev = DeviceGraph::new("sample");
        let int = dev.add_tile("INT_X1Y0", 1, 0, TileType::Interconnect, ClockRegion::new(0, 0));
        let clb0 = dev.add_tile("CLB_X0Y0", 0, 0, TileType::Logic, ClockRegion::new(0, 0));
        let clb1 = dev.add_tile("CLB_X4Y0", 4, 0, TileType::Logic, ClockRegion::new(1, 0));
        let s0 = dev.add_site("SLICE_X0Y0", clb0);
        let s1 = dev.add_site("SLICE_X4Y0", clb1);
        let aq = dev.add_node("CLB_X0Y0/AQ", clb0, NodeKind::SitePin);
        let out = dev.add_node("INT_X1Y0/LOGIC_OUTS0", int, NodeKind::Output);
        let hop = dev.add_node("INT_X1Y0/EE2BEG0", int, NodeKind::Double);
        let long = dev.add_node("INT_X1Y0/LH0", int, NodeKind::Long);
        let feed = dev.add_node("INT_X1Y0/IMUX0", int, NodeKind::PinFeed);
        let a1 = dev.add_node("CLB_X4Y0/A1", clb1, NodeKind::SitePin);
        let route = [
            dev.add_edge(aq, out),
            dev.add_edge(out, hop),
            dev.add_edge(hop, feed),
            dev.add_edge(feed, a1),
        ];
        dev.add_edge(out, long);
        dev.add_edge(long, feed);
        dev.add_site_pin(s0, "AQ", aq);
        dev.add_site_pin(s1, "A1", a1);

        let mut design = RoutedDesign::new("sample");
        let src = design.add_pin(s0, "AQ", PinRole::General);
        let dst = design.add_pin(s1, "A1", PinRole::General);
        let mut net = PhysNet::new("q", NetKind::Wire, Some(src));
        net.sinks = vec![dst];
        net.routing = route.into_iter().collect();
        design.add_net(net);
        Snapshot {
            device: dev,
            design,
        }
    }

    #[test]
    fn snapshot_file_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("snap.json");
        let snapshot = sample_snapshot();
        save_snapshot(&path, &snapshot).unwrap();
        let back = load_snapshot(&path).unwrap();
        assert_eq!(back.design.net_count(), 1);
        assert_eq!(back.design.net_named("q"), snapshot.design.net_named("q"));
        assert_eq!(back.device.node_count(), snapshot.device.node_count());
        assert_eq!(back.design.nets[0].routing, snapshot.design.nets[0].routing);
    }

    #[test]
    fn missing_snapshot_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let err = load_snapshot(&tmp.path().join("absent.json")).unwrap_err();
        assert!(err.to_string().contains("cannot read snapshot"));
    }

    #[test]
    fn malformed_snapshot_is_an_error() {
        assert!(Snapshot::from_json("{\"device\": 3}").is_err());
    }

    #[test]
    fn explicit_config_is_loaded() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[hold]\nmin_wirelength = 250\n").unwrap();
        let global = GlobalArgs {
            quiet: true,
            verbose: false,
            color: false,
            config: Some(path.to_str().unwrap().to_string()),
        };
        let config = load_config(&global).unwrap();
        assert_eq!(config.hold.min_wirelength, 250);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[report]\ntop_k = 0\n").unwrap();
        let global = GlobalArgs {
            quiet: true,
            verbose: false,
            color: false,
            config: Some(path.to_str().unwrap().to_string()),
        };
        assert!(load_config(&global).is_err());
    }
}

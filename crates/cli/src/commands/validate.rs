use std::collections::BTreeMap;
use std::path::PathBuf;

use callscript_core::config::LoadOptions;
use callscript_core::script::DanglingEdge;
use clap::Args;
use serde::Serialize;
use tracing::info;

use crate::commands::{load_config, load_script, CommandResult};

#[derive(Debug, Clone, Default, Args)]
pub struct ValidateArgs {
    #[arg(long, help = "Script file to lint instead of the configured one")]
    pub script: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct ValidationReport {
    source: String,
    start: String,
    node_count: usize,
    openers: BTreeMap<String, String>,
    dangling_edges: Vec<DanglingEdge>,
    unreachable_nodes: Vec<String>,
}

pub fn run(options: &LoadOptions, args: &ValidateArgs) -> CommandResult {
    let config = match load_config(options) {
        Ok(config) => config,
        Err(error) => return CommandResult::from_error("validate", &error),
    };

    let path = args.script.clone().or(config.script.path);
    let graph = match load_script(path.as_deref()) {
        Ok(graph) => graph,
        Err(error) => return CommandResult::from_error("validate", &error),
    };

    let report = ValidationReport {
        source: path
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "built-in".to_string()),
        start: graph.start().to_string(),
        node_count: graph.len(),
        openers: graph.openers().clone(),
        dangling_edges: graph.dangling_edges(),
        unreachable_nodes: graph.unreachable_nodes(),
    };

    info!(
        event_name = "cli.validate.completed",
        source = %report.source,
        node_count = report.node_count,
        dangling_edges = report.dangling_edges.len(),
        unreachable_nodes = report.unreachable_nodes.len(),
        "script validated"
    );

    CommandResult::report("validate", &report)
}

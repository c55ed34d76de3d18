use std::env;
use std::fs;
use std::path::Path;

use callscript_core::config::{resolve_config_path, LoadOptions};
use toml::Value;

use crate::commands::{load_config, CommandResult};

pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match load_config(options) {
        Ok(config) => config,
        Err(error) => return CommandResult::from_error("config", &error),
    };

    let config_file_path = resolve_config_path(options.config_path.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_key: Option<&str>| {
        field_source(key_path, env_key, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let mut lines =
        vec!["effective config (source precedence: override > env > file > default):".to_string()];

    let script_path = config
        .script
        .path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<built-in>".to_string());
    lines.push(render_line(
        "script.path",
        &script_path,
        source("script.path", Some("CALLSCRIPT_SCRIPT_PATH")),
    ));
    lines.push(render_line(
        "script.opener",
        config.script.opener.as_deref().unwrap_or("<start>"),
        source("script.opener", Some("CALLSCRIPT_SCRIPT_OPENER")),
    ));

    lines.push(render_line(
        "agent.first_name",
        display_or_empty(&config.agent.first_name),
        overridden(options.overrides.agent_first_name.is_some())
            .unwrap_or_else(|| source("agent.first_name", Some("CALLSCRIPT_AGENT_FIRST_NAME"))),
    ));

    lines.push(render_line(
        "heuristics.savings_rate",
        &config.heuristics.savings_rate.to_string(),
        source("heuristics.savings_rate", Some("CALLSCRIPT_HEURISTICS_SAVINGS_RATE")),
    ));
    lines.push(render_line(
        "heuristics.discovery_stage",
        &config.heuristics.discovery_stage,
        source("heuristics.discovery_stage", Some("CALLSCRIPT_HEURISTICS_DISCOVERY_STAGE")),
    ));
    let ranges = config
        .heuristics
        .spend_ranges
        .iter()
        .map(|range| format!("{} => {}", range.label, range.midpoint))
        .collect::<Vec<_>>()
        .join("; ");
    lines.push(render_line(
        "heuristics.spend_ranges",
        &ranges,
        source("heuristics.spend_ranges", None),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        overridden(options.overrides.log_level.is_some())
            .unwrap_or_else(|| source("logging.level", Some("CALLSCRIPT_LOGGING_LEVEL"))),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        source("logging.format", Some("CALLSCRIPT_LOGGING_FORMAT")),
    ));

    CommandResult { exit_code: 0, output: lines.join("\n") }
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn overridden(is_set: bool) -> Option<String> {
    is_set.then(|| "override (command line)".to_string())
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn display_or_empty(value: &str) -> &str {
    if value.trim().is_empty() {
        "<empty>"
    } else {
        value
    }
}


use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::render::{default_spend_ranges, SpendHeuristics, SpendRange};

pub const DEFAULT_CONFIG_PATHS: [&str; 2] = ["callscript.toml", "config/callscript.toml"];

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub script: ScriptConfig,
    pub agent: AgentConfig,
    pub heuristics: HeuristicsConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScriptConfig {
    /// TOML script to load instead of the built-in one.
    pub path: Option<PathBuf>,
    /// Opener variant the operator last picked.
    pub opener: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AgentConfig {
    pub first_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeuristicsConfig {
    pub savings_rate: Decimal,
    pub discovery_stage: String,
    pub spend_ranges: Vec<SpendRange>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub script_path: Option<PathBuf>,
    pub opener: Option<String>,
    pub agent_first_name: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for HeuristicsConfig {
    fn default() -> Self {
        let defaults = SpendHeuristics::default();
        Self {
            savings_rate: defaults.savings_rate,
            discovery_stage: defaults.discovery_stage,
            spend_ranges: default_spend_ranges(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            script: ScriptConfig::default(),
            agent: AgentConfig::default(),
            heuristics: HeuristicsConfig::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl From<&HeuristicsConfig> for SpendHeuristics {
    fn from(value: &HeuristicsConfig) -> Self {
        Self {
            savings_rate: value.savings_rate,
            discovery_stage: value.discovery_stage.clone(),
            ranges: value.spend_ranges.clone(),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATHS[0]));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn spend_heuristics(&self) -> SpendHeuristics {
        SpendHeuristics::from(&self.heuristics)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(script) = patch.script {
            if let Some(path) = script.path {
                self.script.path = Some(path);
            }
            if let Some(opener) = script.opener {
                self.script.opener = Some(opener);
            }
        }

        if let Some(agent) = patch.agent {
            if let Some(first_name) = agent.first_name {
                self.agent.first_name = first_name;
            }
        }

        if let Some(heuristics) = patch.heuristics {
            if let Some(savings_rate) = heuristics.savings_rate {
                self.heuristics.savings_rate = savings_rate;
            }
            if let Some(discovery_stage) = heuristics.discovery_stage {
                self.heuristics.discovery_stage = discovery_stage;
            }
            if let Some(spend_ranges) = heuristics.spend_ranges {
                self.heuristics.spend_ranges = spend_ranges;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("CALLSCRIPT_SCRIPT_PATH") {
            self.script.path = Some(PathBuf::from(value));
        }
        if let Some(value) = read_env("CALLSCRIPT_SCRIPT_OPENER") {
            self.script.opener = Some(value);
        }

        if let Some(value) = read_env("CALLSCRIPT_AGENT_FIRST_NAME") {
            self.agent.first_name = value;
        }

        if let Some(value) = read_env("CALLSCRIPT_HEURISTICS_SAVINGS_RATE") {
            self.heuristics.savings_rate =
                parse_decimal("CALLSCRIPT_HEURISTICS_SAVINGS_RATE", &value)?;
        }
        if let Some(value) = read_env("CALLSCRIPT_HEURISTICS_DISCOVERY_STAGE") {
            self.heuristics.discovery_stage = value;
        }

        let log_level =
            read_env("CALLSCRIPT_LOGGING_LEVEL").or_else(|| read_env("CALLSCRIPT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("CALLSCRIPT_LOGGING_FORMAT").or_else(|| read_env("CALLSCRIPT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(script_path) = overrides.script_path {
            self.script.path = Some(script_path);
        }
        if let Some(opener) = overrides.opener {
            self.script.opener = Some(opener);
        }
        if let Some(agent_first_name) = overrides.agent_first_name {
            self.agent.first_name = agent_first_name;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_script(&self.script)?;
        validate_heuristics(&self.heuristics)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    DEFAULT_CONFIG_PATHS.into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_script(script: &ScriptConfig) -> Result<(), ConfigError> {
    if script.path.as_ref().is_some_and(|path| path.as_os_str().is_empty()) {
        return Err(ConfigError::Validation("script.path must not be empty".to_string()));
    }
    if script.opener.as_ref().is_some_and(|opener| opener.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "script.opener must not be blank; remove it to use the start node".to_string(),
        ));
    }
    Ok(())
}

fn validate_heuristics(heuristics: &HeuristicsConfig) -> Result<(), ConfigError> {
    if heuristics.savings_rate < Decimal::ZERO || heuristics.savings_rate > Decimal::ONE {
        return Err(ConfigError::Validation(
            "heuristics.savings_rate must be between 0 and 1".to_string(),
        ));
    }

    if heuristics.discovery_stage.trim().is_empty() {
        return Err(ConfigError::Validation(
            "heuristics.discovery_stage must not be empty".to_string(),
        ));
    }

    for range in &heuristics.spend_ranges {
        if range.label.trim().is_empty() {
            return Err(ConfigError::Validation(
                "heuristics.spend_ranges entries need a non-empty label".to_string(),
            ));
        }
        if range.midpoint <= Decimal::ZERO {
            return Err(ConfigError::Validation(format!(
                "heuristics.spend_ranges midpoint for `{}` must be greater than zero",
                range.label
            )));
        }
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_decimal(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    value.trim().parse::<Decimal>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    script: Option<ScriptPatch>,
    agent: Option<AgentPatch>,
    heuristics: Option<HeuristicsPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ScriptPatch {
    path: Option<PathBuf>,
    opener: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AgentPatch {
    first_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct HeuristicsPatch {
    savings_rate: Option<Decimal>,
    discovery_stage: Option<String>,
    spend_ranges: Option<Vec<SpendRange>>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use rust_decimal::Decimal;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
    use crate::render::SpendHeuristics;

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    const VARS: [&str; 9] = [
        "CALLSCRIPT_SCRIPT_PATH",
        "CALLSCRIPT_SCRIPT_OPENER",
        "CALLSCRIPT_AGENT_FIRST_NAME",
        "CALLSCRIPT_HEURISTICS_SAVINGS_RATE",
        "CALLSCRIPT_HEURISTICS_DISCOVERY_STAGE",
        "CALLSCRIPT_LOGGING_LEVEL",
        "CALLSCRIPT_LOGGING_FORMAT",
        "CALLSCRIPT_LOG_LEVEL",
        "CALLSCRIPT_LOG_FORMAT",
    ];

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_match_the_built_in_heuristics() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&VARS);

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.script.path.is_none(), "no script path by default")?;
        ensure(config.script.opener.is_none(), "no opener by default")?;
        ensure(
            config.spend_heuristics() == SpendHeuristics::default(),
            "default heuristics should round-trip through config",
        )?;
        ensure(matches!(config.logging.format, LogFormat::Compact), "compact logs by default")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&VARS);

        env::set_var("TEST_CALLSCRIPT_AGENT", "Riley");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("callscript.toml");
            fs::write(
                &path,
                r#"
[agent]
first_name = "${TEST_CALLSCRIPT_AGENT}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.agent.first_name == "Riley", "agent name should come from env")
        })();

        clear_vars(&["TEST_CALLSCRIPT_AGENT"]);
        result
    }

    #[test]
    fn heuristics_section_replaces_ranges() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&VARS);

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("callscript.toml");
        fs::write(
            &path,
            r#"
[heuristics]
savings_rate = "0.3"
discovery_stage = "discovery"

[[heuristics.spend_ranges]]
label = "Small"
midpoint = 800
"#,
        )
        .map_err(|err| err.to_string())?;

        let config =
            AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                .map_err(|err| format!("config load failed: {err}"))?;
        let heuristics = config.spend_heuristics();

        ensure(heuristics.savings_rate == Decimal::new(3, 1), "savings rate from file")?;
        ensure(heuristics.discovery_stage == "discovery", "discovery stage from file")?;
        ensure(heuristics.ranges.len() == 1, "ranges replaced, not merged")?;
        ensure(
            heuristics.range_midpoint("Small") == Some(Decimal::from(800)),
            "configured midpoint is used",
        )
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&VARS);

        env::set_var("CALLSCRIPT_LOG_LEVEL", "warn");
        env::set_var("CALLSCRIPT_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )
        })();

        clear_vars(&VARS);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&VARS);

        env::set_var("CALLSCRIPT_SCRIPT_OPENER", "permission");
        env::set_var("CALLSCRIPT_AGENT_FIRST_NAME", "FromEnv");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("callscript.toml");
            fs::write(
                &path,
                r#"
[script]
path = "scripts/from-file.toml"
opener = "direct"

[agent]
first_name = "FromFile"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    agent_first_name: Some("FromOverride".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.script.path == Some(PathBuf::from("scripts/from-file.toml")),
                "file script path should win over default",
            )?;
            ensure(
                config.script.opener.as_deref() == Some("permission"),
                "env opener should win over file",
            )?;
            ensure(config.agent.first_name == "FromOverride", "override agent name should win")?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")
        })();

        clear_vars(&VARS);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&VARS);

        env::set_var("CALLSCRIPT_HEURISTICS_SAVINGS_RATE", "1.5");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("savings_rate")
            );
            ensure(has_message, "validation failure should mention savings_rate")
        })();

        clear_vars(&VARS);
        result
    }

    #[test]
    fn malformed_env_number_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&VARS);

        env::set_var("CALLSCRIPT_HEURISTICS_SAVINGS_RATE", "a quarter");

        let result = match AppConfig::load(LoadOptions::default()) {
            Err(ConfigError::InvalidEnvOverride { key, .. }) => ensure(
                key == "CALLSCRIPT_HEURISTICS_SAVINGS_RATE",
                "error should name the offending variable",
            ),
            Err(other) => Err(format!("unexpected error: {other}")),
            Ok(_) => Err("expected invalid env override".to_string()),
        };

        clear_vars(&VARS);
        result
    }

    #[test]
    fn required_file_must_exist() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&VARS);

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("absent.toml");
        let result = AppConfig::load(LoadOptions {
            config_path: Some(path),
            require_file: true,
            ..LoadOptions::default()
        });

        ensure(
            matches!(result, Err(ConfigError::MissingConfigFile(_))),
            "missing required file should fail",
        )
    }
}

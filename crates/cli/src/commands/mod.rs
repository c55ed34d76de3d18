pub mod config;
pub mod render;
pub mod resolve;
pub mod validate;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use callscript_core::config::{AppConfig, LoadOptions};
use callscript_core::domain::CallContext;
use callscript_core::errors::ApplicationError;
use callscript_core::script::{default_script, ScriptGraph};
use clap::Args;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

#[derive(Debug, Serialize)]
struct CommandReport<'a, T> {
    command: &'a str,
    status: &'static str,
    data: &'a T,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    /// Success carrying a structured `data` object.
    pub fn report<T: Serialize>(command: &str, data: &T) -> Self {
        let report = CommandReport { command, status: "ok", data };
        match serde_json::to_string(&report) {
            Ok(output) => Self { exit_code: 0, output },
            Err(error) => Self::failure(command, "serialization", error.to_string(), 1),
        }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub fn from_error(command: &str, error: &ApplicationError) -> Self {
        Self::failure(command, error.error_class(), error.to_string(), error.exit_code())
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Live-call fields and exported CRM records shared by `resolve` and `render`.
#[derive(Debug, Clone, Default, Args)]
pub struct CallArgs {
    #[arg(long, help = "JSON array of exported contact records")]
    pub people: Option<PathBuf>,
    #[arg(long, help = "JSON array of exported account records")]
    pub accounts: Option<PathBuf>,
    #[arg(long, default_value = "", help = "Caller display name")]
    pub name: String,
    #[arg(long, default_value = "", help = "Caller phone number")]
    pub number: String,
    #[arg(long, default_value = "", help = "Caller company")]
    pub company: String,
    #[arg(long, help = "Contact id attached to the call")]
    pub contact_id: Option<String>,
    #[arg(long, help = "Account id attached to the call")]
    pub account_id: Option<String>,
    #[arg(long = "override", help = "Contact id picked through manual search")]
    pub override_contact: Option<String>,
}

impl CallArgs {
    pub fn call_context(&self) -> CallContext {
        CallContext {
            name: self.name.clone(),
            company: self.company.clone(),
            number: self.number.clone(),
            is_active: true,
            contact_id: self.contact_id.clone(),
            account_id: self.account_id.clone(),
        }
    }

    pub fn records(&self) -> Result<(Vec<Value>, Vec<Value>), ApplicationError> {
        let people = read_records(self.people.as_deref())?;
        let accounts = read_records(self.accounts.as_deref())?;
        Ok((people, accounts))
    }
}

pub(crate) fn load_config(options: &LoadOptions) -> Result<AppConfig, ApplicationError> {
    AppConfig::load(options.clone()).map_err(ApplicationError::from)
}

/// The configured script file, or the built-in script when none is set.
pub(crate) fn load_script(path: Option<&Path>) -> Result<ScriptGraph, ApplicationError> {
    let graph = match path {
        Some(path) => ScriptGraph::load(path)?,
        None => default_script()?,
    };
    Ok(graph)
}

fn read_records(path: Option<&Path>) -> Result<Vec<Value>, ApplicationError> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    parse_records(path).map_err(|error| ApplicationError::Input(format!("{error:#}")))
}

fn parse_records(path: &Path) -> anyhow::Result<Vec<Value>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read records file `{}`", path.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("records file `{}` is not valid JSON", path.display()))?;
    match value {
        Value::Array(records) => Ok(records),
        _ => bail!("records file `{}` must contain a JSON array", path.display()),
    }
}

use thiserror::Error;

use crate::config::ConfigError;
use crate::script::ScriptDefinitionError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error(transparent)]
    ScriptDefinition(#[from] ScriptDefinitionError),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("configuration failure: {0}")]
    Configuration(String),
    #[error("invalid input: {0}")]
    Input(String),
}

impl ApplicationError {
    /// Stable machine-readable class for command output.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Domain(DomainError::ScriptDefinition(_)) => "script_definition",
            Self::Configuration(_) => "config_validation",
            Self::Input(_) => "input",
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Configuration(_) => 2,
            Self::Domain(_) => 3,
            Self::Input(_) => 4,
        }
    }
}

impl From<ScriptDefinitionError> for ApplicationError {
    fn from(value: ScriptDefinitionError) -> Self {
        Self::Domain(DomainError::ScriptDefinition(value))
    }
}

impl From<ConfigError> for ApplicationError {
    fn from(value: ConfigError) -> Self {
        Self::Configuration(value.to_string())
    }
}

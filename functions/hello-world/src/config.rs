use std::env;

use thiserror::Error;

const DEFAULT_ENVIRONMENT: &str = "dev";
const DEFAULT_APPLICATION_NAME: &str = "HelloWorldApi";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be configured")]
    Missing(&'static str),
}

/// Process-level settings, read once at cold start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub environment: String,
    pub table_name: String,
    pub application_name: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_blank = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let table_name = non_blank("TABLE_NAME").ok_or(ConfigError::Missing("TABLE_NAME"))?;

        Ok(Self {
            environment: non_blank("ENVIRONMENT").unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string()),
            table_name,
            application_name: non_blank("APPLICATION_NAME")
                .unwrap_or_else(|| DEFAULT_APPLICATION_NAME.to_string()),
        })
    }
}

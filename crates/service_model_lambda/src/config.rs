use service_model_core::response::ResponseConfig;

use crate::handlers::proxy::DEFAULT_AUTH_HEADER;

pub const RECORDS_TABLE: &str = "RECORDS_TABLE";
pub const AUTH_SECRET_ID: &str = "AUTH_SECRET_ID";
pub const AUTH_HEADER: &str = "AUTH_HEADER";
pub const AUTH_REALM: &str = "AUTH_REALM";
pub const RESPONSE_BASE64: &str = "RESPONSE_BASE64";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be configured")]
    Missing(&'static str),
    #[error("{name} has invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Deployment settings read from the function environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LambdaSettings {
    pub records_table: String,
    pub auth_secret_id: String,
    pub auth_header: String,
    pub auth_realm: Option<String>,
    pub response_base64: bool,
}

impl LambdaSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let value = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let required = |name: &'static str| value(name).ok_or(ConfigError::Missing(name));

        Ok(Self {
            records_table: required(RECORDS_TABLE)?,
            auth_secret_id: required(AUTH_SECRET_ID)?,
            auth_header: value(AUTH_HEADER).unwrap_or_else(|| DEFAULT_AUTH_HEADER.to_string()),
            auth_realm: value(AUTH_REALM),
            response_base64: match value(RESPONSE_BASE64) {
                Some(raw) => parse_flag(RESPONSE_BASE64, &raw)?,
                None => false,
            },
        })
    }

    pub fn response_config(&self) -> ResponseConfig {
        ResponseConfig::default().with_base64_encode(self.response_base64)
    }
}

fn parse_flag(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            value: raw.to_string(),
            reason: "expected true or false",
        }),
    }
}

//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: '{value}'")]
    Env { var: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from an optional TOML file, apply environment
/// overrides, then validate.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => AppConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay deployment environment variables onto a configuration.
///
/// `lookup` is injected so tests don't have to mutate the process environment.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("KEYCLOAK_URL") {
        config.keycloak.url = v;
    }
    if let Some(v) = lookup("KEYCLOAK_URL_REALM") {
        config.keycloak.realm = v;
    }
    if let Some(v) = lookup("KEYCLOAK_ADMIN_CLIENT_ID") {
        config.keycloak.client_id = v;
    }
    if let Some(v) = lookup("KEYCLOAK_ADMIN_CLIENT_SECRET") {
        config.keycloak.client_secret = v;
    }
    if let Some(v) = lookup("JWT_OIDC_AUDIENCE") {
        config.auth.audience = Some(v.clone());
        config.keycloak.audience = v;
    }
    if let Some(v) = lookup("MULTI_TENANCY_ENABLED") {
        config.tenancy.multi_tenancy_enabled = parse_flag("MULTI_TENANCY_ENABLED", &v)?;
    }
    if let Some(v) = lookup("MODEL_ID") {
        config.analysis.model_id = v;
    }
    if let Some(v) = lookup("DATABASE_SUPPORT") {
        config.analysis.database_support = v;
    }
    if let Some(v) = lookup("CONFIGURE_LOGS") {
        config.observability.log_file.enabled = parse_flag("CONFIGURE_LOGS", &v)?;
    }
    if let Some(v) = lookup("API_LOG_ROTATION_WHEN") {
        config.observability.log_file.rotation_when = v;
    }
    if let Some(v) = lookup("API_LOG_ROTATION_INTERVAL") {
        config.observability.log_file.rotation_interval = v.parse().map_err(|_| ConfigError::Env {
            var: "API_LOG_ROTATION_INTERVAL",
            value: v.clone(),
        })?;
    }
    if let Some(v) = lookup("API_LOG_BACKUP_COUNT") {
        config.observability.log_file.backup_count = v.parse().map_err(|_| ConfigError::Env {
            var: "API_LOG_BACKUP_COUNT",
            value: v.clone(),
        })?;
    }
    Ok(())
}

fn parse_flag(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "enabled" => Ok(true),
        "false" | "0" | "no" | "disabled" | "" => Ok(false),
        _ => Err(ConfigError::Env {
            var,
            value: value.to_string(),
        }),
    }
}

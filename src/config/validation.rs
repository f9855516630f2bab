//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate URLs, bind addresses and value ranges
//! - Check that the auth section can produce a decoding key
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::AppConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a deserialized configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_bind_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    check_bind_address(&mut errors, "analysis.bind_address", &config.analysis.bind_address);

    if url::Url::parse(&config.keycloak.url).is_err() {
        errors.push(ValidationError::new("keycloak.url", "must be an absolute URL"));
    }
    if config.keycloak.realm.trim().is_empty() {
        errors.push(ValidationError::new("keycloak.realm", "must not be empty"));
    }
    if config.keycloak.audience.trim().is_empty() {
        errors.push(ValidationError::new("keycloak.audience", "must not be empty"));
    }
    if config.keycloak.timeout_secs == 0 {
        errors.push(ValidationError::new("keycloak.timeout_secs", "must be greater than 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    if config.auth.enabled {
        match config.auth.algorithm.as_str() {
            "HS256" | "HS384" | "HS512" => {
                if config.auth.secret.as_deref().map_or(true, str::is_empty) {
                    errors.push(ValidationError::new(
                        "auth.secret",
                        "required for HMAC algorithms",
                    ));
                }
            }
            "RS256" | "RS384" | "RS512" => {
                if config.auth.public_key_path.is_none() {
                    errors.push(ValidationError::new(
                        "auth.public_key_path",
                        "required for RSA algorithms",
                    ));
                }
            }
            other => errors.push(ValidationError::new(
                "auth.algorithm",
                format!("unsupported algorithm '{}'", other),
            )),
        }
    }

    let log_file = &config.observability.log_file;
    let rotation = log_file.rotation_when.to_ascii_uppercase();
    if log_file.enabled && !matches!(rotation.as_str(), "D" | "H" | "M" | "MIDNIGHT") {
        errors.push(ValidationError::new(
            "observability.log_file.rotation_when",
            "must be one of D, H, M or MIDNIGHT",
        ));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "must be a socket address",
        ));
    }

    if config.analysis.max_text_chars == 0 {
        errors.push(ValidationError::new("analysis.max_text_chars", "must be greater than 0"));
    }
    if !matches!(
        config.analysis.database_support.to_ascii_uppercase().as_str(),
        "ENABLED" | "DISABLED"
    ) {
        errors.push(ValidationError::new(
            "analysis.database_support",
            "must be ENABLED or DISABLED",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_bind_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(field, format!("'{}' is not a socket address", value)));
    }
}

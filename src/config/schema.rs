//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for both services.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration shared by the group API and the data-analysis API.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration for the group API.
    pub listener: ListenerConfig,

    /// Keycloak admin API connection.
    pub keycloak: KeycloakConfig,

    /// Multi-tenancy settings.
    pub tenancy: TenancyConfig,

    /// Bearer token verification.
    pub auth: AuthConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Sentiment analysis service settings.
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:5000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
        }
    }
}

/// Keycloak admin API configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct KeycloakConfig {
    /// Base URL of the Keycloak server (without `/admin`).
    pub url: String,

    /// Realm holding the platform's groups and users.
    pub realm: String,

    /// Service-account client used to call the admin API.
    pub client_id: String,

    /// Service-account client secret.
    pub client_secret: String,

    /// Platform client whose client roles are exposed as permissions.
    pub audience: String,

    /// Admin API request timeout in seconds.
    pub timeout_secs: u64,

    /// Refresh the service-account token this many seconds before it expires.
    pub token_refresh_margin_secs: u64,
}

impl Default for KeycloakConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080".to_string(),
            realm: "forms-flow-ai".to_string(),
            client_id: "forms-flow-bpm".to_string(),
            client_secret: String::new(),
            audience: "forms-flow-web".to_string(),
            timeout_secs: 10,
            token_refresh_margin_secs: 30,
        }
    }
}

/// Multi-tenancy configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TenancyConfig {
    /// Scope groups and roles by the caller's tenant key.
    pub multi_tenancy_enabled: bool,
}

/// Bearer token verification.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Require a valid bearer token on protected routes.
    pub enabled: bool,

    /// Signing algorithm ("HS256" or "RS256").
    pub algorithm: String,

    /// Shared secret for HS256.
    pub secret: Option<String>,

    /// Path to a PEM public key for RS256.
    pub public_key_path: Option<String>,

    /// Expected `aud` claim, if any.
    pub audience: Option<String>,

    /// Expected `iss` claim, if any.
    pub issuer: Option<String>,

    /// Role the caller must hold.
    pub required_role: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            algorithm: "RS256".to_string(),
            secret: None,
            public_key_path: None,
            audience: None,
            issuer: None,
            required_role: "manage_users".to_string(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human format.
    pub json_logs: bool,

    /// Rotating log file.
    pub log_file: LogFileConfig,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            log_file: LogFileConfig::default(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Rotating log file settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LogFileConfig {
    pub enabled: bool,
    pub directory: String,
    pub file_name: String,
    /// "D" (daily), "H" (hourly) or "M" (minutely).
    pub rotation_when: String,
    pub rotation_interval: u32,
    pub backup_count: usize,
}

impl Default for LogFileConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            directory: "logs".to_string(),
            file_name: "forms-flow-api.log".to_string(),
            rotation_when: "D".to_string(),
            rotation_interval: 1,
            backup_count: 7,
        }
    }
}

/// Sentiment analysis service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Bind address for the data-analysis API.
    pub bind_address: String,

    /// Pretrained model identifier served by the inference server.
    pub model_id: String,

    /// Text-classification inference endpoint. `{model_id}` is substituted.
    pub inference_url: String,

    /// Optional bearer token for the inference endpoint.
    pub inference_token: Option<String>,

    /// Inference request timeout in seconds.
    pub timeout_secs: u64,

    /// Inputs longer than this many characters are truncated.
    pub max_text_chars: usize,

    /// "ENABLED" to persist results, "DISABLED" otherwise.
    pub database_support: String,

    /// File backing the sentiment store.
    pub store_path: String,
}

impl AnalysisConfig {
    /// Whether analysed elements are persisted.
    pub fn database_enabled(&self) -> bool {
        self.database_support.eq_ignore_ascii_case("enabled")
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:6000".to_string(),
            model_id: "Seethal/sentiment_analysis_generic_dataset".to_string(),
            inference_url: "http://localhost:8000/models/{model_id}".to_string(),
            inference_token: None,
            timeout_secs: 30,
            max_text_chars: 2000,
            database_support: "DISABLED".to_string(),
            store_path: "data/sentiment.json".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
    /// Value of the `X-Frame-Options` response header.
    pub frame_options: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
            frame_options: "DENY".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [keycloak]
            url = "https://idp.example.com"
            "#,
        )
        .unwrap();

        assert_eq!(config.keycloak.url, "https://idp.example.com");
        assert_eq!(config.keycloak.realm, "forms-flow-ai");
        assert_eq!(config.listener.bind_address, "0.0.0.0:5000");
        assert!(config.auth.enabled);
        assert_eq!(config.security.frame_options, "DENY");
    }

    #[test]
    fn test_database_toggle() {
        let mut analysis = AnalysisConfig::default();
        assert!(!analysis.database_enabled());
        analysis.database_support = "Enabled".into();
        assert!(analysis.database_enabled());
    }
}

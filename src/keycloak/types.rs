//! Keycloak admin API representations and error definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A group as the admin API returns and accepts it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRepresentation {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Vec<String>>,

    /// Client roles keyed by client id (not the client UUID).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub client_roles: BTreeMap<String, Vec<String>>,

    /// Inline children. Newer Keycloak versions leave this empty and only
    /// report `sub_group_count`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_groups: Vec<GroupRepresentation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_group_count: Option<u64>,
}

/// A client role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRepresentation {
    pub id: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_role: Option<bool>,
}

/// A realm user. Fields this service doesn't touch are passed through.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRepresentation {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub username: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Body sent when adding a user to a group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMembership {
    #[serde(default)]
    pub realm: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ClientRepresentation {
    pub id: String,
    #[serde(default)]
    pub client_id: String,
}

/// Errors that can occur while talking to the admin API.
#[derive(Debug, Error)]
pub enum KeycloakError {
    /// Connection or protocol failure.
    #[error("Keycloak request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success HTTP status.
    #[error("Keycloak returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Service-account token could not be obtained.
    #[error("Keycloak token request failed: {0}")]
    Token(String),

    /// Response was successful but not shaped as expected.
    #[error("Unexpected Keycloak response: {0}")]
    Unexpected(String),

    /// Invalid server URL in configuration.
    #[error("Invalid Keycloak URL: {0}")]
    Url(#[from] url::ParseError),
}

impl KeycloakError {
    /// HTTP status reported by the provider, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            KeycloakError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Result type for admin API operations.
pub type KeycloakResult<T> = Result<T, KeycloakError>;

//! Bearer token verification and caller identity.

use std::collections::HashMap;
use std::fs;

use axum::http::{header, HeaderMap};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AuthConfig;
use crate::error::ApiError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Missing required role '{0}'")]
    MissingRole(String),

    #[error("Invalid auth configuration: {0}")]
    Config(String),
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::MissingToken | AuthError::InvalidToken(_) => {
                ApiError::Unauthorized(e.to_string())
            }
            AuthError::MissingRole(_) => ApiError::Forbidden(e.to_string()),
            AuthError::Config(_) => ApiError::Internal(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleClaim {
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Claims read from platform access tokens.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,
    #[serde(default, rename = "tenantKey", skip_serializing_if = "Option::is_none")]
    pub tenant_key: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realm_access: Option<RoleClaim>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub resource_access: HashMap<String, RoleClaim>,
    pub exp: u64,
}

/// The authenticated caller, attached to request extensions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserContext {
    pub username: String,
    pub tenant_key: Option<String>,
    pub roles: Vec<String>,
}

impl UserContext {
    /// Caller used when authentication is disabled.
    pub fn anonymous() -> Self {
        Self {
            username: "anonymous".to_string(),
            ..Default::default()
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn tenant_key(&self) -> Option<&str> {
        self.tenant_key.as_deref()
    }
}

/// Verifies access tokens and checks the required role.
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
    client: String,
    required_role: String,
}

impl TokenVerifier {
    /// Build a verifier, or `None` when authentication is disabled.
    ///
    /// `client` selects which `resource_access` entry carries the caller's roles.
    pub fn from_config(config: &AuthConfig, client: &str) -> Result<Option<Self>, AuthError> {
        if !config.enabled {
            tracing::warn!("Authentication disabled, every caller is anonymous");
            return Ok(None);
        }

        let algorithm: Algorithm = config.algorithm.parse().map_err(|_| {
            AuthError::Config(format!("unsupported algorithm '{}'", config.algorithm))
        })?;

        let key = match algorithm {
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
                let secret = config
                    .secret
                    .as_deref()
                    .ok_or_else(|| AuthError::Config("secret required".into()))?;
                DecodingKey::from_secret(secret.as_bytes())
            }
            Algorithm::RS256 | Algorithm::RS384 | Algorithm::RS512 => {
                let path = config
                    .public_key_path
                    .as_deref()
                    .ok_or_else(|| AuthError::Config("public_key_path required".into()))?;
                let pem = fs::read(path)
                    .map_err(|e| AuthError::Config(format!("{}: {}", path, e)))?;
                DecodingKey::from_rsa_pem(&pem).map_err(|e| AuthError::Config(e.to_string()))?
            }
            other => return Err(AuthError::Config(format!("unsupported algorithm {:?}", other))),
        };

        let mut validation = Validation::new(algorithm);
        match &config.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }

        Ok(Some(Self {
            key,
            validation,
            client: client.to_string(),
            required_role: config.required_role.clone(),
        }))
    }

    pub fn verify(&self, token: &str) -> Result<UserContext, AuthError> {
        let data = decode::<Claims>(token, &self.key, &self.validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        let claims = data.claims;

        let mut roles = claims.roles;
        if let Some(realm) = claims.realm_access {
            roles.extend(realm.roles);
        }
        if let Some(client) = claims.resource_access.get(&self.client) {
            roles.extend(client.roles.iter().cloned());
        }
        roles.sort();
        roles.dedup();

        Ok(UserContext {
            username: claims
                .preferred_username
                .or(claims.sub)
                .unwrap_or_default(),
            tenant_key: claims.tenant_key,
            roles,
        })
    }

    /// Verify the bearer token in `headers` and check the required role.
    pub fn authorize(&self, headers: &HeaderMap) -> Result<UserContext, AuthError> {
        let token = bearer_token(headers).ok_or(AuthError::MissingToken)?;
        let user = self.verify(token)?;
        if !self.required_role.is_empty() && !user.has_role(&self.required_role) {
            return Err(AuthError::MissingRole(self.required_role.clone()));
        }
        Ok(user)
    }
}

/// Authorize a request, or admit it as anonymous when there is no verifier.
pub fn authorize(
    verifier: Option<&TokenVerifier>,
    headers: &HeaderMap,
) -> Result<UserContext, AuthError> {
    match verifier {
        Some(verifier) => verifier.authorize(headers),
        None => Ok(UserContext::anonymous()),
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

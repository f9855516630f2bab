//! Errors surfaced to API callers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::keycloak::KeycloakError;

/// Business rule violations reported with a stable code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BusinessErrorCode {
    DuplicateRole,
    MissingPaginationParameters,
    RoleMappingFailed,
    InvalidGroupName,
}

impl BusinessErrorCode {
    pub fn message(self) -> &'static str {
        match self {
            BusinessErrorCode::DuplicateRole => "Duplicate role",
            BusinessErrorCode::MissingPaginationParameters => {
                "Missing pagination parameters: pageNo and limit are required together"
            }
            BusinessErrorCode::RoleMappingFailed => "Role mapping creation failed",
            BusinessErrorCode::InvalidGroupName => "Group name must contain at least one segment",
        }
    }

    pub fn status(self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }
}

/// Top-level error for HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{}", .0.message())]
    Business(BusinessErrorCode),

    #[error(transparent)]
    Keycloak(#[from] KeycloakError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    Internal(String),
}

impl From<BusinessErrorCode> for ApiError {
    fn from(code: BusinessErrorCode) -> Self {
        ApiError::Business(code)
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<BusinessErrorCode>,
    message: &'a str,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Business(code) => code.status(),
            ApiError::Keycloak(e) => match e.status() {
                Some(404) => StatusCode::NOT_FOUND,
                Some(s) if (400..500).contains(&s) => {
                    StatusCode::from_u16(s).unwrap_or(StatusCode::BAD_REQUEST)
                }
                _ => StatusCode::BAD_GATEWAY,
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> Option<BusinessErrorCode> {
        match self {
            ApiError::Business(code) => Some(*code),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, status = %status, "Request failed");
        } else {
            tracing::debug!(error = %self, status = %status, "Request rejected");
        }

        // Provider bodies stay in the logs.
        let message = match &self {
            ApiError::Keycloak(_) => status
                .canonical_reason()
                .unwrap_or("Identity provider error")
                .to_string(),
            other => other.to_string(),
        };
        let body = ErrorBody {
            code: self.code(),
            message: &message,
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

//! formsflow backend services.
//!
//! Two HTTP services share this library:
//! - the group API, an adapter over the Keycloak admin API that manages
//!   groups, permission (client role) mappings and user membership;
//! - the data-analysis API, which classifies the sentiment of form text.

pub mod analysis;
pub mod auth;
pub mod config;
pub mod error;
pub mod groups;
pub mod http;
pub mod keycloak;
pub mod lifecycle;
pub mod observability;

pub use config::AppConfig;
pub use error::{ApiError, ApiResult, BusinessErrorCode};
pub use http::HttpServer;
pub use lifecycle::Shutdown;

//! Identity provider integration.
//!
//! # Data Flow
//! ```text
//! Group service
//!     → directory.rs (GroupDirectory trait)
//!     → client.rs (URL building, status mapping, metrics)
//!     → token.rs (service-account token, cached until near expiry)
//!     → Keycloak admin REST API
//! ```
//!
//! # Constraints
//! - No retries: a failed call is reported to the caller as-is
//! - Client secrets are never logged

pub mod client;
pub mod directory;
pub mod token;
pub mod types;

pub use client::KeycloakAdminClient;
pub use directory::GroupDirectory;
pub use types::{
    GroupMembership, GroupRepresentation, KeycloakError, KeycloakResult, RoleRepresentation,
    UserRepresentation,
};

//! Caller authentication.
//!
//! Access tokens are issued by the identity provider; this module only
//! verifies them and extracts the caller's roles and tenant key.

pub mod jwt;

pub use jwt::{authorize, AuthError, Claims, RoleClaim, TokenVerifier, UserContext};

//! HTTP surface of the group API.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, metrics)
//!     → auth middleware (bearer token → UserContext)
//!     → groups.rs / users.rs (handlers → GroupService)
//!     → response.rs (security headers)
//!     → Send to client
//! ```

pub mod groups;
pub mod request;
pub mod response;
pub mod server;
pub mod users;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer, InnerState};

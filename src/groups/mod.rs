//! Group service.
//!
//! # Data Flow
//! ```text
//! HTTP handler
//!     → service.rs (operation entry points)
//!     → tree.rs / hierarchy.rs / permissions.rs / users.rs
//!     → GroupDirectory (Keycloak admin API)
//!     → format.rs (provider representation → GroupRecord)
//! ```

pub mod format;
pub mod hierarchy;
pub mod permissions;
pub mod service;
pub mod tree;
pub mod types;
pub mod users;

pub use format::SortOrder;
pub use service::{GroupService, GroupSettings};
pub use types::{
    AnalyticsGroup, CreatedGroup, GroupPayload, GroupRecord, UserPage, UserQuery, UserRecord,
};
pub use users::Pagination;

//! Records exposed by the group API.

use serde::{Deserialize, Serialize};

use crate::keycloak::{GroupRepresentation, UserRepresentation};

/// A group reshaped for API callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRecord {
    pub id: String,
    /// Full provider path, e.g. `/formsflow/reviewer`.
    pub name: String,
    pub path: String,
    pub description: String,
    pub permissions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_group_count: Option<u64>,
}

/// Create/update input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupPayload {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedGroup {
    pub id: String,
}

/// Compact group entry for analytics dashboards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsGroup {
    pub id: String,
    pub name: String,
    pub path: String,
}

/// A user, optionally with the groups it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(flatten)]
    pub user: UserRepresentation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Vec<GroupRepresentation>>,
}

impl From<UserRepresentation> for UserRecord {
    fn from(user: UserRepresentation) -> Self {
        Self { user, role: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPage {
    pub data: Vec<UserRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

/// Filters for listing users.
#[derive(Debug, Clone, Default)]
pub struct UserQuery {
    pub page_no: Option<u32>,
    pub limit: Option<u32>,
    /// Attach each user's groups.
    pub role: bool,
    /// Group path whose members are listed.
    pub group_name: Option<String>,
    /// Report the total before paging.
    pub count: bool,
    pub search: Option<String>,
}

//! User endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::groups::UserQuery;
use crate::keycloak::GroupMembership;
use crate::http::server::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListParams {
    pub member_of_group: Option<String>,
    pub page_no: Option<u32>,
    pub limit: Option<u32>,
    #[serde(default)]
    pub role: bool,
    #[serde(default)]
    pub count: bool,
    pub search: Option<String>,
}

/// Members of `memberOfGroup` when given, otherwise a realm-wide search.
pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<UserListParams>,
) -> ApiResult<impl IntoResponse> {
    let inner = state.inner.load_full();

    let page = match params.member_of_group.filter(|g| !g.is_empty()) {
        Some(group_name) => {
            inner
                .groups
                .get_users(UserQuery {
                    page_no: params.page_no,
                    limit: params.limit,
                    role: params.role,
                    group_name: Some(group_name),
                    count: params.count,
                    search: params.search,
                })
                .await?
        }
        None => {
            inner
                .groups
                .search_realm_users(
                    params.search.as_deref(),
                    params.page_no,
                    params.limit,
                    params.role,
                    params.count,
                )
                .await?
        }
    };
    Ok(Json(page))
}

pub async fn add_user_to_group(
    State(state): State<AppState>,
    Path((user_id, group_id)): Path<(String, String)>,
    payload: Option<Json<GroupMembership>>,
) -> ApiResult<impl IntoResponse> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    let inner = state.inner.load_full();
    inner.groups.add_user_to_group_role(&user_id, &group_id, payload).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_user_from_group(
    State(state): State<AppState>,
    Path((user_id, group_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let inner = state.inner.load_full();
    inner.groups.remove_user_from_group_role(&user_id, &group_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_user_to_tenant(State(state): State<AppState>) -> ApiError {
    state.inner.load().groups.add_user_to_tenant()
}

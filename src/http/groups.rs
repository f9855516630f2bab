//! Group endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;

use crate::auth::UserContext;
use crate::error::{ApiError, ApiResult};
use crate::groups::{GroupPayload, Pagination, SortOrder};
use crate::http::server::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupListParams {
    pub search: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageParams {
    pub page_no: Option<u32>,
    pub limit: Option<u32>,
}

pub async fn list_groups(
    State(state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Query(params): Query<GroupListParams>,
) -> ApiResult<impl IntoResponse> {
    let sort_order = match params.sort_order.as_deref() {
        Some(order) => order.parse::<SortOrder>().map_err(ApiError::BadRequest)?,
        None => SortOrder::default(),
    };

    let inner = state.inner.load_full();
    let groups = inner
        .groups
        .get_groups_roles(user.tenant_key(), params.search.as_deref(), sort_order)
        .await?;
    Ok(Json(groups))
}

pub async fn get_group(
    State(state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Path(group_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let inner = state.inner.load_full();
    let group = inner.groups.get_group(user.tenant_key(), &group_id).await?;
    Ok(Json(group))
}

pub async fn create_group(
    State(state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Json(payload): Json<GroupPayload>,
) -> ApiResult<impl IntoResponse> {
    let inner = state.inner.load_full();
    let created = inner.groups.create_group_role(user.tenant_key(), payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_group(
    State(state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Path(group_id): Path<String>,
    Json(payload): Json<GroupPayload>,
) -> ApiResult<impl IntoResponse> {
    let inner = state.inner.load_full();
    inner.groups.update_group(user.tenant_key(), &group_id, payload).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_group(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let inner = state.inner.load_full();
    inner.groups.delete_group(&group_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn analytics_groups(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> ApiResult<impl IntoResponse> {
    let page = Pagination::required(params.page_no, params.limit)?;
    let inner = state.inner.load_full();
    let groups = inner.groups.get_analytics_groups(page).await?;
    Ok(Json(groups))
}

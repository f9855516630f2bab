//! Group and user administration on top of a [`GroupDirectory`].

use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::{ApiError, ApiResult, BusinessErrorCode};
use crate::groups::format::{
    client_role_key, format_group, group_with_description, search_groups, sort_groups, SortOrder,
};
use crate::groups::hierarchy::{create_group_path, leaf_name, split_group_path};
use crate::groups::permissions::{create_permission_mapping, sync_permission_mapping};
use crate::groups::tree::flatten_groups;
use crate::groups::types::{
    AnalyticsGroup, CreatedGroup, GroupPayload, GroupRecord, UserPage, UserQuery, UserRecord,
};
use crate::groups::users::{search_users, Pagination};
use crate::keycloak::{GroupDirectory, GroupMembership, UserRepresentation};

/// Message returned for tenant onboarding, which this deployment doesn't do.
pub const UNSUPPORTED_OPERATION: &str = "The requested operation is not supported.";

/// Group service settings derived from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct GroupSettings {
    pub audience: String,
    pub realm: String,
    pub multi_tenancy_enabled: bool,
}

impl From<&AppConfig> for GroupSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            audience: config.keycloak.audience.clone(),
            realm: config.keycloak.realm.clone(),
            multi_tenancy_enabled: config.tenancy.multi_tenancy_enabled,
        }
    }
}

#[derive(Clone)]
pub struct GroupService {
    directory: Arc<dyn GroupDirectory>,
    settings: GroupSettings,
}

impl GroupService {
    pub fn new(directory: Arc<dyn GroupDirectory>, settings: GroupSettings) -> Self {
        Self { directory, settings }
    }

    fn tenant<'a>(&self, tenant_key: Option<&'a str>) -> Option<&'a str> {
        if self.settings.multi_tenancy_enabled {
            tenant_key.filter(|t| !t.is_empty())
        } else {
            None
        }
    }

    fn client_key(&self, tenant_key: Option<&str>) -> String {
        client_role_key(&self.settings.audience, self.tenant(tenant_key))
    }

    async fn client_uuid(&self, tenant_key: Option<&str>) -> ApiResult<String> {
        let key = self.client_key(tenant_key);
        Ok(self.directory.client_uuid(&key).await?)
    }

    /// All groups as one flat list, filtered by tenant and search, sorted by name.
    pub async fn get_groups_roles(
        &self,
        tenant_key: Option<&str>,
        search: Option<&str>,
        sort_order: SortOrder,
    ) -> ApiResult<Vec<GroupRecord>> {
        let mut roots = self.directory.list_groups().await?;

        if let Some(tenant) = self.tenant(tenant_key) {
            tracing::debug!(tenant, "Getting groups for tenant");
            roots.retain(|group| group.name.starts_with(tenant));
        }

        let client_key = self.client_key(tenant_key);
        let mut records = flatten_groups(self.directory.as_ref(), roots, &client_key).await?;
        sort_groups(&mut records, sort_order);

        match search.filter(|s| !s.is_empty()) {
            Some(search) => Ok(search_groups(records, search)),
            None => Ok(records),
        }
    }

    pub async fn get_group(
        &self,
        tenant_key: Option<&str>,
        group_id: &str,
    ) -> ApiResult<GroupRecord> {
        let group = self.directory.get_group(group_id).await?;
        Ok(format_group(&group, &self.client_key(tenant_key)))
    }

    pub async fn get_analytics_groups(&self, page: Pagination) -> ApiResult<Vec<AnalyticsGroup>> {
        let roots = self.directory.list_groups_page(page.first(), page.limit).await?;
        let records =
            flatten_groups(self.directory.as_ref(), roots, &self.settings.audience).await?;
        Ok(records
            .into_iter()
            .map(|record| AnalyticsGroup {
                id: record.id,
                name: leaf_name(&record.path).to_string(),
                path: record.path,
            })
            .collect())
    }

    /// Create a group (and any missing parents) and map its permissions.
    ///
    /// If the mapping fails the leaf group is deleted again.
    pub async fn create_group_role(
        &self,
        tenant_key: Option<&str>,
        payload: GroupPayload,
    ) -> ApiResult<CreatedGroup> {
        let segments = split_group_path(&payload.name)?;
        let template = group_with_description(&payload.name, payload.description.as_deref());
        let group_id = create_group_path(self.directory.as_ref(), &segments, &template).await?;

        let mapped = match self.client_uuid(tenant_key).await {
            Ok(client_uuid) => create_permission_mapping(
                self.directory.as_ref(),
                &group_id,
                &payload.permissions,
                &client_uuid,
            )
            .await
            .map_err(ApiError::from),
            Err(e) => Err(e),
        };

        if let Err(e) = mapped {
            tracing::warn!(
                group_id = %group_id,
                error = %e,
                "Role mapping creation failed, deleting group"
            );
            if let Err(delete_err) = self.directory.delete_group(&group_id).await {
                tracing::error!(
                    group_id = %group_id,
                    error = %delete_err,
                    "Failed to delete group after mapping failure"
                );
            }
            return Err(BusinessErrorCode::RoleMappingFailed.into());
        }

        tracing::info!(group_id = %group_id, name = %payload.name, "Group created");
        Ok(CreatedGroup { id: group_id })
    }

    /// Rename to the last path segment, replace the description and
    /// synchronize permissions.
    pub async fn update_group(
        &self,
        tenant_key: Option<&str>,
        group_id: &str,
        payload: GroupPayload,
    ) -> ApiResult<()> {
        let group =
            group_with_description(leaf_name(&payload.name), payload.description.as_deref());

        let client_uuid = self.client_uuid(tenant_key).await?;
        sync_permission_mapping(
            self.directory.as_ref(),
            group_id,
            &payload.permissions,
            &client_uuid,
        )
        .await?;
        self.directory.update_group(group_id, &group).await?;

        tracing::info!(group_id, "Group updated");
        Ok(())
    }

    pub async fn delete_group(&self, group_id: &str) -> ApiResult<()> {
        self.directory.delete_group(group_id).await?;
        tracing::info!(group_id, "Group deleted");
        Ok(())
    }

    /// Members of a group, searched, counted and paged in memory.
    pub async fn get_users(&self, query: UserQuery) -> ApiResult<UserPage> {
        let page = Pagination::from_params(query.page_no, query.limit)?;

        let mut users: Vec<UserRepresentation> = Vec::new();
        let mut count = None;

        if let Some(group_name) = query.group_name.as_deref().filter(|g| !g.is_empty()) {
            tracing::debug!(group = %group_name, "Fetching users from group");
            let group = self.directory.group_by_path(group_name).await?;
            users = self.directory.group_members(&group.id).await?;

            if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
                users = search_users(users, search);
            }
            if query.count {
                count = Some(users.len() as u64);
            }
            if let Some(page) = page {
                users = page.apply(users);
            }
        }

        let data = self.populate_user_groups(users, query.role).await?;
        Ok(UserPage { data, count })
    }

    /// Realm-wide user search. Paging is mandatory and done by the provider.
    pub async fn search_realm_users(
        &self,
        search: Option<&str>,
        page_no: Option<u32>,
        limit: Option<u32>,
        role: bool,
        count: bool,
    ) -> ApiResult<UserPage> {
        let page = Pagination::required(page_no, limit)?;
        let search = search.filter(|s| !s.is_empty());

        let users = self.directory.realm_users(search, page.first(), page.limit).await?;
        let count = if count {
            Some(self.directory.realm_users_count(search).await?)
        } else {
            None
        };

        let data = self.populate_user_groups(users, role).await?;
        Ok(UserPage { data, count })
    }

    async fn populate_user_groups(
        &self,
        users: Vec<UserRepresentation>,
        role: bool,
    ) -> ApiResult<Vec<UserRecord>> {
        let mut records = Vec::with_capacity(users.len());
        for user in users {
            let groups = if role {
                Some(if user.id.is_empty() {
                    Vec::new()
                } else {
                    self.directory.user_groups(&user.id).await?
                })
            } else {
                None
            };
            records.push(UserRecord { user, role: groups });
        }
        Ok(records)
    }

    pub async fn add_user_to_group_role(
        &self,
        user_id: &str,
        group_id: &str,
        payload: GroupMembership,
    ) -> ApiResult<()> {
        let membership = GroupMembership {
            realm: self.settings.realm.clone(),
            user_id: payload.user_id,
            group_id: payload.group_id,
        };
        self.directory.add_user_to_group(user_id, group_id, &membership).await?;
        tracing::info!(user_id, group_id, "User added to group");
        Ok(())
    }

    pub async fn remove_user_from_group_role(
        &self,
        user_id: &str,
        group_id: &str,
    ) -> ApiResult<()> {
        self.directory.remove_user_from_group(user_id, group_id).await?;
        tracing::info!(user_id, group_id, "User removed from group");
        Ok(())
    }

    /// Tenant onboarding goes through the tenant service, not Keycloak groups.
    pub fn add_user_to_tenant(&self) -> ApiError {
        ApiError::BadRequest(UNSUPPORTED_OPERATION.to_string())
    }
}

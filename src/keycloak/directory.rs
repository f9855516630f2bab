//! The seam between the group service and the identity provider.

use async_trait::async_trait;

use crate::keycloak::types::{
    GroupMembership, GroupRepresentation, KeycloakResult, RoleRepresentation, UserRepresentation,
};

/// Group, user and role-mapping operations of the admin API.
///
/// Implemented by [`KeycloakAdminClient`](crate::keycloak::KeycloakAdminClient)
/// over HTTP; tests provide an in-memory implementation.
#[async_trait]
pub trait GroupDirectory: Send + Sync {
    /// Top-level groups with full representations.
    async fn list_groups(&self) -> KeycloakResult<Vec<GroupRepresentation>>;

    /// One page of top-level groups.
    async fn list_groups_page(
        &self,
        first: u32,
        max: u32,
    ) -> KeycloakResult<Vec<GroupRepresentation>>;

    async fn get_group(&self, group_id: &str) -> KeycloakResult<GroupRepresentation>;

    /// Look a group up by its slash-delimited path.
    async fn group_by_path(&self, path: &str) -> KeycloakResult<GroupRepresentation>;

    async fn subgroups(&self, group_id: &str) -> KeycloakResult<Vec<GroupRepresentation>>;

    /// Create a group at top level, or under `parent_id`. Returns the new id.
    async fn create_group(
        &self,
        parent_id: Option<&str>,
        group: &GroupRepresentation,
    ) -> KeycloakResult<String>;

    async fn update_group(&self, group_id: &str, group: &GroupRepresentation) -> KeycloakResult<()>;

    async fn delete_group(&self, group_id: &str) -> KeycloakResult<()>;

    async fn group_members(&self, group_id: &str) -> KeycloakResult<Vec<UserRepresentation>>;

    async fn user_groups(&self, user_id: &str) -> KeycloakResult<Vec<GroupRepresentation>>;

    async fn add_user_to_group(
        &self,
        user_id: &str,
        group_id: &str,
        membership: &GroupMembership,
    ) -> KeycloakResult<()>;

    async fn remove_user_from_group(&self, user_id: &str, group_id: &str) -> KeycloakResult<()>;

    async fn realm_users(
        &self,
        search: Option<&str>,
        first: u32,
        max: u32,
    ) -> KeycloakResult<Vec<UserRepresentation>>;

    async fn realm_users_count(&self, search: Option<&str>) -> KeycloakResult<u64>;

    /// Resolve a client id (e.g. `forms-flow-web`) to the client's UUID.
    async fn client_uuid(&self, client_id: &str) -> KeycloakResult<String>;

    async fn client_roles(&self, client_uuid: &str) -> KeycloakResult<Vec<RoleRepresentation>>;

    async fn group_client_roles(
        &self,
        group_id: &str,
        client_uuid: &str,
    ) -> KeycloakResult<Vec<RoleRepresentation>>;

    async fn add_group_client_roles(
        &self,
        group_id: &str,
        client_uuid: &str,
        roles: &[RoleRepresentation],
    ) -> KeycloakResult<()>;

    async fn remove_group_client_roles(
        &self,
        group_id: &str,
        client_uuid: &str,
        roles: &[RoleRepresentation],
    ) -> KeycloakResult<()>;
}

//! Group permission (client role) mappings.

use std::collections::HashSet;

use crate::keycloak::{GroupDirectory, KeycloakResult, RoleRepresentation};

/// Client roles whose names are in `permissions`, shaped as a mapping body.
pub fn select_roles(
    available: &[RoleRepresentation],
    permissions: &[String],
    client_uuid: &str,
) -> Vec<RoleRepresentation> {
    let wanted: HashSet<&str> = permissions.iter().map(String::as_str).collect();
    available
        .iter()
        .filter(|role| wanted.contains(role.name.as_str()))
        .map(|role| RoleRepresentation {
            id: role.id.clone(),
            name: role.name.clone(),
            container_id: Some(client_uuid.to_string()),
            client_role: Some(true),
        })
        .collect()
}

/// Current mappings that are not in the desired set.
pub fn roles_to_remove(
    current: &[RoleRepresentation],
    permissions: &[String],
) -> Vec<RoleRepresentation> {
    let keep: HashSet<&str> = permissions.iter().map(String::as_str).collect();
    current
        .iter()
        .filter(|role| !keep.contains(role.name.as_str()))
        .cloned()
        .collect()
}

/// Map the client roles named in `permissions` onto a group.
pub async fn create_permission_mapping(
    directory: &dyn GroupDirectory,
    group_id: &str,
    permissions: &[String],
    client_uuid: &str,
) -> KeycloakResult<()> {
    tracing::debug!(group_id, "Setting permission mapping to group");
    let available = directory.client_roles(client_uuid).await?;
    let roles = select_roles(&available, permissions, client_uuid);
    if roles.is_empty() {
        return Ok(());
    }
    directory.add_group_client_roles(group_id, client_uuid, &roles).await
}

/// Make the group's client role mappings equal to `permissions`.
pub async fn sync_permission_mapping(
    directory: &dyn GroupDirectory,
    group_id: &str,
    permissions: &[String],
    client_uuid: &str,
) -> KeycloakResult<()> {
    tracing::debug!(group_id, "Updating permission mapping to group");
    let current = directory.group_client_roles(group_id, client_uuid).await?;

    let stale = roles_to_remove(&current, permissions);
    if !stale.is_empty() {
        directory.remove_group_client_roles(group_id, client_uuid, &stale).await?;
    }

    create_permission_mapping(directory, group_id, permissions, client_uuid).await
}

//! Flattening the provider's group tree.

use crate::groups::format::format_group;
use crate::groups::types::GroupRecord;
use crate::keycloak::{GroupDirectory, GroupRepresentation, KeycloakResult};

/// Walk `roots` in pre-order and return every group as one flat list.
///
/// Inline `subGroups` are used when present. A group that reports
/// `subGroupCount > 0` without inline children has them fetched from the
/// provider.
pub async fn flatten_groups(
    directory: &dyn GroupDirectory,
    roots: Vec<GroupRepresentation>,
    client_key: &str,
) -> KeycloakResult<Vec<GroupRecord>> {
    let mut stack: Vec<GroupRepresentation> = roots.into_iter().rev().collect();
    let mut flat = Vec::new();

    while let Some(mut group) = stack.pop() {
        let inline = std::mem::take(&mut group.sub_groups);
        let children = if inline.is_empty() && group.sub_group_count.unwrap_or(0) > 0 {
            tracing::debug!(group_id = %group.id, "Fetching subgroups");
            directory.subgroups(&group.id).await?
        } else {
            inline
        };

        flat.push(format_group(&group, client_key));
        stack.extend(children.into_iter().rev());
    }

    Ok(flat)
}

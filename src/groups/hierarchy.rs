//! Creating slash-delimited group paths.

use crate::error::{ApiResult, BusinessErrorCode};
use crate::keycloak::{GroupDirectory, GroupRepresentation};

/// Split `/parent/child` into its segments. Empty segments are dropped.
pub fn split_group_path(name: &str) -> Result<Vec<String>, BusinessErrorCode> {
    let segments: Vec<String> = name
        .split('/')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if segments.is_empty() {
        Err(BusinessErrorCode::InvalidGroupName)
    } else {
        Ok(segments)
    }
}

/// Last segment of a group path.
pub fn leaf_name(name: &str) -> &str {
    name.rsplit('/').find(|s| !s.is_empty()).unwrap_or(name)
}

/// Create every segment of `segments` as a chain of parent/child groups and
/// return the id of the leaf.
///
/// An intermediate segment that already exists is looked up and reused. An
/// existing leaf is a duplicate.
pub async fn create_group_path(
    directory: &dyn GroupDirectory,
    segments: &[String],
    template: &GroupRepresentation,
) -> ApiResult<String> {
    let mut parent: Option<String> = None;

    for (index, segment) in segments.iter().enumerate() {
        let group = GroupRepresentation {
            name: segment.clone(),
            ..template.clone()
        };

        let id = match directory.create_group(parent.as_deref(), &group).await {
            Ok(id) => {
                tracing::debug!(group = %segment, group_id = %id, "Group created");
                id
            }
            Err(e) if e.is_conflict() => {
                if index == segments.len() - 1 {
                    return Err(BusinessErrorCode::DuplicateRole.into());
                }
                let path = segments[..=index].join("/");
                let existing = directory.group_by_path(&path).await?;
                tracing::debug!(path = %path, group_id = %existing.id, "Reusing existing group");
                existing.id
            }
            Err(e) => return Err(e.into()),
        };
        parent = Some(id);
    }

    parent.ok_or_else(|| BusinessErrorCode::InvalidGroupName.into())
}

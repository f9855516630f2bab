//! Reshaping provider groups into API records.

use std::str::FromStr;

use serde::Deserialize;

use crate::groups::types::GroupRecord;
use crate::keycloak::GroupRepresentation;

const DESCRIPTION_ATTRIBUTE: &str = "description";

/// Client whose roles are a group's permissions: `<tenant>-<audience>` in
/// multi-tenant deployments, the bare audience otherwise.
pub fn client_role_key(audience: &str, tenant_key: Option<&str>) -> String {
    match tenant_key.filter(|t| !t.is_empty()) {
        Some(tenant) => format!("{}-{}", tenant, audience),
        None => audience.to_string(),
    }
}

pub fn format_group(group: &GroupRepresentation, client_key: &str) -> GroupRecord {
    let path = group.path.clone().unwrap_or_else(|| format!("/{}", group.name));
    let description = group
        .attributes
        .get(DESCRIPTION_ATTRIBUTE)
        .and_then(|values| values.first())
        .cloned()
        .unwrap_or_default();
    let permissions = group.client_roles.get(client_key).cloned().unwrap_or_default();

    GroupRecord {
        id: group.id.clone(),
        name: path.clone(),
        path,
        description,
        permissions,
        sub_group_count: group.sub_group_count,
    }
}

/// Groups have no description field; it lives in `attributes.description`.
pub fn group_with_description(name: &str, description: Option<&str>) -> GroupRepresentation {
    let mut group = GroupRepresentation {
        name: name.to_string(),
        ..Default::default()
    };
    group.attributes.insert(
        DESCRIPTION_ATTRIBUTE.to_string(),
        vec![description.unwrap_or_default().to_string()],
    );
    group
}

/// Case-insensitive substring match on the record name.
pub fn search_groups(records: Vec<GroupRecord>, search: &str) -> Vec<GroupRecord> {
    let needle = search.to_lowercase();
    records
        .into_iter()
        .filter(|record| record.name.to_lowercase().contains(&needle))
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(format!("invalid sort order '{}'", other)),
        }
    }
}

pub fn sort_groups(records: &mut [GroupRecord], order: SortOrder) {
    records.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    if order == SortOrder::Desc {
        records.reverse();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn provider_group() -> GroupRepresentation {
        GroupRepresentation {
            id: "g1".into(),
            name: "reviewer".into(),
            path: Some("/formsflow/reviewer".into()),
            attributes: BTreeMap::from([("description".to_string(), vec!["Reviews".to_string()])]),
            client_roles: BTreeMap::from([
                ("forms-flow-web".to_string(), vec!["view_tasks".to_string()]),
                ("acme-forms-flow-web".to_string(), vec!["manage_tasks".to_string()]),
            ]),
            ..Default::default()
        }
    }

    #[test]
    fn test_format_uses_path_description_and_roles() {
        let record = format_group(&provider_group(), "forms-flow-web");
        assert_eq!(record.name, "/formsflow/reviewer");
        assert_eq!(record.description, "Reviews");
        assert_eq!(record.permissions, vec!["view_tasks"]);
    }

    #[test]
    fn test_format_picks_tenant_client() {
        let key = client_role_key("forms-flow-web", Some("acme"));
        assert_eq!(key, "acme-forms-flow-web");
        let record = format_group(&provider_group(), &key);
        assert_eq!(record.permissions, vec!["manage_tasks"]);
    }

    #[test]
    fn test_format_empty_group() {
        let group = GroupRepresentation {
            id: "g2".into(),
            name: "plain".into(),
            ..Default::default()
        };
        let record = format_group(&group, "forms-flow-web");
        assert_eq!(record.name, "/plain");
        assert_eq!(record.description, "");
        assert!(record.permissions.is_empty());
    }

    #[test]
    fn test_description_moves_into_attributes() {
        let group = group_with_description("designers", Some("Design forms"));
        assert_eq!(group.attributes["description"], vec!["Design forms"]);
        let group = group_with_description("designers", None);
        assert_eq!(group.attributes["description"], vec![""]);
    }

    #[test]
    fn test_search_and_sort() {
        let mut records: Vec<GroupRecord> = ["/b/Reviewer", "/a", "/c/reviewers"]
            .iter()
            .map(|name| format_group(
                &GroupRepresentation { path: Some(name.to_string()), ..Default::default() },
                "x",
            ))
            .collect();

        sort_groups(&mut records, SortOrder::Desc);
        let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["/c/reviewers", "/b/Reviewer", "/a"]);

        let found = search_groups(records, "REVIEW");
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_sort_order_parsing() {
        assert_eq!("DESC".parse::<SortOrder>().unwrap(), SortOrder::Desc);
        assert_eq!("".parse::<SortOrder>().unwrap(), SortOrder::Asc);
        assert!("sideways".parse::<SortOrder>().is_err());
    }
}

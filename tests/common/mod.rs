//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;

use formsflow_api::config::AppConfig;
use formsflow_api::keycloak::{
    GroupDirectory, GroupMembership, GroupRepresentation, KeycloakError, KeycloakResult,
    RoleRepresentation, UserRepresentation,
};

pub const SECRET: &str = "integration-secret";
pub const AUDIENCE: &str = "forms-flow-web";
pub const ADMIN_ROLE: &str = "manage_users";

const PERMISSIONS: [&str; 4] = ["view_tasks", "manage_tasks", "view_dashboards", "manage_users"];

#[derive(Debug, Clone)]
struct FakeGroup {
    name: String,
    parent: Option<String>,
    attributes: BTreeMap<String, Vec<String>>,
}

#[derive(Default)]
struct Realm {
    next_id: u32,
    groups: BTreeMap<String, FakeGroup>,
    members: BTreeMap<String, BTreeSet<String>>,
    users: Vec<UserRepresentation>,
    clients: BTreeMap<String, String>,
    client_roles: BTreeMap<String, Vec<RoleRepresentation>>,
    group_roles: BTreeMap<(String, String), Vec<RoleRepresentation>>,
    calls: Vec<String>,
    fail_role_mapping: bool,
}

fn not_found(what: &str) -> KeycloakError {
    KeycloakError::Status {
        status: 404,
        body: format!("{} not found", what),
    }
}

impl Realm {
    fn path(&self, id: &str) -> String {
        let mut segments = Vec::new();
        let mut current = Some(id.to_string());
        while let Some(id) = current {
            match self.groups.get(&id) {
                Some(group) => {
                    segments.push(group.name.clone());
                    current = group.parent.clone();
                }
                None => break,
            }
        }
        segments.reverse();
        format!("/{}", segments.join("/"))
    }

    fn children(&self, id: Option<&str>) -> Vec<String> {
        let mut children: Vec<(&String, &FakeGroup)> = self
            .groups
            .iter()
            .filter(|(_, g)| g.parent.as_deref() == id)
            .collect();
        children.sort_by(|a, b| a.1.name.cmp(&b.1.name));
        children.into_iter().map(|(id, _)| id.clone()).collect()
    }

    fn representation(&self, id: &str) -> KeycloakResult<GroupRepresentation> {
        let group = self.groups.get(id).ok_or_else(|| not_found("Group"))?;

        let mut client_roles = BTreeMap::new();
        for (client_id, uuid) in &self.clients {
            if let Some(roles) = self.group_roles.get(&(id.to_string(), uuid.clone())) {
                if !roles.is_empty() {
                    let names = roles.iter().map(|r| r.name.clone()).collect();
                    client_roles.insert(client_id.clone(), names);
                }
            }
        }

        Ok(GroupRepresentation {
            id: id.to_string(),
            name: group.name.clone(),
            path: Some(self.path(id)),
            attributes: group.attributes.clone(),
            client_roles,
            sub_groups: Vec::new(),
            sub_group_count: Some(self.children(Some(id)).len() as u64),
        })
    }

    fn remove_tree(&mut self, id: &str) {
        for child in self.children(Some(id)) {
            self.remove_tree(&child);
        }
        self.groups.remove(id);
        self.members.remove(id);
        self.group_roles.retain(|(group, _), _| group != id);
    }
}

/// In-memory stand-in for the Keycloak admin API.
///
/// Top-level listings report `subGroupCount` without inline children, the
/// way recent Keycloak versions do.
#[derive(Clone)]
pub struct FakeDirectory {
    realm: Arc<Mutex<Realm>>,
}

impl FakeDirectory {
    /// A realm with the platform client and a tenant-scoped `acme` client.
    pub fn new() -> Self {
        let mut realm = Realm::default();
        let clients = [(AUDIENCE, "client-web"), ("acme-forms-flow-web", "client-acme")];
        for (client_id, uuid) in clients {
            realm.clients.insert(client_id.to_string(), uuid.to_string());
            realm.client_roles.insert(
                uuid.to_string(),
                PERMISSIONS
                    .iter()
                    .map(|name| RoleRepresentation {
                        id: format!("{}-{}", uuid, name),
                        name: name.to_string(),
                        container_id: Some(uuid.to_string()),
                        client_role: Some(true),
                    })
                    .collect(),
            );
        }
        Self {
            realm: Arc::new(Mutex::new(realm)),
        }
    }

    pub fn add_user(&self, id: &str, username: &str, email: &str) {
        let mut realm = self.realm.lock().unwrap();
        realm.users.push(UserRepresentation {
            id: id.to_string(),
            username: username.to_string(),
            email: Some(email.to_string()),
            ..Default::default()
        });
    }

    /// Make every role-mapping write fail with a 500.
    pub fn fail_role_mapping(&self) {
        self.realm.lock().unwrap().fail_role_mapping = true;
    }

    pub fn group_count(&self) -> usize {
        self.realm.lock().unwrap().groups.len()
    }

    pub fn group_paths(&self) -> Vec<String> {
        let realm = self.realm.lock().unwrap();
        let mut paths: Vec<String> = realm.groups.keys().map(|id| realm.path(id)).collect();
        paths.sort();
        paths
    }

    /// Client role names mapped onto `group_id` for `client_id`.
    pub fn mapped_roles(&self, group_id: &str, client_id: &str) -> Vec<String> {
        let realm = self.realm.lock().unwrap();
        let Some(uuid) = realm.clients.get(client_id) else {
            return Vec::new();
        };
        let mut names: Vec<String> = realm
            .group_roles
            .get(&(group_id.to_string(), uuid.clone()))
            .map(|roles| roles.iter().map(|r| r.name.clone()).collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    pub fn members(&self, group_id: &str) -> Vec<String> {
        let realm = self.realm.lock().unwrap();
        realm
            .members
            .get(group_id)
            .map(|m| m.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of directory calls with this operation name.
    pub fn call_count(&self, operation: &str) -> usize {
        let realm = self.realm.lock().unwrap();
        realm.calls.iter().filter(|c| c.as_str() == operation).count()
    }

    fn record(&self, operation: &str) -> std::sync::MutexGuard<'_, Realm> {
        let mut realm = self.realm.lock().unwrap();
        realm.calls.push(operation.to_string());
        realm
    }
}

#[async_trait]
impl GroupDirectory for FakeDirectory {
    async fn list_groups(&self) -> KeycloakResult<Vec<GroupRepresentation>> {
        let realm = self.record("list_groups");
        realm
            .children(None)
            .iter()
            .map(|id| realm.representation(id))
            .collect()
    }

    async fn list_groups_page(
        &self,
        first: u32,
        max: u32,
    ) -> KeycloakResult<Vec<GroupRepresentation>> {
        let realm = self.record("list_groups_page");
        realm
            .children(None)
            .iter()
            .skip(first as usize)
            .take(max as usize)
            .map(|id| realm.representation(id))
            .collect()
    }

    async fn get_group(&self, group_id: &str) -> KeycloakResult<GroupRepresentation> {
        self.record("get_group").representation(group_id)
    }

    async fn group_by_path(&self, path: &str) -> KeycloakResult<GroupRepresentation> {
        let realm = self.record("group_by_path");
        let wanted = format!("/{}", path.trim_start_matches('/'));
        let id = realm
            .groups
            .keys()
            .find(|id| realm.path(id) == wanted)
            .cloned()
            .ok_or_else(|| not_found("Group"))?;
        realm.representation(&id)
    }

    async fn subgroups(&self, group_id: &str) -> KeycloakResult<Vec<GroupRepresentation>> {
        let realm = self.record("subgroups");
        if !realm.groups.contains_key(group_id) {
            return Err(not_found("Group"));
        }
        realm
            .children(Some(group_id))
            .iter()
            .map(|id| realm.representation(id))
            .collect()
    }

    async fn create_group(
        &self,
        parent_id: Option<&str>,
        group: &GroupRepresentation,
    ) -> KeycloakResult<String> {
        let mut realm = self.record("create_group");
        if let Some(parent) = parent_id {
            if !realm.groups.contains_key(parent) {
                return Err(not_found("Parent group"));
            }
        }
        let duplicate = realm
            .groups
            .values()
            .any(|g| g.parent.as_deref() == parent_id && g.name == group.name);
        if duplicate {
            return Err(KeycloakError::Status {
                status: 409,
                body: json!({"errorMessage": "Top level group named already exists."}).to_string(),
            });
        }

        realm.next_id += 1;
        let id = format!("group-{}", realm.next_id);
        realm.groups.insert(
            id.clone(),
            FakeGroup {
                name: group.name.clone(),
                parent: parent_id.map(str::to_string),
                attributes: group.attributes.clone(),
            },
        );
        Ok(id)
    }

    async fn update_group(
        &self,
        group_id: &str,
        group: &GroupRepresentation,
    ) -> KeycloakResult<()> {
        let mut realm = self.record("update_group");
        let existing = realm.groups.get_mut(group_id).ok_or_else(|| not_found("Group"))?;
        existing.name = group.name.clone();
        existing.attributes = group.attributes.clone();
        Ok(())
    }

    async fn delete_group(&self, group_id: &str) -> KeycloakResult<()> {
        let mut realm = self.record("delete_group");
        if !realm.groups.contains_key(group_id) {
            return Err(not_found("Group"));
        }
        realm.remove_tree(group_id);
        Ok(())
    }

    async fn group_members(&self, group_id: &str) -> KeycloakResult<Vec<UserRepresentation>> {
        let realm = self.record("group_members");
        if !realm.groups.contains_key(group_id) {
            return Err(not_found("Group"));
        }
        let members = realm.members.get(group_id).cloned().unwrap_or_default();
        Ok(realm
            .users
            .iter()
            .filter(|u| members.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn user_groups(&self, user_id: &str) -> KeycloakResult<Vec<GroupRepresentation>> {
        let realm = self.record("user_groups");
        realm
            .members
            .iter()
            .filter(|(_, users)| users.contains(user_id))
            .map(|(group, _)| realm.representation(group))
            .collect()
    }

    async fn add_user_to_group(
        &self,
        user_id: &str,
        group_id: &str,
        _membership: &GroupMembership,
    ) -> KeycloakResult<()> {
        let mut realm = self.record("add_user_to_group");
        if !realm.groups.contains_key(group_id) {
            return Err(not_found("Group"));
        }
        if !realm.users.iter().any(|u| u.id == user_id) {
            return Err(not_found("User"));
        }
        realm
            .members
            .entry(group_id.to_string())
            .or_default()
            .insert(user_id.to_string());
        Ok(())
    }

    async fn remove_user_from_group(&self, user_id: &str, group_id: &str) -> KeycloakResult<()> {
        let mut realm = self.record("remove_user_from_group");
        if !realm.groups.contains_key(group_id) {
            return Err(not_found("Group"));
        }
        if let Some(members) = realm.members.get_mut(group_id) {
            members.remove(user_id);
        }
        Ok(())
    }

    async fn realm_users(
        &self,
        search: Option<&str>,
        first: u32,
        max: u32,
    ) -> KeycloakResult<Vec<UserRepresentation>> {
        let realm = self.record("realm_users");
        Ok(realm
            .users
            .iter()
            .filter(|u| search.map_or(true, |s| u.username.contains(s)))
            .skip(first as usize)
            .take(max as usize)
            .cloned()
            .collect())
    }

    async fn realm_users_count(&self, search: Option<&str>) -> KeycloakResult<u64> {
        let realm = self.record("realm_users_count");
        Ok(realm
            .users
            .iter()
            .filter(|u| search.map_or(true, |s| u.username.contains(s)))
            .count() as u64)
    }

    async fn client_uuid(&self, client_id: &str) -> KeycloakResult<String> {
        let realm = self.record("client_uuid");
        realm.clients.get(client_id).cloned().ok_or_else(|| not_found("Client"))
    }

    async fn client_roles(&self, client_uuid: &str) -> KeycloakResult<Vec<RoleRepresentation>> {
        let realm = self.record("client_roles");
        realm
            .client_roles
            .get(client_uuid)
            .cloned()
            .ok_or_else(|| not_found("Client"))
    }

    async fn group_client_roles(
        &self,
        group_id: &str,
        client_uuid: &str,
    ) -> KeycloakResult<Vec<RoleRepresentation>> {
        let realm = self.record("group_client_roles");
        if !realm.groups.contains_key(group_id) {
            return Err(not_found("Group"));
        }
        Ok(realm
            .group_roles
            .get(&(group_id.to_string(), client_uuid.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn add_group_client_roles(
        &self,
        group_id: &str,
        client_uuid: &str,
        roles: &[RoleRepresentation],
    ) -> KeycloakResult<()> {
        let mut realm = self.record("add_group_client_roles");
        if realm.fail_role_mapping {
            return Err(KeycloakError::Status {
                status: 500,
                body: "mapping failed".to_string(),
            });
        }
        if !realm.groups.contains_key(group_id) {
            return Err(not_found("Group"));
        }
        let mapped = realm
            .group_roles
            .entry((group_id.to_string(), client_uuid.to_string()))
            .or_default();
        for role in roles {
            if !mapped.iter().any(|r| r.name == role.name) {
                mapped.push(role.clone());
            }
        }
        Ok(())
    }

    async fn remove_group_client_roles(
        &self,
        group_id: &str,
        client_uuid: &str,
        roles: &[RoleRepresentation],
    ) -> KeycloakResult<()> {
        let mut realm = self.record("remove_group_client_roles");
        if let Some(mapped) = realm
            .group_roles
            .get_mut(&(group_id.to_string(), client_uuid.to_string()))
        {
            mapped.retain(|r| !roles.iter().any(|gone| gone.name == r.name));
        }
        Ok(())
    }
}

/// Configuration for in-process servers: HS256 tokens, loopback listener.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.analysis.bind_address = "127.0.0.1:0".to_string();
    config.auth.enabled = true;
    config.auth.algorithm = "HS256".to_string();
    config.auth.secret = Some(SECRET.to_string());
    config.auth.required_role = ADMIN_ROLE.to_string();
    config
}

/// Sign an access token carrying `roles` on the platform client.
pub fn token(roles: &[&str], tenant_key: Option<&str>) -> String {
    let exp = (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp();
    let mut claims = json!({
        "sub": "5a1f4b7e-0000-4000-8000-000000000001",
        "preferred_username": "admin",
        "exp": exp,
        "resource_access": { AUDIENCE: { "roles": roles } },
    });
    if let Some(tenant) = tenant_key {
        claims["tenantKey"] = json!(tenant);
    }
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes()))
        .expect("token encodes")
}

pub fn admin_token() -> String {
    token(&[ADMIN_ROLE], None)
}

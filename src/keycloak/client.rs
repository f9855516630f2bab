//! Keycloak admin REST client.
//!
//! # Responsibilities
//! - Build admin API URLs under `{url}/admin/realms/{realm}/`
//! - Attach the service-account bearer token to every call
//! - Translate non-success statuses into [`KeycloakError::Status`]
//! - Record call latency per operation

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::config::KeycloakConfig;
use crate::keycloak::directory::GroupDirectory;
use crate::keycloak::token::ServiceAccountTokens;
use crate::keycloak::types::{
    ClientRepresentation, GroupMembership, GroupRepresentation, KeycloakError, KeycloakResult,
    RoleRepresentation, UserRepresentation,
};
use crate::observability::metrics;

/// HTTP implementation of [`GroupDirectory`].
pub struct KeycloakAdminClient {
    http: reqwest::Client,
    admin_base: Url,
    tokens: ServiceAccountTokens,
}

impl KeycloakAdminClient {
    /// Create a client for the configured realm.
    pub fn new(config: &KeycloakConfig) -> KeycloakResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let server = Url::parse(&config.url)?;
        let admin_base = with_segments(&server, ["admin", "realms", config.realm.as_str()])?;
        let token_url = with_segments(
            &server,
            ["realms", config.realm.as_str(), "protocol", "openid-connect", "token"],
        )?;

        tracing::info!(
            admin_url = %admin_base,
            client_id = %config.client_id,
            "Keycloak admin client initialized"
        );

        Ok(Self {
            http,
            admin_base,
            tokens: ServiceAccountTokens::new(
                token_url,
                config.client_id.clone(),
                config.client_secret.clone(),
                Duration::from_secs(config.token_refresh_margin_secs),
            ),
        })
    }

    fn endpoint<'a, I>(&self, segments: I) -> KeycloakResult<Url>
    where
        I: IntoIterator<Item = &'a str>,
    {
        with_segments(&self.admin_base, segments)
    }

    async fn send(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> KeycloakResult<Response> {
        let token = self.tokens.access_token(&self.http).await?;
        let start = Instant::now();

        let response = match request.bearer_auth(token).send().await {
            Ok(response) => response,
            Err(e) => {
                metrics::record_keycloak_call(operation, 0, start);
                tracing::error!(operation, error = %e, "Keycloak request failed");
                return Err(e.into());
            }
        };

        let status = response.status();
        metrics::record_keycloak_call(operation, status.as_u16(), start);

        if status.is_success() {
            tracing::debug!(operation, status = %status, "Keycloak call succeeded");
            return Ok(response);
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            self.tokens.invalidate().await;
        }
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(
            operation,
            status = %status,
            body = %body,
            "Keycloak call returned error status"
        );
        Err(KeycloakError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        url: Url,
        query: &[(&str, String)],
    ) -> KeycloakResult<T> {
        let request = self.http.request(Method::GET, url).query(query);
        let response = self.send(operation, request).await?;
        Ok(response.json().await?)
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        operation: &'static str,
        method: Method,
        url: Url,
        body: &B,
    ) -> KeycloakResult<Response> {
        let request = self.http.request(method, url).json(body);
        self.send(operation, request).await
    }
}

#[async_trait]
impl GroupDirectory for KeycloakAdminClient {
    async fn list_groups(&self) -> KeycloakResult<Vec<GroupRepresentation>> {
        let url = self.endpoint(["groups"])?;
        self.get_json("list_groups", url, &[("briefRepresentation", "false".into())])
            .await
    }

    async fn list_groups_page(
        &self,
        first: u32,
        max: u32,
    ) -> KeycloakResult<Vec<GroupRepresentation>> {
        let url = self.endpoint(["groups"])?;
        self.get_json(
            "list_groups_page",
            url,
            &[
                ("first", first.to_string()),
                ("max", max.to_string()),
                ("briefRepresentation", "false".into()),
            ],
        )
        .await
    }

    async fn get_group(&self, group_id: &str) -> KeycloakResult<GroupRepresentation> {
        let url = self.endpoint(["groups", group_id])?;
        self.get_json("get_group", url, &[]).await
    }

    async fn group_by_path(&self, path: &str) -> KeycloakResult<GroupRepresentation> {
        let segments = path.split('/').filter(|s| !s.is_empty());
        let url = self.endpoint(std::iter::once("group-by-path").chain(segments))?;
        self.get_json("group_by_path", url, &[]).await
    }

    async fn subgroups(&self, group_id: &str) -> KeycloakResult<Vec<GroupRepresentation>> {
        let url = self.endpoint(["groups", group_id, "children"])?;
        self.get_json("subgroups", url, &[("briefRepresentation", "false".into())])
            .await
    }

    async fn create_group(
        &self,
        parent_id: Option<&str>,
        group: &GroupRepresentation,
    ) -> KeycloakResult<String> {
        let url = match parent_id {
            Some(parent) => self.endpoint(["groups", parent, "children"])?,
            None => self.endpoint(["groups"])?,
        };
        let response = self.send_json("create_group", Method::POST, url, group).await?;

        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                KeycloakError::Unexpected("group created without Location header".into())
            })?;
        id_from_location(location)
    }

    async fn update_group(
        &self,
        group_id: &str,
        group: &GroupRepresentation,
    ) -> KeycloakResult<()> {
        let url = self.endpoint(["groups", group_id])?;
        self.send_json("update_group", Method::PUT, url, group).await?;
        Ok(())
    }

    async fn delete_group(&self, group_id: &str) -> KeycloakResult<()> {
        let url = self.endpoint(["groups", group_id])?;
        self.send("delete_group", self.http.delete(url)).await?;
        Ok(())
    }

    async fn group_members(&self, group_id: &str) -> KeycloakResult<Vec<UserRepresentation>> {
        let url = self.endpoint(["groups", group_id, "members"])?;
        self.get_json("group_members", url, &[]).await
    }

    async fn user_groups(&self, user_id: &str) -> KeycloakResult<Vec<GroupRepresentation>> {
        let url = self.endpoint(["users", user_id, "groups"])?;
        self.get_json("user_groups", url, &[]).await
    }

    async fn add_user_to_group(
        &self,
        user_id: &str,
        group_id: &str,
        membership: &GroupMembership,
    ) -> KeycloakResult<()> {
        let url = self.endpoint(["users", user_id, "groups", group_id])?;
        self.send_json("add_user_to_group", Method::PUT, url, membership).await?;
        Ok(())
    }

    async fn remove_user_from_group(&self, user_id: &str, group_id: &str) -> KeycloakResult<()> {
        let url = self.endpoint(["users", user_id, "groups", group_id])?;
        self.send("remove_user_from_group", self.http.delete(url)).await?;
        Ok(())
    }

    async fn realm_users(
        &self,
        search: Option<&str>,
        first: u32,
        max: u32,
    ) -> KeycloakResult<Vec<UserRepresentation>> {
        let url = self.endpoint(["users"])?;
        let mut query = vec![("first", first.to_string()), ("max", max.to_string())];
        if let Some(search) = search {
            query.push(("search", search.to_string()));
        }
        self.get_json("realm_users", url, &query).await
    }

    async fn realm_users_count(&self, search: Option<&str>) -> KeycloakResult<u64> {
        let url = self.endpoint(["users", "count"])?;
        let query: Vec<(&str, String)> = search
            .map(|s| vec![("search", s.to_string())])
            .unwrap_or_default();
        self.get_json("realm_users_count", url, &query).await
    }

    async fn client_uuid(&self, client_id: &str) -> KeycloakResult<String> {
        let url = self.endpoint(["clients"])?;
        let clients: Vec<ClientRepresentation> = self
            .get_json("client_uuid", url, &[("clientId", client_id.to_string())])
            .await?;
        clients
            .into_iter()
            .find(|c| c.client_id.is_empty() || c.client_id == client_id)
            .map(|c| c.id)
            .ok_or_else(|| KeycloakError::Unexpected(format!("client '{}' not found", client_id)))
    }

    async fn client_roles(&self, client_uuid: &str) -> KeycloakResult<Vec<RoleRepresentation>> {
        let url = self.endpoint(["clients", client_uuid, "roles"])?;
        self.get_json("client_roles", url, &[]).await
    }

    async fn group_client_roles(
        &self,
        group_id: &str,
        client_uuid: &str,
    ) -> KeycloakResult<Vec<RoleRepresentation>> {
        let url = self.endpoint(["groups", group_id, "role-mappings", "clients", client_uuid])?;
        self.get_json("group_client_roles", url, &[]).await
    }

    async fn add_group_client_roles(
        &self,
        group_id: &str,
        client_uuid: &str,
        roles: &[RoleRepresentation],
    ) -> KeycloakResult<()> {
        let url = self.endpoint(["groups", group_id, "role-mappings", "clients", client_uuid])?;
        self.send_json("add_group_client_roles", Method::POST, url, roles).await?;
        Ok(())
    }

    async fn remove_group_client_roles(
        &self,
        group_id: &str,
        client_uuid: &str,
        roles: &[RoleRepresentation],
    ) -> KeycloakResult<()> {
        let url = self.endpoint(["groups", group_id, "role-mappings", "clients", client_uuid])?;
        self.send_json("remove_group_client_roles", Method::DELETE, url, roles).await?;
        Ok(())
    }
}

/// Append path segments to `base`, percent-encoding each one.
fn with_segments<'a, I>(base: &Url, segments: I) -> KeycloakResult<Url>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| KeycloakError::Unexpected(format!("'{}' cannot be a base URL", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// The created resource id is the last segment of the `Location` header.
fn id_from_location(location: &str) -> KeycloakResult<String> {
    location
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            KeycloakError::Unexpected(format!("malformed Location header '{}'", location))
        })
}

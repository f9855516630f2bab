//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, timeout, body limit, request ID, auth)
//! - Hold the swappable inner state (config, group service, token verifier)
//! - Apply configuration updates from the watcher
//! - Serve until the shutdown signal fires

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer};

use crate::auth::{authorize, AuthError, TokenVerifier};
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::groups::{GroupService, GroupSettings};
use crate::http::request::{
    propagate_request_id_layer, request_id, set_request_id_layer, trace_layer, track_metrics,
};
use crate::http::response::{frame_options_layer, get_status};
use crate::http::{groups, users};
use crate::keycloak::{GroupDirectory, KeycloakAdminClient, KeycloakError};

/// Everything a request needs, replaced wholesale on config reload.
pub struct InnerState {
    pub config: AppConfig,
    pub directory: Arc<dyn GroupDirectory>,
    pub groups: GroupService,
    pub verifier: Option<TokenVerifier>,
}

impl InnerState {
    pub fn new(config: AppConfig, directory: Arc<dyn GroupDirectory>) -> Result<Self, AuthError> {
        let verifier = TokenVerifier::from_config(&config.auth, &config.keycloak.audience)?;
        let groups = GroupService::new(directory.clone(), GroupSettings::from(&config));
        Ok(Self {
            config,
            directory,
            groups,
            verifier,
        })
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<ArcSwap<InnerState>>,
}

impl AppState {
    pub fn new(inner: InnerState) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(inner)),
        }
    }

    /// Swap in a new configuration. The directory is rebuilt only when the
    /// Keycloak section changed.
    pub fn reload(&self, config: AppConfig) {
        let current = self.inner.load_full();

        let directory: Arc<dyn GroupDirectory> = if current.config.keycloak == config.keycloak {
            current.directory.clone()
        } else {
            match KeycloakAdminClient::new(&config.keycloak) {
                Ok(client) => Arc::new(client),
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        "Rejected config reload: invalid Keycloak settings"
                    );
                    return;
                }
            }
        };

        if current.config.listener.bind_address != config.listener.bind_address {
            tracing::warn!("Listener address changes take effect after restart");
        }

        match InnerState::new(config, directory) {
            Ok(inner) => {
                self.inner.store(Arc::new(inner));
                tracing::info!("Configuration reloaded");
            }
            Err(e) => tracing::error!(error = %e, "Rejected config reload: invalid auth settings"),
        }
    }
}

/// HTTP server for the group API.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a server talking to the Keycloak instance in `config`.
    pub fn from_config(config: AppConfig) -> Result<Self, ServerError> {
        let directory = Arc::new(KeycloakAdminClient::new(&config.keycloak)?);
        Self::new(config, directory)
    }

    /// Create a server over an arbitrary directory.
    pub fn new(config: AppConfig, directory: Arc<dyn GroupDirectory>) -> Result<Self, ServerError> {
        let router_config = config.clone();
        let state = AppState::new(InnerState::new(config, directory)?);
        let router = Self::build_router(&router_config, state.clone());
        Ok(Self { router, state })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &AppConfig, state: AppState) -> Router {
        let protected = Router::new()
            .route("/groups", get(groups::list_groups).post(groups::create_group))
            .route(
                "/groups/{group_id}",
                get(groups::get_group)
                    .put(groups::update_group)
                    .delete(groups::delete_group),
            )
            .route("/analytics/groups", get(groups::analytics_groups))
            .route("/user", get(users::list_users))
            .route(
                "/user/{user_id}/permission/groups/{group_id}",
                put(users::add_user_to_group).delete(users::remove_user_from_group),
            )
            .route("/user/add-user-to-tenant", post(users::add_user_to_tenant))
            .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
            .with_state(state);

        Router::new()
            .route("/status", get(get_status))
            .merge(protected)
            .layer(middleware::from_fn(track_metrics))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(frame_options_layer(&config.security.frame_options))
            .layer(trace_layer())
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer())
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<AppConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let state = self.state.clone();
        tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                state.reload(config);
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Verify the bearer token and attach the caller to the request.
async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let authorized = {
        let inner = state.inner.load();
        authorize(inner.verifier.as_ref(), request.headers())
    };

    match authorized {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => {
            tracing::warn!(
                request_id = %request_id(&request),
                error = %e,
                "Request not authorized"
            );
            ApiError::from(e).into_response()
        }
    }
}

/// Startup failures of the group API server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Keycloak(#[from] KeycloakError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

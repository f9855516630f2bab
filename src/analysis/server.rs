//! HTTP surface of the data-analysis API.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Path, State},
    http::Request,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer};

use crate::analysis::classifier::SentimentClassifier;
use crate::analysis::store::{SentimentRecord, SentimentStore};
use crate::analysis::types::{AnalysedElement, SentimentRequest, SentimentResponse};
use crate::auth::{authorize, AuthError, TokenVerifier};
use crate::config::AppConfig;
use crate::error::{ApiError, ApiResult};
use crate::http::request::{
    propagate_request_id_layer, request_id, set_request_id_layer, trace_layer, track_metrics,
};
use crate::http::response::frame_options_layer;
use crate::observability::metrics;

pub const DATABASE_DISABLED: &str = "Database support is disabled.";

#[derive(Clone)]
pub struct AnalysisState {
    pub classifier: Arc<dyn SentimentClassifier>,
    pub store: Option<SentimentStore>,
    pub verifier: Option<Arc<TokenVerifier>>,
}

pub struct AnalysisServer {
    router: Router,
}

impl AnalysisServer {
    /// Any authenticated caller may analyse text; no role is required.
    pub fn new(
        config: &AppConfig,
        classifier: Arc<dyn SentimentClassifier>,
        store: Option<SentimentStore>,
    ) -> Result<Self, AuthError> {
        let mut auth = config.auth.clone();
        auth.required_role.clear();
        let verifier = TokenVerifier::from_config(&auth, &config.keycloak.audience)?.map(Arc::new);

        let state = AnalysisState {
            classifier,
            store,
            verifier,
        };
        Ok(Self {
            router: build_router(config, state),
        })
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Data analysis API starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("Data analysis API stopped");
        Ok(())
    }
}

#[allow(deprecated)]
fn build_router(config: &AppConfig, state: AnalysisState) -> Router {
    let public = Router::new()
        .route("/status", get(get_status))
        .with_state(state.clone());

    let protected = Router::new()
        .route("/sentiment", post(analyse))
        .route("/sentiment/{application_id}", get(stored_results))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state);

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(middleware::from_fn(track_metrics))
        .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
        .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
        .layer(frame_options_layer(&config.security.frame_options))
        .layer(trace_layer())
        .layer(propagate_request_id_layer())
        .layer(set_request_id_layer())
}

async fn auth_middleware(
    State(state): State<AnalysisState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    match authorize(state.verifier.as_deref(), request.headers()) {
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

#[derive(Serialize)]
struct AnalysisStatus {
    service: &'static str,
    version: &'static str,
    status: &'static str,
    model: String,
}

async fn get_status(State(state): State<AnalysisState>) -> Json<AnalysisStatus> {
    Json(AnalysisStatus {
        service: "data-analysis-api",
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        model: state.classifier.model_id().to_string(),
    })
}

/// Classify every element of a submission.
pub async fn analyse(
    State(state): State<AnalysisState>,
    Json(request): Json<SentimentRequest>,
) -> ApiResult<Json<SentimentResponse>> {
    if request.data.is_empty() {
        return Err(ApiError::BadRequest("No data to analyse.".to_string()));
    }

    let mut data = Vec::with_capacity(request.data.len());
    for element in request.data {
        let prediction = state.classifier.classify(&element.text).await?;
        metrics::record_classification(&prediction.label);
        data.push(AnalysedElement {
            element_id: element.element_id,
            element_type: element.element_type,
            text: element.text,
            overall_sentiment: prediction.label,
            score: prediction.score,
        });
    }

    let response = SentimentResponse {
        application_id: request.application_id,
        form_url: request.form_url,
        data,
    };

    if let Some(store) = state.store.clone() {
        let snapshot = response.clone();
        tokio::task::spawn_blocking(move || store.insert_response(&snapshot))
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))??;
    }

    tracing::info!(
        application_id = response.application_id,
        elements = response.data.len(),
        "Sentiment analysed"
    );
    Ok(Json(response))
}

/// Stored results of one application.
pub async fn stored_results(
    State(state): State<AnalysisState>,
    Path(application_id): Path<i64>,
) -> ApiResult<Json<Vec<SentimentRecord>>> {
    let store = state
        .store
        .as_ref()
        .ok_or_else(|| ApiError::BadRequest(DATABASE_DISABLED.to_string()))?;
    Ok(Json(store.for_application(application_id)))
}

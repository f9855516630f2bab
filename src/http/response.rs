//! Response headers and service status.

use axum::{
    http::{header, HeaderValue},
    Json,
};
use serde::Serialize;
use tower_http::set_header::SetResponseHeaderLayer;

/// Adds `X-Frame-Options` to every response.
pub fn frame_options_layer(value: &str) -> SetResponseHeaderLayer<HeaderValue> {
    let value = HeaderValue::from_str(value).unwrap_or_else(|_| HeaderValue::from_static("DENY"));
    SetResponseHeaderLayer::overriding(header::X_FRAME_OPTIONS, value)
}

#[derive(Serialize)]
pub struct SystemStatus {
    pub service: &'static str,
    pub version: &'static str,
    pub status: &'static str,
}

pub async fn get_status() -> Json<SystemStatus> {
    Json(SystemStatus {
        service: "formsflow-api",
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
    })
}

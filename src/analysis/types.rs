//! Sentiment request/response payloads and errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ApiError;

/// One form field to analyse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentElement {
    pub element_id: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub element_type: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentRequest {
    pub application_id: i64,
    #[serde(default)]
    pub form_url: String,
    pub data: Vec<SentimentElement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysedElement {
    pub element_id: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub element_type: Option<String>,
    pub text: String,
    #[serde(rename = "overall_sentiment")]
    pub overall_sentiment: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentResponse {
    pub application_id: i64,
    pub form_url: String,
    pub data: Vec<AnalysedElement>,
}

/// A model prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    pub score: f64,
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Inference request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Inference server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unexpected inference response: {0}")]
    Unexpected(String),

    #[error("Model loading failed: {0}")]
    Load(String),

    #[error("Sentiment store error: {0}")]
    Store(#[from] std::io::Error),

    #[error("Sentiment store is corrupt: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<AnalysisError> for ApiError {
    fn from(e: AnalysisError) -> Self {
        match e {
            AnalysisError::Transport(_)
            | AnalysisError::Status { .. }
            | AnalysisError::Unexpected(_) => ApiError::Upstream(e.to_string()),
            _ => ApiError::Internal(e.to_string()),
        }
    }
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;

//! Text classification backends.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::analysis::types::{AnalysisError, AnalysisResult, Classification};
use crate::config::AnalysisConfig;

/// Placeholder substituted in `inference_url`.
const MODEL_PLACEHOLDER: &str = "{model_id}";

/// Assigns a sentiment label and confidence to a piece of text.
#[async_trait]
pub trait SentimentClassifier: Send + Sync {
    fn model_id(&self) -> &str;

    async fn classify(&self, text: &str) -> AnalysisResult<Classification>;
}

/// Cut `text` to at most `max_chars` characters, on a char boundary.
pub fn truncate_text(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[derive(Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: InferenceParameters,
}

#[derive(Serialize)]
struct InferenceParameters {
    truncation: bool,
}

/// Text-classification servers answer with one of these shapes.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceOutput {
    Batched(Vec<Vec<Classification>>),
    Flat(Vec<Classification>),
    Single(Classification),
}

impl InferenceOutput {
    fn into_top(self) -> Option<Classification> {
        let candidates = match self {
            InferenceOutput::Batched(batches) => batches.into_iter().flatten().collect(),
            InferenceOutput::Flat(candidates) => candidates,
            InferenceOutput::Single(one) => vec![one],
        };
        candidates
            .into_iter()
            .max_by(|a, b| a.score.total_cmp(&b.score))
    }
}

/// Pick the highest scoring label out of a raw inference response.
pub fn top_classification(body: &[u8]) -> AnalysisResult<Classification> {
    let output: InferenceOutput = serde_json::from_slice(body)
        .map_err(|e| AnalysisError::Unexpected(e.to_string()))?;
    output
        .into_top()
        .ok_or_else(|| AnalysisError::Unexpected("empty classification list".to_string()))
}

/// Classifier backed by an HTTP text-classification inference server.
pub struct InferenceClassifier {
    client: reqwest::Client,
    endpoint: String,
    model_id: String,
    token: Option<String>,
    max_text_chars: usize,
}

impl InferenceClassifier {
    pub fn new(config: &AnalysisConfig) -> AnalysisResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.inference_url.replace(MODEL_PLACEHOLDER, &config.model_id),
            model_id: config.model_id.clone(),
            token: config.inference_token.clone().filter(|t| !t.is_empty()),
            max_text_chars: config.max_text_chars,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SentimentClassifier for InferenceClassifier {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn classify(&self, text: &str) -> AnalysisResult<Classification> {
        let start = Instant::now();
        let body = InferenceRequest {
            inputs: truncate_text(text, self.max_text_chars),
            parameters: InferenceParameters { truncation: true },
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let top = top_classification(&bytes)?;
        tracing::debug!(
            model = %self.model_id,
            label = %top.label,
            score = top.score,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Text classified"
        );
        Ok(top)
    }
}

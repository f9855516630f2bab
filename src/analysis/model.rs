//! Model preloading.
//!
//! The classifier is built and warmed up on a background task before the
//! listener is bound, so the first request never pays the load cost.

use std::sync::Arc;

use crate::analysis::classifier::{InferenceClassifier, SentimentClassifier};
use crate::analysis::types::{AnalysisError, AnalysisResult};
use crate::config::AnalysisConfig;

const WARM_UP_TEXT: &str = "Model warm up.";

/// Build the inference classifier and run one warm-up prediction.
pub async fn load_model(config: AnalysisConfig) -> AnalysisResult<Arc<dyn SentimentClassifier>> {
    let classifier: Arc<dyn SentimentClassifier> = Arc::new(InferenceClassifier::new(&config)?);
    preload(classifier).await
}

/// Warm `classifier` up on a spawned task and wait for it.
pub async fn preload(
    classifier: Arc<dyn SentimentClassifier>,
) -> AnalysisResult<Arc<dyn SentimentClassifier>> {
    tracing::info!(model = %classifier.model_id(), "Model is loading...");

    let warm = classifier.clone();
    let handle = tokio::spawn(async move { warm.classify(WARM_UP_TEXT).await });

    match handle.await {
        Ok(Ok(prediction)) => {
            tracing::debug!(label = %prediction.label, "Warm-up prediction");
        }
        Ok(Err(e)) => return Err(AnalysisError::Load(e.to_string())),
        Err(e) => return Err(AnalysisError::Load(e.to_string())),
    }

    tracing::info!(model = %classifier.model_id(), "Model loading complete.");
    Ok(classifier)
}

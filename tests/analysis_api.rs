//! Data-analysis API with a scripted classifier.

use std::sync::Arc;

use async_trait::async_trait;
use httpmock::prelude::*;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use formsflow_api::analysis::{
    preload, AnalysisError, AnalysisResult, AnalysisServer, Classification, InferenceClassifier,
    SentimentClassifier, SentimentStore,
};
use formsflow_api::config::{AnalysisConfig, AppConfig};

mod common;
use common::{test_config, token};

/// Labels text by keyword.
struct KeywordClassifier;

#[async_trait]
impl SentimentClassifier for KeywordClassifier {
    fn model_id(&self) -> &str {
        "keyword-test-model"
    }

    async fn classify(&self, text: &str) -> AnalysisResult<Classification> {
        let text = text.to_lowercase();
        let (label, score) = if text.contains("love") || text.contains("great") {
            ("positive", 0.92)
        } else if text.contains("bad") || text.contains("slow") {
            ("negative", 0.81)
        } else {
            ("neutral", 0.55)
        };
        Ok(Classification {
            label: label.to_string(),
            score,
        })
    }
}

/// Fails like an unreachable inference server.
struct UnavailableClassifier;

#[async_trait]
impl SentimentClassifier for UnavailableClassifier {
    fn model_id(&self) -> &str {
        "unavailable"
    }

    async fn classify(&self, _text: &str) -> AnalysisResult<Classification> {
        Err(AnalysisError::Status {
            status: 503,
            body: "model is loading".to_string(),
        })
    }
}

async fn start(
    config: &AppConfig,
    classifier: Arc<dyn SentimentClassifier>,
    store: Option<SentimentStore>,
) -> String {
    let server = AnalysisServer::new(config, classifier, store).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let router = server.router();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    base
}

fn submission() -> Value {
    json!({
        "applicationId": 1001,
        "formUrl": "https://forms.example.com/form/feedback/submission/1",
        "data": [
            {"elementId": "comments", "type": "textarea", "text": "I love the new portal"},
            {"elementId": "issues", "text": "Approval was slow"}
        ]
    })
}

#[tokio::test]
async fn test_sentiment_is_added_to_each_element() {
    let config = test_config();
    let base = start(&config, Arc::new(KeywordClassifier), None).await;
    let http = reqwest::Client::new();

    let res = http
        .post(format!("{}/sentiment", base))
        .bearer_auth(token(&[], None))
        .json(&submission())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-frame-options"], "DENY");

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["applicationId"], 1001);
    assert_eq!(body["data"][0]["elementId"], "comments");
    assert_eq!(body["data"][0]["type"], "textarea");
    assert_eq!(body["data"][0]["overall_sentiment"], "positive");
    assert_eq!(body["data"][0]["score"], 0.92);
    assert_eq!(body["data"][1]["overall_sentiment"], "negative");
    assert!(body["data"][1].get("type").is_none());
}

#[tokio::test]
async fn test_token_required_but_no_role() {
    let config = test_config();
    let base = start(&config, Arc::new(KeywordClassifier), None).await;
    let http = reqwest::Client::new();

    let res = http
        .post(format!("{}/sentiment", base))
        .json(&submission())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = http.get(format!("{}/status", base)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let status: Value = res.json().await.unwrap();
    assert_eq!(status["model"], "keyword-test-model");
}

#[tokio::test]
async fn test_empty_and_malformed_submissions() {
    let config = test_config();
    let base = start(&config, Arc::new(KeywordClassifier), None).await;
    let http = reqwest::Client::new();

    let res = http
        .post(format!("{}/sentiment", base))
        .bearer_auth(token(&[], None))
        .json(&json!({"applicationId": 1, "formUrl": "x", "data": []}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = http
        .post(format!("{}/sentiment", base))
        .bearer_auth(token(&[], None))
        .json(&json!({"formUrl": "x"}))
        .send()
        .await
        .unwrap();
    assert!(res.status().is_client_error());
}

#[tokio::test]
async fn test_inference_failure_is_bad_gateway() {
    let config = test_config();
    let base = start(&config, Arc::new(UnavailableClassifier), None).await;

    let res = reqwest::Client::new()
        .post(format!("{}/sentiment", base))
        .bearer_auth(token(&[], None))
        .json(&submission())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_results_are_stored_when_database_enabled() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sentiment.json");
    let store = SentimentStore::open(&path).unwrap();

    let config = test_config();
    let base = start(&config, Arc::new(KeywordClassifier), Some(store)).await;
    let http = reqwest::Client::new();

    let res = http
        .post(format!("{}/sentiment", base))
        .bearer_auth(token(&[], None))
        .json(&submission())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let stored: Value = http
        .get(format!("{}/sentiment/1001", base))
        .bearer_auth(token(&[], None))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stored.as_array().unwrap().len(), 2);
    assert_eq!(stored[0]["applicationId"], 1001);

    let reopened = SentimentStore::open(&path).unwrap();
    assert_eq!(reopened.for_application(1001).len(), 2);
}

#[tokio::test]
async fn test_stored_results_need_database_support() {
    let config = test_config();
    let base = start(&config, Arc::new(KeywordClassifier), None).await;

    let res = reqwest::Client::new()
        .get(format!("{}/sentiment/1001", base))
        .bearer_auth(token(&[], None))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_preload_warms_up_or_fails() {
    let loaded = preload(Arc::new(KeywordClassifier)).await.unwrap();
    assert_eq!(loaded.model_id(), "keyword-test-model");

    let err = preload(Arc::new(UnavailableClassifier)).await.err().unwrap();
    assert!(matches!(err, AnalysisError::Load(_)));
}

#[tokio::test]
async fn test_inference_classifier_request_shape() {
    let server = MockServer::start_async().await;
    let inference = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/models/acme/sentiment")
                .header("authorization", "Bearer hf-token")
                .json_body(json!({"inputs": "Great", "parameters": {"truncation": true}}));
            then.status(200).json_body(json!([[
                {"label": "negative", "score": 0.02},
                {"label": "positive", "score": 0.97}
            ]]));
        })
        .await;

    let config = AnalysisConfig {
        model_id: "acme/sentiment".to_string(),
        inference_url: format!("{}/models/{{model_id}}", server.base_url()),
        inference_token: Some("hf-token".to_string()),
        max_text_chars: 5,
        ..AnalysisConfig::default()
    };
    let classifier = InferenceClassifier::new(&config).unwrap();

    let top = classifier.classify("Great service overall").await.unwrap();
    assert_eq!(top.label, "positive");
    inference.assert_async().await;
}

#[tokio::test]
async fn test_inference_classifier_error_status() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/models/m");
            then.status(503).body("Model m is currently loading");
        })
        .await;

    let config = AnalysisConfig {
        model_id: "m".to_string(),
        inference_url: format!("{}/models/{{model_id}}", server.base_url()),
        ..AnalysisConfig::default()
    };
    let err = InferenceClassifier::new(&config)
        .unwrap()
        .classify("hello")
        .await
        .unwrap_err();
    assert!(matches!(err, AnalysisError::Status { status: 503, .. }));
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Error handling tests for POST /embed
//!
//! - Malformed bodies map to 400 with the fixed message
//! - Model failures and panics map to 500 with the fixed message
//! - A failed request does not affect the next one

use super::helpers::{hash_app, post_embed, CapturedLogs, MockFlakyEmbedder};
use anyhow::anyhow;
use async_trait::async_trait;
use axum::{body::Body, http::StatusCode};
use minilm_embed_service::api::{
    create_app, AppState, EMBEDDING_FAILED_MESSAGE, MALFORMED_REQUEST_MESSAGE,
};
use minilm_embed_service::embeddings::Embedder;
use serde_json::json;
use std::sync::Arc;

fn flaky_app(mock: MockFlakyEmbedder) -> axum::Router {
    create_app(AppState::new(Arc::new(mock)))
}

#[tokio::test]
async fn test_empty_body_is_bad_request() {
    let (status, json) = post_embed(hash_app(), Body::empty()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json, json!({ "error": MALFORMED_REQUEST_MESSAGE }));
}

#[tokio::test]
async fn test_non_json_body_is_bad_request() {
    let (status, json) = post_embed(hash_app(), "text=hello").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Request body must be JSON with a 'text' key");
}

#[tokio::test]
async fn test_missing_text_key_is_bad_request() {
    for body in ["{}", r#"{"texts": ["a"]}"#, r#"["text"]"#, "null"] {
        let (status, json) = post_embed(hash_app(), body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {}", body);
        assert_eq!(json, json!({ "error": MALFORMED_REQUEST_MESSAGE }));
    }
}

#[tokio::test]
async fn test_wrong_text_type_is_server_error() {
    for body in [r#"{"text": 42}"#, r#"{"text": null}"#, r#"{"text": {"a": 1}}"#] {
        let (status, json) = post_embed(hash_app(), body).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "body: {}", body);
        assert_eq!(json, json!({ "error": EMBEDDING_FAILED_MESSAGE }));
    }
}

#[tokio::test]
async fn test_model_failure_is_generic_server_error() {
    let mut mock = MockFlakyEmbedder::new();
    mock.expect_embed()
        .returning(|_| Err(anyhow!("ONNX Runtime: out of memory")));

    let (status, json) = post_embed(flaky_app(mock), r#"{"text": "hello"}"#).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json, json!({ "error": "Failed to generate embedding" }));
}

#[tokio::test]
async fn test_failure_cause_is_logged_not_returned() {
    let logs = CapturedLogs::default();
    let _guard = logs.install();

    let mut mock = MockFlakyEmbedder::new();
    mock.expect_embed()
        .returning(|_| Err(anyhow!("tensor shape [1, 7] rejected by session")));

    let (status, json) = post_embed(flaky_app(mock), r#"{"text": "hello"}"#).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json, json!({ "error": EMBEDDING_FAILED_MESSAGE }));

    let output = logs.contents();
    assert!(output.contains("ERROR"), "logs: {}", output);
    assert!(
        output.contains("tensor shape [1, 7] rejected by session"),
        "logs: {}",
        output
    );
}

#[tokio::test]
async fn test_batch_failure_is_generic_server_error() {
    let mut mock = MockFlakyEmbedder::new();
    mock.expect_embed_batch()
        .returning(|_| Err(anyhow!("tokenization failed")));

    let (status, json) = post_embed(flaky_app(mock), r#"{"text": ["a", "b"]}"#).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json, json!({ "error": EMBEDDING_FAILED_MESSAGE }));
}

#[tokio::test]
async fn test_service_keeps_serving_after_failure() {
    let mut mock = MockFlakyEmbedder::new();
    mock.expect_embed()
        .withf(|text| text.contains("poison"))
        .times(1)
        .returning(|_| Err(anyhow!("injected fault")));
    mock.expect_embed()
        .withf(|text| !text.contains("poison"))
        .times(1)
        .returning(|_| Ok(vec![0.5, 0.25]));

    let app = flaky_app(mock);

    let (status, _) = post_embed(app.clone(), r#"{"text": "poison"}"#).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (status, json) = post_embed(app, r#"{"text": "hello"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({ "embedding": [0.5, 0.25] }));
}

/// Panics on every call, standing in for a crash inside the model
struct PanickingEmbedder;

#[async_trait]
impl Embedder for PanickingEmbedder {
    async fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
        panic!("kernel exploded")
    }

    async fn embed_batch(&self, _texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        panic!("kernel exploded")
    }

    fn dimension(&self) -> usize {
        0
    }
}

#[tokio::test]
async fn test_panic_is_generic_server_error() {
    let app = create_app(AppState::new(Arc::new(PanickingEmbedder)));

    let (status, json) = post_embed(app.clone(), r#"{"text": "hello"}"#).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json, json!({ "error": EMBEDDING_FAILED_MESSAGE }));

    // The router survives the panic
    let (status, json) = post_embed(app, r#"{"text": ["a"]}"#).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json, json!({ "error": EMBEDDING_FAILED_MESSAGE }));
}

#[tokio::test]
async fn test_malformed_request_never_reaches_model() {
    let mut mock = MockFlakyEmbedder::new();
    mock.expect_embed().never();
    mock.expect_embed_batch().never();

    let (status, _) = post_embed(flaky_app(mock), "{}").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

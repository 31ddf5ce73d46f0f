// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Success-path tests for POST /embed, driven through the router

use super::helpers::{as_vector, hash_app, post_embed, send, CapturedLogs, HashEmbedder, DIMENSIONS};
use axum::{body::Body, http::StatusCode};
use minilm_embed_service::api::{serve, AppState, EmbedRequest};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

fn body(request: &EmbedRequest) -> String {
    serde_json::to_string(request).unwrap()
}

#[tokio::test]
async fn test_single_text_returns_flat_vector() {
    let (status, json) = post_embed(hash_app(), body(&EmbedRequest::single("hello"))).await;

    assert_eq!(status, StatusCode::OK);
    let embedding = as_vector(&json["embedding"]);
    assert_eq!(embedding.len(), DIMENSIONS);
}

#[tokio::test]
async fn test_text_list_returns_one_vector_per_text() {
    let (status, json) = post_embed(hash_app(), r#"{"text": ["a", "b"]}"#).await;

    assert_eq!(status, StatusCode::OK);
    let vectors = json["embedding"].as_array().expect("nested array");
    assert_eq!(vectors.len(), 2);
    for vector in vectors {
        assert_eq!(as_vector(vector).len(), DIMENSIONS);
    }
    assert_ne!(vectors[0], vectors[1]);
}

#[tokio::test]
async fn test_batch_order_matches_single_calls() {
    let app = hash_app();

    let (_, first) = post_embed(app.clone(), r#"{"text": "first"}"#).await;
    let (_, second) = post_embed(app.clone(), r#"{"text": "second"}"#).await;
    let (status, batch) = post_embed(app, r#"{"text": ["first", "second"]}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(batch["embedding"][0], first["embedding"]);
    assert_eq!(batch["embedding"][1], second["embedding"]);
}

#[tokio::test]
async fn test_identical_input_gives_identical_output() {
    let app = hash_app();

    let (_, a) = post_embed(app.clone(), r#"{"text": "same text"}"#).await;
    let (_, b) = post_embed(app, r#"{"text": "same text"}"#).await;

    assert_eq!(a, b);
}

#[tokio::test]
async fn test_response_has_only_embedding_key() {
    let (_, json) = post_embed(hash_app(), r#"{"text": "hello"}"#).await;

    let object = json.as_object().unwrap();
    assert_eq!(object.len(), 1);
    assert!(object.contains_key("embedding"));
}

#[tokio::test]
async fn test_empty_list_returns_empty_embedding() {
    let (status, json) = post_embed(hash_app(), r#"{"text": []}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({ "embedding": [] }));
}

#[tokio::test]
async fn test_empty_string_is_embedded() {
    let (status, json) = post_embed(hash_app(), r#"{"text": ""}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(as_vector(&json["embedding"]).len(), DIMENSIONS);
}

#[tokio::test]
async fn test_extra_fields_are_ignored() {
    let (status, _) = post_embed(hash_app(), r#"{"text": "hi", "normalize": false}"#).await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_concurrent_requests() {
    let app = hash_app();

    let requests = (0..16).map(|i| {
        let app = app.clone();
        async move { post_embed(app, format!(r#"{{"text": "request {}"}}"#, i)).await }
    });
    let results = futures::future::join_all(requests).await;

    for (status, json) in results {
        assert_eq!(status, StatusCode::OK);
        assert_eq!(as_vector(&json["embedding"]).len(), DIMENSIONS);
    }
}

#[tokio::test]
async fn test_get_is_not_allowed() {
    let (status, _) = send(hash_app(), "GET", Body::empty()).await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_serve_logs_embedding_dimension() {
    let logs = CapturedLogs::default();
    let _guard = logs.install();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let state = AppState::new(Arc::new(HashEmbedder::new(DIMENSIONS)));
    let server = tokio::spawn(serve(listener, state));

    tokio::time::sleep(Duration::from_millis(50)).await;
    server.abort();

    let output = logs.contents();
    assert!(
        output.contains(&format!("Embedding dimension: {}", DIMENSIONS)),
        "logs: {}",
        output
    );
}

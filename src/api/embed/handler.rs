// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /embed HTTP handler

use crate::api::embed::{EmbedInput, EmbedRequest, EmbedResponse, EmbeddingOutput};
use crate::api::http_server::AppState;
use crate::api::EmbedError;
use crate::embeddings::Embedder;
use axum::{body::Bytes, extract::State, Json};
use tracing::debug;

/// POST /embed handler
///
/// # Request Body
/// ```json
/// { "text": "hello" }            // or ["a", "b"]
/// ```
///
/// # Responses
/// - 200 `{"embedding": [...]}` (nested for a list of texts)
/// - 400 `{"error": "Request body must be JSON with a 'text' key"}`
/// - 500 `{"error": "Failed to generate embedding"}`
///
/// The body is taken as raw bytes so that JSON errors and missing
/// `Content-Type` headers map to the same 400 as a missing `text` key.
pub async fn embed_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<EmbedResponse>, EmbedError> {
    let request = EmbedRequest::from_body(&body)?;
    let embedding = generate(state.embedder.as_ref(), &request).await?;

    Ok(Json(EmbedResponse { embedding }))
}

async fn generate(
    embedder: &dyn Embedder,
    request: &EmbedRequest,
) -> anyhow::Result<EmbeddingOutput> {
    match request.input()? {
        EmbedInput::Single(text) => {
            debug!(chars = text.len(), "Embedding single text");
            Ok(EmbeddingOutput::Single(embedder.embed(&text).await?))
        }
        EmbedInput::Batch(texts) => {
            debug!(count = texts.len(), "Embedding batch");
            let vectors = embedder.embed_batch(&texts).await?;
            if vectors.len() != texts.len() {
                anyhow::bail!(
                    "Embedder returned {} vectors for {} texts",
                    vectors.len(),
                    texts.len()
                );
            }
            Ok(EmbeddingOutput::Batch(vectors))
        }
    }
}

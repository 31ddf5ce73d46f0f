// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

pub const MALFORMED_REQUEST_MESSAGE: &str = "Request body must be JSON with a 'text' key";
pub const EMBEDDING_FAILED_MESSAGE: &str = "Failed to generate embedding";

/// Error body returned to clients: `{"error": "..."}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

/// Request-level failures of `POST /embed`
///
/// Clients only ever see the fixed message of each variant; the cause carried
/// by `EmbeddingFailed` is written to the server log.
#[derive(Error, Debug)]
pub enum EmbedError {
    /// Body is not JSON, not an object, or has no `text` key
    #[error("Request body must be JSON with a 'text' key")]
    MalformedRequest,

    /// Anything that went wrong while computing the embedding
    #[error("Failed to generate embedding: {0:#}")]
    EmbeddingFailed(anyhow::Error),
}

impl EmbedError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            EmbedError::MalformedRequest => StatusCode::BAD_REQUEST,
            EmbedError::EmbeddingFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        let message = match self {
            EmbedError::MalformedRequest => MALFORMED_REQUEST_MESSAGE,
            EmbedError::EmbeddingFailed(_) => EMBEDDING_FAILED_MESSAGE,
        };

        ErrorResponse {
            error: message.to_string(),
        }
    }
}

impl From<anyhow::Error> for EmbedError {
    fn from(err: anyhow::Error) -> Self {
        EmbedError::EmbeddingFailed(err)
    }
}

impl IntoResponse for EmbedError {
    fn into_response(self) -> Response {
        match &self {
            EmbedError::MalformedRequest => warn!("Rejected malformed embed request"),
            EmbedError::EmbeddingFailed(cause) => {
                error!(error = %format!("{:#}", cause), "An error occurred while embedding")
            }
        }

        (self.status_code(), Json(self.to_response())).into_response()
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod embed;
pub mod errors;
pub mod http_server;

pub use embed::{embed_handler, EmbedInput, EmbedRequest, EmbedResponse, EmbeddingOutput};
pub use errors::{EmbedError, ErrorResponse, EMBEDDING_FAILED_MESSAGE, MALFORMED_REQUEST_MESSAGE};
pub use http_server::{create_app, serve, start_server, AppState};

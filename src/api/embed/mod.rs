// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Embedding API Module
//!
//! Provides the POST /embed endpoint backed by all-MiniLM-L6-v2.

pub mod handler;
pub mod request;
pub mod response;

pub use handler::embed_handler;
pub use request::{EmbedInput, EmbedRequest};
pub use response::{EmbedResponse, EmbeddingOutput};

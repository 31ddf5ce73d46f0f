// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Sentence embeddings
//!
//! The HTTP layer only sees the [`Embedder`] trait. The production
//! implementation is [`OnnxEmbeddingModel`], built once at startup by
//! [`load_model`].

pub mod loader;
pub mod onnx_model;
pub mod pooling;

pub use loader::{load_model, resolve_model_files, EmbeddingModelConfig, ModelFiles};
pub use onnx_model::{OnnxEmbeddingModel, MAX_SEQ_LENGTH};

use anyhow::Result;
use async_trait::async_trait;

/// Output dimension of all-MiniLM-L6-v2
pub const DEFAULT_DIMENSIONS: usize = 384;

/// Maps text to fixed-length vectors.
///
/// Implementations are shared read-only across all request handlers, so they
/// must be safe to call concurrently.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embeds a single text into one vector
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embeds every text, preserving input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Length of every vector this embedder returns
    fn dimension(&self) -> usize;
}

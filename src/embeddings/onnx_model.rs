// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! ONNX Embedding Model Wrapper
//!
//! Runs the all-MiniLM-L6-v2 sentence transformer through ONNX Runtime:
//! - BERT tokenization, truncated to 256 tokens
//! - CUDA execution provider with automatic CPU fallback
//! - Mean pooling over token embeddings, weighted by the attention mask
//! - L2 normalization of the pooled vector
//!
//! The same text always yields the same vector.

use anyhow::{Context, Result};
use async_trait::async_trait;
use ndarray::{Array2, Axis, Ix2};
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokenizers::{Encoding, Tokenizer, TruncationParams};
use tracing::{debug, info, warn};

use super::pooling::{l2_normalize, mean_pool};
use super::Embedder;

/// Maximum sequence length used by all-MiniLM-L6-v2
pub const MAX_SEQ_LENGTH: usize = 256;

/// Number of intra-op threads for the ONNX session
const INTRA_THREADS: usize = 4;

/// ONNX-based embedding model (all-MiniLM-L6-v2)
///
/// # Thread Safety
/// Cloning is cheap: the session and tokenizer live behind `Arc`. The session
/// needs exclusive access per run and is guarded by a mutex; the tokenizer is
/// shared read-only.
#[derive(Clone)]
pub struct OnnxEmbeddingModel {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,

    /// Model name (e.g., "all-MiniLM-L6-v2")
    model_name: String,

    /// Output dimension, measured by the validation inference at load time
    dimension: usize,
}

impl std::fmt::Debug for OnnxEmbeddingModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEmbeddingModel")
            .field("model_name", &self.model_name)
            .field("dimension", &self.dimension)
            .finish_non_exhaustive()
    }
}

impl OnnxEmbeddingModel {
    /// Creates a new ONNX embedding model from disk paths
    ///
    /// # Errors
    /// Returns error if:
    /// - Model or tokenizer file not found or invalid
    /// - ONNX Runtime initialization fails
    /// - The validation inference does not produce `[batch, seq_len, hidden]`
    ///
    /// # Example
    /// ```ignore
    /// let model = OnnxEmbeddingModel::new(
    ///     "all-MiniLM-L6-v2",
    ///     "./models/all-MiniLM-L6-v2-onnx/model.onnx",
    ///     "./models/all-MiniLM-L6-v2-onnx/tokenizer.json"
    /// ).await?;
    /// ```
    pub async fn new<P: AsRef<Path>>(
        model_name: impl Into<String>,
        model_path: P,
        tokenizer_path: P,
    ) -> Result<Self> {
        let model_name = model_name.into();
        let model_path = model_path.as_ref();
        let tokenizer_path = tokenizer_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("ONNX model file not found: {}", model_path.display());
        }
        if !tokenizer_path.exists() {
            anyhow::bail!("Tokenizer file not found: {}", tokenizer_path.display());
        }

        let session = build_session(model_path)?;
        let tokenizer = load_tokenizer(tokenizer_path)?;

        let mut model = Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            model_name,
            dimension: 0,
        };

        // Probe the hidden size with one inference before serving anything
        let probe = model
            .infer(&["validation test".to_string()])
            .context("Validation inference failed")?;
        model.dimension = probe.first().map(Vec::len).unwrap_or(0);
        if model.dimension == 0 {
            anyhow::bail!("Model {} produced an empty embedding", model.model_name);
        }

        info!(
            model = %model.model_name,
            dimension = model.dimension,
            "✅ ONNX embedding model loaded successfully"
        );

        Ok(model)
    }

    /// Generates an embedding for a single text
    ///
    /// ```ignore
    /// let embedding = model.embed("Hello world").await?;
    /// assert_eq!(embedding.len(), 384);
    /// ```
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .pop()
            .context("Model returned no embedding for a single text")
    }

    /// Generates embeddings for multiple texts in one inference run
    ///
    /// Output order matches input order. An empty slice returns an empty
    /// vector without touching the session.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let model = self.clone();
        let texts = texts.to_vec();
        tokio::task::spawn_blocking(move || model.embed_blocking(&texts))
            .await
            .context("Embedding task failed")?
    }

    /// Returns the output dimension of this model
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Returns the model name
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    fn embed_blocking(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let embeddings = self.infer(texts)?;

        for (i, embedding) in embeddings.iter().enumerate() {
            if embedding.len() != self.dimension {
                anyhow::bail!(
                    "Unexpected embedding dimension at index {}: {} (expected {})",
                    i,
                    embedding.len(),
                    self.dimension
                );
            }
        }

        Ok(embeddings)
    }

    /// Tokenizes, pads to the longest sequence, runs the session once and
    /// pools every row with its own attention mask.
    fn infer(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let encodings = texts
            .iter()
            .map(|text| {
                self.tokenizer
                    .encode(text.as_str(), true)
                    .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))
            })
            .collect::<Result<Vec<Encoding>>>()?;

        let batch = PaddedBatch::from_encodings(&encodings);
        debug!(
            batch_size = batch.batch_size,
            max_len = batch.max_len,
            "Running embedding inference"
        );

        let input_ids = Array2::from_shape_vec((batch.batch_size, batch.max_len), batch.input_ids)
            .context("Failed to create input_ids array")?;
        let attention_mask =
            Array2::from_shape_vec((batch.batch_size, batch.max_len), batch.attention_mask.clone())
                .context("Failed to create attention_mask array")?;
        let token_type_ids =
            Array2::from_shape_vec((batch.batch_size, batch.max_len), batch.token_type_ids)
                .context("Failed to create token_type_ids array")?;

        let mut session = lock_session(&self.session);
        let outputs = session.run(ort::inputs![
            "input_ids" => Value::from_array(input_ids)?,
            "attention_mask" => Value::from_array(attention_mask)?,
            "token_type_ids" => Value::from_array(token_type_ids)?
        ])?;

        // Index [0] rather than a name: exports differ in what they call it
        let output = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        let shape = output.shape();
        if shape.len() != 3 || shape[0] != batch.batch_size {
            anyhow::bail!(
                "Model outputs unexpected dimensions: {:?} (expected [{}, seq_len, hidden])",
                shape,
                batch.batch_size
            );
        }

        let mut embeddings = Vec::with_capacity(batch.batch_size);
        for row in 0..batch.batch_size {
            let tokens = output
                .index_axis(Axis(0), row)
                .into_dimensionality::<Ix2>()
                .context("Failed to view token embeddings")?;
            let mask = &batch.attention_mask[row * batch.max_len..(row + 1) * batch.max_len];

            let mut pooled = mean_pool(tokens, mask);
            l2_normalize(&mut pooled);
            embeddings.push(pooled);
        }

        Ok(embeddings)
    }
}

#[async_trait]
impl Embedder for OnnxEmbeddingModel {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        OnnxEmbeddingModel::embed(self, text).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        OnnxEmbeddingModel::embed_batch(self, texts).await
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Flattened, right-padded model inputs for one batch
struct PaddedBatch {
    batch_size: usize,
    max_len: usize,
    input_ids: Vec<i64>,
    attention_mask: Vec<i64>,
    token_type_ids: Vec<i64>,
}

impl PaddedBatch {
    fn from_encodings(encodings: &[Encoding]) -> Self {
        let batch_size = encodings.len();
        let max_len = encodings
            .iter()
            .map(|enc| enc.get_ids().len())
            .max()
            .unwrap_or(0);

        let mut input_ids = Vec::with_capacity(batch_size * max_len);
        let mut attention_mask = Vec::with_capacity(batch_size * max_len);
        let mut token_type_ids = Vec::with_capacity(batch_size * max_len);

        for encoding in encodings {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let padding = max_len - ids.len();

            input_ids.extend(ids.iter().map(|&id| id as i64));
            input_ids.extend(std::iter::repeat(0i64).take(padding));

            attention_mask.extend(mask.iter().map(|&m| m as i64));
            attention_mask.extend(std::iter::repeat(0i64).take(padding));

            // Single-segment input
            token_type_ids.extend(std::iter::repeat(0i64).take(max_len));
        }

        Self {
            batch_size,
            max_len,
            input_ids,
            attention_mask,
            token_type_ids,
        }
    }
}

/// Builds the ONNX session, trying CUDA first and falling back to CPU
fn build_session(model_path: &Path) -> Result<Session> {
    info!("🚀 Initializing ONNX embedding model");
    info!("   Attempting CUDA execution provider...");

    let cuda_result = Session::builder()
        .context("Failed to create session builder")?
        .with_execution_providers([CUDAExecutionProvider::default().build()])
        .context("Failed to set CUDA execution provider")?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .context("Failed to set optimization level")?
        .with_intra_threads(INTRA_THREADS)
        .context("Failed to set intra threads")?
        .commit_from_file(model_path);

    match cuda_result {
        Ok(session) => {
            info!("✅ CUDA execution provider initialized");
            Ok(session)
        }
        Err(e) => {
            warn!("⚠️  CUDA execution provider failed: {}", e);
            warn!("   Falling back to CPU execution provider");
            Session::builder()
                .context("Failed to create session builder")?
                .with_execution_providers([CPUExecutionProvider::default().build()])
                .context("Failed to set CPU execution provider")?
                .with_optimization_level(GraphOptimizationLevel::Level3)
                .context("Failed to set optimization level")?
                .with_intra_threads(INTRA_THREADS)
                .context("Failed to set intra threads")?
                .commit_from_file(model_path)
                .with_context(|| {
                    format!("Failed to load ONNX model from {}", model_path.display())
                })
        }
    }
}

/// Loads the tokenizer with truncation at [`MAX_SEQ_LENGTH`] and its own
/// padding disabled; batches are padded by [`PaddedBatch`].
fn load_tokenizer(tokenizer_path: &Path) -> Result<Tokenizer> {
    let mut tokenizer = Tokenizer::from_file(tokenizer_path)
        .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;

    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length: MAX_SEQ_LENGTH,
            ..Default::default()
        }))
        .map_err(|e| anyhow::anyhow!("Failed to configure truncation: {}", e))?;
    tokenizer.with_padding(None);

    Ok(tokenizer)
}

/// Locks the session, taking it back if an earlier run panicked
fn lock_session<T>(session: &Mutex<T>) -> MutexGuard<'_, T> {
    session.lock().unwrap_or_else(|poisoned| {
        warn!("ONNX session lock was poisoned by a panicked run, recovering");
        PoisonError::into_inner(poisoned)
    })
}

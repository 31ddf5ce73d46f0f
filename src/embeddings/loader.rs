// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Embedding model loading
//!
//! Resolves the ONNX model and tokenizer files, either from a local directory
//! or from the HuggingFace Hub cache, and builds the process-wide model.

use crate::embeddings::OnnxEmbeddingModel;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

/// File name of the ONNX export inside a local model directory
pub const MODEL_FILE: &str = "model.onnx";

/// File name of the tokenizer inside a local model directory
pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// Location of the ONNX export inside the sentence-transformers Hub repository
const HUB_MODEL_FILE: &str = "onnx/model.onnx";

/// Configuration for loading the embedding model
#[derive(Debug, Clone)]
pub struct EmbeddingModelConfig {
    /// Model name (e.g., "all-MiniLM-L6-v2")
    pub name: String,
    /// Directory holding `model.onnx` and `tokenizer.json`
    pub model_dir: PathBuf,
    /// Hub repository to download from when `model_dir` is incomplete.
    /// `None` disables downloading.
    pub hf_repo: Option<String>,
    /// Expected embedding dimensions
    pub dimensions: usize,
}

/// Paths of the two files the model needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFiles {
    pub model_path: PathBuf,
    pub tokenizer_path: PathBuf,
}

impl ModelFiles {
    /// Expected file layout inside a local model directory
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            model_path: dir.join(MODEL_FILE),
            tokenizer_path: dir.join(TOKENIZER_FILE),
        }
    }

    pub fn exist(&self) -> bool {
        self.model_path.is_file() && self.tokenizer_path.is_file()
    }
}

/// Finds the model files for `config`
///
/// Local files win. Otherwise the files are fetched from `config.hf_repo`
/// (served from the hf-hub cache after the first download).
pub async fn resolve_model_files(config: &EmbeddingModelConfig) -> Result<ModelFiles> {
    let local = ModelFiles::in_dir(&config.model_dir);
    if local.exist() {
        info!(
            model_dir = %config.model_dir.display(),
            "Using local embedding model files"
        );
        return Ok(local);
    }

    let Some(repo) = config.hf_repo.as_deref() else {
        anyhow::bail!(
            "Model files not found in {} (expected {} and {}) and Hub download is disabled",
            config.model_dir.display(),
            MODEL_FILE,
            TOKENIZER_FILE
        );
    };

    download_from_hub(repo).await
}

async fn download_from_hub(repo: &str) -> Result<ModelFiles> {
    info!(repo, "📥 Fetching embedding model from the HuggingFace Hub");

    let api = hf_hub::api::tokio::Api::new().context("Failed to create HuggingFace Hub client")?;
    let repo_handle = api.model(repo.to_string());

    let model_path = repo_handle
        .get(HUB_MODEL_FILE)
        .await
        .with_context(|| format!("Failed to download {} from {}", HUB_MODEL_FILE, repo))?;
    let tokenizer_path = repo_handle
        .get(TOKENIZER_FILE)
        .await
        .with_context(|| format!("Failed to download {} from {}", TOKENIZER_FILE, repo))?;

    info!(
        model = %model_path.display(),
        tokenizer = %tokenizer_path.display(),
        "✓ Embedding model files available"
    );

    Ok(ModelFiles {
        model_path,
        tokenizer_path,
    })
}

/// Resolves, loads and validates the embedding model
///
/// # Errors
/// - Model files cannot be found or downloaded
/// - ONNX Runtime or the tokenizer rejects the files
/// - The model's output dimension differs from `config.dimensions`
pub async fn load_model(config: &EmbeddingModelConfig) -> Result<Arc<OnnxEmbeddingModel>> {
    info!("Loading embedding model: {}", config.name);

    let files = resolve_model_files(config).await?;
    let model =
        OnnxEmbeddingModel::new(config.name.clone(), &files.model_path, &files.tokenizer_path)
            .await
            .inspect_err(|e| error!("✗ Failed to load model {}: {:#}", config.name, e))?;

    if model.dimension() != config.dimensions {
        anyhow::bail!(
            "Model {} dimension mismatch: expected {}, got {}",
            config.name,
            config.dimensions,
            model.dimension()
        );
    }

    info!(
        "✓ Successfully loaded model: {} ({} dimensions)",
        config.name,
        model.dimension()
    );

    Ok(Arc::new(model))
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::embeddings::{EmbeddingModelConfig, DEFAULT_DIMENSIONS};

pub const DEFAULT_MODEL_NAME: &str = "all-MiniLM-L6-v2";
pub const DEFAULT_HF_REPO: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// MiniLM embedding service
///
/// Every flag falls back to an environment variable (a `.env` file is read
/// first), then to a default matching the stock deployment.
#[derive(Parser, Debug, Clone)]
#[command(name = "minilm-embed-service")]
#[command(version)]
#[command(about = "Serves all-MiniLM-L6-v2 sentence embeddings over HTTP", long_about = None)]
pub struct ServiceConfig {
    /// Interface to listen on
    #[arg(long, env = "EMBED_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "EMBED_PORT", default_value_t = 5001)]
    pub port: u16,

    /// Name reported for the loaded model
    #[arg(long, env = "EMBED_MODEL_NAME", default_value = DEFAULT_MODEL_NAME)]
    pub model_name: String,

    /// Directory holding model.onnx and tokenizer.json
    #[arg(long, env = "EMBED_MODEL_DIR", default_value = "./models/all-MiniLM-L6-v2-onnx")]
    pub model_dir: PathBuf,

    /// HuggingFace Hub repository used when the model directory is incomplete
    #[arg(long, env = "EMBED_HF_REPO", default_value = DEFAULT_HF_REPO)]
    pub hf_repo: String,

    /// Never download from the Hub; fail if the model directory is incomplete
    #[arg(long, env = "EMBED_OFFLINE")]
    pub offline: bool,
}

impl ServiceConfig {
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .host
            .parse()
            .with_context(|| format!("Invalid listen host: {}", self.host))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn model_config(&self) -> EmbeddingModelConfig {
        EmbeddingModelConfig {
            name: self.model_name.clone(),
            model_dir: self.model_dir.clone(),
            hf_repo: (!self.offline).then(|| self.hf_repo.clone()),
            dimensions: DEFAULT_DIMENSIONS,
        }
    }
}

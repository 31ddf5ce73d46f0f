// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Parser;
use minilm_embed_service::{
    api::{start_server, AppState},
    config::ServiceConfig,
    embeddings::load_model,
    version,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let config = ServiceConfig::parse();

    // RUST_LOG wins; default to info
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("🚀 Starting {}", version::banner());

    // The model is loaded exactly once, before the listener exists
    info!("🧠 Loading sentence transformer model {}...", config.model_name);
    let model = load_model(&config.model_config()).await?;
    info!("✅ Model loaded successfully");

    let state = AppState::new(model);
    start_server(config.listen_addr()?, state).await
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the embedding service

/// Crate name, used as the service name in startup logs
pub const SERVICE_NAME: &str = env!("CARGO_PKG_NAME");

/// Semantic version number
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the banner logged at startup, e.g. "minilm-embed-service v0.1.0"
pub fn banner() -> String {
    format!("{} v{}", SERVICE_NAME, VERSION)
}

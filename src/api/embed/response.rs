// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Response body for POST /embed

use serde::{Deserialize, Serialize};

/// One vector for a single text, or one vector per text for a list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmbeddingOutput {
    Single(Vec<f32>),
    Batch(Vec<Vec<f32>>),
}

/// Response body for POST /embed
///
/// # Example
/// ```json
/// { "embedding": [0.1, 0.2, ...] }
/// { "embedding": [[0.1, ...], [0.3, ...]] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedResponse {
    pub embedding: EmbeddingOutput,
}

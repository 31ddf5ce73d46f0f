// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Sentence pooling over token-level model output
//!
//! all-MiniLM-L6-v2 produces one hidden vector per token. The sentence
//! embedding is the attention-masked mean of those vectors, scaled to unit
//! length.

use ndarray::ArrayView2;

/// Averages token embeddings `[seq_len, hidden_dim]`, counting only positions
/// whose attention mask is non-zero.
///
/// Mask entries beyond `seq_len` are ignored; missing entries count as padding.
pub fn mean_pool(token_embeddings: ArrayView2<'_, f32>, attention_mask: &[i64]) -> Vec<f32> {
    let (seq_len, hidden_dim) = token_embeddings.dim();

    let mut pooled = vec![0.0f32; hidden_dim];
    let mut sum_mask = 0.0f32;

    for i in 0..seq_len.min(attention_mask.len()) {
        let mask_value = attention_mask[i] as f32;
        if mask_value == 0.0 {
            continue;
        }
        sum_mask += mask_value;
        for (j, value) in pooled.iter_mut().enumerate() {
            *value += token_embeddings[[i, j]] * mask_value;
        }
    }

    let divisor = sum_mask.max(1e-9);
    for value in &mut pooled {
        *value /= divisor;
    }

    pooled
}

/// Scales `vector` to unit L2 norm in place. A zero vector stays zero.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-12);
    for value in vector.iter_mut() {
        *value /= norm;
    }
}

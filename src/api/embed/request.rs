// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Request body for POST /embed
//!
//! Parsing happens in two stages. [`EmbedRequest::from_body`] only checks the
//! envelope (JSON object with a `text` key) and maps failures to a 400.
//! [`EmbedRequest::input`] then interprets `text`; a value of the wrong type is
//! an embedding failure (500), not a malformed request.

use crate::api::EmbedError;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Text to embed: one string or a list of strings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmbedInput {
    Single(String),
    Batch(Vec<String>),
}

/// Request body for POST /embed
///
/// # Example
/// ```json
/// { "text": "Hello world" }
/// { "text": ["Hello world", "Another text"] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedRequest {
    /// Raw `text` value, interpreted by [`EmbedRequest::input`]
    pub text: Value,
}

impl EmbedRequest {
    pub fn single(text: impl Into<String>) -> Self {
        Self {
            text: Value::String(text.into()),
        }
    }

    pub fn batch<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            text: Value::Array(texts.into_iter().map(|t| Value::String(t.into())).collect()),
        }
    }

    /// Parses a raw request body
    ///
    /// Returns `EmbedError::MalformedRequest` if the body is empty, is not
    /// JSON, is not a JSON object, or has no `text` key.
    pub fn from_body(body: &[u8]) -> Result<Self, EmbedError> {
        let value: Value =
            serde_json::from_slice(body).map_err(|_| EmbedError::MalformedRequest)?;

        match value {
            Value::Object(mut fields) => match fields.remove("text") {
                Some(text) => Ok(Self { text }),
                None => Err(EmbedError::MalformedRequest),
            },
            _ => Err(EmbedError::MalformedRequest),
        }
    }

    /// Interprets `text` as a single string or a list of strings
    pub fn input(&self) -> anyhow::Result<EmbedInput> {
        serde_json::from_value(self.text.clone())
            .context("'text' must be a string or an array of strings")
    }
}

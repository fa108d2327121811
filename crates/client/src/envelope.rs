// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `{ meta, data }` wrapper carried by every API response.

use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub struct Envelope<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Default for Envelope<T> {
    fn default() -> Self {
        Self { meta: None, data: None }
    }
}

impl<T> Envelope<T> {
    pub fn message(&self) -> Option<&str> {
        self.meta.as_ref().and_then(|m| m.message.as_deref())
    }

    pub fn pagination(&self) -> Option<&Pagination> {
        self.meta.as_ref().and_then(|m| m.pagination.as_ref())
    }

    /// Take `data`, rejecting an envelope that has none.
    pub fn into_data(self, status: u16) -> Result<T, ApiError> {
        self.data.ok_or_else(|| ApiError::Decode {
            status,
            message: "response has no data".to_owned(),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Meta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

/// Page information returned by list endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub current_page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub total_count: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

/// Parse a 2xx body. An empty body is an empty envelope.
pub fn parse<T: DeserializeOwned>(status: u16, body: &[u8]) -> Result<Envelope<T>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Envelope::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::Decode { status, message: format!("invalid JSON response: {e}") })
}

/// Error for a non-2xx response.
///
/// A JSON (or empty) body becomes [`ApiError::Http`] carrying the envelope's
/// message. Any other body is a [`ApiError::Decode`] for that status.
pub fn failure(status: u16, body: &[u8]) -> ApiError {
    match parse::<IgnoredAny>(status, body) {
        Ok(envelope) => {
            let message = match envelope.message() {
                Some(message) if !message.is_empty() => message.to_owned(),
                _ => format!("Request failed with status {status}"),
            };
            ApiError::Http { status, message }
        }
        Err(_) => ApiError::Decode { status, message: "Invalid JSON response".to_owned() },
    }
}

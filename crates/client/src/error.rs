// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

/// Failure of a request made through the client.
///
/// `Clone` so a single in-flight refresh can hand the same outcome to every
/// caller waiting on it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// The device is known to be offline. No network attempt was made.
    #[error("no internet connection")]
    Offline,
    /// The attempt did not complete before its deadline.
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    /// Transport-level failure (DNS, connection refused, TLS, ...).
    #[error("network error: {0}")]
    Network(#[source] Arc<reqwest::Error>),
    /// Non-2xx response with a JSON (or empty) body. `message` comes from the
    /// envelope when it has one.
    #[error("{message}")]
    Http { status: u16, message: String },
    /// A body that is not the expected JSON, for any status. Never retried.
    #[error("invalid response (status {status}): {message}")]
    Decode { status: u16, message: String },
    /// A refresh token was required but none is held.
    #[error("no refresh token available")]
    Unauthenticated,
    /// The refresh exchange was answered with a non-2xx status.
    #[error("{message}")]
    RefreshRejected { status: u16, message: String },
    /// The refresh exchange succeeded without producing an access token.
    #[error("refresh did not return an access token")]
    RefreshIncomplete,
    /// The request could not be built.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Offline => "OFFLINE",
            Self::Timeout(_) => "TIMEOUT",
            Self::Network(_) => "NETWORK_ERROR",
            Self::Http { .. } => "HTTP_ERROR",
            Self::Decode { .. } => "DECODE_ERROR",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::RefreshRejected { .. } => "REFRESH_REJECTED",
            Self::RefreshIncomplete => "REFRESH_INCOMPLETE",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
        }
    }

    /// HTTP status associated with the failure, if a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. }
            | Self::Decode { status, .. }
            | Self::RefreshRejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the Retry Engine may attempt the request again.
    ///
    /// Offline and authorization failures are never retried: the first has
    /// nothing to retry against, the second belongs to the refresh cycle.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Network(_) => true,
            Self::Http { status, .. } => !is_auth_status(*status),
            _ => false,
        }
    }

    /// Whether the server rejected the access token (401), whatever the body.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, Self::Http { status: 401, .. } | Self::Decode { status: 401, .. })
    }

    /// Failures that only ever come out of a session-ending refresh. A
    /// transport failure of the refresh exchange ends the session too, but
    /// the same variants also come from ordinary requests.
    pub fn ends_session(&self) -> bool {
        matches!(self, Self::Unauthenticated | Self::RefreshRejected { .. } | Self::RefreshIncomplete)
    }
}

/// 401 and 403: statuses the Retry Engine leaves to the caller.
pub fn is_auth_status(status: u16) -> bool {
    status == 401 || status == 403
}

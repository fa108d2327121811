// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authenticated request pipeline and token lifecycle for the disker
//! marketplace API.

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod connectivity;
pub mod envelope;
pub mod error;
pub mod retry;
pub mod session;
pub mod token;
pub mod transport;

pub use client::ApiClient;
pub use config::ClientConfig;
pub use connectivity::{AlwaysOnline, Connectivity, ConnectivityFlag};
pub use envelope::{Envelope, Pagination};
pub use error::ApiError;
pub use retry::RetryPolicy;
pub use session::{AuthUser, CredentialPair, SessionState};
pub use transport::{ApiRequest, FormPart, RawResponse};

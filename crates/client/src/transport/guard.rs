// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timeout/connectivity guard around a single request attempt.

use std::sync::{Arc, Once};
use std::time::Duration;

use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::multipart::{Form, Part};
use tracing::{debug, warn};

use crate::connectivity::Connectivity;
use crate::error::ApiError;
use crate::transport::{join_url, ApiRequest, FormPart, RawResponse, RequestBody};

/// Who decides the `Authorization` header of an attempt.
#[derive(Debug, Clone, Copy)]
pub enum Authorization<'a> {
    /// Leave the caller's headers alone.
    Caller,
    /// Drop any caller-supplied `Authorization`; attach `Bearer <token>` when a
    /// token is held.
    Bearer(Option<&'a str>),
}

/// HTTP transport that enforces a per-attempt deadline and the offline check.
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
    connectivity: Arc<dyn Connectivity>,
    default_timeout: Duration,
}

impl HttpTransport {
    pub fn new(
        base_url: impl Into<String>,
        connectivity: Arc<dyn Connectivity>,
        default_timeout: Duration,
    ) -> Result<Self, ApiError> {
        ensure_crypto_provider();
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ApiError::InvalidRequest(format!("http client: {e}")))?;
        Ok(Self { http, base_url: base_url.into(), connectivity, default_timeout })
    }

    pub fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    /// Issue one attempt of `request`.
    ///
    /// Fails with `Offline` before touching the network when connectivity is
    /// known absent. Sending and reading the body share one deadline; when it
    /// elapses the exchange future is dropped, which aborts the connection.
    /// Every status is returned as a [`RawResponse`].
    pub async fn execute(
        &self,
        request: &ApiRequest,
        auth: Authorization<'_>,
    ) -> Result<RawResponse, ApiError> {
        if !self.is_online() {
            debug!(path = %request.path, "offline, skipping request");
            return Err(ApiError::Offline);
        }

        let deadline = request.timeout.unwrap_or(self.default_timeout);
        let builder = self.build(request, auth)?;
        debug!(method = %request.method, path = %request.path, "request");

        let exchange = async {
            let resp = builder.send().await?;
            let status = resp.status();
            let body = resp.bytes().await?;
            Ok::<_, reqwest::Error>(RawResponse { status, body })
        };

        match tokio::time::timeout(deadline, exchange).await {
            Ok(Ok(resp)) => {
                debug!(path = %request.path, status = resp.status.as_u16(), "response");
                Ok(resp)
            }
            Ok(Err(e)) => Err(self.classify(e, deadline, &request.path)),
            Err(_) => {
                warn!(
                    path = %request.path,
                    timeout_ms = deadline.as_millis() as u64,
                    "request timed out"
                );
                Err(ApiError::Timeout(deadline))
            }
        }
    }

    fn build(
        &self,
        request: &ApiRequest,
        auth: Authorization<'_>,
    ) -> Result<reqwest::RequestBuilder, ApiError> {
        let mut headers = request.headers.clone();
        headers.entry(ACCEPT).or_insert(HeaderValue::from_static("application/json"));
        if let Authorization::Bearer(token) = auth {
            headers.remove(AUTHORIZATION);
            if let Some(token) = token {
                let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                    ApiError::InvalidRequest("access token is not a valid header value".into())
                })?;
                headers.insert(AUTHORIZATION, value);
            }
        }

        let mut builder =
            self.http.request(request.method.clone(), self.url(&request.path)).headers(headers);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(parts) => builder.multipart(build_form(parts)?),
        };
        Ok(builder)
    }

    fn classify(&self, err: reqwest::Error, deadline: Duration, path: &str) -> ApiError {
        if err.is_timeout() {
            return ApiError::Timeout(deadline);
        }
        if !self.is_online() {
            debug!(path, "connectivity lost during request");
            return ApiError::Offline;
        }
        warn!(path, err = %err, "network error");
        ApiError::Network(Arc::new(err))
    }
}

/// Install the ring crypto provider for rustls (needed by reqwest even on
/// plain HTTP). A provider installed by the host first is kept.
pub fn ensure_crypto_provider() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Rebuild a multipart form; forms are consumed by sending.
fn build_form(parts: &[FormPart]) -> Result<Form, ApiError> {
    let mut form = Form::new();
    for part in parts {
        form = match part {
            FormPart::Text { name, value } => form.text(name.clone(), value.clone()),
            FormPart::File { name, file_name, mime, bytes } => {
                let mut file = Part::bytes(bytes.to_vec()).file_name(file_name.clone());
                if let Some(mime) = mime {
                    file = file.mime_str(mime).map_err(|e| {
                        ApiError::InvalidRequest(format!("invalid mime type {mime:?}: {e}"))
                    })?;
                }
                form.part(name.clone(), file)
            }
        };
    }
    Ok(form)
}

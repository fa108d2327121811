// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authenticated request orchestration.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::connectivity::{AlwaysOnline, Connectivity};
use crate::envelope::Envelope;
use crate::error::ApiError;
use crate::retry::RetryPolicy;
use crate::session::{
    CredentialStore, FileStorage, RefreshCoordinator, RefreshScheduler, SessionState,
    SessionStorage,
};
use crate::transport::{ApiRequest, Authorization, HttpTransport, RawResponse};

/// Handle to one session and its request pipeline. Cheap to clone; clones
/// share the credential store, the refresh timer and the in-flight refresh.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

struct Inner {
    config: ClientConfig,
    store: Arc<CredentialStore>,
    transport: Arc<HttpTransport>,
    coordinator: Arc<RefreshCoordinator>,
    public_retry: RetryPolicy,
    auth_retry: RetryPolicy,
}

impl ApiClient {
    /// Client persisting its session under the configured state directory.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let storage = Arc::new(FileStorage::new(config.session_path()));
        Self::with_parts(config, storage, Arc::new(AlwaysOnline))
    }

    pub fn with_parts(
        config: ClientConfig,
        storage: Arc<dyn SessionStorage>,
        connectivity: Arc<dyn Connectivity>,
    ) -> Result<Self, ApiError> {
        let store = Arc::new(CredentialStore::new(storage));
        let transport =
            Arc::new(HttpTransport::new(config.base_url.clone(), connectivity, config.timeout())?);
        let scheduler = Arc::new(RefreshScheduler::new());
        let coordinator = Arc::new(RefreshCoordinator::new(
            Arc::clone(&store),
            Arc::clone(&transport),
            scheduler,
            config.refresh_ahead_secs,
        ));
        Ok(Self {
            inner: Arc::new(Inner {
                public_retry: config.public_retry(),
                auth_retry: config.auth_retry(),
                config,
                store,
                transport,
                coordinator,
            }),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &CredentialStore {
        &self.inner.store
    }

    pub fn scheduler(&self) -> &RefreshScheduler {
        self.inner.coordinator.scheduler()
    }

    pub(crate) fn transport(&self) -> &HttpTransport {
        &self.inner.transport
    }

    pub(crate) fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.inner.coordinator
    }

    pub fn session(&self) -> SessionState {
        self.inner.store.snapshot()
    }

    /// Load the persisted session. The first call arms the proactive refresh
    /// when a token was restored; later calls do nothing and return `false`.
    ///
    /// Arming needs a Tokio runtime. Outside one the session still loads but
    /// no timer is armed.
    pub fn hydrate(&self) -> bool {
        if !self.inner.store.hydrate() {
            return false;
        }
        if self.inner.store.access_token().is_some() {
            self.inner.coordinator.schedule();
        }
        true
    }

    /// Clear the session and stop the refresh timer.
    pub fn logout(&self) {
        info!("logging out");
        self.inner.coordinator.end_session();
    }

    /// Refresh the access token now, joining any refresh already in flight.
    pub async fn refresh_session(&self) -> Result<String, ApiError> {
        self.inner.coordinator.refresh().await
    }

    /// Unauthenticated request under the public retry budget. Caller headers
    /// are sent as given.
    pub async fn send(&self, request: ApiRequest) -> Result<RawResponse, ApiError> {
        let transport = &self.inner.transport;
        let request = &request;
        self.inner
            .public_retry
            .run(move || async move {
                transport.execute(request, Authorization::Caller).await?.error_for_status()
            })
            .await
    }

    /// Request carrying the session's bearer token.
    ///
    /// A 401 triggers one refresh (shared with concurrent callers) and one
    /// more round of attempts with the new token. A second 401 is returned
    /// as is. Refresh failures propagate unchanged.
    pub async fn send_authenticated(&self, request: ApiRequest) -> Result<RawResponse, ApiError> {
        let (used, first) = self.authorized_round(&request).await;
        match first {
            Err(e) if e.is_auth_rejection() => {
                info!(path = %request.path, "access token rejected, refreshing");
            }
            other => return other,
        }

        self.inner.coordinator.refresh_after_rejection(used.as_deref()).await?;
        debug!(path = %request.path, "replaying request with refreshed token");
        let (_, second) = self.authorized_round(&request).await;
        second
    }

    /// Authenticated request whose 2xx body is an envelope of `T`.
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<Envelope<T>, ApiError> {
        self.send_authenticated(request).await?.envelope()
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: impl Into<String>,
    ) -> Result<Envelope<T>, ApiError> {
        self.request_json(ApiRequest::get(path)).await
    }

    /// One retry round with the token held when the round starts.
    async fn authorized_round(
        &self,
        request: &ApiRequest,
    ) -> (Option<String>, Result<RawResponse, ApiError>) {
        let token = self.inner.store.access_token();
        let bearer = token.as_deref();
        let transport = &self.inner.transport;
        let result = self
            .inner
            .auth_retry
            .run(move || async move {
                transport.execute(request, Authorization::Bearer(bearer)).await?.error_for_status()
            })
            .await;
        (token, result)
    }
}

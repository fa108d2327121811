// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Refresh-token exchange, de-duplicated across concurrent callers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::de::IgnoredAny;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::envelope;
use crate::error::ApiError;
use crate::session::{CredentialStore, RefreshScheduler, TokenGrant};
use crate::token;
use crate::transport::{ApiRequest, Authorization, HttpTransport, RawResponse};

pub const REFRESH_PATH: &str = "/api/v1/talents/sessions/refresh";

type SharedRefresh = Shared<BoxFuture<'static, Result<String, ApiError>>>;

struct Inflight {
    id: u64,
    fut: SharedRefresh,
}

#[derive(Serialize)]
struct RefreshBody<'a> {
    refresh_token: &'a str,
}

/// Exchanges the refresh token for a new pair and keeps the proactive timer
/// armed. Timer-driven and 401-driven refreshes go through the same path.
pub struct RefreshCoordinator {
    store: Arc<CredentialStore>,
    transport: Arc<HttpTransport>,
    scheduler: Arc<RefreshScheduler>,
    ahead_secs: u64,
    inflight: Mutex<Option<Inflight>>,
    next_id: AtomicU64,
}

impl RefreshCoordinator {
    pub fn new(
        store: Arc<CredentialStore>,
        transport: Arc<HttpTransport>,
        scheduler: Arc<RefreshScheduler>,
        ahead_secs: u64,
    ) -> Self {
        Self {
            store,
            transport,
            scheduler,
            ahead_secs,
            inflight: Mutex::new(None),
            next_id: AtomicU64::new(0),
        }
    }

    /// Refresh the access token, joining an exchange already in flight.
    ///
    /// Every caller waiting on the same exchange receives the same result.
    pub async fn refresh(self: &Arc<Self>) -> Result<String, ApiError> {
        let fut = {
            let mut slot = self.inflight.lock();
            match slot.as_ref() {
                Some(inflight) => {
                    info!("joining in-flight token refresh");
                    inflight.fut.clone()
                }
                None => {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let this = Arc::clone(self);
                    let fut = async move {
                        let result = this.exchange().await;
                        this.release(id);
                        result
                    }
                    .boxed()
                    .shared();
                    *slot = Some(Inflight { id, fut: fut.clone() });
                    fut
                }
            }
        };
        fut.await
    }

    /// Refresh after the server rejected `used`.
    ///
    /// When the store already holds a different access token, another caller
    /// refreshed in the meantime and that token is returned without a new
    /// exchange.
    pub async fn refresh_after_rejection(
        self: &Arc<Self>,
        used: Option<&str>,
    ) -> Result<String, ApiError> {
        if let Some(current) = self.store.access_token() {
            if used != Some(current.as_str()) {
                debug!("access token already replaced, reusing it");
                return Ok(current);
            }
        }
        self.refresh().await
    }

    /// Arm the proactive timer from the current access token's expiry.
    ///
    /// Without a decodable expiry, or inside the refresh window, no timer is
    /// armed and any previous one is cancelled.
    pub fn schedule(self: &Arc<Self>) {
        let delay = self
            .store
            .access_token()
            .as_deref()
            .and_then(token::expiry_claim)
            .and_then(|exp| token::refresh_delay(exp, self.ahead_secs, token::epoch_secs()));

        let Some(delay) = delay else {
            self.scheduler.cancel();
            debug!("no usable expiry, proactive refresh not armed");
            return;
        };

        let weak: Weak<Self> = Arc::downgrade(self);
        self.scheduler.arm(delay, async move {
            let Some(this) = weak.upgrade() else {
                return;
            };
            info!("proactive token refresh");
            if let Err(e) = this.refresh().await {
                warn!(code = e.code(), "proactive refresh failed: {e}");
            }
        });
    }

    /// Clear the session and stop the timer.
    ///
    /// A refresh still in flight is detached: later callers start a fresh
    /// exchange, and the detached one finds its session gone and stores
    /// nothing.
    pub fn end_session(&self) {
        self.scheduler.cancel();
        *self.inflight.lock() = None;
        self.store.clear();
    }

    /// End the session the exchange started under, unless it was already
    /// ended or replaced.
    fn end_session_at(&self, generation: u64) {
        if self.store.clear_at(generation) {
            self.scheduler.cancel();
        } else {
            debug!("session changed during refresh, leaving it alone");
        }
    }

    /// Drop the in-flight slot if it still holds exchange `id`.
    fn release(&self, id: u64) {
        let mut slot = self.inflight.lock();
        if slot.as_ref().is_some_and(|inflight| inflight.id == id) {
            *slot = None;
        }
    }

    pub fn scheduler(&self) -> &RefreshScheduler {
        &self.scheduler
    }

    /// One guarded exchange; no retry. Any failure ends the session the
    /// exchange started under.
    async fn exchange(self: &Arc<Self>) -> Result<String, ApiError> {
        let (generation, refresh_token) = self.store.refresh_token_at();
        let Some(refresh_token) = refresh_token else {
            warn!("no refresh token held, ending session");
            self.end_session_at(generation);
            return Err(ApiError::Unauthenticated);
        };

        info!("refreshing access token");
        match self.attempt(generation, &refresh_token).await {
            Ok(Some(access)) => {
                info!("access token refreshed");
                self.schedule();
                Ok(access)
            }
            Ok(None) => {
                debug!("session changed during refresh, discarding result");
                self.store.access_token().ok_or(ApiError::Unauthenticated)
            }
            Err(e) => {
                warn!(code = e.code(), status = e.status(), "refresh failed, ending session");
                self.end_session_at(generation);
                Err(e)
            }
        }
    }

    async fn attempt(
        &self,
        generation: u64,
        refresh_token: &str,
    ) -> Result<Option<String>, ApiError> {
        let request = ApiRequest::post(REFRESH_PATH).json(&RefreshBody { refresh_token })?;
        let resp = self.transport.execute(&request, Authorization::Caller).await?;
        apply_grant(&self.store, generation, read_grant(resp)?)
    }
}

/// Interpret the refresh response.
fn read_grant(resp: RawResponse) -> Result<TokenGrant, ApiError> {
    let status = resp.status.as_u16();
    if !resp.is_success() {
        let message = match envelope::parse::<IgnoredAny>(status, &resp.body) {
            Ok(env) => match env.message() {
                Some(m) if !m.is_empty() => m.to_owned(),
                _ => format!("Refresh failed with status {status}"),
            },
            Err(_) => "Invalid JSON response".to_owned(),
        };
        return Err(ApiError::RefreshRejected { status, message });
    }
    let envelope = resp.envelope::<TokenGrant>().map_err(|_| ApiError::RefreshIncomplete)?;
    Ok(envelope.data.unwrap_or_default())
}

/// Store the outcome of a successful refresh exchange started under
/// `generation`.
///
/// Tokens the server returned replace the held ones, absent ones are kept, and
/// an embedded user replaces the snapshot. Returns the access token to use,
/// `None` when the session was ended or replaced meanwhile (nothing is
/// stored), or `RefreshIncomplete` when the response carried no access token.
pub fn apply_grant(
    store: &CredentialStore,
    generation: u64,
    grant: TokenGrant,
) -> Result<Option<String>, ApiError> {
    let grant = grant.normalized();
    let Some(access) = grant.access_token.clone() else {
        return Err(ApiError::RefreshIncomplete);
    };
    Ok(store.merge_grant_at(generation, &grant).map(|_| access))
}

#[cfg(test)]
#[path = "refresh_tests.rs"]
mod tests;

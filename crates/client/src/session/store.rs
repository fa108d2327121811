// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential store with write-through durable storage.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::session::{AuthUser, CredentialPair, PersistedSession, SessionState, TokenGrant};

/// Durable get-all/set-all of the session.
pub trait SessionStorage: Send + Sync {
    /// `Ok(None)` when nothing has been stored yet.
    fn load(&self) -> anyhow::Result<Option<PersistedSession>>;
    fn save(&self, session: &PersistedSession) -> anyhow::Result<()>;
}

/// JSON file storage with atomic writes.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStorage for FileStorage {
    fn load(&self) -> anyhow::Result<Option<PersistedSession>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&contents)?))
    }

    /// Write to a unique tmp file, then rename over the target.
    fn save(&self, session: &PersistedSession) -> anyhow::Result<()> {
        static COUNTER: AtomicU32 = AtomicU32::new(0);

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(session)?;
        let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp_name = format!(
            "{}.{}.{}.tmp",
            self.path.file_name().unwrap_or_default().to_string_lossy(),
            std::process::id(),
            seq,
        );
        let tmp_path = self.path.with_file_name(tmp_name);
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

/// Storage that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    session: Mutex<Option<PersistedSession>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-seeded as if a previous process had saved `session`.
    pub fn with_session(session: PersistedSession) -> Self {
        Self { session: Mutex::new(Some(session)) }
    }

    pub fn stored(&self) -> Option<PersistedSession> {
        self.session.lock().clone()
    }
}

impl SessionStorage for MemoryStorage {
    fn load(&self) -> anyhow::Result<Option<PersistedSession>> {
        Ok(self.session.lock().clone())
    }

    fn save(&self, session: &PersistedSession) -> anyhow::Result<()> {
        *self.session.lock() = Some(session.clone());
        Ok(())
    }
}

/// Holder of the session shared by every request.
///
/// Each mutation runs under one write lock and is saved before the lock is
/// released, so storage always sees mutations in the order they happened.
/// Save failures are logged; the in-memory state stays authoritative.
///
/// The store also counts sessions: every [`set_tokens`](Self::set_tokens) and
/// [`clear`](Self::clear) starts a new generation. Work that began under one
/// generation (a refresh exchange) only lands if no newer session replaced it.
pub struct CredentialStore {
    state: RwLock<SessionState>,
    /// Only bumped under the `state` write lock.
    generation: AtomicU64,
    storage: Arc<dyn SessionStorage>,
}

impl CredentialStore {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            state: RwLock::new(SessionState::default()),
            generation: AtomicU64::new(0),
            storage,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// The refresh token together with the generation it belongs to.
    pub fn refresh_token_at(&self) -> (u64, Option<String>) {
        let state = self.state.read();
        (self.generation(), state.credentials.refresh_token.clone())
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.read().clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.state.read().credentials.access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.state.read().credentials.refresh_token.clone()
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.state.read().current_user.clone()
    }

    pub fn is_hydrated(&self) -> bool {
        self.state.read().is_hydrated
    }

    /// Replace both tokens, starting a new session generation.
    pub fn set_tokens(&self, credentials: CredentialPair) {
        self.mutate_session(true, |s| s.credentials = credentials);
    }

    /// Store only the tokens present in `grant`; absent ones keep their value.
    /// Returns the resulting pair.
    pub fn merge_tokens(&self, grant: &TokenGrant) -> CredentialPair {
        self.mutate(|s| {
            merge_into(s, grant);
            s.credentials.clone()
        })
    }

    pub fn set_current_user(&self, user: Option<AuthUser>) {
        self.mutate(|s| s.current_user = user);
    }

    pub fn set_last_fetched_user_at(&self, millis: Option<u64>) {
        self.mutate(|s| s.last_fetched_user_at = millis);
    }

    /// Drop tokens, user and fetch timestamp together.
    pub fn clear(&self) {
        self.mutate_session(true, clear_state);
        info!("session cleared");
    }

    /// Store a refreshed grant if `generation` is still current.
    ///
    /// Tokens present in `grant` replace the held ones and an embedded user
    /// replaces the snapshot. Returns `None`, leaving the store untouched,
    /// when the session was cleared or replaced since `generation`.
    pub fn merge_grant_at(&self, generation: u64, grant: &TokenGrant) -> Option<CredentialPair> {
        let mut state = self.state.write();
        if self.generation() != generation {
            return None;
        }
        merge_into(&mut state, grant);
        if let Some(ref user) = grant.user {
            state.current_user = Some(AuthUser::from(user.clone()));
        }
        self.save(&state);
        Some(state.credentials.clone())
    }

    /// [`clear`](Self::clear), but only while `generation` is still current.
    pub fn clear_at(&self, generation: u64) -> bool {
        let mut state = self.state.write();
        if self.generation() != generation {
            return false;
        }
        clear_state(&mut state);
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.save(&state);
        drop(state);
        info!("session cleared");
        true
    }

    /// Load durable state and mark the store hydrated.
    ///
    /// Returns `true` only for the call that flips `is_hydrated`. A session
    /// established in memory before hydration (e.g. a login that raced the
    /// load) is kept over the stored one.
    pub fn hydrate(&self) -> bool {
        let mut state = self.state.write();
        if state.is_hydrated {
            return false;
        }
        match self.storage.load() {
            Ok(Some(stored)) if state.credentials.is_empty() => {
                state.credentials = CredentialPair {
                    access_token: stored.access_token,
                    refresh_token: stored.refresh_token,
                };
                state.current_user = stored.current_user;
                state.last_fetched_user_at = stored.last_fetched_user_at;
                debug!(
                    authenticated = state.is_authenticated(),
                    "session restored from storage"
                );
            }
            Ok(_) => {}
            Err(e) => warn!("failed to load persisted session: {e:#}"),
        }
        state.is_hydrated = true;
        true
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        self.mutate_session(false, f)
    }

    fn mutate_session<R>(&self, new_session: bool, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut state = self.state.write();
        let out = f(&mut state);
        if new_session {
            self.generation.fetch_add(1, Ordering::AcqRel);
        }
        self.save(&state);
        out
    }

    fn save(&self, state: &SessionState) {
        if let Err(e) = self.storage.save(&state.persisted()) {
            warn!("failed to persist session: {e:#}");
        }
    }
}

fn merge_into(state: &mut SessionState, grant: &TokenGrant) {
    if let Some(ref access) = grant.access_token {
        state.credentials.access_token = Some(access.clone());
    }
    if let Some(ref refresh) = grant.refresh_token {
        state.credentials.refresh_token = Some(refresh.clone());
    }
}

fn clear_state(state: &mut SessionState) {
    state.credentials = CredentialPair::default();
    state.current_user = None;
    state.last_fetched_user_at = None;
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;

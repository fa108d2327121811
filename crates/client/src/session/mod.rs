// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session state: credential pair, user snapshot, and their lifecycle.

pub mod refresh;
pub mod scheduler;
pub mod store;

use serde::{Deserialize, Serialize};

pub use refresh::{apply_grant, RefreshCoordinator};
pub use scheduler::RefreshScheduler;
pub use store::{CredentialStore, FileStorage, MemoryStorage, SessionStorage};

/// Access and refresh token held together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl CredentialPair {
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

/// User object as embedded in login, refresh and profile responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPayload {
    pub id: u64,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Authenticated user snapshot kept with the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: u64,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl From<UserPayload> for AuthUser {
    fn from(user: UserPayload) -> Self {
        let first = user.first_name.as_deref().unwrap_or_default().trim();
        let last = user.last_name.as_deref().unwrap_or_default().trim();
        let full = format!("{first} {last}");
        let name = non_empty(Some(full.trim().to_owned())).or_else(|| non_empty(user.name));
        Self {
            id: user.id,
            email: user.email,
            name,
            first_name: non_empty(user.first_name),
            last_name: non_empty(user.last_name),
            role: non_empty(user.role),
        }
    }
}

/// Tokens and user returned by a token exchange (login, refresh, confirmation).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenGrant {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user: Option<UserPayload>,
}

impl TokenGrant {
    /// Drop empty strings so they never overwrite a held token.
    pub fn normalized(self) -> Self {
        Self {
            access_token: non_empty(self.access_token),
            refresh_token: non_empty(self.refresh_token),
            user: self.user,
        }
    }
}

/// In-memory session. `is_hydrated` is never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub credentials: CredentialPair,
    pub current_user: Option<AuthUser>,
    /// Milliseconds since the epoch of the last profile re-fetch.
    pub last_fetched_user_at: Option<u64>,
    pub is_hydrated: bool,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.credentials.access_token.is_some()
    }

    fn persisted(&self) -> PersistedSession {
        PersistedSession {
            access_token: self.credentials.access_token.clone(),
            refresh_token: self.credentials.refresh_token.clone(),
            current_user: self.current_user.clone(),
            last_fetched_user_at: self.last_fetched_user_at,
        }
    }
}

/// On-disk shape of the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_user: Option<AuthUser>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_fetched_user_at: Option<u64>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

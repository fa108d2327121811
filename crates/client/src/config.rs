// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Production API host used when no base URL is configured.
pub const DEFAULT_BASE_URL: &str = "https://staging.supra.social";

/// Fixed identifier the session is persisted under.
pub const STORAGE_KEY: &str = "disker-auth-storage";

/// Configuration for the API client.
#[derive(Debug, Clone, clap::Args)]
pub struct ClientConfig {
    /// Base URL of the marketplace API.
    #[arg(long, default_value = DEFAULT_BASE_URL, env = "DISKER_BASE_URL")]
    pub base_url: String,

    /// Per-attempt request timeout in milliseconds.
    #[arg(long, default_value_t = 15_000, env = "DISKER_TIMEOUT_MS")]
    pub timeout_ms: u64,

    /// Seconds before access-token expiry to refresh proactively.
    #[arg(long, default_value_t = 60, env = "DISKER_REFRESH_AHEAD_SECS")]
    pub refresh_ahead_secs: u64,

    /// Retry budget for unauthenticated requests.
    #[arg(long, default_value_t = 3, env = "DISKER_MAX_RETRIES")]
    pub max_retries: u32,

    /// Retry budget for authenticated requests (each tier, before and after refresh).
    #[arg(long, default_value_t = 2, env = "DISKER_AUTH_MAX_RETRIES")]
    pub auth_max_retries: u32,

    /// First retry backoff in milliseconds; doubles per attempt.
    #[arg(long, default_value_t = 1000, env = "DISKER_RETRY_BASE_MS")]
    pub retry_base_ms: u64,

    /// Upper bound on a single retry backoff in milliseconds.
    #[arg(long, default_value_t = 4000, env = "DISKER_RETRY_CAP_MS")]
    pub retry_cap_ms: u64,

    /// Directory holding the persisted session.
    #[arg(long, env = "DISKER_STATE_DIR")]
    pub state_dir: Option<PathBuf>,
}

impl ClientConfig {
    /// Defaults for library users that do not parse a command line.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_ms: 15_000,
            refresh_ahead_secs: 60,
            max_retries: 3,
            auth_max_retries: 2,
            retry_base_ms: 1000,
            retry_cap_ms: 4000,
            state_dir: None,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn public_retry(&self) -> RetryPolicy {
        self.retry_policy(self.max_retries)
    }

    pub fn auth_retry(&self) -> RetryPolicy {
        self.retry_policy(self.auth_max_retries)
    }

    fn retry_policy(&self, max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base: Duration::from_millis(self.retry_base_ms),
            cap: Duration::from_millis(self.retry_cap_ms),
        }
    }

    /// Resolve the state directory.
    ///
    /// Checks `--state-dir` / `DISKER_STATE_DIR`, then `$XDG_STATE_HOME/disker`,
    /// then `$HOME/.local/state/disker`.
    pub fn state_dir(&self) -> PathBuf {
        if let Some(ref dir) = self.state_dir {
            return dir.clone();
        }
        if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
            return PathBuf::from(xdg).join("disker");
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(".local/state/disker");
        }
        PathBuf::from(".disker")
    }

    pub fn session_path(&self) -> PathBuf {
        self.state_dir().join(format!("{STORAGE_KEY}.json"))
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Access-token expiry claims and proactive refresh timing.
//!
//! Decoding never fails loudly: a token without a readable `exp` simply has no
//! proactive refresh, and the reactive 401 path covers it.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

/// Read the `exp` claim (epoch seconds) from a signed token's payload segment.
pub fn expiry_claim(token: &str) -> Option<u64> {
    let mut segments = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) =
        (segments.next(), segments.next(), segments.next(), segments.next())
    else {
        return None;
    };

    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    let exp = claims.get("exp")?;
    if let Some(secs) = exp.as_u64() {
        return Some(secs);
    }
    // Fractional expiries are truncated; negative ones are meaningless.
    exp.as_f64().filter(|secs| secs.is_finite() && *secs >= 0.0).map(|secs| secs as u64)
}

/// Delay until the proactive refresh: `max(0, exp - ahead - now)` seconds.
///
/// `None` when the token is already inside the refresh window, so callers do
/// not arm a timer that would fire immediately and loop.
pub fn refresh_delay(exp: u64, ahead_secs: u64, now_secs: u64) -> Option<Duration> {
    let secs = exp.saturating_sub(ahead_secs).saturating_sub(now_secs);
    if secs == 0 {
        None
    } else {
        Some(Duration::from_secs(secs))
    }
}

pub fn epoch_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

pub fn epoch_millis() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

#[cfg(test)]
#[path = "token_tests.rs"]
mod tests;

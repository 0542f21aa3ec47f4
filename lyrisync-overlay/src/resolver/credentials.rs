//! Cached bearer tokens with expiry
//!
//! Token values are never logged.

use super::ProviderError;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Tokens this close to expiry are refreshed before use
const EXPIRY_MARGIN: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    /// A lifetime too large to represent counts as already expired
    pub fn new(value: impl Into<String>, expires_in: Duration) -> Self {
        let now = Instant::now();
        Self {
            value: value.into(),
            expires_at: now.checked_add(expires_in).unwrap_or(now),
        }
    }

    /// Token with an absolute expiry given in Unix milliseconds
    pub fn expiring_at_unix_ms(value: impl Into<String>, expires_at_ms: i64) -> Self {
        let remaining_ms = expires_at_ms - chrono::Utc::now().timestamp_millis();
        let expires_in = Duration::from_millis(u64::try_from(remaining_ms).unwrap_or(0));
        Self::new(value, expires_in)
    }

    fn is_fresh(&self) -> bool {
        Instant::now()
            .checked_add(EXPIRY_MARGIN)
            .is_some_and(|deadline| deadline < self.expires_at)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Holds one token and refreshes it when stale or invalidated
pub struct TokenCache {
    name: &'static str,
    token: Mutex<Option<AccessToken>>,
}

impl TokenCache {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            token: Mutex::new(None),
        }
    }

    /// Current token value, calling `refresh` first if there is no fresh one
    ///
    /// Concurrent callers wait for a single refresh.
    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Result<String, ProviderError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AccessToken, ProviderError>>,
    {
        let mut slot = self.token.lock().await;
        if let Some(token) = slot.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.value.clone());
        }

        debug!("Refreshing {} token", self.name);
        let token = refresh().await.map_err(|e| match e {
            ProviderError::Credential(msg) => ProviderError::Credential(msg),
            other => ProviderError::Credential(other.to_string()),
        })?;
        let value = token.value.clone();
        *slot = Some(token);
        Ok(value)
    }

    /// Drop the current token so the next use refreshes it
    pub async fn invalidate(&self) {
        debug!("Invalidating {} token", self.name);
        *self.token.lock().await = None;
    }
}

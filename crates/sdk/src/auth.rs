//! Access-token retrieval and the background refresh loop.

use std::{
    sync::{Arc, RwLock},
    time::{Duration, SystemTime},
};

use {
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    tokio::task::JoinHandle,
    tracing::{debug, info, warn},
};

use crate::{
    error::{Operation, Result},
    transport::{ApiStatus, Envelope, Transport},
};

/// Margin subtracted from the provider's `expires_in` before refreshing.
const EXPIRY_SKEW: Duration = Duration::from_secs(300);

/// Floor for the computed refresh delay.
const MIN_REFRESH_DELAY: Duration = Duration::from_secs(60);

/// Upper bound on a provider-reported token lifetime.
const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

/// Response of `GET /cgi-bin/token`.
#[derive(Debug, Deserialize)]
pub struct AccessTokenResponse {
    #[serde(default = "empty_secret")]
    pub access_token: Secret<String>,
    /// Lifetime in seconds.
    #[serde(default)]
    pub expires_in: u64,
    #[serde(flatten)]
    pub status: ApiStatus,
}

impl Envelope for AccessTokenResponse {
    fn status(&self) -> &ApiStatus {
        &self.status
    }
}

fn empty_secret() -> Secret<String> {
    Secret::new(String::new())
}

/// A bearer token and the instant the provider said it stops working.
#[derive(Clone)]
pub struct Credential {
    pub token: Secret<String>,
    pub valid_until: SystemTime,
}

impl Credential {
    /// Stamp `resp` with its expiry; lifetimes above a day are capped.
    pub fn from_response(resp: AccessTokenResponse, now: SystemTime) -> Self {
        let lifetime = Duration::from_secs(resp.expires_in).min(MAX_TOKEN_LIFETIME);
        Self {
            token: resp.access_token,
            valid_until: now.checked_add(lifetime).unwrap_or(now),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.valid_until <= SystemTime::now()
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"[REDACTED]")
            .field("valid_until", &self.valid_until)
            .finish()
    }
}

/// Fetch a fresh access token with the app credentials.
pub async fn fetch_access_token(
    transport: &Transport,
    app_id: &str,
    app_secret: &str,
) -> Result<AccessTokenResponse> {
    transport
        .get_json(Operation::GetAccessToken, "/cgi-bin/token", &[
            ("grant_type", "client_credential"),
            ("appid", app_id),
            ("secret", app_secret),
        ])
        .await
}

/// One refresh attempt, producing a [`Credential`] stamped with the current time.
pub async fn refresh_once(
    transport: &Transport,
    app_id: &str,
    app_secret: &str,
) -> Result<Credential> {
    let resp = fetch_access_token(transport, app_id, app_secret).await?;
    Ok(Credential::from_response(resp, SystemTime::now()))
}

/// Holds the latest known access token.
///
/// Written only by the refresh loop (or an explicit refresh); read by every
/// remote call.
#[derive(Debug, Default)]
pub struct CredentialStore {
    current: RwLock<Option<Credential>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest token, possibly stale; empty before the first refresh.
    pub fn current_token(&self) -> Secret<String> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        guard
            .as_ref()
            .map(|c| c.token.clone())
            .unwrap_or_else(empty_secret)
    }

    pub fn credential(&self) -> Option<Credential> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn store(&self, credential: Credential) {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(credential);
    }
}

/// Wait before the next refresh: the provider's lifetime minus a skew,
/// capped at `max_interval`.
pub fn next_refresh_delay(expires_in: Duration, max_interval: Duration) -> Duration {
    expires_in
        .saturating_sub(EXPIRY_SKEW)
        .clamp(MIN_REFRESH_DELAY, max_interval.max(MIN_REFRESH_DELAY))
}

/// Refresh immediately, then keep refreshing until the returned task is aborted.
///
/// Failures are logged and the previous token is kept.
pub fn spawn_refresh_loop(
    store: Arc<CredentialStore>,
    transport: Transport,
    app_id: String,
    app_secret: Secret<String>,
    max_interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let delay =
                match fetch_access_token(&transport, &app_id, app_secret.expose_secret()).await {
                    Ok(resp) => {
                        let lifetime = Duration::from_secs(resp.expires_in);
                        store.store(Credential::from_response(resp, SystemTime::now()));
                        let delay = next_refresh_delay(lifetime, max_interval);
                        info!(
                            app_id,
                            expires_in = lifetime.as_secs(),
                            next_refresh_secs = delay.as_secs(),
                            "access token refreshed"
                        );
                        delay
                    },
                    Err(e) => {
                        warn!(app_id, error = %e, "access token refresh failed, keeping previous token");
                        max_interval
                    },
                };
            tokio::time::sleep(delay).await;
            debug!(app_id, "access token refresh due");
        }
    })
}

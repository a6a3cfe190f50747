use std::time::Duration;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

use crate::transport::DEFAULT_API_BASE;

/// Upper bound on the wait between two access-token refreshes.
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 3600;

/// Credentials and endpoints for a single Official Account.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WechatConfig {
    /// Application ID (`appid`).
    pub app_id: String,

    /// Application secret (`secret`).
    #[serde(serialize_with = "serialize_secret")]
    pub app_secret: Secret<String>,

    /// Token configured in the platform console for webhook signatures.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_option_secret"
    )]
    pub webhook_token: Option<Secret<String>>,

    /// API host, overridable for stub servers and regional gateways.
    pub api_base: String,

    /// Maximum seconds between token refreshes.
    pub refresh_interval_secs: u64,
}

impl WechatConfig {
    pub fn new(app_id: impl Into<String>, app_secret: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            app_secret: Secret::new(app_secret.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_webhook_token(mut self, token: impl Into<String>) -> Self {
        self.webhook_token = Some(Secret::new(token.into()));
        self
    }

    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }
}

impl std::fmt::Debug for WechatConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WechatConfig")
            .field("app_id", &self.app_id)
            .field("app_secret", &"[REDACTED]")
            .field(
                "webhook_token",
                &self.webhook_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("api_base", &self.api_base)
            .field("refresh_interval_secs", &self.refresh_interval_secs)
            .finish()
    }
}

impl Default for WechatConfig {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            app_secret: Secret::new(String::new()),
            webhook_token: None,
            api_base: DEFAULT_API_BASE.into(),
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
        }
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}

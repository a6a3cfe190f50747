//! Config file schema: account credentials plus the webhook listener.

use serde::{Deserialize, Serialize};

pub use wxmp_sdk::WechatConfig;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WxmpConfig {
    pub wechat: WechatConfig,
    pub server: ServerConfig,
}

/// Webhook listener used by `wxmp serve`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to. Defaults to "0.0.0.0" so the platform can reach it.
    pub bind: String,
    pub port: u16,
    /// Callback path configured in the platform console.
    pub path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 8080,
            path: "/wechat".into(),
        }
    }
}

impl ServerConfig {
    /// `bind:port` for the listener.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, secrecy::ExposeSecret};

    #[test]
    fn empty_toml_uses_defaults() {
        let cfg: WxmpConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.server, ServerConfig::default());
        assert_eq!(cfg.server.addr(), "0.0.0.0:8080");
        assert_eq!(cfg.wechat.api_base, "https://api.weixin.qq.com");
        assert!(cfg.wechat.webhook_token.is_none());
    }

    #[test]
    fn full_toml() {
        let cfg: WxmpConfig = toml::from_str(
            r#"
[wechat]
app_id = "wx123"
app_secret = "s3cret"
webhook_token = "hook"
refresh_interval_secs = 1800

[server]
bind = "127.0.0.1"
port = 9000
path = "/cb"
"#,
        )
        .unwrap();
        assert_eq!(cfg.wechat.app_id, "wx123");
        assert_eq!(cfg.wechat.app_secret.expose_secret(), "s3cret");
        assert_eq!(
            cfg.wechat.webhook_token.as_ref().map(|t| t.expose_secret().as_str()),
            Some("hook")
        );
        assert_eq!(cfg.wechat.refresh_interval_secs, 1800);
        assert_eq!(cfg.server.addr(), "127.0.0.1:9000");
        assert_eq!(cfg.server.path, "/cb");
    }

    #[test]
    fn debug_redacts_secrets() {
        let cfg = WxmpConfig {
            wechat: WechatConfig::new("wx1", "topsecret").with_webhook_token("hooktoken"),
            ..WxmpConfig::default()
        };
        let debug = format!("{cfg:?}");
        assert!(!debug.contains("topsecret"));
        assert!(!debug.contains("hooktoken"));
        assert!(debug.contains("wx1"));
    }
}

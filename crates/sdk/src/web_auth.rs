//! Web page OAuth: build the authorize URL and exchange the returned code.
//!
//! The web access token obtained here is per-user and unrelated to the
//! account's access token kept by the credential store.

use {secrecy::Secret, serde::Deserialize};

use crate::{
    error::{Operation, Result},
    transport::{ApiStatus, Envelope, Transport},
};

/// Host serving the user-facing authorize page.
pub const OPEN_BASE: &str = "https://open.weixin.qq.com";

/// Scope requested on the authorize page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthScope {
    /// Silent, yields only the OpenID.
    Base,
    /// Prompts the user and allows profile access.
    UserInfo,
}

impl OAuthScope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Base => "snsapi_base",
            Self::UserInfo => "snsapi_userinfo",
        }
    }
}

/// Response of `/sns/oauth2/access_token`.
#[derive(Debug, Deserialize)]
pub struct WebAuthToken {
    #[serde(default = "empty_secret")]
    pub access_token: Secret<String>,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default = "empty_secret")]
    pub refresh_token: Secret<String>,
    #[serde(default)]
    pub openid: String,
    /// Comma separated granted scopes.
    #[serde(default)]
    pub scope: String,
    /// 1 for snapshot-page virtual accounts.
    #[serde(default)]
    pub is_snapshotuser: Option<u8>,
    /// Only returned for `snsapi_userinfo`.
    #[serde(default)]
    pub unionid: Option<String>,
    #[serde(flatten)]
    pub status: ApiStatus,
}

impl Envelope for WebAuthToken {
    fn status(&self) -> &ApiStatus {
        &self.status
    }
}

fn empty_secret() -> Secret<String> {
    Secret::new(String::new())
}

/// URL to send the user to; the platform redirects back with `code` and `state`.
pub fn authorize_url(app_id: &str, redirect_uri: &str, scope: OAuthScope, state: &str) -> String {
    format!(
        "{OPEN_BASE}/connect/oauth2/authorize?appid={}&redirect_uri={}&response_type=code&scope={}&state={}#wechat_redirect",
        urlencoding::encode(app_id),
        urlencoding::encode(redirect_uri),
        scope.as_str(),
        urlencoding::encode(state),
    )
}

/// Exchange an authorization `code` for a web access token.
pub async fn exchange_code(
    transport: &Transport,
    app_id: &str,
    app_secret: &str,
    code: &str,
) -> Result<WebAuthToken> {
    transport
        .get_json(Operation::WebAuthAccessToken, "/sns/oauth2/access_token", &[
            ("appid", app_id),
            ("secret", app_secret),
            ("code", code),
            ("grant_type", "authorization_code"),
        ])
        .await
}

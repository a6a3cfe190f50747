//! The [`Client`] facade: credentials, transport and dispatch behind one handle.

use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use {
    secrecy::{ExposeSecret, Secret},
    tokio::task::JoinHandle,
    tracing::{debug, info, warn},
};

use crate::{
    auth::{self, AccessTokenResponse, CredentialStore},
    config::WechatConfig,
    custom::{self, MiniProgramCard},
    dispatch::{Dispatcher, MessageHandler, ReplySink},
    error::{Error, Result},
    media::{self, MaterialKind, MaterialUpload},
    menu::{self, Menu},
    message::{self, InboundMessage, MessageKind, Parsed},
    reply, signature,
    template::{self, TemplateMessage},
    transport::Transport,
    user::{self, UserInfo, UserList},
    web_auth::{self, OAuthScope, WebAuthToken},
};

/// Aborts the refresh loop once the last client clone is gone.
struct RefreshTask(JoinHandle<()>);

impl Drop for RefreshTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

struct ClientInner {
    config: WechatConfig,
    transport: Transport,
    credentials: Arc<CredentialStore>,
    dispatcher: Dispatcher,
    refresher: Mutex<Option<RefreshTask>>,
}

/// Handle to one Official Account. Cheap to clone.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

/// Builder for [`Client`].
pub struct ClientBuilder {
    config: WechatConfig,
    http: Option<reqwest::Client>,
    auto_refresh: bool,
}

impl ClientBuilder {
    /// Use a preconfigured HTTP client (proxies, timeouts, TLS).
    #[must_use]
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Whether to start the background token refresh loop (default `true`).
    #[must_use]
    pub fn auto_refresh(mut self, enabled: bool) -> Self {
        self.auto_refresh = enabled;
        self
    }

    /// Build the client; with auto refresh this must run inside a tokio runtime.
    pub fn build(self) -> Result<Client> {
        if self.config.app_id.is_empty() {
            return Err(Error::invalid_input("app_id is required"));
        }
        if self.config.app_secret.expose_secret().is_empty() {
            return Err(Error::invalid_input("app_secret is required"));
        }

        let transport = Transport::with_client(
            self.http.unwrap_or_default(),
            self.config.api_base.clone(),
        );
        let client = Client {
            inner: Arc::new(ClientInner {
                transport,
                credentials: Arc::new(CredentialStore::new()),
                dispatcher: Dispatcher::new(),
                refresher: Mutex::new(None),
                config: self.config,
            }),
        };
        if self.auto_refresh {
            client.start_refresh()?;
        }
        Ok(client)
    }
}

impl Client {
    pub fn builder(config: WechatConfig) -> ClientBuilder {
        ClientBuilder {
            config,
            http: None,
            auto_refresh: true,
        }
    }

    /// Build a client and start refreshing its access token.
    pub fn new(config: WechatConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    /// Start the refresh loop if it is not already running.
    pub fn start_refresh(&self) -> Result<()> {
        let mut refresher = self
            .inner
            .refresher
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if refresher.is_some() {
            return Ok(());
        }
        tokio::runtime::Handle::try_current()
            .map_err(|e| Error::external("token refresh needs a tokio runtime", e))?;

        let config = &self.inner.config;
        info!(app_id = %config.app_id, "starting access token refresh loop");
        *refresher = Some(RefreshTask(auth::spawn_refresh_loop(
            Arc::clone(&self.inner.credentials),
            self.inner.transport.clone(),
            config.app_id.clone(),
            config.app_secret.clone(),
            config.refresh_interval(),
        )));
        Ok(())
    }

    pub fn config(&self) -> &WechatConfig {
        &self.inner.config
    }

    pub fn transport(&self) -> &Transport {
        &self.inner.transport
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.inner.credentials
    }

    /// Latest known access token; empty before the first refresh.
    pub fn current_token(&self) -> Secret<String> {
        self.inner.credentials.current_token()
    }

    fn app_secret(&self) -> &str {
        self.inner.config.app_secret.expose_secret()
    }

    // ── Credentials ─────────────────────────────────────────────────────────

    /// Fetch a new access token without storing it.
    pub async fn get_access_token(&self) -> Result<AccessTokenResponse> {
        auth::fetch_access_token(
            &self.inner.transport,
            &self.inner.config.app_id,
            self.app_secret(),
        )
        .await
    }

    /// Fetch a new access token and make it current.
    pub async fn refresh_token(&self) -> Result<()> {
        let credential = auth::refresh_once(
            &self.inner.transport,
            &self.inner.config.app_id,
            self.app_secret(),
        )
        .await?;
        self.inner.credentials.store(credential);
        Ok(())
    }

    // ── Inbound ─────────────────────────────────────────────────────────────

    /// Register `handler` for `kind`, replacing any previous one.
    pub fn register(&self, kind: MessageKind, handler: impl MessageHandler + 'static) {
        self.inner.dispatcher.register(kind, handler);
    }

    /// Register a synchronous closure for `kind`.
    pub fn register_fn<F>(&self, kind: MessageKind, f: F)
    where
        F: Fn(&InboundMessage, &mut ReplySink) + Send + Sync + 'static,
    {
        self.inner.dispatcher.register_fn(kind, f);
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    /// Check a webhook signature against the configured token.
    pub fn verify_signature(&self, timestamp: &str, nonce: &str, signature: &str) -> bool {
        let Some(token) = self.inner.config.webhook_token.as_ref() else {
            warn!("webhook_token not configured, rejecting callback");
            return false;
        };
        signature::verify_signature(token.expose_secret(), timestamp, nonce, signature)
    }

    /// Parse and dispatch an inbound body, returning what the handler wrote.
    ///
    /// Unroutable kinds and kinds without a handler yield `Ok(None)`. A body
    /// that does not parse is logged and returned as the error.
    pub async fn handle_inbound(&self, body: &[u8]) -> Result<Option<String>> {
        let message = match message::parse(body) {
            Ok(Parsed::Message(message)) => message,
            Ok(Parsed::Unroutable { msg_type }) => {
                debug!(msg_type, "ignoring unroutable inbound message");
                return Ok(None);
            },
            Err(e) => {
                warn!(error = %e, "failed to parse inbound message");
                return Err(e);
            },
        };
        let mut sink = ReplySink::new();
        self.inner.dispatcher.dispatch(&message, &mut sink).await;
        Ok(sink.into_body())
    }

    /// Passive text reply to `to_user` from `from_user`.
    pub fn text_reply(&self, to_user: &str, from_user: &str, content: &str) -> String {
        reply::text_reply(to_user, from_user, content)
    }

    // ── Messaging ───────────────────────────────────────────────────────────

    pub async fn send_text(&self, to_user: &str, content: &str) -> Result<()> {
        let token = self.current_token();
        custom::send_text(&self.inner.transport, token.expose_secret(), to_user, content).await
    }

    pub async fn send_mini_program_card(&self, to_user: &str, card: &MiniProgramCard) -> Result<()> {
        let token = self.current_token();
        custom::send_mini_program_card(&self.inner.transport, token.expose_secret(), to_user, card)
            .await
    }

    pub async fn send_template(&self, message: &TemplateMessage) -> Result<Option<i64>> {
        let token = self.current_token();
        template::send_template(&self.inner.transport, token.expose_secret(), message).await
    }

    // ── Users ───────────────────────────────────────────────────────────────

    pub async fn list_users(&self, next_openid: Option<&str>) -> Result<UserList> {
        let token = self.current_token();
        user::list_users(&self.inner.transport, token.expose_secret(), next_openid).await
    }

    pub async fn list_all_users(&self) -> Result<Vec<String>> {
        let token = self.current_token();
        user::list_all_users(&self.inner.transport, token.expose_secret()).await
    }

    pub async fn get_user_info(&self, openid: &str) -> Result<UserInfo> {
        let token = self.current_token();
        user::get_user_info(
            &self.inner.transport,
            token.expose_secret(),
            openid,
            user::DEFAULT_LANG,
        )
        .await
    }

    // ── Web OAuth ───────────────────────────────────────────────────────────

    pub fn authorize_url(&self, redirect_uri: &str, scope: OAuthScope, state: &str) -> String {
        web_auth::authorize_url(&self.inner.config.app_id, redirect_uri, scope, state)
    }

    pub async fn exchange_oauth_code(&self, code: &str) -> Result<WebAuthToken> {
        web_auth::exchange_code(
            &self.inner.transport,
            &self.inner.config.app_id,
            self.app_secret(),
            code,
        )
        .await
    }

    // ── Media ───────────────────────────────────────────────────────────────

    pub async fn download_media(&self, media_id: &str, path: &Path) -> Result<()> {
        let token = self.current_token();
        media::download_media_to(&self.inner.transport, token.expose_secret(), media_id, path)
            .await
    }

    pub async fn download_media_base64(&self, media_id: &str) -> Result<String> {
        let token = self.current_token();
        media::download_media_base64(&self.inner.transport, token.expose_secret(), media_id).await
    }

    pub async fn add_material(&self, kind: MaterialKind, file_url: &str) -> Result<MaterialUpload> {
        let token = self.current_token();
        media::add_material(&self.inner.transport, token.expose_secret(), kind, file_url).await
    }

    // ── Menu ────────────────────────────────────────────────────────────────

    pub async fn create_menu(&self, menu: &Menu) -> Result<()> {
        let token = self.current_token();
        menu::create_menu(&self.inner.transport, token.expose_secret(), menu).await
    }

    pub async fn delete_menu(&self) -> Result<()> {
        let token = self.current_token();
        menu::delete_menu(&self.inner.transport, token.expose_secret()).await
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.inner.config)
            .field("dispatcher", &self.inner.dispatcher)
            .finish()
    }
}

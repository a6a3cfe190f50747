//! WeChat Official Account SDK.
//!
//! Wraps the platform's HTTP API (access tokens, customer-service and
//! template messages, user management, web OAuth, media, menus) and the
//! passive-message webhook: inbound XML is parsed into an [`InboundMessage`]
//! and routed to the handler registered for its [`MessageKind`].
//!
//! The [`Client`] facade owns a [`CredentialStore`] that a background task
//! keeps filled with a fresh access token. Every remote operation is also
//! available as a free function taking an explicit token and a
//! [`Transport`], for callers that manage tokens themselves.

pub mod auth;
pub mod client;
pub mod config;
pub mod custom;
pub mod dispatch;
pub mod error;
pub mod media;
pub mod menu;
pub mod message;
pub mod reply;
pub mod signature;
pub mod template;
pub mod transport;
pub mod user;
pub mod web_auth;

pub use {
    auth::{AccessTokenResponse, Credential, CredentialStore},
    client::{Client, ClientBuilder},
    config::WechatConfig,
    custom::MiniProgramCard,
    dispatch::{Dispatcher, MessageHandler, ReplySink},
    error::{Error, Operation, Result},
    media::{MaterialKind, MaterialUpload},
    menu::{Menu, MenuButton},
    message::{InboundMessage, MessageKind, Parsed},
    template::TemplateMessage,
    transport::{ApiStatus, Envelope, Transport},
    user::{UserInfo, UserList},
    web_auth::{OAuthScope, WebAuthToken},
};

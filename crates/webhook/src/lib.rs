//! HTTP listener for the Official Account callback URL.
//!
//! `GET` is the platform's URL verification: a valid signature echoes
//! `echostr`. `POST` carries an inbound message; the body is handed to
//! [`Client::handle_inbound`] and whatever the handler wrote is returned, or
//! the literal `success` when it wrote nothing. A body that fails to parse
//! gets an empty 200, which the platform treats as no reply.

use {
    axum::{
        Router,
        body::Bytes,
        extract::{Query, State},
        http::{StatusCode, header},
        response::{IntoResponse, Response},
        routing::get,
    },
    serde::Deserialize,
    tokio::net::TcpListener,
    tracing::{debug, info, warn},
};

use wxmp_sdk::{Client, reply::SUCCESS};

/// Query parameters the platform appends to every callback.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SignatureQuery {
    pub signature: String,
    pub timestamp: String,
    pub nonce: String,
    /// Only present on `GET` verification.
    pub echostr: Option<String>,
    pub openid: Option<String>,
}

impl SignatureQuery {
    fn verified(&self, client: &Client) -> bool {
        client.verify_signature(&self.timestamp, &self.nonce, &self.signature)
    }
}

/// Route path for `path`, with the leading `/` axum requires.
fn route_path(path: &str) -> String {
    let path = path.trim();
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

/// Router serving the callback at `path`; a missing leading `/` is added.
pub fn router(client: Client, path: &str) -> Router {
    Router::new()
        .route(&route_path(path), get(verify_url).post(receive_message))
        .with_state(client)
}

/// Serve [`router`] on `listener` until the process is interrupted.
pub async fn serve(listener: TcpListener, client: Client, path: &str) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, path, "webhook listening");
    }
    axum::serve(listener, router(client, path))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down webhook listener");
        })
        .await
}

async fn verify_url(State(client): State<Client>, Query(query): Query<SignatureQuery>) -> Response {
    if !query.verified(&client) {
        warn!(timestamp = %query.timestamp, "URL verification with bad signature");
        return StatusCode::FORBIDDEN.into_response();
    }
    debug!("URL verification accepted");
    query.echostr.unwrap_or_default().into_response()
}

async fn receive_message(
    State(client): State<Client>,
    Query(query): Query<SignatureQuery>,
    body: Bytes,
) -> Response {
    if !query.verified(&client) {
        warn!(
            timestamp = %query.timestamp,
            openid = query.openid.as_deref().unwrap_or_default(),
            "rejecting callback with bad signature"
        );
        return StatusCode::FORBIDDEN.into_response();
    }

    let reply = match client.handle_inbound(&body).await {
        Ok(reply) => reply.unwrap_or_else(|| SUCCESS.to_string()),
        Err(_) => return StatusCode::OK.into_response(),
    };
    let content_type = if reply.trim_start().starts_with("<xml") {
        "application/xml; charset=utf-8"
    } else {
        "text/plain; charset=utf-8"
    };
    ([(header::CONTENT_TYPE, content_type)], reply).into_response()
}

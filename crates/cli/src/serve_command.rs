use {
    anyhow::{Context, Result, bail},
    tokio::net::TcpListener,
    tracing::{info, warn},
    wxmp_config::{Severity, WxmpConfig, validate_config},
    wxmp_sdk::{Client, InboundMessage, MessageKind},
};

/// Passive reply for an inbound text message.
fn echo_reply(message: &InboundMessage) -> String {
    format!("You said: {}", message.content)
}

/// Built-in handlers for the demo listener: echo text back, acknowledge the rest.
pub(crate) fn register_default_handlers(client: &Client) {
    client.register_fn(MessageKind::Text, |message, reply| {
        info!(from = %message.from_user, "text message");
        reply.text(message, &echo_reply(message));
    });
    client.register_fn(MessageKind::Voice, |message, reply| {
        info!(
            from = %message.from_user,
            media_id = message.media_id.as_deref().unwrap_or_default(),
            recognition = %message.content,
            "voice message"
        );
        reply.success();
    });
    client.register_fn(MessageKind::Event, |message, reply| {
        info!(
            from = %message.from_user,
            event = message.event.as_deref().unwrap_or_default(),
            key = message.event_key.as_deref().unwrap_or_default(),
            "event"
        );
        reply.success();
    });
}

pub async fn serve(config: WxmpConfig) -> Result<()> {
    let validation = validate_config(&config);
    for d in &validation.diagnostics {
        if d.severity == Severity::Warning {
            warn!(path = %d.path, "{}", d.message);
        }
    }
    if validation.has_errors() {
        let errors: Vec<String> = validation
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .map(ToString::to_string)
            .collect();
        bail!("invalid configuration:\n  {}", errors.join("\n  "));
    }

    let client = Client::new(config.wechat)?;
    register_default_handlers(&client);

    let addr = config.server.addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    wxmp_webhook::serve(listener, client, &config.server.path).await?;
    Ok(())
}

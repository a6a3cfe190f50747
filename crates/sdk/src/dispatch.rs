//! Routing of inbound messages to registered handlers.
//!
//! One handler per [`MessageKind`]; registering again replaces the previous
//! handler. Register everything before serving: the order of a registration
//! racing a dispatch is unspecified.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use {async_trait::async_trait, tracing::debug};

use crate::{
    message::{InboundMessage, MessageKind},
    reply,
};

/// Collects the passive reply body for one webhook request.
#[derive(Debug, Default)]
pub struct ReplySink {
    body: Option<String>,
}

impl ReplySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `body` to the reply.
    pub fn write(&mut self, body: impl AsRef<str>) {
        self.body
            .get_or_insert_with(String::new)
            .push_str(body.as_ref());
    }

    /// Write the literal `success` acknowledgement.
    pub fn success(&mut self) {
        self.write(reply::SUCCESS);
    }

    /// Write a passive text reply addressed back to the sender of `message`.
    pub fn text(&mut self, message: &InboundMessage, content: &str) {
        self.write(reply::text_reply(
            &message.from_user,
            &message.to_user,
            content,
        ));
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_none()
    }

    pub fn as_str(&self) -> Option<&str> {
        self.body.as_deref()
    }

    pub fn into_body(self) -> Option<String> {
        self.body
    }
}

/// Callback invoked for one inbound message.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: &InboundMessage, reply: &mut ReplySink);
}

struct FnHandler<F>(F);

#[async_trait]
impl<F> MessageHandler for FnHandler<F>
where
    F: Fn(&InboundMessage, &mut ReplySink) + Send + Sync,
{
    async fn handle(&self, message: &InboundMessage, reply: &mut ReplySink) {
        (self.0)(message, reply);
    }
}

/// Kind → handler table.
#[derive(Default)]
pub struct Dispatcher {
    handlers: RwLock<HashMap<MessageKind, Arc<dyn MessageHandler>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `kind`, replacing any previous one.
    pub fn register(&self, kind: MessageKind, handler: impl MessageHandler + 'static) {
        self.register_arc(kind, Arc::new(handler));
    }

    pub fn register_arc(&self, kind: MessageKind, handler: Arc<dyn MessageHandler>) {
        let mut handlers = self.handlers.write().unwrap_or_else(|e| e.into_inner());
        if handlers.insert(kind, handler).is_some() {
            debug!(%kind, "replaced message handler");
        }
    }

    /// Register a synchronous closure for `kind`.
    pub fn register_fn<F>(&self, kind: MessageKind, f: F)
    where
        F: Fn(&InboundMessage, &mut ReplySink) + Send + Sync + 'static,
    {
        self.register(kind, FnHandler(f));
    }

    pub fn is_registered(&self, kind: MessageKind) -> bool {
        let handlers = self.handlers.read().unwrap_or_else(|e| e.into_inner());
        handlers.contains_key(&kind)
    }

    /// Run the handler for `message.kind`, if any. Returns whether one ran.
    pub async fn dispatch(&self, message: &InboundMessage, sink: &mut ReplySink) -> bool {
        let handler = {
            let handlers = self.handlers.read().unwrap_or_else(|e| e.into_inner());
            handlers.get(&message.kind).cloned()
        };
        let Some(handler) = handler else {
            debug!(kind = %message.kind, "no handler registered, dropping message");
            return false;
        };
        handler.handle(message, sink).await;
        true
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.read().unwrap_or_else(|e| e.into_inner());
        f.debug_struct("Dispatcher")
            .field("kinds", &handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

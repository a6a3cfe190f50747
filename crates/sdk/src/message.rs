//! Inbound webhook messages.
//!
//! The platform posts an `<xml>` envelope per user message or event. Only the
//! kinds in [`MessageKind`] are routable; anything else parses to
//! [`Parsed::Unroutable`] and is never dispatched.

use serde::Deserialize;

use crate::error::Result;

/// Routable inbound message kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Text,
    Voice,
    Event,
}

impl MessageKind {
    /// Map the provider's `MsgType` tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim() {
            "text" => Some(Self::Text),
            "voice" => Some(Self::Voice),
            "event" => Some(Self::Event),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Voice => "voice",
            Self::Event => "event",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire shape of the inbound envelope.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct RawMessage {
    to_user_name: String,
    from_user_name: String,
    create_time: i64,
    msg_type: String,
    content: String,
    msg_id: Option<i64>,
    media_id: Option<String>,
    format: Option<String>,
    recognition: Option<String>,
    event: Option<String>,
    event_key: Option<String>,
}

/// A normalized inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub kind: MessageKind,
    /// Text body, or the (deprecated) speech recognition result for voice.
    pub content: String,
    /// Sender OpenID.
    pub from_user: String,
    /// Official Account ID the message was sent to.
    pub to_user: String,
    pub media_id: Option<String>,
    /// Voice codec, e.g. `amr` or `speex`.
    pub format: Option<String>,
    pub event: Option<String>,
    pub event_key: Option<String>,
    pub create_time: i64,
    pub msg_id: Option<i64>,
}

/// Outcome of parsing an inbound body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    Message(InboundMessage),
    Unroutable { msg_type: String },
}

/// Decode an inbound XML body.
pub fn parse(data: &[u8]) -> Result<Parsed> {
    let raw: RawMessage = quick_xml::de::from_reader(data)?;
    Ok(normalize(raw))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn normalize(raw: RawMessage) -> Parsed {
    let Some(kind) = MessageKind::from_tag(&raw.msg_type) else {
        return Parsed::Unroutable {
            msg_type: raw.msg_type.trim().to_string(),
        };
    };

    let mut message = InboundMessage {
        kind,
        content: String::new(),
        from_user: raw.from_user_name,
        to_user: raw.to_user_name,
        media_id: None,
        format: None,
        event: None,
        event_key: None,
        create_time: raw.create_time,
        msg_id: raw.msg_id,
    };

    match kind {
        MessageKind::Text => message.content = raw.content,
        MessageKind::Voice => {
            message.content = raw.recognition.unwrap_or_default();
            message.media_id = non_empty(raw.media_id);
            message.format = non_empty(raw.format);
        },
        MessageKind::Event => {
            message.event = non_empty(raw.event);
            message.event_key = non_empty(raw.event_key);
        },
    }

    Parsed::Message(message)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    fn envelope(msg_type: &str, extra: &str) -> String {
        format!(
            "<xml><ToUserName><![CDATA[gh_123]]></ToUserName>\
             <FromUserName><![CDATA[oUser]]></FromUserName>\
             <CreateTime>1348831860</CreateTime>\
             <MsgType><![CDATA[{msg_type}]]></MsgType>{extra}</xml>"
        )
    }

    fn message(parsed: Parsed) -> InboundMessage {
        match parsed {
            Parsed::Message(m) => m,
            other => panic!("expected a routable message, got {other:?}"),
        }
    }

    #[rstest]
    #[case("text", MessageKind::Text)]
    #[case("voice", MessageKind::Voice)]
    #[case("event", MessageKind::Event)]
    fn supported_tags_map_to_kinds(#[case] tag: &str, #[case] kind: MessageKind) {
        let parsed = parse(envelope(tag, "").as_bytes()).unwrap();
        assert_eq!(message(parsed).kind, kind);
    }

    #[rstest]
    #[case("image")]
    #[case("video")]
    #[case("shortvideo")]
    #[case("location")]
    #[case("link")]
    #[case("unknown")]
    fn unsupported_tags_are_unroutable(#[case] tag: &str) {
        let parsed = parse(envelope(tag, "").as_bytes()).unwrap();
        assert_eq!(parsed, Parsed::Unroutable {
            msg_type: tag.to_string()
        });
    }

    #[test]
    fn text_message_fields() {
        let xml = envelope(
            "text",
            "<Content><![CDATA[hi]]></Content><MsgId>1234567890123456</MsgId>",
        );
        let msg = message(parse(xml.as_bytes()).unwrap());
        assert_eq!(msg.content, "hi");
        assert_eq!(msg.from_user, "oUser");
        assert_eq!(msg.to_user, "gh_123");
        assert_eq!(msg.create_time, 1348831860);
        assert_eq!(msg.msg_id, Some(1234567890123456));
        assert!(msg.media_id.is_none());
    }

    #[test]
    fn plain_text_without_cdata() {
        let msg = message(
            parse(b"<xml><MsgType>text</MsgType><Content>hi</Content></xml>").unwrap(),
        );
        assert_eq!(msg.kind, MessageKind::Text);
        assert_eq!(msg.content, "hi");
    }

    #[test]
    fn voice_uses_recognition_and_media_id() {
        let xml = envelope(
            "voice",
            "<MediaId><![CDATA[media_1]]></MediaId><Format><![CDATA[amr]]></Format>\
             <Recognition><![CDATA[hello there]]></Recognition>",
        );
        let msg = message(parse(xml.as_bytes()).unwrap());
        assert_eq!(msg.content, "hello there");
        assert_eq!(msg.media_id.as_deref(), Some("media_1"));
        assert_eq!(msg.format.as_deref(), Some("amr"));
    }

    #[test]
    fn event_carries_event_name() {
        let xml = envelope(
            "event",
            "<Event><![CDATA[subscribe]]></Event><EventKey><![CDATA[qrscene_7]]></EventKey>",
        );
        let msg = message(parse(xml.as_bytes()).unwrap());
        assert_eq!(msg.event.as_deref(), Some("subscribe"));
        assert_eq!(msg.event_key.as_deref(), Some("qrscene_7"));
        assert!(msg.content.is_empty());
        assert!(msg.msg_id.is_none());
    }

    #[test]
    fn malformed_xml_is_an_error() {
        assert!(parse(b"<xml><MsgType>text</Content></xml>").is_err());
    }
}

//! Passive replies written back as the webhook's HTTP response body.

use std::time::{SystemTime, UNIX_EPOCH};

/// Literal acknowledgement telling the platform no reply will follow.
pub const SUCCESS: &str = "success";

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Wrap `value` in CDATA, splitting any embedded terminator.
fn cdata(value: &str) -> String {
    format!("<![CDATA[{}]]>", value.replace("]]>", "]]]]><![CDATA[>"))
}

/// Text reply to `to_user` (the sender's OpenID) from `from_user` (the account).
pub fn text_reply(to_user: &str, from_user: &str, content: &str) -> String {
    text_reply_at(to_user, from_user, content, unix_now())
}

pub fn text_reply_at(to_user: &str, from_user: &str, content: &str, create_time: i64) -> String {
    format!(
        "<xml>\n<ToUserName>{}</ToUserName>\n<FromUserName>{}</FromUserName>\n<CreateTime>{}</CreateTime>\n<MsgType><![CDATA[text]]></MsgType>\n<Content>{}</Content>\n</xml>",
        cdata(to_user),
        cdata(from_user),
        create_time,
        cdata(content),
    )
}

//! Template messages (`/cgi-bin/message/template/send`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    error::{Operation, Result},
    transport::{ApiStatus, Envelope, Transport},
};

/// Value of one template placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateValue {
    pub value: String,
}

/// Mini program the template message jumps to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateMiniProgram {
    pub appid: String,
    pub pagepath: String,
}

/// A template message. Placeholders serialize in sorted key order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateMessage {
    pub touser: String,
    pub template_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub miniprogram: Option<TemplateMiniProgram>,
    /// Deduplication key; one delivery per (openid, id) for ten minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_msg_id: Option<String>,
    pub data: BTreeMap<String, TemplateValue>,
}

impl TemplateMessage {
    pub fn new(touser: impl Into<String>, template_id: impl Into<String>) -> Self {
        Self {
            touser: touser.into(),
            template_id: template_id.into(),
            url: None,
            miniprogram: None,
            client_msg_id: None,
            data: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into()).filter(|u: &String| !u.is_empty());
        self
    }

    #[must_use]
    pub fn mini_program(mut self, appid: impl Into<String>, pagepath: impl Into<String>) -> Self {
        let appid = appid.into();
        self.miniprogram = (!appid.is_empty()).then(|| TemplateMiniProgram {
            appid,
            pagepath: pagepath.into(),
        });
        self
    }

    #[must_use]
    pub fn client_msg_id(mut self, id: impl Into<String>) -> Self {
        self.client_msg_id = Some(id.into()).filter(|id: &String| !id.is_empty());
        self
    }

    /// Set one placeholder, replacing an earlier value for the same key.
    #[must_use]
    pub fn field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), TemplateValue {
            value: value.into(),
        });
        self
    }

    /// Set placeholders from any `key → value` mapping.
    #[must_use]
    pub fn fields<I, K, V>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in fields {
            self = self.field(key, value);
        }
        self
    }
}

/// Response of a template send.
#[derive(Debug, Deserialize)]
pub struct TemplateSendResponse {
    #[serde(default)]
    pub msgid: Option<i64>,
    #[serde(flatten)]
    pub status: ApiStatus,
}

impl Envelope for TemplateSendResponse {
    fn status(&self) -> &ApiStatus {
        &self.status
    }
}

/// Send `message`, returning the provider's message ID when present.
pub async fn send_template(
    transport: &Transport,
    access_token: &str,
    message: &TemplateMessage,
) -> Result<Option<i64>> {
    let resp: TemplateSendResponse = transport
        .post_json(
            Operation::SendTemplateMessage,
            "/cgi-bin/message/template/send",
            &[("access_token", access_token)],
            message,
        )
        .await?;
    Ok(resp.msgid)
}

//! Customer-service messages pushed through `/cgi-bin/message/custom/send`.

use serde::{Deserialize, Serialize};

use crate::{
    error::{Operation, Result},
    transport::{ApiStatus, Transport},
};

const CUSTOM_SEND_PATH: &str = "/cgi-bin/message/custom/send";

/// Mini program card sent as a customer-service message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiniProgramCard {
    pub title: String,
    pub appid: String,
    pub pagepath: String,
    pub thumb_media_id: String,
}

/// Send a plain text message to `to_user`.
pub async fn send_text(
    transport: &Transport,
    access_token: &str,
    to_user: &str,
    content: &str,
) -> Result<()> {
    let payload = serde_json::json!({
        "touser": to_user,
        "msgtype": "text",
        "text": { "content": content },
    });
    transport
        .post_json::<ApiStatus, _>(
            Operation::SendText,
            CUSTOM_SEND_PATH,
            &[("access_token", access_token)],
            &payload,
        )
        .await?;
    Ok(())
}

/// Send a mini program card to `to_user`.
pub async fn send_mini_program_card(
    transport: &Transport,
    access_token: &str,
    to_user: &str,
    card: &MiniProgramCard,
) -> Result<()> {
    let payload = serde_json::json!({
        "touser": to_user,
        "msgtype": "miniprogrampage",
        "miniprogrampage": card,
    });
    transport
        .post_json::<ApiStatus, _>(
            Operation::SendMiniProgramCard,
            CUSTOM_SEND_PATH,
            &[("access_token", access_token)],
            &payload,
        )
        .await?;
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, mockito::Matcher};

    #[tokio::test]
    async fn send_text_posts_text_payload() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", CUSTOM_SEND_PATH)
            .match_query(Matcher::UrlEncoded("access_token".into(), "AT".into()))
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(serde_json::json!({
                "touser": "oUser",
                "msgtype": "text",
                "text": { "content": "hello" },
            })))
            .with_status(200)
            .with_body(r#"{"errcode":0,"errmsg":"ok"}"#)
            .create_async()
            .await;

        let transport = Transport::new(server.url());
        send_text(&transport, "AT", "oUser", "hello").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn send_text_surfaces_window_expiry() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", CUSTOM_SEND_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"errcode":45015,"errmsg":"response out of time limit"}"#)
            .create_async()
            .await;

        let transport = Transport::new(server.url());
        let err = send_text(&transport, "AT", "oUser", "late")
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(45015));
        assert!(err.to_string().contains("send customer-service text"));
    }

    #[tokio::test]
    async fn mini_program_card_payload() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", CUSTOM_SEND_PATH)
            .match_query(Matcher::Any)
            .match_body(Matcher::Json(serde_json::json!({
                "touser": "oUser",
                "msgtype": "miniprogrampage",
                "miniprogrampage": {
                    "title": "Open me",
                    "appid": "wxmini",
                    "pagepath": "pages/index/index",
                    "thumb_media_id": "thumb_1",
                },
            })))
            .with_status(200)
            .with_body(r#"{"errcode":0,"errmsg":"ok"}"#)
            .create_async()
            .await;

        let card = MiniProgramCard {
            title: "Open me".into(),
            appid: "wxmini".into(),
            pagepath: "pages/index/index".into(),
            thumb_media_id: "thumb_1".into(),
        };
        let transport = Transport::new(server.url());
        send_mini_program_card(&transport, "AT", "oUser", &card)
            .await
            .unwrap();
        mock.assert_async().await;
    }
}

//! End-to-end callback over a real socket.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::net::SocketAddr;

use tokio::net::TcpListener;

use wxmp_sdk::{Client, MessageKind, WechatConfig, signature::sign};

async fn start(client: Client) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = wxmp_webhook::router(client, "/callback");
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn signed_url(addr: SocketAddr, token: &str) -> String {
    let signature = sign(token, "1700000000", "abc");
    format!("http://{addr}/callback?signature={signature}&timestamp=1700000000&nonce=abc")
}

#[tokio::test]
async fn verification_then_text_reply() {
    let client = Client::builder(WechatConfig::new("wx1", "sec").with_webhook_token("tok"))
        .auto_refresh(false)
        .build()
        .unwrap();
    client.register_fn(MessageKind::Text, |msg, reply| {
        let content = format!("You said: {}", msg.content);
        reply.text(msg, &content);
    });
    let addr = start(client).await;
    let http = reqwest::Client::new();

    let echo = http
        .get(format!("{}&echostr=ping", signed_url(addr, "tok")))
        .send()
        .await
        .unwrap();
    assert_eq!(echo.status(), 200);
    assert_eq!(echo.text().await.unwrap(), "ping");

    let resp = http
        .post(signed_url(addr, "tok"))
        .body(
            "<xml><ToUserName><![CDATA[gh_acct]]></ToUserName>\
             <FromUserName><![CDATA[oUser]]></FromUserName>\
             <CreateTime>1700000000</CreateTime>\
             <MsgType><![CDATA[text]]></MsgType>\
             <Content><![CDATA[hello]]></Content>\
             <MsgId>1234567890123456</MsgId></xml>",
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body = resp.text().await.unwrap();
    assert!(body.contains("You said: hello"), "{body}");
    assert!(body.contains("<FromUserName><![CDATA[gh_acct]]></FromUserName>"));

    let forged = http
        .post(signed_url(addr, "wrong-token"))
        .body("<xml><MsgType>text</MsgType></xml>")
        .send()
        .await
        .unwrap();
    assert_eq!(forged.status(), 403);
}

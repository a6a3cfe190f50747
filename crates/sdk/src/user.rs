//! Follower lookup: paged OpenID listing and per-user profile.

use serde::Deserialize;

use crate::{
    error::{Operation, Result},
    transport::{ApiStatus, Envelope, Transport},
};

/// Profile language requested from `/cgi-bin/user/info`.
pub const DEFAULT_LANG: &str = "zh_CN";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenIdList {
    #[serde(default)]
    pub openid: Vec<String>,
}

/// One page of followers.
#[derive(Debug, Clone, Deserialize)]
pub struct UserList {
    /// Total followers of the account.
    #[serde(default)]
    pub total: u64,
    /// OpenIDs in this page (at most 10000).
    #[serde(default)]
    pub count: u64,
    /// Absent when the page is empty.
    #[serde(default)]
    pub data: Option<OpenIdList>,
    /// Cursor for the next page; the last OpenID of this page.
    #[serde(default)]
    pub next_openid: String,
    #[serde(flatten)]
    pub status: ApiStatus,
}

impl UserList {
    pub fn openids(&self) -> &[String] {
        self.data
            .as_ref()
            .map(|d| d.openid.as_slice())
            .unwrap_or_default()
    }

    /// Whether another page may follow this one.
    pub fn has_more(&self) -> bool {
        self.count > 0 && !self.next_openid.is_empty()
    }
}

impl Envelope for UserList {
    fn status(&self) -> &ApiStatus {
        &self.status
    }
}

/// Basic profile of a follower.
#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    /// 0 when the user does not follow the account; other fields are then empty.
    #[serde(default)]
    pub subscribe: u8,
    #[serde(default)]
    pub openid: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub subscribe_time: i64,
    #[serde(default)]
    pub unionid: Option<String>,
    #[serde(default)]
    pub remark: String,
    #[serde(default)]
    pub groupid: i64,
    #[serde(default)]
    pub tagid_list: Vec<i64>,
    /// Acquisition channel, e.g. `ADD_SCENE_QR_CODE`.
    #[serde(default)]
    pub subscribe_scene: String,
    #[serde(default)]
    pub qr_scene: i64,
    #[serde(default)]
    pub qr_scene_str: String,
    #[serde(flatten)]
    pub status: ApiStatus,
}

impl UserInfo {
    pub fn is_subscribed(&self) -> bool {
        self.subscribe == 1
    }
}

impl Envelope for UserInfo {
    fn status(&self) -> &ApiStatus {
        &self.status
    }
}

/// Fetch one page of followers starting after `next_openid` (first page when `None`).
pub async fn list_users(
    transport: &Transport,
    access_token: &str,
    next_openid: Option<&str>,
) -> Result<UserList> {
    transport
        .get_json(Operation::GetUserList, "/cgi-bin/user/get", &[
            ("access_token", access_token),
            ("next_openid", next_openid.unwrap_or_default()),
        ])
        .await
}

/// Follow the cursor until an empty page and collect every OpenID.
pub async fn list_all_users(transport: &Transport, access_token: &str) -> Result<Vec<String>> {
    let mut openids = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let page = list_users(transport, access_token, cursor.as_deref()).await?;
        openids.extend_from_slice(page.openids());
        if !page.has_more() || cursor.as_deref() == Some(page.next_openid.as_str()) {
            break;
        }
        cursor = Some(page.next_openid);
    }
    Ok(openids)
}

/// Fetch the profile of `openid`.
pub async fn get_user_info(
    transport: &Transport,
    access_token: &str,
    openid: &str,
    lang: &str,
) -> Result<UserInfo> {
    transport
        .get_json(Operation::GetUserInfo, "/cgi-bin/user/info", &[
            ("access_token", access_token),
            ("openid", openid),
            ("lang", lang),
        ])
        .await
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, mockito::Matcher};

    fn page_query(next: &str) -> Matcher {
        Matcher::AllOf(vec![
            Matcher::UrlEncoded("access_token".into(), "AT".into()),
            Matcher::UrlEncoded("next_openid".into(), next.into()),
        ])
    }

    #[tokio::test]
    async fn list_users_decodes_page() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/cgi-bin/user/get")
            .match_query(page_query(""))
            .with_status(200)
            .with_body(
                serde_json::json!({
                    "total": 2,
                    "count": 2,
                    "data": { "openid": ["o1", "o2"] },
                    "next_openid": "o2",
                })
                .to_string(),
            )
            .create_async()
            .await;

        let transport = Transport::new(server.url());
        let page = list_users(&transport, "AT", None).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.openids(), ["o1", "o2"]);
        assert_eq!(page.next_openid, "o2");
        assert!(page.has_more());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn list_all_users_follows_cursor() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", "/cgi-bin/user/get")
            .match_query(page_query(""))
            .with_status(200)
            .with_body(r#"{"total":3,"count":2,"data":{"openid":["o1","o2"]},"next_openid":"o2"}"#)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/cgi-bin/user/get")
            .match_query(page_query("o2"))
            .with_status(200)
            .with_body(r#"{"total":3,"count":1,"data":{"openid":["o3"]},"next_openid":"o3"}"#)
            .create_async()
            .await;
        let last = server
            .mock("GET", "/cgi-bin/user/get")
            .match_query(page_query("o3"))
            .with_status(200)
            .with_body(r#"{"total":3,"count":0,"next_openid":""}"#)
            .create_async()
            .await;

        let transport = Transport::new(server.url());
        let all = list_all_users(&transport, "AT").await.unwrap();
        assert_eq!(all, vec!["o1", "o2", "o3"]);
        first.assert_async().await;
        second.assert_async().await;
        last.assert_async().await;
    }

    #[tokio::test]
    async fn user_info_decodes_profile() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/cgi-bin/user/info")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("openid".into(), "o1".into()),
                Matcher::UrlEncoded("lang".into(), DEFAULT_LANG.into()),
            ]))
            .with_status(200)
            .with_body(
                serde_json::json!({
                    "subscribe": 1,
                    "openid": "o1",
                    "language": "zh_CN",
                    "subscribe_time": 1382694957,
                    "remark": "",
                    "groupid": 0,
                    "tagid_list": [128, 2],
                    "subscribe_scene": "ADD_SCENE_QR_CODE",
                    "qr_scene": 98765,
                    "qr_scene_str": ""
                })
                .to_string(),
            )
            .create_async()
            .await;

        let transport = Transport::new(server.url());
        let info = get_user_info(&transport, "AT", "o1", DEFAULT_LANG)
            .await
            .unwrap();
        assert!(info.is_subscribed());
        assert_eq!(info.tagid_list, vec![128, 2]);
        assert_eq!(info.subscribe_scene, "ADD_SCENE_QR_CODE");
        assert!(info.unionid.is_none());
    }

    #[tokio::test]
    async fn user_info_invalid_openid() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/cgi-bin/user/info")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"errcode":40003,"errmsg":"invalid openid"}"#)
            .create_async()
            .await;

        let transport = Transport::new(server.url());
        let err = get_user_info(&transport, "AT", "nobody", DEFAULT_LANG)
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(40003));
        assert!(err.to_string().contains("get user info"));
    }
}

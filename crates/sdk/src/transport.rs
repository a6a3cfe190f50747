//! Outbound HTTP plumbing shared by every remote operation.
//!
//! Each call is a single round trip with no retry. Responses are decoded into
//! an operation-specific [`Envelope`]; a non-zero `errcode` is the
//! authoritative failure signal regardless of the HTTP status.

use {
    reqwest::{Client, RequestBuilder, header::CONTENT_TYPE, multipart::Form},
    serde::{Deserialize, Serialize, de::DeserializeOwned},
    tracing::debug,
};

use crate::error::{Error, Operation, Result};

/// Public API host.
pub const DEFAULT_API_BASE: &str = "https://api.weixin.qq.com";

/// Status fields carried by every JSON response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiStatus {
    #[serde(default)]
    pub errcode: i64,
    #[serde(default)]
    pub errmsg: String,
}

impl ApiStatus {
    pub fn is_ok(&self) -> bool {
        self.errcode == 0
    }

    /// Map a non-zero `errcode` to [`Error::Api`] attributed to `operation`.
    pub fn check(&self, operation: Operation) -> Result<()> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(Error::api(operation, self.errcode, self.errmsg.clone()))
        }
    }
}

/// A decoded response body carrying an [`ApiStatus`].
pub trait Envelope: DeserializeOwned {
    fn status(&self) -> &ApiStatus;
}

impl Envelope for ApiStatus {
    fn status(&self) -> &ApiStatus {
        self
    }
}

/// Decode `body` as `T` and reject it when its `errcode` is non-zero.
pub fn decode_envelope<T: Envelope>(operation: Operation, body: &[u8]) -> Result<T> {
    let envelope: T = serde_json::from_slice(body)?;
    if let Err(err) = envelope.status().check(operation) {
        debug!(%operation, code = envelope.status().errcode, "provider rejected request");
        return Err(err);
    }
    Ok(envelope)
}

/// HTTP client bound to an API host.
#[derive(Debug, Clone)]
pub struct Transport {
    http: Client,
    base_url: String,
}

impl Transport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// `GET {base}{path}?{query}` decoded as `T`.
    pub async fn get_json<T: Envelope>(
        &self,
        operation: Operation,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let request = self.http.get(self.endpoint(path)).query(query);
        self.execute(operation, path, request).await
    }

    /// `POST {base}{path}?{query}` with a JSON body, decoded as `T`.
    pub async fn post_json<T, B>(
        &self,
        operation: Operation,
        path: &str,
        query: &[(&str, &str)],
        body: &B,
    ) -> Result<T>
    where
        T: Envelope,
        B: Serialize + ?Sized,
    {
        let payload = serde_json::to_vec(body)?;
        let request = self
            .http
            .post(self.endpoint(path))
            .query(query)
            .header(CONTENT_TYPE, "application/json")
            .body(payload);
        self.execute(operation, path, request).await
    }

    /// `POST {base}{path}?{query}` with a multipart form, decoded as `T`.
    pub async fn post_multipart<T: Envelope>(
        &self,
        operation: Operation,
        path: &str,
        query: &[(&str, &str)],
        form: Form,
    ) -> Result<T> {
        let request = self
            .http
            .post(self.endpoint(path))
            .query(query)
            .multipart(form);
        self.execute(operation, path, request).await
    }

    /// `GET {base}{path}?{query}` returning the raw body and its content type.
    pub async fn get_bytes(
        &self,
        operation: Operation,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<(Option<String>, Vec<u8>)> {
        debug!(%operation, path, "calling wechat api");
        let resp = self
            .http
            .get(self.endpoint(path))
            .query(query)
            .send()
            .await?;
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = resp.bytes().await?;
        Ok((content_type, body.to_vec()))
    }

    /// Fetch an arbitrary URL outside the API host, requiring a 2xx status.
    pub async fn fetch_url(&self, operation: Operation, url: &str) -> Result<Vec<u8>> {
        debug!(%operation, url, "fetching external resource");
        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Status {
                operation,
                status,
                url: url.to_string(),
            });
        }
        Ok(resp.bytes().await?.to_vec())
    }

    async fn execute<T: Envelope>(
        &self,
        operation: Operation,
        path: &str,
        request: RequestBuilder,
    ) -> Result<T> {
        debug!(%operation, path, "calling wechat api");
        let body = request.send().await?.bytes().await?;
        decode_envelope(operation, &body)
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, mockito::Matcher, rstest::rstest};

    #[derive(Debug, Deserialize)]
    struct Probe {
        #[serde(default)]
        value: String,
        #[serde(flatten)]
        status: ApiStatus,
    }

    impl Envelope for Probe {
        fn status(&self) -> &ApiStatus {
            &self.status
        }
    }

    #[rstest]
    #[case(r#"{"value":"x"}"#)]
    #[case(r#"{"value":"x","errcode":0}"#)]
    #[case(r#"{"value":"x","errcode":0,"errmsg":"ok"}"#)]
    fn zero_or_missing_errcode_is_success(#[case] body: &str) {
        let probe: Probe = decode_envelope(Operation::GetUserInfo, body.as_bytes()).unwrap();
        assert_eq!(probe.value, "x");
    }

    #[rstest]
    #[case(40001, "invalid credential")]
    #[case(45009, "reach max api daily quota limit")]
    #[case(-1, "system error")]
    fn non_zero_errcode_is_structured_error(#[case] code: i64, #[case] message: &str) {
        let body = serde_json::json!({ "errcode": code, "errmsg": message }).to_string();
        let err = decode_envelope::<Probe>(Operation::GetUserList, body.as_bytes()).unwrap_err();
        assert_eq!(err.code(), Some(code));
        let text = err.to_string();
        assert!(text.contains(&code.to_string()));
        assert!(text.contains(message));
        assert!(text.contains("get user list"));
    }

    #[test]
    fn undecodable_body_is_transport_error() {
        let err = decode_envelope::<ApiStatus>(Operation::SendText, b"<html>").unwrap_err();
        assert!(matches!(err, Error::SerdeJson(_)));
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let transport = Transport::new("http://127.0.0.1:9/");
        assert_eq!(
            transport.endpoint("/cgi-bin/token"),
            "http://127.0.0.1:9/cgi-bin/token"
        );
    }

    #[tokio::test]
    async fn http_200_with_errcode_is_still_a_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/cgi-bin/echo")
            .match_query(Matcher::UrlEncoded("access_token".into(), "T".into()))
            .match_body(Matcher::Json(serde_json::json!({ "a": 1 })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"errcode":48001,"errmsg":"api unauthorized"}"#)
            .create_async()
            .await;

        let transport = Transport::new(server.url());
        let err = transport
            .post_json::<ApiStatus, _>(
                Operation::SendText,
                "/cgi-bin/echo",
                &[("access_token", "T")],
                &serde_json::json!({ "a": 1 }),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(48001));
    }

    #[tokio::test]
    async fn fetch_url_rejects_non_success_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/missing.jpg")
            .with_status(404)
            .create_async()
            .await;

        let transport = Transport::default();
        let url = format!("{}/missing.jpg", server.url());
        let err = transport
            .fetch_url(Operation::AddMaterial, &url)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Status { status, .. } if status.as_u16() == 404));
    }
}

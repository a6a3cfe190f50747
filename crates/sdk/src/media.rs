//! Temporary media download and permanent material upload.

use std::path::Path;

use {
    base64::{Engine as _, engine::general_purpose::STANDARD},
    reqwest::multipart::{Form, Part},
    serde::Deserialize,
    tracing::{debug, info},
};

use crate::{
    error::{Error, Operation, Result},
    transport::{ApiStatus, Envelope, Transport, decode_envelope},
};

/// Permanent material category (`type` query parameter).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialKind {
    Image,
    Voice,
    Video,
    Thumb,
}

impl MaterialKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Voice => "voice",
            Self::Video => "video",
            Self::Thumb => "thumb",
        }
    }
}

impl std::str::FromStr for MaterialKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "image" => Ok(Self::Image),
            "voice" => Ok(Self::Voice),
            "video" => Ok(Self::Video),
            "thumb" => Ok(Self::Thumb),
            other => Err(Error::invalid_input(format!(
                "unknown material type: {other}"
            ))),
        }
    }
}

/// Response of `/cgi-bin/material/add_material`.
#[derive(Debug, Clone, Deserialize)]
pub struct MaterialUpload {
    #[serde(default)]
    pub media_id: String,
    /// Only returned for images.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(flatten)]
    pub status: ApiStatus,
}

impl Envelope for MaterialUpload {
    fn status(&self) -> &ApiStatus {
        &self.status
    }
}

fn is_json(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.contains("json") || ct.starts_with("text/plain"))
}

/// Download a temporary media file into memory.
///
/// The provider answers errors with a JSON body instead of the file, so a
/// JSON response is decoded as an envelope first.
pub async fn download_media(
    transport: &Transport,
    access_token: &str,
    media_id: &str,
) -> Result<Vec<u8>> {
    let (content_type, body) = transport
        .get_bytes(Operation::DownloadMedia, "/cgi-bin/media/get", &[
            ("access_token", access_token),
            ("media_id", media_id),
        ])
        .await?;
    if is_json(content_type.as_deref()) {
        decode_envelope::<ApiStatus>(Operation::DownloadMedia, &body)?;
    }
    debug!(media_id, bytes = body.len(), "downloaded temporary media");
    Ok(body)
}

/// Download a temporary media file to `path`, creating parent directories.
pub async fn download_media_to(
    transport: &Transport,
    access_token: &str,
    media_id: &str,
    path: &Path,
) -> Result<()> {
    let body = download_media(transport, access_token, media_id).await?;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir).await?;
    }
    tokio::fs::write(path, &body).await?;
    info!(media_id, path = %path.display(), "saved temporary media");
    Ok(())
}

/// Download a temporary media file and return it base64 encoded.
pub async fn download_media_base64(
    transport: &Transport,
    access_token: &str,
    media_id: &str,
) -> Result<String> {
    let body = download_media(transport, access_token, media_id).await?;
    Ok(STANDARD.encode(body))
}

/// File name sent with the upload: last path segment of the source URL.
fn upload_file_name(file_url: &str) -> String {
    url::Url::parse(file_url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_owned))
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "media".to_string())
}

/// Fetch `file_url` and upload it as permanent material of `kind`.
pub async fn add_material(
    transport: &Transport,
    access_token: &str,
    kind: MaterialKind,
    file_url: &str,
) -> Result<MaterialUpload> {
    let bytes = transport.fetch_url(Operation::AddMaterial, file_url).await?;
    let part = Part::bytes(bytes).file_name(upload_file_name(file_url));
    let form = Form::new().part("media", part);
    let upload: MaterialUpload = transport
        .post_multipart(
            Operation::AddMaterial,
            "/cgi-bin/material/add_material",
            &[("access_token", access_token), ("type", kind.as_str())],
            form,
        )
        .await?;
    info!(kind = kind.as_str(), media_id = %upload.media_id, "uploaded permanent material");
    Ok(upload)
}

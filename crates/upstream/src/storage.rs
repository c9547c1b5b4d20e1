//! Uploaded images: blog attachments and avatars.
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use ulid::Ulid;
use url::Url;

use crate::{ApiKey, UpstreamResult, read_json};

const SERVICE: &str = "storage";
const DEFAULT_BASE_URL: &str = "https://firebasestorage.googleapis.com/v0";

/// Object names travel as a single path segment, so `/` must be escaped.
const OBJECT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    /// Store `data` under `object` and return a public download URL.
    async fn upload(&self, object: &str, content_type: &str, data: Bytes) -> UpstreamResult<String>;

    /// A handle uploading as the account `id_token` was issued for.
    fn on_behalf_of(&self, id_token: &str) -> Arc<dyn BlobStore>;
}

/// Object name for a blog image. The unique prefix keeps two uploads of
/// `photo.jpg` apart.
pub fn blog_image_object(file_name: &str) -> String {
    format!("blog-images/{}_{}", Ulid::new(), clean_file_name(file_name))
}

pub fn avatar_object(file_name: &str, now: DateTime<Utc>) -> String {
    format!("images/{}_{}", now.timestamp_millis(), clean_file_name(file_name))
}

/// Last path component with anything but `[A-Za-z0-9._-]` replaced by `_`.
fn clean_file_name(file_name: &str) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() { "upload".to_owned() } else { cleaned }
}

/// [`BlobStore`] backed by the Firebase Storage REST endpoint of one bucket.
#[derive(Clone, Debug)]
pub struct FirebaseStorage {
    http: Client,
    base_url: String,
    bucket: String,
    id_token: Option<ApiKey>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    name: String,
    #[serde(default)]
    download_tokens: Option<String>,
}

impl FirebaseStorage {
    pub fn new(http: Client, bucket: impl Into<String>) -> Self {
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_owned(),
            bucket: bucket.into(),
            id_token: None,
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    fn objects_url(&self) -> String {
        format!("{}/b/{}/o", self.base_url, utf8_percent_encode(&self.bucket, OBJECT))
    }

    fn upload_request(&self, url: Url) -> RequestBuilder {
        let request = self.http.post(url);
        match &self.id_token {
            Some(token) => request.header(AUTHORIZATION, format!("Firebase {}", token.expose())),
            None => request,
        }
    }

    fn download_url(&self, object: &str, token: Option<&str>) -> String {
        let mut url = format!(
            "{}/{}?alt=media",
            self.objects_url(),
            utf8_percent_encode(object, OBJECT)
        );
        if let Some(token) = token {
            url.push_str("&token=");
            url.push_str(token);
        }
        url
    }
}

#[async_trait]
impl BlobStore for FirebaseStorage {
    async fn upload(&self, object: &str, content_type: &str, data: Bytes) -> UpstreamResult<String> {
        let mut url = Url::parse(&self.objects_url())?;
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", object);
        let size = data.len();
        let response = self
            .upload_request(url)
            .header(CONTENT_TYPE, content_type)
            .body(data)
            .send()
            .await?;
        let uploaded: UploadResponse = read_json(SERVICE, response).await?;
        tracing::info!(object = %uploaded.name, size, "uploaded object");
        Ok(self.download_url(&uploaded.name, uploaded.download_tokens.as_deref()))
    }

    fn on_behalf_of(&self, id_token: &str) -> Arc<dyn BlobStore> {
        Arc::new(Self {
            id_token: Some(ApiKey::new(id_token)),
            ..self.clone()
        })
    }
}

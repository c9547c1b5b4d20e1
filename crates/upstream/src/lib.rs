//! Clients for the managed services the gateway relays to.
//!
//! Every service sits behind a trait so the servers can run against the real REST
//! APIs in production and against the in-memory implementations in [`memory`]
//! during tests:
//!
//! | trait | production client | service |
//! |---|---|---|
//! | [`IdentityProvider`] | [`FirebaseAuth`] | Identity Toolkit REST API |
//! | [`DocumentStore`] | [`FirestoreClient`] | Firestore REST API |
//! | [`BlobStore`] | [`FirebaseStorage`] | Firebase Storage |
//! | [`CompletionProvider`] | [`OpenAiClient`] | OpenAI chat completions |
//! | [`VideoSearch`] | [`YouTubeClient`] | YouTube Data API v3 |
#![cfg_attr(docsrs, feature(doc_cfg))]

use std::fmt;

use serde::de::DeserializeOwned;

mod completion;
mod error;
pub mod firestore;
mod identity;
pub mod memory;
mod storage;
mod video;

pub use completion::{CompletionProvider, DEFAULT_CHAT_MODEL, OpenAiClient};
pub use error::{UpstreamError, UpstreamResult};
pub use firestore::{Document, DocumentStore, Fields, FirestoreClient, Value};
pub use identity::{AuthSession, FirebaseAuth, IdentityProvider};
pub use storage::{BlobStore, FirebaseStorage, avatar_object, blog_image_object};
pub use video::{VideoSearch, YouTubeClient};

/// An API key or ID token that never shows up in `Debug` output or logs.
#[derive(Clone, Default)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

impl From<String> for ApiKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&str> for ApiKey {
    fn from(key: &str) -> Self {
        Self(key.to_owned())
    }
}

/// Read a response body, turning non-success statuses into [`UpstreamError::Status`].
pub(crate) async fn read_json<T: DeserializeOwned>(
    service: &'static str,
    response: reqwest::Response,
) -> UpstreamResult<T> {
    let status = response.status();
    let body = response.bytes().await?;
    if !status.is_success() {
        let message = error::error_message(&body);
        tracing::warn!(service, status = status.as_u16(), %message, "upstream request failed");
        return Err(UpstreamError::Status {
            service,
            status: status.as_u16(),
            message,
        });
    }
    Ok(serde_json::from_slice(&body)?)
}

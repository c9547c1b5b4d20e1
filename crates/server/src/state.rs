//! Upstream handles shared by every request, injected into the [`Depot`] with
//! `affix_state`.
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;

use explore_upstream::{
    BlobStore, CompletionProvider, DocumentStore, FirebaseAuth, FirebaseStorage, FirestoreClient, IdentityProvider,
    OpenAiClient, VideoSearch, YouTubeClient,
};
use salvo::Depot;

use crate::config::{ChatConfig, DbConfig};
use crate::error::{AppError, AppResult};
use crate::session::Session;

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// One pooled client shared by every upstream of a server.
pub fn http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .timeout(UPSTREAM_TIMEOUT)
        .build()
}

/// State of the database server.
#[derive(Clone)]
pub struct DbState {
    pub documents: Arc<dyn DocumentStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub blobs: Arc<dyn BlobStore>,
    /// Whether the session cookie carries the `Secure` attribute.
    pub cookie_secure: bool,
}

impl DbState {
    pub fn new(
        documents: impl DocumentStore,
        identity: impl IdentityProvider,
        blobs: impl BlobStore,
    ) -> Self {
        Self {
            documents: Arc::new(documents),
            identity: Arc::new(identity),
            blobs: Arc::new(blobs),
            cookie_secure: false,
        }
    }

    pub fn cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    /// Document store acting as the signed in caller.
    pub fn documents_for(&self, session: &Session) -> Arc<dyn DocumentStore> {
        self.documents.on_behalf_of(&session.token)
    }

    /// Blob store acting as the signed in caller.
    pub fn blobs_for(&self, session: &Session) -> Arc<dyn BlobStore> {
        self.blobs.on_behalf_of(&session.token)
    }

    /// Clients for the Firebase project named in `config`.
    pub fn from_config(config: &DbConfig, http: reqwest::Client) -> Self {
        Self::new(
            FirestoreClient::new(http.clone(), &config.project_id, config.firebase_api_key.as_str()),
            FirebaseAuth::new(http.clone(), config.firebase_api_key.as_str()),
            FirebaseStorage::new(http, &config.storage_bucket),
        )
        .cookie_secure(config.cookie_secure)
    }
}

impl Debug for DbState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbState")
            .field("cookie_secure", &self.cookie_secure)
            .finish_non_exhaustive()
    }
}

/// State of the chat server.
#[derive(Clone)]
pub struct ChatState {
    pub completion: Arc<dyn CompletionProvider>,
    pub videos: Arc<dyn VideoSearch>,
}

impl ChatState {
    pub fn new(completion: impl CompletionProvider, videos: impl VideoSearch) -> Self {
        Self {
            completion: Arc::new(completion),
            videos: Arc::new(videos),
        }
    }

    pub fn from_config(config: &ChatConfig, http: reqwest::Client) -> Self {
        Self::new(
            OpenAiClient::new(http.clone(), config.openai_api_key.as_str()).model(&config.openai_model),
            YouTubeClient::new(http, config.youtube_api_key.as_str()),
        )
    }
}

impl Debug for ChatState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatState").finish_non_exhaustive()
    }
}

/// Typed access to the injected state.
pub trait StateDepotExt {
    fn db_state(&self) -> AppResult<&DbState>;
    fn chat_state(&self) -> AppResult<&ChatState>;
}

impl StateDepotExt for Depot {
    fn db_state(&self) -> AppResult<&DbState> {
        self.obtain::<DbState>().map_err(|_| {
            tracing::error!("DbState missing from depot");
            AppError::Internal
        })
    }

    fn chat_state(&self) -> AppResult<&ChatState> {
        self.obtain::<ChatState>().map_err(|_| {
            tracing::error!("ChatState missing from depot");
            AppError::Internal
        })
    }
}

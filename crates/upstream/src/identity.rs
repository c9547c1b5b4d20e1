//! Credential checks, delegated to the identity provider.
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{ApiKey, UpstreamError, UpstreamResult, read_json};

const SERVICE: &str = "identity";
const DEFAULT_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";

/// A signed in account.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    #[serde(rename = "localId")]
    pub uid: String,
    pub id_token: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Seconds until `id_token` expires.
    #[serde(default)]
    pub expires_in: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
    async fn sign_in(&self, email: &str, password: &str) -> UpstreamResult<AuthSession>;

    async fn sign_up(&self, email: &str, password: &str) -> UpstreamResult<AuthSession>;

    /// Resolve an ID token to the account id it was issued for.
    async fn lookup(&self, id_token: &str) -> UpstreamResult<String>;

    /// Remove the account `id_token` was issued for.
    async fn delete(&self, id_token: &str) -> UpstreamResult<()>;
}

/// [`IdentityProvider`] backed by the Identity Toolkit REST API.
#[derive(Clone, Debug)]
pub struct FirebaseAuth {
    http: Client,
    base_url: String,
    api_key: ApiKey,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenRequest<'a> {
    id_token: &'a str,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
}

impl FirebaseAuth {
    pub fn new(http: Client, api_key: impl Into<ApiKey>) -> Self {
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_owned(),
            api_key: api_key.into(),
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    fn url(&self, method: &str) -> UpstreamResult<Url> {
        let mut url = Url::parse(&format!("{}/accounts:{method}", self.base_url))?;
        url.query_pairs_mut().append_pair("key", self.api_key.expose());
        Ok(url)
    }

    async fn password_call(&self, method: &str, email: &str, password: &str) -> UpstreamResult<AuthSession> {
        let body = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        let response = self.http.post(self.url(method)?).json(&body).send().await?;
        read_json(SERVICE, response).await
    }
}

#[async_trait]
impl IdentityProvider for FirebaseAuth {
    async fn sign_in(&self, email: &str, password: &str) -> UpstreamResult<AuthSession> {
        self.password_call("signInWithPassword", email, password).await
    }

    async fn sign_up(&self, email: &str, password: &str) -> UpstreamResult<AuthSession> {
        self.password_call("signUp", email, password).await
    }

    async fn lookup(&self, id_token: &str) -> UpstreamResult<String> {
        let response = self
            .http
            .post(self.url("lookup")?)
            .json(&TokenRequest { id_token })
            .send()
            .await?;
        let found: LookupResponse = read_json(SERVICE, response).await?;
        found
            .users
            .into_iter()
            .next()
            .map(|user| user.local_id)
            .ok_or_else(|| UpstreamError::NotFound("account".to_owned()))
    }

    async fn delete(&self, id_token: &str) -> UpstreamResult<()> {
        let response = self
            .http
            .post(self.url("delete")?)
            .json(&TokenRequest { id_token })
            .send()
            .await?;
        read_json::<serde_json::Value>(SERVICE, response).await?;
        Ok(())
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::json;
use url::Url;

use super::{Document, DocumentStore, Fields, RawDocument, Value};
use crate::{ApiKey, UpstreamError, UpstreamResult, read_json};

const SERVICE: &str = "firestore";
const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com/v1";
const LIST_PAGE_SIZE: &str = "300";

/// Characters left as is in a path segment.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

/// [`DocumentStore`] backed by the Firestore REST API, authenticated with the web
/// API key and, once [`DocumentStore::on_behalf_of`] is used, a caller's ID token.
#[derive(Clone, Debug)]
pub struct FirestoreClient {
    http: Client,
    base_url: String,
    project_id: String,
    api_key: ApiKey,
    id_token: Option<ApiKey>,
}

impl FirestoreClient {
    pub fn new(http: Client, project_id: impl Into<String>, api_key: impl Into<ApiKey>) -> Self {
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_owned(),
            project_id: project_id.into(),
            api_key: api_key.into(),
            id_token: None,
        }
    }

    /// Point the client somewhere else, e.g. the local emulator
    /// (`http://localhost:8080/v1`).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    fn documents_root(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents",
            self.base_url,
            utf8_percent_encode(&self.project_id, SEGMENT)
        )
    }

    fn url(&self, path: &str) -> UpstreamResult<Url> {
        let mut url = Url::parse(&format!("{}{path}", self.documents_root()))?;
        url.query_pairs_mut().append_pair("key", self.api_key.expose());
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let request = self.http.request(method, url);
        match &self.id_token {
            Some(token) => request.bearer_auth(token.expose()),
            None => request,
        }
    }

    fn collection_url(&self, collection: &str) -> UpstreamResult<Url> {
        self.url(&format!("/{}", utf8_percent_encode(collection, SEGMENT)))
    }

    fn document_url(&self, collection: &str, id: &str) -> UpstreamResult<Url> {
        self.url(&format!(
            "/{}/{}",
            utf8_percent_encode(collection, SEGMENT),
            utf8_percent_encode(id, SEGMENT)
        ))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<RawDocument>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct QueryItem {
    document: Option<RawDocument>,
}

#[async_trait]
impl DocumentStore for FirestoreClient {
    async fn get(&self, collection: &str, id: &str) -> UpstreamResult<Option<Document>> {
        let response = self.request(Method::GET, self.document_url(collection, id)?).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let raw: RawDocument = read_json(SERVICE, response).await?;
        Ok(Some(raw.into()))
    }

    async fn list(&self, collection: &str) -> UpstreamResult<Vec<Document>> {
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut url = self.collection_url(collection)?;
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("pageSize", LIST_PAGE_SIZE);
                if let Some(token) = &page_token {
                    query.append_pair("pageToken", token);
                }
            }
            let page: ListResponse = read_json(SERVICE, self.request(Method::GET, url).send().await?).await?;
            documents.extend(page.documents.into_iter().map(Document::from));
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        tracing::debug!(collection, count = documents.len(), "listed documents");
        Ok(documents)
    }

    async fn find_eq(&self, collection: &str, field: &str, value: Value) -> UpstreamResult<Vec<Document>> {
        let body = json!({
            "structuredQuery": {
                "from": [{"collectionId": collection}],
                "where": {
                    "fieldFilter": {
                        "field": {"fieldPath": field},
                        "op": "EQUAL",
                        "value": value,
                    }
                }
            }
        });
        let url = self.url(":runQuery")?;
        let items: Vec<QueryItem> = read_json(SERVICE, self.request(Method::POST, url).json(&body).send().await?).await?;
        Ok(items
            .into_iter()
            .filter_map(|item| item.document)
            .map(Document::from)
            .collect())
    }

    async fn create(&self, collection: &str, id: Option<&str>, fields: Fields) -> UpstreamResult<Document> {
        let mut url = self.collection_url(collection)?;
        if let Some(id) = id {
            url.query_pairs_mut().append_pair("documentId", id);
        }
        let response = self
            .request(Method::POST, url)
            .json(&json!({ "fields": fields }))
            .send()
            .await?;
        let raw: RawDocument = read_json(SERVICE, response).await?;
        Ok(raw.into())
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> UpstreamResult<Document> {
        let mut url = self.document_url(collection, id)?;
        {
            let mut query = url.query_pairs_mut();
            for key in fields.keys() {
                query.append_pair("updateMask.fieldPaths", key);
            }
            query.append_pair("currentDocument.exists", "true");
        }
        let response = self
            .request(Method::PATCH, url)
            .json(&json!({ "fields": fields }))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(UpstreamError::NotFound(format!("{collection}/{id}")));
        }
        let raw: RawDocument = read_json(SERVICE, response).await?;
        Ok(raw.into())
    }

    async fn delete(&self, collection: &str, id: &str) -> UpstreamResult<()> {
        let response = self
            .request(Method::DELETE, self.document_url(collection, id)?)
            .send()
            .await?;
        read_json::<serde_json::Value>(SERVICE, response).await?;
        tracing::debug!(collection, id, "deleted document");
        Ok(())
    }

    fn on_behalf_of(&self, id_token: &str) -> Arc<dyn DocumentStore> {
        Arc::new(Self {
            id_token: Some(ApiKey::new(id_token)),
            ..self.clone()
        })
    }
}

//! Document store access.
mod client;
mod value;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

pub use client::FirestoreClient;
pub use value::{ArrayValue, Fields, GeoPoint, MapValue, Value};

use crate::UpstreamResult;

/// A stored document: its id (last segment of the resource name) and fields.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
    pub create_time: Option<DateTime<Utc>>,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
            create_time: None,
        }
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// String field or an empty string when absent.
    pub fn string(&self, key: &str) -> String {
        self.str(key).unwrap_or_default().to_owned()
    }

    pub fn timestamp(&self, key: &str) -> Option<DateTime<Utc>> {
        self.fields.get(key).and_then(Value::as_timestamp)
    }

    /// String elements of an array field; other element types are skipped.
    pub fn strings(&self, key: &str) -> Vec<String> {
        self.fields
            .get(key)
            .and_then(Value::as_array)
            .map(|values| values.iter().filter_map(Value::as_str).map(str::to_owned).collect())
            .unwrap_or_default()
    }

    /// Fields without their type tags.
    pub fn to_plain(&self) -> serde_json::Map<String, serde_json::Value> {
        value::plain_fields(&self.fields)
    }
}

/// Document as returned by the REST API.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawDocument {
    name: String,
    #[serde(default)]
    fields: Fields,
    create_time: Option<DateTime<Utc>>,
}

impl From<RawDocument> for Document {
    fn from(raw: RawDocument) -> Self {
        let id = raw.name.rsplit('/').next().unwrap_or_default().to_owned();
        Self {
            id,
            fields: raw.fields,
            create_time: raw.create_time,
        }
    }
}

/// Collection oriented document storage.
///
/// There is no transaction support: concurrent writers to one document race and
/// the last write wins.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// `None` when the document does not exist.
    async fn get(&self, collection: &str, id: &str) -> UpstreamResult<Option<Document>>;

    /// Every document of the collection.
    async fn list(&self, collection: &str) -> UpstreamResult<Vec<Document>>;

    /// Documents whose `field` equals `value`.
    async fn find_eq(&self, collection: &str, field: &str, value: Value) -> UpstreamResult<Vec<Document>>;

    /// Store a new document. The store picks the id when `id` is `None`.
    async fn create(&self, collection: &str, id: Option<&str>, fields: Fields) -> UpstreamResult<Document>;

    /// Overwrite the given fields of an existing document, leaving the others intact.
    async fn update(&self, collection: &str, id: &str, fields: Fields) -> UpstreamResult<Document>;

    async fn delete(&self, collection: &str, id: &str) -> UpstreamResult<()>;

    /// A handle whose requests carry the ID token of a signed in account, so the
    /// store's security rules see that account as the caller.
    fn on_behalf_of(&self, id_token: &str) -> Arc<dyn DocumentStore>;
}

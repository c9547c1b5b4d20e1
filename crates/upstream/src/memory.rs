//! In-process implementations of the upstream traits.
//!
//! They keep everything in maps guarded by [`parking_lot::RwLock`] and are meant for
//! tests and short local runs without cloud credentials. Nothing is ever evicted,
//! so memory grows with every document, upload and sign in.
//!
//! [`DocumentStore::on_behalf_of`] and [`BlobStore::on_behalf_of`] return handles to
//! the same data: there are no security rules to evaluate.
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use parking_lot::RwLock;
use ulid::Ulid;

use crate::firestore::{Document, DocumentStore, Fields, Value};
use crate::identity::{AuthSession, IdentityProvider};
use crate::storage::BlobStore;
use crate::{UpstreamError, UpstreamResult};

type Collection = BTreeMap<String, Document>;

#[derive(Clone, Debug, Default)]
pub struct MemoryDocumentStore {
    collections: Arc<RwLock<HashMap<String, Collection>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in `collection`.
    pub fn count(&self, collection: &str) -> usize {
        self.collections.read().get(collection).map_or(0, BTreeMap::len)
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> UpstreamResult<Option<Document>> {
        Ok(self
            .collections
            .read()
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn list(&self, collection: &str) -> UpstreamResult<Vec<Document>> {
        Ok(self
            .collections
            .read()
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn find_eq(&self, collection: &str, field: &str, value: Value) -> UpstreamResult<Vec<Document>> {
        Ok(self
            .collections
            .read()
            .get(collection)
            .map(|docs| {
                docs.values()
                    .filter(|doc| doc.fields.get(field) == Some(&value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn create(&self, collection: &str, id: Option<&str>, fields: Fields) -> UpstreamResult<Document> {
        let id = id.map_or_else(|| Ulid::new().to_string(), str::to_owned);
        let mut collections = self.collections.write();
        let docs = collections.entry(collection.to_owned()).or_default();
        if docs.contains_key(&id) {
            return Err(UpstreamError::Status {
                service: "firestore",
                status: 409,
                message: format!("Document already exists: {collection}/{id}"),
            });
        }
        let doc = Document {
            id: id.clone(),
            fields,
            create_time: Some(Utc::now()),
        };
        docs.insert(id, doc.clone());
        Ok(doc)
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> UpstreamResult<Document> {
        let mut collections = self.collections.write();
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| UpstreamError::NotFound(format!("{collection}/{id}")))?;
        doc.fields.extend(fields);
        Ok(doc.clone())
    }

    async fn delete(&self, collection: &str, id: &str) -> UpstreamResult<()> {
        if let Some(docs) = self.collections.write().get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }

    fn on_behalf_of(&self, _id_token: &str) -> Arc<dyn DocumentStore> {
        Arc::new(self.clone())
    }
}

#[derive(Debug, Default)]
struct Accounts {
    /// email -> (uid, password)
    by_email: HashMap<String, (String, String)>,
    /// id token -> uid
    tokens: HashMap<String, String>,
}

/// Accounts and issued tokens held in memory. Errors carry the same messages the
/// real identity provider uses.
///
/// ID tokens never expire and stay valid until their account is deleted; every
/// sign in adds one more. Not suited to a long running server.
#[derive(Clone, Debug, Default)]
pub struct MemoryIdentity {
    accounts: Arc<RwLock<Accounts>>,
}

impl MemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    fn reject(message: &str) -> UpstreamError {
        UpstreamError::Status {
            service: "identity",
            status: 400,
            message: message.to_owned(),
        }
    }

    /// Number of ID tokens currently accepted by [`IdentityProvider::lookup`].
    pub fn token_count(&self) -> usize {
        self.accounts.read().tokens.len()
    }

    fn issue(accounts: &mut Accounts, uid: &str, email: &str) -> AuthSession {
        let id_token = format!("token-{}", Ulid::new());
        accounts.tokens.insert(id_token.clone(), uid.to_owned());
        AuthSession {
            uid: uid.to_owned(),
            id_token,
            email: email.to_owned(),
            refresh_token: None,
            expires_in: Some("3600".to_owned()),
        }
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn sign_in(&self, email: &str, password: &str) -> UpstreamResult<AuthSession> {
        let mut accounts = self.accounts.write();
        let uid = match accounts.by_email.get(email) {
            Some((uid, stored)) if stored == password => uid.clone(),
            Some(_) => return Err(Self::reject("INVALID_PASSWORD")),
            None => return Err(Self::reject("EMAIL_NOT_FOUND")),
        };
        Ok(Self::issue(&mut accounts, &uid, email))
    }

    async fn sign_up(&self, email: &str, password: &str) -> UpstreamResult<AuthSession> {
        let mut accounts = self.accounts.write();
        if accounts.by_email.contains_key(email) {
            return Err(Self::reject("EMAIL_EXISTS"));
        }
        let uid = Ulid::new().to_string();
        accounts
            .by_email
            .insert(email.to_owned(), (uid.clone(), password.to_owned()));
        Ok(Self::issue(&mut accounts, &uid, email))
    }

    async fn lookup(&self, id_token: &str) -> UpstreamResult<String> {
        self.accounts
            .read()
            .tokens
            .get(id_token)
            .cloned()
            .ok_or_else(|| Self::reject("INVALID_ID_TOKEN"))
    }

    async fn delete(&self, id_token: &str) -> UpstreamResult<()> {
        let mut accounts = self.accounts.write();
        let uid = accounts
            .tokens
            .get(id_token)
            .cloned()
            .ok_or_else(|| Self::reject("INVALID_ID_TOKEN"))?;
        accounts.by_email.retain(|_, (owner, _)| *owner != uid);
        accounts.tokens.retain(|_, owner| *owner != uid);
        Ok(())
    }
}

/// Keeps uploaded objects in memory and hands out `memory://` URLs.
#[derive(Clone, Debug, Default)]
pub struct MemoryBlobStore {
    objects: Arc<RwLock<BTreeMap<String, (String, Bytes)>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object_names(&self) -> Vec<String> {
        self.objects.read().keys().cloned().collect()
    }

    pub fn get(&self, object: &str) -> Option<(String, Bytes)> {
        self.objects.read().get(object).cloned()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, object: &str, content_type: &str, data: Bytes) -> UpstreamResult<String> {
        self.objects
            .write()
            .insert(object.to_owned(), (content_type.to_owned(), data));
        Ok(format!("memory://{object}"))
    }

    fn on_behalf_of(&self, _id_token: &str) -> Arc<dyn BlobStore> {
        Arc::new(self.clone())
    }
}

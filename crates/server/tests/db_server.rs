use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{TimeZone, Utc};
use explore_domain::{BlogPost, User};
use explore_server::records::{BLOG_POSTS, USERS, blog_fields};
use explore_server::{DbState, JSON_LIMIT, ListenConfig, TOKEN_COOKIE, UPLOAD_LIMIT, db_router, service};
use explore_upstream::memory::{MemoryBlobStore, MemoryDocumentStore, MemoryIdentity};
use explore_upstream::{BlobStore, Document, DocumentStore, Fields, UpstreamError, UpstreamResult, Value as FieldValue};
use parking_lot::Mutex;
use salvo::http::StatusCode;
use salvo::prelude::*;
use salvo::test::{ResponseExt, TestClient};
use serde_json::{Value, json};
use tracing_test::traced_test;

const BASE: &str = "http://127.0.0.1:4000";

struct Harness {
    service: Service,
    documents: MemoryDocumentStore,
    identity: MemoryIdentity,
    blobs: MemoryBlobStore,
}

fn listen() -> ListenConfig {
    ListenConfig {
        host: [127, 0, 0, 1].into(),
        port: 4000,
        static_dir: PathBuf::from("no-such-dist"),
        cors_origins: Vec::new(),
    }
}

fn harness() -> Harness {
    let documents = MemoryDocumentStore::new();
    let identity = MemoryIdentity::new();
    let blobs = MemoryBlobStore::new();
    let state = DbState::new(documents.clone(), identity.clone(), blobs.clone());
    Harness {
        service: service(db_router(state), &listen()),
        documents,
        identity,
        blobs,
    }
}

fn unavailable() -> UpstreamError {
    UpstreamError::Status {
        service: "test",
        status: 503,
        message: "The service is currently unavailable.".to_owned(),
    }
}

/// Memory documents that remember on whose behalf they were used and can refuse
/// to store profiles.
#[derive(Clone, Default)]
struct AuditedDocuments {
    inner: MemoryDocumentStore,
    callers: Arc<Mutex<Vec<String>>>,
    refuse_profiles: bool,
}

#[async_trait]
impl DocumentStore for AuditedDocuments {
    async fn get(&self, collection: &str, id: &str) -> UpstreamResult<Option<Document>> {
        self.inner.get(collection, id).await
    }

    async fn list(&self, collection: &str) -> UpstreamResult<Vec<Document>> {
        self.inner.list(collection).await
    }

    async fn find_eq(&self, collection: &str, field: &str, value: FieldValue) -> UpstreamResult<Vec<Document>> {
        self.inner.find_eq(collection, field, value).await
    }

    async fn create(&self, collection: &str, id: Option<&str>, fields: Fields) -> UpstreamResult<Document> {
        if self.refuse_profiles && collection == USERS {
            return Err(unavailable());
        }
        self.inner.create(collection, id, fields).await
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> UpstreamResult<Document> {
        self.inner.update(collection, id, fields).await
    }

    async fn delete(&self, collection: &str, id: &str) -> UpstreamResult<()> {
        self.inner.delete(collection, id).await
    }

    fn on_behalf_of(&self, id_token: &str) -> Arc<dyn DocumentStore> {
        self.callers.lock().push(id_token.to_owned());
        Arc::new(self.clone())
    }
}

/// Memory blobs that stop accepting uploads after `remaining` of them.
#[derive(Clone)]
struct FlakyBlobs {
    inner: MemoryBlobStore,
    remaining: Arc<Mutex<usize>>,
}

#[async_trait]
impl BlobStore for FlakyBlobs {
    async fn upload(&self, object: &str, content_type: &str, data: Bytes) -> UpstreamResult<String> {
        {
            let mut remaining = self.remaining.lock();
            if *remaining == 0 {
                return Err(unavailable());
            }
            *remaining -= 1;
        }
        self.inner.upload(object, content_type, data).await
    }

    fn on_behalf_of(&self, _id_token: &str) -> Arc<dyn BlobStore> {
        Arc::new(self.clone())
    }
}

fn url(path: &str) -> String {
    format!("{BASE}{path}")
}

fn cookie(token: &str) -> String {
    format!("{TOKEN_COOKIE}={token}")
}

/// Register `username` and return its user and session token.
async fn register(service: &Service, username: &str) -> (User, String) {
    let mut res = TestClient::post(url("/auth/register"))
        .json(&json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "secret-pass",
            "name": username.to_uppercase(),
        }))
        .send(service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::CREATED));
    let token = res
        .cookie(TOKEN_COOKIE)
        .map(|c| c.value().to_owned())
        .expect("session cookie");
    let user: User = res.take_json().await.unwrap();
    (user, token)
}

async fn message(res: &mut Response) -> String {
    let body: Value = res.take_json().await.unwrap();
    body["message"].as_str().unwrap_or_default().to_owned()
}

fn multipart(field: &str, files: &[(&str, &[u8])]) -> (String, Vec<u8>) {
    let boundary = "----explore-boundary";
    let mut body = Vec::new();
    for (name, data) in files {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{name}\"\r\nContent-Type: image/jpeg\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={boundary}"), body)
}

#[tokio::test]
async fn test_check_connect() {
    let h = harness();
    let text = TestClient::get(url("/auth/check-connect"))
        .send(&h.service)
        .await
        .take_string()
        .await
        .unwrap();
    assert_eq!(text, "Database Server is running");
}

#[tokio::test]
#[traced_test]
async fn test_register_login_logout() {
    let h = harness();
    let (user, token) = register(&h.service, "traveler").await;
    assert_eq!(user.email, "traveler@example.com");
    assert_eq!(user.name, "TRAVELER");
    assert!(logs_contain("user registered"));

    let mut res = TestClient::get(url("/auth/profile"))
        .add_header("cookie", cookie(&token), true)
        .send(&h.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::OK));
    let profile: User = res.take_json().await.unwrap();
    assert_eq!(profile, user);

    let mut res = TestClient::post(url("/auth/login"))
        .json(&json!({"email": "traveler@example.com", "password": "secret-pass"}))
        .send(&h.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::OK));
    let cookie_attrs = res.cookie(TOKEN_COOKIE).cloned().expect("session cookie");
    assert_eq!(cookie_attrs.http_only(), Some(true));
    let body: Value = res.take_json().await.unwrap();
    assert_eq!(body, json!({"uid": user.id, "message": "Login successful"}));

    let mut res = TestClient::post(url("/auth/logout"))
        .add_header("cookie", cookie(&token), true)
        .send(&h.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::OK));
    assert_eq!(res.cookie(TOKEN_COOKIE).map(|c| c.value().to_owned()), Some(String::new()));
    assert_eq!(message(&mut res).await, "Logout successful");
}

#[tokio::test]
async fn test_login_failures() {
    let h = harness();
    register(&h.service, "traveler").await;

    let mut res = TestClient::post(url("/auth/login"))
        .json(&json!({"email": "traveler@example.com"}))
        .send(&h.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));
    assert_eq!(message(&mut res).await, "Email and password are required.");

    let mut res = TestClient::post(url("/auth/login"))
        .json(&json!({"email": "traveler@example.com", "password": "wrong-pass"}))
        .send(&h.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::UNAUTHORIZED));
    assert_eq!(message(&mut res).await, "Invalid email or password");
    assert!(res.cookie(TOKEN_COOKIE).is_none());

    let mut res = TestClient::post(url("/auth/logout")).send(&h.service).await;
    assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));
    assert_eq!(message(&mut res).await, "User is not logged in.");
}

#[tokio::test]
async fn test_register_rejections() {
    let h = harness();
    let mut res = TestClient::post(url("/auth/register"))
        .json(&json!({"username": "u", "email": "u@example.com", "password": "123", "name": "U"}))
        .send(&h.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));
    assert_eq!(message(&mut res).await, "Password must be at least 6 characters.");

    register(&h.service, "traveler").await;
    let mut res = TestClient::post(url("/auth/register"))
        .json(&json!({
            "username": "again",
            "email": "traveler@example.com",
            "password": "secret-pass",
            "name": "Again",
        }))
        .send(&h.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));
    assert_eq!(message(&mut res).await, "EMAIL_EXISTS");
}

#[tokio::test]
async fn test_user_data() {
    let h = harness();
    let (user, _) = register(&h.service, "traveler").await;

    let mut res = TestClient::get(url(&format!("/auth/getUserData/{}", user.id)))
        .send(&h.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::OK));
    let body: Value = res.take_json().await.unwrap();
    assert_eq!(body["username"], "traveler");
    assert_eq!(body["email"], "traveler@example.com");

    let mut res = TestClient::get(url("/auth/getUserData/nobody")).send(&h.service).await;
    assert_eq!(res.status_code, Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert_eq!(message(&mut res).await, "Failed to fetch user data");
}

#[tokio::test]
async fn test_profile_requires_session() {
    let h = harness();
    let res = TestClient::get(url("/auth/profile")).send(&h.service).await;
    assert_eq!(res.status_code, Some(StatusCode::UNAUTHORIZED));

    let res = TestClient::get(url("/auth/profile"))
        .add_header("cookie", cookie("forged"), true)
        .send(&h.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::UNAUTHORIZED));
}

async fn seed_posts(documents: &MemoryDocumentStore, count: u32) {
    for day in 1..=count {
        let post = BlogPost {
            id: String::new(),
            title: format!("Day {day} in Xi'an"),
            author: (if day % 2 == 0 { "even" } else { "odd" }).to_owned(),
            author_id: String::new(),
            content: (if day == 3 { "Terracotta warriors" } else { "Noodles" }).to_owned(),
            created_at: Some(Utc.with_ymd_and_hms(2024, 11, day, 9, 0, 0).unwrap()),
            images: Vec::new(),
        };
        documents.create(BLOG_POSTS, None, blog_fields(&post)).await.unwrap();
    }
}

#[tokio::test]
async fn test_blog_listing_search_and_pages() {
    let h = harness();
    seed_posts(&h.documents, 7).await;

    let mut res = TestClient::get(url("/api/blogs")).send(&h.service).await;
    let page: Value = res.take_json().await.unwrap();
    assert_eq!(page["totalItems"], 7);
    assert_eq!(page["totalPages"], 2);
    assert_eq!(page["hasNext"], true);
    assert_eq!(page["items"].as_array().map(Vec::len), Some(5));
    assert_eq!(page["items"][0]["title"], "Day 7 in Xi'an");

    let mut res = TestClient::get(url("/api/blogs"))
        .query("page", 2)
        .send(&h.service)
        .await;
    let page: Value = res.take_json().await.unwrap();
    assert_eq!(page["items"].as_array().map(Vec::len), Some(2));
    assert_eq!(page["hasPrev"], true);

    let mut res = TestClient::get(url("/api/blogs"))
        .query("q", "TERRACOTTA")
        .send(&h.service)
        .await;
    let page: Value = res.take_json().await.unwrap();
    assert_eq!(page["totalItems"], 1);
    assert_eq!(page["items"][0]["title"], "Day 3 in Xi'an");

    let mut res = TestClient::get(url("/api/blogs/author/even")).send(&h.service).await;
    let posts: Vec<BlogPost> = res.take_json().await.unwrap();
    assert_eq!(
        posts.iter().map(|p| p.title.as_str()).collect::<Vec<_>>(),
        ["Day 6 in Xi'an", "Day 4 in Xi'an", "Day 2 in Xi'an"]
    );
}

#[tokio::test]
async fn test_blog_authoring() {
    let h = harness();
    let (panda, author) = register(&h.service, "panda").await;
    let (_, other) = register(&h.service, "tiger").await;

    let res = TestClient::post(url("/api/blogs"))
        .json(&json!({"title": "Chengdu", "content": "Hotpot"}))
        .send(&h.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::UNAUTHORIZED));

    let mut res = TestClient::post(url("/api/blogs"))
        .add_header("cookie", cookie(&author), true)
        .json(&json!({"title": "Chengdu", "content": "Hotpot\r\nand pandas", "images": ["memory://a.jpg"]}))
        .send(&h.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::CREATED));
    let post: BlogPost = res.take_json().await.unwrap();
    assert_eq!(post.author, "panda");
    assert_eq!(post.author_id, panda.id);
    assert_eq!(post.content, "Hotpot\nand pandas");
    assert!(!post.id.is_empty());
    assert_eq!(h.documents.count(BLOG_POSTS), 1);

    let mut res = TestClient::post(url("/api/blogs"))
        .add_header("cookie", cookie(&author), true)
        .json(&json!({"title": "", "content": "Hotpot"}))
        .send(&h.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));
    assert_eq!(message(&mut res).await, "Title is required.");

    let post_url = url(&format!("/api/blogs/{}", post.id));
    let res = TestClient::put(&post_url)
        .add_header("cookie", cookie(&other), true)
        .json(&json!({"title": "Hijacked"}))
        .send(&h.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::FORBIDDEN));

    let mut res = TestClient::put(&post_url)
        .add_header("cookie", cookie(&author), true)
        .json(&json!({"title": "Chengdu, again"}))
        .send(&h.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::OK));
    let updated: BlogPost = res.take_json().await.unwrap();
    assert_eq!(updated.title, "Chengdu, again");
    assert_eq!(updated.content, "Hotpot\nand pandas");
    assert_eq!(updated.images, ["memory://a.jpg"]);

    let res = TestClient::delete(&post_url)
        .add_header("cookie", cookie(&other), true)
        .send(&h.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::FORBIDDEN));

    let res = TestClient::delete(&post_url)
        .add_header("cookie", cookie(&author), true)
        .send(&h.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::NO_CONTENT));
    assert_eq!(h.documents.count(BLOG_POSTS), 0);

    let res = TestClient::delete(&post_url)
        .add_header("cookie", cookie(&author), true)
        .send(&h.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::NOT_FOUND));
}

#[tokio::test]
async fn test_image_uploads() {
    let h = harness();
    let (_, token) = register(&h.service, "panda").await;

    let ten: Vec<(String, &[u8])> = (0..10).map(|i| (format!("{i}.jpg"), &b"jpeg"[..])).collect();
    let ten: Vec<(&str, &[u8])> = ten.iter().map(|(name, data)| (name.as_str(), *data)).collect();
    let (content_type, body) = multipart("files", &ten);
    let mut res = TestClient::post(url("/api/images"))
        .add_header("cookie", cookie(&token), true)
        .add_header("content-type", content_type, true)
        .bytes(body)
        .send(&h.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));
    assert_eq!(message(&mut res).await, "You can upload up to 9 images");
    assert!(h.blobs.object_names().is_empty());

    let (content_type, body) = multipart("files", &[("great wall.jpg", &b"jpeg-1"[..]), ("bund.jpg", &b"jpeg-2"[..])]);
    let mut res = TestClient::post(url("/api/images"))
        .add_header("cookie", cookie(&token), true)
        .add_header("content-type", content_type, true)
        .bytes(body)
        .send(&h.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::OK));
    let body: Value = res.take_json().await.unwrap();
    let urls = body["urls"].as_array().cloned().unwrap_or_default();
    assert_eq!(urls.len(), 2);
    assert!(urls[0].as_str().is_some_and(|u| u.starts_with("memory://blog-images/")));
    assert!(urls[0].as_str().is_some_and(|u| u.ends_with("_great_wall.jpg")));

    let (content_type, body) = multipart("file", &[("me.png", &b"png"[..])]);
    let mut res = TestClient::post(url("/auth/avatar"))
        .add_header("content-type", content_type, true)
        .bytes(body)
        .send(&h.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::OK));
    let body: Value = res.take_json().await.unwrap();
    assert!(body["url"].as_str().is_some_and(|u| u.starts_with("memory://images/")));
    assert_eq!(h.blobs.object_names().len(), 3);
}

#[tokio::test]
async fn test_travel_plans() {
    let h = harness();
    let (user, token) = register(&h.service, "planner").await;
    let (_, other) = register(&h.service, "someone").await;

    let mut res = TestClient::post(url("/api/plans"))
        .add_header("cookie", cookie(&token), true)
        .json(&json!({"content": "## Three days in Beijing and around the Great Wall\n\nDay 1: Forbidden City\nDay 2: Mutianyu"}))
        .send(&h.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::CREATED));
    let plan: Value = res.take_json().await.unwrap();
    assert_eq!(plan["title"], "Three days in Beijing and arou...");
    assert_eq!(plan["userId"], user.id.as_str());
    assert_eq!(plan["paragraphs"].as_array().map(Vec::len), Some(3));
    let id = plan["id"].as_str().unwrap_or_default().to_owned();

    let mut res = TestClient::get(url("/api/plans"))
        .add_header("cookie", cookie(&token), true)
        .send(&h.service)
        .await;
    let page: Value = res.take_json().await.unwrap();
    assert_eq!(page["totalItems"], 1);
    assert_eq!(page["items"][0]["id"], id.as_str());

    let mut res = TestClient::get(url("/api/plans"))
        .add_header("cookie", cookie(&other), true)
        .send(&h.service)
        .await;
    let page: Value = res.take_json().await.unwrap();
    assert_eq!(page["totalItems"], 0);

    let plan_url = url(&format!("/api/plans/{id}"));
    let res = TestClient::delete(&plan_url)
        .add_header("cookie", cookie(&other), true)
        .send(&h.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::FORBIDDEN));

    let res = TestClient::delete(&plan_url)
        .add_header("cookie", cookie(&token), true)
        .send(&h.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::NO_CONTENT));
}

#[tokio::test]
async fn test_cors_preflight() {
    let h = harness();
    let res = TestClient::options(url("/api/blogs"))
        .add_header("origin", "http://localhost:5173", true)
        .add_header("access-control-request-method", "POST", true)
        .send(&h.service)
        .await;
    assert!(res.headers().get("access-control-allow-origin").is_some());
}

#[tokio::test]
async fn test_usernames_are_unique() {
    let h = harness();
    register(&h.service, "panda").await;

    let taken = json!({
        "username": "panda",
        "email": "impostor@example.com",
        "password": "secret-pass",
        "name": "Impostor",
    });
    let mut res = TestClient::post(url("/auth/register"))
        .json(&taken)
        .send(&h.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));
    assert_eq!(message(&mut res).await, "Username is already taken.");
    assert!(res.cookie(TOKEN_COOKIE).is_none());
    assert_eq!(h.documents.count(USERS), 1);

    // The rejected account was removed, so its e-mail can register again.
    let mut res = TestClient::post(url("/auth/register"))
        .json(&json!({
            "username": "red-panda",
            "email": "impostor@example.com",
            "password": "secret-pass",
            "name": "Red Panda",
        }))
        .send(&h.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::CREATED));
    let user: User = res.take_json().await.unwrap();
    assert_eq!(user.username, "red-panda");
}

#[tokio::test]
async fn test_posts_belong_to_accounts_not_usernames() {
    let h = harness();
    let (_, owner) = register(&h.service, "panda").await;
    let (impostor, impostor_token) = register(&h.service, "impostor").await;

    let mut res = TestClient::post(url("/api/blogs"))
        .add_header("cookie", cookie(&owner), true)
        .json(&json!({"title": "Chengdu", "content": "Hotpot"}))
        .send(&h.service)
        .await;
    let post: BlogPost = res.take_json().await.unwrap();

    // A profile that ends up with the same username still cannot touch the post.
    h.documents
        .update(USERS, &impostor.id, Fields::from([("username".to_owned(), FieldValue::from("panda"))]))
        .await
        .unwrap();
    let post_url = url(&format!("/api/blogs/{}", post.id));
    let res = TestClient::put(&post_url)
        .add_header("cookie", cookie(&impostor_token), true)
        .json(&json!({"title": "Hijacked"}))
        .send(&h.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::FORBIDDEN));
    let res = TestClient::delete(&post_url)
        .add_header("cookie", cookie(&impostor_token), true)
        .send(&h.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::FORBIDDEN));
    assert_eq!(h.documents.count(BLOG_POSTS), 1);
}

#[tokio::test]
async fn test_posts_without_author_id_fall_back_to_username() {
    let h = harness();
    let (_, panda) = register(&h.service, "panda").await;
    let (_, tiger) = register(&h.service, "tiger").await;
    let legacy = BlogPost {
        id: String::new(),
        title: "Old post".to_owned(),
        author: "panda".to_owned(),
        author_id: String::new(),
        content: "Written before author ids".to_owned(),
        created_at: None,
        images: Vec::new(),
    };
    let mut fields = blog_fields(&legacy);
    fields.remove("authorId");
    let doc = h.documents.create(BLOG_POSTS, None, fields).await.unwrap();
    let post_url = url(&format!("/api/blogs/{}", doc.id));

    let res = TestClient::delete(&post_url)
        .add_header("cookie", cookie(&tiger), true)
        .send(&h.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::FORBIDDEN));
    let res = TestClient::delete(&post_url)
        .add_header("cookie", cookie(&panda), true)
        .send(&h.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::NO_CONTENT));
}

#[tokio::test]
#[traced_test]
async fn test_failed_profile_write_removes_account() {
    let identity = MemoryIdentity::new();
    let documents = AuditedDocuments {
        refuse_profiles: true,
        ..AuditedDocuments::default()
    };
    let state = DbState::new(documents.clone(), identity.clone(), MemoryBlobStore::new());
    let service = service(db_router(state), &listen());

    let credentials = json!({"email": "traveler@example.com", "password": "secret-pass"});
    let res = TestClient::post(url("/auth/register"))
        .json(&json!({
            "username": "traveler",
            "email": "traveler@example.com",
            "password": "secret-pass",
            "name": "Traveler",
        }))
        .send(&service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::BAD_GATEWAY));
    assert!(res.cookie(TOKEN_COOKIE).is_none());
    assert!(logs_contain("registration rolled back"));
    assert_eq!(identity.token_count(), 0);

    let mut res = TestClient::post(url("/auth/login"))
        .json(&credentials)
        .send(&service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::UNAUTHORIZED));
    assert_eq!(message(&mut res).await, "Invalid email or password");
}

#[tokio::test]
async fn test_writes_are_made_as_the_caller() {
    let documents = AuditedDocuments::default();
    let state = DbState::new(documents.clone(), MemoryIdentity::new(), MemoryBlobStore::new());
    let service = service(db_router(state), &listen());

    let (_, token) = register(&service, "panda").await;
    assert_eq!(documents.callers.lock().as_slice(), [token.clone()]);

    let res = TestClient::post(url("/api/blogs"))
        .add_header("cookie", cookie(&token), true)
        .json(&json!({"title": "Chengdu", "content": "Hotpot"}))
        .send(&service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::CREATED));
    let res = TestClient::post(url("/api/plans"))
        .add_header("cookie", cookie(&token), true)
        .json(&json!({"content": "Day 1: Wide and Narrow Alley"}))
        .send(&service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::CREATED));

    let callers = documents.callers.lock();
    assert!(callers.len() >= 3);
    assert!(callers.iter().all(|caller| *caller == token));
}

#[tokio::test]
async fn test_body_limits() {
    let h = harness();
    let (_, token) = register(&h.service, "panda").await;

    let mut res = TestClient::post(url("/api/blogs"))
        .add_header("cookie", cookie(&token), true)
        .json(&json!({"title": "Long", "content": "x".repeat(JSON_LIMIT)}))
        .send(&h.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));
    assert_eq!(message(&mut res).await, "Request body is too large.");
    assert_eq!(h.documents.count(BLOG_POSTS), 0);

    // Well above the default form limit but inside the upload limit.
    let photo = vec![0xAB_u8; 512 * 1024];
    let (content_type, body) = multipart("files", &[("terracotta.jpg", &photo[..])]);
    let res = TestClient::post(url("/api/images"))
        .add_header("cookie", cookie(&token), true)
        .add_header("content-type", content_type, true)
        .bytes(body)
        .send(&h.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::OK));
    let stored = h.blobs.object_names();
    assert_eq!(stored.len(), 1);
    assert_eq!(h.blobs.get(&stored[0]).map(|(_, data)| data.len()), Some(photo.len()));

    let oversized = vec![0_u8; UPLOAD_LIMIT as usize + 1];
    let (content_type, body) = multipart("files", &[("huge.jpg", &oversized[..])]);
    let res = TestClient::post(url("/api/images"))
        .add_header("cookie", cookie(&token), true)
        .add_header("content-type", content_type, true)
        .bytes(body)
        .send(&h.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::PAYLOAD_TOO_LARGE));
    assert_eq!(h.blobs.object_names().len(), 1);
}

#[tokio::test]
#[traced_test]
async fn test_partial_image_upload_is_logged() {
    let blobs = FlakyBlobs {
        inner: MemoryBlobStore::new(),
        remaining: Arc::new(Mutex::new(1)),
    };
    let state = DbState::new(MemoryDocumentStore::new(), MemoryIdentity::new(), blobs.clone());
    let service = service(db_router(state), &listen());
    let (_, token) = register(&service, "panda").await;

    let (content_type, body) = multipart("files", &[("one.jpg", &b"jpeg-1"[..]), ("two.jpg", &b"jpeg-2"[..])]);
    let res = TestClient::post(url("/api/images"))
        .add_header("cookie", cookie(&token), true)
        .add_header("content-type", content_type, true)
        .bytes(body)
        .send(&service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::BAD_GATEWAY));
    assert_eq!(blobs.inner.object_names().len(), 1);
    assert!(logs_contain("earlier objects left in the bucket"));
    assert!(logs_contain("_one.jpg"));
}

//! Mapping between domain entities and stored documents.
use explore_domain::{BlogPatch, BlogPost, TravelPlan, User};
use explore_upstream::{Document, Fields, Value};

pub const USERS: &str = "users";
pub const BLOG_POSTS: &str = "blogPosts";
pub const TRAVEL_PLANS: &str = "TravelPlan";

pub fn user_fields(user: &User) -> Fields {
    Fields::from([
        ("id".to_owned(), Value::from(user.id.as_str())),
        ("username".to_owned(), Value::from(user.username.as_str())),
        ("email".to_owned(), Value::from(user.email.as_str())),
        ("avatar".to_owned(), Value::from(user.avatar.as_str())),
        ("name".to_owned(), Value::from(user.name.as_str())),
    ])
}

pub fn user_from_document(doc: &Document) -> User {
    User {
        id: doc.str("id").unwrap_or(&doc.id).to_owned(),
        username: doc.string("username"),
        email: doc.string("email"),
        avatar: doc.string("avatar"),
        name: doc.string("name"),
    }
}

pub fn blog_fields(post: &BlogPost) -> Fields {
    let mut fields = Fields::from([
        ("title".to_owned(), Value::from(post.title.as_str())),
        ("author".to_owned(), Value::from(post.author.as_str())),
        ("authorId".to_owned(), Value::from(post.author_id.as_str())),
        ("content".to_owned(), Value::from(post.content.as_str())),
        ("images".to_owned(), Value::strings(&post.images)),
    ]);
    if let Some(created_at) = post.created_at {
        fields.insert("createdAt".to_owned(), Value::from(created_at));
    }
    fields
}

/// Only the fields a patch touches, so an update leaves the rest alone.
pub fn blog_patch_fields(patched: &BlogPost, patch: &BlogPatch) -> Fields {
    let mut fields = Fields::new();
    if patch.title.is_some() {
        fields.insert("title".to_owned(), Value::from(patched.title.as_str()));
    }
    if patch.content.is_some() {
        fields.insert("content".to_owned(), Value::from(patched.content.as_str()));
    }
    fields
}

pub fn blog_from_document(doc: &Document) -> BlogPost {
    BlogPost {
        id: doc.id.clone(),
        title: doc.string("title"),
        author: doc.string("author"),
        author_id: doc.string("authorId"),
        content: doc.string("content"),
        created_at: doc.timestamp("createdAt").or(doc.create_time),
        images: doc.strings("images"),
    }
}

pub fn plan_fields(plan: &TravelPlan) -> Fields {
    let mut fields = Fields::from([
        ("content".to_owned(), Value::from(plan.content.as_str())),
        ("userId".to_owned(), Value::from(plan.user_id.as_str())),
        ("title".to_owned(), Value::from(plan.title.as_str())),
    ]);
    if let Some(timestamp) = plan.timestamp {
        fields.insert("timestamp".to_owned(), Value::from(timestamp));
    }
    fields
}

pub fn plan_from_document(doc: &Document) -> TravelPlan {
    TravelPlan {
        id: doc.id.clone(),
        content: doc.string("content"),
        timestamp: doc.timestamp("timestamp").or(doc.create_time),
        user_id: doc.string("userId"),
        title: doc.string("title"),
    }
}

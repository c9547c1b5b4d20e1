//! Blog posts, their validation and the in-memory search used by the listing.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Result, User, ValidationError, require};

/// Longest post body accepted, counted in characters.
pub const MAX_CONTENT_CHARS: usize = 1000;
/// Most images a single post may carry.
pub const MAX_IMAGES: usize = 9;

/// A post as stored in the `blogPosts` collection.
///
/// `author` is the writer's username copied at creation time, not a reference to
/// the `users` collection. `author_id` is the writer's account id; posts written
/// before it was recorded have it empty.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub id: String,
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub author_id: String,
    pub content: String,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Body of `POST /api/blogs`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct NewBlogPost {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub images: Vec<String>,
}

impl NewBlogPost {
    pub fn validate(&self) -> Result<()> {
        require("Title", &self.title)?;
        require("Content", &self.content)?;
        check_content(&self.content)?;
        check_images(self.images.len())
    }

    /// Build the stored post; the id is assigned by the document store.
    pub fn into_post(self, author: &User, created_at: DateTime<Utc>) -> BlogPost {
        BlogPost {
            id: String::new(),
            title: self.title.trim().to_owned(),
            author: author.username.clone(),
            author_id: author.id.clone(),
            content: normalize_line_breaks(&self.content),
            created_at: Some(created_at),
            images: self.images,
        }
    }
}

/// Body of `PUT /api/blogs/{id}`. Only title and content are editable.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct BlogPatch {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl BlogPatch {
    pub fn validate(&self) -> Result<()> {
        if self.title.is_none() && self.content.is_none() {
            return Err(ValidationError::EmptyPatch);
        }
        if let Some(title) = &self.title {
            require("Title", title)?;
        }
        if let Some(content) = &self.content {
            require("Content", content)?;
            check_content(content)?;
        }
        Ok(())
    }

    pub fn apply(&self, post: &mut BlogPost) {
        if let Some(title) = &self.title {
            post.title = title.trim().to_owned();
        }
        if let Some(content) = &self.content {
            post.content = normalize_line_breaks(content);
        }
    }
}

impl BlogPost {
    /// Whether `user` wrote the post. Posts without an `author_id` fall back to the
    /// username.
    pub fn is_written_by(&self, user: &User) -> bool {
        if self.author_id.is_empty() {
            self.author == user.username
        } else {
            self.author_id == user.id
        }
    }
}

fn check_content(content: &str) -> Result<()> {
    if content.chars().count() > MAX_CONTENT_CHARS {
        return Err(ValidationError::TooLong {
            field: "Content",
            max: MAX_CONTENT_CHARS,
        });
    }
    Ok(())
}

/// Fails once more than [`MAX_IMAGES`] images are attached.
pub fn check_images(count: usize) -> Result<()> {
    if count > MAX_IMAGES {
        Err(ValidationError::TooManyImages(MAX_IMAGES))
    } else {
        Ok(())
    }
}

/// Turn `\r\n` and lone `\r` into `\n`.
pub fn normalize_line_breaks(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Case-insensitive substring match against title, author or content.
///
/// A blank query matches every post.
pub fn matches_query(post: &BlogPost, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }
    [&post.title, &post.author, &post.content]
        .iter()
        .any(|field| field.to_lowercase().contains(&query))
}

/// Keep the posts matching `query`, preserving their order.
pub fn search(posts: Vec<BlogPost>, query: &str) -> Vec<BlogPost> {
    posts.into_iter().filter(|post| matches_query(post, query)).collect()
}

/// Newest first. Posts without a timestamp go last.
pub fn sort_newest_first(posts: &mut [BlogPost]) {
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

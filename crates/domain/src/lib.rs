//! Entities and plain logic shared by the ExploreChinaNow servers.
//!
//! Nothing in this crate talks to the network. The servers load documents through
//! `explore-upstream`, turn them into the types defined here and apply the search,
//! pagination and validation rules before answering the browser.
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod blog;
pub mod catalog;
pub mod chat;
mod error;
pub mod page;
pub mod plan;
pub mod user;

pub use blog::{BlogPatch, BlogPost, NewBlogPost};
pub use chat::{ChatCompletion, ChatMessage, ChatRequest, Role, Transcript};
pub use error::ValidationError;
pub use page::{Page, paginate};
pub use plan::{NewPlan, TravelPlan};
pub use user::{Credentials, Registration, User};

/// A specialized Result type for validation of user input.
pub type Result<T> = std::result::Result<T, ValidationError>;

pub(crate) fn require(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(ValidationError::Required(field))
    } else {
        Ok(())
    }
}

//! Blog posts: listing, search, authoring.
use chrono::Utc;
use explore_domain::blog::{search, sort_newest_first};
use explore_domain::page::BLOG_PAGE_SIZE;
use explore_domain::{BlogPatch, BlogPost, NewBlogPost, Page, User, paginate};
use explore_upstream::{DocumentStore, Value};
use salvo::http::StatusCode;
use salvo::prelude::*;

use super::{page_param, read_json};
use crate::error::{AppError, AppResult};
use crate::records::{BLOG_POSTS, blog_fields, blog_from_document, blog_patch_fields};
use crate::session::SessionDepotExt;
use crate::state::StateDepotExt;

/// `GET /api/blogs?q=&page=`: newest first, filtered, five per page.
#[handler]
pub(crate) async fn list_blogs(req: &mut Request, depot: &mut Depot) -> AppResult<Json<Page<BlogPost>>> {
    let query = req.query::<String>("q").unwrap_or_default();
    let page = page_param(req);
    let state = depot.db_state()?.clone();
    let mut posts: Vec<BlogPost> = state
        .documents
        .list(BLOG_POSTS)
        .await?
        .iter()
        .map(blog_from_document)
        .collect();
    sort_newest_first(&mut posts);
    Ok(Json(paginate(search(posts, &query), page, BLOG_PAGE_SIZE)))
}

#[handler]
pub(crate) async fn author_blogs(req: &mut Request, depot: &mut Depot) -> AppResult<Json<Vec<BlogPost>>> {
    let author = req.param::<String>("author").unwrap_or_default();
    let state = depot.db_state()?.clone();
    let mut posts: Vec<BlogPost> = state
        .documents
        .find_eq(BLOG_POSTS, "author", Value::from(author))
        .await?
        .iter()
        .map(blog_from_document)
        .collect();
    sort_newest_first(&mut posts);
    Ok(Json(posts))
}

#[handler]
pub(crate) async fn create_blog(req: &mut Request, depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    let draft: NewBlogPost = read_json(req).await?;
    draft.validate()?;
    let session = depot.session()?;
    let documents = depot.db_state()?.documents_for(session);
    let mut post = draft.into_post(&session.user, Utc::now());
    let doc = documents.create(BLOG_POSTS, None, blog_fields(&post)).await?;
    post.id = doc.id;
    tracing::info!(id = %post.id, author = %post.author, "blog post created");
    res.status_code(StatusCode::CREATED);
    res.render(Json(post));
    Ok(())
}

#[handler]
pub(crate) async fn update_blog(req: &mut Request, depot: &mut Depot) -> AppResult<Json<BlogPost>> {
    let id = req.param::<String>("id").unwrap_or_default();
    let patch: BlogPatch = read_json(req).await?;
    patch.validate()?;
    let session = depot.session()?;
    let documents = depot.db_state()?.documents_for(session);
    let mut post = owned_post(documents.as_ref(), &id, &session.user).await?;
    patch.apply(&mut post);
    documents
        .update(BLOG_POSTS, &id, blog_patch_fields(&post, &patch))
        .await?;
    tracing::info!(%id, "blog post updated");
    Ok(Json(post))
}

#[handler]
pub(crate) async fn delete_blog(req: &mut Request, depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    let id = req.param::<String>("id").unwrap_or_default();
    let session = depot.session()?;
    let documents = depot.db_state()?.documents_for(session);
    owned_post(documents.as_ref(), &id, &session.user).await?;
    documents.delete(BLOG_POSTS, &id).await?;
    tracing::info!(%id, "blog post deleted");
    res.status_code(StatusCode::NO_CONTENT);
    Ok(())
}

/// The post `id`, provided `user` wrote it.
async fn owned_post(documents: &dyn DocumentStore, id: &str, user: &User) -> AppResult<BlogPost> {
    let doc = documents
        .get(BLOG_POSTS, id)
        .await?
        .ok_or(AppError::NotFound("Blog post"))?;
    let post = blog_from_document(&doc);
    if !post.is_written_by(user) {
        return Err(AppError::Forbidden("posts"));
    }
    Ok(post)
}

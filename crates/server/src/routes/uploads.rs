//! Multipart image uploads relayed to the blob store.
use std::path::PathBuf;

use bytes::Bytes;
use chrono::Utc;
use explore_domain::blog::check_images;
use explore_upstream::{avatar_object, blog_image_object};
use salvo::http::form::{FilePart, FormData};
use salvo::prelude::*;
use serde::Serialize;

use super::UPLOAD_LIMIT;
use crate::error::{AppError, AppResult};
use crate::session::SessionDepotExt;
use crate::state::StateDepotExt;

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Serialize)]
pub(crate) struct Uploaded {
    url: String,
}

#[derive(Serialize)]
pub(crate) struct UploadedMany {
    urls: Vec<String>,
}

/// What is needed of a multipart file once the form is no longer borrowed.
struct Upload {
    file_name: String,
    content_type: String,
    path: PathBuf,
}

impl From<&FilePart> for Upload {
    fn from(part: &FilePart) -> Self {
        Self {
            file_name: part.name().unwrap_or_default().to_owned(),
            content_type: part
                .content_type()
                .map_or_else(|| FALLBACK_CONTENT_TYPE.to_owned(), |mime| mime.to_string()),
            path: part.path().clone(),
        }
    }
}

impl Upload {
    async fn read(&self) -> AppResult<Bytes> {
        tokio::fs::read(&self.path).await.map(Bytes::from).map_err(|e| {
            tracing::error!(file = %self.file_name, error = ?e, "failed to read uploaded file");
            AppError::Internal
        })
    }
}

/// Parsed multipart form. The upload routes accept bodies up to [`UPLOAD_LIMIT`]
/// instead of salvo's default form limit.
async fn form(req: &mut Request) -> AppResult<&FormData> {
    Ok(req.form_data_max_size(UPLOAD_LIMIT as usize).await?)
}

/// `POST /auth/avatar`, multipart field `file`.
#[handler]
pub(crate) async fn upload_avatar(req: &mut Request, depot: &mut Depot) -> AppResult<Json<Uploaded>> {
    let upload = form(req)
        .await?
        .files
        .get("file")
        .map(Upload::from)
        .ok_or_else(|| AppError::BadRequest("No file uploaded.".to_owned()))?;
    let state = depot.db_state()?.clone();
    let data = upload.read().await?;
    let url = state
        .blobs
        .upload(&avatar_object(&upload.file_name, Utc::now()), &upload.content_type, data)
        .await?;
    Ok(Json(Uploaded { url }))
}

/// `POST /api/images`, multipart field `files`, at most nine per request.
#[handler]
pub(crate) async fn upload_images(req: &mut Request, depot: &mut Depot) -> AppResult<Json<UploadedMany>> {
    let uploads: Vec<Upload> = form(req)
        .await?
        .files
        .get_vec("files")
        .map(|parts| parts.iter().map(Upload::from).collect())
        .unwrap_or_default();
    if uploads.is_empty() {
        return Err(AppError::BadRequest("No file uploaded.".to_owned()));
    }
    check_images(uploads.len())?;
    let blobs = depot.db_state()?.blobs_for(depot.session()?);
    let mut stored: Vec<String> = Vec::with_capacity(uploads.len());
    let mut urls = Vec::with_capacity(uploads.len());
    for upload in &uploads {
        let object = blog_image_object(&upload.file_name);
        let uploaded = match upload.read().await {
            Ok(data) => blobs.upload(&object, &upload.content_type, data).await.map_err(AppError::from),
            Err(e) => Err(e),
        };
        match uploaded {
            Ok(url) => {
                stored.push(object);
                urls.push(url);
            }
            Err(e) => {
                if !stored.is_empty() {
                    tracing::error!(?stored, failed = %object, "image upload stopped, earlier objects left in the bucket");
                }
                return Err(e);
            }
        }
    }
    tracing::info!(count = urls.len(), "blog images uploaded");
    Ok(Json(UploadedMany { urls }))
}

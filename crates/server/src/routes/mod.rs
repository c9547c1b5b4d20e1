pub(crate) mod auth;
pub(crate) mod blogs;
pub(crate) mod chat;
pub(crate) mod map;
pub(crate) mod plans;
pub(crate) mod uploads;
pub(crate) mod videos;

use salvo::Request;
use serde::de::DeserializeOwned;

use crate::error::AppResult;

/// Largest JSON body accepted by any handler.
pub const JSON_LIMIT: usize = 64 * 1024;
/// Largest multipart body accepted by the upload routes.
pub const UPLOAD_LIMIT: u64 = 10 * 1024 * 1024;

pub(crate) async fn read_json<T: DeserializeOwned>(req: &mut Request) -> AppResult<T> {
    Ok(req.parse_json_with_max_size::<T>(JSON_LIMIT).await?)
}

/// 1-based `page` query parameter; anything unparsable reads as the first page.
pub(crate) fn page_param(req: &Request) -> usize {
    req.query::<usize>("page").unwrap_or(1)
}

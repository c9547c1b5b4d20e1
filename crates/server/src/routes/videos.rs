use explore_domain::catalog::{VIDEO_SEARCH_LIMIT, Video, default_videos};
use salvo::prelude::*;

use crate::error::AppResult;
use crate::state::StateDepotExt;

/// `GET /api/videos?q=`: curated videos for a blank query, search results otherwise.
#[handler]
pub(crate) async fn search_videos(req: &mut Request, depot: &mut Depot) -> AppResult<Json<Vec<Video>>> {
    let query = req.query::<String>("q").unwrap_or_default();
    let query = query.trim();
    if query.is_empty() {
        return Ok(Json(default_videos()));
    }
    let state = depot.chat_state()?.clone();
    let videos = state.videos.search(query, VIDEO_SEARCH_LIMIT).await?;
    tracing::debug!(%query, found = videos.len(), "video search");
    Ok(Json(videos))
}

//! Travel video search.
use async_trait::async_trait;
use explore_domain::catalog::Video;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::{ApiKey, UpstreamResult, read_json};

const SERVICE: &str = "video";
const DEFAULT_ENDPOINT: &str = "https://www.googleapis.com/youtube/v3/search";

#[async_trait]
pub trait VideoSearch: Send + Sync + 'static {
    async fn search(&self, query: &str, limit: usize) -> UpstreamResult<Vec<Video>>;
}

/// [`VideoSearch`] over the YouTube Data API `search` endpoint.
#[derive(Clone, Debug)]
pub struct YouTubeClient {
    http: Client,
    endpoint: String,
    api_key: ApiKey,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItem {
    id: ItemId,
    snippet: Snippet,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemId {
    video_id: Option<String>,
}

#[derive(Deserialize)]
struct Snippet {
    title: String,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Default, Deserialize)]
struct Thumbnails {
    medium: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

#[derive(Deserialize)]
struct Thumbnail {
    url: String,
}

impl SearchResponse {
    /// Keep video hits only; channel and playlist hits carry no `videoId`.
    fn into_videos(self) -> Vec<Video> {
        self
            .items
            .into_iter()
            .filter_map(|item| {
                let id = item.id.video_id?;
                let thumbnails = item.snippet.thumbnails;
                let thumbnail = thumbnails.medium.or(thumbnails.default).map(|t| t.url);
                Some(match thumbnail {
                    Some(thumbnail) => Video {
                        id,
                        title: item.snippet.title,
                        thumbnail,
                    },
                    None => Video::from_youtube_id(&id, &item.snippet.title),
                })
            })
            .collect()
    }
}

impl YouTubeClient {
    pub fn new(http: Client, api_key: impl Into<ApiKey>) -> Self {
        Self {
            http,
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            api_key: api_key.into(),
        }
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn url(&self, query: &str, limit: usize) -> UpstreamResult<Url> {
        let mut url = Url::parse(&self.endpoint)?;
        url.query_pairs_mut()
            .append_pair("part", "snippet")
            .append_pair("type", "video")
            .append_pair("q", query)
            .append_pair("maxResults", &limit.to_string())
            .append_pair("key", self.api_key.expose());
        Ok(url)
    }
}

#[async_trait]
impl VideoSearch for YouTubeClient {
    async fn search(&self, query: &str, limit: usize) -> UpstreamResult<Vec<Video>> {
        let response = self.http.get(self.url(query, limit)?).send().await?;
        let found: SearchResponse = read_json(SERVICE, response).await?;
        Ok(found.into_videos())
    }
}

use chrono::{DateTime, Utc};
use color_eyre::eyre::Result;
use serde::{Deserialize, Serialize};

use crate::models::{ChannelStats, VideoStats};

/// Result ordering accepted by `search.list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SearchOrder {
    Date,
    Rating,
    Relevance,
    Title,
    ViewCount,
}

impl SearchOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchOrder::Date => "date",
            SearchOrder::Rating => "rating",
            SearchOrder::Relevance => "relevance",
            SearchOrder::Title => "title",
            SearchOrder::ViewCount => "viewCount",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyStatus {
    Public,
    Unlisted,
    Private,
}

impl PrivacyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrivacyStatus::Public => "public",
            PrivacyStatus::Unlisted => "unlisted",
            PrivacyStatus::Private => "private",
        }
    }

    /// As shown in the YouTube UI
    pub fn label(&self) -> &'static str {
        match self {
            PrivacyStatus::Public => "Public",
            PrivacyStatus::Unlisted => "Unlisted",
            PrivacyStatus::Private => "Private",
        }
    }
}

/// One `search.list` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    pub media_type: String,
    pub category_id: String,
    pub order: SearchOrder,
    pub max_results: u32,
    pub published_after: DateTime<Utc>,
    pub region_code: String,
}

/// Decoupled representation of a search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub channel_id: String,
    pub channel_title: String,
    pub published_at: String,
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRecord {
    pub id: String,
    pub stats: VideoStats,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRecord {
    pub id: String,
    pub stats: ChannelStats,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistDraft {
    pub title: String,
    pub description: String,
    pub privacy: PrivacyStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedPlaylist {
    pub id: String,
}

impl CreatedPlaylist {
    pub fn url(&self) -> String {
        format!("https://www.youtube.com/playlist?list={}", self.id)
    }
}

/// Port trait wrapping the YouTube Data API capabilities used by business logic.
///
/// Implementations live in `services::youtube::client` (production) or test mocks.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait YoutubeApi: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>>;

    /// Statistics for at most one batch of video ids. Unknown ids are simply absent.
    async fn videos(&self, ids: &[String]) -> Result<Vec<VideoRecord>>;

    /// Statistics for at most one batch of channel ids. Unknown ids are simply absent.
    async fn channels(&self, ids: &[String]) -> Result<Vec<ChannelRecord>>;

    /// Succeeds only if the session may read (and so manage) the user's own playlists.
    async fn check_playlist_access(&self) -> Result<()>;

    async fn create_playlist(&self, draft: &PlaylistDraft) -> Result<CreatedPlaylist>;

    async fn add_playlist_item(&self, playlist_id: &str, video_id: &str, position: u32)
    -> Result<()>;
}

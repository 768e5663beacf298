use serde::{Deserialize, Deserializer, Serialize};

/* ---------- Core response envelope ---------- */

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

/* ---------- search.list ---------- */

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams<'a> {
    pub part: &'a str,
    pub q: &'a str,
    #[serde(rename = "type")]
    pub kind: &'a str,
    pub video_category_id: &'a str,
    pub order: &'a str,
    pub max_results: u32,
    /// RFC 3339, UTC with a `Z` suffix
    pub published_after: String,
    pub region_code: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResult {
    pub id: SearchResultId,
    pub snippet: SearchSnippet,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultId {
    /// Absent for channel and playlist results
    #[serde(default)]
    pub video_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSnippet {
    pub published_at: String,
    pub channel_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnails: Thumbnails,
    #[serde(default)]
    pub channel_title: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Thumbnails {
    pub default: Option<Thumbnail>,
    pub medium: Option<Thumbnail>,
    pub high: Option<Thumbnail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thumbnail {
    pub url: String,
}

/* ---------- videos.list ---------- */

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: String,
    #[serde(default)]
    pub statistics: VideoStatistics,
    #[serde(default)]
    pub content_details: VideoContentDetails,
    #[serde(default)]
    pub snippet: VideoSnippet,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatistics {
    #[serde(default, deserialize_with = "count")]
    pub view_count: u64,
    #[serde(default, deserialize_with = "count")]
    pub like_count: u64,
    #[serde(default, deserialize_with = "count")]
    pub comment_count: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoContentDetails {
    #[serde(default)]
    pub duration: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoSnippet {
    #[serde(default)]
    pub tags: Vec<String>,
}

/* ---------- channels.list ---------- */

#[derive(Debug, Clone, Deserialize)]
pub struct Channel {
    pub id: String,
    #[serde(default)]
    pub statistics: ChannelStatistics,
    #[serde(default)]
    pub snippet: ChannelSnippet,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStatistics {
    #[serde(default, deserialize_with = "count")]
    pub view_count: u64,
    /// Absent when the channel hides its subscriber count
    #[serde(default, deserialize_with = "count")]
    pub subscriber_count: u64,
    #[serde(default, deserialize_with = "count")]
    pub video_count: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelSnippet {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub description: String,
}

/* ---------- playlists / playlistItems ---------- */

#[derive(Debug, Clone, Deserialize)]
pub struct Playlist {
    pub id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaylistInsert {
    pub snippet: PlaylistInsertSnippet,
    pub status: PlaylistStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaylistInsertSnippet {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistStatus {
    /// `public`, `unlisted` or `private`
    pub privacy_status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaylistItemInsert {
    pub snippet: PlaylistItemSnippet,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemSnippet {
    pub playlist_id: String,
    pub position: u32,
    pub resource_id: ResourceId,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceId {
    pub kind: String,
    pub video_id: String,
}

impl ResourceId {
    pub fn video(video_id: impl Into<String>) -> Self {
        Self {
            kind: "youtube#video".into(),
            video_id: video_id.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistItem {
    pub id: String,
}

/* ---------- Errors ---------- */

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub errors: Vec<ErrorDetail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub reason: String,
}

/// Statistics counts are sent as decimal strings. Missing or unparsable counts read as zero.
fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Number(u64),
        Text(String),
    }

    Ok(match Option::<Count>::deserialize(deserializer)? {
        Some(Count::Number(n)) => n,
        Some(Count::Text(text)) => text.parse().unwrap_or(0),
        None => 0,
    })
}

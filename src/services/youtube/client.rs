use color_eyre::eyre::Result;
use reqwest::Client;
use url::Url;

use crate::models::{ChannelStats, VideoStats};
use crate::ports::youtube::{
    ChannelRecord, CreatedPlaylist, PlaylistDraft, SearchHit, SearchQuery, VideoRecord, YoutubeApi,
};
use crate::youtube_rs::types::{
    Channel, PlaylistInsert, PlaylistInsertSnippet, PlaylistItemInsert, PlaylistItemSnippet,
    PlaylistStatus, ResourceId, SearchParams, SearchResult, Video,
};
use crate::youtube_rs::{self, Credential};

#[derive(Debug)]
pub struct YoutubeHttpAdapter {
    client: Client,
    base_url: Url,
    credential: Credential,
}

impl YoutubeHttpAdapter {
    pub fn new(base_url: Url, credential: Credential) -> Self {
        Self {
            client: Client::new(),
            base_url,
            credential,
        }
    }

    #[cfg(test)]
    pub fn credential(&self) -> &Credential {
        &self.credential
    }
}

fn to_hit(result: SearchResult) -> Option<SearchHit> {
    let video_id = result.id.video_id?;
    let snippet = result.snippet;
    let thumbnail_url = snippet
        .thumbnails
        .medium
        .or(snippet.thumbnails.high)
        .or(snippet.thumbnails.default)
        .map(|thumbnail| thumbnail.url);

    Some(SearchHit {
        video_id,
        title: snippet.title,
        description: snippet.description,
        channel_id: snippet.channel_id,
        channel_title: snippet.channel_title,
        published_at: snippet.published_at,
        thumbnail_url,
    })
}

fn to_video_record(video: Video) -> VideoRecord {
    VideoRecord {
        id: video.id,
        stats: VideoStats {
            view_count: video.statistics.view_count,
            like_count: video.statistics.like_count,
            comment_count: video.statistics.comment_count,
            duration: video.content_details.duration,
            tags: video.snippet.tags,
        },
    }
}

fn to_channel_record(channel: Channel) -> ChannelRecord {
    ChannelRecord {
        id: channel.id,
        stats: ChannelStats {
            subscriber_count: channel.statistics.subscriber_count,
            view_count: channel.statistics.view_count,
            video_count: channel.statistics.video_count,
            country: channel.snippet.country.unwrap_or_default(),
            description: channel.snippet.description,
        },
    }
}

#[async_trait::async_trait]
impl YoutubeApi for YoutubeHttpAdapter {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>> {
        let params = SearchParams {
            part: "id,snippet",
            q: &query.text,
            kind: &query.media_type,
            video_category_id: &query.category_id,
            order: query.order.as_str(),
            max_results: query.max_results,
            published_after: query
                .published_after
                .to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            region_code: &query.region_code,
        };
        let results =
            youtube_rs::search_videos(&self.client, &self.base_url, &self.credential, &params)
                .await?;
        Ok(results.into_iter().filter_map(to_hit).collect())
    }

    async fn videos(&self, ids: &[String]) -> Result<Vec<VideoRecord>> {
        let videos =
            youtube_rs::list_videos(&self.client, &self.base_url, &self.credential, ids).await?;
        Ok(videos.into_iter().map(to_video_record).collect())
    }

    async fn channels(&self, ids: &[String]) -> Result<Vec<ChannelRecord>> {
        let channels =
            youtube_rs::list_channels(&self.client, &self.base_url, &self.credential, ids).await?;
        Ok(channels.into_iter().map(to_channel_record).collect())
    }

    async fn check_playlist_access(&self) -> Result<()> {
        youtube_rs::list_my_playlists(&self.client, &self.base_url, &self.credential, 1).await?;
        Ok(())
    }

    async fn create_playlist(&self, draft: &PlaylistDraft) -> Result<CreatedPlaylist> {
        let body = PlaylistInsert {
            snippet: PlaylistInsertSnippet {
                title: draft.title.clone(),
                description: draft.description.clone(),
            },
            status: PlaylistStatus {
                privacy_status: draft.privacy.as_str().to_string(),
            },
        };
        let playlist =
            youtube_rs::insert_playlist(&self.client, &self.base_url, &self.credential, &body)
                .await?;
        Ok(CreatedPlaylist { id: playlist.id })
    }

    async fn add_playlist_item(
        &self,
        playlist_id: &str,
        video_id: &str,
        position: u32,
    ) -> Result<()> {
        let body = PlaylistItemInsert {
            snippet: PlaylistItemSnippet {
                playlist_id: playlist_id.to_string(),
                position,
                resource_id: ResourceId::video(video_id),
            },
        };
        let item =
            youtube_rs::insert_playlist_item(&self.client, &self.base_url, &self.credential, &body)
                .await?;
        tracing::debug!(item_id = %item.id, video_id, position, "Added playlist item");
        Ok(())
    }
}

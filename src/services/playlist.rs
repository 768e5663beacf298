use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use color_eyre::eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::config::PlaylistSettings;
use crate::models::{EnrichedCandidate, Skip, Stage, group_thousands, sort_by_popularity};
use crate::ports::youtube::{PlaylistDraft, YoutubeApi};
use crate::services::session::Session;

pub const YOUTUBE_HOME: &str = "https://www.youtube.com/";

/// File written when a playlist cannot be created through the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualGuide {
    pub playlist_name: String,
    pub total_videos: usize,
    pub instructions: Vec<String>,
    pub videos: Vec<GuideEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuideEntry {
    /// 1-based
    pub position: usize,
    pub title: String,
    pub artist: String,
    pub url: String,
    pub views: u64,
    pub subscribers: u64,
}

#[derive(Debug)]
pub enum PlaylistResult {
    /// Nothing to put in a playlist
    Empty,
    Created {
        id: String,
        url: String,
        added: usize,
        skips: Vec<Skip>,
    },
    ManualGuide {
        path: PathBuf,
        guide: ManualGuide,
    },
}

pub struct PlaylistAssembler<'a> {
    settings: &'a PlaylistSettings,
    max_subscribers: u64,
}

impl<'a> PlaylistAssembler<'a> {
    pub fn new(settings: &'a PlaylistSettings, max_subscribers: u64) -> Self {
        Self {
            settings,
            max_subscribers,
        }
    }

    pub fn playlist_name(&self, today: NaiveDate) -> String {
        format!("{} {}", self.settings.name_prefix, today.format("%Y-%m-%d"))
    }

    fn description(&self, today: NaiveDate) -> String {
        format!(
            "Up-and-coming Afrobeats artists discovered on {}. All artists have under {} subscribers. Authentic Nigerian/Ghanaian music only.",
            today.format("%Y-%m-%d"),
            group_thousands(self.max_subscribers)
        )
    }

    /// Sorts by popularity, then either creates a playlist or writes the manual guide.
    #[instrument(skip_all, fields(candidates = candidates.len(), read_write = session.can_create_playlists()))]
    pub async fn assemble<C: YoutubeApi>(
        &self,
        session: &Session<C>,
        mut candidates: Vec<EnrichedCandidate>,
        today: NaiveDate,
    ) -> Result<PlaylistResult> {
        if candidates.is_empty() {
            tracing::warn!("No videos to create a playlist with");
            return Ok(PlaylistResult::Empty);
        }
        sort_by_popularity(&mut candidates);

        match session {
            Session::ReadWrite(api) => match self.create(api, &candidates, today).await {
                Ok(result) => Ok(result),
                Err(error) => {
                    tracing::warn!(error = %error, "Failed to create playlist, writing manual guide instead");
                    self.write_manual_guide(&candidates, today)
                }
            },
            Session::ReadOnly(_) => self.write_manual_guide(&candidates, today),
        }
    }

    /// Fails only when the playlist itself cannot be created. Item failures are skips.
    async fn create<C: YoutubeApi>(
        &self,
        api: &C,
        sorted: &[EnrichedCandidate],
        today: NaiveDate,
    ) -> Result<PlaylistResult> {
        let draft = PlaylistDraft {
            title: self.playlist_name(today),
            description: self.description(today),
            privacy: self.settings.privacy,
        };
        tracing::info!("Creating YouTube playlist '{}'", draft.title);
        let playlist = api.create_playlist(&draft).await?;
        let url = playlist.url();
        tracing::info!(playlist_id = %playlist.id, "Playlist created: {}", url);

        let mut added = 0;
        let mut skips = Vec::new();
        for (position, enriched) in sorted.iter().take(self.settings.max_items).enumerate() {
            if position > 0 && !self.settings.item_delay.is_zero() {
                tokio::time::sleep(self.settings.item_delay).await;
            }

            let video_id = &enriched.candidate.video_id;
            match api
                .add_playlist_item(&playlist.id, video_id, position as u32)
                .await
            {
                Ok(()) => {
                    added += 1;
                    tracing::info!(
                        "{:2}. {} ({} views)",
                        added,
                        enriched.candidate.title,
                        group_thousands(enriched.view_count())
                    );
                }
                Err(error) => {
                    tracing::warn!(video_id = %video_id, error = %error, "Failed to add video");
                    skips.push(Skip::new(Stage::PlaylistItem, video_id.as_str(), error));
                }
            }
        }

        tracing::info!("Added {} videos to the playlist", added);
        Ok(PlaylistResult::Created {
            id: playlist.id,
            url,
            added,
            skips,
        })
    }

    pub fn manual_guide(&self, sorted: &[EnrichedCandidate], today: NaiveDate) -> ManualGuide {
        let playlist_name = self.playlist_name(today);
        let instructions = vec![
            format!("1. Go to {}", YOUTUBE_HOME),
            "2. Click your profile picture → 'Your channel'".to_string(),
            "3. Click 'CREATE' button → 'New playlist'".to_string(),
            format!("4. Name it: '{}'", playlist_name),
            format!("5. Set to '{}'", self.settings.privacy.label()),
            "6. Use the video URLs below to add each song".to_string(),
        ];
        let videos = sorted
            .iter()
            .take(self.settings.manual_top_n)
            .enumerate()
            .map(|(i, enriched)| GuideEntry {
                position: i + 1,
                title: enriched.candidate.title.clone(),
                artist: enriched.candidate.channel_title.clone(),
                url: enriched.candidate.video_url(),
                views: enriched.view_count(),
                subscribers: enriched.subscriber_count(),
            })
            .collect();

        ManualGuide {
            playlist_name,
            total_videos: sorted.len(),
            instructions,
            videos,
        }
    }

    fn write_manual_guide(
        &self,
        sorted: &[EnrichedCandidate],
        today: NaiveDate,
    ) -> Result<PlaylistResult> {
        let guide = self.manual_guide(sorted, today);
        let path = self.settings.manual_guide_path.clone();
        save_guide(&guide, &path)?;
        tracing::info!("Manual playlist guide saved to {}", path.display());
        Ok(PlaylistResult::ManualGuide { path, guide })
    }
}

fn save_guide(guide: &ManualGuide, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .wrap_err_with(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let contents = serde_json::to_string_pretty(guide)?;
    std::fs::write(path, contents)
        .wrap_err_with(|| format!("Failed to write manual guide: {}", path.display()))
}

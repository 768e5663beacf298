use std::collections::{HashMap, HashSet};

use tracing::instrument;

use crate::config::EnrichmentSettings;
use crate::models::{Candidate, ChannelStats, Skip, Stage, VideoStats};
use crate::ports::youtube::YoutubeApi;

/// Statistics keyed by video id and channel id. Ids the API did not return,
/// or whose batch failed, are simply absent.
#[derive(Debug, Default)]
pub struct Enrichment {
    pub videos: HashMap<String, VideoStats>,
    pub channels: HashMap<String, ChannelStats>,
    pub skips: Vec<Skip>,
}

pub struct StatsEnricher<'a, C: YoutubeApi> {
    api: &'a C,
    settings: &'a EnrichmentSettings,
}

impl<'a, C: YoutubeApi> StatsEnricher<'a, C> {
    pub fn new(api: &'a C, settings: &'a EnrichmentSettings) -> Self {
        Self { api, settings }
    }

    #[instrument(skip_all, fields(candidates = candidates.len()))]
    pub async fn enrich(&self, candidates: &[Candidate]) -> Enrichment {
        let video_ids = distinct(candidates.iter().map(|c| c.video_id.as_str()));
        let channel_ids = distinct(candidates.iter().map(|c| c.channel_id.as_str()));
        let mut enrichment = Enrichment::default();

        tracing::info!("Getting detailed video statistics...");
        for (index, batch) in video_ids.chunks(self.batch_size()).enumerate() {
            self.pause(index).await;
            match self.api.videos(batch).await {
                Ok(records) => {
                    for record in records {
                        enrichment.videos.insert(record.id, record.stats);
                    }
                }
                Err(error) => {
                    tracing::warn!(batch = index, error = %error, "Video stats batch failed");
                    enrichment.skips.push(Skip::new(
                        Stage::VideoStats,
                        describe_batch(index, batch),
                        error,
                    ));
                }
            }
        }

        tracing::info!("Getting channel statistics...");
        for (index, batch) in channel_ids.chunks(self.batch_size()).enumerate() {
            self.pause(index).await;
            match self.api.channels(batch).await {
                Ok(records) => {
                    for record in records {
                        enrichment.channels.insert(record.id, record.stats);
                    }
                }
                Err(error) => {
                    tracing::warn!(batch = index, error = %error, "Channel stats batch failed");
                    enrichment.skips.push(Skip::new(
                        Stage::ChannelStats,
                        describe_batch(index, batch),
                        error,
                    ));
                }
            }
        }

        tracing::debug!(
            videos = enrichment.videos.len(),
            channels = enrichment.channels.len(),
            "Enrichment finished"
        );
        enrichment
    }

    fn batch_size(&self) -> usize {
        self.settings.batch_size.max(1)
    }

    async fn pause(&self, index: usize) {
        if index > 0 && !self.settings.delay.is_zero() {
            tokio::time::sleep(self.settings.delay).await;
        }
    }
}

/// Distinct ids in first-seen order.
fn distinct<'a>(ids: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(*id))
        .map(str::to_string)
        .collect()
}

fn describe_batch(index: usize, batch: &[String]) -> String {
    format!("batch {} ({} ids starting at {})", index + 1, batch.len(), batch[0])
}

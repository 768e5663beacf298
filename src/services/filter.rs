use std::fmt;

use tracing::instrument;

use crate::config::Thresholds;
use crate::models::{Candidate, ChannelStats, EnrichedCandidate, VideoStats};
use crate::services::classifier::TextClassifier;
use crate::services::enrich::Enrichment;

impl Thresholds {
    pub fn is_up_and_coming(&self, video: &VideoStats, channel: &ChannelStats) -> bool {
        channel.subscriber_count <= self.max_subscribers
            && channel.view_count <= self.max_channel_views
            && video.view_count >= self.min_video_views
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    MissingVideoStats,
    MissingChannelStats,
    NotUpAndComing,
    FailedTagCheck,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Rejection::MissingVideoStats => "no video statistics",
            Rejection::MissingChannelStats => "no channel statistics",
            Rejection::NotUpAndComing => "outside popularity thresholds",
            Rejection::FailedTagCheck => "failed classification with tags",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Default)]
pub struct FilterOutcome {
    /// In input order
    pub accepted: Vec<EnrichedCandidate>,
    /// Video id and why it was dropped
    pub rejected: Vec<(String, Rejection)>,
}

pub struct PopularityFilter<'a> {
    thresholds: &'a Thresholds,
    classifier: &'a TextClassifier,
}

impl<'a> PopularityFilter<'a> {
    pub fn new(thresholds: &'a Thresholds, classifier: &'a TextClassifier) -> Self {
        Self {
            thresholds,
            classifier,
        }
    }

    fn check(
        &self,
        candidate: &Candidate,
        enrichment: &Enrichment,
    ) -> Result<EnrichedCandidate, Rejection> {
        let video = enrichment
            .videos
            .get(&candidate.video_id)
            .ok_or(Rejection::MissingVideoStats)?;
        let channel = enrichment
            .channels
            .get(&candidate.channel_id)
            .ok_or(Rejection::MissingChannelStats)?;

        if !self.thresholds.is_up_and_coming(video, channel) {
            return Err(Rejection::NotUpAndComing);
        }

        // Search results carry no tags, so classify again now that they are known
        if !self.classifier.classify(
            &candidate.title,
            &candidate.description,
            &candidate.channel_title,
            &video.tags,
        ) {
            return Err(Rejection::FailedTagCheck);
        }

        Ok(EnrichedCandidate {
            candidate: candidate.clone(),
            video: video.clone(),
            channel: channel.clone(),
        })
    }

    #[instrument(skip_all, fields(candidates = candidates.len()))]
    pub fn filter(&self, candidates: &[Candidate], enrichment: &Enrichment) -> FilterOutcome {
        let mut outcome = FilterOutcome::default();

        for candidate in candidates {
            match self.check(candidate, enrichment) {
                Ok(enriched) => {
                    tracing::info!(
                        "Up-and-coming: {} by {} ({} subscribers, {} views)",
                        enriched.candidate.title,
                        enriched.candidate.channel_title,
                        enriched.subscriber_count(),
                        enriched.view_count(),
                    );
                    outcome.accepted.push(enriched);
                }
                Err(rejection) => {
                    tracing::debug!(video_id = %candidate.video_id, %rejection, "Dropped candidate");
                    outcome
                        .rejected
                        .push((candidate.video_id.clone(), rejection));
                }
            }
        }

        tracing::info!("Found {} up-and-coming artists", outcome.accepted.len());
        outcome
    }
}

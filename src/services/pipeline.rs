use std::path::PathBuf;

use chrono::{DateTime, Local, Utc};
use color_eyre::eyre::Result;
use tracing::instrument;

use crate::config::Config;
use crate::models::{EnrichedCandidate, Skip, sort_by_popularity};
use crate::ports::browser::Browser;
use crate::ports::youtube::YoutubeApi;
use crate::services::classifier::TextClassifier;
use crate::services::enrich::StatsEnricher;
use crate::services::filter::PopularityFilter;
use crate::services::playlist::{ManualGuide, PlaylistAssembler, PlaylistResult, YOUTUBE_HOME};
use crate::services::search::CandidateSearcher;
use crate::services::session::Session;

#[derive(Debug)]
pub enum RunOutcome {
    NoCandidates,
    NoUpAndComing,
    Playlist {
        id: String,
        url: String,
        added: usize,
    },
    ManualGuide {
        path: PathBuf,
        guide: ManualGuide,
    },
}

#[derive(Debug)]
pub struct RunReport {
    /// Distinct candidates that passed the text check during search
    pub candidates: usize,
    /// Sorted by descending views when a playlist or guide was produced
    pub up_and_coming: Vec<EnrichedCandidate>,
    pub outcome: RunOutcome,
    pub skips: Vec<Skip>,
}

/// Search, enrich, filter and assemble, one stage after another.
pub struct Pipeline<'a, C: YoutubeApi> {
    config: &'a Config,
    session: &'a Session<C>,
    browser: Option<&'a dyn Browser>,
    classifier: TextClassifier,
}

impl<'a, C: YoutubeApi> Pipeline<'a, C> {
    pub fn new(
        config: &'a Config,
        session: &'a Session<C>,
        browser: Option<&'a dyn Browser>,
    ) -> Self {
        Self {
            config,
            session,
            browser,
            classifier: TextClassifier::new(&config.classifier),
        }
    }

    fn open(&self, url: &str) {
        let Some(browser) = self.browser else {
            return;
        };
        tracing::info!("Opening {}", url);
        if let Err(error) = browser.open(url) {
            tracing::warn!(error = %error, "Failed to open browser");
        }
    }

    /// The playlist is dated with the local calendar day of `now`.
    #[instrument(skip_all)]
    pub async fn run(&self, now: DateTime<Utc>) -> Result<RunReport> {
        let api = self.session.api();
        let config = self.config;

        let searched = CandidateSearcher::new(
            api,
            &self.classifier,
            &config.search,
            &config.thresholds,
        )
        .search(now)
        .await;
        let mut skips = searched.skips;
        if searched.candidates.is_empty() {
            tracing::warn!("No authentic Afrobeats found");
            return Ok(RunReport {
                candidates: 0,
                up_and_coming: Vec::new(),
                outcome: RunOutcome::NoCandidates,
                skips,
            });
        }
        let candidates = searched.candidates.into_vec();

        let mut enrichment = StatsEnricher::new(api, &config.enrichment)
            .enrich(&candidates)
            .await;
        skips.append(&mut enrichment.skips);

        let filtered = PopularityFilter::new(&config.thresholds, &self.classifier)
            .filter(&candidates, &enrichment);
        if filtered.accepted.is_empty() {
            tracing::warn!("No up-and-coming artists found");
            return Ok(RunReport {
                candidates: candidates.len(),
                up_and_coming: Vec::new(),
                outcome: RunOutcome::NoUpAndComing,
                skips,
            });
        }

        let mut up_and_coming = filtered.accepted;
        sort_by_popularity(&mut up_and_coming);

        let assembler =
            PlaylistAssembler::new(&config.playlist, config.thresholds.max_subscribers);
        let outcome = match assembler
            .assemble(
                self.session,
                up_and_coming.clone(),
                now.with_timezone(&Local).date_naive(),
            )
            .await?
        {
            // unreachable with a non-empty list, kept total for the type
            PlaylistResult::Empty => RunOutcome::NoUpAndComing,
            PlaylistResult::Created {
                id,
                url,
                added,
                skips: item_skips,
            } => {
                skips.extend(item_skips);
                self.open(&url);
                RunOutcome::Playlist { id, url, added }
            }
            PlaylistResult::ManualGuide { path, guide } => {
                self.open(YOUTUBE_HOME);
                RunOutcome::ManualGuide { path, guide }
            }
        };

        Ok(RunReport {
            candidates: candidates.len(),
            up_and_coming,
            outcome,
            skips,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::TimeZone;
    use color_eyre::eyre::eyre;

    use super::*;
    use crate::models::{ChannelStats, Stage, VideoStats};
    use crate::ports::browser::MockBrowser;
    use crate::ports::youtube::{
        ChannelRecord, CreatedPlaylist, MockYoutubeApi, SearchHit, VideoRecord,
    };

    fn test_config(dir: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.search.seed_phrases = vec!["afrobeats lagos".into(), "naija music".into()];
        config.search.delay = Duration::ZERO;
        config.enrichment.delay = Duration::ZERO;
        config.playlist.item_delay = Duration::ZERO;
        config.playlist.manual_guide_path = dir.join("guide.json");
        config
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 9, 30, 0).unwrap()
    }

    fn hit(video_id: &str, channel_id: &str) -> SearchHit {
        SearchHit {
            video_id: video_id.into(),
            title: format!("Naija Afrobeats {} (Official Video)", video_id),
            description: String::new(),
            channel_id: channel_id.into(),
            channel_title: "Lagos Sound".into(),
            published_at: "2026-10-10T00:00:00Z".into(),
            thumbnail_url: None,
        }
    }

    /// v1 and v2 are small channels, v3 belongs to a big one.
    fn api_with_results() -> MockYoutubeApi {
        let mut api = MockYoutubeApi::new();
        api.expect_search().returning(|q| {
            if q.text == "afrobeats lagos" {
                Ok(vec![hit("v1", "small"), hit("v3", "big")])
            } else {
                Ok(vec![hit("v2", "small")])
            }
        });
        api.expect_videos().returning(|ids| {
            Ok(ids
                .iter()
                .map(|id| VideoRecord {
                    id: id.clone(),
                    stats: VideoStats {
                        view_count: if id == "v2" { 50_000 } else { 8_000 },
                        ..Default::default()
                    },
                })
                .collect())
        });
        api.expect_channels().returning(|ids| {
            Ok(ids
                .iter()
                .map(|id| ChannelRecord {
                    id: id.clone(),
                    stats: ChannelStats {
                        subscriber_count: if id == "big" { 300_000 } else { 12_000 },
                        view_count: 400_000,
                        ..Default::default()
                    },
                })
                .collect())
        });
        api
    }

    #[tokio::test]
    async fn test_empty_search_stops_before_enrichment() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());

        let mut api = MockYoutubeApi::new();
        api.expect_search().times(2).returning(|_| Ok(vec![]));
        api.expect_videos().never();
        api.expect_channels().never();
        api.expect_create_playlist().never();

        let mut browser = MockBrowser::new();
        browser.expect_open().never();

        let session = Session::ReadWrite(api);
        let report = Pipeline::new(&config, &session, Some(&browser))
            .run(now())
            .await
            .unwrap();

        assert_eq!(report.candidates, 0);
        assert!(matches!(report.outcome, RunOutcome::NoCandidates));
        assert!(!dir.path().join("guide.json").exists());
    }

    #[tokio::test]
    async fn test_read_write_run_creates_playlist_and_opens_it() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());

        let mut api = api_with_results();
        let expected_title = format!(
            "Afrobeats Up and Coming {}",
            now().with_timezone(&Local).format("%Y-%m-%d")
        );
        api.expect_create_playlist()
            .withf(move |draft| draft.title == expected_title)
            .returning(|_| Ok(CreatedPlaylist { id: "PLx".into() }));
        api.expect_add_playlist_item()
            .times(2)
            .returning(|_, _, _| Ok(()));

        let mut browser = MockBrowser::new();
        browser
            .expect_open()
            .withf(|url| url == "https://www.youtube.com/playlist?list=PLx")
            .times(1)
            .returning(|_| Ok(()));

        let session = Session::ReadWrite(api);
        let report = Pipeline::new(&config, &session, Some(&browser))
            .run(now())
            .await
            .unwrap();

        assert_eq!(report.candidates, 3);
        let ids: Vec<_> = report
            .up_and_coming
            .iter()
            .map(|e| e.candidate.video_id.as_str())
            .collect();
        assert_eq!(ids, vec!["v2", "v1"]);
        assert!(matches!(
            report.outcome,
            RunOutcome::Playlist { added: 2, .. }
        ));
        assert!(report.skips.is_empty());
    }

    #[tokio::test]
    async fn test_read_only_run_writes_guide_and_opens_home() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());

        let mut browser = MockBrowser::new();
        browser
            .expect_open()
            .withf(|url| url == YOUTUBE_HOME)
            .times(1)
            .returning(|_| Err(eyre!("no display")));

        let session = Session::ReadOnly(api_with_results());
        let report = Pipeline::new(&config, &session, Some(&browser))
            .run(now())
            .await
            .unwrap();

        let RunOutcome::ManualGuide { path, guide } = report.outcome else {
            panic!("expected a manual guide");
        };
        assert!(path.exists());
        assert_eq!(guide.total_videos, 2);
        assert_eq!(guide.videos[0].url, "https://youtube.com/watch?v=v2");
    }

    #[tokio::test]
    async fn test_guide_is_named_after_local_date() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let late = Utc.with_ymd_and_hms(2026, 10, 19, 23, 45, 0).unwrap();

        let session = Session::ReadOnly(api_with_results());
        let report = Pipeline::new(&config, &session, None)
            .run(late)
            .await
            .unwrap();

        let RunOutcome::ManualGuide { guide, .. } = report.outcome else {
            panic!("expected a manual guide");
        };
        let local_day = late.with_timezone(&Local).date_naive();
        assert_eq!(
            guide.playlist_name,
            format!("Afrobeats Up and Coming {}", local_day.format("%Y-%m-%d"))
        );
    }

    #[tokio::test]
    async fn test_nothing_up_and_coming() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());

        let mut api = MockYoutubeApi::new();
        api.expect_search()
            .returning(|_| Ok(vec![hit("v3", "big")]));
        api.expect_videos().returning(|_| Err(eyre!("backendError")));
        api.expect_channels().returning(|_| Ok(vec![]));

        let session = Session::ReadOnly(api);
        let report = Pipeline::new(&config, &session, None)
            .run(now())
            .await
            .unwrap();

        assert_eq!(report.candidates, 1);
        assert!(matches!(report.outcome, RunOutcome::NoUpAndComing));
        assert_eq!(report.skips.len(), 1);
        assert_eq!(report.skips[0].stage, Stage::VideoStats);
    }
}

use chrono::{DateTime, Utc};
use tracing::instrument;

use crate::config::{SearchSettings, Thresholds};
use crate::models::{Candidate, CandidateSet, Skip, Stage};
use crate::ports::youtube::{SearchHit, SearchQuery, YoutubeApi};
use crate::services::classifier::TextClassifier;

#[derive(Debug, Default)]
pub struct SearchOutcome {
    pub candidates: CandidateSet,
    pub skips: Vec<Skip>,
}

/// Runs every seed phrase through `search.list` and keeps the hits that pass
/// the text classifier.
pub struct CandidateSearcher<'a, C: YoutubeApi> {
    api: &'a C,
    classifier: &'a TextClassifier,
    settings: &'a SearchSettings,
    max_video_age_days: u32,
}

impl<'a, C: YoutubeApi> CandidateSearcher<'a, C> {
    pub fn new(
        api: &'a C,
        classifier: &'a TextClassifier,
        settings: &'a SearchSettings,
        thresholds: &Thresholds,
    ) -> Self {
        Self {
            api,
            classifier,
            settings,
            max_video_age_days: thresholds.max_video_age_days,
        }
    }

    fn query(&self, phrase: &str, published_after: DateTime<Utc>) -> SearchQuery {
        SearchQuery {
            text: phrase.to_string(),
            media_type: "video".to_string(),
            category_id: self.settings.category_id.clone(),
            order: self.settings.order,
            max_results: self.settings.max_results,
            published_after,
            region_code: self.settings.region_code.clone(),
        }
    }

    /// A failing phrase is recorded as a skip and the next phrase is tried.
    #[instrument(skip_all)]
    pub async fn search(&self, now: DateTime<Utc>) -> SearchOutcome {
        let published_after = published_after(now, self.max_video_age_days);
        let mut outcome = SearchOutcome::default();

        for (index, phrase) in self.settings.seed_phrases.iter().enumerate() {
            if index > 0 && !self.settings.delay.is_zero() {
                tokio::time::sleep(self.settings.delay).await;
            }

            tracing::info!("Searching: {}", phrase);
            let hits = match self.api.search(&self.query(phrase, published_after)).await {
                Ok(hits) => hits,
                Err(error) => {
                    tracing::warn!(phrase = %phrase, error = %error, "Search failed, skipping phrase");
                    outcome.skips.push(Skip::new(Stage::Search, phrase.as_str(), error));
                    continue;
                }
            };

            let mut accepted = 0;
            for hit in hits {
                let candidate = to_candidate(hit);
                if self.classifier.classify(
                    &candidate.title,
                    &candidate.description,
                    &candidate.channel_title,
                    &[],
                ) {
                    outcome.candidates.insert(candidate);
                    accepted += 1;
                }
            }
            tracing::info!("Found {} authentic Afrobeats videos for '{}'", accepted, phrase);
        }

        tracing::info!(
            "Total authentic Afrobeats videos found: {}",
            outcome.candidates.len()
        );
        outcome
    }
}

/// Start of the freshness window. Saturates at the earliest representable time.
fn published_after(now: DateTime<Utc>, max_age_days: u32) -> DateTime<Utc> {
    chrono::Duration::try_days(i64::from(max_age_days))
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn to_candidate(hit: SearchHit) -> Candidate {
    Candidate {
        video_id: hit.video_id,
        title: hit.title,
        description: hit.description,
        channel_id: hit.channel_id,
        channel_title: hit.channel_title,
        published_at: hit.published_at,
        thumbnail_url: hit.thumbnail_url,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::TimeZone;
    use color_eyre::eyre::eyre;
    use mockall::predicate::always;

    use super::*;
    use crate::config::{ClassifierTerms, Config};
    use crate::ports::youtube::{MockYoutubeApi, SearchOrder};

    fn hit(video_id: &str, title: &str) -> SearchHit {
        SearchHit {
            video_id: video_id.into(),
            title: title.into(),
            description: String::new(),
            channel_id: "c1".into(),
            channel_title: "Lagos Sound".into(),
            published_at: "2026-10-01T00:00:00Z".into(),
            thumbnail_url: None,
        }
    }

    fn settings(phrases: &[&str]) -> SearchSettings {
        SearchSettings {
            seed_phrases: phrases.iter().map(|p| p.to_string()).collect(),
            delay: Duration::ZERO,
            ..Config::default().search
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_query_parameters() {
        let mut api = MockYoutubeApi::new();
        api.expect_search()
            .withf(|q| {
                q.text == "lagos afrobeats"
                    && q.media_type == "video"
                    && q.category_id == "10"
                    && q.order == SearchOrder::ViewCount
                    && q.max_results == 20
                    && q.region_code == "NG"
                    && q.published_after == Utc.with_ymd_and_hms(2026, 9, 4, 12, 0, 0).unwrap()
            })
            .times(1)
            .returning(|_| Ok(vec![]));

        let classifier = TextClassifier::new(&ClassifierTerms::default());
        let settings = settings(&["lagos afrobeats"]);
        let thresholds = Thresholds::default();
        let searcher = CandidateSearcher::new(&api, &classifier, &settings, &thresholds);

        let outcome = searcher.search(now()).await;
        assert!(outcome.candidates.is_empty());
        assert!(outcome.skips.is_empty());
    }

    #[tokio::test]
    async fn test_filters_by_text_and_dedupes_with_last_write() {
        let mut api = MockYoutubeApi::new();
        let mut calls = 0;
        api.expect_search().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Ok(vec![
                    hit("v1", "Naija Afrobeats (Official Video)"),
                    hit("v2", "Highlife Cover of Old Naija Song"),
                ])
            } else {
                Ok(vec![hit("v1", "Naija Afrobeats Official Music Video")])
            }
        });

        let classifier = TextClassifier::new(&ClassifierTerms::default());
        let settings = settings(&["first", "second"]);
        let thresholds = Thresholds::default();
        let searcher = CandidateSearcher::new(&api, &classifier, &settings, &thresholds);

        let outcome = searcher.search(now()).await;
        assert_eq!(outcome.candidates.len(), 1);
        assert_eq!(
            outcome.candidates.get("v1").unwrap().title,
            "Naija Afrobeats Official Music Video"
        );
    }

    #[tokio::test]
    async fn test_failing_phrase_is_skipped() {
        let mut api = MockYoutubeApi::new();
        api.expect_search()
            .with(always())
            .returning(|q| {
                if q.text == "broken" {
                    Err(eyre!("quotaExceeded"))
                } else {
                    Ok(vec![hit("v9", "Lagos Afrobeats Official Video")])
                }
            });

        let classifier = TextClassifier::new(&ClassifierTerms::default());
        let settings = settings(&["broken", "working"]);
        let thresholds = Thresholds::default();
        let searcher = CandidateSearcher::new(&api, &classifier, &settings, &thresholds);

        let outcome = searcher.search(now()).await;
        assert_eq!(outcome.candidates.len(), 1);
        assert_eq!(outcome.skips.len(), 1);
        assert_eq!(outcome.skips[0].stage, Stage::Search);
        assert_eq!(outcome.skips[0].subject, "broken");
        assert!(outcome.skips[0].reason.contains("quotaExceeded"));
    }

    #[test]
    fn test_oversized_age_window_saturates() {
        assert_eq!(
            published_after(now(), 45),
            Utc.with_ymd_and_hms(2026, 9, 4, 12, 0, 0).unwrap()
        );
        assert_eq!(published_after(now(), u32::MAX), DateTime::<Utc>::MIN_UTC);
    }

    #[tokio::test]
    async fn test_huge_age_window_still_searches() {
        let mut api = MockYoutubeApi::new();
        api.expect_search()
            .withf(|q| q.published_after == DateTime::<Utc>::MIN_UTC)
            .times(1)
            .returning(|_| Ok(vec![]));

        let classifier = TextClassifier::new(&ClassifierTerms::default());
        let settings = settings(&["lagos afrobeats"]);
        let thresholds = Thresholds {
            max_video_age_days: 4_000_000_000,
            ..Thresholds::default()
        };
        let searcher = CandidateSearcher::new(&api, &classifier, &settings, &thresholds);

        assert!(searcher.search(now()).await.candidates.is_empty());
    }

    #[tokio::test]
    async fn test_no_results_anywhere_is_empty_not_error() {
        let mut api = MockYoutubeApi::new();
        api.expect_search().times(3).returning(|_| Ok(vec![]));

        let classifier = TextClassifier::new(&ClassifierTerms::default());
        let settings = settings(&["a", "b", "c"]);
        let thresholds = Thresholds::default();
        let searcher = CandidateSearcher::new(&api, &classifier, &settings, &thresholds);

        let outcome = searcher.search(now()).await;
        assert!(outcome.candidates.is_empty());
        assert!(outcome.skips.is_empty());
    }
}

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

/// A video found by search, before any statistics are known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub channel_id: String,
    pub channel_title: String,
    pub published_at: String,
    pub thumbnail_url: Option<String>,
}

impl Candidate {
    pub fn video_url(&self) -> String {
        format!("https://youtube.com/watch?v={}", self.video_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VideoStats {
    pub view_count: u64,
    pub like_count: u64,
    pub comment_count: u64,
    /// ISO 8601 duration as reported by the API, e.g. `PT3M12S`
    pub duration: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChannelStats {
    pub subscriber_count: u64,
    pub view_count: u64,
    pub video_count: u64,
    pub country: String,
    pub description: String,
}

/// A candidate that has both statistics entries and passed every filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichedCandidate {
    pub candidate: Candidate,
    pub video: VideoStats,
    pub channel: ChannelStats,
}

impl EnrichedCandidate {
    pub fn view_count(&self) -> u64 {
        self.video.view_count
    }

    pub fn subscriber_count(&self) -> u64 {
        self.channel.subscriber_count
    }
}

/// Formats a count with comma thousands separators, e.g. `250,000`.
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

/// Sorts by descending video view count. Ties keep their input order.
pub fn sort_by_popularity(candidates: &mut [EnrichedCandidate]) {
    candidates.sort_by(|a, b| b.view_count().cmp(&a.view_count()));
}

/// Candidates keyed by video id.
///
/// Inserting an id that is already present replaces the stored record but
/// keeps the slot of the first insertion, so `into_vec` yields ids in the order
/// they were first seen.
#[derive(Debug, Default, Clone)]
pub struct CandidateSet {
    slots: HashMap<String, usize>,
    candidates: Vec<Candidate>,
}

impl CandidateSet {
    /// Returns the record that was replaced, if any.
    pub fn insert(&mut self, candidate: Candidate) -> Option<Candidate> {
        match self.slots.get(&candidate.video_id) {
            Some(&slot) => Some(std::mem::replace(&mut self.candidates[slot], candidate)),
            None => {
                self.slots
                    .insert(candidate.video_id.clone(), self.candidates.len());
                self.candidates.push(candidate);
                None
            }
        }
    }

    #[cfg(test)]
    pub fn get(&self, video_id: &str) -> Option<&Candidate> {
        self.slots.get(video_id).map(|&slot| &self.candidates[slot])
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn into_vec(self) -> Vec<Candidate> {
        self.candidates
    }
}

/// The pipeline stage an item was skipped in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Search,
    VideoStats,
    ChannelStats,
    PlaylistItem,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Search => "search",
            Stage::VideoStats => "video stats",
            Stage::ChannelStats => "channel stats",
            Stage::PlaylistItem => "playlist item",
        };
        f.write_str(name)
    }
}

/// An external call that failed and was skipped without stopping the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Skip {
    pub stage: Stage,
    /// Search phrase, batch description or video id
    pub subject: String,
    pub reason: String,
}

impl Skip {
    pub fn new(stage: Stage, subject: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self {
            stage,
            subject: subject.into(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for Skip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.stage, self.subject, self.reason)
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{candidate, enriched};
    use super::*;

    #[test]
    fn test_candidate_set_last_write_wins() {
        let mut set = CandidateSet::default();
        assert!(set.insert(candidate("a", "first")).is_none());
        set.insert(candidate("b", "other"));
        let replaced = set.insert(candidate("a", "second"));

        assert_eq!(replaced.unwrap().title, "first");
        assert_eq!(set.len(), 2);
        assert_eq!(set.get("a").unwrap().title, "second");
    }

    #[test]
    fn test_candidate_set_keeps_first_seen_order() {
        let mut set = CandidateSet::default();
        set.insert(candidate("a", "1"));
        set.insert(candidate("b", "2"));
        set.insert(candidate("a", "3"));

        let ids: Vec<_> = set.into_vec().into_iter().map(|c| c.video_id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_sort_by_popularity_is_non_increasing() {
        let mut items = vec![
            enriched("a", 10, 1),
            enriched("b", 5000, 1),
            enriched("c", 700, 1),
            enriched("d", 5000, 1),
        ];
        sort_by_popularity(&mut items);

        let views: Vec<_> = items.iter().map(|c| c.view_count()).collect();
        assert_eq!(views, vec![5000, 5000, 700, 10]);
        // stable for ties
        assert_eq!(items[0].candidate.video_id, "b");
        assert_eq!(items[1].candidate.video_id, "d");
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(250_000), "250,000");
        assert_eq!(group_thousands(3_000_000), "3,000,000");
    }

    #[test]
    fn test_video_url() {
        assert_eq!(
            candidate("abc123", "t").video_url(),
            "https://youtube.com/watch?v=abc123"
        );
    }
}

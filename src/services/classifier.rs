use crate::config::ClassifierTerms;

/// Keyword scores for one piece of candidate text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Number of distinct required terms present
    pub afrobeats_score: usize,
    /// Number of distinct broader African music terms present
    pub african_score: usize,
    pub has_music_terms: bool,
    /// First exclusion term found. Scores are zero when this is set.
    pub excluded_by: Option<String>,
}

impl Classification {
    pub fn has_afrobeats_signal(&self) -> bool {
        self.afrobeats_score >= 2 || (self.afrobeats_score >= 1 && self.african_score >= 1)
    }

    pub fn is_authentic(&self) -> bool {
        self.excluded_by.is_none() && self.has_afrobeats_signal() && self.has_music_terms
    }
}

/// Decides whether a video looks like authentic Afrobeats from its text alone.
///
/// All matching is case-insensitive substring matching on the concatenation of
/// title, description, channel title and tags. There is no tokenization, so a
/// term embedded in an unrelated word still counts.
#[derive(Debug, Clone)]
pub struct TextClassifier {
    terms: ClassifierTerms,
}

impl TextClassifier {
    pub fn new(terms: &ClassifierTerms) -> Self {
        let lower = |items: &[String]| -> Vec<String> {
            items.iter().map(|t| t.to_lowercase()).collect()
        };
        Self {
            terms: ClassifierTerms {
                required_terms: lower(&terms.required_terms),
                african_terms: lower(&terms.african_terms),
                exclude_terms: lower(&terms.exclude_terms),
                music_terms: lower(&terms.music_terms),
            },
        }
    }

    pub fn score(
        &self,
        title: &str,
        description: &str,
        channel_title: &str,
        tags: &[String],
    ) -> Classification {
        let text = format!(
            "{} {} {} {}",
            title,
            description,
            channel_title,
            tags.join(" ")
        )
        .to_lowercase();

        if let Some(term) = self.terms.exclude_terms.iter().find(|t| text.contains(*t)) {
            return Classification {
                afrobeats_score: 0,
                african_score: 0,
                has_music_terms: false,
                excluded_by: Some(term.clone()),
            };
        }

        let count = |terms: &[String]| terms.iter().filter(|t| text.contains(*t)).count();

        Classification {
            afrobeats_score: count(&self.terms.required_terms),
            african_score: count(&self.terms.african_terms),
            has_music_terms: self.terms.music_terms.iter().any(|t| text.contains(t)),
            excluded_by: None,
        }
    }

    pub fn classify(
        &self,
        title: &str,
        description: &str,
        channel_title: &str,
        tags: &[String],
    ) -> bool {
        let classification = self.score(title, description, channel_title, tags);
        let verdict = classification.is_authentic();

        if classification.afrobeats_score > 0 {
            let preview: String = title.chars().take(30).collect();
            tracing::debug!(
                title = %preview,
                afrobeats = classification.afrobeats_score,
                african = classification.african_score,
                music = classification.has_music_terms,
                accepted = verdict,
                "Checked candidate text",
            );
        }

        verdict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> TextClassifier {
        TextClassifier::new(&ClassifierTerms::default())
    }

    #[test]
    fn test_naija_banger_is_accepted() {
        let c = classifier();
        let score = c.score(
            "Naija Afrobeats Banger 2024 Official Video",
            "",
            "Lagos Sound",
            &[],
        );

        // afrobeats, afrobeat, naija, lagos
        assert!(score.afrobeats_score >= 3);
        assert!(score.has_music_terms);
        assert!(c.classify(
            "Naija Afrobeats Banger 2024 Official Video",
            "",
            "Lagos Sound",
            &[]
        ));
    }

    #[test]
    fn test_highlife_cover_is_rejected() {
        let c = classifier();
        let score = c.score("Highlife Cover of Old Naija Song", "", "", &[]);

        assert_eq!(score.excluded_by.as_deref(), Some("cover"));
        assert!(!c.classify("Highlife Cover of Old Naija Song", "", "", &[]));
    }

    #[test]
    fn test_exclusion_wins_over_any_number_of_required_terms() {
        let c = classifier();
        assert!(!c.classify(
            "Nigeria Ghana Lagos Accra Afrobeats Official Music Video",
            "Yoruba amapiano naija",
            "Gospel Naija",
            &[],
        ));
    }

    #[test]
    fn test_single_required_term_needs_an_african_term() {
        let c = classifier();
        assert!(!c.classify("Amapiano official video", "", "DJ Kay", &[]));
        assert!(c.classify(
            "Amapiano official video",
            "afro fusion vibes",
            "DJ Kay",
            &[]
        ));
    }

    #[test]
    fn test_music_indicator_is_required() {
        let c = classifier();
        // two required terms but none of music/song/track/official/video
        assert!(!c.classify("Lagos to Accra trip vlog", "", "", &[]));
    }

    #[test]
    fn test_tags_count_towards_score() {
        let c = classifier();
        let tags = vec!["nigeria".to_string(), "naija".to_string()];
        assert!(!c.classify("New single out now", "official", "Kemi", &[]));
        assert!(c.classify("New single out now", "official", "Kemi", &tags));
    }

    #[test]
    fn test_matching_is_case_insensitive_substring() {
        let c = classifier();
        // "igbo" inside "Igbokwe" counts, a known limitation of substring matching
        let score = c.score("IGBOKWE - LAGOS (Official Song)", "", "", &[]);
        assert_eq!(score.afrobeats_score, 2);
        assert!(score.is_authentic());
    }

    #[test]
    fn test_classify_is_pure() {
        let c = classifier();
        let tags = vec!["afrobeats".to_string()];
        let first = c.score("Ghana Music Video", "new", "Accra Boys", &tags);
        let second = c.score("Ghana Music Video", "new", "Accra Boys", &tags);
        assert_eq!(first, second);
    }

    #[test]
    fn test_custom_terms_are_lowercased() {
        let terms = ClassifierTerms {
            required_terms: vec!["Afrobeats".into(), "NAIJA".into()],
            african_terms: vec![],
            exclude_terms: vec!["Live".into()],
            music_terms: vec!["Song".into()],
        };
        let c = TextClassifier::new(&terms);

        assert!(c.classify("naija afrobeats song", "", "", &[]));
        assert!(!c.classify("naija afrobeats song LIVE", "", "", &[]));
    }
}

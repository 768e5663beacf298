use std::path::{Path, PathBuf};
use std::time::Duration;

use color_eyre::eyre::{Context, Result, bail, eyre};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::ports::youtube::{PrivacyStatus, SearchOrder};

/// Most list endpoints of the Data API refuse more than 50 ids or results per call.
pub const API_BATCH_CAP: usize = 50;

/// Longest freshness window accepted, about ten years.
pub const MAX_VIDEO_AGE_DAYS: u32 = 3650;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub thresholds: Thresholds,
    pub search: SearchSettings,
    pub enrichment: EnrichmentSettings,
    pub playlist: PlaylistSettings,
    pub classifier: ClassifierTerms,
    pub auth: AuthSettings,
    pub api: ApiSettings,
}

/// Ceilings and floors that make an artist "up and coming".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub max_subscribers: u64,
    pub max_channel_views: u64,
    pub min_video_views: u64,
    pub max_video_age_days: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            max_subscribers: 250_000,
            max_channel_views: 3_000_000,
            min_video_views: 5_000,
            max_video_age_days: 45,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub seed_phrases: Vec<String>,
    pub category_id: String,
    pub region_code: String,
    pub max_results: u32,
    pub order: SearchOrder,
    #[serde(with = "duration_str")]
    pub delay: Duration,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            seed_phrases: strings(&[
                "afrobeats 2024 nigeria",
                "afrobeats 2025 new",
                "naija afrobeats latest",
                "nigeria afrobeats trending",
                "ghana afrobeats new",
                "afrobeats hits nigeria",
                "naija new music 2024",
                "nigerian artist new song",
                "lagos afrobeats",
                "afrobeats underground nigeria",
                "naija upcoming artist",
                "nigeria music 2024",
            ]),
            category_id: "10".into(),
            region_code: "NG".into(),
            max_results: 20,
            order: SearchOrder::ViewCount,
            delay: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentSettings {
    pub batch_size: usize,
    #[serde(with = "duration_str")]
    pub delay: Duration,
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self {
            batch_size: API_BATCH_CAP,
            delay: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaylistSettings {
    pub name_prefix: String,
    pub privacy: PrivacyStatus,
    pub max_items: usize,
    #[serde(with = "duration_str")]
    pub item_delay: Duration,
    pub manual_top_n: usize,
    pub manual_guide_path: PathBuf,
}

impl Default for PlaylistSettings {
    fn default() -> Self {
        Self {
            name_prefix: "Afrobeats Up and Coming".into(),
            privacy: PrivacyStatus::Public,
            max_items: 50,
            item_delay: Duration::from_millis(300),
            manual_top_n: 20,
            manual_guide_path: PathBuf::from("afrobeats_manual_playlist.json"),
        }
    }
}

/// Keyword lists used by the text classifier. Matching is lower-case substring matching,
/// so every term is expected to be lower case already.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierTerms {
    pub required_terms: Vec<String>,
    pub african_terms: Vec<String>,
    pub exclude_terms: Vec<String>,
    pub music_terms: Vec<String>,
}

impl Default for ClassifierTerms {
    fn default() -> Self {
        Self {
            required_terms: strings(&[
                "afrobeats",
                "afrobeat",
                "naija",
                "nigeria",
                "nigerian",
                "ghana",
                "ghanaian",
                "lagos",
                "accra",
                "yoruba",
                "igbo",
                "amapiano",
                "afro beats",
                "afro-beats",
            ]),
            african_terms: strings(&[
                "pidgin english",
                "yoruba music",
                "igbo music",
                "hausa music",
                "twi music",
                "akan music",
                "african music",
                "west africa",
                "nigeria music",
                "ghana music",
                "afro pop",
                "afro fusion",
            ]),
            exclude_terms: strings(&[
                "cover",
                "remix of",
                "karaoke",
                "instrumental",
                "tutorial",
                "reaction",
                "review",
                "behind the scenes",
                "interview",
                "gospel",
                "christian",
                "worship",
                "highlife",
                "juju music",
                "fuji music",
                "makossa",
                "soukous",
                "reggae",
                "dancehall",
            ]),
            music_terms: strings(&["music", "song", "track", "official", "video"]),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub token_path: String,
    pub client_secrets_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            token_path: "token.json".into(),
            client_secrets_path: "credentials.json".into(),
            api_key: None,
        }
    }
}

impl AuthSettings {
    pub fn token_path(&self) -> PathBuf {
        expand_path(&self.token_path)
    }

    pub fn client_secrets_path(&self) -> PathBuf {
        expand_path(&self.client_secrets_path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: Url,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: Url::parse("https://www.googleapis.com/youtube/v3/")
                .expect("default API base url is valid"),
        }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .wrap_err(format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .wrap_err(format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|path| path.join("afro-scout").join("config.toml"))
    }

    /// Load the default config file, or built-in defaults if there is none
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_path())
    }

    fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let Some(config_path) = config_path else {
            tracing::debug!("No config directory available, using defaults");
            return Ok(Self::default());
        };

        if !config_path.exists() {
            tracing::debug!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        Self::from_file(&config_path)
    }

    /// Write the defaults to the default config path, unless a file is already there
    pub fn create_default() -> Result<PathBuf> {
        let config_path = Self::config_path().ok_or(eyre!("No config directory available"))?;
        if config_path.exists() {
            tracing::info!("Config already exists at {}", config_path.display());
            return Ok(config_path);
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .wrap_err(format!("Failed to create {}", parent.display()))?;
        }
        let contents =
            toml::to_string_pretty(&Self::default()).wrap_err("Failed to serialize config")?;
        std::fs::write(&config_path, contents)
            .wrap_err(format!("Failed to write {}", config_path.display()))?;

        Ok(config_path)
    }

    pub fn validate(&self) -> Result<()> {
        if self.search.seed_phrases.is_empty() {
            bail!("search.seed_phrases must not be empty");
        }
        if !(1..=API_BATCH_CAP as u32).contains(&self.search.max_results) {
            bail!("search.max_results must be between 1 and {API_BATCH_CAP}");
        }
        if !(1..=MAX_VIDEO_AGE_DAYS).contains(&self.thresholds.max_video_age_days) {
            bail!("thresholds.max_video_age_days must be between 1 and {MAX_VIDEO_AGE_DAYS}");
        }
        if !(1..=API_BATCH_CAP).contains(&self.enrichment.batch_size) {
            bail!("enrichment.batch_size must be between 1 and {API_BATCH_CAP}");
        }
        Ok(())
    }
}

/// Expand ~ to home directory
fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Durations written as humantime strings, e.g. `"250ms"`.
mod duration_str {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

use crate::constants::{
    DEFAULT_USER_AGENT, IMDB_BASE_URL, ROTTEN_TOMATOES_BASE_URL, TMDB_BASE_URL,
};
use crate::error::{Result, ScraperError};
use crate::scores::{ThresholdPolicy, Thresholds};
use crate::types::MediaKind;
use chrono::Datelike;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const API_KEY_ENV: &str = "TMDB_API_KEY";

/// Scraper configuration, normally read from `config.toml`.
///
/// Every field has a default, so an empty file (or no file at all via
/// `Config::default()`) yields the values the scraper was tuned with.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fetch: FetchConfig,
    pub tmdb: TmdbConfig,
    pub imdb: ImdbConfig,
    pub rotten_tomatoes: RottenTomatoesConfig,
    pub scrape: ScrapeConfig,
    pub matching: MatchingConfig,
    pub thresholds: ThresholdsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    pub batch_pause_ms: u64,
    pub connect_timeout_secs: u64,
    pub deadline_secs: u64,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            retry_delay_ms: 5000,
            batch_pause_ms: 1000,
            connect_timeout_secs: 10,
            deadline_secs: 60,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl FetchConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn batch_pause(&self) -> Duration {
        Duration::from_millis(self.batch_pause_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TmdbConfig {
    pub base_url: String,
    pub min_vote_count: u32,
    /// Only works in this original language are scraped.
    pub language: String,
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            base_url: TMDB_BASE_URL.to_string(),
            min_vote_count: 5,
            language: "en".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImdbConfig {
    pub base_url: String,
}

impl Default for ImdbConfig {
    fn default() -> Self {
        Self {
            base_url: IMDB_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RottenTomatoesConfig {
    pub base_url: String,
    pub search_limit: u32,
}

impl Default for RottenTomatoesConfig {
    fn default() -> Self {
        Self {
            base_url: ROTTEN_TOMATOES_BASE_URL.to_string(),
            search_limit: 105,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    pub min_year: i32,
    /// Defaults to the current calendar year.
    pub max_year: Option<i32>,
    pub media: Vec<MediaKind>,
    pub movie_fan_out: usize,
    pub tv_fan_out: usize,
    pub output_dir: String,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            min_year: 1900,
            max_year: None,
            media: vec![MediaKind::Movie, MediaKind::Tv],
            movie_fan_out: 10,
            tv_fan_out: 5,
            output_dir: "db".to_string(),
        }
    }
}

impl ScrapeConfig {
    /// Years to walk, newest first.
    pub fn years(&self) -> Vec<i32> {
        let max_year = self
            .max_year
            .unwrap_or_else(|| chrono::Local::now().year());
        (self.min_year..=max_year).rev().collect()
    }

    pub fn fan_out(&self, media: MediaKind) -> usize {
        match media {
            MediaKind::Movie => self.movie_fan_out.max(1),
            MediaKind::Tv => self.tv_fan_out.max(1),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub year_window: i32,
    /// Accept the first of two candidates at the strongest conjunctive stage.
    pub accept_pair_tie_break: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            year_window: 2,
            accept_pair_tie_break: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ThresholdsConfig {
    pub policy: ThresholdPolicy,
    movie: ThresholdOverrides,
    season: ThresholdOverrides,
}

impl ThresholdsConfig {
    pub fn movie(&self) -> Thresholds {
        self.movie.apply(Thresholds::movie())
    }

    pub fn season(&self) -> Thresholds {
        self.season.apply(Thresholds::season())
    }
}

/// Per-mode vote minimums; absent fields keep that mode's defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ThresholdOverrides {
    primary_audience: Option<u64>,
    secondary_audience: Option<u64>,
    all_critics: Option<u64>,
    top_critics: Option<u64>,
}

impl ThresholdOverrides {
    fn apply(&self, base: Thresholds) -> Thresholds {
        Thresholds {
            primary_audience: self.primary_audience.unwrap_or(base.primary_audience),
            secondary_audience: self.secondary_audience.unwrap_or(base.secondary_audience),
            all_critics: self.all_critics.unwrap_or(base.all_critics),
            top_critics: self.top_critics.unwrap_or(base.top_critics),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ScraperError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml(&content)
    }

    /// Load `path` when it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.fetch.max_attempts == 0 {
            return Err(ScraperError::Config(
                "fetch.max_attempts must be at least 1".into(),
            ));
        }
        if let Some(max_year) = self.scrape.max_year {
            if max_year < self.scrape.min_year {
                return Err(ScraperError::Config(format!(
                    "scrape.max_year {} is before scrape.min_year {}",
                    max_year, self.scrape.min_year
                )));
            }
        }
        if self.matching.year_window < 0 {
            return Err(ScraperError::Config(
                "matching.year_window cannot be negative".into(),
            ));
        }
        Ok(())
    }

    /// TMDB API key from the environment (a `.env` file is honoured).
    pub fn api_key() -> Result<String> {
        dotenv::dotenv().ok();
        std::env::var(API_KEY_ENV).map_err(|source| ScraperError::Env {
            name: API_KEY_ENV,
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.fetch.max_attempts, 10);
        assert_eq!(config.fetch.retry_delay(), Duration::from_secs(5));
        assert_eq!(config.scrape.min_year, 1900);
        assert_eq!(config.scrape.media, vec![MediaKind::Movie, MediaKind::Tv]);
        assert_eq!(config.thresholds.movie().primary_audience, 500);
        assert_eq!(config.thresholds.season().secondary_audience, 5);
        assert_eq!(config.thresholds.policy, ThresholdPolicy::OmitOrigin);
    }

    #[test]
    fn test_partial_sections_override() {
        let config = Config::from_toml(
            r#"
            [scrape]
            min_year = 2019
            max_year = 2020
            media = ["tv"]

            [thresholds]
            policy = "drop_item"

            [thresholds.movie]
            primary_audience = 1000
            "#,
        )
        .unwrap();
        assert_eq!(config.scrape.years(), vec![2020, 2019]);
        assert_eq!(config.scrape.media, vec![MediaKind::Tv]);
        assert_eq!(config.thresholds.policy, ThresholdPolicy::DropItem);
        assert_eq!(config.thresholds.movie().primary_audience, 1000);
        // untouched fields keep their defaults
        assert_eq!(config.thresholds.movie().top_critics, 2);
    }

    #[test]
    fn test_rejects_inverted_year_range() {
        let result = Config::from_toml("[scrape]\nmin_year = 2021\nmax_year = 2020\n");
        assert!(matches!(result, Err(ScraperError::Config(_))));
    }

    #[test]
    fn test_fan_out_never_zero() {
        let mut scrape = ScrapeConfig::default();
        scrape.tv_fan_out = 0;
        assert_eq!(scrape.fan_out(MediaKind::Tv), 1);
        assert_eq!(scrape.fan_out(MediaKind::Movie), 10);
    }
}

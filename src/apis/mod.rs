//! Provider adapters and the traits the pipeline drives them through.
//!
//! Each source hands back typed data or `None`; transient failures are already
//! retried underneath and parse failures count as "no data".

pub mod imdb;
pub mod rotten_tomatoes;
pub mod tmdb;

use crate::error::{Result, ScraperError};
use crate::types::{CriticQuote, MediaKind, ReviewCandidate};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

pub use imdb::{ImdbApi, ReferencePage};
pub use rotten_tomatoes::{ReviewPage, RottenTomatoesApi};
pub use tmdb::{DiscoverPage, ExternalIds, MovieDetail, SeasonSummary, TmdbApi, TvDetail, Video};

/// Catalog provider: discovery, details and videos.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn discover(&self, media: MediaKind, year: i32, page: u32) -> Option<DiscoverPage>;

    async fn movie_detail(&self, id: u64) -> Option<MovieDetail>;

    async fn tv_detail(&self, id: u64) -> Option<TvDetail>;

    async fn videos(&self, media: MediaKind, id: u64) -> Option<Vec<Video>>;

    async fn season_videos(&self, id: u64, season_number: i64) -> Option<Vec<Video>>;

    async fn external_ids(&self, media: MediaKind, id: u64) -> Option<ExternalIds>;
}

/// Reference provider: title page keyed by the external id.
#[async_trait]
pub trait ReferenceSource: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn title_page(&self, external_id: &str) -> Option<ReferencePage>;
}

/// Cross-reference provider: fuzzy search, title/season pages and critic quotes.
#[async_trait]
pub trait ReviewSource: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// Candidates for `query`; an unexpected payload shape yields an empty list.
    async fn search(&self, media: MediaKind, query: &str) -> Vec<ReviewCandidate>;

    async fn title_page(&self, media: MediaKind, path: &str) -> Option<ReviewPage>;

    async fn top_critics(&self, media: MediaKind, path: &str) -> Vec<CriticQuote>;
}

/// Everything the cross-reference provider contributed for one movie or season.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewData {
    /// Path of the matched title (or season) page, e.g. `/m/heat`.
    pub url: String,
    pub payload: Option<Value>,
    pub disc_date: Option<NaiveDate>,
    pub critics: Vec<CriticQuote>,
}

/// Deserialize a provider payload, mapping failure to a provider error.
pub(crate) fn decode<T: DeserializeOwned>(
    provider: &'static str,
    what: &str,
    value: Value,
) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| ScraperError::provider(provider, format!("unreadable {what}: {e}")))
}

/// `decode`, logging and discarding the error.
pub(crate) fn decode_or_warn<T: DeserializeOwned>(
    provider: &'static str,
    what: &str,
    value: Value,
) -> Option<T> {
    match decode(provider, what, value) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!("{}", e);
            None
        }
    }
}

use super::ReviewSource;
use crate::config::RottenTomatoesConfig;
use crate::constants::{
    ROTTEN_TOMATOES_PROVIDER, ROTTEN_TOMATOES_SEARCH_PATH, RT_RESULT_MARKER, RT_SCORE_INFO_MARKER,
};
use crate::fetch::{non_empty, FetchClient};
use crate::parser::{extract_marked_object, parse_critic_reviews, parse_disc_date};
use crate::types::{CriticQuote, MediaKind, ReviewCandidate};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, instrument, warn};

/// Quotes kept per side (positive, then negative).
const QUOTES_PER_SIDE: usize = 2;

/// Parsed title or season page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewPage {
    /// `scoreInfo` for movies, `result` for seasons.
    pub payload: Option<Value>,
    /// Movies only.
    pub disc_date: Option<NaiveDate>,
}

/// Season page path for a series url: `/tv/fargo/s01` -> `/tv/fargo/s03`.
pub fn season_path(series_url: &str, season_number: i64) -> String {
    format!("{}/s{:02}", series_url.replace("/s01", ""), season_number)
}

/// Stable id for a matched page: last segment for movies, series slug for shows
/// (any season segment dropped).
pub fn review_id(media: MediaKind, url: &str) -> String {
    match media {
        MediaKind::Movie => url.rsplit('/').next().unwrap_or(url).to_string(),
        MediaKind::Tv => {
            let slug = url.trim_start_matches("/tv/");
            match slug.rsplit_once('/') {
                Some((series, season)) if is_season_segment(season) => series.to_string(),
                _ => slug.to_string(),
            }
        }
    }
}

fn is_season_segment(segment: &str) -> bool {
    segment
        .strip_prefix('s')
        .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

fn results_key(media: MediaKind) -> &'static str {
    match media {
        MediaKind::Movie => "movies",
        MediaKind::Tv => "tvSeries",
    }
}

fn quote_selector(media: MediaKind) -> &'static str {
    match media {
        MediaKind::Movie => ".the_review",
        MediaKind::Tv => ".critic__review-quote",
    }
}

/// Candidates under the media-specific key; anything else is logged and ignored.
pub fn parse_search_results(media: MediaKind, query: &str, body: &Value) -> Vec<ReviewCandidate> {
    let Some(hits) = body.get(results_key(media)).and_then(Value::as_array) else {
        warn!("Unexpected search result shape for '{}': {}", query, body);
        return Vec::new();
    };
    hits.iter()
        .filter_map(|hit| match serde_json::from_value::<ReviewCandidate>(hit.clone()) {
            Ok(candidate) => Some(candidate),
            Err(e) => {
                debug!("Skipping unreadable search hit for '{}': {}", query, e);
                None
            }
        })
        .collect()
}

pub struct RottenTomatoesApi {
    fetch: FetchClient,
    base_url: String,
    search_limit: u32,
}

impl RottenTomatoesApi {
    pub fn new(fetch: FetchClient, config: &RottenTomatoesConfig) -> Self {
        Self {
            fetch,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            search_limit: config.search_limit.max(1),
        }
    }

    /// The search endpoint sometimes chokes on large limits; each retry asks for one fewer.
    fn search_query(&self, query: &str, attempt: u32) -> Vec<(String, String)> {
        let limit = self.search_limit.saturating_sub(attempt).max(1);
        vec![
            ("limit".to_string(), limit.to_string()),
            ("q".to_string(), query.to_string()),
        ]
    }
}

#[async_trait]
impl ReviewSource for RottenTomatoesApi {
    fn provider_name(&self) -> &'static str {
        ROTTEN_TOMATOES_PROVIDER
    }

    #[instrument(skip(self))]
    async fn search(&self, media: MediaKind, query: &str) -> Vec<ReviewCandidate> {
        let url = format!("{}{}", self.base_url, ROTTEN_TOMATOES_SEARCH_PATH);
        let body = self
            .fetch
            .get_json_checked(&url, |attempt| self.search_query(query, attempt), non_empty)
            .await;
        match body {
            Some(body) => parse_search_results(media, query, &body),
            None => Vec::new(),
        }
    }

    async fn title_page(&self, media: MediaKind, path: &str) -> Option<ReviewPage> {
        let url = format!("{}{}", self.base_url, path);
        let page = self.fetch.get_text(&url, &[]).await?;
        let parsed = match media {
            MediaKind::Movie => ReviewPage {
                payload: extract_marked_object(&page, RT_SCORE_INFO_MARKER),
                disc_date: parse_disc_date(&page),
            },
            MediaKind::Tv => ReviewPage {
                payload: extract_marked_object(&page, RT_RESULT_MARKER),
                disc_date: None,
            },
        };
        if parsed.payload.is_none() {
            debug!("No score data on {}", url);
        }
        Some(parsed)
    }

    async fn top_critics(&self, media: MediaKind, path: &str) -> Vec<CriticQuote> {
        let url = format!("{}{}/reviews/", self.base_url, path);
        let query = [("type".to_string(), "top_critics".to_string())];
        match self.fetch.get_text(&url, &query).await {
            Some(page) => parse_critic_reviews(&page, quote_selector(media), QUOTES_PER_SIDE),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_season_path_and_ids() {
        assert_eq!(season_path("/tv/fargo/s01", 3), "/tv/fargo/s03");
        assert_eq!(season_path("/tv/fargo", 12), "/tv/fargo/s12");
        assert_eq!(review_id(MediaKind::Movie, "/m/heat_1995"), "heat_1995");
        assert_eq!(review_id(MediaKind::Tv, "/tv/fargo/s01"), "fargo");
        assert_eq!(review_id(MediaKind::Tv, "/tv/fargo/s03"), "fargo");
        assert_eq!(review_id(MediaKind::Tv, "/tv/the_wire"), "the_wire");
    }

    #[test]
    fn test_parse_search_results_by_media() {
        let body = json!({
            "movies": [{"name": "Heat", "year": 1995, "url": "/m/heat", "castItems": [{"name": "Al Pacino"}]}],
            "tvSeries": [{"title": "Fargo", "startYear": 2014, "endYear": null, "url": "/tv/fargo/s01"}]
        });
        let movies = parse_search_results(MediaKind::Movie, "heat", &body);
        assert_eq!(movies.len(), 1);
        assert_eq!(movies[0].cast_items[0].name, "Al Pacino");

        let series = parse_search_results(MediaKind::Tv, "fargo", &body);
        assert_eq!(series[0].start_year, Some(2014));
        assert_eq!(series[0].end_year, None);
    }

    #[test]
    fn test_unexpected_search_shape_is_empty() {
        let body = json!({"error": "bad request"});
        assert!(parse_search_results(MediaKind::Movie, "x", &body).is_empty());
    }
}

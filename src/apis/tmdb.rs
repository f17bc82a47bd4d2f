use super::{decode_or_warn, CatalogSource};
use crate::config::TmdbConfig;
use crate::constants::{TMDB_NOT_FOUND_STATUS, TMDB_PROVIDER};
use crate::fetch::{non_empty, FetchClient, Verdict};
use crate::types::{null_as_default, MediaKind};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, instrument};

/// One page of `/discover/{movie|tv}`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DiscoverPage {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub results: Vec<DiscoverResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DiscoverResult {
    pub id: u64,
    /// Movie title.
    #[serde(default, deserialize_with = "blank_as_none")]
    pub title: Option<String>,
    /// Series name.
    #[serde(default, deserialize_with = "blank_as_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub original_language: Option<String>,
}

impl DiscoverResult {
    pub fn display_name(&self) -> &str {
        self.title
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Genre {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MovieDetail {
    pub id: u64,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub imdb_id: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub overview: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub poster_path: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub release_date: Option<String>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub genres: Vec<Genre>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TvDetail {
    pub id: u64,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub overview: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub poster_path: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub first_air_date: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub last_air_date: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub genres: Vec<Genre>,
    /// `None` when the provider sent no season list at all.
    #[serde(default)]
    pub seasons: Option<Vec<SeasonSummary>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SeasonSummary {
    pub season_number: i64,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub air_date: Option<String>,
    #[serde(default)]
    pub episode_count: Option<u32>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub overview: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub poster_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Video {
    pub key: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Deserialize)]
struct VideoList {
    #[serde(default, deserialize_with = "null_as_default")]
    results: Vec<Video>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ExternalIds {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub imdb_id: Option<String>,
}

// The catalog sends "" for unknown dates and overviews.
fn blank_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

/// TMDB reports errors in-band as `{status_code, status_message}`.
pub fn tmdb_verdict(body: &Value) -> Verdict {
    let status_code = body.get("status_code").and_then(Value::as_i64);
    if status_code == Some(TMDB_NOT_FOUND_STATUS) {
        debug!("TMDB resource not found: {}", body);
        return Verdict::GiveUp;
    }
    if status_code.is_some() || body.get("status_message").is_some() {
        return Verdict::Retry;
    }
    non_empty(body)
}

pub struct TmdbApi {
    fetch: FetchClient,
    base_url: String,
    api_key: String,
    min_vote_count: u32,
}

impl TmdbApi {
    pub fn new(fetch: FetchClient, config: &TmdbConfig, api_key: impl Into<String>) -> Self {
        Self {
            fetch,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            min_vote_count: config.min_vote_count,
        }
    }

    fn discover_query(&self, media: MediaKind, year: i32, page: u32) -> Vec<(String, String)> {
        let field = media.date_field();
        vec![
            ("api_key".to_string(), self.api_key.clone()),
            ("sort_by".to_string(), format!("{field}.desc")),
            ("include_adult".to_string(), "false".to_string()),
            ("page".to_string(), page.to_string()),
            (format!("{field}.lte"), format!("{year}-12-31")),
            (format!("{field}.gte"), format!("{year}-01-01")),
            ("vote_count.gte".to_string(), self.min_vote_count.to_string()),
        ]
    }

    async fn get(&self, path: &str, query: Vec<(String, String)>) -> Option<Value> {
        let url = format!("{}{}", self.base_url, path);
        self.fetch
            .get_json_checked(&url, |_| query.clone(), tmdb_verdict)
            .await
    }

    async fn get_keyed(&self, path: &str) -> Option<Value> {
        self.get(path, vec![("api_key".to_string(), self.api_key.clone())])
            .await
    }
}

#[async_trait]
impl CatalogSource for TmdbApi {
    fn provider_name(&self) -> &'static str {
        TMDB_PROVIDER
    }

    #[instrument(skip(self))]
    async fn discover(&self, media: MediaKind, year: i32, page: u32) -> Option<DiscoverPage> {
        let path = format!("/discover/{}", media.as_str());
        let value = self.get(&path, self.discover_query(media, year, page)).await?;
        decode_or_warn(TMDB_PROVIDER, "discover page", value)
    }

    async fn movie_detail(&self, id: u64) -> Option<MovieDetail> {
        let value = self.get_keyed(&format!("/movie/{id}")).await?;
        decode_or_warn(TMDB_PROVIDER, "movie detail", value)
    }

    async fn tv_detail(&self, id: u64) -> Option<TvDetail> {
        let value = self.get_keyed(&format!("/tv/{id}")).await?;
        decode_or_warn(TMDB_PROVIDER, "tv detail", value)
    }

    async fn videos(&self, media: MediaKind, id: u64) -> Option<Vec<Video>> {
        let value = self
            .get_keyed(&format!("/{}/{}/videos", media.as_str(), id))
            .await?;
        decode_or_warn::<VideoList>(TMDB_PROVIDER, "video list", value).map(|l| l.results)
    }

    async fn season_videos(&self, id: u64, season_number: i64) -> Option<Vec<Video>> {
        let value = self
            .get_keyed(&format!("/tv/{id}/season/{season_number}/videos"))
            .await?;
        decode_or_warn::<VideoList>(TMDB_PROVIDER, "season video list", value).map(|l| l.results)
    }

    async fn external_ids(&self, media: MediaKind, id: u64) -> Option<ExternalIds> {
        let value = self
            .get_keyed(&format!("/{}/{}/external_ids", media.as_str(), id))
            .await?;
        decode_or_warn(TMDB_PROVIDER, "external ids", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FetchConfig;
    use crate::fetch::RetryPolicy;
    use crate::infra::http_client::ReqwestHttp;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_tmdb_verdict() {
        assert_eq!(
            tmdb_verdict(&json!({"status_code": 34, "status_message": "not found"})),
            Verdict::GiveUp
        );
        assert_eq!(
            tmdb_verdict(&json!({"status_code": 25, "status_message": "rate limit"})),
            Verdict::Retry
        );
        assert_eq!(tmdb_verdict(&json!({})), Verdict::Retry);
        assert_eq!(tmdb_verdict(&json!({"id": 1})), Verdict::Accept);
    }

    #[test]
    fn test_blank_strings_become_none() {
        let detail: MovieDetail = serde_json::from_value(json!({
            "id": 7,
            "title": "Heat",
            "imdb_id": "",
            "overview": "",
            "poster_path": null,
            "release_date": "1995-12-15",
            "runtime": null,
            "genres": null
        }))
        .unwrap();
        assert_eq!(detail.imdb_id, None);
        assert_eq!(detail.overview, None);
        assert_eq!(detail.release_date.as_deref(), Some("1995-12-15"));
        assert!(detail.genres.is_empty());
    }

    #[test]
    fn test_discover_query_bounds_year() {
        let fetch_config = FetchConfig::default();
        let http = ReqwestHttp::new(&fetch_config).unwrap();
        let fetch = FetchClient::new(Arc::new(http), RetryPolicy::from(&fetch_config));
        let api = TmdbApi::new(fetch, &TmdbConfig::default(), "key");
        let query = api.discover_query(MediaKind::Tv, 2019, 3);
        assert!(query.contains(&("first_air_date.gte".to_string(), "2019-01-01".to_string())));
        assert!(query.contains(&("first_air_date.lte".to_string(), "2019-12-31".to_string())));
        assert!(query.contains(&("sort_by".to_string(), "first_air_date.desc".to_string())));
        assert!(query.contains(&("vote_count.gte".to_string(), "5".to_string())));
        assert!(query.contains(&("page".to_string(), "3".to_string())));
    }
}

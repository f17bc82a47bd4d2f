use crate::scores::Scores;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Media kinds the catalog provider discovers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Tv,
}

impl MediaKind {
    /// Path segment TMDB uses for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Tv => "tv",
        }
    }

    /// Date field TMDB discovery filters and sorts on.
    pub fn date_field(&self) -> &'static str {
        match self {
            MediaKind::Movie => "primary_release_date",
            MediaKind::Tv => "first_air_date",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "movie" | "movies" => Ok(MediaKind::Movie),
            "tv" | "series" => Ok(MediaKind::Tv),
            other => Err(format!("unknown media kind '{}'", other)),
        }
    }
}

/// One cast member attached to a search candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastItem {
    pub name: String,
}

/// A Rotten Tomatoes search hit, kept only while resolving a match.
///
/// Movies carry `name`/`year`/`castItems`; series carry `title`/`startYear`/`endYear`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewCandidate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub start_year: Option<i32>,
    #[serde(default)]
    pub end_year: Option<i32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cast_items: Vec<CastItem>,
}

// Search payloads send `null` where a list or string is simply absent.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl ReviewCandidate {
    /// Display name regardless of which field the search used.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.title.as_deref())
            .unwrap_or_default()
    }
}

/// A top-critic quote and whether the review was positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticQuote {
    pub text: String,
    pub positive: bool,
}

/// One row of the produced dataset: a movie or a single TV season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    /// TMDB id, or `{seriesId}_{seasonNumber}` for a season.
    pub id: String,
    /// IMDb id without its `tt` prefix; never empty.
    pub imdb_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rt_id: Option<String>,
    pub name: String,
    pub genres: Vec<String>,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trailer_key: Option<String>,
    /// Release date (movies) or season air date, `YYYY-MM-DD`.
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disc_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episodes: Option<u32>,
    pub scores: Scores,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub critics: Vec<CriticQuote>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consensus: Option<String>,
}

impl CatalogItem {
    /// Partition year, derived from `date` only.
    pub fn year(&self) -> Option<i32> {
        use chrono::Datelike;
        chrono::NaiveDate::parse_from_str(&self.date, "%Y-%m-%d")
            .ok()
            .map(|d| d.year())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_kind_parsing() {
        assert_eq!("movie".parse::<MediaKind>().unwrap(), MediaKind::Movie);
        assert_eq!(" TV ".parse::<MediaKind>().unwrap(), MediaKind::Tv);
        assert!("anime".parse::<MediaKind>().is_err());
    }

    #[test]
    fn test_candidate_display_name_falls_back_to_title() {
        let movie: ReviewCandidate =
            serde_json::from_str(r#"{"name":"Heat","year":1995,"url":"/m/heat"}"#).unwrap();
        let series: ReviewCandidate =
            serde_json::from_str(r#"{"title":"Fargo","startYear":2014,"url":"/tv/fargo"}"#)
                .unwrap();
        assert_eq!(movie.display_name(), "Heat");
        assert_eq!(series.display_name(), "Fargo");
        assert_eq!(series.start_year, Some(2014));
        assert!(series.cast_items.is_empty());
    }
}

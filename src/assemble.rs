//! Builds catalog items out of already-fetched provider data.
//!
//! Nothing here touches the network: the pipeline gathers the inputs, these
//! functions apply field fallbacks, genre cleanup and score admission.

use crate::apis::{MovieDetail, ReferencePage, ReviewData, SeasonSummary, TvDetail, Video};
use crate::apis::rotten_tomatoes::review_id;
use crate::apis::tmdb::Genre;
use crate::constants::{GENRE_ALIASES, GENRE_CONJUNCTION, TRAILER_VIDEO_TYPE};
use crate::parser::{decode_ampersands, parse_iso_duration_minutes, strip_emphasis};
use crate::scores::{normalize_scores, ReviewPayload, ThresholdPolicy, Thresholds};
use crate::types::{CatalogItem, MediaKind};
use serde_json::Value;
use tracing::{debug, warn};

/// Inputs for one movie.
#[derive(Debug, Clone, Copy)]
pub struct MovieSources<'a> {
    pub detail: &'a MovieDetail,
    pub videos: &'a [Video],
    pub reference: &'a ReferencePage,
    pub review: Option<&'a ReviewData>,
}

/// Inputs for one season of a series.
#[derive(Debug, Clone, Copy)]
pub struct SeasonSources<'a> {
    pub series: &'a TvDetail,
    pub season: &'a SeasonSummary,
    pub imdb_id: &'a str,
    pub season_videos: &'a [Video],
    pub series_videos: &'a [Video],
    pub reference: &'a ReferencePage,
    pub review: Option<&'a ReviewData>,
}

/// Split compound labels and apply short aliases, keeping first-seen order.
pub fn normalize_genres(genres: &[Genre]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for part in genres
        .iter()
        .flat_map(|g| g.name.split(GENRE_CONJUNCTION))
        .map(str::trim)
        .filter(|p| !p.is_empty())
    {
        let name = GENRE_ALIASES
            .iter()
            .find(|(from, _)| *from == part)
            .map(|(_, to)| *to)
            .unwrap_or(part);
        if !out.iter().any(|g| g == name) {
            out.push(name.to_string());
        }
    }
    out
}

/// First video tagged as a trailer, else the first video of the list.
pub fn pick_trailer(videos: &[Video]) -> Option<String> {
    videos
        .iter()
        .find(|v| v.kind == TRAILER_VIDEO_TYPE)
        .or_else(|| videos.first())
        .map(|v| v.key.clone())
        .filter(|k| !k.is_empty())
}

fn strip_imdb_prefix(imdb_id: &str) -> String {
    imdb_id.strip_prefix("tt").unwrap_or(imdb_id).to_string()
}

fn consensus_at(payload: Option<&Value>, path: &[&str]) -> Option<String> {
    let mut node = payload?;
    for key in path {
        node = node.get(*key)?;
    }
    node.as_str()
        .map(strip_emphasis)
        .filter(|s| !s.trim().is_empty())
}

pub fn assemble_movie(
    sources: MovieSources<'_>,
    thresholds: &Thresholds,
    policy: ThresholdPolicy,
) -> Option<CatalogItem> {
    let detail = sources.detail;
    let name = detail.title.clone().unwrap_or_default();

    let Some(imdb_id) = detail.imdb_id.as_deref() else {
        debug!("'{}' has no reference id", name);
        return None;
    };
    let Some(date) = detail.release_date.clone() else {
        debug!("'{}' has no release date", name);
        return None;
    };

    let payload = sources.review.and_then(|r| r.payload.as_ref());
    let scores = normalize_scores(
        &sources.reference.data,
        payload.map(ReviewPayload::Movie),
        thresholds,
        policy,
    )?;

    let duration = detail
        .runtime
        .filter(|m| *m > 0)
        .or_else(|| sources.reference.duration().and_then(parse_iso_duration_minutes));
    let Some(duration) = duration else {
        warn!("No duration for '{}' ({})", name, date);
        return None;
    };

    let summary = detail
        .overview
        .as_deref()
        .or_else(|| sources.reference.description())
        .map(decode_ampersands)
        .unwrap_or_default();

    Some(CatalogItem {
        id: detail.id.to_string(),
        imdb_id: strip_imdb_prefix(imdb_id),
        rt_id: sources.review.map(|r| review_id(MediaKind::Movie, &r.url)),
        name,
        genres: normalize_genres(&detail.genres),
        summary,
        poster: detail.poster_path.clone(),
        trailer_key: pick_trailer(sources.videos),
        date,
        disc_date: sources
            .review
            .and_then(|r| r.disc_date)
            .map(|d| d.format("%Y-%m-%d").to_string()),
        duration: Some(duration),
        season: None,
        episodes: None,
        scores,
        critics: sources.review.map(|r| r.critics.clone()).unwrap_or_default(),
        consensus: consensus_at(payload, &["tomatometerAllCritics", "consensus"]),
    })
}

pub fn assemble_season(
    sources: SeasonSources<'_>,
    thresholds: &Thresholds,
    policy: ThresholdPolicy,
) -> Option<CatalogItem> {
    let series = sources.series;
    let season = sources.season;
    let name = series.name.clone().unwrap_or_default();

    // season 0 holds specials
    if season.season_number <= 0 {
        return None;
    }
    let number = u32::try_from(season.season_number).ok()?;
    let Some(date) = season.air_date.clone() else {
        debug!("'{}' season {} has no air date", name, number);
        return None;
    };

    let payload = sources.review.and_then(|r| r.payload.as_ref());
    let scores = normalize_scores(
        &sources.reference.data,
        payload.map(ReviewPayload::Season),
        thresholds,
        policy,
    )?;

    let summary = season
        .overview
        .as_deref()
        .or(series.overview.as_deref())
        .or_else(|| sources.reference.description())
        .map(decode_ampersands)
        .unwrap_or_default();

    Some(CatalogItem {
        id: format!("{}_{}", series.id, number),
        imdb_id: strip_imdb_prefix(sources.imdb_id),
        rt_id: sources.review.map(|r| review_id(MediaKind::Tv, &r.url)),
        name,
        genres: normalize_genres(&series.genres),
        summary,
        poster: season.poster_path.clone().or_else(|| series.poster_path.clone()),
        trailer_key: pick_trailer(sources.season_videos)
            .or_else(|| pick_trailer(sources.series_videos)),
        date,
        disc_date: None,
        duration: None,
        season: Some(number),
        episodes: season.episode_count,
        scores,
        critics: sources.review.map(|r| r.critics.clone()).unwrap_or_default(),
        consensus: consensus_at(payload, &["seasonData", "tomatometer", "consensus"]),
    })
}

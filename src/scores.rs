//! Score normalization.
//!
//! Each provider reports ratings in its own shape. Extraction turns those
//! payloads into `{votes, value}` records per [`ScoreOrigin`]; admission then
//! applies the minimum-vote thresholds. An origin whose source returned no
//! usable numbers is simply absent, never zero.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScoreOrigin {
    /// IMDb user rating; gates the whole item.
    PrimaryAudienceRating,
    /// Rotten Tomatoes audience score.
    SecondaryAudienceRating,
    AllCriticsRating,
    TopCriticsRating,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub votes: u64,
    pub value: f64,
}

/// Partial map of origin to record, serialized with camelCase origin keys.
pub type Scores = BTreeMap<ScoreOrigin, ScoreRecord>;

/// Minimum vote counts per origin (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    pub primary_audience: u64,
    pub secondary_audience: u64,
    pub all_critics: u64,
    pub top_critics: u64,
}

impl Thresholds {
    pub fn movie() -> Self {
        Self {
            primary_audience: 500,
            secondary_audience: 100,
            all_critics: 10,
            top_critics: 2,
        }
    }

    pub fn season() -> Self {
        Self {
            primary_audience: 500,
            secondary_audience: 5,
            all_critics: 5,
            top_critics: 2,
        }
    }

    pub fn min_votes(&self, origin: ScoreOrigin) -> u64 {
        match origin {
            ScoreOrigin::PrimaryAudienceRating => self.primary_audience,
            ScoreOrigin::SecondaryAudienceRating => self.secondary_audience,
            ScoreOrigin::AllCriticsRating => self.all_critics,
            ScoreOrigin::TopCriticsRating => self.top_critics,
        }
    }
}

/// What a secondary origin below its threshold does to the item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdPolicy {
    /// Leave that origin out and keep the item.
    #[default]
    OmitOrigin,
    /// Reject the whole item.
    DropItem,
}

/// Rotten Tomatoes payload a work's review scores come from.
#[derive(Debug, Clone, Copy)]
pub enum ReviewPayload<'a> {
    /// `scoreInfo` object from a movie page.
    Movie(&'a Value),
    /// `result` object from a season page.
    Season(&'a Value),
}

/// Vote count from a number or a string with thousands separators.
pub fn parse_votes(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => {
            let digits: String = s.chars().filter(|c| !matches!(c, ',' | ' ' | '_')).collect();
            digits.trim().parse().ok()
        }
        _ => None,
    }
}

/// Rating value from a number or a numeric-prefixed string ("7.9", "3.5/5").
pub fn parse_rating(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            let end = s
                .char_indices()
                .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || (i == 0 && c == '-')))
                .map(|(i, _)| i)
                .unwrap_or(s.len());
            s[..end].parse().ok()
        }
        _ => None,
    }
}

fn record(votes: &Value, value: &Value) -> Option<ScoreRecord> {
    Some(ScoreRecord {
        votes: parse_votes(votes)?,
        value: parse_rating(value)?,
    })
}

/// Primary origin from IMDb's ld+json block. A missing count reads as zero votes.
pub fn primary_from_reference(reference: &Value) -> Option<ScoreRecord> {
    let rating = reference.get("aggregateRating")?;
    let value = parse_rating(rating.get("ratingValue")?)?;
    if value <= 0.0 {
        return None;
    }
    let votes = rating.get("ratingCount").and_then(parse_votes).unwrap_or(0);
    Some(ScoreRecord { votes, value })
}

/// Rotten Tomatoes origins, before any threshold is applied.
pub fn review_scores(payload: ReviewPayload<'_>) -> Scores {
    let mut scores = Scores::new();
    match payload {
        ReviewPayload::Movie(info) => {
            if let Some(audience) = info
                .get("audienceAll")
                .filter(|a| a.as_object().is_some_and(|o| !o.is_empty()))
            {
                if let Some(r) = record(&audience["ratingCount"], &audience["averageRating"]) {
                    scores.insert(ScoreOrigin::SecondaryAudienceRating, r);
                }
            }
            if let Some(all) = info.get("tomatometerAllCritics") {
                if let Some(r) = record(&all["numberOfReviews"], &all["avgScore"]) {
                    scores.insert(ScoreOrigin::AllCriticsRating, r);
                }
            }
            if let Some(top) = info.get("tomatometerTopCritics") {
                if let Some(r) = record(&top["numberOfReviews"], &top["avgScore"]) {
                    scores.insert(ScoreOrigin::TopCriticsRating, r);
                }
            }
        }
        ReviewPayload::Season(result) => {
            let Some(season) = result.get("seasonData") else {
                return scores;
            };
            if let Some(summary) = season.get("tvRatingSummary") {
                if let Some(r) = record(&summary["numReviews"], &summary["averageRating"]) {
                    scores.insert(ScoreOrigin::SecondaryAudienceRating, r);
                }
            }
            if let Some(meter) = season.get("tomatometer") {
                if let Some(r) = record(&meter["numReviews"], &meter["averageScore"]) {
                    scores.insert(ScoreOrigin::AllCriticsRating, r);
                }
            }
            if let Some(top) = season.get("topTomatometer") {
                // a zero review count comes with a meaningless score
                let top_record = record(&top["numReviews"], &top["averageScore"]);
                if let Some(r) = top_record.filter(|r| r.votes > 0) {
                    scores.insert(ScoreOrigin::TopCriticsRating, r);
                }
            }
        }
    }
    scores
}

/// Apply admissibility: the primary origin must be present with a positive
/// value and enough votes, otherwise the item is rejected (`None`). Secondary
/// origins below threshold are handled per `policy`.
pub fn admit(raw: Scores, thresholds: &Thresholds, policy: ThresholdPolicy) -> Option<Scores> {
    let primary = raw.get(&ScoreOrigin::PrimaryAudienceRating)?;
    if primary.value <= 0.0 || primary.votes < thresholds.primary_audience {
        debug!(
            "Primary rating rejected: votes={} value={} min_votes={}",
            primary.votes, primary.value, thresholds.primary_audience
        );
        return None;
    }

    let mut admitted = Scores::new();
    for (origin, rec) in raw {
        if rec.votes >= thresholds.min_votes(origin) {
            admitted.insert(origin, rec);
            continue;
        }
        match policy {
            ThresholdPolicy::OmitOrigin => {
                debug!(
                    "Omitting {:?}: {} votes below {}",
                    origin,
                    rec.votes,
                    thresholds.min_votes(origin)
                );
            }
            ThresholdPolicy::DropItem => {
                debug!("Dropping item: {:?} has {} votes", origin, rec.votes);
                return None;
            }
        }
    }
    Some(admitted)
}

/// Extract and admit every origin for one work or season.
pub fn normalize_scores(
    reference: &Value,
    review: Option<ReviewPayload<'_>>,
    thresholds: &Thresholds,
    policy: ThresholdPolicy,
) -> Option<Scores> {
    let mut raw = review.map(review_scores).unwrap_or_default();
    if let Some(primary) = primary_from_reference(reference) {
        raw.insert(ScoreOrigin::PrimaryAudienceRating, primary);
    }
    admit(raw, thresholds, policy)
}

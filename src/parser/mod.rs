//! Extraction helpers for scraped pages.
//!
//! Every function here treats a missing marker or malformed payload as
//! "no data" and returns `None` (or an empty list); nothing here fails a scrape.

use crate::types::CriticQuote;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;

static DISC_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<li[^>]*>.*?On Disc/Streaming:.*?<time datetime="[^"]+">(.+?)</time>.*?</li>"#)
        .expect("disc date pattern is valid")
});

static ISO_DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+(?:\.\d+)?)S)?)?$")
        .expect("duration pattern is valid")
});

/// Parse the JSON text found between `open` and the next `close` marker.
pub fn extract_embedded_json(page: &str, open: &str, close: &str) -> Option<Value> {
    let start = page.find(open)? + open.len();
    let end = start + page[start..].find(close)?;
    match serde_json::from_str(page[start..end].trim()) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!("Embedded JSON after {:?} failed to parse: {}", open, e);
            None
        }
    }
}

/// Parse the object literal assigned right after `marker`, e.g.
/// `root.App.context.result = {...};`.
///
/// Only the first complete JSON value is read, so the trailing `;` and any
/// following script are ignored.
pub fn extract_marked_object(page: &str, marker: &str) -> Option<Value> {
    let after = &page[page.find(marker)? + marker.len()..];
    let body = after.trim_start();
    if !body.starts_with('{') {
        return None;
    }

    match serde_json::Deserializer::from_str(body)
        .into_iter::<Value>()
        .next()?
    {
        Ok(value) => Some(value),
        Err(e) => {
            debug!("Object after {:?} failed to parse: {}", marker, e);
            None
        }
    }
}

/// Top-critic review rows: first `per_side` positive quotes, then first `per_side` negative.
pub fn parse_critic_reviews(page: &str, quote_selector: &str, per_side: usize) -> Vec<CriticQuote> {
    let (Ok(scoped_rows), Ok(any_rows), Ok(quote), Ok(rotten)) = (
        Selector::parse("section#content .review_table_row"),
        Selector::parse(".review_table_row"),
        Selector::parse(quote_selector),
        Selector::parse(".rotten"),
    ) else {
        return Vec::new();
    };

    let document = Html::parse_document(page);
    let mut rows: Vec<_> = document.select(&scoped_rows).collect();
    if rows.is_empty() {
        rows = document.select(&any_rows).collect();
    }

    let all: Vec<CriticQuote> = rows
        .into_iter()
        .filter_map(|row| {
            let text = row
                .select(&quote)
                .next()?
                .text()
                .collect::<String>()
                .trim()
                .to_string();
            Some(CriticQuote {
                text,
                positive: row.select(&rotten).next().is_none(),
            })
        })
        .collect();

    let positive = all.iter().filter(|q| q.positive).take(per_side);
    let negative = all.iter().filter(|q| !q.positive).take(per_side);
    positive.chain(negative).cloned().collect()
}

/// "On Disc/Streaming" date from a movie page's info list.
pub fn parse_disc_date(page: &str) -> Option<NaiveDate> {
    let start = page.find("In Theaters:").unwrap_or(0);
    let end = page[start..]
        .find("Studio:")
        .map(|i| start + i)
        .unwrap_or(page.len());
    let captures = DISC_DATE_RE.captures(&page[start..end])?;
    NaiveDate::parse_from_str(captures.get(1)?.as_str().trim(), "%b %d, %Y").ok()
}

/// Minutes in an ISO-8601 duration such as `PT2H28M`; zero counts as absent.
pub fn parse_iso_duration_minutes(text: &str) -> Option<u32> {
    let captures = ISO_DURATION_RE.captures(text.trim())?;
    let part = |i: usize| -> f64 {
        captures
            .get(i)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .unwrap_or(0.0)
    };
    let minutes = part(1) * 24.0 * 60.0 + part(2) * 60.0 + part(3) + part(4) / 60.0;
    let minutes = minutes.round() as u32;
    (minutes > 0).then_some(minutes)
}

pub fn strip_emphasis(text: &str) -> String {
    text.replace("<em>", "").replace("</em>", "")
}

pub fn decode_ampersands(text: &str) -> String {
    text.replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{LD_JSON_CLOSE, LD_JSON_OPEN, RT_SCORE_INFO_MARKER};

    #[test]
    fn test_extract_ld_json_block() {
        let page = r#"<html><head><script type="application/ld+json">
            {"@type":"Movie","aggregateRating":{"ratingValue":"7.9","ratingCount":1200}}
        </script></head></html>"#;
        let value = extract_embedded_json(page, LD_JSON_OPEN, LD_JSON_CLOSE).unwrap();
        assert_eq!(value["aggregateRating"]["ratingCount"], 1200);
    }

    #[test]
    fn test_missing_marker_or_bad_json_is_none() {
        assert!(extract_embedded_json("<html></html>", LD_JSON_OPEN, LD_JSON_CLOSE).is_none());
        let broken = format!("{}{{not json</script>", LD_JSON_OPEN);
        assert!(extract_embedded_json(&broken, LD_JSON_OPEN, LD_JSON_CLOSE).is_none());
        assert!(extract_marked_object("var x = 1;", RT_SCORE_INFO_MARKER).is_none());
    }

    #[test]
    fn test_extract_marked_object_stops_after_first_value() {
        let page = r#"<script>
            root.RottenTomatoes.context.scoreInfo = {"tomatometerAllCritics":{"avgScore":7.1,"consensus":"Tense }; taut"},"audienceAll":{}};
            root.RottenTomatoes.context.other = {};
        </script>"#;
        let value = extract_marked_object(page, RT_SCORE_INFO_MARKER).unwrap();
        assert_eq!(value["tomatometerAllCritics"]["avgScore"], 7.1);
        assert_eq!(value["tomatometerAllCritics"]["consensus"], "Tense }; taut");

        let truncated = format!("{}{{\"audienceAll\": {{\"ratingCount\": ;", RT_SCORE_INFO_MARKER);
        assert!(extract_marked_object(&truncated, RT_SCORE_INFO_MARKER).is_none());
    }

    #[test]
    fn test_parse_critic_reviews_keeps_two_per_side() {
        let page = r#"<html><body><section id="content">
            <div class="review_table_row"><div class="fresh"></div><div class="the_review"> Great </div></div>
            <div class="review_table_row"><div class="rotten"></div><div class="the_review">Bad one</div></div>
            <div class="review_table_row"><div class="fresh"></div><div class="the_review">Good</div></div>
            <div class="review_table_row"><div class="fresh"></div><div class="the_review">Also good</div></div>
            <div class="review_table_row"><div class="rotten"></div><div class="the_review">Bad two</div></div>
            <div class="review_table_row"><div class="rotten"></div><div class="the_review">Bad three</div></div>
        </section></body></html>"#;
        let quotes = parse_critic_reviews(page, ".the_review", 2);
        let texts: Vec<_> = quotes.iter().map(|q| q.text.as_str()).collect();
        assert_eq!(texts, vec!["Great", "Good", "Bad one", "Bad two"]);
        assert!(quotes[0].positive && !quotes[2].positive);
    }

    #[test]
    fn test_parse_disc_date() {
        let page = r#"<ul><li>In Theaters: <time datetime="2019-05-03">May 3, 2019</time></li>
            <li class="meta-row">On Disc/Streaming: <time datetime="2019-08-13T17:00:00-07:00">Aug 13, 2019</time> </li>
            <li>Studio: A24</li></ul>"#;
        assert_eq!(parse_disc_date(page), NaiveDate::from_ymd_opt(2019, 8, 13));
        assert_eq!(parse_disc_date("<ul><li>Studio: A24</li></ul>"), None);
    }

    #[test]
    fn test_parse_iso_duration() {
        assert_eq!(parse_iso_duration_minutes("PT2H28M"), Some(148));
        assert_eq!(parse_iso_duration_minutes("PT45M"), Some(45));
        assert_eq!(parse_iso_duration_minutes("PT1H"), Some(60));
        assert_eq!(parse_iso_duration_minutes("PT0M"), None);
        assert_eq!(parse_iso_duration_minutes("two hours"), None);
    }

    #[test]
    fn test_text_cleanup() {
        assert_eq!(strip_emphasis("<em>Alien</em> still thrills"), "Alien still thrills");
        assert_eq!(decode_ampersands("Tom &amp; Jerry"), "Tom & Jerry");
    }
}

//! Name/date matching between a catalog work and Rotten Tomatoes search hits.
//!
//! Search is a fuzzy free-text index, so a single signal is rarely decisive.
//! The cascade tries increasingly combined signals against the full candidate
//! list and stops at the first stage that resolves to exactly one hit; if none
//! does, it narrows the list step by step and accepts a lone survivor.

use crate::config::MatchingConfig;
use crate::constants::{RT_NULL_MOVIE_URL, RT_NULL_SERIES_URL};
use crate::types::{MediaKind, ReviewCandidate};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static PUNCTUATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[.,:\-/'"]+"#).expect("punctuation pattern is valid"));
static WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Lower-case, drop `. , : - / ' "` and collapse whitespace.
pub fn normalize_name(name: &str) -> String {
    let lowered = name.to_lowercase();
    let stripped = PUNCTUATION_RE.replace_all(&lowered, "");
    WHITESPACE_RE.replace_all(stripped.trim(), " ").into_owned()
}

pub fn same_name(a: &str, b: &str) -> bool {
    normalize_name(a) == normalize_name(b)
}

/// The work being looked up.
#[derive(Debug, Clone)]
pub struct MatchTarget<'a> {
    pub kind: MediaKind,
    pub title: &'a str,
    /// Release year (movies) or first-air year (series).
    pub year: Option<i32>,
    /// Last-air year; series only.
    pub end_year: Option<i32>,
    /// Already-fetched reference page text, searched for cast names.
    pub page_text: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchPolicy {
    pub year_window: i32,
    pub accept_pair_tie_break: bool,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            year_window: 2,
            accept_pair_tie_break: true,
        }
    }
}

impl From<&MatchingConfig> for MatchPolicy {
    fn from(config: &MatchingConfig) -> Self {
        Self {
            year_window: config.year_window,
            accept_pair_tie_break: config.accept_pair_tie_break,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum YearField {
    Start,
    End,
}

#[derive(Debug, Clone, Copy)]
enum Signal {
    Year(YearField),
    Cast,
    Name,
}

/// A stage holds when every signal holds.
struct Stage {
    signals: &'static [Signal],
    accept_pair: bool,
}

#[derive(Debug, Clone, Copy)]
enum Narrowing {
    CastOrUnlisted,
    YearWindow(YearField),
    Name,
}

const MOVIE_STAGES: &[Stage] = &[
    Stage {
        signals: &[Signal::Year(YearField::Start)],
        accept_pair: false,
    },
    Stage {
        signals: &[Signal::Cast],
        accept_pair: false,
    },
    Stage {
        signals: &[Signal::Name],
        accept_pair: false,
    },
    Stage {
        signals: &[Signal::Year(YearField::Start), Signal::Name],
        accept_pair: false,
    },
    Stage {
        signals: &[Signal::Year(YearField::Start), Signal::Cast, Signal::Name],
        accept_pair: true,
    },
];

const MOVIE_NARROWING: &[Narrowing] = &[
    Narrowing::CastOrUnlisted,
    Narrowing::YearWindow(YearField::Start),
    Narrowing::Name,
];

// Series hits carry no cast, so name plus start year is the strongest combination.
const SERIES_STAGES: &[Stage] = &[
    Stage {
        signals: &[Signal::Year(YearField::Start)],
        accept_pair: false,
    },
    Stage {
        signals: &[Signal::Year(YearField::End)],
        accept_pair: false,
    },
    Stage {
        signals: &[Signal::Cast],
        accept_pair: false,
    },
    Stage {
        signals: &[Signal::Name],
        accept_pair: false,
    },
    Stage {
        signals: &[Signal::Year(YearField::Start), Signal::Name],
        accept_pair: true,
    },
];

const SERIES_NARROWING: &[Narrowing] = &[
    Narrowing::CastOrUnlisted,
    Narrowing::YearWindow(YearField::Start),
    Narrowing::YearWindow(YearField::End),
    Narrowing::Name,
];

struct Matcher<'a> {
    target: &'a MatchTarget<'a>,
    policy: MatchPolicy,
}

impl Matcher<'_> {
    fn target_year(&self, field: YearField) -> Option<i32> {
        match field {
            YearField::Start => self.target.year,
            YearField::End => self.target.end_year,
        }
    }

    fn candidate_year(&self, candidate: &ReviewCandidate, field: YearField) -> Option<i32> {
        match (self.target.kind, field) {
            (MediaKind::Movie, _) => candidate.year,
            (MediaKind::Tv, YearField::Start) => candidate.start_year,
            (MediaKind::Tv, YearField::End) => candidate.end_year,
        }
    }

    fn cast_overlaps(&self, candidate: &ReviewCandidate) -> bool {
        candidate
            .cast_items
            .iter()
            .any(|c| !c.name.is_empty() && self.target.page_text.contains(&c.name))
    }

    fn years(&self, candidate: &ReviewCandidate, field: YearField) -> (Option<i32>, Option<i32>) {
        (self.candidate_year(candidate, field), self.target_year(field))
    }

    fn holds(&self, candidate: &ReviewCandidate, signal: Signal) -> bool {
        match signal {
            Signal::Year(field) => match self.years(candidate, field) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
            Signal::Cast => self.cast_overlaps(candidate),
            Signal::Name => same_name(self.target.title, candidate.display_name()),
        }
    }

    fn keeps(&self, candidate: &ReviewCandidate, step: Narrowing) -> bool {
        match step {
            Narrowing::CastOrUnlisted => {
                candidate.cast_items.is_empty() || self.cast_overlaps(candidate)
            }
            Narrowing::YearWindow(field) => match self.years(candidate, field) {
                (None, _) => true,
                (Some(a), Some(b)) => (a - b).abs() <= self.policy.year_window,
                (Some(_), None) => false,
            },
            Narrowing::Name => self.holds(candidate, Signal::Name),
        }
    }
}

/// Pick at most one candidate for `target`. Placeholder hits are ignored and
/// an unresolved ambiguity yields `None`.
pub fn match_candidate<'c>(
    target: &MatchTarget<'_>,
    candidates: &'c [ReviewCandidate],
    policy: MatchPolicy,
) -> Option<&'c ReviewCandidate> {
    let placeholder = match target.kind {
        MediaKind::Movie => RT_NULL_MOVIE_URL,
        MediaKind::Tv => RT_NULL_SERIES_URL,
    };
    let pool: Vec<&ReviewCandidate> = candidates
        .iter()
        .filter(|c| c.url != placeholder)
        .collect();

    if pool.len() == 1 {
        return Some(pool[0]);
    }
    if pool.is_empty() {
        return None;
    }

    let matcher = Matcher { target, policy };
    let (stages, narrowing) = match target.kind {
        MediaKind::Movie => (MOVIE_STAGES, MOVIE_NARROWING),
        MediaKind::Tv => (SERIES_STAGES, SERIES_NARROWING),
    };

    for (i, stage) in stages.iter().enumerate() {
        let hits: Vec<&ReviewCandidate> = pool
            .iter()
            .copied()
            .filter(|c| stage.signals.iter().all(|s| matcher.holds(c, *s)))
            .collect();
        let pair_ok = stage.accept_pair && policy.accept_pair_tie_break && hits.len() == 2;
        if hits.len() == 1 || pair_ok {
            debug!(
                "Matched '{}' at stage {} ({} of {} candidates)",
                target.title,
                i + 2,
                hits.len(),
                pool.len()
            );
            return hits.first().copied();
        }
    }

    let mut remaining = pool;
    for step in narrowing {
        remaining.retain(|c| matcher.keeps(c, *step));
        if remaining.len() == 1 {
            debug!("Matched '{}' after narrowing by {:?}", target.title, step);
            return remaining.first().copied();
        }
    }

    debug!(
        "No unambiguous match for '{}' ({} candidates left)",
        target.title,
        remaining.len()
    );
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CastItem;

    fn movie(name: &str, year: Option<i32>, cast: &[&str]) -> ReviewCandidate {
        ReviewCandidate {
            name: Some(name.to_string()),
            year,
            url: format!("/m/{}", normalize_name(name).replace(' ', "_")),
            cast_items: cast.iter().map(|n| CastItem { name: n.to_string() }).collect(),
            ..Default::default()
        }
    }

    fn series(title: &str, start: Option<i32>, end: Option<i32>) -> ReviewCandidate {
        ReviewCandidate {
            title: Some(title.to_string()),
            start_year: start,
            end_year: end,
            url: format!("/tv/{}", normalize_name(title).replace(' ', "_")),
            ..Default::default()
        }
    }

    fn movie_target<'a>(title: &'a str, year: i32, page_text: &'a str) -> MatchTarget<'a> {
        MatchTarget {
            kind: MediaKind::Movie,
            title,
            year: Some(year),
            end_year: None,
            page_text,
        }
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Spider-Man: Homecoming"), "spiderman homecoming");
        assert_eq!(normalize_name("spiderman   homecoming"), "spiderman homecoming");
        assert!(same_name("Ocean's Eleven", "oceans eleven"));
        assert!(same_name("M.A.S.H", "mash"));
        assert!(!same_name("Heat", "Heath"));
    }

    #[test]
    fn test_single_candidate_selected_outright() {
        let candidates = vec![movie("Something Else", Some(1970), &[])];
        let target = movie_target("Testmovie", 2020, "");
        let picked = match_candidate(&target, &candidates, MatchPolicy::default()).unwrap();
        assert_eq!(picked.display_name(), "Something Else");
    }

    #[test]
    fn test_placeholder_is_filtered_before_counting() {
        let mut placeholder = movie("Testmovie", Some(2020), &[]);
        placeholder.url = RT_NULL_MOVIE_URL.to_string();
        let candidates = vec![placeholder, movie("Real", Some(1999), &[])];
        let target = movie_target("Testmovie", 2020, "");
        let picked = match_candidate(&target, &candidates, MatchPolicy::default()).unwrap();
        assert_eq!(picked.display_name(), "Real");

        let only_placeholder = vec![candidates[0].clone()];
        assert!(match_candidate(&target, &only_placeholder, MatchPolicy::default()).is_none());
    }

    #[test]
    fn test_name_stage_breaks_same_year_tie() {
        let candidates = vec![movie("Testmovie", Some(2020), &[]), movie("Other", Some(2020), &[])];
        let target = movie_target("Testmovie", 2020, "<html>no cast here</html>");
        let picked = match_candidate(&target, &candidates, MatchPolicy::default()).unwrap();
        assert_eq!(picked.display_name(), "Testmovie");
    }

    #[test]
    fn test_same_name_and_year_is_ambiguous_without_cast() {
        let candidates = vec![movie("Heat", Some(1995), &[]), movie("Heat", Some(1995), &[])];
        let target = movie_target("Heat", 1995, "Al Pacino");
        assert!(match_candidate(&target, &candidates, MatchPolicy::default()).is_none());
    }

    #[test]
    fn test_cast_overlap_resolves_duplicates() {
        let candidates = vec![
            movie("Heat", Some(1995), &["Al Pacino"]),
            movie("Heat", Some(1995), &["Someone Else"]),
        ];
        let target = movie_target("Heat", 1995, "<li>Al Pacino</li>");
        let picked = match_candidate(&target, &candidates, MatchPolicy::default()).unwrap();
        assert_eq!(picked.cast_items[0].name, "Al Pacino");
    }

    #[test]
    fn test_pair_tie_break_is_configurable() {
        // Both share year, cast and name; a third hit keeps the single-signal stages ambiguous.
        let candidates = vec![
            movie("Dune", Some(2021), &["Zendaya"]),
            movie("Dune", Some(2021), &["Zendaya"]),
            movie("Dune", Some(1984), &["Kyle MacLachlan"]),
        ];
        let page = "Zendaya Kyle MacLachlan";
        let target = movie_target("Dune", 2021, page);
        assert!(match_candidate(&target, &candidates, MatchPolicy::default()).is_some());

        let strict = MatchPolicy {
            accept_pair_tie_break: false,
            ..MatchPolicy::default()
        };
        assert!(match_candidate(&target, &candidates, strict).is_none());
    }

    #[test]
    fn test_year_window_accepts_two_rejects_three() {
        // names differ from the target so only the narrowing steps can decide
        let within = vec![movie("Alpha", Some(2018), &[]), movie("Beta", Some(2017), &[])];
        let target = movie_target("Gamma", 2020, "");
        let picked = match_candidate(&target, &within, MatchPolicy::default()).unwrap();
        assert_eq!(picked.year, Some(2018));

        let ahead = vec![movie("Alpha", Some(2022), &[]), movie("Beta", Some(2023), &[])];
        let picked = match_candidate(&target, &ahead, MatchPolicy::default()).unwrap();
        assert_eq!(picked.year, Some(2022));

        let both_far = vec![movie("Alpha", Some(2017), &[]), movie("Beta", Some(2023), &[])];
        assert!(match_candidate(&target, &both_far, MatchPolicy::default()).is_none());
    }

    #[test]
    fn test_year_window_keeps_candidates_without_year() {
        let candidates = vec![
            movie("Alpha", None, &[]),
            movie("Beta", Some(2010), &[]),
            movie("Gamma", Some(2001), &[]),
        ];
        let target = movie_target("Delta", 2020, "");
        let picked = match_candidate(&target, &candidates, MatchPolicy::default()).unwrap();
        assert_eq!(picked.display_name(), "Alpha");
    }

    #[test]
    fn test_series_start_then_end_year() {
        let candidates = vec![
            series("Fargo", Some(2014), None),
            series("Fargo", Some(1997), Some(1998)),
        ];
        let target = MatchTarget {
            kind: MediaKind::Tv,
            title: "Fargo",
            year: Some(2014),
            end_year: Some(2024),
            page_text: "",
        };
        let picked = match_candidate(&target, &candidates, MatchPolicy::default()).unwrap();
        assert_eq!(picked.start_year, Some(2014));

        let by_end = vec![
            series("Fargo", Some(2013), Some(2024)),
            series("Fargo", Some(1997), Some(1998)),
        ];
        let picked = match_candidate(&target, &by_end, MatchPolicy::default()).unwrap();
        assert_eq!(picked.end_year, Some(2024));
    }

    #[test]
    fn test_series_start_window_then_end_window() {
        // no exact year or name agrees, so the windows decide
        let candidates = vec![
            series("Alpha", Some(2011), Some(2016)),
            series("Beta", Some(2012), Some(2020)),
            series("Gamma", Some(2000), Some(2001)),
        ];
        let target = MatchTarget {
            kind: MediaKind::Tv,
            title: "Delta",
            year: Some(2010),
            end_year: Some(2015),
            page_text: "",
        };
        let picked = match_candidate(&target, &candidates, MatchPolicy::default()).unwrap();
        assert_eq!(picked.url, "/tv/alpha");

        // the start window alone leaves two, so without the end window nothing resolves
        let open_ended = MatchTarget {
            end_year: None,
            ..target.clone()
        };
        assert!(match_candidate(&open_ended, &candidates, MatchPolicy::default()).is_none());
    }

    #[test]
    fn test_empty_list_is_no_match() {
        let target = movie_target("Anything", 2020, "");
        assert!(match_candidate(&target, &[], MatchPolicy::default()).is_none());
    }
}

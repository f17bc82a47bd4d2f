use crate::apis::tmdb::DiscoverResult;
use crate::apis::rotten_tomatoes::season_path;
use crate::apis::{CatalogSource, ReferenceSource, ReviewData, ReviewSource};
use crate::assemble::{assemble_movie, assemble_season, MovieSources, SeasonSources};
use crate::config::Config;
use crate::error::{Result, ScraperError};
use crate::matching::{match_candidate, MatchPolicy, MatchTarget};
use crate::scores::{ThresholdPolicy, Thresholds};
use crate::storage::CatalogStore;
use crate::types::{CatalogItem, MediaKind};
use chrono::{Datelike, NaiveDate};
use futures::stream::{self, StreamExt};
use metrics::{counter, histogram};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn, Instrument};

/// The three providers a run pulls from.
#[derive(Clone)]
pub struct Sources {
    pub catalog: Arc<dyn CatalogSource>,
    pub reference: Arc<dyn ReferenceSource>,
    pub reviews: Arc<dyn ReviewSource>,
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Walked in order; the output has one partition per entry.
    pub years: Vec<i32>,
    pub media: Vec<MediaKind>,
    /// Works in any other original language are skipped; `None` keeps everything.
    pub language: Option<String>,
    pub match_policy: MatchPolicy,
    pub movie_thresholds: Thresholds,
    pub season_thresholds: Thresholds,
    pub threshold_policy: ThresholdPolicy,
    /// Works in flight per page; at least 1.
    pub movie_fan_out: usize,
    pub tv_fan_out: usize,
    /// Pause before each page's fan-out.
    pub batch_pause: Duration,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        let language = config.tmdb.language.trim();
        Self {
            years: config.scrape.years(),
            media: config.scrape.media.clone(),
            language: (!language.is_empty()).then(|| language.to_string()),
            match_policy: MatchPolicy::from(&config.matching),
            movie_thresholds: config.thresholds.movie(),
            season_thresholds: config.thresholds.season(),
            threshold_policy: config.thresholds.policy,
            movie_fan_out: config.scrape.fan_out(MediaKind::Movie),
            tv_fan_out: config.scrape.fan_out(MediaKind::Tv),
            batch_pause: config.fetch.batch_pause(),
        }
    }

    fn fan_out(&self, media: MediaKind) -> usize {
        match media {
            MediaKind::Movie => self.movie_fan_out,
            MediaKind::Tv => self.tv_fan_out,
        }
    }
}

/// Result of a complete pipeline run
#[derive(Debug, Default, Serialize)]
pub struct PipelineResult {
    pub pages_walked: usize,
    pub works_seen: usize,
    pub items_emitted: usize,
    pub items_skipped: usize,
    pub items_per_year: BTreeMap<i32, usize>,
    pub errors: Vec<String>,
}

pub struct Pipeline {
    sources: Sources,
    settings: PipelineSettings,
    store: Arc<dyn CatalogStore>,
}

impl Pipeline {
    pub fn new(sources: Sources, settings: PipelineSettings, store: Arc<dyn CatalogStore>) -> Self {
        Self {
            sources,
            settings,
            store,
        }
    }

    /// Walk every configured medium and year, then write the partitions.
    pub async fn run(&self) -> Result<PipelineResult> {
        let start = Instant::now();
        let mut result = PipelineResult::default();
        // first-seen wins; BTreeMap keeps partitions sorted by id
        let mut accumulated: BTreeMap<String, CatalogItem> = BTreeMap::new();

        info!(
            "🚀 Starting scrape of {} year(s) for {:?} via {} / {} / {}",
            self.settings.years.len(),
            self.settings.media,
            self.sources.catalog.provider_name(),
            self.sources.reference.provider_name(),
            self.sources.reviews.provider_name()
        );

        for media in self.settings.media.clone() {
            for &year in &self.settings.years {
                let span = tracing::info_span!("walk", media = %media, year);
                self.walk(media, year, &mut accumulated, &mut result)
                    .instrument(span)
                    .await;
            }
        }

        let partitions = partition_by_year(accumulated.into_values(), &self.settings.years);

        self.store.write_headers().await?;
        for (year, items) in &partitions {
            self.store.write_year(*year, items).await?;
            result.items_emitted += items.len();
            result.items_per_year.insert(*year, items.len());
        }

        counter!("watchpad_items_emitted_total").increment(result.items_emitted as u64);
        counter!("watchpad_items_skipped_total").increment(result.items_skipped as u64);
        counter!("watchpad_pipeline_errors_total").increment(result.errors.len() as u64);
        histogram!("watchpad_pipeline_duration_seconds").record(start.elapsed().as_secs_f64());

        info!(
            "✅ Scrape finished: {} items across {} years ({} skipped, {} errors)",
            result.items_emitted,
            partitions.len(),
            result.items_skipped,
            result.errors.len()
        );
        Ok(result)
    }

    /// Pages are walked one at a time; page 1 is fetched first for the page count.
    async fn walk(
        &self,
        media: MediaKind,
        year: i32,
        accumulated: &mut BTreeMap<String, CatalogItem>,
        result: &mut PipelineResult,
    ) {
        let catalog = &self.sources.catalog;
        let Some(first) = catalog.discover(media, year, 1).await else {
            warn!("No discover listing for {} {}", media, year);
            return;
        };
        let total_pages = first.total_pages;
        info!("{} {}: {} page(s)", media, year, total_pages);

        let mut first = Some(first);
        for page in 1..=total_pages {
            let listing = match first.take() {
                Some(listing) => listing,
                None => match catalog.discover(media, year, page).await {
                    Some(listing) => listing,
                    None => {
                        warn!("Skipping page {} of {} {}", page, media, year);
                        continue;
                    }
                },
            };
            info!("{:>3} / {:>3}", page, total_pages);
            result.pages_walked += 1;
            result.works_seen += listing.results.len();

            if !self.settings.batch_pause.is_zero() {
                tokio::time::sleep(self.settings.batch_pause).await;
            }

            let outcomes: Vec<(String, Result<Vec<CatalogItem>>)> = stream::iter(listing.results)
                .map(|work| async move {
                    let label = format!("{} {}", work.id, work.display_name());
                    (label, self.process_work(media, work).await)
                })
                .buffer_unordered(self.settings.fan_out(media))
                .collect()
                .await;

            for (label, outcome) in outcomes {
                match outcome {
                    Ok(items) if items.is_empty() => result.items_skipped += 1,
                    Ok(items) => {
                        for item in items {
                            accumulated.entry(item.id.clone()).or_insert(item);
                        }
                    }
                    Err(e @ ScraperError::MissingLinkage { .. }) => {
                        debug!("Skipping {}: {}", label, e);
                        result.items_skipped += 1;
                    }
                    Err(e) => {
                        warn!("Failed to process {}: {}", label, e);
                        result.errors.push(format!("{label}: {e}"));
                    }
                }
            }
        }
    }

    async fn process_work(
        &self,
        media: MediaKind,
        work: DiscoverResult,
    ) -> Result<Vec<CatalogItem>> {
        if let Some(language) = &self.settings.language {
            if work.original_language.as_deref() != Some(language.as_str()) {
                debug!(
                    "Skipping '{}': original language {:?}",
                    work.display_name(),
                    work.original_language
                );
                return Ok(Vec::new());
            }
        }
        match media {
            MediaKind::Movie => self.process_movie(&work).await,
            MediaKind::Tv => self.process_series(&work).await,
        }
    }

    #[instrument(skip(self, work), fields(id = work.id))]
    async fn process_movie(&self, work: &DiscoverResult) -> Result<Vec<CatalogItem>> {
        let Sources {
            catalog,
            reference,
            reviews,
        } = &self.sources;
        let label = work.display_name();

        let detail = catalog
            .movie_detail(work.id)
            .await
            .ok_or_else(|| ScraperError::missing(label, "movie detail"))?;
        let videos = catalog
            .videos(MediaKind::Movie, work.id)
            .await
            .ok_or_else(|| ScraperError::missing(label, "video list"))?;
        let imdb_id = detail
            .imdb_id
            .clone()
            .ok_or_else(|| ScraperError::missing(label, "reference id"))?;
        let reference_page = reference
            .title_page(&imdb_id)
            .await
            .ok_or_else(|| ScraperError::missing(label, "reference page"))?;

        let title = detail.title.as_deref().unwrap_or(label);
        let candidates = reviews.search(MediaKind::Movie, title).await;
        let target = MatchTarget {
            kind: MediaKind::Movie,
            title,
            year: year_of(detail.release_date.as_deref()),
            end_year: None,
            page_text: &reference_page.text,
        };

        let review = match match_candidate(&target, &candidates, self.settings.match_policy) {
            Some(candidate) => {
                Some(self.review_data(MediaKind::Movie, candidate.url.clone()).await)
            }
            None => None,
        };

        let item = assemble_movie(
            MovieSources {
                detail: &detail,
                videos: &videos,
                reference: &reference_page,
                review: review.as_ref(),
            },
            &self.settings.movie_thresholds,
            self.settings.threshold_policy,
        );
        Ok(item.into_iter().collect())
    }

    #[instrument(skip(self, work), fields(id = work.id))]
    async fn process_series(&self, work: &DiscoverResult) -> Result<Vec<CatalogItem>> {
        let Sources {
            catalog,
            reference,
            reviews,
        } = &self.sources;
        let label = work.display_name();

        let detail = catalog
            .tv_detail(work.id)
            .await
            .ok_or_else(|| ScraperError::missing(label, "series detail"))?;
        let imdb_id = catalog
            .external_ids(MediaKind::Tv, work.id)
            .await
            .and_then(|ids| ids.imdb_id)
            .ok_or_else(|| ScraperError::missing(label, "reference id"))?;
        let series_videos = catalog
            .videos(MediaKind::Tv, work.id)
            .await
            .ok_or_else(|| ScraperError::missing(label, "video list"))?;
        let seasons = detail
            .seasons
            .as_deref()
            .ok_or_else(|| ScraperError::missing(label, "season list"))?;
        let reference_page = reference
            .title_page(&imdb_id)
            .await
            .ok_or_else(|| ScraperError::missing(label, "reference page"))?;

        let title = detail.name.as_deref().unwrap_or(label);
        let candidates = reviews.search(MediaKind::Tv, title).await;
        let target = MatchTarget {
            kind: MediaKind::Tv,
            title,
            year: year_of(detail.first_air_date.as_deref()),
            end_year: year_of(detail.last_air_date.as_deref()),
            page_text: &reference_page.text,
        };
        let matched = match_candidate(&target, &candidates, self.settings.match_policy);

        let mut items = Vec::new();
        for season in seasons {
            if season.season_number <= 0 {
                continue;
            }
            let Some(season_videos) = catalog
                .season_videos(work.id, season.season_number)
                .await
            else {
                debug!("No videos listing for '{}' season {}", title, season.season_number);
                continue;
            };

            let review = match matched {
                Some(candidate) => {
                    let path = season_path(&candidate.url, season.season_number);
                    Some(self.review_data(MediaKind::Tv, path).await)
                }
                None => None,
            };

            let item = assemble_season(
                SeasonSources {
                    series: &detail,
                    season,
                    imdb_id: &imdb_id,
                    season_videos: &season_videos,
                    series_videos: &series_videos,
                    reference: &reference_page,
                    review: review.as_ref(),
                },
                &self.settings.season_thresholds,
                self.settings.threshold_policy,
            );
            items.extend(item);
        }
        Ok(items)
    }

    /// Page data for a matched title. The match itself is kept even when the
    /// page is unavailable, so the item still links to it.
    async fn review_data(&self, media: MediaKind, url: String) -> ReviewData {
        let reviews = &self.sources.reviews;
        match reviews.title_page(media, &url).await {
            Some(page) => ReviewData {
                critics: reviews.top_critics(media, &url).await,
                payload: page.payload,
                disc_date: page.disc_date,
                url,
            },
            None => ReviewData {
                url,
                ..Default::default()
            },
        }
    }
}

fn year_of(date: Option<&str>) -> Option<i32> {
    NaiveDate::parse_from_str(date?, "%Y-%m-%d")
        .ok()
        .map(|d| d.year())
}

/// One partition per walked year (empty ones included), items kept in input order.
/// Items dated outside the walked years are dropped.
pub fn partition_by_year(
    items: impl IntoIterator<Item = CatalogItem>,
    years: &[i32],
) -> BTreeMap<i32, Vec<CatalogItem>> {
    let mut partitions: BTreeMap<i32, Vec<CatalogItem>> =
        years.iter().map(|y| (*y, Vec::new())).collect();
    for item in items {
        match item.year().and_then(|y| partitions.get_mut(&y)) {
            Some(bucket) => bucket.push(item),
            None => debug!("Dropping {} dated '{}' outside the walked years", item.id, item.date),
        }
    }
    partitions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scores::Scores;

    fn item(id: &str, date: &str) -> CatalogItem {
        CatalogItem {
            id: id.to_string(),
            imdb_id: "1".to_string(),
            rt_id: None,
            name: id.to_string(),
            genres: Vec::new(),
            summary: String::new(),
            poster: None,
            trailer_key: None,
            date: date.to_string(),
            disc_date: None,
            duration: None,
            season: None,
            episodes: None,
            scores: Scores::new(),
            critics: Vec::new(),
            consensus: None,
        }
    }

    #[test]
    fn test_partition_keeps_empty_years_and_drops_strays() {
        let items = vec![
            item("a", "2020-03-01"),
            item("b", "2018-01-01"),
            item("c", "2020-12-31"),
        ];
        let partitions = partition_by_year(items, &[2021, 2020]);
        assert_eq!(partitions.len(), 2);
        assert!(partitions[&2021].is_empty());
        let ids: Vec<_> = partitions[&2020].iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_year_of() {
        assert_eq!(year_of(Some("1995-12-15")), Some(1995));
        assert_eq!(year_of(Some("")), None);
        assert_eq!(year_of(None), None);
    }

    #[test]
    fn test_settings_from_default_config() {
        let settings = PipelineSettings::from_config(&Config::default());
        assert_eq!(settings.language.as_deref(), Some("en"));
        assert_eq!(settings.fan_out(MediaKind::Movie), 10);
        assert_eq!(settings.fan_out(MediaKind::Tv), 5);
        assert_eq!(settings.years.first(), Some(&chrono::Local::now().year()));
        assert_eq!(settings.years.last(), Some(&1900));
    }

    #[test]
    fn test_settings_store_clamped_fan_out() {
        let mut config = Config::default();
        config.scrape.tv_fan_out = 0;
        let settings = PipelineSettings::from_config(&config);
        assert_eq!(settings.tv_fan_out, 1);
        assert_eq!(settings.fan_out(MediaKind::Tv), 1);
    }
}

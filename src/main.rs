use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use watchpad_scraper::apis::{ImdbApi, RottenTomatoesApi, TmdbApi};
use watchpad_scraper::app::ports::HttpClientPort;
use watchpad_scraper::config::Config;
use watchpad_scraper::fetch::{FetchClient, RetryPolicy};
use watchpad_scraper::infra::http_client::ReqwestHttp;
use watchpad_scraper::logging;
use watchpad_scraper::pipeline::{Pipeline, PipelineSettings, Sources};
use watchpad_scraper::storage::FileStore;
use watchpad_scraper::types::MediaKind;

#[derive(Parser)]
#[command(name = "watchpad_scraper")]
#[command(about = "Builds the year-partitioned movie and TV catalog")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape every configured year and write `{year}.json` files
    Run {
        /// Configuration file; defaults apply when it does not exist
        #[arg(long, default_value = "config.toml")]
        config: PathBuf,
        /// Single year or inclusive range, e.g. `2020` or `2015..2020`
        #[arg(long)]
        years: Option<String>,
        /// Media kinds to scrape (comma-separated). Available: movie, tv
        #[arg(long)]
        media: Option<String>,
        /// Directory the year files are written to
        #[arg(long)]
        output_dir: Option<String>,
        /// Directory for rolling JSON log files
        #[arg(long, default_value = "logs")]
        log_dir: String,
    },
}

/// Parse `2020` or `2015..2020` into an inclusive `(min, max)` pair.
fn parse_year_range(text: &str) -> anyhow::Result<(i32, i32)> {
    let (min, max) = match text.split_once("..") {
        Some((min, max)) => (min.trim(), max.trim_start_matches('=').trim()),
        None => (text.trim(), text.trim()),
    };
    let min: i32 = min.parse().with_context(|| format!("invalid year '{min}'"))?;
    let max: i32 = max.parse().with_context(|| format!("invalid year '{max}'"))?;
    if max < min {
        bail!("year range {min}..{max} is inverted");
    }
    Ok((min, max))
}

fn parse_media(text: &str) -> anyhow::Result<Vec<MediaKind>> {
    let media = text
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.parse::<MediaKind>().map_err(anyhow::Error::msg))
        .collect::<anyhow::Result<Vec<_>>>()?;
    if media.is_empty() {
        bail!("no media kinds given");
    }
    Ok(media)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            years,
            media,
            output_dir,
            log_dir,
        } => {
            logging::init_logging(&log_dir);

            let mut config = Config::load_or_default(&config)
                .with_context(|| format!("loading {}", config.display()))?;
            if let Some(years) = years {
                let (min, max) = parse_year_range(&years)?;
                config.scrape.min_year = min;
                config.scrape.max_year = Some(max);
            }
            if let Some(media) = media {
                config.scrape.media = parse_media(&media)?;
            }
            if let Some(output_dir) = output_dir {
                config.scrape.output_dir = output_dir;
            }

            let api_key = Config::api_key().context("a TMDB API key is required")?;

            let http: Arc<dyn HttpClientPort> = Arc::new(ReqwestHttp::new(&config.fetch)?);
            let fetch = FetchClient::new(http, RetryPolicy::from(&config.fetch));
            let sources = Sources {
                catalog: Arc::new(TmdbApi::new(fetch.clone(), &config.tmdb, api_key)),
                reference: Arc::new(ImdbApi::new(fetch.clone(), &config.imdb)),
                reviews: Arc::new(RottenTomatoesApi::new(fetch, &config.rotten_tomatoes)),
            };
            let store = Arc::new(FileStore::new(&config.scrape.output_dir));
            let settings = PipelineSettings::from_config(&config);

            println!("🎬 Scraping {:?} into {}", settings.media, config.scrape.output_dir);
            info!("Starting pipeline");
            let result = Pipeline::new(sources, settings, store).run().await?;
            info!("Pipeline finished");

            println!("\n📊 Pipeline Results:");
            println!("   Pages walked: {}", result.pages_walked);
            println!("   Works seen: {}", result.works_seen);
            println!("   Items written: {}", result.items_emitted);
            println!("   Skipped: {}", result.items_skipped);
            println!("   Errors: {}", result.errors.len());
            for (year, count) in result.items_per_year.iter().rev().filter(|(_, c)| **c > 0) {
                println!("   {}: {}", year, count);
            }

            if !result.errors.is_empty() {
                warn!("{} errors encountered during pipeline run", result.errors.len());
                println!("\n⚠️  Errors encountered:");
                for error in &result.errors {
                    println!("   - {}", error);
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_year_range() {
        assert_eq!(parse_year_range("2020").unwrap(), (2020, 2020));
        assert_eq!(parse_year_range("2015..2020").unwrap(), (2015, 2020));
        assert_eq!(parse_year_range("2015..=2020").unwrap(), (2015, 2020));
        assert!(parse_year_range("2020..2015").is_err());
        assert!(parse_year_range("soon").is_err());
    }

    #[test]
    fn test_parse_media() {
        assert_eq!(parse_media("movie, tv").unwrap(), vec![MediaKind::Movie, MediaKind::Tv]);
        assert!(parse_media("").is_err());
        assert!(parse_media("radio").is_err());
    }
}

use super::ReferenceSource;
use crate::config::ImdbConfig;
use crate::constants::{IMDB_PROVIDER, LD_JSON_CLOSE, LD_JSON_OPEN};
use crate::fetch::FetchClient;
use crate::parser::extract_embedded_json;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};

/// A fetched reference title page.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferencePage {
    /// Raw page text, searched for cast names during matching.
    pub text: String,
    /// The page's structured-data block (`aggregateRating`, `description`, `duration`).
    pub data: Value,
}

impl ReferencePage {
    pub fn description(&self) -> Option<&str> {
        self.data
            .get("description")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    pub fn duration(&self) -> Option<&str> {
        self.data.get("duration").and_then(Value::as_str)
    }
}

pub struct ImdbApi {
    fetch: FetchClient,
    base_url: String,
}

impl ImdbApi {
    pub fn new(fetch: FetchClient, config: &ImdbConfig) -> Self {
        Self {
            fetch,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ReferenceSource for ImdbApi {
    fn provider_name(&self) -> &'static str {
        IMDB_PROVIDER
    }

    #[instrument(skip(self))]
    async fn title_page(&self, external_id: &str) -> Option<ReferencePage> {
        let url = format!("{}/title/{}", self.base_url, external_id);
        let text = self.fetch.get_text(&url, &[]).await?;
        let Some(data) = extract_embedded_json(&text, LD_JSON_OPEN, LD_JSON_CLOSE) else {
            debug!("No structured data on {}", url);
            return None;
        };
        Some(ReferencePage { text, data })
    }
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// A work lacks a link the catalog needs (external id, season list, duration).
    #[error("Missing linkage for {work}: {what}")]
    MissingLinkage { work: String, what: String },

    #[error("{provider} returned no usable data: {message}")]
    Provider {
        provider: &'static str,
        message: String,
    },

    #[error("Environment variable {name} error: {source}")]
    Env {
        name: &'static str,
        #[source]
        source: std::env::VarError,
    },
}

impl ScraperError {
    pub fn missing(work: impl Into<String>, what: impl Into<String>) -> Self {
        Self::MissingLinkage {
            work: work.into(),
            what: what.into(),
        }
    }

    pub fn provider(provider: &'static str, message: impl Into<String>) -> Self {
        Self::Provider {
            provider,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScraperError>;

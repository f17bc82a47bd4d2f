use async_trait::async_trait;

/// Outbound HTTP seam; the fetch client only ever talks to providers through this.
#[async_trait]
pub trait HttpClientPort: Send + Sync {
    async fn get(&self, url: &str, query: &[(String, String)]) -> Result<HttpGetResult, String>;
}

#[derive(Clone, Debug)]
pub struct HttpGetResult {
    pub status: u16,
    pub body: String,
    pub content_type: String,
}

impl HttpGetResult {
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }
}

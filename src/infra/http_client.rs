use crate::app::ports::{HttpClientPort, HttpGetResult};
use crate::config::FetchConfig;
use crate::error::Result;
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use std::time::Duration;

/// reqwest-backed [`HttpClientPort`] sharing one connection pool.
pub struct ReqwestHttp {
    client: reqwest::Client,
    user_agent: String,
}

impl ReqwestHttp {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.deadline_secs))
            .build()?;
        Ok(Self {
            client,
            user_agent: config.user_agent.clone(),
        })
    }
}

#[async_trait]
impl HttpClientPort for ReqwestHttp {
    async fn get(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> std::result::Result<HttpGetResult, String> {
        let resp = self
            .client
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .query(query)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let body = resp.text().await.map_err(|e| e.to_string())?;
        Ok(HttpGetResult { status, body, content_type })
    }
}

use crate::{team_url, Fetcher};
use anyhow::{Context, Result};
use nbastat_model::{FetchMode, Season, SourceConfig, TeamCode};
use std::time::Duration;

/// Plain HTTP GET of the server-rendered team page.
///
/// Only sees tables that are in the markup as served; anything the page's
/// scripts inject later needs [`crate::RenderedFetcher`].
pub struct DirectFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl DirectFetcher {
    pub fn new(source: &SourceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(source.user_agent.as_str())
            .timeout(Duration::from_secs(source.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: source.base_url.clone(),
        })
    }

    async fn fetch_page(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to fetch page")?;

        let status = response.status();
        anyhow::ensure!(status.is_success(), "HTTP {status} for {url}");

        response.text().await.context("Failed to read response body")
    }
}

#[async_trait::async_trait]
impl Fetcher for DirectFetcher {
    async fn fetch(&self, team: TeamCode, season: Season) -> Result<String> {
        let url = team_url(&self.base_url, team, season);
        tracing::info!(url = %url, team = %team, "Fetching team page");
        let html = self.fetch_page(&url).await?;
        tracing::debug!(bytes = html.len(), "Received HTML");
        Ok(html)
    }

    fn mode(&self) -> FetchMode {
        FetchMode::Direct
    }
}

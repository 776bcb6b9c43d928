use crate::{team_url, Fetcher};
use anyhow::{Context, Result};
use nbastat_model::{FetchMode, Season, SourceConfig, TeamCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Fetches the page through a browser so client-side scripts run first.
///
/// Talks the W3C WebDriver wire protocol to a running driver
/// (`chromedriver --port=9515`, `geckodriver`). Each fetch gets its own
/// browser session, which is deleted afterwards even when navigation fails.
/// Sessions are never shared between teams.
pub struct RenderedFetcher {
    client: reqwest::Client,
    webdriver_url: String,
    base_url: String,
    settle: Duration,
}

/// Every WebDriver response wraps its payload in `{"value": ...}`.
#[derive(Debug, Deserialize)]
struct Wire<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
struct NewSession {
    #[serde(rename = "sessionId")]
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct WireError {
    error: String,
    #[serde(default)]
    message: String,
}

impl RenderedFetcher {
    pub fn new(source: &SourceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(source.timeout_secs.max(60)))
            .build()
            .context("Failed to create WebDriver client")?;

        Ok(Self {
            client,
            webdriver_url: source.webdriver_url.trim_end_matches('/').to_string(),
            base_url: source.base_url.clone(),
            settle: Duration::from_millis(source.render_wait_ms),
        })
    }

    async fn command<T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T> {
        let url = format!("{}{path}", self.webdriver_url);
        let mut request = self.client.request(method.clone(), &url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request
            .send()
            .await
            .with_context(|| format!("WebDriver {method} {path} failed"))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .context("Failed to read WebDriver response")?;
        decode(status, &text).with_context(|| format!("WebDriver {method} {path}"))
    }

    async fn new_session(&self) -> Result<String> {
        let capabilities = json!({
            "capabilities": {
                "alwaysMatch": {
                    "goog:chromeOptions": { "args": ["--headless=new", "--disable-gpu"] },
                    "moz:firefoxOptions": { "args": ["-headless"] }
                }
            }
        });
        let session: NewSession = self
            .command(reqwest::Method::POST, "/session", Some(capabilities))
            .await?;
        tracing::debug!(session = %session.session_id, "Opened browser session");
        Ok(session.session_id)
    }

    async fn render(&self, session: &str, url: &str) -> Result<String> {
        let _: serde_json::Value = self
            .command(
                reqwest::Method::POST,
                &format!("/session/{session}/url"),
                Some(json!({ "url": url })),
            )
            .await?;

        if !self.settle.is_zero() {
            tokio::time::sleep(self.settle).await;
        }

        self.command(reqwest::Method::GET, &format!("/session/{session}/source"), None)
            .await
    }

    async fn delete_session(&self, session: &str) -> Result<()> {
        let _: serde_json::Value = self
            .command(reqwest::Method::DELETE, &format!("/session/{session}"), None)
            .await?;
        tracing::debug!(session = %session, "Closed browser session");
        Ok(())
    }
}

/// Decode a WebDriver reply, turning error payloads into errors.
fn decode<T: DeserializeOwned>(status: reqwest::StatusCode, text: &str) -> Result<T> {
    if !status.is_success() {
        if let Ok(Wire { value: err }) = serde_json::from_str::<Wire<WireError>>(text) {
            anyhow::bail!("{} ({status}): {}", err.error, err.message);
        }
        anyhow::bail!("HTTP {status}: {text}");
    }
    let wire: Wire<T> = serde_json::from_str(text).context("Malformed WebDriver response")?;
    Ok(wire.value)
}

#[async_trait::async_trait]
impl Fetcher for RenderedFetcher {
    async fn fetch(&self, team: TeamCode, season: Season) -> Result<String> {
        let url = team_url(&self.base_url, team, season);
        tracing::info!(url = %url, team = %team, "Rendering team page");

        let session = self.new_session().await?;
        let rendered = self.render(&session, &url).await;
        if let Err(e) = self.delete_session(&session).await {
            tracing::warn!(session = %session, error = %e, "Failed to close browser session");
        }

        let html = rendered.with_context(|| format!("Failed to render {url}"))?;
        tracing::debug!(bytes = html.len(), "Received rendered HTML");
        Ok(html)
    }

    fn mode(&self) -> FetchMode {
        FetchMode::Rendered
    }
}

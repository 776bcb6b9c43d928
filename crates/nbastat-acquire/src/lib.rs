use anyhow::Result;
use nbastat_model::{FetchMode, Season, SourceConfig, TeamCode};

pub mod direct;
pub mod output;
pub mod webdriver;

#[cfg(test)]
mod testing;

pub use direct::DirectFetcher;
pub use webdriver::RenderedFetcher;

/// Produces the HTML document for one team's season page.
///
/// Implementations differ only in how the markup is obtained; callers
/// never see whether a browser was involved.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, team: TeamCode, season: Season) -> Result<String>;

    fn mode(&self) -> FetchMode;
}

/// `{base}/teams/{team}/{season}.html`
pub fn team_url(base: &str, team: TeamCode, season: Season) -> String {
    format!("{}/teams/{team}/{season}.html", base.trim_end_matches('/'))
}

/// Build the fetcher for a mode from the source settings.
pub fn fetcher_for(mode: FetchMode, source: &SourceConfig) -> Result<Box<dyn Fetcher>> {
    Ok(match mode {
        FetchMode::Direct => Box::new(DirectFetcher::new(source)?),
        FetchMode::Rendered => Box::new(RenderedFetcher::new(source)?),
    })
}

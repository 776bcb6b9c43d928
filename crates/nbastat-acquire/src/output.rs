use anyhow::Result;
use nbastat_model::{FetchMode, Season, TeamCode};
use std::fs;
use std::path::{Path, PathBuf};

/// Cache a fetched page for archival/debugging.
///
/// Writes `{team}_{season}_{mode}.html` so the page can be re-examined
/// without re-fetching. Returns the path written.
pub fn cache_html(
    output_dir: &Path,
    team: TeamCode,
    season: Season,
    mode: FetchMode,
    html: &str,
) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(format!("{team}_{season}_{mode}.html"));
    fs::write(&path, html)?;
    tracing::info!(path = %path.display(), bytes = html.len(), "Cached raw HTML");
    Ok(path)
}

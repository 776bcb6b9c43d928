use anyhow::{Context, Result};
use nbastat_acquire::{output, Fetcher};
use nbastat_load::{run_preflight, PreflightReport, TableStore};
use nbastat_model::{RunConfig, TeamCode, WriteMode};
use std::path::Path;

/// What a completed batch did.
#[derive(Debug)]
pub struct RunSummary {
    pub teams: Vec<TeamCode>,
    /// Rows written per table, in table order.
    pub rows: Vec<(String, u64)>,
    pub preflight: PreflightReport,
}

/// Run the batch: preflight once, then fetch, normalize and load every
/// configured table for each team in turn.
///
/// Preflight problems are logged and the batch continues. Any fetch, parse
/// or load error stops the batch; rows already written for earlier teams
/// stay in place.
pub async fn run(
    config: &RunConfig,
    store: &dyn TableStore,
    fetchers: &[Box<dyn Fetcher>],
    cache_dir: Option<&Path>,
) -> Result<RunSummary> {
    let schema = config.database.schema.as_str();

    let preflight = run_preflight(store, schema, &config.tables).await;
    if !preflight.is_clean() {
        tracing::warn!(
            failed_steps = preflight.failures.len(),
            "Preflight incomplete, loading anyway"
        );
    }

    if config.teams.len() > 1 {
        for target in config.tables.iter().filter(|t| t.write_mode == WriteMode::Replace) {
            tracing::warn!(
                table = %target.name,
                "Replace mode recreates the table for every team; only the last team's rows will remain"
            );
        }
    }

    let mut rows: Vec<(String, u64)> = config.tables.iter().map(|t| (t.name.clone(), 0)).collect();
    let mut completed = Vec::with_capacity(config.teams.len());

    for &team in &config.teams {
        if let Err(e) = load_team(config, store, fetchers, cache_dir, team, &mut rows).await {
            tracing::error!(
                team = %team,
                completed = completed.len(),
                remaining = config.teams.len() - completed.len(),
                "Batch aborted"
            );
            if !completed.is_empty() {
                tracing::info!(teams = %join_teams(&completed), "Loaded before abort");
            }
            return Err(e.context(format!("loading {team}")));
        }
        completed.push(team);
    }

    for (table, written) in &rows {
        tracing::info!(table = %format!("{schema}.{table}"), rows = written, "Load complete");
    }

    Ok(RunSummary {
        teams: completed,
        rows,
        preflight,
    })
}

async fn load_team(
    config: &RunConfig,
    store: &dyn TableStore,
    fetchers: &[Box<dyn Fetcher>],
    cache_dir: Option<&Path>,
    team: TeamCode,
    rows: &mut [(String, u64)],
) -> Result<()> {
    let season = config.source.season;
    let schema = config.database.schema.as_str();

    // One fetch per mode, shared by every table read from that document.
    for mode in config.fetch_modes() {
        let fetcher = fetchers
            .iter()
            .find(|f| f.mode() == mode)
            .with_context(|| format!("no {mode} fetcher configured"))?;

        let html = fetcher
            .fetch(team, season)
            .await
            .with_context(|| format!("{mode} fetch of {team} {season}"))?;

        if let Some(dir) = cache_dir {
            output::cache_html(dir, team, season, mode, &html)?;
        }

        for (i, target) in config.tables.iter().enumerate() {
            if target.fetch != mode {
                continue;
            }
            let table = nbastat_parse::parse_target(&html, team, target)
                .with_context(|| format!("extracting {} for {team}", target.name))?;

            let written = store
                .write(schema, &target.name, &table, target.write_mode)
                .await
                .with_context(|| format!("writing {schema}.{}", target.name))?;

            tracing::info!(
                team = %team,
                table = %target.name,
                mode = %target.write_mode,
                rows = written,
                "Loaded"
            );
            rows[i].1 += written;
        }
    }

    Ok(())
}

fn join_teams(teams: &[TeamCode]) -> String {
    teams.iter().map(|t| t.as_str()).collect::<Vec<_>>().join(",")
}

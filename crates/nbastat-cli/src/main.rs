use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use nbastat_acquire::{fetcher_for, Fetcher};
use nbastat_load::{
    resolve_password, run_preflight, CredentialKey, CredentialSource, MemoryStore, PgStore,
};
use nbastat_model::{DatabaseConfig, RunConfig, TeamCode};
use std::path::PathBuf;

mod run;

#[derive(Parser)]
#[command(name = "nbastat")]
#[command(about = "Load basketball-reference team statistics into PostgreSQL")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_HASH"), ")"))]
struct Cli {
    /// Log level: error, warn, info, debug, trace
    #[arg(long, global = true, default_value = "info", value_enum)]
    log_level: LogLevel,

    /// Use UTC timestamps instead of local time
    #[arg(long, global = true)]
    utc: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, clap::ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every team page, normalize the target tables and load them
    Load {
        #[command(flatten)]
        db: DbArgs,

        /// WebDriver endpoint for rendered fetches (chromedriver, geckodriver)
        #[arg(long)]
        webdriver: Option<String>,

        /// Keep a copy of every fetched page in this directory
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Load into an in-memory store instead of the database
        #[arg(long)]
        dry_run: bool,
    },

    /// Create the schema and reset the target tables, nothing else
    Preflight {
        #[command(flatten)]
        db: DbArgs,
    },

    /// Fetch one team page and print a normalized table as JSON
    Inspect {
        /// Team code (e.g., "BOS")
        #[arg(short, long)]
        team: TeamCode,

        /// Target table name
        #[arg(short = 'T', long, default_value = "player_per_game")]
        table: String,

        /// WebDriver endpoint for rendered fetches
        #[arg(long)]
        webdriver: Option<String>,

        /// Keep a copy of the fetched page in this directory
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Write the JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct DbArgs {
    /// Database host [default: localhost]
    #[arg(long)]
    host: Option<String>,

    /// Database port [default: 5432]
    #[arg(long)]
    port: Option<u16>,

    /// Database name [default: nba_stat]
    #[arg(long)]
    dbname: Option<String>,

    /// Database user [default: postgres]
    #[arg(long)]
    user: Option<String>,

    /// Where the password comes from
    #[arg(long, default_value = "prompt", value_enum)]
    credentials: Credentials,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum Credentials {
    /// Masked terminal prompt
    Prompt,
    /// ~/.pgpass or $PGPASSFILE
    Pgpass,
    /// $PGPASSWORD
    Env,
}

impl From<Credentials> for CredentialSource {
    fn from(c: Credentials) -> Self {
        match c {
            Credentials::Prompt => CredentialSource::Prompt,
            Credentials::Pgpass => CredentialSource::PgPass,
            Credentials::Env => CredentialSource::Env,
        }
    }
}

impl DbArgs {
    fn apply(&self, database: &mut DatabaseConfig) {
        if let Some(host) = &self.host {
            database.host = host.clone();
        }
        if let Some(port) = self.port {
            database.port = port;
        }
        if let Some(dbname) = &self.dbname {
            database.dbname = dbname.clone();
        }
        if let Some(user) = &self.user {
            database.user = user.clone();
        }
    }

    /// Resolve the password once and build the store from it.
    fn connect(&self, database: &DatabaseConfig) -> Result<PgStore> {
        let key = CredentialKey {
            host: &database.host,
            port: database.port,
            dbname: &database.dbname,
            user: &database.user,
        };
        let password = resolve_password(self.credentials.into(), key)
            .with_context(|| format!("resolving password for {key}"))?;
        Ok(PgStore::new(database, &password))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Map log level, suppressing noisy HTML-parsing crates at debug/trace
    let level = match cli.log_level {
        LogLevel::Error => "error",
        LogLevel::Warn  => "warn",
        LogLevel::Info  => "info,sqlx=warn",
        LogLevel::Debug => "debug,selectors=warn,html5ever=warn,sqlx=warn",
        LogLevel::Trace => "trace,selectors=warn,html5ever=warn,sqlx=warn",
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    // Timestamp format: 2026-02-14 19:44:09.123 -08:00
    let time_format = "%Y-%m-%d %H:%M:%S%.3f %:z";

    if cli.utc {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_timer(tracing_subscriber::fmt::time::ChronoUtc::new(time_format.to_string()))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_timer(tracing_subscriber::fmt::time::ChronoLocal::new(time_format.to_string()))
            .init();
    }

    let mut config = RunConfig::default();

    match cli.command {
        Commands::Load {
            db,
            webdriver,
            cache_dir,
            dry_run,
        } => {
            db.apply(&mut config.database);
            if let Some(url) = webdriver {
                config.source.webdriver_url = url;
            }
            tracing::info!(
                teams = config.teams.len(),
                tables = config.tables.len(),
                season = %config.source.season,
                dry_run,
                "Starting load"
            );

            let fetchers = config
                .fetch_modes()
                .into_iter()
                .map(|mode| fetcher_for(mode, &config.source))
                .collect::<Result<Vec<Box<dyn Fetcher>>>>()?;

            let summary = if dry_run {
                let store = MemoryStore::new();
                let summary = run::run(&config, &store, &fetchers, cache_dir.as_deref()).await?;
                for (schema, table, rows) in store.summary() {
                    tracing::info!(table = %format!("{schema}.{table}"), rows, "Dry run result");
                }
                summary
            } else {
                let store = db.connect(&config.database)?;
                run::run(&config, &store, &fetchers, cache_dir.as_deref()).await?
            };

            let total: u64 = summary.rows.iter().map(|(_, n)| n).sum();
            tracing::info!(
                teams = summary.teams.len(),
                rows = total,
                preflight_clean = summary.preflight.is_clean(),
                "Batch complete"
            );
        }
        Commands::Preflight { db } => {
            db.apply(&mut config.database);
            let store = db.connect(&config.database)?;
            let report = run_preflight(&store, &config.database.schema, &config.tables).await;
            if report.is_clean() {
                tracing::info!(schema = %config.database.schema, "Preflight complete");
            } else {
                tracing::warn!(failed_steps = report.failures.len(), "Preflight incomplete");
            }
        }
        Commands::Inspect {
            team,
            table,
            webdriver,
            cache_dir,
            output,
        } => {
            if let Some(url) = webdriver {
                config.source.webdriver_url = url;
            }
            let target = config.table(&table)?;
            tracing::info!(team = %team, table = %target.name, mode = %target.fetch, "Inspecting");

            let fetcher = fetcher_for(target.fetch, &config.source)?;
            let html = fetcher.fetch(team, config.source.season).await?;
            if let Some(dir) = &cache_dir {
                nbastat_acquire::output::cache_html(dir, team, config.source.season, target.fetch, &html)?;
            }
            let normalized = nbastat_parse::parse_target(&html, team, target)?;
            let json = serde_json::to_string_pretty(&normalized)?;

            match output {
                Some(path) => {
                    std::fs::write(&path, &json)?;
                    tracing::info!(
                        rows = normalized.row_count(),
                        path = %path.display(),
                        "Wrote normalized table"
                    );
                }
                None => println!("{json}"),
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_inspect_accepts_cache_dir() {
        let cli = Cli::try_parse_from(["nbastat", "inspect", "--team", "bos", "--cache-dir", "pages"]).unwrap();
        match cli.command {
            Commands::Inspect { team, table, cache_dir, output, .. } => {
                assert_eq!(team, TeamCode::Bos);
                assert_eq!(table, "player_per_game");
                assert_eq!(cache_dir, Some(PathBuf::from("pages")));
                assert_eq!(output, None);
            }
            _ => panic!("expected inspect"),
        }
    }

    #[test]
    fn test_load_flags() {
        let cli = Cli::try_parse_from([
            "nbastat", "load", "--host", "db", "--credentials", "pgpass", "--dry-run",
        ])
        .unwrap();
        match cli.command {
            Commands::Load { db, dry_run, .. } => {
                assert!(dry_run);
                let mut database = DatabaseConfig::default();
                db.apply(&mut database);
                assert_eq!(database.host, "db");
                assert_eq!(database.port, 5432);
                assert_eq!(CredentialSource::from(db.credentials), CredentialSource::PgPass);
            }
            _ => panic!("expected load"),
        }
    }
}

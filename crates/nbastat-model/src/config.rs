use crate::{ModelError, Season, TeamCode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Everything a load run needs, built once at startup and handed to the
/// orchestrator.
///
/// `RunConfig::default()` carries the fixed targets: which teams, which
/// season and which tables. Only the database connection parameters are
/// meant to be overridden.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub database: DatabaseConfig,
    pub source: SourceConfig,
    pub teams: Vec<TeamCode>,
    pub tables: Vec<TableTarget>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    /// Schema every target table lives in.
    pub schema: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Site root, without the `/teams/...` path.
    pub base_url: String,
    pub season: Season,
    pub user_agent: String,
    pub timeout_secs: u64,
    /// W3C WebDriver endpoint (chromedriver, geckodriver) for rendered fetches.
    pub webdriver_url: String,
    /// How long to let page scripts run after navigation before reading the DOM.
    pub render_wait_ms: u64,
}

/// One destination table and how to fill it from each team page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableTarget {
    pub name: String,
    /// Zero-based position among all tables in the fetched document.
    pub table_index: usize,
    pub fetch: FetchMode,
    /// Also count tables the site ships inside HTML comments.
    #[serde(default)]
    pub include_commented: bool,
    pub write_mode: WriteMode,
    pub reset: ResetStrategy,
    pub columns: ColumnRules,
}

/// Header transforms applied between extraction and load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnRules {
    /// Header of the constant column holding the team code.
    pub team_column: String,
    /// Headers removed entirely, wherever they appear.
    pub drop: Vec<String>,
    /// Literal `from -> to` header renames, applied in order.
    pub rename: Vec<(String, String)>,
    /// Replacement for every `%` in a header.
    pub pct_token: String,
    pub lowercase: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    /// Plain HTTP GET of the server-rendered page.
    Direct,
    /// Browser render, for tables the page's scripts assemble after load.
    Rendered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    Append,
    Replace,
}

/// What preflight does to a table before the team loop starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetStrategy {
    /// `TRUNCATE` if the table exists, otherwise skip.
    Truncate,
    /// `DROP TABLE IF EXISTS`.
    Drop,
    None,
}

impl fmt::Display for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FetchMode::Direct => "direct",
            FetchMode::Rendered => "rendered",
        })
    }
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WriteMode::Append => "append",
            WriteMode::Replace => "replace",
        })
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "nba_stat".to_string(),
            user: "postgres".to_string(),
            schema: "nba".to_string(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.basketball-reference.com".to_string(),
            season: Season::default(),
            user_agent: "nbastat/0.1 (team stats loader)".to_string(),
            timeout_secs: 30,
            webdriver_url: "http://localhost:9515".to_string(),
            render_wait_ms: 2000,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            source: SourceConfig::default(),
            teams: TeamCode::ALL.to_vec(),
            tables: vec![player_per_game(), team_stats()],
        }
    }
}

impl RunConfig {
    pub fn table(&self, name: &str) -> Result<&TableTarget, ModelError> {
        self.tables
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| ModelError::UnknownTable(name.to_string()))
    }

    /// Distinct fetch modes needed by the configured tables, in table order.
    pub fn fetch_modes(&self) -> Vec<FetchMode> {
        let mut modes = Vec::new();
        for table in &self.tables {
            if !modes.contains(&table.fetch) {
                modes.push(table.fetch);
            }
        }
        modes
    }
}

/// Per-game player averages: the second table in the server-rendered page.
fn player_per_game() -> TableTarget {
    TableTarget {
        name: "player_per_game".to_string(),
        table_index: 1,
        fetch: FetchMode::Direct,
        include_commented: false,
        write_mode: WriteMode::Append,
        reset: ResetStrategy::Truncate,
        columns: ColumnRules {
            team_column: "Team Name".to_string(),
            drop: vec!["Rk".to_string()],
            rename: Vec::new(),
            pct_token: "PCT".to_string(),
            lowercase: false,
        },
    }
}

/// Team and opponent totals. The site ships this table inside an HTML
/// comment and only its scripts put it into the DOM, so it needs a render.
fn team_stats() -> TableTarget {
    TableTarget {
        name: "team_stats".to_string(),
        table_index: 1,
        fetch: FetchMode::Rendered,
        include_commented: false,
        write_mode: WriteMode::Append,
        reset: ResetStrategy::Drop,
        columns: ColumnRules {
            team_column: "Team Name".to_string(),
            drop: vec!["Rk".to_string()],
            rename: vec![
                ("PTS/G".to_string(), "ppg".to_string()),
                ("Team Name".to_string(), "team".to_string()),
            ],
            pct_token: "pct".to_string(),
            lowercase: true,
        },
    }
}

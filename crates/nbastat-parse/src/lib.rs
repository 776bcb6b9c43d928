use anyhow::Result;
use nbastat_model::{NormalizedTable, RawTable, TableTarget, TeamCode};
use thiserror::Error;

pub mod columns;
pub mod extract;
pub mod normalize;

pub use columns::{normalize, substitute_percent};
pub use extract::extract_tables;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("no table at index {index}: document has {found} table(s)")]
    TableNotFound { index: usize, found: usize },
}

/// Pick the table at a fixed position in the document.
///
/// The position is the only thing tying a target to the page layout; the
/// selected table's columns are not checked.
pub fn select_table(html: &str, index: usize, include_commented: bool) -> Result<RawTable, ExtractError> {
    let mut tables = extract_tables(html, include_commented);
    let found = tables.len();
    if index >= found {
        return Err(ExtractError::TableNotFound { index, found });
    }
    Ok(tables.swap_remove(index))
}

/// Select and normalize one target's table from a fetched page.
pub fn parse_target(html: &str, team: TeamCode, target: &TableTarget) -> Result<NormalizedTable> {
    let raw = select_table(html, target.table_index, target.include_commented)?;
    tracing::debug!(
        table = %target.name,
        team = %team,
        columns = raw.headers.len(),
        rows = raw.rows.len(),
        "Selected table"
    );
    Ok(normalize(&raw, team, &target.columns))
}

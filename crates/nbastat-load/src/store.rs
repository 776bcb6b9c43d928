use nbastat_model::{ColumnType, NormalizedTable, WriteMode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("unable to connect to {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("database unavailable: {0}")]
    Unavailable(String),

    #[error("{0}")]
    Rejected(String),
}

/// Catalog checks, DDL and bulk writes against schema-qualified tables.
///
/// Every call is its own unit of work: nothing spans calls, so a failed
/// write leaves earlier writes in place.
#[async_trait::async_trait]
pub trait TableStore: Send + Sync {
    async fn schema_exists(&self, schema: &str) -> Result<bool, DbError>;

    async fn create_schema(&self, schema: &str) -> Result<(), DbError>;

    async fn table_exists(&self, schema: &str, table: &str) -> Result<bool, DbError>;

    async fn truncate_table(&self, schema: &str, table: &str) -> Result<(), DbError>;

    /// `DROP TABLE IF EXISTS`.
    async fn drop_table(&self, schema: &str, table: &str) -> Result<(), DbError>;

    /// Write every row. `Replace` recreates the table from this row-set;
    /// `Append` creates it if missing and adds the rows. Returns rows written.
    async fn write(
        &self,
        schema: &str,
        table: &str,
        rows: &NormalizedTable,
        mode: WriteMode,
    ) -> Result<u64, DbError>;

    async fn row_count(&self, schema: &str, table: &str) -> Result<u64, DbError>;
}

/// Double-quote an identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `"schema"."table"`
pub fn qualified(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(table))
}

/// How an append lands on a table that already exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendPlan {
    /// Type to bind each incoming column as, in incoming column order.
    pub bind_types: Vec<ColumnType>,
    /// Existing columns to widen before inserting, with their new type.
    pub widen: Vec<(String, ColumnType)>,
}

/// Fit incoming rows to the column types a table already has.
///
/// Columns with no values in this row-set bind as the existing type, so
/// their NULLs match the column. Values the existing type cannot hold widen
/// the column (bigint to double, anything to text) instead of being rounded.
/// A column the table does not have is rejected.
pub fn plan_append(
    target: &str,
    existing: &[(String, ColumnType)],
    rows: &NormalizedTable,
) -> Result<AppendPlan, DbError> {
    let mut plan = AppendPlan {
        bind_types: Vec::with_capacity(rows.columns.len()),
        widen: Vec::new(),
    };

    for (column, observed) in rows.columns.iter().zip(rows.observed_column_types()) {
        let current = existing
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, ty)| *ty)
            .ok_or_else(|| {
                DbError::Rejected(format!("column \"{column}\" of relation {target} does not exist"))
            })?;

        let wanted = observed.map_or(current, |ty| current.widen(ty));
        if wanted != current {
            plan.widen.push((column.clone(), wanted));
        }
        plan.bind_types.push(wanted);
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str], rows: &[&[&str]]) -> NormalizedTable {
        NormalizedTable {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    fn existing() -> Vec<(String, ColumnType)> {
        vec![
            ("Player".to_string(), ColumnType::Text),
            ("3P%".to_string(), ColumnType::Double),
            ("MP".to_string(), ColumnType::BigInt),
            ("Team Name".to_string(), ColumnType::Text),
        ]
    }

    #[test]
    fn test_empty_column_binds_as_existing_type() {
        let rows = table(&["Player", "3P%", "MP", "Team Name"], &[&["C", "", "", "ATL"]]);
        let plan = plan_append("nba.t", &existing(), &rows).unwrap();
        assert_eq!(
            plan.bind_types,
            vec![ColumnType::Text, ColumnType::Double, ColumnType::BigInt, ColumnType::Text]
        );
        assert!(plan.widen.is_empty());
    }

    #[test]
    fn test_decimal_widens_bigint_column() {
        let rows = table(&["MP", "Player"], &[&["34.6", "D"]]);
        let plan = plan_append("nba.t", &existing(), &rows).unwrap();
        assert_eq!(plan.bind_types, vec![ColumnType::Double, ColumnType::Text]);
        assert_eq!(plan.widen, vec![("MP".to_string(), ColumnType::Double)]);
    }

    #[test]
    fn test_integers_fit_double_column() {
        let rows = table(&["3P%"], &[&["1"]]);
        let plan = plan_append("nba.t", &existing(), &rows).unwrap();
        assert_eq!(plan.bind_types, vec![ColumnType::Double]);
        assert!(plan.widen.is_empty());
    }

    #[test]
    fn test_unknown_column_rejected() {
        let rows = table(&["Awards"], &[&["MVP-3"]]);
        let err = plan_append("nba.t", &existing(), &rows).unwrap_err();
        assert_eq!(err.to_string(), "column \"Awards\" of relation nba.t does not exist");
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("FGPCT"), "\"FGPCT\"");
        assert_eq!(quote_ident("Team Name"), "\"Team Name\"");
        assert_eq!(quote_ident("PTS/G"), "\"PTS/G\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn test_qualified() {
        assert_eq!(qualified("nba", "player_per_game"), "\"nba\".\"player_per_game\"");
    }
}

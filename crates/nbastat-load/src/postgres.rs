use crate::store::{plan_append, qualified, quote_ident, DbError, TableStore};
use nbastat_model::{CellValue, ColumnType, DatabaseConfig, NormalizedTable, WriteMode};
use sqlx::postgres::PgConnectOptions;
use sqlx::{Connection, PgConnection, Postgres, QueryBuilder};

// PostgreSQL caps bind parameters per statement at 65535.
const MAX_BIND_PARAMS: usize = 65_535;
const MAX_BATCH_ROWS: usize = 1_000;

/// PostgreSQL store. Opens a fresh connection for every operation; there is
/// no pool and nothing is held between calls.
pub struct PgStore {
    options: PgConnectOptions,
    target: String,
}

impl PgStore {
    pub fn new(database: &DatabaseConfig, password: &str) -> Self {
        let options = PgConnectOptions::new()
            .host(&database.host)
            .port(database.port)
            .database(&database.dbname)
            .username(&database.user)
            .password(password);

        Self {
            options,
            target: format!(
                "{}@{}:{}/{}",
                database.user, database.host, database.port, database.dbname
            ),
        }
    }

    async fn connect(&self) -> Result<PgConnection, DbError> {
        tracing::debug!(target_db = %self.target, "Connecting");
        PgConnection::connect_with(&self.options)
            .await
            .map_err(|source| DbError::Connect {
                target: self.target.clone(),
                source,
            })
    }

    async fn execute(&self, sql: &str) -> Result<(), DbError> {
        let mut conn = self.connect().await?;
        sqlx::query(sql).execute(&mut conn).await?;
        conn.close().await?;
        Ok(())
    }
}

fn create_table_sql(target: &str, columns: &[String], types: &[ColumnType], mode: WriteMode) -> String {
    let defs = columns
        .iter()
        .zip(types)
        .map(|(c, t)| format!("{} {}", quote_ident(c), t.sql()))
        .collect::<Vec<_>>()
        .join(", ");
    let if_not_exists = match mode {
        WriteMode::Append => "IF NOT EXISTS ",
        WriteMode::Replace => "",
    };
    format!("CREATE TABLE {if_not_exists}{target} ({defs})")
}

fn alter_column_sql(target: &str, column: &str, ty: ColumnType) -> String {
    let column = quote_ident(column);
    format!(
        "ALTER TABLE {target} ALTER COLUMN {column} TYPE {ty} USING {column}::{ty}",
        ty = ty.sql()
    )
}

fn batch_rows(column_count: usize) -> usize {
    (MAX_BIND_PARAMS / column_count.max(1)).clamp(1, MAX_BATCH_ROWS)
}

#[async_trait::async_trait]
impl TableStore for PgStore {
    async fn schema_exists(&self, schema: &str) -> Result<bool, DbError> {
        let mut conn = self.connect().await?;
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM information_schema.schemata WHERE schema_name = $1",
        )
        .bind(schema)
        .fetch_one(&mut conn)
        .await?;
        Ok(count == 1)
    }

    async fn create_schema(&self, schema: &str) -> Result<(), DbError> {
        self.execute(&format!("CREATE SCHEMA {}", quote_ident(schema))).await
    }

    async fn table_exists(&self, schema: &str, table: &str) -> Result<bool, DbError> {
        let mut conn = self.connect().await?;
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM information_schema.tables \
             WHERE table_schema = $1 AND table_name = $2",
        )
        .bind(schema)
        .bind(table)
        .fetch_one(&mut conn)
        .await?;
        Ok(count == 1)
    }

    async fn truncate_table(&self, schema: &str, table: &str) -> Result<(), DbError> {
        self.execute(&format!("TRUNCATE TABLE {}", qualified(schema, table))).await
    }

    async fn drop_table(&self, schema: &str, table: &str) -> Result<(), DbError> {
        self.execute(&format!("DROP TABLE IF EXISTS {}", qualified(schema, table))).await
    }

    async fn write(
        &self,
        schema: &str,
        table: &str,
        rows: &NormalizedTable,
        mode: WriteMode,
    ) -> Result<u64, DbError> {
        let target = qualified(schema, table);
        let column_list = rows
            .columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");

        let mut conn = self.connect().await?;
        let mut tx = conn.begin().await?;

        let types = match mode {
            WriteMode::Replace => {
                let types = rows.infer_column_types();
                sqlx::query(&format!("DROP TABLE IF EXISTS {target}"))
                    .execute(&mut *tx)
                    .await?;
                sqlx::query(&create_table_sql(&target, &rows.columns, &types, mode))
                    .execute(&mut *tx)
                    .await?;
                types
            }
            WriteMode::Append => {
                sqlx::query(&create_table_sql(
                    &target,
                    &rows.columns,
                    &rows.infer_column_types(),
                    mode,
                ))
                .execute(&mut *tx)
                .await?;

                // Bind against the table as it is, not as this row-set alone would type it.
                let existing: Vec<(String, String)> = sqlx::query_as(
                    "SELECT column_name::text, data_type::text FROM information_schema.columns \
                     WHERE table_schema = $1 AND table_name = $2 ORDER BY ordinal_position",
                )
                .bind(schema)
                .bind(table)
                .fetch_all(&mut *tx)
                .await?;
                let existing: Vec<(String, ColumnType)> = existing
                    .into_iter()
                    .map(|(name, data_type)| (name, ColumnType::from_catalog(&data_type)))
                    .collect();

                let plan = plan_append(&target, &existing, rows)?;
                for (column, ty) in &plan.widen {
                    sqlx::query(&alter_column_sql(&target, column, *ty))
                        .execute(&mut *tx)
                        .await?;
                    tracing::info!(table = %target, column = %column, to = ty.sql(), "Widened column");
                }
                plan.bind_types
            }
        };

        let mut written = 0u64;
        let batch = batch_rows(rows.columns.len());
        let mut start = 0;
        while start < rows.row_count() {
            let end = (start + batch).min(rows.row_count());
            let mut insert: QueryBuilder<Postgres> =
                QueryBuilder::new(format!("INSERT INTO {target} ({column_list}) "));
            insert.push_values(start..end, |mut values, row| {
                for cell in rows.typed_row(row, &types) {
                    match cell {
                        CellValue::BigInt(v) => values.push_bind(v),
                        CellValue::Double(v) => values.push_bind(v),
                        CellValue::Text(v) => values.push_bind(v),
                    };
                }
            });
            written += insert.build().execute(&mut *tx).await?.rows_affected();
            start = end;
        }

        tx.commit().await?;
        tracing::debug!(table = %target, mode = %mode, rows = written, "Committed write");
        Ok(written)
    }

    async fn row_count(&self, schema: &str, table: &str) -> Result<u64, DbError> {
        let mut conn = self.connect().await?;
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", qualified(schema, table)))
            .fetch_one(&mut conn)
            .await?;
        Ok(count.max(0) as u64)
    }
}

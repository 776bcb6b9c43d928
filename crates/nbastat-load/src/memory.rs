use crate::store::{plan_append, DbError, TableStore};
use nbastat_model::{ColumnType, NormalizedTable, WriteMode};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// In-process store with the same write semantics as [`crate::PgStore`].
///
/// Backs `--dry-run` and the tests. Creating a table in a schema that does
/// not exist is rejected, as PostgreSQL would. Column types are tracked and
/// appends are fitted to them with [`plan_append`], the same way the
/// PostgreSQL store fits them to the catalog. `set_offline(true)` makes
/// every call fail as if the server were unreachable.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    offline: AtomicBool,
}

#[derive(Default)]
struct State {
    schemas: BTreeSet<String>,
    tables: BTreeMap<(String, String), StoredTable>,
}

struct StoredTable {
    types: Vec<ColumnType>,
    data: NormalizedTable,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Snapshot of a stored table.
    pub fn table(&self, schema: &str, table: &str) -> Option<NormalizedTable> {
        self.lock()
            .tables
            .get(&key(schema, table))
            .map(|t| t.data.clone())
    }

    /// Column types of a stored table, in column order.
    pub fn column_types(&self, schema: &str, table: &str) -> Option<Vec<ColumnType>> {
        self.lock().tables.get(&key(schema, table)).map(|t| t.types.clone())
    }

    /// `(schema, table, rows)` for every stored table.
    pub fn summary(&self) -> Vec<(String, String, usize)> {
        self.lock()
            .tables
            .iter()
            .map(|((s, t), stored)| (s.clone(), t.clone(), stored.data.row_count()))
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_online(&self) -> Result<(), DbError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(DbError::Unavailable("memory store is offline".to_string()));
        }
        Ok(())
    }
}

fn key(schema: &str, table: &str) -> (String, String) {
    (schema.to_string(), table.to_string())
}

#[async_trait::async_trait]
impl TableStore for MemoryStore {
    async fn schema_exists(&self, schema: &str) -> Result<bool, DbError> {
        self.check_online()?;
        Ok(self.lock().schemas.contains(schema))
    }

    async fn create_schema(&self, schema: &str) -> Result<(), DbError> {
        self.check_online()?;
        if !self.lock().schemas.insert(schema.to_string()) {
            return Err(DbError::Rejected(format!("schema \"{schema}\" already exists")));
        }
        Ok(())
    }

    async fn table_exists(&self, schema: &str, table: &str) -> Result<bool, DbError> {
        self.check_online()?;
        Ok(self.lock().tables.contains_key(&key(schema, table)))
    }

    async fn truncate_table(&self, schema: &str, table: &str) -> Result<(), DbError> {
        self.check_online()?;
        match self.lock().tables.get_mut(&key(schema, table)) {
            Some(stored) => {
                stored.data.rows.clear();
                Ok(())
            }
            None => Err(DbError::Rejected(format!(
                "relation \"{schema}.{table}\" does not exist"
            ))),
        }
    }

    async fn drop_table(&self, schema: &str, table: &str) -> Result<(), DbError> {
        self.check_online()?;
        self.lock().tables.remove(&key(schema, table));
        Ok(())
    }

    async fn write(
        &self,
        schema: &str,
        table: &str,
        rows: &NormalizedTable,
        mode: WriteMode,
    ) -> Result<u64, DbError> {
        self.check_online()?;
        let mut state = self.lock();
        if !state.schemas.contains(schema) {
            return Err(DbError::Rejected(format!("schema \"{schema}\" does not exist")));
        }

        let k = key(schema, table);
        if mode == WriteMode::Replace {
            state.tables.remove(&k);
        }
        let stored = state.tables.entry(k).or_insert_with(|| StoredTable {
            types: rows.infer_column_types(),
            data: NormalizedTable {
                columns: rows.columns.clone(),
                rows: Vec::new(),
            },
        });

        let existing: Vec<(String, ColumnType)> = stored
            .data
            .columns
            .iter()
            .cloned()
            .zip(stored.types.iter().copied())
            .collect();
        let plan = plan_append(&format!("{schema}.{table}"), &existing, rows)?;
        for (column, ty) in plan.widen {
            if let Some(i) = stored.data.columns.iter().position(|c| *c == column) {
                stored.types[i] = ty;
            }
        }

        // Stored column order; columns the row-set lacks load empty.
        let positions: Vec<Option<usize>> = stored
            .data
            .columns
            .iter()
            .map(|c| rows.columns.iter().position(|r| r == c))
            .collect();
        for row in 0..rows.row_count() {
            let cells = positions
                .iter()
                .map(|p| p.map(|col| rows.cell(row, col).to_string()).unwrap_or_default())
                .collect();
            stored.data.rows.push(cells);
        }
        Ok(rows.row_count() as u64)
    }

    async fn row_count(&self, schema: &str, table: &str) -> Result<u64, DbError> {
        self.check_online()?;
        self.lock()
            .tables
            .get(&key(schema, table))
            .map(|t| t.data.row_count() as u64)
            .ok_or_else(|| DbError::Rejected(format!("relation \"{schema}.{table}\" does not exist")))
    }
}

// Setup run once before the team loop: make sure the schema exists and put
// each target table into its starting state.
//
// Failures here are logged and swallowed. The load still runs, and fails
// later on its own if the missing precondition matters.

use crate::store::{DbError, TableStore};
use nbastat_model::{ResetStrategy, TableTarget};

/// One preflight step that failed and was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreflightFailure {
    pub step: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreflightReport {
    pub failures: Vec<PreflightFailure>,
}

impl PreflightReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, step: String, error: DbError) {
        tracing::error!(step = %step, error = %error, "Unable to query database, continuing");
        self.failures.push(PreflightFailure {
            step,
            error: error.to_string(),
        });
    }
}

/// Create `schema` unless the catalog already lists it. Returns whether it
/// was created.
pub async fn ensure_schema_exists(store: &dyn TableStore, schema: &str) -> Result<bool, DbError> {
    if store.schema_exists(schema).await? {
        tracing::info!(schema = %schema, "Schema present, skipping creation");
        return Ok(false);
    }
    tracing::info!(schema = %schema, "Schema not yet created, creating now");
    store.create_schema(schema).await?;
    Ok(true)
}

/// Put one table into its pre-batch state.
pub async fn reset_table(
    store: &dyn TableStore,
    schema: &str,
    table: &str,
    strategy: ResetStrategy,
) -> Result<(), DbError> {
    match strategy {
        ResetStrategy::Truncate => {
            if store.table_exists(schema, table).await? {
                store.truncate_table(schema, table).await?;
                tracing::info!(table = %format!("{schema}.{table}"), "Truncated");
            } else {
                tracing::info!(table = %format!("{schema}.{table}"), "Not present, skipping truncation");
            }
        }
        ResetStrategy::Drop => {
            store.drop_table(schema, table).await?;
            tracing::info!(table = %format!("{schema}.{table}"), "Dropped if present");
        }
        ResetStrategy::None => {
            tracing::debug!(table = %format!("{schema}.{table}"), "No reset configured");
        }
    }
    Ok(())
}

/// Schema check, then one reset per target. Never fails.
pub async fn run_preflight(store: &dyn TableStore, schema: &str, targets: &[TableTarget]) -> PreflightReport {
    let mut report = PreflightReport::default();

    if let Err(e) = ensure_schema_exists(store, schema).await {
        report.record(format!("schema {schema}"), e);
    }

    for target in targets {
        if let Err(e) = reset_table(store, schema, &target.name, target.reset).await {
            report.record(format!("reset {schema}.{}", target.name), e);
        }
    }

    report
}

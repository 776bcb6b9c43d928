pub mod credentials;
pub mod memory;
pub mod postgres;
pub mod preflight;
pub mod store;

pub use credentials::{resolve_password, CredentialError, CredentialKey, CredentialSource};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use preflight::{ensure_schema_exists, reset_table, run_preflight, PreflightReport};
pub use store::{plan_append, AppendPlan, DbError, TableStore};

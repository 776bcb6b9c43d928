pub mod config;
pub mod error;
pub mod table;
pub mod team;

pub use config::*;
pub use error::ModelError;
pub use table::*;
pub use team::*;

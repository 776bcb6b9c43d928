use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("unknown team code: {0}")]
    UnknownTeam(String),

    #[error("no table named '{0}' in the run configuration")]
    UnknownTable(String),
}

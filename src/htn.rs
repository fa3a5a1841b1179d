pub mod domain;
pub mod ethics;
pub mod executor;
pub mod learner;
pub mod planner;
pub mod shared;
pub mod solver;
pub mod state;
pub mod store;

pub use domain::{ActionDef, Domain, MethodDef};
pub use state::{Literal, State};

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("{path}: {source}")]
    Json { path: PathBuf, source: serde_json::Error },

    #[error("Invalid literal: {0:?}")]
    Literal(String),

    #[error("Invalid state assignment: {0:?} (expected name, name=true or name=false)")]
    Assignment(String),

    #[error("Domain not found: {0}")]
    DomainNotFound(String),

    #[error("Domain already exists: {0}")]
    DomainExists(String),

    #[error("Invalid domain name: {0:?}")]
    InvalidName(String),
}

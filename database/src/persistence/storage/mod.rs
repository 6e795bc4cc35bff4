pub mod memory;
pub mod postgres;

use std::{fmt, str::FromStr};

use async_trait::async_trait;
use thiserror::Error;

use crate::{
    consts::consts::PersonId,
    model::{
        filter::PersonFilter,
        person::{NewPerson, Person},
    },
};

#[derive(Error, Debug)]
pub enum StorageError {
    /// The store could not be reached: refused or unresolvable connection,
    /// pool timeout, closed connection
    #[error("Unable to reach the database: {0}")]
    Unavailable(anyhow::Error),

    /// The store rejected a statement because of a declared constraint
    #[error("Database constraint violation: {0}")]
    ConstraintViolation(anyhow::Error),

    #[error("Query failed: {0}")]
    Query(anyhow::Error),

    #[error("Unable to initialize connection pool: {0}")]
    Pool(anyhow::Error),
}

impl StorageError {
    /// Underlying error, used to render the cause chain
    pub fn inner(&self) -> &anyhow::Error {
        match self {
            StorageError::Unavailable(e)
            | StorageError::ConstraintViolation(e)
            | StorageError::Query(e)
            | StorageError::Pool(e) => e,
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// The persistence gateway: the only component issuing queries against the store.
///
/// Each method is a single round trip. Implementations hold no business rules,
/// duplicate detection and not-found semantics belong to the caller.
#[async_trait]
pub trait PersonStorage: Send + Sync {
    async fn find_by_id(&self, id: PersonId) -> StorageResult<Option<Person>>;

    /// Case-insensitive substring match on each present field, ordered by id ascending
    async fn find_filtered(&self, filter: &PersonFilter) -> StorageResult<Vec<Person>>;

    /// Case-insensitive exact match on both names
    async fn find_by_name(&self, first_name: &str, last_name: &str)
        -> StorageResult<Option<Person>>;

    async fn insert(&self, new_person: &NewPerson) -> StorageResult<Person>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageEngine {
    Postgres,
    Memory,
}

impl FromStr for StorageEngine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" => Ok(StorageEngine::Postgres),
            "memory" => Ok(StorageEngine::Memory),
            other => Err(format!(
                "unknown storage engine `{}`, expected `postgres` or `memory`",
                other
            )),
        }
    }
}

impl fmt::Display for StorageEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageEngine::Postgres => write!(f, "postgres"),
            StorageEngine::Memory => write!(f, "memory"),
        }
    }
}

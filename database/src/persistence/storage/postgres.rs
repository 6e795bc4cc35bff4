use std::error::Error as StdError;

use async_trait::async_trait;
use deadpool_postgres::{Object, Pool, PoolError};
use tokio_postgres::{error::SqlState, types::ToSql, Row};

use crate::{
    consts::consts::PersonId,
    model::{
        filter::{contains_pattern, PersonFilter},
        person::{NewPerson, Person},
    },
};

use super::{PersonStorage, StorageError, StorageResult};

const PERSON_COLUMNS: &str = "id, first_name, last_name, created_at, updated_at";

/// Gateway over a caller-owned connection pool. Dropping the storage does not
/// close the pool.
pub struct PgStorage {
    pool: Pool,
}

impl PgStorage {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    async fn client(&self) -> StorageResult<Object> {
        self.pool.get().await.map_err(StorageError::from)
    }

    /// Checks out a connection and runs a trivial statement
    pub async fn ping(&self) -> StorageResult<()> {
        let client = self.client().await?;

        client.execute("SELECT 1", &[]).await?;

        Ok(())
    }
}

#[async_trait]
impl PersonStorage for PgStorage {
    #[tracing::instrument(skip(self))]
    async fn find_by_id(&self, id: PersonId) -> StorageResult<Option<Person>> {
        let client = self.client().await?;

        let query = format!("SELECT {PERSON_COLUMNS} FROM persons WHERE id = $1");

        let row = client.query_opt(query.as_str(), &[&id.to_number()]).await?;

        row.as_ref().map(row_to_person).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn find_filtered(&self, filter: &PersonFilter) -> StorageResult<Vec<Person>> {
        let client = self.client().await?;

        let (query, values) = filter_query(filter);

        let params: Vec<&(dyn ToSql + Sync)> = values
            .iter()
            .map(|v| v as &(dyn ToSql + Sync))
            .collect();

        let rows = client.query(query.as_str(), &params).await?;

        rows.iter().map(row_to_person).collect()
    }

    #[tracing::instrument(skip(self))]
    async fn find_by_name(
        &self,
        first_name: &str,
        last_name: &str,
    ) -> StorageResult<Option<Person>> {
        let client = self.client().await?;

        let query = format!(
            "SELECT {PERSON_COLUMNS} FROM persons \
             WHERE LOWER(first_name) = LOWER($1) AND LOWER(last_name) = LOWER($2) \
             ORDER BY id LIMIT 1"
        );

        let row = client
            .query_opt(query.as_str(), &[&first_name, &last_name])
            .await?;

        row.as_ref().map(row_to_person).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn insert(&self, new_person: &NewPerson) -> StorageResult<Person> {
        let client = self.client().await?;

        let query = format!(
            "INSERT INTO persons (first_name, last_name) VALUES ($1, $2) RETURNING {PERSON_COLUMNS}"
        );

        let row = client
            .query_one(
                query.as_str(),
                &[&new_person.first_name, &new_person.last_name],
            )
            .await?;

        row_to_person(&row)
    }
}

/// Builds the list statement. Conditions are appended only for present fields,
/// each value is bound positionally as a `%...%` pattern.
pub fn filter_query(filter: &PersonFilter) -> (String, Vec<String>) {
    let mut query = format!("SELECT {PERSON_COLUMNS} FROM persons WHERE 1=1");
    let mut values = vec![];

    if let Some(first_name) = &filter.first_name {
        values.push(contains_pattern(first_name));
        query.push_str(&format!(
            " AND LOWER(first_name) LIKE LOWER(${})",
            values.len()
        ));
    }

    if let Some(last_name) = &filter.last_name {
        values.push(contains_pattern(last_name));
        query.push_str(&format!(
            " AND LOWER(last_name) LIKE LOWER(${})",
            values.len()
        ));
    }

    query.push_str(" ORDER BY id");

    (query, values)
}

fn row_to_person(row: &Row) -> StorageResult<Person> {
    Ok(Person {
        id: PersonId(row.try_get("id")?),
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

impl From<tokio_postgres::Error> for StorageError {
    fn from(err: tokio_postgres::Error) -> Self {
        if err.code().map(is_constraint_violation).unwrap_or(false) {
            return StorageError::ConstraintViolation(anyhow::Error::new(err));
        }

        if err.is_closed() || has_io_source(&err) {
            return StorageError::Unavailable(anyhow::Error::new(err));
        }

        StorageError::Query(anyhow::Error::new(err))
    }
}

impl From<PoolError> for StorageError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::Backend(err) => StorageError::from(err),
            err => StorageError::Unavailable(anyhow::Error::new(err)),
        }
    }
}

/// SQLSTATE class 23: integrity constraint violation
fn is_constraint_violation(state: &SqlState) -> bool {
    state.code().starts_with("23")
}

/// Connection failures (refused, unresolvable host, reset) surface from the
/// driver with an io error somewhere in the source chain
fn has_io_source(err: &(dyn StdError + 'static)) -> bool {
    let mut source = err.source();

    while let Some(e) = source {
        if e.downcast_ref::<std::io::Error>().is_some() {
            return true;
        }
        source = e.source();
    }

    false
}

use std::sync::Arc;

use crate::{
    consts::consts::{PersonId, ReasonCode},
    model::{
        filter::PersonFilter,
        person::{NewPerson, Person},
    },
    persistence::storage::{PersonStorage, StorageResult},
};

pub const DUPLICATE_NAME_MESSAGE: &str = "A person with this name already exists";

#[derive(Debug, Clone, PartialEq)]
pub enum GetPersonOutcome {
    Found(Person),
    NotFound,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PersonList {
    pub data: Vec<Person>,
    pub count: usize,
    /// The filters the query actually ran with
    pub filters: PersonFilter,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CreatePersonOutcome {
    Created(Person),
    NotCreated { reason: ReasonCode, message: String },
}

/// Goal of the request manager is to provide a simple interface over the person storage.
///
/// Every method is one use case: it orchestrates the storage calls and applies the
/// domain rules. Outcomes the caller has to branch on (not found, duplicate) are
/// returned as values, only infrastructure failures come back as errors.
///
/// `create_person` checks for a duplicate and then inserts in two separate round
/// trips. Two concurrent creates of the same name can both pass the check, only a
/// unique index on the store closes that gap.
#[derive(Clone)]
pub struct RequestManager {
    storage: Arc<dyn PersonStorage>,
}

impl RequestManager {
    pub fn new(storage: Arc<dyn PersonStorage>) -> Self {
        Self { storage }
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_person_by_id(&self, id: PersonId) -> StorageResult<GetPersonOutcome> {
        log::info!("Executing getPersonById use case for id: {}", id);

        match self.storage.find_by_id(id).await? {
            Some(person) => {
                log::info!("Person retrieved successfully: {}", id);
                Ok(GetPersonOutcome::Found(person))
            }
            None => {
                log::info!("Person not found with id: {}", id);
                Ok(GetPersonOutcome::NotFound)
            }
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_persons_list(&self, filters: PersonFilter) -> StorageResult<PersonList> {
        log::info!("Executing getPersonsList use case with filters: {:?}", filters);

        let data = self.storage.find_filtered(&filters).await?;
        let count = data.len();

        log::info!(
            "Person list retrieved [filters: {:?}, count: {}]",
            filters,
            count
        );

        Ok(PersonList {
            data,
            count,
            filters,
        })
    }

    #[tracing::instrument(skip(self))]
    pub async fn create_person(&self, new_person: NewPerson) -> StorageResult<CreatePersonOutcome> {
        log::info!(
            "Executing createPerson use case: {} {}",
            new_person.first_name,
            new_person.last_name
        );

        let existing = self
            .storage
            .find_by_name(&new_person.first_name, &new_person.last_name)
            .await?;

        if existing.is_some() {
            log::warn!(
                "Person with name {} {} already exists",
                new_person.first_name,
                new_person.last_name
            );

            return Ok(CreatePersonOutcome::NotCreated {
                reason: ReasonCode::DuplicateName,
                message: DUPLICATE_NAME_MESSAGE.to_string(),
            });
        }

        let person = self.storage.insert(&new_person).await?;

        log::info!(
            "Person created successfully [id: {}, name: {} {}]",
            person.id,
            person.first_name,
            person.last_name
        );

        Ok(CreatePersonOutcome::Created(person))
    }
}

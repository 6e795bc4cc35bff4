use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicI64, Ordering},
};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    consts::consts::PersonId,
    model::{
        filter::PersonFilter,
        person::{NewPerson, Person},
    },
};

use super::{PersonStorage, StorageResult};

/// Process-local storage engine, rows are lost on shutdown.
///
/// Like the postgres engine it enforces no uniqueness on names.
pub struct MemoryStorage {
    person_rows: RwLock<BTreeMap<PersonId, Person>>,
    next_id: AtomicI64,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            person_rows: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Storage pre-populated with `people`, ids assigned from 1 in order
    pub fn with_people(people: impl IntoIterator<Item = NewPerson>) -> Self {
        let now = Utc::now();

        let person_rows: BTreeMap<PersonId, Person> = people
            .into_iter()
            .enumerate()
            .map(|(index, new_person)| {
                let id = PersonId(index as i64 + 1);
                (id, Person::from_new(id, new_person, now))
            })
            .collect();

        let next_id = person_rows
            .keys()
            .next_back()
            .map(|id| id.increment().to_number())
            .unwrap_or(1);

        Self {
            person_rows: RwLock::new(person_rows),
            next_id: AtomicI64::new(next_id),
        }
    }

    pub fn new_test() -> Self {
        MemoryStorage::with_people([
            NewPerson::new("Mickey", "Mouse"),
            NewPerson::new("Minnie", "Mouse"),
            NewPerson::new("Donald", "Duck"),
        ])
    }

    pub async fn len(&self) -> usize {
        self.person_rows.read().await.len()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PersonStorage for MemoryStorage {
    async fn find_by_id(&self, id: PersonId) -> StorageResult<Option<Person>> {
        Ok(self.person_rows.read().await.get(&id).cloned())
    }

    async fn find_filtered(&self, filter: &PersonFilter) -> StorageResult<Vec<Person>> {
        let person_rows = self.person_rows.read().await;

        // BTreeMap iterates in id order
        Ok(person_rows
            .values()
            .filter(|person| filter.matches(person))
            .cloned()
            .collect())
    }

    async fn find_by_name(
        &self,
        first_name: &str,
        last_name: &str,
    ) -> StorageResult<Option<Person>> {
        let probe = NewPerson::new(first_name, last_name);

        Ok(self
            .person_rows
            .read()
            .await
            .values()
            .find(|person| probe.same_name_as(person))
            .cloned())
    }

    async fn insert(&self, new_person: &NewPerson) -> StorageResult<Person> {
        let mut person_rows = self.person_rows.write().await;

        let id = PersonId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let person = Person::from_new(id, new_person.clone(), Utc::now());

        person_rows.insert(id, person.clone());

        Ok(person)
    }
}

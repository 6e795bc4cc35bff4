use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::consts::consts::PersonId;

/// A persisted person. Every field is set by the time a value of this type exists.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: PersonId,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated input for creating a person, names are already trimmed
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewPerson {
    pub first_name: String,
    pub last_name: String,
}

impl NewPerson {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        NewPerson {
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }

    /// Whether `person` carries the same name, ignoring case
    pub fn same_name_as(&self, person: &Person) -> bool {
        person.first_name.to_lowercase() == self.first_name.to_lowercase()
            && person.last_name.to_lowercase() == self.last_name.to_lowercase()
    }

    pub fn new_test() -> Self {
        NewPerson::new("Mickey", "Mouse")
    }
}

impl Person {
    pub fn from_new(id: PersonId, new_person: NewPerson, now: DateTime<Utc>) -> Self {
        Person {
            id,
            first_name: new_person.first_name,
            last_name: new_person.last_name,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn new_test() -> Self {
        Person::from_new(PersonId(1), NewPerson::new_test(), Utc::now())
    }
}

use std::borrow::Cow;

use serde::{Deserialize, Deserializer};
use validator::Validate;

use crate::{
    consts::consts::{PersonId, MAX_SAFE_INTEGER},
    model::{filter::PersonFilter, person::NewPerson},
};

use super::{ValidationError, ValidationResult};

/// `{ id }` taken from the route parameters
#[derive(Debug, Deserialize, Validate)]
pub struct PersonIdPath {
    #[validate(custom(function = "validate_person_id"))]
    pub id: String,
}

impl PersonIdPath {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn person_id(&self) -> ValidationResult<PersonId> {
        self.validate()?;

        let number = id_number(&self.id).unwrap_or_default();

        PersonId::try_from(number as i64)
            .map_err(|_| ValidationError::single("\"id\" must be a positive number"))
    }
}

/// `{ firstName, lastName }`, both required
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreatePersonRequest {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(required, length(min = 1, max = 100))]
    pub first_name: Option<String>,

    #[serde(default, deserialize_with = "trimmed")]
    #[validate(required, length(min = 1, max = 100))]
    pub last_name: Option<String>,
}

impl CreatePersonRequest {
    /// Only meaningful on a validated request, both names are present then
    pub fn into_new_person(self) -> NewPerson {
        NewPerson::new(
            self.first_name.unwrap_or_default(),
            self.last_name.unwrap_or_default(),
        )
    }
}

/// `{ firstName?, lastName? }`, at least one of the two
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[validate(schema(function = "require_any_name"))]
pub struct ListPersonsRequest {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,

    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
}

impl From<ListPersonsRequest> for PersonFilter {
    fn from(request: ListPersonsRequest) -> Self {
        PersonFilter::new(request.first_name, request.last_name)
    }
}

fn trimmed<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;

    Ok(value.map(|v| v.trim().to_string()))
}

fn require_any_name(request: &ListPersonsRequest) -> Result<(), validator::ValidationError> {
    if request.first_name.is_none() && request.last_name.is_none() {
        return Err(rule_error(
            "require_any",
            "\"value\" must contain at least one of [firstName, lastName]",
        ));
    }

    Ok(())
}

fn id_number(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|number| number.is_finite())
}

fn validate_person_id(raw: &str) -> Result<(), validator::ValidationError> {
    let message = match id_number(raw) {
        None => "\"id\" must be a number",
        Some(number) if number.fract() != 0.0 => "\"id\" must be an integer",
        Some(number) if number.abs() > MAX_SAFE_INTEGER as f64 => "\"id\" must be a safe number",
        Some(number) if number <= 0.0 => "\"id\" must be a positive number",
        Some(_) => return Ok(()),
    };

    Err(rule_error("person_id", message))
}

fn rule_error(code: &'static str, message: &'static str) -> validator::ValidationError {
    let mut error = validator::ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

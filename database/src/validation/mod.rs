//! Request validation.
//!
//! Request bodies are decoded into the typed structs of [`requests`] and then
//! checked with their derived [`validator::Validate`] rules. Decoding problems
//! (malformed JSON, wrong shape or type, unknown keys) stop at the first one,
//! rule violations are all reported together.

pub mod requests;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;
use validator::{Validate, ValidationErrors};

pub use requests::{CreatePersonRequest, ListPersonsRequest, PersonIdPath};

pub type ValidationResult<T> = Result<T, ValidationError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Validation error: {}", .messages.join(", "))]
pub struct ValidationError {
    pub messages: Vec<String>,
}

impl ValidationError {
    pub fn new(messages: Vec<String>) -> Self {
        Self { messages }
    }

    pub fn single(message: impl Into<String>) -> Self {
        Self {
            messages: vec![message.into()],
        }
    }
}

impl From<ValidationErrors> for ValidationError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<(String, Vec<String>)> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errors)| {
                let field = camel_case(&field.to_string());
                let messages = errors.iter().map(|e| describe(&field, e)).collect();
                (field, messages)
            })
            .collect();

        // field_errors is a map, keep the output stable
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        ValidationError::new(fields.into_iter().flat_map(|(_, messages)| messages).collect())
    }
}

/// Renders one rule violation. Rules carrying their own message keep it.
fn describe(field: &str, error: &validator::ValidationError) -> String {
    if let Some(message) = &error.message {
        return message.to_string();
    }

    let param = |name: &str| error.params.get(name).and_then(Value::as_u64);

    match error.code.as_ref() {
        "required" => format!("\"{}\" is required", field),
        "length" => {
            let length = error
                .params
                .get("value")
                .and_then(Value::as_str)
                .map(|value| value.chars().count() as u64)
                .unwrap_or_default();

            match (param("min"), param("max")) {
                (Some(min), _) if length < min => format!(
                    "\"{}\" length must be at least {} characters long",
                    field, min
                ),
                (_, Some(max)) => format!(
                    "\"{}\" length must be less than or equal to {} characters long",
                    field, max
                ),
                _ => format!("\"{}\" length is invalid", field),
            }
        }
        code => format!("\"{}\" failed {}", field, code),
    }
}

/// `first_name` to `firstName`, struct level keys such as `__all__` are kept
fn camel_case(field: &str) -> String {
    if field.starts_with('_') {
        return field.to_string();
    }

    let mut out = String::with_capacity(field.len());
    let mut upper = false;

    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }

    out
}

/// Decodes a raw request body. An empty body is read as an empty object so
/// validation reports the missing fields rather than a decoding failure.
pub fn parse_body(bytes: &[u8]) -> ValidationResult<Value> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }

    serde_json::from_slice(bytes)
        .map_err(|_| ValidationError::single("\"value\" must be valid JSON"))
}

/// Decodes `bytes` into `T` and runs its validation rules
pub fn parse_request<T>(bytes: &[u8]) -> ValidationResult<T>
where
    T: DeserializeOwned + Validate,
{
    let value = parse_body(bytes)?;

    if !value.is_object() {
        return Err(ValidationError::single("\"value\" must be of type object"));
    }

    let request: T =
        serde_json::from_value(value).map_err(|e| ValidationError::single(e.to_string()))?;

    request.validate()?;

    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_body_is_an_empty_object() {
        assert_eq!(parse_body(b"").unwrap(), json!({}));
        assert_eq!(parse_body(b"  \n").unwrap(), json!({}));
    }

    #[test]
    fn malformed_body_is_a_validation_error() {
        let error = parse_body(b"{\"firstName\":").unwrap_err();

        assert_eq!(error.messages, vec!["\"value\" must be valid JSON"]);
    }

    #[test]
    fn non_object_body_is_rejected() {
        let error = parse_request::<CreatePersonRequest>(b"[\"John\", \"Doe\"]").unwrap_err();

        assert_eq!(error.messages, vec!["\"value\" must be of type object"]);
    }

    #[test]
    fn display_joins_every_message() {
        let error = ValidationError::new(vec!["a".to_string(), "b".to_string()]);

        assert_eq!(error.to_string(), "Validation error: a, b");
    }

    #[test]
    fn field_names_are_reported_in_camel_case() {
        assert_eq!(camel_case("first_name"), "firstName");
        assert_eq!(camel_case("firstName"), "firstName");
        assert_eq!(camel_case("id"), "id");
        assert_eq!(camel_case("__all__"), "__all__");
    }
}

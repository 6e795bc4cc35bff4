use serde::{Deserialize, Serialize};

use super::person::Person;

/// List filter, each present field is a case-insensitive "contains" match and
/// present fields are combined with AND
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PersonFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl PersonFilter {
    pub fn new(first_name: Option<String>, last_name: Option<String>) -> Self {
        PersonFilter {
            first_name,
            last_name,
        }
    }

    pub fn matches(&self, person: &Person) -> bool {
        if let Some(first_name) = &self.first_name {
            if !contains_ignore_case(&person.first_name, first_name) {
                return false;
            }
        }

        if let Some(last_name) = &self.last_name {
            if !contains_ignore_case(&person.last_name, last_name) {
                return false;
            }
        }

        true
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Builds a LIKE pattern matching `value` anywhere in the column. The escape
/// character is postgres' default backslash.
pub fn contains_pattern(value: &str) -> String {
    let mut pattern = String::with_capacity(value.len() + 2);

    pattern.push('%');
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');

    pattern
}
